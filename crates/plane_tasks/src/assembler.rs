//! Strategies combining ordered partial results into one final result

/// Accumulates the partial results emitted by task steps.
///
/// [`add`](Self::add) is called once per completed step, in completion order.
/// [`assemble`](Self::assemble) is called at most once, after the last step,
/// and never when execution failed or was cancelled.
pub trait ResultAssembler<P>: Send {
    /// The combined result
    type Output;

    /// Accept the partial result of one step. Steps may produce nothing.
    fn add(&mut self, partial: Option<P>);

    /// Produce the final result.
    fn assemble(self) -> Self::Output;
}

/// Collects every partial, absent ones included, in call order.
#[derive(Debug, Clone)]
pub struct ListAssembler<P> {
    partials: Vec<Option<P>>,
}

impl<P> ListAssembler<P> {
    pub fn new() -> Self {
        Self {
            partials: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.partials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }
}

impl<P> Default for ListAssembler<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Send> ResultAssembler<P> for ListAssembler<P> {
    type Output = Vec<Option<P>>;

    fn add(&mut self, partial: Option<P>) {
        self.partials.push(partial);
    }

    fn assemble(self) -> Self::Output {
        self.partials
    }
}

/// Keeps the most recent partial that carried a value.
#[derive(Debug, Clone)]
pub struct LastValueAssembler<P> {
    last: Option<P>,
}

impl<P> LastValueAssembler<P> {
    pub fn new() -> Self {
        Self { last: None }
    }
}

impl<P> Default for LastValueAssembler<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Send> ResultAssembler<P> for LastValueAssembler<P> {
    type Output = Option<P>;

    fn add(&mut self, partial: Option<P>) {
        if partial.is_some() {
            self.last = partial;
        }
    }

    fn assemble(self) -> Self::Output {
        self.last
    }
}

/// Folds partials into an accumulator with a closure.
pub struct FnAssembler<A, F> {
    acc: A,
    fold: F,
}

impl<A, F> FnAssembler<A, F> {
    pub fn new(init: A, fold: F) -> Self {
        Self { acc: init, fold }
    }
}

impl<P, A, F> ResultAssembler<P> for FnAssembler<A, F>
where
    A: Send,
    F: FnMut(&mut A, Option<P>) + Send,
{
    type Output = A;

    fn add(&mut self, partial: Option<P>) {
        (self.fold)(&mut self.acc, partial);
    }

    fn assemble(self) -> Self::Output {
        self.acc
    }
}
