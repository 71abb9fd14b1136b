//! Viewer-facing control flow: navigation, lookup, fetch, prefetch

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use plane_tasks::{CommandProcessor, ExecutionHandle, LastValueAssembler, TaskError, TaskResult};
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStats, ImageFutureCache};
use crate::config::CacheConfig;
use crate::coord::{PlaneCoord, StackDims};
use crate::direction::Direction;
use crate::error::{CacheResult, TransportError};
use crate::source::{fetch_task, PixelSource, PlaneImage};

/// Handle of a running plane fetch
pub type FetchHandle = ExecutionHandle<Option<PlaneImage>, TransportError>;

/// The cache used by a [`ViewerSession`]
pub type PlaneCache = ImageFutureCache<PlaneImage, FetchHandle>;

/// Error observed while waiting for a plane
pub type FetchError = TaskError<TransportError>;

/// Outcome of asking the session for a plane
#[derive(Debug, Clone)]
pub enum PlaneLookup {
    /// Already decoded
    Ready(PlaneImage),
    /// Being fetched; the handle resolves to the image
    Loading(FetchHandle),
    /// The fetch finished unsuccessfully before it could be cached
    Failed(FetchError),
}

impl PlaneLookup {
    pub fn is_ready(&self) -> bool {
        matches!(self, PlaneLookup::Ready(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, PlaneLookup::Loading(_))
    }

    pub fn image(&self) -> Option<&PlaneImage> {
        match self {
            PlaneLookup::Ready(image) => Some(image),
            _ => None,
        }
    }

    /// Wait for the image
    pub async fn wait(self) -> Result<PlaneImage, FetchError> {
        match self {
            PlaneLookup::Ready(image) => Ok(image),
            PlaneLookup::Failed(error) => Err(error),
            PlaneLookup::Loading(handle) => image_from(handle.wait().await),
        }
    }

    /// Block until the image is available. Not for use inside async code.
    pub fn blocking_wait(self) -> Result<PlaneImage, FetchError> {
        match self {
            PlaneLookup::Ready(image) => Ok(image),
            PlaneLookup::Failed(error) => Err(error),
            PlaneLookup::Loading(handle) => image_from(handle.blocking_wait()),
        }
    }
}

fn image_from(
    result: TaskResult<Option<PlaneImage>, TransportError>,
) -> Result<PlaneImage, FetchError> {
    result
        .into_result()?
        .ok_or_else(|| TaskError::illegal_state("fetch finished without an image"))
}

/// Drives plane retrieval for one open image.
///
/// Every lookup goes through the cache first; misses start a fetch through
/// the processor and park its handle in the cache until it resolves. The
/// session is meant to be driven from a single UI thread, while fetches may
/// complete on worker threads.
pub struct ViewerSession<S> {
    source: Arc<S>,
    dims: StackDims,
    cache: Arc<Mutex<PlaneCache>>,
    processor: CommandProcessor,
}

impl<S: PixelSource> ViewerSession<S> {
    pub fn new(
        source: S,
        dims: StackDims,
        config: CacheConfig,
        processor: CommandProcessor,
    ) -> CacheResult<Self> {
        let cache = PlaneCache::new(config)?;
        debug!(
            size_z = dims.size_z,
            size_t = dims.size_t,
            max_entries = config.max_entries,
            "Opened viewer session"
        );
        Ok(Self {
            source: Arc::new(source),
            dims,
            cache: Arc::new(Mutex::new(cache)),
            processor,
        })
    }

    fn cache(&self) -> MutexGuard<'_, PlaneCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn dims(&self) -> StackDims {
        self.dims
    }

    pub fn processor(&self) -> &CommandProcessor {
        &self.processor
    }

    /// Record a visit to `coord`, then look it up.
    pub fn navigate_to(&self, coord: PlaneCoord) -> PlaneLookup {
        self.cache().record_visit(coord);
        debug!(coord = %coord, "Navigated");
        self.request(coord)
    }

    /// Look `coord` up, starting a fetch on a miss. Does not record a visit.
    pub fn request(&self, coord: PlaneCoord) -> PlaneLookup {
        match self.cache().lookup(&coord) {
            Some(CacheEntry::Resolved(image)) => return PlaneLookup::Ready(image.clone()),
            Some(CacheEntry::Pending(handle)) => return PlaneLookup::Loading(handle.clone()),
            None => {}
        }
        if !self.dims.contains(&coord) {
            return PlaneLookup::Failed(TaskError::Execution(TransportError::OutOfRange {
                coord,
            }));
        }

        let handle = self.start_fetch(coord);

        // The completion callback takes the same lock, so it either ran
        // before this point or will find the pending slot.
        let mut cache = self.cache();
        match handle.result() {
            None => {
                cache.add(coord, CacheEntry::Pending(handle.clone()));
                PlaneLookup::Loading(handle)
            }
            Some(TaskResult::Success(Some(image))) => {
                cache.add(coord, CacheEntry::Resolved(image.clone()));
                PlaneLookup::Ready(image)
            }
            Some(TaskResult::Success(None)) => PlaneLookup::Failed(TaskError::illegal_state(
                "fetch finished without an image",
            )),
            Some(TaskResult::Error(error)) => PlaneLookup::Failed(error),
            Some(TaskResult::Cancelled) => PlaneLookup::Failed(TaskError::Cancelled),
        }
    }

    fn start_fetch(&self, coord: PlaneCoord) -> FetchHandle {
        let cache = Arc::downgrade(&self.cache);
        self.processor.execute_then(
            fetch_task(self.source.clone(), coord),
            LastValueAssembler::new(),
            move |handle, result| {
                let Some(cache) = cache.upgrade() else {
                    return;
                };
                let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
                match result {
                    TaskResult::Success(Some(image)) => {
                        cache.resolve_fetch(&coord, handle, image.clone());
                    }
                    TaskResult::Success(None) | TaskResult::Error(_) => {
                        if cache.discard_fetch(&coord, handle) {
                            warn!(coord = %coord, "Fetch failed, dropped pending slot");
                        }
                    }
                    TaskResult::Cancelled => {}
                }
            },
        )
    }

    /// Request up to `count` planes ahead along the current direction.
    ///
    /// Predictions stop at the stack bounds and never exceed what the cache
    /// can hold besides the current plane. Returns the planes that were
    /// newly requested.
    pub fn prefetch(&self, count: usize) -> Vec<PlaneCoord> {
        let planned: Vec<PlaneCoord> = {
            let cache = self.cache();
            let limit = count.min(cache.capacity().saturating_sub(1));
            cache
                .history()
                .predict_next(limit)
                .into_iter()
                .take_while(|coord| self.dims.contains(coord))
                .filter(|coord| !cache.contains(coord))
                .collect()
        };

        for coord in &planned {
            self.request(*coord);
        }
        if !planned.is_empty() {
            debug!(count = planned.len(), "Prefetch requested");
        }
        planned
    }

    /// Clear the cache and cancel all in-flight fetches
    pub fn shutdown(&self) {
        self.cache().clear();
        let cancelled = self.processor.cancel_all();
        info!(cancelled, "Viewer session shut down");
    }

    pub fn current_direction(&self) -> Option<Direction> {
        self.cache().history().current_direction()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache().stats()
    }

    /// Cached planes in insertion order
    pub fn cached_planes(&self) -> Vec<PlaneCoord> {
        self.cache().keys().copied().collect()
    }

    /// Run `f` with the cache locked
    pub fn with_cache<R>(&self, f: impl FnOnce(&PlaneCache) -> R) -> R {
        f(&self.cache())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    impl PixelSource for CountingSource {
        fn fetch_plane(&self, coord: &PlaneCoord) -> Result<PlaneImage, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PlaneImage::new(*coord, 2, 2, vec![coord.z as u8; 4]))
        }
    }

    fn session(max_entries: usize) -> (ViewerSession<CountingSource>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = ViewerSession::new(
            CountingSource {
                calls: calls.clone(),
            },
            StackDims::new(20, 1),
            CacheConfig::new(max_entries, 4).unwrap(),
            CommandProcessor::new(),
        )
        .unwrap();
        (session, calls)
    }

    #[test]
    fn test_synchronous_navigation_hits_cache() {
        let (session, calls) = session(3);

        let first = session.navigate_to(PlaneCoord::xy(4, 0));
        assert_eq!(first.image().unwrap().coord, PlaneCoord::xy(4, 0));

        let again = session.navigate_to(PlaneCoord::xy(4, 0));
        assert!(again.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = session.cache_stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn test_out_of_range_is_not_fetched() {
        let (session, calls) = session(3);
        let lookup = session.request(PlaneCoord::xy(25, 0));
        assert!(matches!(
            lookup,
            PlaneLookup::Failed(TaskError::Execution(TransportError::OutOfRange { .. }))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_prefetch_follows_direction() {
        let (session, _) = session(4);
        session.navigate_to(PlaneCoord::xy(5, 0));
        session.navigate_to(PlaneCoord::xy(6, 0));

        let requested = session.prefetch(2);
        assert_eq!(requested, vec![PlaneCoord::xy(7, 0), PlaneCoord::xy(8, 0)]);
        assert_eq!(
            session.cached_planes(),
            vec![
                PlaneCoord::xy(5, 0),
                PlaneCoord::xy(6, 0),
                PlaneCoord::xy(7, 0),
                PlaneCoord::xy(8, 0),
            ]
        );
        // Prefetching does not move the user.
        assert_eq!(
            session.with_cache(|cache| cache.history().last_visit()),
            Some(PlaneCoord::xy(6, 0))
        );
    }

    #[test]
    fn test_prefetch_without_direction_is_empty() {
        let (session, calls) = session(4);
        session.navigate_to(PlaneCoord::xy(5, 0));
        assert!(session.prefetch(3).is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_synchronous_fetch_is_not_cached() {
        let failing = |_: &PlaneCoord| -> Result<PlaneImage, TransportError> {
            Err(TransportError::unavailable("maintenance"))
        };
        let session = ViewerSession::new(
            failing,
            StackDims::new(4, 1),
            CacheConfig::new(2, 4).unwrap(),
            CommandProcessor::new(),
        )
        .unwrap();

        let lookup = session.navigate_to(PlaneCoord::xy(1, 0));
        assert!(matches!(
            lookup.blocking_wait(),
            Err(TaskError::Execution(TransportError::Unavailable(_)))
        ));
        assert!(session.cached_planes().is_empty());
    }
}
