//! Terminal reporters for plane fetch executions.

mod fetch;

pub use fetch::FetchProgress;
