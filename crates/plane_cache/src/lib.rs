//! Plane Cache - direction-aware prefetching of image planes
//!
//! A viewer moves through a multi-dimensional pixel stack one plane at a
//! time. This crate keeps a bounded set of decoded planes and in-flight
//! fetches, and uses the direction the user is travelling in to decide which
//! planes to drop when space runs out and which ones to fetch ahead.
//!
//! # Example
//!
//! ```rust
//! use plane_cache::{
//!     CacheConfig, PlaneCoord, PlaneImage, StackDims, TransportError, ViewerSession,
//! };
//! use plane_tasks::CommandProcessor;
//!
//! let source = |coord: &PlaneCoord| -> Result<PlaneImage, TransportError> {
//!     Ok(PlaneImage::new(*coord, 1, 1, vec![coord.z as u8]))
//! };
//! let session = ViewerSession::new(
//!     source,
//!     StackDims::new(16, 1),
//!     CacheConfig::new(4, 1).unwrap(),
//!     CommandProcessor::new(),
//! )
//! .unwrap();
//!
//! session.navigate_to(PlaneCoord::xy(2, 0));
//! let lookup = session.navigate_to(PlaneCoord::xy(3, 0));
//! assert!(lookup.is_ready());
//! assert_eq!(session.prefetch(2), vec![PlaneCoord::xy(4, 0), PlaneCoord::xy(5, 0)]);
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod direction;
pub mod error;
pub mod eviction;
pub mod history;
pub mod session;
pub mod source;

pub use cache::{CacheEntry, CacheStats, ImageFutureCache, PendingFetch};
pub use config::CacheConfig;
pub use coord::{Orientation, PlaneCoord, StackDims};
pub use direction::Direction;
pub use error::{CacheError, CacheResult, TransportError};
pub use eviction::{select_victim, EvictionReason};
pub use history::NavigationHistory;
pub use session::{FetchError, FetchHandle, PlaneCache, PlaneLookup, ViewerSession};
pub use source::{fetch_task, PixelSource, PlaneImage};
