//! Pixel source seam and the fetch command built on it

use std::sync::Arc;

use plane_tasks::Task;

use crate::coord::PlaneCoord;
use crate::error::TransportError;

/// A decoded plane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneImage {
    pub coord: PlaneCoord,
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl PlaneImage {
    pub fn new(coord: PlaneCoord, width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Self {
        Self {
            coord,
            width,
            height,
            pixels: pixels.into(),
        }
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// Remote pixel service that renders one plane per call.
///
/// Calls block; the processor decides which thread they run on.
pub trait PixelSource: Send + Sync + 'static {
    fn fetch_plane(&self, coord: &PlaneCoord) -> Result<PlaneImage, TransportError>;
}

impl<F> PixelSource for F
where
    F: Fn(&PlaneCoord) -> Result<PlaneImage, TransportError> + Send + Sync + 'static,
{
    fn fetch_plane(&self, coord: &PlaneCoord) -> Result<PlaneImage, TransportError> {
        self(coord)
    }
}

/// A single-step command fetching `coord` from `source`
pub fn fetch_task<S: PixelSource>(
    source: Arc<S>,
    coord: PlaneCoord,
) -> Task<PlaneImage, TransportError> {
    Task::leaf(format!("fetch {}", coord), move || {
        source.fetch_plane(&coord).map(Some)
    })
}
