//! Plane coordinates within a pixel stack

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Orientation of a 2-D slice through the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    XY,
    XZ,
    ZY,
}

impl Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Orientation::XY => "XY",
            Orientation::XZ => "XZ",
            Orientation::ZY => "ZY",
        };
        f.write_str(name)
    }
}

/// Identifies one plane: an orientation plus a Z-section and a timepoint.
///
/// The `(z, t)` pair doubles as a point in the 2-D navigation space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaneCoord {
    pub orientation: Orientation,
    pub z: u32,
    pub t: u32,
}

impl PlaneCoord {
    pub const fn new(orientation: Orientation, z: u32, t: u32) -> Self {
        Self { orientation, z, t }
    }

    /// An XY plane, the orientation the viewer renders by default
    pub const fn xy(z: u32, t: u32) -> Self {
        Self::new(Orientation::XY, z, t)
    }

    /// Position in the navigation plane
    pub fn point(&self) -> (i64, i64) {
        (i64::from(self.z), i64::from(self.t))
    }

    /// Squared euclidean distance in the navigation plane.
    ///
    /// Exact for every pair of `u32` coordinates.
    pub fn distance_squared(&self, other: &PlaneCoord) -> u128 {
        let dz = u128::from(self.z.abs_diff(other.z));
        let dt = u128::from(self.t.abs_diff(other.t));
        dz * dz + dt * dt
    }

    /// The coordinate shifted by `(dz, dt)`, or `None` if it leaves the
    /// index range.
    pub fn offset(&self, dz: i64, dt: i64) -> Option<PlaneCoord> {
        let z = u32::try_from(i64::from(self.z).checked_add(dz)?).ok()?;
        let t = u32::try_from(i64::from(self.t).checked_add(dt)?).ok()?;
        Some(PlaneCoord::new(self.orientation, z, t))
    }
}

impl Display for PlaneCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(z={}, t={})", self.orientation, self.z, self.t)
    }
}

/// Extent of a pixel stack along its two navigation axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDims {
    pub size_z: u32,
    pub size_t: u32,
}

impl StackDims {
    pub const fn new(size_z: u32, size_t: u32) -> Self {
        Self { size_z, size_t }
    }

    pub fn contains(&self, coord: &PlaneCoord) -> bool {
        coord.z < self.size_z && coord.t < self.size_t
    }

    pub fn plane_count(&self) -> u64 {
        u64::from(self.size_z) * u64::from(self.size_t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_includes_orientation() {
        let xy = PlaneCoord::xy(3, 1);
        let xz = PlaneCoord::new(Orientation::XZ, 3, 1);
        assert_ne!(xy, xz);

        let set: HashSet<_> = [xy, xz, PlaneCoord::xy(3, 1)].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_distance() {
        let a = PlaneCoord::xy(0, 0);
        let b = PlaneCoord::xy(3, 4);
        assert_eq!(a.distance_squared(&b), 25);
        assert_eq!(b.distance_squared(&a), 25);
        assert_eq!(a.distance_squared(&a), 0);
    }

    #[test]
    fn test_distance_across_the_full_index_range() {
        let origin = PlaneCoord::xy(0, 0);
        let corner = PlaneCoord::xy(u32::MAX, u32::MAX);
        let max = u128::from(u32::MAX);
        assert_eq!(origin.distance_squared(&corner), 2 * max * max);
        assert_eq!(corner.distance_squared(&origin), 2 * max * max);
    }

    #[test]
    fn test_offset_stays_in_index_range() {
        let coord = PlaneCoord::xy(2, 0);
        assert_eq!(coord.offset(1, 2), Some(PlaneCoord::xy(3, 2)));
        assert_eq!(coord.offset(-2, 0), Some(PlaneCoord::xy(0, 0)));
        assert_eq!(coord.offset(-3, 0), None);
        assert_eq!(coord.offset(0, -1), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(PlaneCoord::xy(3, 0).to_string(), "XY(z=3, t=0)");
        assert_eq!(
            PlaneCoord::new(Orientation::ZY, 1, 7).to_string(),
            "ZY(z=1, t=7)"
        );
    }

    #[test]
    fn test_stack_dims() {
        let dims = StackDims::new(10, 3);
        assert!(dims.contains(&PlaneCoord::xy(9, 2)));
        assert!(!dims.contains(&PlaneCoord::xy(10, 0)));
        assert!(!dims.contains(&PlaneCoord::xy(0, 3)));
        assert_eq!(dims.plane_count(), 30);
    }
}
