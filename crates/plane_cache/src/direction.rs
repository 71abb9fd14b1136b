//! The line of travel through the navigation plane

use crate::coord::PlaneCoord;

/// A line through two distinct navigation points.
///
/// The step is the integer direction from the older point to the newer one,
/// reduced so that consecutive multiples hit every plane on the line. The
/// origin is the newer point. Both line membership and the half-plane test
/// are exact integer computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Direction {
    origin: PlaneCoord,
    step: (i64, i64),
}

impl Direction {
    /// The direction of travel from `from` to `to`.
    ///
    /// Undefined (`None`) when both share the same navigation point or lie in
    /// different orientations.
    pub fn through(from: &PlaneCoord, to: &PlaneCoord) -> Option<Self> {
        if from.orientation != to.orientation {
            return None;
        }
        let (fz, ft) = from.point();
        let (tz, tt) = to.point();
        let (dz, dt) = (tz - fz, tt - ft);
        if dz == 0 && dt == 0 {
            return None;
        }
        let divisor = gcd(dz.unsigned_abs(), dt.unsigned_abs()) as i64;
        Some(Self {
            origin: *to,
            step: (dz / divisor, dt / divisor),
        })
    }

    /// Reference point of the line, the most recent visit
    pub fn origin(&self) -> PlaneCoord {
        self.origin
    }

    /// Smallest integer step along the line, as `(dz, dt)`
    pub fn step(&self) -> (i64, i64) {
        self.step
    }

    pub fn unit_vector(&self) -> (f64, f64) {
        let (dz, dt) = (self.step.0 as f64, self.step.1 as f64);
        let length = dz.hypot(dt);
        (dz / length, dt / length)
    }

    /// Whether `coord` lies on the line
    pub fn contains(&self, coord: &PlaneCoord) -> bool {
        if coord.orientation != self.origin.orientation {
            return false;
        }
        let (sz, st) = self.wide_step();
        let (dz, dt) = wide_delta(&self.origin, coord);
        sz * dt == st * dz
    }

    /// Whether `coord` lies on the negative half relative to `reference`,
    /// i.e. behind the direction of travel.
    pub fn is_behind(&self, reference: &PlaneCoord, coord: &PlaneCoord) -> bool {
        let (sz, st) = self.wide_step();
        let (dz, dt) = wide_delta(reference, coord);
        sz * dz + st * dt < 0
    }

    /// The plane `k` steps ahead of the origin, if it exists
    pub fn project(&self, k: i64) -> Option<PlaneCoord> {
        self.origin
            .offset(self.step.0.checked_mul(k)?, self.step.1.checked_mul(k)?)
    }

    // Steps and deltas are bounded by `u32::MAX`, so their products fit i128.
    fn wide_step(&self) -> (i128, i128) {
        (i128::from(self.step.0), i128::from(self.step.1))
    }
}

/// `to - from` in the navigation plane, widened for exact products
fn wide_delta(from: &PlaneCoord, to: &PlaneCoord) -> (i128, i128) {
    (
        i128::from(to.z) - i128::from(from.z),
        i128::from(to.t) - i128::from(from.t),
    )
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Orientation;

    #[test]
    fn test_undefined_for_same_point() {
        let p = PlaneCoord::xy(4, 1);
        assert_eq!(Direction::through(&p, &p), None);

        let other_orientation = PlaneCoord::new(Orientation::XZ, 4, 1);
        assert_eq!(Direction::through(&p, &other_orientation), None);
    }

    #[test]
    fn test_step_is_reduced() {
        let d = Direction::through(&PlaneCoord::xy(0, 0), &PlaneCoord::xy(4, 2)).unwrap();
        assert_eq!(d.step(), (2, 1));
        assert_eq!(d.origin(), PlaneCoord::xy(4, 2));

        let back = Direction::through(&PlaneCoord::xy(6, 0), &PlaneCoord::xy(3, 0)).unwrap();
        assert_eq!(back.step(), (-1, 0));
    }

    #[test]
    fn test_unit_vector() {
        let d = Direction::through(&PlaneCoord::xy(0, 0), &PlaneCoord::xy(3, 4)).unwrap();
        let (ux, uy) = d.unit_vector();
        assert!((ux - 0.6).abs() < 1e-12);
        assert!((uy - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_contains() {
        // Moving along z at t = 2
        let d = Direction::through(&PlaneCoord::xy(1, 2), &PlaneCoord::xy(2, 2)).unwrap();
        assert!(d.contains(&PlaneCoord::xy(0, 2)));
        assert!(d.contains(&PlaneCoord::xy(9, 2)));
        assert!(!d.contains(&PlaneCoord::xy(2, 3)));
        assert!(!d.contains(&PlaneCoord::new(Orientation::XZ, 5, 2)));

        // Diagonal
        let diagonal = Direction::through(&PlaneCoord::xy(0, 0), &PlaneCoord::xy(1, 1)).unwrap();
        assert!(diagonal.contains(&PlaneCoord::xy(5, 5)));
        assert!(!diagonal.contains(&PlaneCoord::xy(5, 4)));
    }

    #[test]
    fn test_is_behind() {
        let d = Direction::through(&PlaneCoord::xy(1, 0), &PlaneCoord::xy(2, 0)).unwrap();
        let reference = PlaneCoord::xy(3, 0);
        assert!(d.is_behind(&reference, &PlaneCoord::xy(2, 0)));
        assert!(!d.is_behind(&reference, &PlaneCoord::xy(3, 0)));
        assert!(!d.is_behind(&reference, &PlaneCoord::xy(7, 0)));
    }

    #[test]
    fn test_extreme_coordinates_are_exact() {
        let far_z = PlaneCoord::xy(u32::MAX, 1);
        let steep = Direction::through(&PlaneCoord::xy(0, 0), &far_z).unwrap();
        assert_eq!(steep.step(), (i64::from(u32::MAX), 1));
        assert!(!steep.contains(&PlaneCoord::xy(0, u32::MAX)));
        assert!(steep.contains(&PlaneCoord::xy(0, 0)));
        assert!(steep.is_behind(&PlaneCoord::xy(1, 1), &PlaneCoord::xy(0, u32::MAX)));

        let corner = PlaneCoord::xy(u32::MAX, u32::MAX);
        let diagonal = Direction::through(&PlaneCoord::xy(0, 0), &corner).unwrap();
        assert_eq!(diagonal.step(), (1, 1));
        assert!(diagonal.contains(&PlaneCoord::xy(7, 7)));
        assert!(!diagonal.is_behind(&PlaneCoord::xy(0, 0), &corner));
    }

    #[test]
    fn test_project() {
        let d = Direction::through(&PlaneCoord::xy(3, 0), &PlaneCoord::xy(2, 0)).unwrap();
        assert_eq!(d.project(1), Some(PlaneCoord::xy(1, 0)));
        assert_eq!(d.project(2), Some(PlaneCoord::xy(0, 0)));
        assert_eq!(d.project(3), None);
    }
}
