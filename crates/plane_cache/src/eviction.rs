//! Victim selection for a full cache
//!
//! The policy prefers discarding planes the user is unlikely to visit next:
//! first anything off the current line of travel, then anything behind the
//! incoming plane, and only then the plane farthest from it.

use crate::coord::PlaneCoord;
use crate::direction::Direction;

/// Which rule selected a victim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionReason {
    /// Not on the line of travel
    OffDirection,
    /// On the line, behind the incoming plane
    Behind,
    /// On the line and ahead; the farthest one goes
    FarthestAhead,
    /// No direction is known; the farthest one goes
    Farthest,
}

/// Pick the entry to evict before inserting `incoming`.
///
/// `keys` must be in insertion order; ties go to the earliest inserted key.
/// Returns `None` only when `keys` is empty.
pub fn select_victim<'a, K>(
    keys: K,
    direction: Option<&Direction>,
    incoming: &PlaneCoord,
) -> Option<(PlaneCoord, EvictionReason)>
where
    K: IntoIterator<Item = &'a PlaneCoord>,
{
    let keys: Vec<&PlaneCoord> = keys.into_iter().collect();

    let Some(direction) = direction else {
        return farthest(&keys, incoming).map(|coord| (coord, EvictionReason::Farthest));
    };

    if let Some(coord) = keys.iter().find(|coord| !direction.contains(coord)) {
        return Some((**coord, EvictionReason::OffDirection));
    }
    if let Some(coord) = keys
        .iter()
        .find(|coord| direction.is_behind(incoming, coord))
    {
        return Some((**coord, EvictionReason::Behind));
    }
    farthest(&keys, incoming).map(|coord| (coord, EvictionReason::FarthestAhead))
}

/// Farthest key from `incoming`, keeping the first of equally distant keys
fn farthest(keys: &[&PlaneCoord], incoming: &PlaneCoord) -> Option<PlaneCoord> {
    let mut best: Option<(&PlaneCoord, u128)> = None;
    for coord in keys {
        let distance = coord.distance_squared(incoming);
        if best.map_or(true, |(_, max)| distance > max) {
            best = Some((*coord, distance));
        }
    }
    best.map(|(coord, _)| *coord)
}
