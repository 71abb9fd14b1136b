//! Eviction behaviour of a full cache under the four selection rules.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use plane_cache::{CacheEntry, ImageFutureCache, NavigationHistory, PendingFetch, PlaneCoord};
use proptest::prelude::*;

/// Counts how often the cache cancels it.
#[derive(Debug, Clone)]
struct MockFetch {
    id: usize,
    cancels: Arc<AtomicUsize>,
}

impl MockFetch {
    fn new(id: usize) -> Self {
        Self {
            id,
            cancels: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl PendingFetch for MockFetch {
    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }

    fn is_same_fetch(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

type Cache = ImageFutureCache<String, MockFetch>;

fn image(coord: PlaneCoord) -> CacheEntry<String, MockFetch> {
    CacheEntry::Resolved(coord.to_string())
}

fn visited(points: &[(u32, u32)]) -> NavigationHistory {
    let mut history = NavigationHistory::new();
    for (z, t) in points {
        history.record_visit(PlaneCoord::xy(*z, *t));
    }
    history
}

fn filled(max_entries: usize, history: NavigationHistory, keys: &[PlaneCoord]) -> Cache {
    let mut cache = Cache::with_capacity(max_entries, 64)
        .unwrap()
        .with_history(history);
    for coord in keys {
        assert_eq!(cache.add(*coord, image(*coord)), None);
    }
    cache
}

#[test]
fn single_slot_cache_always_evicts_the_previous_plane() {
    let mut cache = Cache::with_capacity(1, 64).unwrap();
    let mut previous = None;
    for z in 0..5 {
        let coord = PlaneCoord::xy(z, 0);
        assert_eq!(cache.add(coord, image(coord)), previous);
        assert_eq!(cache.len(), 1);
        previous = Some(coord);
    }
    assert_eq!(cache.stats().evictions, 4);
}

#[test]
fn off_direction_entry_is_evicted_before_the_farthest() {
    // Travelling along z at t = 0.
    let keys = [
        PlaneCoord::xy(9, 0),
        PlaneCoord::xy(4, 3),
        PlaneCoord::xy(5, 1),
    ];
    let mut cache = filled(3, visited(&[(1, 0), (2, 0)]), &keys);

    let evicted = cache.add(PlaneCoord::xy(3, 0), image(PlaneCoord::xy(3, 0)));
    assert_eq!(evicted, Some(PlaneCoord::xy(4, 3)));
    assert!(cache.contains(&PlaneCoord::xy(9, 0)));
    assert!(cache.contains(&PlaneCoord::xy(5, 1)));
}

#[test]
fn behind_entry_is_evicted_when_all_are_on_the_line() {
    let keys = [
        PlaneCoord::xy(8, 0),
        PlaneCoord::xy(2, 0),
        PlaneCoord::xy(1, 0),
    ];
    let mut cache = filled(3, visited(&[(2, 0), (3, 0)]), &keys);

    let evicted = cache.add(PlaneCoord::xy(4, 0), image(PlaneCoord::xy(4, 0)));
    assert_eq!(evicted, Some(PlaneCoord::xy(2, 0)));
}

#[test]
fn farthest_ahead_is_evicted_when_all_are_ahead() {
    let keys = [
        PlaneCoord::xy(5, 0),
        PlaneCoord::xy(9, 0),
        PlaneCoord::xy(6, 0),
        PlaneCoord::xy(7, 0),
    ];
    let mut cache = filled(4, visited(&[(3, 0), (4, 0)]), &keys);

    let evicted = cache.add(PlaneCoord::xy(4, 0), image(PlaneCoord::xy(4, 0)));
    assert_eq!(evicted, Some(PlaneCoord::xy(9, 0)));
    assert_eq!(cache.len(), 4);
}

#[test]
fn without_direction_the_farthest_is_evicted() {
    let keys = [
        PlaneCoord::xy(5, 0),
        PlaneCoord::xy(0, 6),
        PlaneCoord::xy(6, 0),
    ];
    // A single visited point defines no direction.
    let mut cache = filled(3, visited(&[(4, 0)]), &keys);

    let evicted = cache.add(PlaneCoord::xy(4, 0), image(PlaneCoord::xy(4, 0)));
    assert_eq!(evicted, Some(PlaneCoord::xy(0, 6)));
}

#[test]
fn equidistant_candidates_evict_the_earliest_inserted() {
    let keys = [PlaneCoord::xy(6, 0), PlaneCoord::xy(2, 0)];
    let mut cache = filled(2, NavigationHistory::new(), &keys);

    let evicted = cache.add(PlaneCoord::xy(4, 0), image(PlaneCoord::xy(4, 0)));
    assert_eq!(evicted, Some(PlaneCoord::xy(6, 0)));
}

#[test]
fn extreme_coordinates_evict_without_overflow() {
    // Farthest from a corner of the index range.
    let corner = PlaneCoord::xy(u32::MAX, u32::MAX);
    let mut cache = filled(1, NavigationHistory::new(), &[PlaneCoord::xy(0, 0)]);
    assert_eq!(cache.add(corner, image(corner)), Some(PlaneCoord::xy(0, 0)));

    // A steep direction spanning the whole z range.
    let far = PlaneCoord::xy(0, u32::MAX);
    let mut cache = filled(1, visited(&[(0, 0), (u32::MAX, 1)]), &[far]);
    assert_eq!(cache.add(PlaneCoord::xy(1, 1), image(PlaneCoord::xy(1, 1))), Some(far));
    assert_eq!(cache.len(), 1);
}

#[test]
fn evicted_pending_fetch_is_cancelled_exactly_once() {
    let mut cache = Cache::with_capacity(2, 64).unwrap();
    let pending = MockFetch::new(1);
    let other = MockFetch::new(2);
    cache.add(PlaneCoord::xy(0, 0), CacheEntry::Pending(pending.clone()));
    cache.add(PlaneCoord::xy(1, 0), CacheEntry::Pending(other.clone()));

    // No direction: (0, 0) is farthest from (5, 0).
    let evicted = cache.add(PlaneCoord::xy(5, 0), image(PlaneCoord::xy(5, 0)));
    assert_eq!(evicted, Some(PlaneCoord::xy(0, 0)));
    assert_eq!(pending.cancel_count(), 1);
    assert_eq!(other.cancel_count(), 0);

    // Gone from the cache: clearing does not cancel it again.
    cache.clear();
    assert_eq!(pending.cancel_count(), 1);
    assert_eq!(other.cancel_count(), 1);
}

#[test]
fn resolving_a_pending_slot_keeps_its_fetch_alive() {
    let mut cache = Cache::with_capacity(2, 64).unwrap();
    let fetch = MockFetch::new(1);
    let coord = PlaneCoord::xy(3, 2);

    cache.add(coord, CacheEntry::Pending(fetch.clone()));
    assert!(cache.resolve(&coord, "decoded".to_string()));

    assert_eq!(cache.get(&coord).unwrap().image(), Some(&"decoded".to_string()));
    assert_eq!(fetch.cancel_count(), 0);
}

proptest! {
    #[test]
    fn cache_never_exceeds_its_capacity(
        max_entries in 1usize..6,
        visits in prop::collection::vec((0u32..8, 0u32..3), 0..6),
        inserts in prop::collection::vec((0u32..8, 0u32..3, any::<bool>()), 1..40),
    ) {
        let mut cache = Cache::with_capacity(max_entries, 1).unwrap();
        for (z, t) in visits {
            cache.record_visit(PlaneCoord::xy(z, t));
        }

        let mut fetches = Vec::new();
        for (index, (z, t, pending)) in inserts.into_iter().enumerate() {
            let coord = PlaneCoord::xy(z, t);
            let entry = if pending {
                let fetch = MockFetch::new(index);
                fetches.push(fetch.clone());
                CacheEntry::Pending(fetch)
            } else {
                image(coord)
            };
            let was_present = cache.contains(&coord);
            let evicted = cache.add(coord, entry);

            prop_assert!(cache.len() <= max_entries);
            prop_assert!(cache.contains(&coord));
            if was_present {
                prop_assert_eq!(evicted, None);
            }
            if let Some(victim) = evicted {
                prop_assert_ne!(victim, coord);
                prop_assert!(!cache.contains(&victim));
            }
        }

        // Every fetch is cancelled at most once.
        for fetch in &fetches {
            prop_assert!(fetch.cancel_count() <= 1);
        }
    }
}
