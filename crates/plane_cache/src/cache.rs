//! Bounded, direction-aware cache of resolved and in-flight plane fetches
//!
//! [`ImageFutureCache`] maps a [`PlaneCoord`] to either a decoded image or the
//! handle of a fetch that is still running. It never holds more than
//! `max_entries` slots; when full, the victim is chosen by
//! [`select_victim`](crate::eviction::select_victim) using the direction the
//! user is currently travelling in. Evicting or overwriting a pending slot
//! cancels its fetch.

use indexmap::IndexMap;
use plane_tasks::ExecutionHandle;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::coord::PlaneCoord;
use crate::error::CacheResult;
use crate::eviction::select_victim;
use crate::history::NavigationHistory;

/// An in-flight fetch that the cache can cancel
pub trait PendingFetch {
    /// Request cancellation. Must be a no-op on a finished fetch.
    fn cancel(&self);

    /// Whether `other` refers to the same execution as `self`
    fn is_same_fetch(&self, other: &Self) -> bool;
}

impl<T, E> PendingFetch for ExecutionHandle<T, E> {
    fn cancel(&self) {
        ExecutionHandle::cancel(self);
    }

    fn is_same_fetch(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

/// Content of a cache slot
#[derive(Debug, Clone)]
pub enum CacheEntry<I, H> {
    Resolved(I),
    Pending(H),
}

impl<I, H> CacheEntry<I, H> {
    pub fn is_pending(&self) -> bool {
        matches!(self, CacheEntry::Pending(_))
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, CacheEntry::Resolved(_))
    }

    pub fn image(&self) -> Option<&I> {
        match self {
            CacheEntry::Resolved(image) => Some(image),
            CacheEntry::Pending(_) => None,
        }
    }

    pub fn handle(&self) -> Option<&H> {
        match self {
            CacheEntry::Pending(handle) => Some(handle),
            CacheEntry::Resolved(_) => None,
        }
    }
}

/// Counters of cache activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups that found a slot
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Slots removed to make room
    pub evictions: u64,
    /// Pending fetches cancelled by the cache
    pub cancellations: u64,
}

/// Bounded map from plane to resolved image or pending fetch.
///
/// Not synchronized; share it behind a mutex.
#[derive(Debug)]
pub struct ImageFutureCache<I, H> {
    config: CacheConfig,
    entries: IndexMap<PlaneCoord, CacheEntry<I, H>>,
    history: NavigationHistory,
    stats: CacheStats,
}

impl<I, H: PendingFetch> ImageFutureCache<I, H> {
    pub fn new(config: CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            entries: IndexMap::with_capacity(config.max_entries),
            history: NavigationHistory::new(),
            stats: CacheStats::default(),
        })
    }

    /// Cache holding at most `max_entries` planes of `image_size` bytes
    pub fn with_capacity(max_entries: usize, image_size: usize) -> CacheResult<Self> {
        Self::new(CacheConfig {
            max_entries,
            image_size,
        })
    }

    /// Start from an existing navigation history
    pub fn with_history(mut self, history: NavigationHistory) -> Self {
        self.history = history;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.max_entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes held by the current entries, resolved or not
    pub fn estimated_memory(&self) -> usize {
        self.entries.len().saturating_mul(self.config.image_size)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &PlaneCoord> {
        self.entries.keys()
    }

    pub fn contains(&self, coord: &PlaneCoord) -> bool {
        self.entries.contains_key(coord)
    }

    /// The slot for `coord`, without touching the statistics
    pub fn get(&self, coord: &PlaneCoord) -> Option<&CacheEntry<I, H>> {
        self.entries.get(coord)
    }

    /// The slot for `coord`, counted as a hit or a miss
    pub fn lookup(&mut self, coord: &PlaneCoord) -> Option<&CacheEntry<I, H>> {
        let entry = self.entries.get(coord);
        if entry.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        trace!(coord = %coord, hit = entry.is_some(), "Cache lookup");
        entry
    }

    /// Insert or overwrite the slot for `coord`.
    ///
    /// Overwriting a pending slot cancels its fetch unless `entry` carries the
    /// same fetch. Inserting a new key into a full cache first evicts one slot.
    /// Returns the evicted key, if any.
    pub fn add(&mut self, coord: PlaneCoord, entry: CacheEntry<I, H>) -> Option<PlaneCoord> {
        if let Some(slot) = self.entries.get_mut(&coord) {
            let previous = std::mem::replace(slot, entry);
            if let CacheEntry::Pending(old) = &previous {
                let same_fetch =
                    matches!(&*slot, CacheEntry::Pending(new) if new.is_same_fetch(old));
                if !same_fetch {
                    old.cancel();
                    self.stats.cancellations += 1;
                }
            }
            debug!(coord = %coord, "Replaced cache entry");
            return None;
        }

        let evicted = if self.entries.len() >= self.config.max_entries {
            self.evict_for(&coord)
        } else {
            None
        };
        self.entries.insert(coord, entry);
        trace!(coord = %coord, len = self.entries.len(), "Inserted cache entry");
        evicted
    }

    fn evict_for(&mut self, incoming: &PlaneCoord) -> Option<PlaneCoord> {
        let direction = self.history.current_direction();
        let (victim, reason) = select_victim(self.entries.keys(), direction.as_ref(), incoming)?;

        if let Some(CacheEntry::Pending(handle)) = self.entries.get(&victim) {
            handle.cancel();
            self.stats.cancellations += 1;
        }
        self.entries.shift_remove(&victim);
        self.stats.evictions += 1;

        debug!(victim = %victim, incoming = %incoming, reason = ?reason, "Evicted cache entry");
        Some(victim)
    }

    /// Replace the slot for `coord` with a resolved image.
    ///
    /// Does not cancel anything. Returns `false` if `coord` is not cached.
    pub fn resolve(&mut self, coord: &PlaneCoord, image: I) -> bool {
        match self.entries.get_mut(coord) {
            Some(slot) => {
                *slot = CacheEntry::Resolved(image);
                debug!(coord = %coord, "Resolved cache entry");
                true
            }
            None => false,
        }
    }

    /// Resolve `coord` only if its slot still waits on `fetch`.
    pub fn resolve_fetch(&mut self, coord: &PlaneCoord, fetch: &H, image: I) -> bool {
        if !self.is_waiting_on(coord, fetch) {
            trace!(coord = %coord, "Ignoring result of a superseded fetch");
            return false;
        }
        self.resolve(coord, image)
    }

    /// Drop the slot for `coord` only if it still waits on `fetch`.
    pub fn discard_fetch(&mut self, coord: &PlaneCoord, fetch: &H) -> bool {
        if !self.is_waiting_on(coord, fetch) {
            return false;
        }
        self.entries.shift_remove(coord);
        debug!(coord = %coord, "Discarded failed fetch");
        true
    }

    fn is_waiting_on(&self, coord: &PlaneCoord, fetch: &H) -> bool {
        matches!(
            self.entries.get(coord),
            Some(CacheEntry::Pending(handle)) if handle.is_same_fetch(fetch)
        )
    }

    /// Remove the slot for `coord`, cancelling it if pending
    pub fn remove(&mut self, coord: &PlaneCoord) -> Option<CacheEntry<I, H>> {
        let entry = self.entries.shift_remove(coord)?;
        if let CacheEntry::Pending(handle) = &entry {
            handle.cancel();
            self.stats.cancellations += 1;
        }
        Some(entry)
    }

    /// Remove every slot, cancelling pending fetches
    pub fn clear(&mut self) {
        for (_, entry) in self.entries.drain(..) {
            if let CacheEntry::Pending(handle) = entry {
                handle.cancel();
                self.stats.cancellations += 1;
            }
        }
        debug!("Cleared cache");
    }

    pub fn record_visit(&mut self, coord: PlaneCoord) {
        self.history.record_visit(coord);
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut NavigationHistory {
        &mut self.history
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
