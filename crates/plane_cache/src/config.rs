//! Cache sizing

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

/// Sizing of an [`ImageFutureCache`](crate::ImageFutureCache)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries, resolved and pending combined
    pub max_entries: usize,

    /// Estimated size of one decoded plane in bytes
    pub image_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10,
            image_size: 512 * 512 * 2,
        }
    }
}

impl CacheConfig {
    pub fn new(max_entries: usize, image_size: usize) -> CacheResult<Self> {
        let config = Self {
            max_entries,
            image_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Derive the entry limit from a memory budget in bytes.
    pub fn from_memory_budget(budget: usize, image_size: usize) -> CacheResult<Self> {
        if image_size == 0 {
            return Err(CacheError::invalid_image_size(image_size));
        }
        let max_entries = budget / image_size;
        if max_entries == 0 {
            return Err(CacheError::BudgetTooSmall { budget, image_size });
        }
        Self::new(max_entries, image_size)
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_image_size(mut self, image_size: usize) -> Self {
        self.image_size = image_size;
        self
    }

    pub fn validate(&self) -> CacheResult<()> {
        if self.max_entries < 1 {
            return Err(CacheError::invalid_max_entries(self.max_entries));
        }
        Ok(())
    }

    /// Bytes held by a full cache
    pub fn memory_ceiling(&self) -> usize {
        self.max_entries.saturating_mul(self.image_size)
    }
}
