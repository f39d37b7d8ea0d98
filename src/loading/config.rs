use super::errors::LoadError;

/// Largest accepted id set for one batched lookup
pub const MAX_BATCH_SIZE: usize = 1000;

/// Configuration for batched collection loading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Maximum number of root ids bound into a single `= ANY(..)` lookup
    pub batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}

impl LoaderConfig {
    pub fn new(batch_size: usize) -> Result<Self, LoadError> {
        let config = Self { batch_size };
        config.validate()?;
        Ok(config)
    }

    /// Small batches, more round trips, shorter id lists
    pub fn small_batches() -> Self {
        Self { batch_size: 10 }
    }

    /// One round trip for up to a thousand roots
    pub fn large_batches() -> Self {
        Self { batch_size: MAX_BATCH_SIZE }
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(LoadError::InvalidBatchSize(self.batch_size));
        }
        Ok(())
    }

    /// Number of batched lookups needed for `ids` distinct keys
    pub fn batches_for(&self, ids: usize) -> usize {
        ids.div_ceil(self.batch_size)
    }
}
