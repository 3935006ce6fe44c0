//! # Pool Configuration
//!
//! Pool sizes are read once at startup:
//!
//! ```toml
//! capacity = 4096
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};
use crate::pool::DEFAULT_POOL_SIZE;

/// Sizing for a pool.
///
/// A [`crate::FixedPool`] uses `capacity` as its whole buffer; a
/// [`crate::GrowablePool`] uses it for its first block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Capacity in bytes.
    pub capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POOL_SIZE,
        }
    }
}

impl PoolConfig {
    /// Small pool for memory-constrained targets.
    #[must_use]
    pub const fn embedded() -> Self {
        Self { capacity: 256 }
    }

    /// Pool of `capacity` bytes.
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] on malformed TOML or invalid values.
    pub fn from_toml_str(text: &str) -> PoolResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|err| PoolError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> PoolResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| PoolError::InvalidConfig(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks that the capacity is usable.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] if the capacity is zero or does not fit
    /// 32-bit offsets.
    pub fn validate(&self) -> PoolResult<()> {
        if self.capacity == 0 {
            return Err(PoolError::InvalidConfig("capacity must be non-zero".into()));
        }
        if u32::try_from(self.capacity).is_err() {
            return Err(PoolError::InvalidConfig(format!(
                "capacity {} exceeds {} bytes",
                self.capacity,
                u32::MAX
            )));
        }
        Ok(())
    }
}
