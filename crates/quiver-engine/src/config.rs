//! Database configuration.
//!
//! The core honors one input: the data directory. Everything else an
//! application might configure (ports, auth, logging sinks) belongs to
//! whatever wraps the engine.

use std::path::PathBuf;

use quiver_core::storage::DurabilityMode;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the data directory (None for in-memory only).
    pub path: Option<PathBuf>,

    /// WAL durability mode. Ignored for in-memory databases.
    pub durability: DurabilityMode,
}

impl Default for Config {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Config {
    /// Configuration for an in-memory database: nothing touches disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            durability: DurabilityMode::Sync,
        }
    }

    /// Configuration for a persistent database rooted at `path`.
    #[must_use]
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            durability: DurabilityMode::Sync,
        }
    }

    /// Sets the WAL durability mode.
    #[must_use]
    pub fn with_durability(mut self, durability: DurabilityMode) -> Self {
        self.durability = durability;
        self
    }
}
