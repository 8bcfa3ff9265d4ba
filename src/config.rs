//! Interleaving configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::throttler::validate_streams;

/// Default number of concurrently in-flight probes.
pub const DEFAULT_STREAMS: usize = 4;

/// How a multi-key probe is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterleaveConfig {
    /// Interleave probes (default: true).
    ///
    /// When disabled, drivers fall back to the sequential loop.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum probes in flight at once (default: 4).
    #[serde(default = "default_n_streams")]
    pub n_streams: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_n_streams() -> usize {
    DEFAULT_STREAMS
}

impl Default for InterleaveConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            n_streams: default_n_streams(),
        }
    }
}

impl InterleaveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequential baseline, no prefetching.
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_n_streams(mut self, n_streams: usize) -> Self {
        self.n_streams = n_streams;
        self
    }

    /// Validate the stream count. A disabled config is always valid.
    pub fn validate(&self) -> Result<()> {
        if self.enabled {
            validate_streams(self.n_streams)?;
        }
        Ok(())
    }
}
