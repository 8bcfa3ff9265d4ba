//! Error types for the `coro-probe` crate

/// Errors reported by table construction, probes and interleaved drivers.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The reserved sentinel key was passed as a real key.
    ///
    /// The sentinel marks empty slots, so it can neither be stored nor
    /// probed. This is a caller defect and is checked in every build
    /// profile.
    #[error("the sentinel key is reserved for empty slots and cannot be inserted or probed")]
    SentinelKey,

    /// The requested stream count is outside `1..=max`.
    #[error("n_streams must be within 1..={max}, got {n_streams}")]
    InvalidStreams {
        /// Stream count that was requested.
        n_streams: usize,
        /// Largest supported stream count.
        max: usize,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
