use thiserror::Error;

/// Result type alias using `SynthMarkError`
pub type Result<T> = std::result::Result<T, SynthMarkError>;

/// Errors raised by the benchmark engine.
///
/// Deadline overruns are deliberately absent: a missed deadline is a measured
/// outcome recorded by the timing analyzer, never an error.
#[derive(Error, Debug)]
pub enum SynthMarkError {
    /// Malformed parameters, rejected before a run starts.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// API misuse, e.g. calling a setter after `run_test` has begun.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The voice renderer could not produce a buffer. Aborts the run early
    /// since no further measurement is meaningful.
    #[error("renderer failed: {0}")]
    RenderFailed(String),
}
