use kwrank_probe::ProbeError;
use thiserror::Error;

/// Errors that reject a whole batch before any probe is scheduled.
///
/// Per-candidate failures never surface here; they are carried on the
/// candidate's [`crate::ValidationResult`].
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("batch has no candidate keywords")]
    EmptyCandidates,

    #[error("target id must not be blank")]
    MissingTargetId,

    #[error("invalid batch option: {0}")]
    InvalidOption(String),

    #[error("probe setup failed: {0}")]
    Probe(#[from] ProbeError),
}
