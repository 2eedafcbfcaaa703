//! Error taxonomy for the decision pipeline.
//!
//! None of these errors is fatal to a session. The worst outcome of any of
//! them is "no decision generated this cycle" and narration continues.

use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Errors from parsing, validating, and generating decisions.
#[derive(Debug, Error)]
pub enum DecisionError {
    /// Structurally malformed model output (bad JSON, unterminated list).
    #[error("failed to parse model output: {0}")]
    Parsing(String),

    /// Structurally valid but semantically incomplete payload.
    #[error("invalid decision payload: {0}")]
    Validation(String),

    /// Request quota exhausted. Carries the reset time when the server
    /// has reported one; the caller decides whether to wait.
    #[error("rate limit exhausted (resets at {reset_at:?})")]
    RateLimited { reset_at: Option<SystemTime> },

    /// Transport-level failure from the AI client.
    #[error("AI request failed: {0}")]
    Request(#[from] openai::Error),

    /// The AI client did not answer within the configured deadline.
    #[error("AI request timed out after {0:?}")]
    Timeout(Duration),
}

impl DecisionError {
    /// Whether the caller may reasonably retry after this error.
    ///
    /// Parse and validation failures come from a non-deterministic
    /// generator, so retrying them blindly is a caller decision too; this
    /// only distinguishes the transport-level cases where a retry with
    /// backoff is ordinarily safe.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Timeout(_))
    }
}
