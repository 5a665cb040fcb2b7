//! Error types for the pixel art generation pipeline.

use thiserror::Error;

/// Pipeline-wide error taxonomy.
///
/// `Config` aborts a run before any remote call. `UnresolvedDependency` and
/// the remote-call variants are collected per unit/task and reported in the
/// run summary without halting sibling work. `Io` is fatal for the affected
/// task only.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unresolved dependency for {unit}: {reason}")]
    UnresolvedDependency { unit: String, reason: String },

    #[error("API authentication failed: {0}")]
    AuthFailed(String),

    #[error("API rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned status {status}: {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Assembly failed for {unit}: {reason}")]
    Assembly { unit: String, reason: String },

    #[error("Generation failed: {0}")]
    GenerationFailed(String),
}

impl PipelineError {
    /// True for errors raised by the remote generation API rather than by
    /// local state. Used by the executor to decide logging detail.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            PipelineError::AuthFailed(_)
                | PipelineError::RateLimited(_)
                | PipelineError::RequestFailed(_)
                | PipelineError::RemoteStatus { .. }
        )
    }
}
