// src/error.rs

use thiserror::Error;

use crate::process::{NormalizeError, PeriodError, ReconcileError};

/// Why one document was not written. Each variant names the stage that
/// failed; the orchestrator logs it and moves on to the next document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("{label}: table extraction failed: {error:#}")]
    Extract { label: String, error: anyhow::Error },

    #[error("{label}: {source}")]
    Reconcile {
        label: String,
        #[source]
        source: ReconcileError,
    },

    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error("{label}: {source}")]
    Normalize {
        label: String,
        #[source]
        source: NormalizeError,
    },

    #[error("{label}: writing artifact failed: {error:#}")]
    Store { label: String, error: anyhow::Error },

    #[error("{label}: worker task failed: {message}")]
    Join { label: String, message: String },
}

impl DocumentError {
    /// Short stage name, used as a structured log field.
    pub fn stage(&self) -> &'static str {
        match self {
            DocumentError::Extract { .. } => "extract",
            DocumentError::Reconcile { .. } => "reconcile",
            DocumentError::Period(_) => "period",
            DocumentError::Normalize { .. } => "normalize",
            DocumentError::Store { .. } => "store",
            DocumentError::Join { .. } => "join",
        }
    }
}
