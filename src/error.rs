//! Error types for the panel pipeline.
//!
//! Degraded routing has no variant here: it is an advisory flag on
//! [`crate::routing::RoutingOutcome`], never an error.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::llms::LlmError;
use crate::specialists::RegistryError;
use crate::task::UnitKind;

/// Top-level error for one panel request.
#[derive(Debug, Error)]
pub enum PanelError {
    /// The inbound message was empty or whitespace only.
    #[error("message is empty; nothing to route")]
    InputEmpty,

    /// The unit graph violates its ordering invariants. Indicates a builder bug.
    #[error("task graph defect at unit '{unit_id}': {reason}")]
    GraphConstructionDefect { unit_id: String, reason: String },

    /// A unit's generation call failed, timed out or produced no text.
    #[error("{kind} unit '{unit_id}'{} failed: {reason}", owner_suffix(.specialist))]
    UnitExecution {
        unit_id: String,
        kind: UnitKind,
        specialist: Option<String>,
        reason: String,
    },

    /// The routing call itself could not be completed.
    #[error("router failed: {reason}")]
    RouterFailure { reason: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A generation backend could not be set up.
    #[error("generation backend unavailable: {0}")]
    Generator(#[from] LlmError),

    /// Writing the response artifact failed.
    #[error("failed to persist panel response to {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PanelError {
    pub(crate) fn defect(unit_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GraphConstructionDefect {
            unit_id: unit_id.into(),
            reason: reason.into(),
        }
    }

    /// Id of the unit the error is attributed to, if any.
    pub fn unit_id(&self) -> Option<&str> {
        match self {
            Self::GraphConstructionDefect { unit_id, .. } | Self::UnitExecution { unit_id, .. } => {
                Some(unit_id)
            }
            _ => None,
        }
    }
}

fn owner_suffix(specialist: &Option<String>) -> String {
    match specialist {
        Some(id) => format!(" (specialist '{}')", id),
        None => String::new(),
    }
}
