//! Error types for the recorder engine.
//!
//! `RecorderError` covers precondition violations raised by the workflow.
//! None of them are fatal: the pointer dispatcher turns them into a
//! notification and leaves the session untouched.

use thiserror::Error;

use crate::workflow::WorkflowStep;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecorderError {
    /// Operation not allowed in the current step.
    #[error("cannot {operation} while {step}")]
    OutOfOrder {
        operation: &'static str,
        step: WorkflowStep,
    },

    #[error("select at least one list element first")]
    NothingSelected,

    #[error("the action target cannot be one of the selected list elements")]
    TargetIsExemplar,

    #[error("pick the element the action should run on before saving")]
    NoTarget,

    #[error("invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },
}

/// Failure while acting on a single replay target.
#[derive(Error, Debug)]
pub enum ActionError {
    /// The element is no longer part of the document.
    #[error("element is no longer attached to the document")]
    Detached,

    #[error(transparent)]
    Host(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RecorderError>;
