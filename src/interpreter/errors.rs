//! Runtime error taxonomy.
//!
//! User errors are attributable to the program or its storage inputs and
//! carry a source span. Internal errors are invariant violations that
//! abort execution; a valid program with valid storage can never trigger
//! one.

use thiserror::Error;

use crate::diag::{Span, SpannedError};

#[derive(Debug, Clone, Error)]
pub enum UserErrorKind {
    #[error("assertion failed{}", format_message(.message))]
    AssertionFailed { message: Option<String> },

    #[error("panic{}", format_message(.message))]
    Panic { message: Option<String> },

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow on `{ty}`")]
    Overflow { ty: String },

    #[error("value {value} is out of range for `{ty}`")]
    OutOfRange { ty: String, value: String },

    #[error("forced cast failed: expected `{expected}`, got `{actual}`")]
    ForcedCastFailure { expected: String, actual: String },

    #[error("unexpectedly found nil while force-unwrapping")]
    ForcedNil,

    #[error("index {index} is out of bounds (length {length})")]
    IndexOutOfBounds { index: String, length: usize },

    #[error("storage path {path} is already occupied")]
    StorageSlotOccupied { path: String },

    #[error("loss of resource at runtime")]
    ResourceLoss,

    #[error("{kind} limit exceeded")]
    LimitExceeded { kind: &'static str },

    #[error("value of type `{actual}` cannot be stored")]
    NotStorable { actual: String },
}

fn format_message(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {message}"),
        None => String::new(),
    }
}

impl UserErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            UserErrorKind::AssertionFailed { .. } => "assertion-failed",
            UserErrorKind::Panic { .. } => "panic",
            UserErrorKind::DivisionByZero => "division-by-zero",
            UserErrorKind::Overflow { .. } => "overflow",
            UserErrorKind::OutOfRange { .. } => "out-of-range",
            UserErrorKind::ForcedCastFailure { .. } => "forced-cast-failure",
            UserErrorKind::ForcedNil => "forced-nil",
            UserErrorKind::IndexOutOfBounds { .. } => "index-out-of-bounds",
            UserErrorKind::StorageSlotOccupied { .. } => "storage-slot-occupied",
            UserErrorKind::ResourceLoss => "resource-loss",
            UserErrorKind::LimitExceeded { .. } => "limit-exceeded",
            UserErrorKind::NotStorable { .. } => "not-storable",
        }
    }

    pub fn at(self, span: Span) -> RuntimeError {
        RuntimeError::User(SpannedError::new(self, span))
    }
}

pub type UserError = SpannedError<UserErrorKind>;

/// An invariant violation. Never triggerable by a valid program over valid
/// storage; execution aborts.
#[derive(Debug, Clone, Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    pub message: String,
}

impl InternalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl RuntimeError {
    pub fn internal(message: impl Into<String>) -> Self {
        RuntimeError::Internal(InternalError::new(message))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, RuntimeError::Internal(_))
    }
}
