//! Errors raised by the domain rules.
//!
//! Form validation does not use these: it reports every field at once
//! through [`FormErrors`](crate::FormErrors).
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}
