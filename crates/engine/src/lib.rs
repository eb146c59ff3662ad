//! Client-side domain rules for Kudi.
//!
//! Nothing in here talks to the network: the crate owns the money type, the
//! category set and its icons, transaction form validation, the balance
//! summary and the small formatting helpers used by the front end.

pub use auth::{IdentityErrorCode, display_name};
pub use category::{Category, Icon};
pub use date::format_date;
pub use error::EngineError;
pub use form::{
    DESCRIPTION_MAX_CHARS, FormErrors, FormField, TITLE_MAX_CHARS, TransactionForm,
    TransactionKind, ValidTransaction,
};
pub use money::Money;
pub use summary::Summary;

pub mod auth;
mod category;
mod date;
mod error;
pub mod form;
mod money;
mod summary;
