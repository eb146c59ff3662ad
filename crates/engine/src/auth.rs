//! Messages for identity-provider failures.
//!
//! Sign-in and sign-up happen at the identity provider; the client only maps
//! the error codes it reports to something a user can act on.

/// Error code reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityErrorCode {
    PasswordIncorrect,
    IdentifierExists,
    Other(String),
}

impl IdentityErrorCode {
    #[must_use]
    pub fn parse(code: &str) -> Self {
        match code.trim() {
            "form_password_incorrect" => Self::PasswordIncorrect,
            "form_identifier_exists" => Self::IdentifierExists,
            other => Self::Other(other.to_string()),
        }
    }

    /// User-facing message for this code.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::PasswordIncorrect => "Password is incorrect. Please try again!",
            Self::IdentifierExists => "This email already exist. Please try another one!",
            Self::Other(_) => "An error occured. Please try again!",
        }
    }
}

/// Name shown in the home header: first name, else the local part of the
/// email address, else `"User"`.
#[must_use]
pub fn display_name(first_name: Option<&str>, email: Option<&str>) -> String {
    if let Some(first) = first_name.map(str::trim).filter(|s| !s.is_empty()) {
        return first.to_string();
    }
    if let Some(local) = email
        .and_then(|email| email.split('@').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return local.to_string();
    }
    "User".to_string()
}
