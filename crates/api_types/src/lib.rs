//! Wire types of the transaction REST API.

pub mod transaction {
    use engine::{Category, Money};
    use serde::{Deserialize, Serialize};

    /// Path of the transaction resource, relative to the API base URL.
    pub const RESOURCE_PATH: [&str; 3] = ["api", "v1", "transaction"];

    /// A transaction as returned by `GET /api/v1/transaction/{userId}`.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Transaction {
        #[serde(rename = "_id", alias = "id")]
        pub id: String,
        pub user_id: String,
        pub title: String,
        /// Signed amount: negative for expenses, positive for income.
        pub amount: Money,
        pub category: Category,
        #[serde(default)]
        pub description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub date: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub created_at: Option<String>,
    }

    impl Transaction {
        #[must_use]
        pub fn is_income(&self) -> bool {
            self.amount.is_positive()
        }

        /// Timestamp to display: `date` when present, else `createdAt`.
        #[must_use]
        pub fn timestamp(&self) -> Option<&str> {
            self.date.as_deref().or(self.created_at.as_deref())
        }

        /// Description, if it carries any text.
        #[must_use]
        pub fn description(&self) -> Option<&str> {
            self.description
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
        }
    }

    /// Request body of `POST /api/v1/transaction`.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionNew {
        pub user_id: String,
        pub title: String,
        pub amount: Money,
        pub category: Category,
        /// Empty string when the user left it blank.
        #[serde(default)]
        pub description: String,
    }

    impl TransactionNew {
        #[must_use]
        pub fn from_valid(user_id: &str, valid: engine::ValidTransaction) -> Self {
            Self {
                user_id: user_id.to_string(),
                title: valid.title,
                amount: valid.amount,
                category: valid.category,
                description: valid.description.unwrap_or_default(),
            }
        }
    }
}

/// Error body returned by the API on failure.
///
/// Servers disagree on the field name, so both are accepted.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ErrorResponse {
    #[serde(alias = "message")]
    pub error: String,
}
