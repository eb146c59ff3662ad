//! Data layer of the Kudi client.
//!
//! - [`ApiClient`] builds authenticated requests against the transaction API.
//! - [`QueryCache`] keeps fetched data keyed by request parameters, with
//!   staleness, retries, coalescing and persistence.
//! - [`Transactions`] ties both together for one user: list, create, delete.

pub use api::ApiClient;
pub use cache::{
    FileStorage, MemoryStorage, Persister, QueryCache, QueryKey, QueryOptions, QueryState,
    QueryStatus, Storage,
};
pub use error::ClientError;
pub use token::{CommandToken, StaticToken, TokenError, TokenProvider};
pub use tokio_util::sync::CancellationToken;
pub use transactions::{Transactions, transactions_key};

mod api;
pub mod cache;
mod error;
mod token;
mod transactions;
