//! Resilient statement execution and typed row materialization for SQL
//! database clients.
//!
//! This crate sits between application code and a SQL driver: hand it a
//! statement and positional arguments, and it classifies the statement
//! onto the exec or query path, retries transient failures on a backoff
//! schedule, decodes raw column buffers into typed values with
//! driver-honest null handling, and optionally materializes rows into
//! serde records with a post-processing hook stage.
//!
//! The driver itself stays behind the [`client`] capability traits; this
//! crate never opens connections or manages transactions.
//!
//! ```rust,no_run
//! use serde::Deserialize;
//! use sql_fetch::prelude::*;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! impl AfterFetch for User {}
//!
//! # async fn demo(client: &mut (impl MutationClient + QueryClient)) -> Result<(), SqlFetchError> {
//! let users: Vec<User> = statement(client, "SELECT id, name FROM users WHERE org = $1")
//!     .bind(42i64)
//!     .retry(RetryPolicy::exponential(std::time::Duration::from_millis(50)).with_max_attempts(3))
//!     .fetch_as()
//!     .await?;
//! # let _ = users;
//! # Ok(()) }
//! ```

pub mod args;
pub mod classify;
pub mod client;
pub mod column;
pub mod error;
pub mod fanout;
pub mod fetch;
pub mod materialize;
pub mod placeholders;
pub mod prelude;
pub mod retry;
pub mod row;
pub mod types;

mod decode;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use error::SqlFetchError;
pub use fetch::{FetchBuilder, FetchOptions, StatementResult, statement};
