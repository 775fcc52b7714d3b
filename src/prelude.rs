//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::args::{SqlArg, flatten_args, record_args};
pub use crate::classify::{StatementKind, classify_statement};
pub use crate::client::{
    ClientHandle, ExecResult, MutationClient, QueryClient, RowCursor, SqlClient,
};
pub use crate::column::{ColumnDescriptor, IntWidth, Nullability};
pub use crate::error::SqlFetchError;
pub use crate::fanout::AfterFetch;
pub use crate::fetch::{FetchBuilder, FetchOptions, PostFetch, StatementResult, statement};
pub use crate::materialize::{DecodeConfig, DecodeHook};
pub use crate::placeholders::{Dialect, insert_into, placeholders};
pub use crate::retry::RetryPolicy;
pub use crate::row::{RawRow, SqlRow};
pub use crate::types::SqlValue;
