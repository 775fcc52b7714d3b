//! The driver boundary: capability traits for clients and the row cursor.
//!
//! The engine never talks to a concrete driver. A caller hands it a
//! [`ClientHandle`] wrapping whichever capabilities its client implements;
//! the dispatcher raises [`SqlFetchError::Unsupported`] before any I/O when
//! a statement needs a capability the handle lacks.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::column::ColumnDescriptor;
use crate::error::SqlFetchError;
use crate::types::SqlValue;

/// Driver-reported outcome of a mutation statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows affected, as counted by the driver.
    pub rows_affected: u64,
    /// Last inserted row id, when the driver reports one.
    pub last_insert_id: Option<i64>,
}

/// A client able to run INSERT/UPDATE/DELETE statements.
#[async_trait]
pub trait MutationClient: Send {
    async fn execute_mutation(
        &mut self,
        cancel: &CancellationToken,
        sql: &str,
        args: &[SqlValue],
    ) -> Result<ExecResult, SqlFetchError>;
}

/// A client able to run statements that produce a result set.
#[async_trait]
pub trait QueryClient: Send {
    async fn execute_query(
        &mut self,
        cancel: &CancellationToken,
        sql: &str,
        args: &[SqlValue],
    ) -> Result<Box<dyn RowCursor>, SqlFetchError>;
}

/// Iterator over a query's result rows, exclusively owned by the engine
/// during decoding and closed exactly once on every exit path.
#[async_trait]
pub trait RowCursor: Send {
    /// Column metadata for this result set, stable for the cursor's life.
    fn columns(&self) -> &[ColumnDescriptor];

    /// Advance to the next row; `false` means the cursor is exhausted.
    /// The driver's next/err pair is folded into the `Result`.
    async fn advance(&mut self) -> Result<bool, SqlFetchError>;

    /// Copy the current row's raw column buffers into `buffers`, which the
    /// caller sizes to the column count. `None` slots mark NULL cells.
    fn scan_row(&mut self, buffers: &mut [Option<Vec<u8>>]) -> Result<(), SqlFetchError>;

    /// Release the cursor. Called exactly once by the engine.
    async fn close(&mut self) -> Result<(), SqlFetchError>;
}

/// Marker for clients implementing both capabilities.
pub trait SqlClient: MutationClient + QueryClient {}

impl<T: MutationClient + QueryClient> SqlClient for T {}

/// The capability set a caller hands to the engine for one statement.
pub enum ClientHandle<'a> {
    /// Mutation-capable only.
    Mutation(&'a mut (dyn MutationClient + 'a)),
    /// Query-capable only.
    Query(&'a mut (dyn QueryClient + 'a)),
    /// Both capabilities.
    Full(&'a mut (dyn SqlClient + 'a)),
}

impl<'a> ClientHandle<'a> {
    #[must_use]
    pub fn mutation(client: &'a mut (dyn MutationClient + 'a)) -> Self {
        ClientHandle::Mutation(client)
    }

    #[must_use]
    pub fn query(client: &'a mut (dyn QueryClient + 'a)) -> Self {
        ClientHandle::Query(client)
    }

    #[must_use]
    pub fn full(client: &'a mut (dyn SqlClient + 'a)) -> Self {
        ClientHandle::Full(client)
    }

    #[must_use]
    pub fn supports_mutation(&self) -> bool {
        !matches!(self, ClientHandle::Query(_))
    }

    #[must_use]
    pub fn supports_query(&self) -> bool {
        !matches!(self, ClientHandle::Mutation(_))
    }

    pub(crate) async fn run_mutation(
        &mut self,
        cancel: &CancellationToken,
        sql: &str,
        args: &[SqlValue],
    ) -> Result<ExecResult, SqlFetchError> {
        match self {
            ClientHandle::Mutation(client) => client.execute_mutation(cancel, sql, args).await,
            ClientHandle::Full(client) => client.execute_mutation(cancel, sql, args).await,
            ClientHandle::Query(_) => Err(SqlFetchError::Unsupported(
                "client is not mutation-capable".into(),
            )),
        }
    }

    pub(crate) async fn run_query(
        &mut self,
        cancel: &CancellationToken,
        sql: &str,
        args: &[SqlValue],
    ) -> Result<Box<dyn RowCursor>, SqlFetchError> {
        match self {
            ClientHandle::Query(client) => client.execute_query(cancel, sql, args).await,
            ClientHandle::Full(client) => client.execute_query(cancel, sql, args).await,
            ClientHandle::Mutation(_) => Err(SqlFetchError::Unsupported(
                "client is not query-capable".into(),
            )),
        }
    }
}

impl<'a, T: SqlClient> From<&'a mut T> for ClientHandle<'a> {
    fn from(client: &'a mut T) -> Self {
        ClientHandle::Full(client)
    }
}
