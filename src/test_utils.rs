//! In-memory mock client and cursor for driving the engine in tests.
//!
//! `MockClient` queues canned exec/query outcomes, records the statement
//! and flattened arguments it received, and counts attempts and cursor
//! closes so tests can assert on retry and release behavior.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::client::{ExecResult, MutationClient, QueryClient, RowCursor};
use crate::column::ColumnDescriptor;
use crate::error::SqlFetchError;
use crate::types::SqlValue;

/// One queued result set: column metadata plus raw row buffers.
#[derive(Debug, Clone)]
pub struct MockResultSet {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<Option<Vec<u8>>>>,
}

/// Convenience for building raw cell buffers.
#[must_use]
pub fn cell(text: &str) -> Option<Vec<u8>> {
    Some(text.as_bytes().to_vec())
}

/// A NULL cell.
#[must_use]
pub fn null_cell() -> Option<Vec<u8>> {
    None
}

#[derive(Default)]
struct Recorded {
    sql: Option<String>,
    args: Vec<SqlValue>,
}

/// Scripted client implementing both capabilities.
#[derive(Default)]
pub struct MockClient {
    exec_outcomes: VecDeque<Result<ExecResult, SqlFetchError>>,
    query_outcomes: VecDeque<Result<MockResultSet, SqlFetchError>>,
    exec_attempts: Arc<AtomicUsize>,
    query_attempts: Arc<AtomicUsize>,
    close_count: Arc<AtomicUsize>,
    fail_scan_at: Option<usize>,
    fail_close: bool,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an exec-path outcome; outcomes are consumed in order, one per
    /// attempt.
    pub fn queue_exec(&mut self, outcome: Result<ExecResult, SqlFetchError>) {
        self.exec_outcomes.push_back(outcome);
    }

    /// Queue a query-path result set.
    pub fn queue_rows(&mut self, columns: Vec<ColumnDescriptor>, rows: Vec<Vec<Option<Vec<u8>>>>) {
        self.query_outcomes
            .push_back(Ok(MockResultSet { columns, rows }));
    }

    /// Queue a query-path failure.
    pub fn queue_query_error(&mut self, error: SqlFetchError) {
        self.query_outcomes.push_back(Err(error));
    }

    /// Make `scan_row` fail at the given zero-based row on every cursor
    /// this client produces.
    pub fn fail_scan_at(&mut self, row: usize) {
        self.fail_scan_at = Some(row);
    }

    /// Make `close` report an error (it is still counted).
    pub fn fail_close(&mut self) {
        self.fail_close = true;
    }

    #[must_use]
    pub fn exec_attempts(&self) -> usize {
        self.exec_attempts.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn query_attempts(&self) -> usize {
        self.query_attempts.load(Ordering::SeqCst)
    }

    /// How many cursors produced by this client have been closed.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    /// A handle to the close counter, usable after the client is consumed.
    #[must_use]
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.close_count)
    }

    /// The statement text most recently received.
    #[must_use]
    pub fn last_sql(&self) -> Option<String> {
        self.recorded.lock().ok()?.sql.clone()
    }

    /// The flattened arguments most recently received.
    #[must_use]
    pub fn last_args(&self) -> Vec<SqlValue> {
        self.recorded
            .lock()
            .map(|recorded| recorded.args.clone())
            .unwrap_or_default()
    }

    fn record(&self, sql: &str, args: &[SqlValue]) {
        if let Ok(mut recorded) = self.recorded.lock() {
            recorded.sql = Some(sql.to_string());
            recorded.args = args.to_vec();
        }
    }
}

#[async_trait]
impl MutationClient for MockClient {
    async fn execute_mutation(
        &mut self,
        _cancel: &CancellationToken,
        sql: &str,
        args: &[SqlValue],
    ) -> Result<ExecResult, SqlFetchError> {
        self.exec_attempts.fetch_add(1, Ordering::SeqCst);
        self.record(sql, args);
        self.exec_outcomes.pop_front().unwrap_or_else(|| {
            Err(SqlFetchError::Other("no queued exec outcome".into()))
        })
    }
}

#[async_trait]
impl QueryClient for MockClient {
    async fn execute_query(
        &mut self,
        _cancel: &CancellationToken,
        sql: &str,
        args: &[SqlValue],
    ) -> Result<Box<dyn RowCursor>, SqlFetchError> {
        self.query_attempts.fetch_add(1, Ordering::SeqCst);
        self.record(sql, args);
        let result_set = self.query_outcomes.pop_front().unwrap_or_else(|| {
            Err(SqlFetchError::Other("no queued query outcome".into()))
        })?;
        Ok(Box::new(MockCursor {
            columns: result_set.columns,
            rows: result_set.rows.into(),
            current: None,
            position: None,
            fail_scan_at: self.fail_scan_at,
            fail_close: self.fail_close,
            close_count: Arc::clone(&self.close_count),
        }))
    }
}

/// Cursor over a queued result set, with scan/close failure injection.
pub struct MockCursor {
    columns: Vec<ColumnDescriptor>,
    rows: VecDeque<Vec<Option<Vec<u8>>>>,
    current: Option<Vec<Option<Vec<u8>>>>,
    position: Option<usize>,
    fail_scan_at: Option<usize>,
    fail_close: bool,
    close_count: Arc<AtomicUsize>,
}

#[async_trait]
impl RowCursor for MockCursor {
    fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    async fn advance(&mut self) -> Result<bool, SqlFetchError> {
        match self.rows.pop_front() {
            Some(row) => {
                self.current = Some(row);
                self.position = Some(self.position.map_or(0, |position| position + 1));
                Ok(true)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }

    fn scan_row(&mut self, buffers: &mut [Option<Vec<u8>>]) -> Result<(), SqlFetchError> {
        if let (Some(fail_at), Some(position)) = (self.fail_scan_at, self.position) {
            if position == fail_at {
                return Err(SqlFetchError::Execution(format!(
                    "scan failed at row {position}"
                )));
            }
        }
        let Some(current) = self.current.take() else {
            return Err(SqlFetchError::Execution(
                "scan_row called before advance".into(),
            ));
        };
        for (slot, value) in buffers.iter_mut().zip(current) {
            *slot = value;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SqlFetchError> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(SqlFetchError::Execution("close failed".into()));
        }
        Ok(())
    }
}
