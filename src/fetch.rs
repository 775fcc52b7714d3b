//! Statement dispatch and the fluent execution surface.
//!
//! [`statement`] starts a builder; finishers classify the SQL, route it
//! through the exec or query path behind the retry adapter, decode rows,
//! optionally materialize typed records, and run the post-processing
//! hook stage.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tokio_util::sync::CancellationToken;

use crate::args::{SqlArg, flatten_args};
use crate::classify::{StatementKind, classify_statement};
use crate::client::{ClientHandle, ExecResult, RowCursor};
use crate::decode::{decode_column, raw_to_string_value};
use crate::error::SqlFetchError;
use crate::fanout::{AfterFetch, run_hooks};
use crate::materialize::{DecodeConfig, materialize};
use crate::retry::{RetryPolicy, run_with_retry};
use crate::row::{RawRow, SqlRow};
use crate::types::SqlValue;

/// Callback invoked after rows are decoded and materialized, before the
/// hook stage. Typically releases a pooled resource.
pub type PostFetch = Arc<dyn Fn(&CancellationToken) -> Result<(), SqlFetchError> + Send + Sync>;

/// Per-call configuration. Constructed through the builder, read-only
/// during the call, never persisted.
#[derive(Clone, Default)]
pub struct FetchOptions {
    /// Backoff schedule; absent means exactly one attempt.
    pub retry: Option<RetryPolicy>,
    /// Structural-decoder configuration for typed finishers.
    pub decode: DecodeConfig,
    /// Run `AfterFetch` hooks on concurrent tasks instead of in row order.
    pub concurrent_hooks: bool,
    /// Invoked once after materialization, before hooks.
    pub post_fetch: Option<PostFetch>,
}

/// What [`FetchBuilder::run`] produced, decided by classification.
#[derive(Debug)]
pub enum StatementResult {
    /// The statement was a mutation; the driver's execution handle.
    Exec(ExecResult),
    /// The statement was a query; the decoded canonical rows.
    Rows(Vec<SqlRow>),
}

/// Start a builder for one statement against `client`.
pub fn statement<'a>(client: impl Into<ClientHandle<'a>>, sql: &'a str) -> FetchBuilder<'a> {
    FetchBuilder::new(client, sql)
}

/// Fluent builder carrying one statement, its arguments, and the per-call
/// options through dispatch.
pub struct FetchBuilder<'a> {
    client: ClientHandle<'a>,
    sql: Cow<'a, str>,
    args: Vec<SqlArg>,
    cancel: CancellationToken,
    options: FetchOptions,
}

impl<'a> FetchBuilder<'a> {
    #[must_use]
    pub fn new(client: impl Into<ClientHandle<'a>>, sql: &'a str) -> Self {
        Self {
            client: client.into(),
            sql: Cow::Borrowed(sql),
            args: Vec::new(),
            cancel: CancellationToken::new(),
            options: FetchOptions::default(),
        }
    }

    /// Append one argument. Sequence arguments expand in place when the
    /// statement runs.
    #[must_use]
    pub fn bind(mut self, arg: impl Into<SqlArg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments at once.
    #[must_use]
    pub fn bind_all<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<SqlArg>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Retry transient failures on this schedule.
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.options.retry = Some(policy);
        self
    }

    /// Bind the call to a caller-owned cancellation token.
    #[must_use]
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Configure the structural decoder for typed finishers.
    #[must_use]
    pub fn decode_config(mut self, config: DecodeConfig) -> Self {
        self.options.decode = config;
        self
    }

    /// Invoke `callback` once after materialization, before hooks.
    #[must_use]
    pub fn post_fetch(mut self, callback: PostFetch) -> Self {
        self.options.post_fetch = Some(callback);
        self
    }

    /// Run `AfterFetch` hooks concurrently. Only takes effect when the
    /// runtime has more than one worker.
    #[must_use]
    pub fn concurrent_hooks(mut self, enabled: bool) -> Self {
        self.options.concurrent_hooks = enabled;
        self
    }

    /// Classify the statement and route it: mutations return the exec
    /// handle, queries return decoded canonical rows.
    ///
    /// # Errors
    ///
    /// Propagates classification, capability, execution, and decode errors.
    pub async fn run(mut self) -> Result<StatementResult, SqlFetchError> {
        match classify_statement(&self.sql)? {
            StatementKind::Mutation => Ok(StatementResult::Exec(self.run_exec().await?)),
            StatementKind::Query => {
                let rows = self.run_canonical().await?;
                self.run_post_fetch()?;
                Ok(StatementResult::Rows(rows))
            }
        }
    }

    /// Run a mutation and return the driver's execution handle.
    ///
    /// # Errors
    ///
    /// Returns [`SqlFetchError::Precondition`] when the statement
    /// classifies as a query.
    pub async fn execute(mut self) -> Result<ExecResult, SqlFetchError> {
        match classify_statement(&self.sql)? {
            StatementKind::Mutation => self.run_exec().await,
            StatementKind::Query => Err(SqlFetchError::Precondition(
                "statement classifies as a query; use a fetch finisher".into(),
            )),
        }
    }

    /// Run a query and return every row as a canonical value map.
    ///
    /// # Errors
    ///
    /// Returns [`SqlFetchError::Precondition`] when the statement
    /// classifies as a mutation.
    pub async fn fetch_rows(mut self) -> Result<Vec<SqlRow>, SqlFetchError> {
        self.expect_query()?;
        let rows = self.run_canonical().await?;
        self.run_post_fetch()?;
        Ok(rows)
    }

    /// Run a query expected to yield at most one row. Zero rows is `None`,
    /// never an error; extra rows beyond the first are dropped.
    ///
    /// # Errors
    ///
    /// Same as [`FetchBuilder::fetch_rows`].
    pub async fn fetch_one(self) -> Result<Option<SqlRow>, SqlFetchError> {
        Ok(self.fetch_rows().await?.into_iter().next())
    }

    /// Run a query and hand back every row's untouched driver buffers,
    /// bypassing all decoding.
    ///
    /// # Errors
    ///
    /// Same as [`FetchBuilder::fetch_rows`].
    pub async fn fetch_raw(mut self) -> Result<Vec<RawRow>, SqlFetchError> {
        self.expect_query()?;
        let DecodedRows::Raw(rows) = self.run_query_path(RowMode::Raw).await? else {
            unreachable!("raw mode always produces raw rows")
        };
        self.run_post_fetch()?;
        Ok(rows)
    }

    /// Run a query and materialize every row into `T` through the
    /// structural decoder, then run the `AfterFetch` stage.
    ///
    /// # Errors
    ///
    /// A structural failure on any row aborts the whole call; hook errors
    /// surface wrapped with the offending row index.
    pub async fn fetch_as<T>(mut self) -> Result<Vec<T>, SqlFetchError>
    where
        T: DeserializeOwned + AfterFetch + Send + 'static,
    {
        self.expect_query()?;
        let DecodedRows::Strings(rows) = self.run_query_path(RowMode::Strings).await? else {
            unreachable!("string mode always produces string maps")
        };
        let mut records = Vec::with_capacity(rows.len());
        for fields in rows {
            records.push(materialize::<T>(fields, &self.options.decode)?);
        }
        self.run_post_fetch()?;
        run_hooks(&self.cancel, records, self.options.concurrent_hooks).await
    }

    /// Typed single-result finisher: zero rows is `None`, one row is the
    /// record itself.
    ///
    /// # Errors
    ///
    /// Same as [`FetchBuilder::fetch_as`].
    pub async fn fetch_one_as<T>(self) -> Result<Option<T>, SqlFetchError>
    where
        T: DeserializeOwned + AfterFetch + Send + 'static,
    {
        Ok(self.fetch_as().await?.into_iter().next())
    }

    fn expect_query(&self) -> Result<(), SqlFetchError> {
        match classify_statement(&self.sql)? {
            StatementKind::Query => Ok(()),
            StatementKind::Mutation => Err(SqlFetchError::Precondition(
                "statement classifies as a mutation; use execute()".into(),
            )),
        }
    }

    async fn run_exec(&mut self) -> Result<ExecResult, SqlFetchError> {
        if !self.client.supports_mutation() {
            return Err(SqlFetchError::Unsupported(
                "client is not mutation-capable".into(),
            ));
        }
        tracing::debug!(sql = %self.sql, "dispatching mutation");
        let args = flatten_args(std::mem::take(&mut self.args));
        let mut attempt = Attempt {
            client: &mut self.client,
            cancel: &self.cancel,
            sql: &self.sql,
            args: &args,
        };
        run_with_retry(&self.cancel, self.options.retry.as_ref(), &mut attempt, |ctx| {
            Box::pin(ctx.client.run_mutation(ctx.cancel, ctx.sql, ctx.args))
        })
        .await
    }

    async fn run_canonical(&mut self) -> Result<Vec<SqlRow>, SqlFetchError> {
        let DecodedRows::Canonical(rows) = self.run_query_path(RowMode::Canonical).await? else {
            unreachable!("canonical mode always produces canonical rows")
        };
        Ok(rows)
    }

    async fn run_query_path(&mut self, mode: RowMode) -> Result<DecodedRows, SqlFetchError> {
        if !self.client.supports_query() {
            return Err(SqlFetchError::Unsupported(
                "client is not query-capable".into(),
            ));
        }
        tracing::debug!(sql = %self.sql, "dispatching query");
        let args = flatten_args(std::mem::take(&mut self.args));
        let mut cursor = {
            let mut attempt = Attempt {
                client: &mut self.client,
                cancel: &self.cancel,
                sql: &self.sql,
                args: &args,
            };
            run_with_retry(&self.cancel, self.options.retry.as_ref(), &mut attempt, |ctx| {
                Box::pin(ctx.client.run_query(ctx.cancel, ctx.sql, ctx.args))
            })
            .await?
        };
        // The cursor must be released on every exit path, even when
        // decoding fails partway through a row.
        let decoded = drain_cursor(cursor.as_mut(), mode).await;
        let closed = cursor.close().await;
        let decoded = decoded?;
        closed?;
        Ok(decoded)
    }

    fn run_post_fetch(&self) -> Result<(), SqlFetchError> {
        if let Some(callback) = &self.options.post_fetch {
            if self.cancel.is_cancelled() {
                return Err(SqlFetchError::Canceled);
            }
            callback(&self.cancel)?;
        }
        Ok(())
    }
}

/// Borrowed context for one retryable attempt; keeps the retry adapter's
/// closure free of captured state.
struct Attempt<'a, 'b> {
    client: &'a mut ClientHandle<'b>,
    cancel: &'a CancellationToken,
    sql: &'a str,
    args: &'a [SqlValue],
}

enum RowMode {
    Canonical,
    Raw,
    Strings,
}

enum DecodedRows {
    Canonical(Vec<SqlRow>),
    Raw(Vec<RawRow>),
    Strings(Vec<JsonMap<String, JsonValue>>),
}

async fn drain_cursor(
    cursor: &mut dyn RowCursor,
    mode: RowMode,
) -> Result<DecodedRows, SqlFetchError> {
    let columns = cursor.columns().to_vec();
    let names: Arc<Vec<String>> =
        Arc::new(columns.iter().map(|column| column.name.clone()).collect());
    let index: Arc<HashMap<String, usize>> = Arc::new(
        names
            .iter()
            .enumerate()
            .map(|(position, name)| (name.clone(), position))
            .collect(),
    );
    let mut out = match mode {
        RowMode::Canonical => DecodedRows::Canonical(Vec::new()),
        RowMode::Raw => DecodedRows::Raw(Vec::new()),
        RowMode::Strings => DecodedRows::Strings(Vec::new()),
    };
    while cursor.advance().await? {
        let mut buffers: Vec<Option<Vec<u8>>> = vec![None; columns.len()];
        cursor.scan_row(&mut buffers)?;
        match &mut out {
            DecodedRows::Canonical(rows) => {
                let mut values = Vec::with_capacity(columns.len());
                for (column, raw) in columns.iter().zip(&buffers) {
                    values.push(decode_column(column, raw.as_deref())?);
                }
                rows.push(SqlRow::new(Arc::clone(&names), Arc::clone(&index), values));
            }
            DecodedRows::Raw(rows) => {
                rows.push(RawRow::new(Arc::clone(&names), buffers));
            }
            DecodedRows::Strings(rows) => {
                let mut fields = JsonMap::with_capacity(columns.len());
                for (column, raw) in columns.iter().zip(&buffers) {
                    fields.insert(column.name.clone(), raw_to_string_value(raw.as_deref()));
                }
                rows.push(fields);
            }
        }
    }
    Ok(out)
}
