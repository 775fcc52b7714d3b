//! Post-processing fan-out: the per-record hook stage.

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::SqlFetchError;

/// Optional post-materialization hook on a target record shape.
///
/// The capability is resolved once per call through [`AfterFetch::ACTIVE`]:
/// the default implementation is inert, and a shape that wants the hook
/// overrides both the constant and the method. Hooks may mutate their own
/// record but must not assume any other record has been visited.
///
/// ```rust
/// use async_trait::async_trait;
/// use sql_fetch::prelude::*;
/// use tokio_util::sync::CancellationToken;
///
/// struct Account {
///     balance_cents: i64,
///     display: String,
/// }
///
/// #[async_trait]
/// impl AfterFetch for Account {
///     const ACTIVE: bool = true;
///
///     async fn after_fetch(
///         &mut self,
///         _cancel: &CancellationToken,
///         _index: usize,
///         _total: usize,
///     ) -> Result<(), SqlFetchError> {
///         self.display = format!("{:.2}", self.balance_cents as f64 / 100.0);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait AfterFetch {
    /// Whether the hook should run at all. Checked once per call.
    const ACTIVE: bool = false;

    /// Invoked once per record after the whole result set is materialized.
    /// `index` is the zero-based row, `total` the full row count.
    async fn after_fetch(
        &mut self,
        cancel: &CancellationToken,
        index: usize,
        total: usize,
    ) -> Result<(), SqlFetchError> {
        let _ = (cancel, index, total);
        Ok(())
    }
}

/// Run the hook stage over all records, sequentially or concurrently.
/// Returns the records in row order; any hook failure aborts with the
/// originating row index attached.
pub(crate) async fn run_hooks<T>(
    cancel: &CancellationToken,
    records: Vec<T>,
    concurrent: bool,
) -> Result<Vec<T>, SqlFetchError>
where
    T: AfterFetch + Send + 'static,
{
    if !T::ACTIVE || records.is_empty() {
        return Ok(records);
    }
    // Concurrent mode only pays off with more than one worker to run on.
    if concurrent && tokio::runtime::Handle::current().metrics().num_workers() > 1 {
        run_concurrent(cancel, records).await
    } else {
        run_sequential(cancel, records).await
    }
}

async fn run_sequential<T>(
    cancel: &CancellationToken,
    mut records: Vec<T>,
) -> Result<Vec<T>, SqlFetchError>
where
    T: AfterFetch + Send,
{
    let total = records.len();
    for (index, record) in records.iter_mut().enumerate() {
        if cancel.is_cancelled() {
            return Err(SqlFetchError::Canceled);
        }
        if let Err(err) = record.after_fetch(cancel, index, total).await {
            return Err(SqlFetchError::PostProcess {
                index,
                source: Box::new(err),
            });
        }
    }
    Ok(records)
}

async fn run_concurrent<T>(
    cancel: &CancellationToken,
    records: Vec<T>,
) -> Result<Vec<T>, SqlFetchError>
where
    T: AfterFetch + Send + 'static,
{
    let total = records.len();
    let scope = cancel.child_token();
    let mut tasks = JoinSet::new();
    for (index, mut record) in records.into_iter().enumerate() {
        let scope = scope.clone();
        tasks.spawn(async move {
            if scope.is_cancelled() {
                return (index, record, Err(SqlFetchError::Canceled));
            }
            let result = record.after_fetch(&scope, index, total).await;
            (index, record, result)
        });
    }

    let mut finished: Vec<(usize, T)> = Vec::with_capacity(total);
    let mut first_error: Option<SqlFetchError> = None;
    let mut saw_cancellation = false;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, record, Ok(()))) => finished.push((index, record)),
            Ok((_index, _record, Err(SqlFetchError::Canceled))) => {
                saw_cancellation = true;
                scope.cancel();
            }
            Ok((index, _record, Err(err))) => {
                scope.cancel();
                if first_error.is_none() {
                    first_error = Some(SqlFetchError::PostProcess {
                        index,
                        source: Box::new(err),
                    });
                }
            }
            Err(join_err) => {
                scope.cancel();
                if first_error.is_none() {
                    first_error = Some(SqlFetchError::Execution(format!(
                        "post-processing task failed: {join_err}"
                    )));
                }
            }
        }
    }
    if let Some(err) = first_error {
        return Err(err);
    }
    if saw_cancellation || cancel.is_cancelled() {
        return Err(SqlFetchError::Canceled);
    }
    finished.sort_by_key(|(index, _)| *index);
    Ok(finished.into_iter().map(|(_, record)| record).collect())
}
