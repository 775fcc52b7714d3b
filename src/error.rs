use thiserror::Error;

/// Error type shared by every stage of the engine.
///
/// The retry adapter consults [`SqlFetchError::is_permanent`] to decide
/// whether another attempt is worthwhile; everything else propagates the
/// variant unchanged to the caller.
#[derive(Debug, Error)]
pub enum SqlFetchError {
    /// The caller violated an API precondition (malformed statement, zero
    /// placeholder counts, non-record flatten input). Never retried.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// The connection or transaction is definitively gone.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// The statement's placeholders and the supplied argument list disagree.
    #[error("argument count mismatch: statement expects {expected}, got {got}")]
    ArgumentCount { expected: usize, got: usize },

    /// The supplied client lacks the capability the statement requires.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Driver-side execution failure. Retried when a policy is configured.
    #[error("SQL execution error: {0}")]
    Execution(String),

    /// A column's raw bytes could not be decoded to its declared type.
    #[error("decode error in column '{column}': {message}")]
    Decode { column: String, message: String },

    /// The structural decoder rejected a row.
    #[error("structural decode error: {0}")]
    Structural(String),

    /// A post-processing hook failed; `index` is the zero-based row.
    #[error("post-processing hook failed for row {index}: {source}")]
    PostProcess {
        index: usize,
        #[source]
        source: Box<SqlFetchError>,
    },

    /// The call's cancellation token fired.
    #[error("operation canceled")]
    Canceled,

    /// Anything that does not fit the variants above.
    #[error("{0}")]
    Other(String),
}

impl SqlFetchError {
    /// Whether this failure should suppress further retry attempts.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::Precondition(_)
                | Self::ConnectionClosed(_)
                | Self::ArgumentCount { .. }
                | Self::Unsupported(_)
                | Self::Canceled
        )
    }
}
