//! Error types and result definitions for apply operations.
//!
//! Provides a kind-classified error type with captured diagnostic metadata.
//! [`ApplyError`] carries a static description, optional dynamic detail and
//! the originating source error, so channel-level failures reach the caller
//! as one uniform representation without losing the underlying cause.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for apply operations using [`ApplyError`] as the error type.
pub type ApplyResult<T> = Result<T, ApplyError>;

/// Main error type for apply operations.
#[derive(Debug, Clone)]
pub struct ApplyError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

/// Specific categories of errors that can occur while applying change events.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Streaming channel errors
    ChannelOpenFailed,
    ChannelWriteFailed,
    ChannelFlushFailed,
    ChannelCompletionFailed,
    ChannelAbortFailed,

    // Data & transformation errors
    EncodingError,
    ConversionError,

    // Statement application errors
    QueryFailed,
    ConnectionFailed,
    ValidationError,

    // Configuration & workflow errors
    ConfigError,
    InvalidState,

    // Unknown / uncategorized
    Unknown,
}

impl ApplyError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the
    /// modified instance.
    ///
    /// The stored source is preserved across clones and exposed via
    /// [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Creates an [`ApplyError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        ApplyError {
            kind,
            description,
            detail,
            source,
            location: Location::caller(),
        }
    }
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        if let Some(detail) = self.detail.as_deref() {
            write!(f, "\n  Detail: {detail}")?;
        }

        Ok(())
    }
}

impl error::Error for ApplyError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates an [`ApplyError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for ApplyError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> ApplyError {
        ApplyError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates an [`ApplyError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for ApplyError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> ApplyError {
        ApplyError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`ApplyError`] with [`ErrorKind::Unknown`]
/// unless the channel layer wraps it with a more precise kind.
impl From<std::io::Error> for ApplyError {
    #[track_caller]
    fn from(err: std::io::Error) -> ApplyError {
        let detail = err.to_string();
        let source = Arc::new(err);
        ApplyError::from_components(
            ErrorKind::Unknown,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`std::num::ParseIntError`] to [`ApplyError`] with [`ErrorKind::ConversionError`].
impl From<std::num::ParseIntError> for ApplyError {
    #[track_caller]
    fn from(err: std::num::ParseIntError) -> ApplyError {
        let detail = err.to_string();
        let source = Arc::new(err);
        ApplyError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("Integer parsing failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`base64::DecodeError`] to [`ApplyError`] with [`ErrorKind::ConversionError`].
impl From<base64::DecodeError> for ApplyError {
    #[track_caller]
    fn from(err: base64::DecodeError) -> ApplyError {
        let detail = err.to_string();
        let source = Arc::new(err);
        ApplyError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("Base64 decoding failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`cdc_postgres::types::SchemaError`] to [`ApplyError`] with
/// [`ErrorKind::ValidationError`].
impl From<cdc_postgres::types::SchemaError> for ApplyError {
    #[track_caller]
    fn from(err: cdc_postgres::types::SchemaError) -> ApplyError {
        let detail = err.to_string();
        let source = Arc::new(err);
        ApplyError::from_components(
            ErrorKind::ValidationError,
            Cow::Borrowed("Table schema cannot support the requested operation"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`tokio_postgres::Error`] to [`ApplyError`] with the appropriate error kind.
///
/// Maps errors based on broad SQLSTATE classes so statement application
/// failures keep a useful classification once they reach the caller.
impl From<tokio_postgres::Error> for ApplyError {
    #[track_caller]
    fn from(err: tokio_postgres::Error) -> ApplyError {
        let (kind, description) = match err.code() {
            Some(sqlstate) => {
                use tokio_postgres::error::SqlState;

                match *sqlstate {
                    SqlState::CONNECTION_EXCEPTION
                    | SqlState::CONNECTION_DOES_NOT_EXIST
                    | SqlState::CONNECTION_FAILURE
                    | SqlState::SQLCLIENT_UNABLE_TO_ESTABLISH_SQLCONNECTION
                    | SqlState::SQLSERVER_REJECTED_ESTABLISHMENT_OF_SQLCONNECTION
                    | SqlState::ADMIN_SHUTDOWN
                    | SqlState::CRASH_SHUTDOWN
                    | SqlState::CANNOT_CONNECT_NOW => (
                        ErrorKind::ConnectionFailed,
                        "PostgreSQL connection failed",
                    ),

                    SqlState::INTEGRITY_CONSTRAINT_VIOLATION
                    | SqlState::NOT_NULL_VIOLATION
                    | SqlState::FOREIGN_KEY_VIOLATION
                    | SqlState::UNIQUE_VIOLATION
                    | SqlState::CHECK_VIOLATION => (
                        ErrorKind::ValidationError,
                        "PostgreSQL constraint violation",
                    ),

                    SqlState::DATA_EXCEPTION
                    | SqlState::INVALID_TEXT_REPRESENTATION
                    | SqlState::INVALID_DATETIME_FORMAT
                    | SqlState::NUMERIC_VALUE_OUT_OF_RANGE
                    | SqlState::BAD_COPY_FILE_FORMAT => (
                        ErrorKind::ConversionError,
                        "PostgreSQL data conversion failed",
                    ),

                    SqlState::TRANSACTION_ROLLBACK
                    | SqlState::T_R_SERIALIZATION_FAILURE
                    | SqlState::T_R_DEADLOCK_DETECTED
                    | SqlState::INVALID_TRANSACTION_STATE
                    | SqlState::IN_FAILED_SQL_TRANSACTION => {
                        (ErrorKind::InvalidState, "PostgreSQL transaction failed")
                    }

                    _ => (ErrorKind::QueryFailed, "PostgreSQL error"),
                }
            }
            // No SQL state means connection issue.
            None => (
                ErrorKind::ConnectionFailed,
                "PostgreSQL connection failed",
            ),
        };

        let detail = err.to_string();
        let source = Arc::new(err);
        ApplyError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}
