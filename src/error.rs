//! Errors raised by streams and the factories which open them.

use std::fmt;
use std::io;

use thiserror::Error;

/// The broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value was passed which can't represent what the caller intended,
    /// e.g. a descriptor which isn't open or a malformed mode string.
    InvalidArgument,

    /// The operation isn't permitted in the stream's current state. These are
    /// always avoidable by checking `is_open`, `is_readable` or `is_writable` first.
    Logic,

    /// The underlying transport failed even though the preconditions held.
    Runtime,
}

/// Error type for stream operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The argument can't represent an open handle or a valid request.
    #[error("{0}")]
    InvalidArgument(String),

    /// The stream is in a state which forbids the operation.
    #[error("{0}")]
    Logic(String),

    /// The transport operation failed.
    #[error("{}", runtime_message(.message, .source))]
    Runtime {
        /// What was being attempted.
        message: String,

        /// The transport error, when one was reported.
        #[source]
        source: Option<io::Error>,
    },

    /// Establishing a network connection failed.
    #[error(transparent)]
    Connect(#[from] ConnectError),
}

fn runtime_message(message: &str, source: &Option<io::Error>) -> String {
    match source {
        Some(source) => format!("{message}: {source}"),
        None => message.to_owned(),
    }
}

impl Error {
    pub(crate) fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Error::InvalidArgument(message.into())
    }

    pub(crate) fn logic<S: Into<String>>(message: S) -> Self {
        Error::Logic(message.into())
    }

    /// Returns a closure wrapping an `io::Error` into a runtime error with the given message.
    pub(crate) fn io<S: Into<String>>(message: S) -> impl FnOnce(io::Error) -> Self {
        move |error| Error::Runtime {
            message: message.into(),
            source: Some(error),
        }
    }

    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Logic(_) => ErrorKind::Logic,
            Error::Runtime { .. } | Error::Connect(_) => ErrorKind::Runtime,
        }
    }

    /// The io error underlying this error, if any.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Error::Runtime { source, .. } => source.as_ref(),
            Error::Connect(error) => error.source.as_ref(),
            _ => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::Runtime {
                source: Some(source),
                ..
            } => source,
            Error::Connect(ConnectError {
                source: Some(source),
                ..
            }) => source,
            Error::InvalidArgument(message) => io::Error::new(io::ErrorKind::InvalidInput, message),
            error => io::Error::other(error),
        }
    }
}

/// Error returned when a network connection can't be established.
///
/// The OS error code and message are kept exactly as the failed call reported them.
#[derive(Debug, Error)]
pub struct ConnectError {
    address: String,
    message: String,
    #[source]
    source: Option<io::Error>,
}

impl ConnectError {
    pub(crate) fn new<A, S>(address: A, message: S) -> Self
    where
        A: Into<String>,
        S: Into<String>,
    {
        Self {
            address: address.into(),
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn build<A: Into<String>>(address: A, error: io::Error) -> Self {
        Self {
            address: address.into(),
            message: error.to_string(),
            source: Some(error),
        }
    }

    /// The address the connection was attempted against.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The native OS error code, when the failure came from the OS.
    pub fn code(&self) -> Option<i32> {
        self.source.as_ref().and_then(io::Error::raw_os_error)
    }

    /// The error message reported for the failure.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unable to connect to {} ({})", self.address, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_display_includes_source() {
        let err = Error::io("Cannot read stream")(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "pipe closed",
        ));
        assert_eq!(err.to_string(), "Cannot read stream: pipe closed");
        assert_eq!(err.kind(), ErrorKind::Runtime);

        let err = Error::Runtime {
            message: "Cannot write on stream".into(),
            source: None,
        };
        assert_eq!(err.to_string(), "Cannot write on stream");
    }

    #[test]
    fn into_io_error_keeps_kind() {
        let err = Error::io("open")(io::Error::from(io::ErrorKind::NotFound));
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);

        let io_err: io::Error = Error::invalid_argument("bad mode").into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidInput);

        let io_err: io::Error = Error::logic("closed").into();
        assert_eq!(io_err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn connect_error_exposes_native_code() {
        let err = ConnectError::build("tcp://127.0.0.1:1", io::Error::from_raw_os_error(111));
        assert_eq!(err.code(), Some(111));
        assert_eq!(err.address(), "tcp://127.0.0.1:1");
        assert!(err.to_string().starts_with("unable to connect to tcp://127.0.0.1:1"));

        let err = ConnectError::new("tcp://example.invalid:80", "no addresses resolved");
        assert_eq!(err.code(), None);
        assert_eq!(err.message(), "no addresses resolved");
    }
}
