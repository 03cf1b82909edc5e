//! Error types for facade operations.

use mongodb::error::{Error as DriverError, ErrorKind as DriverErrorKind, WriteFailure};
use thiserror::Error;

/// All errors that can surface through the facade.
///
/// Every variant maps onto one of four classes (see [`ErrorKind`]):
/// connection, session, write, and decode failures, plus the cancellation
/// pair produced when a [`Context`](crate::Context) aborts an operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Session allocation or transaction error.
    #[error("session error: {0}")]
    Session(String),

    /// Write error.
    #[error("write error: {message}")]
    Write {
        /// Error code from server.
        code: Option<i32>,
        /// Error message.
        message: String,
    },

    /// Decode error.
    #[error("decode error: {0}")]
    Decode(String),

    /// No document matched the filter.
    #[error("no document matched")]
    NoDocument,

    /// The operation's context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation's context deadline elapsed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Error::Connection(msg.into())
    }

    /// Create a session error.
    pub fn session(msg: impl Into<String>) -> Self {
        Error::Session(msg.into())
    }

    /// Create a write error.
    pub fn write(code: Option<i32>, message: impl Into<String>) -> Self {
        Error::Write {
            code,
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a write error.
    pub fn is_write_error(&self) -> bool {
        matches!(self, Error::Write { .. })
    }

    /// Check if this error was caused by context cancellation or an
    /// elapsed deadline.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }

    /// Check if this is the "no document matched" decode failure.
    pub fn is_no_document(&self) -> bool {
        matches!(self, Error::NoDocument)
    }

    /// Get the server error code if available.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Write { code, .. } => *code,
            _ => None,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection(_) => ErrorKind::Connection,
            Error::Session(_) => ErrorKind::Session,
            Error::Write { .. } => ErrorKind::Write,
            Error::Decode(_) | Error::NoDocument => ErrorKind::Decode,
            Error::Cancelled | Error::DeadlineExceeded => ErrorKind::Cancelled,
        }
    }

    /// Classify a driver error raised while establishing the connection.
    pub(crate) fn from_connect(err: DriverError) -> Self {
        Error::Connection(err.to_string())
    }

    /// Classify a driver error raised while allocating or driving a session.
    pub(crate) fn from_session(err: DriverError) -> Self {
        Error::Session(err.to_string())
    }

    /// Classify a driver error raised by a write operation, keeping the
    /// server's write-error code when the driver exposes one.
    pub(crate) fn from_write(err: DriverError) -> Self {
        Error::Write {
            code: write_code(&err),
            message: err.to_string(),
        }
    }

    /// Classify a driver error raised by a read operation. BSON shape
    /// failures stay decode errors; everything else reached the transport.
    pub(crate) fn from_read(err: DriverError) -> Self {
        match err.kind.as_ref() {
            DriverErrorKind::BsonDeserialization(e) => Error::Decode(e.to_string()),
            _ => Error::Connection(err.to_string()),
        }
    }
}

/// Extract the server write-error code, if the driver carries one.
fn write_code(err: &DriverError) -> Option<i32> {
    match err.kind.as_ref() {
        DriverErrorKind::Write(WriteFailure::WriteError(e)) => Some(e.code),
        DriverErrorKind::Write(WriteFailure::WriteConcernError(e)) => Some(e.code),
        _ => None,
    }
}

impl From<mongodb::bson::ser::Error> for Error {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        // Document serialization only happens on the write path.
        Error::Write {
            code: None,
            message: err.to_string(),
        }
    }
}

impl From<mongodb::bson::de::Error> for Error {
    fn from(err: mongodb::bson::de::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

/// Result type alias for facade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kind enumeration for pattern matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection error.
    Connection,
    /// Session error.
    Session,
    /// Write error.
    Write,
    /// Decode error (includes "no document matched").
    Decode,
    /// Context cancellation or elapsed deadline.
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;
    use serde::Deserialize;

    #[test]
    fn test_error_display() {
        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "connection error: failed to connect");
    }

    #[test]
    fn test_write_error() {
        let err = Error::write(Some(11000), "duplicate key error");
        assert!(err.to_string().contains("duplicate key error"));
        assert_eq!(err.code(), Some(11000));
        assert!(err.is_write_error());
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::connection("test").kind(), ErrorKind::Connection);
        assert_eq!(Error::session("test").kind(), ErrorKind::Session);
        assert_eq!(Error::write(None, "test").kind(), ErrorKind::Write);
        assert_eq!(Error::decode("test").kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_no_document_is_decode_class() {
        assert_eq!(Error::NoDocument.kind(), ErrorKind::Decode);
        assert!(Error::NoDocument.is_no_document());
        assert!(!Error::decode("shape mismatch").is_no_document());
    }

    #[test]
    fn test_cancellation_class() {
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(Error::DeadlineExceeded.kind(), ErrorKind::Cancelled);
        assert!(Error::Cancelled.is_cancellation());
        assert!(Error::DeadlineExceeded.is_cancellation());
        assert!(!Error::connection("test").is_cancellation());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(!Error::Cancelled.is_connection_error());
    }

    #[test]
    fn test_code_only_on_write() {
        assert_eq!(Error::connection("test").code(), None);
        assert_eq!(Error::write(Some(121), "validation").code(), Some(121));
    }

    #[test]
    fn test_error_message() {
        let err = Error::decode("missing field");
        assert_eq!(err.message(), "decode error: missing field");
    }

    #[test]
    fn test_from_bson_de_error() {
        #[derive(Debug, Deserialize)]
        struct Named {
            #[allow(dead_code)]
            name: String,
        }

        let de_err = mongodb::bson::from_document::<Named>(doc! {}).unwrap_err();
        let err: Error = de_err.into();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
