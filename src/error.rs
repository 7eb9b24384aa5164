//! The single remote error type carried across the RMI boundary.
//!
//! Every remote-callable method in this crate returns
//! `Result<T, RemoteError>`. Declared failures (spec §7) and transport
//! failures share one type so a stub can decode a reply without knowing
//! in advance which declared exceptions a given method may raise.

use num_derive::{FromPrimitive, ToPrimitive};
use thiserror::Error;

/// Discriminant used on the wire to tag which [`RemoteError`] variant a
/// failed reply carries. Kept separate from the `RemoteError` enum
/// itself (which carries associated data) the same way the teacher
/// separates XDR discriminants from the Rust enums they tag
/// (`src/parser/rpc.rs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum RemoteErrorTag {
    FileNotFound = 0,
    InvalidArgument = 1,
    OutOfBounds = 2,
    Io = 3,
    ServerState = 4,
    AlreadyRegistered = 5,
    NetworkError = 6,
    MethodNotFound = 7,
}

/// The error kinds declared in spec.md §7.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Path absent, or wrong kind (file vs. directory).
    #[error("file not found: {0}")]
    FileNotFound(String),
    /// Null path, malformed path, unknown path passed to `unlock`, or
    /// `copy`/`delete` of root.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Negative offset/length, or range exceeding file size on read.
    #[error("out of bounds: {0}")]
    OutOfBounds(String),
    /// Host filesystem error.
    #[error("I/O error: {0}")]
    Io(String),
    /// No registered storage servers, a failed replica invalidation
    /// during a write-intent lock, or restarting a failed skeleton.
    #[error("server state error: {0}")]
    ServerState(String),
    /// Duplicate `register` of the same stub pair.
    #[error("already registered: {0}")]
    AlreadyRegistered(String),
    /// Transport-level failure: connection, marshalling, or an
    /// unexpected exception raised by the remote method.
    #[error("network error: {0}")]
    NetworkError(String),
    /// The RMI request's `(method name, parameter types)` did not match
    /// any declared method.
    #[error("method not found: {0}")]
    MethodNotFound(String),
}

impl RemoteError {
    pub fn tag(&self) -> RemoteErrorTag {
        match self {
            RemoteError::FileNotFound(_) => RemoteErrorTag::FileNotFound,
            RemoteError::InvalidArgument(_) => RemoteErrorTag::InvalidArgument,
            RemoteError::OutOfBounds(_) => RemoteErrorTag::OutOfBounds,
            RemoteError::Io(_) => RemoteErrorTag::Io,
            RemoteError::ServerState(_) => RemoteErrorTag::ServerState,
            RemoteError::AlreadyRegistered(_) => RemoteErrorTag::AlreadyRegistered,
            RemoteError::NetworkError(_) => RemoteErrorTag::NetworkError,
            RemoteError::MethodNotFound(_) => RemoteErrorTag::MethodNotFound,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RemoteError::FileNotFound(m)
            | RemoteError::InvalidArgument(m)
            | RemoteError::OutOfBounds(m)
            | RemoteError::Io(m)
            | RemoteError::ServerState(m)
            | RemoteError::AlreadyRegistered(m)
            | RemoteError::NetworkError(m)
            | RemoteError::MethodNotFound(m) => m,
        }
    }

    pub fn from_tag(tag: RemoteErrorTag, message: String) -> Self {
        match tag {
            RemoteErrorTag::FileNotFound => RemoteError::FileNotFound(message),
            RemoteErrorTag::InvalidArgument => RemoteError::InvalidArgument(message),
            RemoteErrorTag::OutOfBounds => RemoteError::OutOfBounds(message),
            RemoteErrorTag::Io => RemoteError::Io(message),
            RemoteErrorTag::ServerState => RemoteError::ServerState(message),
            RemoteErrorTag::AlreadyRegistered => RemoteError::AlreadyRegistered(message),
            RemoteErrorTag::NetworkError => RemoteError::NetworkError(message),
            RemoteErrorTag::MethodNotFound => RemoteError::MethodNotFound(message),
        }
    }
}

impl From<std::io::Error> for RemoteError {
    fn from(e: std::io::Error) -> Self {
        RemoteError::Io(e.to_string())
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
