//! Error taxonomy shared by every socket operation.
//!
//! Platform failures are normalized into a handful of kinds so callers never
//! need to know whether they run on BSD sockets or Winsock:
//!
//! - [`SocketError::WouldBlock`]: the operation cannot complete right now.
//!   Only ever surfaced by the `*_now` variants (or by plain variants on a
//!   handle set non-blocking).
//! - [`SocketError::Interrupted`]: a signal interrupted the call. Retried
//!   internally, never returned by the call engine.
//! - [`SocketError::ConnectionClosedByPeer`]: the stream is over.
//! - [`SocketError::Resolution`]: the host/port could not be turned into a
//!   usable address.
//! - [`SocketError::Platform`]: any other OS failure, carrying the raw code.
//! - [`SocketError::InvalidState`]: the handle is unopened, closed or shut
//!   down for the requested direction. The OS is never touched.
//! - [`SocketError::Capacity`]: a descriptor does not fit the native
//!   readiness set.

use std::io;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SocketError>;

/// Errors returned by socket operations.
#[derive(Debug, Error)]
pub enum SocketError {
    /// The operation would have to suspend to complete.
    #[error("operation would block")]
    WouldBlock,

    /// The native call was interrupted by a signal.
    #[error("operation interrupted")]
    Interrupted,

    /// The remote end closed or reset the connection.
    #[error("connection closed by peer")]
    ConnectionClosedByPeer,

    /// No usable address could be found for the given host and port.
    #[error("cannot resolve {host}:{port}")]
    Resolution {
        /// The host string as given by the caller.
        host: String,
        /// The port as given by the caller.
        port: u16,
    },

    /// Any other platform failure.
    #[error("platform error {0}")]
    Platform(i32),

    /// The handle is not in a state that allows the operation.
    #[error("invalid socket state: {0}")]
    InvalidState(&'static str),

    /// A descriptor does not fit into the native readiness set.
    #[error("descriptor {fd} exceeds readiness set capacity {limit}")]
    Capacity {
        /// The offending descriptor.
        fd: u64,
        /// The native limit.
        limit: usize,
    },
}

impl SocketError {
    pub fn is_would_block(&self) -> bool {
        matches!(self, SocketError::WouldBlock)
    }

    pub fn is_closed_by_peer(&self) -> bool {
        matches!(self, SocketError::ConnectionClosedByPeer)
    }

    /// Raw platform code, when the error came straight from the OS.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            SocketError::Platform(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<SocketError> for io::Error {
    fn from(error: SocketError) -> Self {
        let kind = match &error {
            SocketError::WouldBlock => io::ErrorKind::WouldBlock,
            SocketError::Interrupted => io::ErrorKind::Interrupted,
            SocketError::ConnectionClosedByPeer => io::ErrorKind::ConnectionReset,
            SocketError::Resolution { .. } => io::ErrorKind::AddrNotAvailable,
            SocketError::Platform(code) => return io::Error::from_raw_os_error(*code),
            SocketError::InvalidState(_) => io::ErrorKind::NotConnected,
            SocketError::Capacity { .. } => io::ErrorKind::InvalidInput,
        };

        io::Error::new(kind, error)
    }
}
