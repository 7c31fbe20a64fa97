//! Lightweight cross-platform TCP/UDP sockets with dual-mode calls.
//!
//! Every socket operation is offered twice: a plain variant that suspends the
//! caller until the operation completes, and a `*_now` variant that makes one
//! non-blocking attempt. Both share the same native primitive and retry
//! logic. A select-style multiplexer lets a host wait on many sockets at once.
//!
//! # Architecture
//!
//! - **sys**: Per-platform primitive over BSD sockets or Winsock, plus the
//!   thread-local last-error slot
//! - **Socket**: The dual-mode handle; opening, connecting, I/O, shutdown
//! - **reactor**: Readiness multiplexer over handle collections and native sets
//! - **addr**: Host/port resolution and textual address output
//! - **SocketBuilder**: Fluent builder for per-socket configuration
//! - **status**: Integer status codes for hosts that need them

mod builder;
mod error;
pub mod net;
pub mod reactor;
pub mod status;
mod sys;

pub use builder::{
    DEFAULT_BACKLOG, DEFAULT_RETRY_SLICE, MIN_RETRY_SLICE, SocketBuilder, SocketConfig,
};
pub use error::{Result, SocketError};
pub use net::addr::AddressInfo;
pub use net::socket::{CancelHandle, Datagram, Socket};
pub use net::{Domain, Kind, Shutdown, ShutdownState};
pub use sys::{FD_SETSIZE, RawSocket, last_error};
