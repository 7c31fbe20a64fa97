//! Fluent builder for Socket construction.
//!
//! Provides a builder pattern interface for creating and configuring Socket instances.

use crate::error::Result;
use crate::net::Domain;
use crate::net::socket::Socket;

use std::time::Duration;

/// Longest single wait a suspending call makes before re-checking the handle.
pub const DEFAULT_RETRY_SLICE: Duration = Duration::from_millis(20);

/// Shortest wait slice; anything below would turn suspending calls into a busy loop.
pub const MIN_RETRY_SLICE: Duration = Duration::from_millis(1);

/// Backlog used by `listen(0)`.
pub const DEFAULT_BACKLOG: i32 = 128;

/// Per-socket settings, carried over to sockets produced by `accept`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SocketConfig {
    /// Upper bound of each multiplexer wait inside a suspending call. Short
    /// slices keep cancellation requests responsive.
    pub retry_slice: Duration,

    /// Listen backlog used when `listen` is given a non-positive value.
    pub backlog: i32,

    /// Size of the owned scratch buffer used by `receive_buffered`; `0`
    /// means no buffer.
    pub buffer_size: usize,

    /// Address family opened by `tcp()`/`udp()`.
    pub domain: Domain,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            retry_slice: DEFAULT_RETRY_SLICE,
            backlog: DEFAULT_BACKLOG,
            buffer_size: 0,
            domain: Domain::Ipv4,
        }
    }
}

/// Builder for constructing Socket instances with fluent API.
///
/// # Example
/// ```no_run
/// use light_socket::SocketBuilder;
/// use std::time::Duration;
///
/// let socket = SocketBuilder::new()
///     .retry_slice(Duration::from_millis(5))
///     .buffer_size(4096)
///     .tcp()?;
/// # Ok::<(), light_socket::SocketError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct SocketBuilder {
    config: SocketConfig,
}

impl SocketBuilder {
    /// Creates a new socket builder with default settings.
    pub fn new() -> Self {
        Self {
            config: SocketConfig::default(),
        }
    }

    /// Sets the upper bound of each readiness wait in suspending calls.
    ///
    /// # Arguments
    /// * `slice` - Longest single wait; values below [`MIN_RETRY_SLICE`] are raised to it
    pub fn retry_slice(mut self, slice: Duration) -> Self {
        self.config.retry_slice = slice.max(MIN_RETRY_SLICE);
        self
    }

    /// Sets the default listen backlog.
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.config.backlog = backlog;
        self
    }

    /// Allocates an owned scratch buffer of `size` bytes for receive staging.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// Selects the address family.
    pub fn domain(mut self, domain: Domain) -> Self {
        self.config.domain = domain;
        self
    }

    /// Shorthand for `.domain(Domain::Ipv6)`.
    pub fn ipv6(self) -> Self {
        self.domain(Domain::Ipv6)
    }

    /// Builds an unopened Socket carrying this configuration.
    pub fn build(self) -> Socket {
        Socket::with_config(self.config)
    }

    /// Builds and opens a stream socket.
    pub fn tcp(self) -> Result<Socket> {
        let mut socket = self.build();
        socket.tcp()?;

        Ok(socket)
    }

    /// Builds and opens a datagram socket.
    pub fn udp(self) -> Result<Socket> {
        let mut socket = self.build();
        socket.udp()?;

        Ok(socket)
    }
}
