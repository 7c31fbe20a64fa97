//! The dual-mode socket handle.
//!
//! Every I/O operation comes in two flavours sharing one native primitive:
//!
//! - `*_now` variants make exactly one non-blocking attempt and surface
//!   [`SocketError::WouldBlock`] as an ordinary result.
//! - Plain variants suspend: on would-block they wait on the readiness
//!   multiplexer for this one handle (at most one retry slice at a time),
//!   then retry, until the operation completes, fails, or the handle is
//!   closed or shut down in between.
//!
//! A handle explicitly switched with [`Socket::set_nonblock`] opts out of
//! suspension and its plain variants behave like the `*_now` ones. The
//! native descriptor itself is always non-blocking.
//!
//! # Example
//!
//! ```no_run
//! use light_socket::Socket;
//!
//! # fn run() -> light_socket::Result<()> {
//! let mut listener = Socket::new();
//! listener.tcp()?;
//! listener.bind("127.0.0.1", 0)?;
//! listener.listen(0)?;
//! let port = listener.local_address()?.port();
//!
//! let mut client = Socket::new();
//! client.tcp()?;
//! client.connect("127.0.0.1", port)?;
//!
//! let mut server_side = Socket::new();
//! listener.accept(&mut server_side)?;
//!
//! client.send(b"ping")?;
//! let mut buffer = [0u8; 4];
//! let read = server_side.receive(&mut buffer)?;
//! assert_eq!(&buffer[..read], b"ping");
//! # Ok(())
//! # }
//! ```

use crate::builder::{MIN_RETRY_SLICE, SocketConfig};
use crate::error::{Result, SocketError};
use crate::net::addr::{self, AddressInfo};
use crate::net::{Domain, Kind, Shutdown, ShutdownState};
use crate::reactor::interest::Interest;
use crate::reactor::select::{self, Selectable};
use crate::sys::{self, INVALID_SOCKET, RawSocket};

use std::fmt;
use std::mem;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Unopened,
    Open,
    Closed,
}

/// Which end of the connection `get_address` reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Endpoint {
    Local,
    Peer,
}

/// Platform state stored by value inside a [`Socket`].
#[derive(Clone, Copy, Debug)]
struct Inner {
    raw: RawSocket,
    state: State,
    domain: Domain,
    kind: Kind,
    connecting: bool,
    endpoint: Endpoint,
}

const _: () = assert!(mem::size_of::<Inner>() <= 128);

impl Inner {
    const UNOPENED: Self = Self {
        raw: INVALID_SOCKET,
        state: State::Unopened,
        domain: Domain::Ipv4,
        kind: Kind::Tcp,
        connecting: false,
        endpoint: Endpoint::Local,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Suspend,
    Now,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Read,
    Write,
    Neither,
}

impl Direction {
    fn interest(self) -> Interest {
        match self {
            Direction::Read => Interest::READ,
            Direction::Write | Direction::Neither => Interest::WRITE,
        }
    }
}

const CANCEL_READ: u8 = 0b001;
const CANCEL_WRITE: u8 = 0b010;
const CANCEL_CLOSE: u8 = 0b100;

/// Requests shutdown or close of a [`Socket`] from outside the call that is
/// currently suspended on it.
///
/// Requests are applied by the socket before its next attempt, so a
/// suspended call notices them within one retry slice.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    requests: Arc<AtomicU8>,
}

impl CancelHandle {
    /// Asks the socket to shut down `how` before its next attempt.
    pub fn shutdown(&self, how: Shutdown) {
        let mut bits = 0;
        if how.covers_read() {
            bits |= CANCEL_READ;
        }
        if how.covers_write() {
            bits |= CANCEL_WRITE;
        }

        self.requests.fetch_or(bits, Ordering::AcqRel);
    }

    /// Asks the socket to close before its next attempt.
    pub fn close(&self) {
        self.requests.fetch_or(CANCEL_CLOSE, Ordering::AcqRel);
    }
}

/// One received datagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Datagram {
    /// Bytes copied into the caller's buffer. A datagram longer than the
    /// buffer is truncated by the OS and the rest is lost.
    pub len: usize,
    /// Address of the sender.
    pub from: SocketAddr,
}

/// A TCP or UDP socket usable in suspending and immediate mode.
///
/// A `Socket` starts unopened ([`Socket::new`]), is opened with
/// [`Socket::tcp`] or [`Socket::udp`], and ends closed ([`Socket::close`],
/// or on drop). It owns its descriptor and its optional scratch buffer
/// exclusively.
pub struct Socket {
    nonblock: bool,
    shutdown: ShutdownState,
    buffer: Option<Box<[u8]>>,
    inner: Inner,
    config: SocketConfig,
    cancel: Option<CancelHandle>,
}

impl Socket {
    /// Creates an unopened socket with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SocketConfig::default())
    }

    /// Creates an unopened socket with the given configuration.
    pub fn with_config(config: SocketConfig) -> Self {
        Self {
            nonblock: false,
            shutdown: ShutdownState::Open,
            buffer: None,
            inner: Inner::UNOPENED,
            config,
            cancel: None,
        }
    }

    /// Opens a stream socket in the configured address family.
    pub fn tcp(&mut self) -> Result<()> {
        self.open(self.config.domain, Kind::Tcp)
    }

    /// Opens a datagram socket in the configured address family.
    pub fn udp(&mut self) -> Result<()> {
        self.open(self.config.domain, Kind::Udp)
    }

    /// Opens a native descriptor.
    ///
    /// # Errors
    /// [`SocketError::InvalidState`] if the socket is already open; a closed
    /// socket may be reopened.
    pub fn open(&mut self, domain: Domain, kind: Kind) -> Result<()> {
        if self.inner.state == State::Open {
            return Err(SocketError::InvalidState("socket is already open"));
        }

        let raw = sys::socket(domain, kind)?;
        self.install(raw, domain, kind, Endpoint::Local);

        tracing::debug!(fd = ?raw, ?domain, ?kind, "socket opened");
        Ok(())
    }

    fn install(&mut self, raw: RawSocket, domain: Domain, kind: Kind, endpoint: Endpoint) {
        self.inner = Inner {
            raw,
            state: State::Open,
            domain,
            kind,
            connecting: false,
            endpoint,
        };
        self.nonblock = false;
        self.shutdown = ShutdownState::Open;
        self.buffer = scratch(self.config.buffer_size);
        if let Some(cancel) = &self.cancel {
            cancel.requests.store(0, Ordering::Release);
        }
    }

    /// Connects to `host:port`, suspending until the connection completes.
    ///
    /// # Arguments
    /// * `host` - Literal IP or name, resolved in the socket's address family
    /// * `port` - Remote port
    ///
    /// # Errors
    /// [`SocketError::Resolution`] for an unusable host, and
    /// [`SocketError::Platform`] when the peer refuses or the handshake fails.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        self.connect_with(host, port, Mode::Suspend)
    }

    /// Starts or checks a connection without suspending.
    ///
    /// Returns [`SocketError::WouldBlock`] while the handshake is in
    /// progress; call again (or wait for write readiness) to complete it.
    pub fn connect_now(&mut self, host: &str, port: u16) -> Result<()> {
        self.connect_with(host, port, Mode::Now)
    }

    fn connect_with(&mut self, host: &str, port: u16, mode: Mode) -> Result<()> {
        self.guard(Direction::Write)?;

        if !self.inner.connecting {
            let address = addr::resolve(host, port, self.inner.domain)?;

            match sys::connect(self.inner.raw, &address) {
                Ok(()) => {
                    self.inner.endpoint = Endpoint::Peer;
                    tracing::debug!(fd = ?self.inner.raw, %address, "connected");
                    return Ok(());
                }
                Err(SocketError::WouldBlock | SocketError::Interrupted)
                    if self.inner.kind == Kind::Tcp =>
                {
                    self.inner.connecting = true;
                    tracing::trace!(fd = ?self.inner.raw, %address, "connect in progress");
                }
                Err(error) => return Err(error),
            }
        }

        let suspend = self.suspends(mode);
        match self.await_connect(suspend) {
            Err(SocketError::WouldBlock) => Err(SocketError::WouldBlock),
            Err(error) => {
                self.inner.connecting = false;
                Err(error)
            }
            Ok(()) => Ok(()),
        }
    }

    fn await_connect(&mut self, suspend: bool) -> Result<()> {
        loop {
            self.guard(Direction::Write)?;

            let ready = if suspend {
                select::wait(self.inner.raw, Interest::CONNECT, self.retry_slice())?
            } else {
                select::probe(self.inner.raw, Interest::CONNECT, Duration::ZERO)?
            };

            if ready {
                return self.finish_connect();
            }
            if !suspend {
                return Err(SocketError::WouldBlock);
            }
        }
    }

    fn finish_connect(&mut self) -> Result<()> {
        self.inner.connecting = false;

        if let Some(code) = sys::take_error(self.inner.raw)? {
            return Err(sys::fail(code));
        }

        self.inner.endpoint = Endpoint::Peer;
        tracing::debug!(fd = ?self.inner.raw, "connected");
        Ok(())
    }

    /// Binds to `host:port`.
    ///
    /// # Arguments
    /// * `host` - Local address; an empty host or `*` binds every interface
    /// * `port` - Local port; `0` picks an ephemeral one
    pub fn bind(&mut self, host: &str, port: u16) -> Result<()> {
        self.guard(Direction::Neither)?;

        let address = addr::resolve_bind(host, port, self.inner.domain)?;
        sys::bind(self.inner.raw, &address)?;

        tracing::debug!(fd = ?self.inner.raw, %address, "bound");
        Ok(())
    }

    /// Starts listening. A non-positive `backlog` uses the configured default.
    pub fn listen(&mut self, backlog: i32) -> Result<()> {
        self.guard(Direction::Neither)?;

        let backlog = if backlog > 0 {
            backlog
        } else {
            self.config.backlog
        };
        sys::listen(self.inner.raw, backlog)?;

        tracing::debug!(fd = ?self.inner.raw, backlog, "listening");
        Ok(())
    }

    /// Accepts a connection into `client`, suspending until one arrives.
    ///
    /// `client` must not be open; it receives the new descriptor together
    /// with this socket's family, kind and configuration. This socket is
    /// left untouched. Returns the peer address.
    pub fn accept(&mut self, client: &mut Socket) -> Result<SocketAddr> {
        self.accept_with(client, Mode::Suspend)
    }

    /// Accepts a pending connection into `client` without suspending.
    pub fn accept_now(&mut self, client: &mut Socket) -> Result<SocketAddr> {
        self.accept_with(client, Mode::Now)
    }

    fn accept_with(&mut self, client: &mut Socket, mode: Mode) -> Result<SocketAddr> {
        if client.inner.state == State::Open {
            return Err(SocketError::InvalidState("client socket is already open"));
        }

        let (raw, peer) = self.drive(Direction::Read, mode, |socket| {
            sys::accept(socket.inner.raw)
        })?;

        client.config = self.config;
        client.install(raw, self.inner.domain, self.inner.kind, Endpoint::Peer);

        tracing::debug!(listener = ?self.inner.raw, fd = ?raw, %peer, "accepted connection");
        Ok(peer)
    }

    /// Receives into `buffer`, suspending until data arrives.
    ///
    /// # Errors
    /// [`SocketError::ConnectionClosedByPeer`] once when a stream reaches its
    /// end; the read side then counts as shut down.
    pub fn receive(&mut self, buffer: &mut [u8]) -> Result<usize> {
        self.receive_with(buffer, Mode::Suspend)
    }

    /// Receives whatever is pending without suspending.
    pub fn receive_now(&mut self, buffer: &mut [u8]) -> Result<usize> {
        self.receive_with(buffer, Mode::Now)
    }

    fn receive_with(&mut self, buffer: &mut [u8], mode: Mode) -> Result<usize> {
        let wanted = buffer.len();
        let result = self.drive(Direction::Read, mode, |socket| {
            if wanted == 0 {
                return Ok(0);
            }

            sys::recv(socket.inner.raw, buffer)
        });

        match result {
            Ok(0) if wanted > 0 && self.inner.kind == Kind::Tcp => {
                self.peer_closed(Shutdown::Read);
                Err(SocketError::ConnectionClosedByPeer)
            }
            Err(SocketError::ConnectionClosedByPeer) => {
                self.peer_closed(Shutdown::Read);
                Err(SocketError::ConnectionClosedByPeer)
            }
            result => result,
        }
    }

    /// Receives into the socket's own scratch buffer and returns the filled part.
    ///
    /// # Errors
    /// [`SocketError::InvalidState`] when the socket has no scratch buffer.
    pub fn receive_buffered(&mut self) -> Result<&[u8]> {
        self.receive_buffered_with(Mode::Suspend)
    }

    /// Non-suspending variant of [`Socket::receive_buffered`].
    pub fn receive_buffered_now(&mut self) -> Result<&[u8]> {
        self.receive_buffered_with(Mode::Now)
    }

    fn receive_buffered_with(&mut self, mode: Mode) -> Result<&[u8]> {
        self.guard(Direction::Read)?;

        let mut buffer = self
            .buffer
            .take()
            .ok_or(SocketError::InvalidState("socket has no receive buffer"))?;

        let result = self.receive_with(&mut buffer, mode);
        // A close during the call released the buffer for good.
        if self.inner.state == State::Open {
            self.buffer = Some(buffer);
        }

        let received = result?;
        match &self.buffer {
            Some(buffer) => Ok(&buffer[..received]),
            None => Err(SocketError::InvalidState("socket is closed")),
        }
    }

    /// Sends all of `buffer` on a stream (one datagram on a datagram
    /// socket), suspending while the send buffer is full.
    ///
    /// # Returns
    /// The number of bytes written. When a stream fails after part of
    /// `buffer` went out, that partial count is returned and the failure is
    /// reported by the next call.
    pub fn send(&mut self, buffer: &[u8]) -> Result<usize> {
        if !self.suspends(Mode::Suspend) || self.inner.kind != Kind::Tcp {
            return self.send_with(buffer, Mode::Suspend);
        }

        let mut sent = 0;
        loop {
            let written = match self.send_with(&buffer[sent..], Mode::Suspend) {
                Ok(written) => written,
                Err(error) if sent > 0 => {
                    tracing::debug!(fd = ?self.inner.raw, sent, %error, "send stopped after partial write");
                    return Ok(sent);
                }
                Err(error) => return Err(error),
            };
            sent += written;

            if sent == buffer.len() || written == 0 {
                return Ok(sent);
            }
        }
    }

    /// Sends as much of `buffer` as fits right now.
    pub fn send_now(&mut self, buffer: &[u8]) -> Result<usize> {
        self.send_with(buffer, Mode::Now)
    }

    fn send_with(&mut self, buffer: &[u8], mode: Mode) -> Result<usize> {
        let result = self.drive(Direction::Write, mode, |socket| {
            sys::send(socket.inner.raw, buffer)
        });

        if let Err(SocketError::ConnectionClosedByPeer) = result {
            self.peer_closed(Shutdown::Write);
        }

        result
    }

    /// Sends one datagram to `host:port`, suspending while it cannot be queued.
    pub fn send_to(&mut self, host: &str, port: u16, buffer: &[u8]) -> Result<usize> {
        self.send_to_with(host, port, buffer, Mode::Suspend)
    }

    /// Sends one datagram to `host:port` without suspending.
    pub fn send_to_now(&mut self, host: &str, port: u16, buffer: &[u8]) -> Result<usize> {
        self.send_to_with(host, port, buffer, Mode::Now)
    }

    fn send_to_with(&mut self, host: &str, port: u16, buffer: &[u8], mode: Mode) -> Result<usize> {
        self.guard(Direction::Write)?;

        let address = addr::resolve(host, port, self.inner.domain)?;
        self.drive(Direction::Write, mode, |socket| {
            sys::send_to(socket.inner.raw, buffer, &address)
        })
    }

    /// Receives the next datagram sent by `host:port`, suspending until one
    /// arrives.
    ///
    /// Datagrams from other senders are discarded. An empty `host` accepts
    /// any sender; port `0` accepts any port of the named host.
    pub fn receive_from(&mut self, host: &str, port: u16, buffer: &mut [u8]) -> Result<Datagram> {
        self.receive_from_with(host, port, buffer, Mode::Suspend)
    }

    /// Receives a pending datagram from `host:port` without suspending.
    ///
    /// Returns [`SocketError::WouldBlock`] when nothing, or only datagrams
    /// from other senders, were pending.
    pub fn receive_from_now(
        &mut self,
        host: &str,
        port: u16,
        buffer: &mut [u8],
    ) -> Result<Datagram> {
        self.receive_from_with(host, port, buffer, Mode::Now)
    }

    fn receive_from_with(
        &mut self,
        host: &str,
        port: u16,
        buffer: &mut [u8],
        mode: Mode,
    ) -> Result<Datagram> {
        self.guard(Direction::Read)?;

        let expected = if host.trim().is_empty() {
            None
        } else {
            Some(addr::resolve(host, port, self.inner.domain)?)
        };

        loop {
            let (len, from) = self.drive(Direction::Read, mode, |socket| {
                sys::recv_from(socket.inner.raw, buffer)
            })?;

            let accepted = expected.is_none_or(|expected| {
                expected.ip() == from.ip() && (expected.port() == 0 || expected.port() == from.port())
            });
            if accepted {
                return Ok(Datagram { len, from });
            }

            tracing::trace!(fd = ?self.inner.raw, %from, "discarding datagram from unexpected sender");
            if !self.suspends(mode) {
                return Err(SocketError::WouldBlock);
            }
        }
    }

    /// Shuts down one or both halves.
    ///
    /// The handle records the shutdown before asking the OS, so later calls
    /// in that direction fail fast even if the OS call itself fails (for
    /// example on an unconnected socket). Shutting down an already shut half
    /// does not touch the OS.
    pub fn shutdown(&mut self, how: Shutdown) -> Result<()> {
        self.ensure_open()?;

        let next = self.shutdown.with(how);
        if next == self.shutdown {
            return Ok(());
        }
        self.shutdown = next;

        tracing::debug!(fd = ?self.inner.raw, ?how, "shutdown");
        sys::shutdown(self.inner.raw, how)
    }

    /// Closes the socket and releases its scratch buffer.
    ///
    /// Idempotent: returns `Ok(true)` when a descriptor was released and
    /// `Ok(false)` when the socket was already closed or never opened.
    pub fn close(&mut self) -> Result<bool> {
        if self.inner.state != State::Open {
            return Ok(false);
        }

        let raw = self.inner.raw;
        self.inner.raw = INVALID_SOCKET;
        self.inner.state = State::Closed;
        self.inner.connecting = false;
        self.shutdown = ShutdownState::Both;
        self.buffer = None;

        if let Err(error) = sys::close(raw) {
            tracing::warn!(fd = ?raw, %error, "close failed");
            return Err(error);
        }

        tracing::debug!(fd = ?raw, "socket closed");
        Ok(true)
    }

    /// Opts out of suspension: plain calls then make a single attempt.
    pub fn set_nonblock(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.nonblock = true;

        Ok(())
    }

    /// Restores suspending behaviour for plain calls.
    pub fn set_block(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.nonblock = false;

        Ok(())
    }

    /// Replaces the scratch buffer; `0` removes it.
    pub fn set_buffer_size(&mut self, size: usize) {
        self.config.buffer_size = size;
        if self.inner.state == State::Open {
            self.buffer = scratch(size);
        }
    }

    /// Writes the textual address of the socket's endpoint into `buffer`.
    ///
    /// The endpoint is the peer for connected or accepted sockets and the
    /// local address otherwise. The text is truncated when `buffer` is too
    /// small; the returned `len` is always the full length.
    pub fn get_address(&self, buffer: &mut [u8]) -> Result<AddressInfo> {
        let address = self.address()?;

        Ok(addr::write_address(&address, buffer))
    }

    /// Address of the socket's endpoint, as reported by [`Socket::get_address`].
    pub fn address(&self) -> Result<SocketAddr> {
        match self.inner.endpoint {
            Endpoint::Local => self.local_address(),
            Endpoint::Peer => self.peer_address(),
        }
    }

    /// Local address the socket is bound to.
    ///
    /// # Returns
    /// The bound address, with the ephemeral port filled in after `bind(_, 0)`
    /// or an implicit bind by `connect`/`send_to`.
    ///
    /// # Example
    /// ```no_run
    /// # use light_socket::Socket;
    /// let mut socket = Socket::new();
    /// socket.udp()?;
    /// socket.bind("127.0.0.1", 0)?;
    /// let port = socket.local_address()?.port();
    /// # Ok::<(), light_socket::SocketError>(())
    /// ```
    pub fn local_address(&self) -> Result<SocketAddr> {
        self.ensure_open()?;
        sys::local_addr(self.inner.raw)
    }

    /// Address of the connected peer.
    ///
    /// # Errors
    /// [`SocketError::Platform`] when the socket is not connected.
    pub fn peer_address(&self) -> Result<SocketAddr> {
        self.ensure_open()?;
        sys::peer_addr(self.inner.raw)
    }

    /// Returns a handle that can shut down or close this socket between
    /// retries of a suspended call.
    pub fn cancel_handle(&mut self) -> CancelHandle {
        self.cancel.get_or_insert_with(CancelHandle::default).clone()
    }

    /// `true` once the socket was closed, and for a socket never opened.
    pub fn is_closed(&self) -> bool {
        self.inner.state != State::Open
    }

    /// `true` after [`Socket::set_nonblock`], until [`Socket::set_block`].
    pub fn is_nonblocking(&self) -> bool {
        self.nonblock
    }

    /// Halves shut down locally, by the peer, or through a [`CancelHandle`].
    pub fn shutdown_state(&self) -> ShutdownState {
        self.shutdown
    }

    /// Settings this socket was built with.
    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// The native descriptor while the socket is open.
    pub fn raw(&self) -> Option<RawSocket> {
        match self.inner.state {
            State::Open => Some(self.inner.raw),
            State::Unopened | State::Closed => None,
        }
    }

    /// Transport of the open socket; `None` while unopened or closed.
    pub fn kind(&self) -> Option<Kind> {
        self.raw().map(|_| self.inner.kind)
    }

    /// Address family of the open socket; `None` while unopened or closed.
    pub fn domain(&self) -> Option<Domain> {
        self.raw().map(|_| self.inner.domain)
    }

    fn retry_slice(&self) -> Duration {
        self.config.retry_slice.max(MIN_RETRY_SLICE)
    }

    fn suspends(&self, mode: Mode) -> bool {
        mode == Mode::Suspend && !self.nonblock
    }

    fn peer_closed(&mut self, how: Shutdown) {
        self.shutdown = self.shutdown.with(how);
        tracing::debug!(fd = ?self.inner.raw, ?how, "connection closed by peer");
    }

    /// Shared retry helper behind every dual-mode operation.
    ///
    /// `Interrupted` is retried immediately in both modes. `WouldBlock` is
    /// retried after a bounded readiness wait only when suspending.
    fn drive<T>(
        &mut self,
        direction: Direction,
        mode: Mode,
        mut attempt: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let suspend = self.suspends(mode);

        loop {
            self.guard(direction)?;

            match attempt(self) {
                Err(SocketError::Interrupted) => continue,
                Err(SocketError::WouldBlock) if suspend => {
                    select::wait(self.inner.raw, direction.interest(), self.retry_slice())?;
                }
                result => return result,
            }
        }
    }

    /// Applies pending cancellation requests, then checks that the socket
    /// is open and not shut down for `direction`.
    fn guard(&mut self, direction: Direction) -> Result<()> {
        let cancelled = self.apply_cancellation();
        self.ensure_open()?;

        let blocked = match direction {
            Direction::Read => self.shutdown.read_closed(),
            Direction::Write => self.shutdown.write_closed(),
            Direction::Neither => false,
        };

        if !blocked {
            return Ok(());
        }
        if cancelled {
            return Err(SocketError::ConnectionClosedByPeer);
        }

        Err(SocketError::InvalidState("socket is shut down for this direction"))
    }

    // Returns `true` when a shutdown request was applied.
    fn apply_cancellation(&mut self) -> bool {
        let Some(cancel) = &self.cancel else {
            return false;
        };

        let requests = cancel.requests.swap(0, Ordering::AcqRel);
        if requests == 0 {
            return false;
        }

        if requests & CANCEL_CLOSE != 0 {
            let _ = self.close();
            return false;
        }

        let how = match (requests & CANCEL_READ != 0, requests & CANCEL_WRITE != 0) {
            (true, true) => Shutdown::Both,
            (true, false) => Shutdown::Read,
            (false, true) => Shutdown::Write,
            (false, false) => return false,
        };

        if self.inner.state == State::Open {
            if let Err(error) = self.shutdown(how) {
                tracing::debug!(fd = ?self.inner.raw, %error, "requested shutdown failed");
            }
        }

        true
    }

    fn ensure_open(&self) -> Result<()> {
        match self.inner.state {
            State::Open => Ok(()),
            State::Unopened => Err(SocketError::InvalidState("socket is not open")),
            State::Closed => Err(SocketError::InvalidState("socket is closed")),
        }
    }
}

fn scratch(size: usize) -> Option<Box<[u8]>> {
    (size > 0).then(|| vec![0u8; size].into_boxed_slice())
}

impl Default for Socket {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("raw", &self.raw())
            .field("state", &self.inner.state)
            .field("kind", &self.inner.kind)
            .field("domain", &self.inner.domain)
            .field("nonblock", &self.nonblock)
            .field("shutdown", &self.shutdown)
            .field("buffer_size", &self.buffer.as_ref().map_or(0, |buffer| buffer.len()))
            .finish()
    }
}

impl Selectable for Socket {
    fn raw_socket(&self) -> Option<RawSocket> {
        self.raw()
    }
}
