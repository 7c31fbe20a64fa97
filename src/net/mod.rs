//! TCP/UDP networking primitives.
//!
//! - [`addr`]: host/port resolution and address formatting
//! - [`socket`]: the dual-mode [`Socket`] handle
//!
//! The small value types below describe how a socket was opened and which
//! half of it is shut down; they are shared with the platform layer.
//!
//! [`Socket`]: socket::Socket

pub mod addr;
pub mod socket;

/// Address family of a socket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Domain {
    #[default]
    Ipv4,
    Ipv6,
}

impl Domain {
    pub(crate) fn matches(self, address: &std::net::SocketAddr) -> bool {
        match self {
            Domain::Ipv4 => address.is_ipv4(),
            Domain::Ipv6 => address.is_ipv6(),
        }
    }
}

/// Transport of a socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Connection-oriented byte stream.
    Tcp,
    /// Connectionless datagrams.
    Udp,
}

/// Which half of a connection to shut down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shutdown {
    Read,
    Write,
    Both,
}

impl Shutdown {
    pub(crate) fn covers_read(self) -> bool {
        matches!(self, Shutdown::Read | Shutdown::Both)
    }

    pub(crate) fn covers_write(self) -> bool {
        matches!(self, Shutdown::Write | Shutdown::Both)
    }
}

/// Shut-down halves tracked on a handle, independent of the OS.
///
/// Read and write accumulate: shutting down `Read` then `Write` yields
/// [`ShutdownState::Both`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShutdownState {
    #[default]
    Open,
    Read,
    Write,
    Both,
}

impl ShutdownState {
    pub fn read_closed(self) -> bool {
        matches!(self, ShutdownState::Read | ShutdownState::Both)
    }

    pub fn write_closed(self) -> bool {
        matches!(self, ShutdownState::Write | ShutdownState::Both)
    }

    pub(crate) fn with(self, how: Shutdown) -> Self {
        let read = self.read_closed() || how.covers_read();
        let write = self.write_closed() || how.covers_write();

        match (read, write) {
            (false, false) => ShutdownState::Open,
            (true, false) => ShutdownState::Read,
            (false, true) => ShutdownState::Write,
            (true, true) => ShutdownState::Both,
        }
    }
}
