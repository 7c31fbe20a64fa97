//! Host/port resolution and address formatting.
//!
//! Resolution always honours the address family the socket was opened with:
//! an IPv4 socket only ever receives IPv4 addresses, an IPv6 socket only IPv6
//! ones. Literal addresses are parsed without touching the system resolver.

use crate::error::{Result, SocketError};
use crate::net::Domain;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};

/// Length and port reported by [`Socket::get_address`](crate::Socket::get_address).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressInfo {
    /// Full length of the textual address. Larger than the caller's buffer
    /// when the text was truncated.
    pub len: usize,
    pub port: u16,
}

/// Resolves `host:port` to the first address usable by a socket of `domain`.
///
/// # Errors
/// [`SocketError::Resolution`] when the host is malformed, unknown, or only
/// resolves to addresses of the other family.
pub fn resolve(host: &str, port: u16, domain: Domain) -> Result<SocketAddr> {
    let host = strip_brackets(host.trim());

    if let Ok(ip) = host.parse::<IpAddr>() {
        let address = SocketAddr::new(ip, port);
        if domain.matches(&address) {
            return Ok(address);
        }

        return Err(resolution_error(host, port));
    }

    if host.is_empty() {
        return Err(resolution_error(host, port));
    }

    let candidates = (host, port).to_socket_addrs().map_err(|error| {
        tracing::debug!(host, port, %error, "name resolution failed");
        resolution_error(host, port)
    })?;

    candidates
        .into_iter()
        .find(|address| domain.matches(address))
        .ok_or_else(|| resolution_error(host, port))
}

/// Resolves an address to bind to. An empty host or `*` binds the
/// unspecified address of the socket's family.
pub fn resolve_bind(host: &str, port: u16, domain: Domain) -> Result<SocketAddr> {
    match host.trim() {
        "" | "*" => Ok(SocketAddr::new(unspecified(domain), port)),
        host => resolve(host, port, domain),
    }
}

pub(crate) fn unspecified(domain: Domain) -> IpAddr {
    match domain {
        Domain::Ipv4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        Domain::Ipv6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}

/// Writes the textual IP of `address` into `buffer`, truncating if needed.
///
/// Returns the full length of the text and the port, so a caller whose
/// buffer was too small knows how much room to provide.
pub fn write_address(address: &SocketAddr, buffer: &mut [u8]) -> AddressInfo {
    let text = address.ip().to_string();
    let bytes = text.as_bytes();

    let copied = bytes.len().min(buffer.len());
    buffer[..copied].copy_from_slice(&bytes[..copied]);

    AddressInfo {
        len: bytes.len(),
        port: address.port(),
    }
}

fn strip_brackets(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(host)
}

fn resolution_error(host: &str, port: u16) -> SocketError {
    SocketError::Resolution {
        host: host.to_owned(),
        port,
    }
}
