use super::{check, poll_millis};
use crate::error::{Result, SocketError};
use crate::net::{Domain, Kind, Shutdown};
use crate::reactor::interest::Interest;

use std::mem;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::ptr;
use std::sync::Once;
use std::time::Duration;

use windows_sys::Win32::Networking::WinSock::{
    self as ws, AF_INET, AF_INET6, FD_SET, FIONBIO, IN_ADDR, IN_ADDR_0, IN6_ADDR, IN6_ADDR_0,
    INVALID_SOCKET as NATIVE_INVALID_SOCKET, IPPROTO_TCP, IPPROTO_UDP, SD_BOTH, SD_RECEIVE,
    SD_SEND, SOCK_DGRAM, SOCK_STREAM, SOCKADDR, SOCKADDR_IN, SOCKADDR_IN6, SOCKADDR_STORAGE,
    SOCKET, SOCKET_ERROR, SOL_SOCKET, SO_ERROR, TIMEVAL, WSA_FLAG_NO_HANDLE_INHERIT,
    WSA_FLAG_OVERLAPPED, WSADATA, WSAEALREADY, WSAECONNABORTED, WSAECONNRESET, WSAEINPROGRESS,
    WSAEINTR, WSAESHUTDOWN, WSAEWOULDBLOCK, WSAPOLLFD, POLLRDBAND, POLLRDNORM, POLLWRNORM,
};

/// Native descriptor type.
pub type RawSocket = SOCKET;

pub(crate) const INVALID_SOCKET: RawSocket = NATIVE_INVALID_SOCKET;

/// Number of sockets a native readiness set can hold.
pub const FD_SETSIZE: usize = ws::FD_SETSIZE as usize;

static WSA_STARTUP: Once = Once::new();

fn ensure_wsa() {
    WSA_STARTUP.call_once(|| {
        let mut data: WSADATA = unsafe { mem::zeroed() };
        let code = unsafe { ws::WSAStartup(0x202, &mut data) };
        if code != 0 {
            tracing::error!(code, "WSAStartup failed");
        }
    });
}

pub(crate) fn errno() -> i32 {
    unsafe { ws::WSAGetLastError() }
}

pub(crate) fn classify(code: i32) -> SocketError {
    match code {
        WSAEWOULDBLOCK | WSAEINPROGRESS | WSAEALREADY => SocketError::WouldBlock,
        WSAEINTR => SocketError::Interrupted,
        WSAECONNRESET | WSAECONNABORTED | WSAESHUTDOWN => SocketError::ConnectionClosedByPeer,
        code => SocketError::Platform(code),
    }
}

// Winsock reports failure as SOCKET_ERROR rather than a negative count.
fn check_i32(ret: i32) -> Result<i64> {
    if ret == SOCKET_ERROR {
        return check(-1);
    }

    check(ret as i64)
}

fn check_socket(socket: SOCKET) -> Result<SOCKET> {
    if socket == NATIVE_INVALID_SOCKET {
        check(-1)?;
    }

    check(0)?;
    Ok(socket)
}

fn clamp_len(len: usize) -> i32 {
    len.min(i32::MAX as usize) as i32
}

pub(crate) fn socket(domain: Domain, kind: Kind) -> Result<RawSocket> {
    ensure_wsa();

    let family = match domain {
        Domain::Ipv4 => AF_INET,
        Domain::Ipv6 => AF_INET6,
    };
    let (ty, protocol) = match kind {
        Kind::Tcp => (SOCK_STREAM, IPPROTO_TCP),
        Kind::Udp => (SOCK_DGRAM, IPPROTO_UDP),
    };

    let socket = check_socket(unsafe {
        ws::WSASocketW(
            family as i32,
            ty as i32,
            protocol as i32,
            ptr::null(),
            0,
            WSA_FLAG_OVERLAPPED | WSA_FLAG_NO_HANDLE_INHERIT,
        )
    })?;

    if let Err(error) = set_nonblocking(socket, true) {
        unsafe { ws::closesocket(socket) };
        return Err(error);
    }

    Ok(socket)
}

pub(crate) fn set_nonblocking(socket: RawSocket, on: bool) -> Result<()> {
    let mut nonblocking: u32 = if on { 1 } else { 0 };

    check_i32(unsafe { ws::ioctlsocket(socket, FIONBIO, &mut nonblocking) })?;
    Ok(())
}

pub(crate) fn connect(socket: RawSocket, address: &SocketAddr) -> Result<()> {
    let (storage, length) = to_raw(address);

    check_i32(unsafe { ws::connect(socket, &storage as *const _ as *const SOCKADDR, length) })?;
    Ok(())
}

pub(crate) fn bind(socket: RawSocket, address: &SocketAddr) -> Result<()> {
    let (storage, length) = to_raw(address);

    check_i32(unsafe { ws::bind(socket, &storage as *const _ as *const SOCKADDR, length) })?;
    Ok(())
}

pub(crate) fn listen(socket: RawSocket, backlog: i32) -> Result<()> {
    check_i32(unsafe { ws::listen(socket, backlog) })?;
    Ok(())
}

pub(crate) fn accept(socket: RawSocket) -> Result<(RawSocket, SocketAddr)> {
    let mut storage: SOCKADDR_STORAGE = unsafe { mem::zeroed() };
    let mut length = mem::size_of::<SOCKADDR_STORAGE>() as i32;

    let client = check_socket(unsafe {
        ws::accept(
            socket,
            &mut storage as *mut _ as *mut SOCKADDR,
            &mut length,
        )
    })?;

    let prepared = set_nonblocking(client, true).and_then(|()| from_raw(&storage, length));

    match prepared {
        Ok(address) => Ok((client, address)),
        Err(error) => {
            unsafe { ws::closesocket(client) };
            Err(error)
        }
    }
}

pub(crate) fn send(socket: RawSocket, buffer: &[u8]) -> Result<usize> {
    let sent = check_i32(unsafe {
        ws::send(socket, buffer.as_ptr(), clamp_len(buffer.len()), 0)
    })?;

    Ok(sent as usize)
}

pub(crate) fn recv(socket: RawSocket, buffer: &mut [u8]) -> Result<usize> {
    let received = check_i32(unsafe {
        ws::recv(socket, buffer.as_mut_ptr(), clamp_len(buffer.len()), 0)
    })?;

    Ok(received as usize)
}

pub(crate) fn send_to(socket: RawSocket, buffer: &[u8], address: &SocketAddr) -> Result<usize> {
    let (storage, length) = to_raw(address);

    let sent = check_i32(unsafe {
        ws::sendto(
            socket,
            buffer.as_ptr(),
            clamp_len(buffer.len()),
            0,
            &storage as *const _ as *const SOCKADDR,
            length,
        )
    })?;

    Ok(sent as usize)
}

pub(crate) fn recv_from(socket: RawSocket, buffer: &mut [u8]) -> Result<(usize, SocketAddr)> {
    let mut storage: SOCKADDR_STORAGE = unsafe { mem::zeroed() };
    let mut length = mem::size_of::<SOCKADDR_STORAGE>() as i32;

    let received = check_i32(unsafe {
        ws::recvfrom(
            socket,
            buffer.as_mut_ptr(),
            clamp_len(buffer.len()),
            0,
            &mut storage as *mut _ as *mut SOCKADDR,
            &mut length,
        )
    })?;

    Ok((received as usize, from_raw(&storage, length)?))
}

pub(crate) fn shutdown(socket: RawSocket, how: Shutdown) -> Result<()> {
    let how = match how {
        Shutdown::Read => SD_RECEIVE,
        Shutdown::Write => SD_SEND,
        Shutdown::Both => SD_BOTH,
    };

    check_i32(unsafe { ws::shutdown(socket, how as _) })?;
    Ok(())
}

pub(crate) fn close(socket: RawSocket) -> Result<()> {
    check_i32(unsafe { ws::closesocket(socket) })?;
    Ok(())
}

/// Reads and clears the pending `SO_ERROR` of a socket.
pub(crate) fn take_error(socket: RawSocket) -> Result<Option<i32>> {
    let mut value: i32 = 0;
    let mut length = mem::size_of::<i32>() as i32;

    check_i32(unsafe {
        ws::getsockopt(
            socket,
            SOL_SOCKET as i32,
            SO_ERROR as i32,
            &mut value as *mut i32 as *mut u8,
            &mut length,
        )
    })?;

    Ok(if value == 0 { None } else { Some(value) })
}

pub(crate) fn local_addr(socket: RawSocket) -> Result<SocketAddr> {
    let mut storage: SOCKADDR_STORAGE = unsafe { mem::zeroed() };
    let mut length = mem::size_of::<SOCKADDR_STORAGE>() as i32;

    check_i32(unsafe {
        ws::getsockname(socket, &mut storage as *mut _ as *mut SOCKADDR, &mut length)
    })?;

    from_raw(&storage, length)
}

pub(crate) fn peer_addr(socket: RawSocket) -> Result<SocketAddr> {
    let mut storage: SOCKADDR_STORAGE = unsafe { mem::zeroed() };
    let mut length = mem::size_of::<SOCKADDR_STORAGE>() as i32;

    check_i32(unsafe {
        ws::getpeername(socket, &mut storage as *mut _ as *mut SOCKADDR, &mut length)
    })?;

    from_raw(&storage, length)
}

fn to_raw(address: &SocketAddr) -> (SOCKADDR_STORAGE, i32) {
    let mut storage: SOCKADDR_STORAGE = unsafe { mem::zeroed() };

    let length = match address {
        SocketAddr::V4(v4) => {
            let mut raw: SOCKADDR_IN = unsafe { mem::zeroed() };
            raw.sin_family = AF_INET;
            raw.sin_port = v4.port().to_be();
            raw.sin_addr = IN_ADDR {
                S_un: IN_ADDR_0 {
                    S_addr: u32::from_ne_bytes(v4.ip().octets()),
                },
            };

            unsafe { ptr::write(&mut storage as *mut _ as *mut SOCKADDR_IN, raw) };
            mem::size_of::<SOCKADDR_IN>()
        }
        SocketAddr::V6(v6) => {
            let mut raw: SOCKADDR_IN6 = unsafe { mem::zeroed() };
            raw.sin6_family = AF_INET6;
            raw.sin6_port = v6.port().to_be();
            raw.sin6_flowinfo = v6.flowinfo();
            raw.Anonymous.sin6_scope_id = v6.scope_id();
            raw.sin6_addr = IN6_ADDR {
                u: IN6_ADDR_0 {
                    Byte: v6.ip().octets(),
                },
            };

            unsafe { ptr::write(&mut storage as *mut _ as *mut SOCKADDR_IN6, raw) };
            mem::size_of::<SOCKADDR_IN6>()
        }
    };

    (storage, length as i32)
}

fn from_raw(storage: &SOCKADDR_STORAGE, length: i32) -> Result<SocketAddr> {
    match storage.ss_family {
        AF_INET if length as usize >= mem::size_of::<SOCKADDR_IN>() => {
            let raw = unsafe { &*(storage as *const _ as *const SOCKADDR_IN) };
            let ip = Ipv4Addr::from(unsafe { raw.sin_addr.S_un.S_addr }.to_ne_bytes());

            Ok(SocketAddr::V4(SocketAddrV4::new(ip, u16::from_be(raw.sin_port))))
        }
        AF_INET6 if length as usize >= mem::size_of::<SOCKADDR_IN6>() => {
            let raw = unsafe { &*(storage as *const _ as *const SOCKADDR_IN6) };
            let ip = Ipv6Addr::from(unsafe { raw.sin6_addr.u.Byte });

            Ok(SocketAddr::V6(SocketAddrV6::new(
                ip,
                u16::from_be(raw.sin6_port),
                raw.sin6_flowinfo,
                unsafe { raw.Anonymous.sin6_scope_id },
            )))
        }
        _ => Err(SocketError::InvalidState("unsupported address family")),
    }
}

/// Native readiness set: an array of sockets with a count.
#[derive(Clone)]
pub struct FdSet {
    set: FD_SET,
}

impl FdSet {
    pub fn new() -> Self {
        Self {
            set: unsafe { mem::zeroed() },
        }
    }

    /// Adds a socket, failing once the array is full.
    pub fn insert(&mut self, socket: RawSocket) -> Result<()> {
        if self.contains(socket) {
            return Ok(());
        }

        let count = self.set.fd_count as usize;
        if count >= self.set.fd_array.len() {
            return Err(SocketError::Capacity {
                fd: socket as u64,
                limit: self.set.fd_array.len(),
            });
        }

        self.set.fd_array[count] = socket;
        self.set.fd_count += 1;

        Ok(())
    }

    pub fn contains(&self, socket: RawSocket) -> bool {
        self.set.fd_array[..self.set.fd_count as usize].contains(&socket)
    }

    pub fn is_empty(&self) -> bool {
        self.set.fd_count == 0
    }

    pub fn max(&self) -> Option<RawSocket> {
        self.set.fd_array[..self.set.fd_count as usize]
            .iter()
            .copied()
            .max()
    }

    pub fn clear(&mut self) {
        self.set.fd_count = 0;
    }

    fn as_mut_ptr(&mut self) -> *mut FD_SET {
        if self.is_empty() {
            ptr::null_mut()
        } else {
            &mut self.set
        }
    }
}

impl Default for FdSet {
    fn default() -> Self {
        Self::new()
    }
}

/// One native `select` call. `None` blocks indefinitely.
///
/// The sets are rewritten in place to the ready subset.
pub(crate) fn select(
    read: &mut FdSet,
    write: &mut FdSet,
    except: &mut FdSet,
    timeout: Option<Duration>,
) -> Result<usize> {
    let timeval = timeout.map(|duration| TIMEVAL {
        tv_sec: duration.as_secs().min(i32::MAX as u64) as i32,
        tv_usec: duration.subsec_micros() as i32,
    });
    let timeval_ptr = match timeval.as_ref() {
        Some(timeval) => timeval as *const TIMEVAL,
        None => ptr::null(),
    };

    let ready = check_i32(unsafe {
        ws::select(
            0,
            read.as_mut_ptr(),
            write.as_mut_ptr(),
            except.as_mut_ptr(),
            timeval_ptr,
        )
    })?;

    Ok(ready as usize)
}

/// Waits on one socket with `WSAPoll`, which is not bound by the 64-entry `FD_SET`.
pub(crate) fn poll(socket: RawSocket, interest: Interest, timeout: Duration) -> Result<bool> {
    let mut events = 0;
    if interest.read {
        events |= POLLRDNORM;
    }
    if interest.write {
        events |= POLLWRNORM;
    }
    if interest.except {
        events |= POLLRDBAND;
    }

    let mut descriptor = WSAPOLLFD {
        fd: socket,
        events,
        revents: 0,
    };
    let ready = check_i32(unsafe { ws::WSAPoll(&mut descriptor, 1, poll_millis(timeout)) })?;

    Ok(ready > 0 && descriptor.revents != 0)
}
