use super::{check, poll_millis};
use crate::error::{Result, SocketError};
use crate::net::{Domain, Kind, Shutdown};
use crate::reactor::interest::Interest;

use libc::{
    AF_INET, AF_INET6, EAGAIN, EALREADY, ECONNABORTED, ECONNRESET, EINPROGRESS, EINTR, EPIPE,
    EWOULDBLOCK, F_GETFD, F_GETFL, F_SETFD, F_SETFL, FD_CLOEXEC, O_NONBLOCK, SOCK_DGRAM,
    SOCK_STREAM, SOL_SOCKET, SO_ERROR, c_int, c_void, fcntl, sockaddr, sockaddr_in, sockaddr_in6,
    sockaddr_storage, socklen_t,
};
use std::io;
use std::mem;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::ptr;
use std::time::Duration;

/// Native descriptor type.
pub type RawSocket = std::os::unix::io::RawFd;

pub(crate) const INVALID_SOCKET: RawSocket = -1;

/// Number of descriptors a native readiness set can address.
pub const FD_SETSIZE: usize = libc::FD_SETSIZE as usize;

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: c_int = libc::MSG_NOSIGNAL;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: c_int = 0;

pub(crate) fn errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

pub(crate) fn classify(code: i32) -> SocketError {
    match code {
        EAGAIN | EINPROGRESS | EALREADY => SocketError::WouldBlock,
        #[allow(unreachable_patterns)]
        EWOULDBLOCK => SocketError::WouldBlock,
        EINTR => SocketError::Interrupted,
        ECONNRESET | EPIPE | ECONNABORTED => SocketError::ConnectionClosedByPeer,
        code => SocketError::Platform(code),
    }
}

pub(crate) fn socket(domain: Domain, kind: Kind) -> Result<RawSocket> {
    let family = match domain {
        Domain::Ipv4 => AF_INET,
        Domain::Ipv6 => AF_INET6,
    };
    let ty = match kind {
        Kind::Tcp => SOCK_STREAM,
        Kind::Udp => SOCK_DGRAM,
    };

    let file_descriptor = check(unsafe { libc::socket(family, ty, 0) } as i64)? as RawSocket;

    if let Err(error) = prepare(file_descriptor) {
        unsafe { libc::close(file_descriptor) };
        return Err(error);
    }

    Ok(file_descriptor)
}

// Close-on-exec, non-blocking and, where the platform has it, no SIGPIPE.
fn prepare(file_descriptor: RawSocket) -> Result<()> {
    let flags = check(unsafe { fcntl(file_descriptor, F_GETFD) } as i64)? as c_int;
    check(unsafe { fcntl(file_descriptor, F_SETFD, flags | FD_CLOEXEC) } as i64)?;

    set_nonblocking(file_descriptor, true)?;

    #[cfg(any(target_os = "macos", target_os = "ios"))]
    {
        let on: c_int = 1;
        check(unsafe {
            libc::setsockopt(
                file_descriptor,
                SOL_SOCKET,
                libc::SO_NOSIGPIPE,
                &on as *const c_int as *const c_void,
                mem::size_of::<c_int>() as socklen_t,
            )
        } as i64)?;
    }

    Ok(())
}

pub(crate) fn set_nonblocking(file_descriptor: RawSocket, on: bool) -> Result<()> {
    let flags = check(unsafe { fcntl(file_descriptor, F_GETFL) } as i64)? as c_int;
    let flags = if on {
        flags | O_NONBLOCK
    } else {
        flags & !O_NONBLOCK
    };

    check(unsafe { fcntl(file_descriptor, F_SETFL, flags) } as i64)?;
    Ok(())
}

pub(crate) fn connect(file_descriptor: RawSocket, address: &SocketAddr) -> Result<()> {
    let (storage, length) = to_raw(address);

    check(unsafe {
        libc::connect(
            file_descriptor,
            &storage as *const sockaddr_storage as *const sockaddr,
            length,
        )
    } as i64)?;

    Ok(())
}

pub(crate) fn bind(file_descriptor: RawSocket, address: &SocketAddr) -> Result<()> {
    let (storage, length) = to_raw(address);

    check(unsafe {
        libc::bind(
            file_descriptor,
            &storage as *const sockaddr_storage as *const sockaddr,
            length,
        )
    } as i64)?;

    Ok(())
}

pub(crate) fn listen(file_descriptor: RawSocket, backlog: i32) -> Result<()> {
    check(unsafe { libc::listen(file_descriptor, backlog) } as i64)?;
    Ok(())
}

pub(crate) fn accept(file_descriptor: RawSocket) -> Result<(RawSocket, SocketAddr)> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut length = mem::size_of::<sockaddr_storage>() as socklen_t;

    let client_file_descriptor = check(unsafe {
        libc::accept(
            file_descriptor,
            &mut storage as *mut sockaddr_storage as *mut sockaddr,
            &mut length,
        )
    } as i64)? as RawSocket;

    let prepared = prepare(client_file_descriptor).and_then(|()| from_raw(&storage, length));

    match prepared {
        Ok(address) => Ok((client_file_descriptor, address)),
        Err(error) => {
            unsafe { libc::close(client_file_descriptor) };
            Err(error)
        }
    }
}

pub(crate) fn send(file_descriptor: RawSocket, buffer: &[u8]) -> Result<usize> {
    let sent = check(unsafe {
        libc::send(
            file_descriptor,
            buffer.as_ptr() as *const c_void,
            buffer.len(),
            SEND_FLAGS,
        )
    } as i64)?;

    Ok(sent as usize)
}

pub(crate) fn recv(file_descriptor: RawSocket, buffer: &mut [u8]) -> Result<usize> {
    let received = check(unsafe {
        libc::recv(
            file_descriptor,
            buffer.as_mut_ptr() as *mut c_void,
            buffer.len(),
            0,
        )
    } as i64)?;

    Ok(received as usize)
}

pub(crate) fn send_to(
    file_descriptor: RawSocket,
    buffer: &[u8],
    address: &SocketAddr,
) -> Result<usize> {
    let (storage, length) = to_raw(address);

    let sent = check(unsafe {
        libc::sendto(
            file_descriptor,
            buffer.as_ptr() as *const c_void,
            buffer.len(),
            SEND_FLAGS,
            &storage as *const sockaddr_storage as *const sockaddr,
            length,
        )
    } as i64)?;

    Ok(sent as usize)
}

pub(crate) fn recv_from(
    file_descriptor: RawSocket,
    buffer: &mut [u8],
) -> Result<(usize, SocketAddr)> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut length = mem::size_of::<sockaddr_storage>() as socklen_t;

    let received = check(unsafe {
        libc::recvfrom(
            file_descriptor,
            buffer.as_mut_ptr() as *mut c_void,
            buffer.len(),
            0,
            &mut storage as *mut sockaddr_storage as *mut sockaddr,
            &mut length,
        )
    } as i64)?;

    Ok((received as usize, from_raw(&storage, length)?))
}

pub(crate) fn shutdown(file_descriptor: RawSocket, how: Shutdown) -> Result<()> {
    let how = match how {
        Shutdown::Read => libc::SHUT_RD,
        Shutdown::Write => libc::SHUT_WR,
        Shutdown::Both => libc::SHUT_RDWR,
    };

    check(unsafe { libc::shutdown(file_descriptor, how) } as i64)?;
    Ok(())
}

pub(crate) fn close(file_descriptor: RawSocket) -> Result<()> {
    check(unsafe { libc::close(file_descriptor) } as i64)?;
    Ok(())
}

/// Reads and clears the pending `SO_ERROR` of a descriptor.
pub(crate) fn take_error(file_descriptor: RawSocket) -> Result<Option<i32>> {
    let mut value: c_int = 0;
    let mut length = mem::size_of::<c_int>() as socklen_t;

    check(unsafe {
        libc::getsockopt(
            file_descriptor,
            SOL_SOCKET,
            SO_ERROR,
            &mut value as *mut c_int as *mut c_void,
            &mut length,
        )
    } as i64)?;

    Ok(if value == 0 { None } else { Some(value) })
}

pub(crate) fn local_addr(file_descriptor: RawSocket) -> Result<SocketAddr> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut length = mem::size_of::<sockaddr_storage>() as socklen_t;

    check(unsafe {
        libc::getsockname(
            file_descriptor,
            &mut storage as *mut sockaddr_storage as *mut sockaddr,
            &mut length,
        )
    } as i64)?;

    from_raw(&storage, length)
}

pub(crate) fn peer_addr(file_descriptor: RawSocket) -> Result<SocketAddr> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut length = mem::size_of::<sockaddr_storage>() as socklen_t;

    check(unsafe {
        libc::getpeername(
            file_descriptor,
            &mut storage as *mut sockaddr_storage as *mut sockaddr,
            &mut length,
        )
    } as i64)?;

    from_raw(&storage, length)
}

fn to_raw(address: &SocketAddr) -> (sockaddr_storage, socklen_t) {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };

    let length = match address {
        SocketAddr::V4(v4) => {
            let mut raw: sockaddr_in = unsafe { mem::zeroed() };
            raw.sin_family = AF_INET as _;
            raw.sin_port = v4.port().to_be();
            raw.sin_addr = libc::in_addr {
                s_addr: u32::from_ne_bytes(v4.ip().octets()),
            };

            unsafe { ptr::write(&mut storage as *mut _ as *mut sockaddr_in, raw) };
            mem::size_of::<sockaddr_in>()
        }
        SocketAddr::V6(v6) => {
            let mut raw: sockaddr_in6 = unsafe { mem::zeroed() };
            raw.sin6_family = AF_INET6 as _;
            raw.sin6_port = v6.port().to_be();
            raw.sin6_flowinfo = v6.flowinfo();
            raw.sin6_scope_id = v6.scope_id();
            raw.sin6_addr = libc::in6_addr {
                s6_addr: v6.ip().octets(),
            };

            unsafe { ptr::write(&mut storage as *mut _ as *mut sockaddr_in6, raw) };
            mem::size_of::<sockaddr_in6>()
        }
    };

    (storage, length as socklen_t)
}

fn from_raw(storage: &sockaddr_storage, length: socklen_t) -> Result<SocketAddr> {
    match storage.ss_family as c_int {
        AF_INET if length as usize >= mem::size_of::<sockaddr_in>() => {
            let raw = unsafe { &*(storage as *const _ as *const sockaddr_in) };
            let ip = Ipv4Addr::from(raw.sin_addr.s_addr.to_ne_bytes());

            Ok(SocketAddr::V4(SocketAddrV4::new(ip, u16::from_be(raw.sin_port))))
        }
        AF_INET6 if length as usize >= mem::size_of::<sockaddr_in6>() => {
            let raw = unsafe { &*(storage as *const _ as *const sockaddr_in6) };
            let ip = Ipv6Addr::from(raw.sin6_addr.s6_addr);

            Ok(SocketAddr::V6(SocketAddrV6::new(
                ip,
                u16::from_be(raw.sin6_port),
                raw.sin6_flowinfo,
                raw.sin6_scope_id,
            )))
        }
        _ => Err(SocketError::InvalidState("unsupported address family")),
    }
}

/// Native readiness set: a bitset addressed by descriptor number.
#[derive(Clone)]
pub struct FdSet {
    set: libc::fd_set,
    max: Option<RawSocket>,
}

impl FdSet {
    pub fn new() -> Self {
        let mut set: libc::fd_set = unsafe { mem::zeroed() };
        unsafe { libc::FD_ZERO(&mut set) };

        Self { set, max: None }
    }

    /// Adds a descriptor, failing if it lies outside the bitset.
    pub fn insert(&mut self, file_descriptor: RawSocket) -> Result<()> {
        if file_descriptor < 0 || file_descriptor as usize >= FD_SETSIZE {
            return Err(SocketError::Capacity {
                fd: file_descriptor as u64,
                limit: FD_SETSIZE,
            });
        }

        unsafe { libc::FD_SET(file_descriptor, &mut self.set) };
        self.max = Some(self.max.map_or(file_descriptor, |max| max.max(file_descriptor)));

        Ok(())
    }

    pub fn contains(&self, file_descriptor: RawSocket) -> bool {
        if file_descriptor < 0 || file_descriptor as usize >= FD_SETSIZE {
            return false;
        }

        unsafe { libc::FD_ISSET(file_descriptor, &self.set) }
    }

    pub fn is_empty(&self) -> bool {
        self.max.is_none()
    }

    /// Highest descriptor ever inserted.
    pub fn max(&self) -> Option<RawSocket> {
        self.max
    }

    pub fn clear(&mut self) {
        unsafe { libc::FD_ZERO(&mut self.set) };
        self.max = None;
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
    let highest = [read.max, write.max, except.max]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(-1);

    let mut timeval = timeout.map(|duration| libc::timeval {
        tv_sec: duration.as_secs().min(i32::MAX as u64) as _,
        tv_usec: duration.subsec_micros() as _,
    });
    let timeval_ptr = match timeval.as_mut() {
        Some(timeval) => timeval as *mut libc::timeval,
        None => ptr::null_mut(),
    };

    let ready = check(unsafe {
        libc::select(
            highest + 1,
            &mut read.set,
            &mut write.set,
            &mut except.set,
            timeval_ptr,
        )
    } as i64)?;

    Ok(ready as usize)
}

/// Waits on one descriptor with `poll`, which has no descriptor ceiling.
///
/// Returns `true` once a requested event, an error or a hang-up is reported.
pub(crate) fn poll(file_descriptor: RawSocket, interest: Interest, timeout: Duration) -> Result<bool> {
    let mut events: libc::c_short = 0;
    if interest.read {
        events |= libc::POLLIN;
    }
    if interest.write {
        events |= libc::POLLOUT;
    }
    if interest.except {
        events |= libc::POLLPRI;
    }

    let mut descriptor = libc::pollfd {
        fd: file_descriptor,
        events,
        revents: 0,
    };
    let ready = check(unsafe { libc::poll(&mut descriptor, 1, poll_millis(timeout)) } as i64)?;

    Ok(ready > 0 && descriptor.revents != 0)
}
