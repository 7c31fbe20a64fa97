//! Select-style readiness checks over many handles.
//!
//! The host hands over ordered collections of socket handles; these are
//! translated into native readiness sets with [`table_to_fd_set`], waited on
//! with [`select_fd_sets`], and mapped back to the original handles with
//! [`fd_set_to_table`]. [`select`] chains the three steps.
//!
//! # Example
//!
//! ```no_run
//! use light_socket::{Socket, reactor};
//!
//! # fn run(sockets: Vec<Socket>) -> light_socket::Result<()> {
//! let ready = reactor::select(&sockets, &[], &[], Some(0.5))?;
//! for socket in ready.read {
//!     println!("readable: {:?}", socket.raw());
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, SocketError};
use crate::reactor::interest::Interest;
use crate::sys::{self, FdSet, RawSocket};

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

thread_local! {
    /// Number of suspending readiness waits issued on this thread.
    static WAIT_COUNT: Cell<u64> = const { Cell::new(0) };
}

/// Number of single-handle readiness waits the call engine has issued on
/// the current thread.
///
/// Only suspending calls wait; `*_now` calls and plain calls on a handle set
/// non-blocking never move this counter.
pub fn wait_count() -> u64 {
    WAIT_COUNT.with(|count| count.get())
}

/// Anything that can stand in a host-visible collection of sockets.
pub trait Selectable {
    /// The native descriptor, or `None` when the handle is not open.
    fn raw_socket(&self) -> Option<RawSocket>;
}

impl<T: Selectable + ?Sized> Selectable for &T {
    fn raw_socket(&self) -> Option<RawSocket> {
        (**self).raw_socket()
    }
}

impl<T: Selectable + ?Sized> Selectable for &mut T {
    fn raw_socket(&self) -> Option<RawSocket> {
        (**self).raw_socket()
    }
}

impl<T: Selectable + ?Sized> Selectable for Box<T> {
    fn raw_socket(&self) -> Option<RawSocket> {
        (**self).raw_socket()
    }
}

impl<T: Selectable + ?Sized> Selectable for Rc<T> {
    fn raw_socket(&self) -> Option<RawSocket> {
        (**self).raw_socket()
    }
}

impl<T: Selectable + ?Sized> Selectable for Arc<T> {
    fn raw_socket(&self) -> Option<RawSocket> {
        (**self).raw_socket()
    }
}

impl<T: Selectable> Selectable for RefCell<T> {
    // A handle mutably borrowed elsewhere is treated like a closed one.
    fn raw_socket(&self) -> Option<RawSocket> {
        self.try_borrow().ok().and_then(|inner| inner.raw_socket())
    }
}

/// Handles found ready by [`select`], borrowed from the input collections in
/// their original order.
#[derive(Debug)]
pub struct Ready<'a, H> {
    pub read: Vec<&'a H>,
    pub write: Vec<&'a H>,
    pub except: Vec<&'a H>,
}

impl<H> Ready<'_, H> {
    /// Total number of ready entries across the three collections.
    pub fn count(&self) -> usize {
        self.read.len() + self.write.len() + self.except.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Inserts the descriptor of every open handle into `set`.
///
/// Unopened and closed handles are skipped. Returns the highest descriptor
/// inserted, or `None` when nothing was.
///
/// # Errors
/// [`SocketError::Capacity`] when a descriptor does not fit the native set.
pub fn table_to_fd_set<H: Selectable>(handles: &[H], set: &mut FdSet) -> Result<Option<RawSocket>> {
    let mut highest = None;

    for (index, handle) in handles.iter().enumerate() {
        let Some(raw) = handle.raw_socket() else {
            tracing::debug!(index, "skipping handle that is not open");
            continue;
        };

        set.insert(raw)?;
        highest = Some(highest.map_or(raw, |max: RawSocket| max.max(raw)));
    }

    Ok(highest)
}

/// Returns the handles of `handles` whose descriptor is present in `set`,
/// in input order.
///
/// Descriptors in `set` that belong to no handle are ignored.
pub fn fd_set_to_table<'a, H: Selectable>(handles: &'a [H], set: &FdSet) -> Vec<&'a H> {
    handles
        .iter()
        .filter(|handle| handle.raw_socket().is_some_and(|raw| set.contains(raw)))
        .collect()
}

/// Waits on three native sets. `timeout` is in seconds; `None`, negative or
/// non-finite values block indefinitely and `0.0` polls.
///
/// On return each set holds only its ready descriptors. A wait interrupted
/// by a signal resumes with the remaining time.
pub fn select_fd_sets(
    read: &mut FdSet,
    write: &mut FdSet,
    except: &mut FdSet,
    timeout: Option<f64>,
) -> Result<usize> {
    if read.is_empty() && write.is_empty() && except.is_empty() {
        return Err(SocketError::InvalidState("no open handles to select on"));
    }

    // A deadline past what `Instant` can represent is as good as none.
    let deadline = timeout_from_secs(timeout).and_then(|timeout| Instant::now().checked_add(timeout));
    let (original_read, original_write, original_except) =
        (read.clone(), write.clone(), except.clone());

    loop {
        let remaining = deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()));

        match sys::select(read, write, except, remaining) {
            Err(SocketError::Interrupted) => {
                *read = original_read.clone();
                *write = original_write.clone();
                *except = original_except.clone();
            }
            result => return result,
        }
    }
}

/// Polls many handles for readiness.
///
/// Returns the ready subset of each collection; all three are empty when the
/// timeout elapsed first.
///
/// # Errors
/// - [`SocketError::InvalidState`] if no collection holds an open handle
/// - [`SocketError::Capacity`] if a descriptor does not fit the native set
/// - [`SocketError::Platform`] if the native call fails
pub fn select<'a, H: Selectable>(
    read: &'a [H],
    write: &'a [H],
    except: &'a [H],
    timeout: Option<f64>,
) -> Result<Ready<'a, H>> {
    let mut read_set = FdSet::new();
    let mut write_set = FdSet::new();
    let mut except_set = FdSet::new();

    table_to_fd_set(read, &mut read_set)?;
    table_to_fd_set(write, &mut write_set)?;
    table_to_fd_set(except, &mut except_set)?;

    let count = select_fd_sets(&mut read_set, &mut write_set, &mut except_set, timeout)?;
    if count == 0 {
        return Ok(Ready {
            read: Vec::new(),
            write: Vec::new(),
            except: Vec::new(),
        });
    }

    Ok(Ready {
        read: fd_set_to_table(read, &read_set),
        write: fd_set_to_table(write, &write_set),
        except: fd_set_to_table(except, &except_set),
    })
}

/// Checks a single descriptor, waiting at most `timeout`.
///
/// Uses the platform's single-descriptor poll rather than an [`FdSet`], so
/// descriptors beyond `FD_SETSIZE` work. Returns `false` on timeout or when a
/// signal cut the wait short.
pub(crate) fn probe(raw: RawSocket, interest: Interest, timeout: Duration) -> Result<bool> {
    match sys::poll(raw, interest, timeout) {
        Ok(ready) => Ok(ready),
        Err(SocketError::Interrupted) => Ok(false),
        Err(error) => Err(error),
    }
}

/// Suspension point of the call engine: one bounded wait on one handle.
pub(crate) fn wait(raw: RawSocket, interest: Interest, slice: Duration) -> Result<bool> {
    WAIT_COUNT.with(|count| count.set(count.get() + 1));
    tracing::trace!(fd = ?raw, ?interest, ?slice, "waiting for readiness");

    probe(raw, interest, slice)
}

// Out-of-range values block indefinitely, like negative ones.
fn timeout_from_secs(timeout: Option<f64>) -> Option<Duration> {
    match timeout {
        Some(secs) if secs >= 0.0 => Duration::try_from_secs_f64(secs).ok(),
        _ => None,
    }
}
