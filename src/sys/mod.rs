//! Platform socket primitive.
//!
//! A thin per-OS layer over native sockets. Every function performs exactly
//! one native call (plus whatever bookkeeping that call needs), records the
//! outcome in the thread-local last-error slot and normalizes failures into
//! [`SocketError`]. The platform module is picked at compile time:
//!
//! - [`unix`]: BSD sockets through `libc`
//! - [`windows`]: Winsock through `windows-sys`
//!
//! Both expose the same set of free functions and an [`FdSet`] wrapper over
//! the native readiness set, so nothing above this module needs a `cfg`.

use crate::error::{Result, SocketError};

use std::cell::Cell;
use std::time::Duration;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::*;
    } else if #[cfg(windows)] {
        mod windows;
        pub use windows::*;
    } else {
        compile_error!("light-socket supports unix and windows targets only");
    }
}

thread_local! {
    /// Last platform code seen by a primitive on this thread. `0` after a success.
    static LAST_ERROR: Cell<i32> = const { Cell::new(0) };
}

/// Returns the platform error code recorded by the most recent primitive call
/// on the current thread.
///
/// Every primitive overwrites the slot, successful calls included, so read it
/// right after the failing operation and not after any other socket call.
pub fn last_error() -> i32 {
    LAST_ERROR.with(|slot| slot.get())
}

pub(crate) fn succeed() {
    LAST_ERROR.with(|slot| slot.set(0));
}

/// Records `code` and maps it to a normalized error.
pub(crate) fn fail(code: i32) -> SocketError {
    LAST_ERROR.with(|slot| slot.set(code));

    classify(code)
}

/// Records the outcome of a native call returning `-1`/`SOCKET_ERROR` on failure.
pub(crate) fn check(ret: i64) -> Result<i64> {
    if ret < 0 {
        return Err(fail(errno()));
    }

    succeed();
    Ok(ret)
}

/// Poll timeout in whole milliseconds, rounded up so a short non-zero wait
/// never turns into a busy poll.
pub(crate) fn poll_millis(timeout: Duration) -> i32 {
    let millis = timeout.as_nanos().div_ceil(1_000_000);

    i32::try_from(millis).unwrap_or(i32::MAX)
}
