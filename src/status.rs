//! Numeric status codes for hosts that talk in integers.
//!
//! Non-negative values are successes (byte counts where applicable); the
//! negative constants below name the failure class. After
//! [`STATUS_ERROR`] the platform code is available from
//! [`last_error`](crate::last_error).

use crate::error::{Result, SocketError};

pub const STATUS_ERROR: i64 = -1;
pub const STATUS_WOULD_BLOCK: i64 = -2;
pub const STATUS_CLOSED: i64 = -3;

/// Maps a byte-count result to its status code.
pub fn code(result: &Result<usize>) -> i64 {
    match result {
        Ok(count) => i64::try_from(*count).unwrap_or(i64::MAX),
        Err(error) => error_code(error),
    }
}

/// Maps a unit result to `0` or its failure code.
pub fn code_unit(result: &Result<()>) -> i64 {
    match result {
        Ok(()) => 0,
        Err(error) => error_code(error),
    }
}

/// Failure class of `error`.
pub fn error_code(error: &SocketError) -> i64 {
    match error {
        SocketError::WouldBlock => STATUS_WOULD_BLOCK,
        SocketError::ConnectionClosedByPeer => STATUS_CLOSED,
        _ => STATUS_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_counts_pass_through() {
        assert_eq!(code(&Ok(0)), 0);
        assert_eq!(code(&Ok(42)), 42);
    }

    #[test]
    fn failures_map_to_negative_codes() {
        assert_eq!(code(&Err(SocketError::WouldBlock)), STATUS_WOULD_BLOCK);
        assert_eq!(code(&Err(SocketError::ConnectionClosedByPeer)), STATUS_CLOSED);
        assert_eq!(code(&Err(SocketError::Platform(111))), STATUS_ERROR);
        assert_eq!(code_unit(&Err(SocketError::InvalidState("closed"))), STATUS_ERROR);
        assert_eq!(code_unit(&Ok(())), 0);
    }
}
