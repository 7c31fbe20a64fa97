//! Readiness multiplexer.
//!
//! This module provides the select-style readiness check used both by the
//! call engine (to suspend on one handle) and by hosts (to build their own
//! event loop over many handles):
//! - [`select`]: handle collections, native sets and the wait itself
//! - [`interest`]: readiness directions for a single descriptor

pub mod interest;
pub mod select;

pub use crate::sys::FdSet;
pub use interest::Interest;
pub use select::{
    Ready, Selectable, fd_set_to_table, select, select_fd_sets, table_to_fd_set, wait_count,
};
