//! vt-tree: observable typed property tree for instrument control.
//!
//! A tree of named [`Device`] composites and typed [`Variable`] leaves, each
//! leaf carrying a display codec and a set of change listeners. The tree is
//! assembled once, shared through `Arc`, and then driven by external actors:
//! user edits, poll schedulers, and hardware transactions.
//!
//! Consistency model:
//! - Each variable serializes its own raw value behind a fine-grained lock;
//!   there is no tree-wide lock.
//! - `set` commits, then notifies every listener synchronously in the
//!   calling thread. Listener dispatch runs after the value lock is dropped,
//!   so a listener may legally call back into `get`/`set`; echo loops are
//!   the observer's responsibility via [`EchoSuppressor`].
//! - Bulk operations (`read_all`, resets, config apply) are best-effort:
//!   per-node failures are collected and reported, siblings proceed, and no
//!   cross-variable atomicity is promised.

pub mod device;
pub mod listener;
pub mod root;
pub mod suppress;
pub mod transport;
pub mod variable;

pub use device::{Device, Node, OpFailure, ResetHook, ResetKind};
pub use listener::Listener;
pub use root::Root;
pub use suppress::{EchoGuard, EchoSuppressor};
pub use transport::{Transport, ValueSource};
pub use variable::{Mode, Variable};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// A poisoned variable lock only means some listener panicked mid-dispatch;
/// the committed value itself is always consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
