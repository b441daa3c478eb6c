//! Listener capability and per-variable registry.

use std::sync::{Arc, Mutex};

use vt_core::Value;

use crate::variable::Variable;

/// Observer capability: receives the committed value after each change.
///
/// Concrete implementations are presentation adapters, loggers, or test
/// probes; they are selected at registration time, not by inheritance.
/// A handler runs synchronously in the mutating thread and must not assume
/// any ordering relative to other listeners of the same variable. Handlers
/// that write back to a presentation surface are expected to hold an
/// [`EchoSuppressor`](crate::EchoSuppressor) guard while doing so.
pub trait Listener: Send + Sync {
    /// Called once per committed change with the single new value.
    fn value_changed(&self, variable: &Variable, value: &Value);
}

/// Unordered set of listener handles with identity-based registration.
///
/// Registration is idempotent: adding the same handle twice dispatches once
/// per change, and removing an unregistered handle is a no-op.
#[derive(Default)]
pub(crate) struct ListenerSet {
    entries: Mutex<Vec<Arc<dyn Listener>>>,
}

impl ListenerSet {
    pub(crate) fn add(&self, listener: Arc<dyn Listener>) {
        let mut entries = crate::lock(&self.entries);
        if !entries.iter().any(|l| same_handle(l, &listener)) {
            entries.push(listener);
        }
    }

    pub(crate) fn remove(&self, listener: &Arc<dyn Listener>) {
        crate::lock(&self.entries).retain(|l| !same_handle(l, listener));
    }

    /// Snapshot for dispatch, taken so a handler can re-enter add/remove
    /// without deadlocking the registry.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn Listener>> {
        crate::lock(&self.entries).clone()
    }
}

/// Handle identity: same allocation, ignoring the vtable.
fn same_handle(a: &Arc<dyn Listener>, b: &Arc<dyn Listener>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
