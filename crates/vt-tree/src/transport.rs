//! External read/write collaborators.
//!
//! A device may be backed by an external primitive (memory-mapped register
//! access, a native codec instance); a single variable may be backed by a
//! per-field accessor. Both are capabilities attached at assembly time.
//! Cancellation and timeouts live inside the collaborator; the tree only
//! requires that a failed transaction report
//! [`TreeError::Transport`](vt_core::TreeError::Transport) and leave the
//! affected variables at their last-known-good values.

use vt_core::{TreeError, TreeResult, Value};

use crate::device::Device;

/// Batch read/write primitive for a hardware-backed device.
///
/// `perform_read` is one external transaction producing raw values for the
/// device's own variables, keyed by child variable name; the generic
/// traversal fans the result out to the named variables instead of issuing
/// one external call per variable.
pub trait Transport: Send + Sync {
    /// One external transaction reading this device's variables.
    fn perform_read(&self, device: &Device) -> TreeResult<Vec<(String, Value)>>;

    /// One external transaction writing raw values to this device.
    fn perform_write(&self, device: &Device, values: &[(String, Value)]) -> TreeResult<()> {
        let _ = values;
        Err(TreeError::Unsupported {
            what: format!("{} transport is read-only", device.name()),
        })
    }
}

/// Per-variable backing accessor (a native counter, a register field, a
/// software knob).
///
/// Default methods report [`TreeError::Unsupported`] so an implementation
/// only overrides the direction it actually has.
pub trait ValueSource: Send + Sync {
    /// Fetch the current raw value from the collaborator.
    fn fetch(&self) -> TreeResult<Value> {
        Err(TreeError::Unsupported {
            what: "value source is write-only".to_string(),
        })
    }

    /// Push a raw value to the collaborator, or perform the action for a
    /// command variable.
    fn store(&self, value: &Value) -> TreeResult<()> {
        let _ = value;
        Err(TreeError::Unsupported {
            what: "value source is read-only".to_string(),
        })
    }
}
