//! Named, typed leaf nodes with display codecs and change notification.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use vt_core::{DisplaySpec, EnumSpec, TreeError, TreeResult, Value, ValueKind};

use crate::listener::{Listener, ListenerSet};
use crate::transport::ValueSource;

/// Access mode of a variable, governing external reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Externally readable only; writes fail with `ReadOnlyViolation`.
    ReadOnly,
    /// Externally readable and writable.
    ReadWrite,
    /// Externally writable only.
    WriteOnly,
    /// Action trigger; excluded from bulk reads and generic display trees.
    Command,
}

impl Mode {
    /// Whether an external `set` is permitted.
    pub fn writable(&self) -> bool {
        matches!(self, Self::ReadWrite | Self::WriteOnly | Self::Command)
    }

    /// Short form used in display trees and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "RO",
            Self::ReadWrite => "RW",
            Self::WriteOnly => "WO",
            Self::Command => "CMD",
        }
    }
}

/// A named, typed leaf holding one raw value, its display discipline, and a
/// set of change listeners.
///
/// Identity (name, mode, base type, display discipline) is fixed at
/// creation; only the raw value mutates, behind a per-variable lock. The
/// variable is assembled with the `with_*` builders and shared as
/// `Arc<Variable>` once added to a [`Device`](crate::Device).
pub struct Variable {
    name: String,
    mode: Mode,
    kind: ValueKind,
    display: DisplaySpec,
    units: Option<String>,
    hidden: bool,
    poll_interval: Option<Duration>,
    source: Option<Arc<dyn ValueSource>>,
    value: Mutex<Value>,
    listeners: ListenerSet,
}

impl Variable {
    /// New variable with the plain display discipline and the base type's
    /// default value.
    pub fn new(name: impl Into<String>, kind: ValueKind, mode: Mode) -> Self {
        Self {
            name: name.into(),
            mode,
            kind,
            display: DisplaySpec::Plain,
            units: None,
            hidden: false,
            poll_interval: None,
            source: None,
            value: Mutex::new(Value::default_for(kind)),
            listeners: ListenerSet::default(),
        }
    }

    /// Set the display discipline.
    pub fn with_display(mut self, display: DisplaySpec) -> Self {
        self.display = display;
        self
    }

    /// Set an enum display discipline.
    pub fn with_enum(self, spec: EnumSpec) -> Self {
        self.with_display(DisplaySpec::Enum(spec))
    }

    /// Set a display-only units string.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Exclude from generic display traversal (programmatic access is
    /// unaffected).
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Cadence at which an external scheduler should force a read.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Attach a backing accessor for forced reads and writes.
    pub fn with_source(mut self, source: Arc<dyn ValueSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the initial raw value.
    pub fn with_initial(mut self, value: Value) -> Self {
        self.value = Mutex::new(value);
        self
    }

    /// Check the fixed shape at assembly time: the display discipline must
    /// fit the base type and the initial value must be representable.
    pub(crate) fn validate_shape(&self) -> TreeResult<()> {
        match &self.display {
            DisplaySpec::Plain => {}
            DisplaySpec::Enum(_) => {
                if self.kind != ValueKind::UInt {
                    return Err(TreeError::TypeMismatch {
                        expected: ValueKind::UInt,
                        found: self.kind,
                    });
                }
            }
            DisplaySpec::Range(_) => {
                if !matches!(self.kind, ValueKind::UInt | ValueKind::Float) {
                    return Err(TreeError::TypeMismatch {
                        expected: ValueKind::Float,
                        found: self.kind,
                    });
                }
            }
        }
        let initial = self.get();
        self.check_kind(&initial)?;
        self.display.validate(&initial)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn display(&self) -> &DisplaySpec {
        &self.display
    }

    /// The enumeration, for enum-typed variables.
    pub fn enum_spec(&self) -> Option<&EnumSpec> {
        self.display.enum_spec()
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval
    }

    /// Cached read of the raw value.
    pub fn get(&self) -> Value {
        crate::lock(&self.value).clone()
    }

    /// Forced read: fetch through the backing accessor, commit, notify on
    /// change, and return the fresh value.
    ///
    /// The fetch runs outside the value lock so blocking I/O never stalls
    /// concurrent cached reads. A fetch failure leaves the last-known-good
    /// value in place and is reported to the caller. Without a backing
    /// accessor this is the cached read.
    pub fn get_forced(&self) -> TreeResult<Value> {
        let Some(source) = &self.source else {
            return Ok(self.get());
        };
        let fetched = source.fetch()?;
        self.check_kind(&fetched)?;
        self.display.validate(&fetched)?;
        self.commit(fetched.clone(), false);
        Ok(fetched)
    }

    /// External write of a raw value.
    ///
    /// Mode, base type, and display discipline (range bounds, enum
    /// membership) are validated first; any failure leaves the variable
    /// unchanged and is reported, never thrown. On success the value is
    /// pushed to the backing accessor (if any), committed, and every
    /// listener is notified synchronously before `set` returns.
    pub fn set(&self, value: Value) -> TreeResult<()> {
        if !self.mode.writable() {
            return Err(TreeError::ReadOnlyViolation {
                name: self.name.clone(),
            });
        }
        self.check_kind(&value)?;
        self.display.validate(&value)?;
        if let Some(source) = &self.source {
            // I/O before commit: a failed external write must leave the
            // cached value at last-known-good.
            source.store(&value)?;
        }
        self.commit(value, true);
        Ok(())
    }

    /// Model-side commit, bypassing the mode check.
    ///
    /// Used by batch-read fan-out, reset hooks, and the system log to update
    /// read-only variables; still validated against base type and display
    /// discipline, and still notifies listeners.
    pub fn update(&self, value: Value) -> TreeResult<()> {
        self.check_kind(&value)?;
        self.display.validate(&value)?;
        self.commit(value, true);
        Ok(())
    }

    /// Display-form read: [`Variable::get`] (or forced read) composed with
    /// the codec.
    pub fn get_disp(&self, forced: bool) -> TreeResult<String> {
        let value = if forced { self.get_forced()? } else { self.get() };
        self.display.to_display(&value)
    }

    /// Display-form write: codec parse composed with [`Variable::set`].
    ///
    /// Malformed input is reported as `InvalidInput`/`InvalidEnumSelection`/
    /// `OutOfRange` with the raw value untouched.
    pub fn set_disp(&self, input: &str) -> TreeResult<()> {
        let value = self.display.from_display(self.kind, input)?;
        self.set(value)
    }

    /// Invoke a command variable, driving its backing action.
    pub fn execute(&self) -> TreeResult<()> {
        if self.mode != Mode::Command {
            return Err(TreeError::Unsupported {
                what: format!("{} is not a command", self.name),
            });
        }
        match &self.source {
            Some(source) => source.store(&Value::Bool(true)),
            None => Ok(()),
        }
    }

    /// Register a listener. Idempotent by handle identity: the same handle
    /// registered twice is dispatched once per change.
    pub fn add_listener(&self, listener: Arc<dyn Listener>) {
        self.listeners.add(listener);
    }

    /// Remove a listener; unregistered handles are a no-op.
    pub fn remove_listener(&self, listener: &Arc<dyn Listener>) {
        self.listeners.remove(listener);
    }

    fn check_kind(&self, value: &Value) -> TreeResult<()> {
        if value.kind() == self.kind {
            Ok(())
        } else {
            Err(TreeError::TypeMismatch {
                expected: self.kind,
                found: value.kind(),
            })
        }
    }

    /// Store the value under the lock, then fan out to listeners with the
    /// lock released so handlers may re-enter `get`/`set`.
    fn commit(&self, value: Value, notify_unchanged: bool) {
        let changed = {
            let mut guard = crate::lock(&self.value);
            let changed = *guard != value;
            *guard = value.clone();
            changed
        };
        if changed || notify_unchanged {
            for listener in self.listeners.snapshot() {
                listener.value_changed(self, &value);
            }
        }
    }
}

impl std::fmt::Debug for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Variable")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("kind", &self.kind)
            .field("value", &self.get())
            .finish_non_exhaustive()
    }
}
