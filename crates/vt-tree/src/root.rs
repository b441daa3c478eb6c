//! Tree root / session: global operations composed over the device graph.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};
use vt_config::{ConfigDoc, ConfigResult};
use vt_core::{TreeError, TreeResult, Value, ValueKind};

use crate::device::{Device, Node, OpFailure, ResetKind};
use crate::variable::{Mode, Variable};

/// Owns the whole device graph plus the system log.
///
/// The log is itself a string [`Variable`] (`systemLog`, read-only, hidden
/// from display trees): appends and clears notify listeners exactly like any
/// other value change, so a log panel is just another presentation adapter.
///
/// Global operations are best-effort: a failure in one subtree is collected
/// (and mirrored into the log) without stopping the remaining subtrees.
pub struct Root {
    device: Arc<Device>,
    system_log: Arc<Variable>,
    log_lock: Mutex<()>,
}

impl Root {
    /// Wrap a fully assembled (or still-growing) top device, attaching the
    /// system log variable to it.
    pub fn new(device: Device) -> TreeResult<Self> {
        let system_log = device.add_variable(
            Variable::new("systemLog", ValueKind::Str, Mode::ReadOnly).with_hidden(true),
        )?;
        Ok(Self {
            device: Arc::new(device),
            system_log,
            log_lock: Mutex::new(()),
        })
    }

    /// The top device.
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// The system log variable, for listener registration.
    pub fn system_log(&self) -> &Arc<Variable> {
        &self.system_log
    }

    /// Current log text.
    pub fn log_text(&self) -> String {
        self.system_log.get().as_str().unwrap_or_default().to_string()
    }

    /// Append one line to the system log, notifying log listeners.
    ///
    /// Appends from concurrent threads are serialized, so no line is lost:
    /// the variable lock only covers the commit, while the whole
    /// read-append-commit must be atomic.
    pub fn log_append(&self, line: &str) {
        let _appending = crate::lock(&self.log_lock);
        let mut text = self.log_text();
        text.push_str(line);
        text.push('\n');
        // A string commit to a plain variable cannot fail validation.
        if let Err(error) = self.system_log.update(Value::Str(text)) {
            warn!(%error, "system log update failed");
        }
    }

    /// Truncate the system log, notifying log listeners.
    pub fn clear_log(&self) {
        let _appending = crate::lock(&self.log_lock);
        if let Err(error) = self.system_log.update(Value::Str(String::new())) {
            warn!(%error, "system log clear failed");
        }
    }

    /// Resolve a dotted path (relative to the top device) to a node.
    pub fn find(&self, path: &str) -> Option<Node> {
        self.device.find(path)
    }

    /// Resolve a dotted path to a variable.
    pub fn variable(&self, path: &str) -> TreeResult<Arc<Variable>> {
        match self.device.find(path) {
            Some(Node::Variable(variable)) => Ok(variable),
            _ => Err(TreeError::NoSuchNode {
                path: path.to_string(),
            }),
        }
    }

    /// Forced refresh of the whole tree; see [`Device::read_all`].
    pub fn read_all(&self) -> Vec<OpFailure> {
        let failures = self.device.read_all();
        self.log_failures("readAll", &failures);
        failures
    }

    /// Recursively hard-reset every device, best-effort.
    pub fn hard_reset(&self) -> Vec<OpFailure> {
        self.reset(ResetKind::Hard)
    }

    /// Recursively soft-reset every device, best-effort.
    pub fn soft_reset(&self) -> Vec<OpFailure> {
        self.reset(ResetKind::Soft)
    }

    /// Recursively reset counters on every device, best-effort.
    pub fn count_reset(&self) -> Vec<OpFailure> {
        self.reset(ResetKind::Count)
    }

    fn reset(&self, kind: ResetKind) -> Vec<OpFailure> {
        debug!(kind = kind.as_str(), "tree reset");
        let failures = self.device.reset(kind);
        self.log_failures(&format!("{}Reset", kind.as_str()), &failures);
        failures
    }

    /// Snapshot every read-write variable (hidden included) as a config
    /// document keyed by dotted path.
    pub fn collect_config(&self) -> ConfigDoc {
        let mut doc = ConfigDoc::new();
        self.device.for_each_variable(true, &mut |path, variable| {
            if variable.mode() != Mode::ReadWrite {
                return;
            }
            match variable.get_disp(false) {
                Ok(text) => doc.insert(path, text),
                Err(error) => warn!(path, %error, "config snapshot skipped variable"),
            }
        });
        doc
    }

    /// Apply a config document through each variable's own codec.
    ///
    /// Entries apply in document order; each failure (unknown path, bad
    /// input, out-of-range, read-only target) is collected and logged, and
    /// the remaining entries still apply. A failed entry leaves its target
    /// at the prior value.
    pub fn apply_config(&self, doc: &ConfigDoc) -> Vec<OpFailure> {
        let mut failures = Vec::new();
        for (path, text) in doc.iter() {
            let result = self
                .variable(path)
                .and_then(|variable| variable.set_disp(text));
            if let Err(error) = result {
                failures.push(OpFailure {
                    path: path.to_string(),
                    error,
                });
            }
        }
        self.log_failures("readConfig", &failures);
        failures
    }

    /// Serialize the current read-write values to a config file; format is
    /// chosen by extension (`.json`, otherwise YAML).
    pub fn write_config(&self, path: &Path) -> ConfigResult<()> {
        let doc = self.collect_config();
        if is_json(path) {
            vt_config::save_json(path, &doc)
        } else {
            vt_config::save_yaml(path, &doc)
        }
    }

    /// Load a config file and apply it; file-level problems are a
    /// `ConfigError`, per-variable problems are returned for the caller to
    /// report.
    pub fn read_config(&self, path: &Path) -> ConfigResult<Vec<OpFailure>> {
        let doc = if is_json(path) {
            vt_config::load_json(path)?
        } else {
            vt_config::load_yaml(path)?
        };
        Ok(self.apply_config(&doc))
    }

    fn log_failures(&self, operation: &str, failures: &[OpFailure]) {
        for failure in failures {
            warn!(operation, path = %failure.path, error = %failure.error, "operation failure");
            self.log_append(&format!("{operation}: {}: {}", failure.path, failure.error));
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}
