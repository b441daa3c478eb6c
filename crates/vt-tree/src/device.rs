//! Named composite nodes owning child variables and sub-devices.

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use tracing::debug;
use vt_core::{TreeError, TreeResult, Value};

use crate::transport::Transport;
use crate::variable::{Mode, Variable};

/// One child of a device: a leaf variable or a sub-device.
///
/// Variables and sub-devices share a single namespace within their parent.
#[derive(Clone)]
pub enum Node {
    Variable(Arc<Variable>),
    Device(Arc<Device>),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Self::Variable(v) => v.name(),
            Self::Device(d) => d.name(),
        }
    }

    /// Whether the node is excluded from generic display traversal.
    pub fn hidden(&self) -> bool {
        match self {
            Self::Variable(v) => v.hidden(),
            Self::Device(d) => d.hidden(),
        }
    }
}

/// A per-node failure collected during a best-effort bulk operation
/// (`read_all`, resets, config apply).
#[derive(Debug, Clone, PartialEq)]
pub struct OpFailure {
    /// Dotted path of the failing node, relative to the device the operation
    /// started on (resolvable through its `find`). The starting device
    /// itself reports an empty path.
    pub path: String,
    pub error: TreeError,
}

/// Which reset a bulk reset applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetKind {
    Hard,
    Soft,
    Count,
}

impl ResetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
            Self::Count => "count",
        }
    }
}

/// Reset capability a device may implement; each method defaults to a no-op
/// so a device only handles the resets that mean something to it.
pub trait ResetHook: Send + Sync {
    fn hard_reset(&self) -> TreeResult<()> {
        Ok(())
    }

    fn soft_reset(&self) -> TreeResult<()> {
        Ok(())
    }

    fn count_reset(&self) -> TreeResult<()> {
        Ok(())
    }
}

/// A named composite node: insertion-ordered children keyed by name, plus
/// optional transport and reset capabilities.
///
/// Devices are assembled once, before steady-state operation, and shared as
/// `Arc<Device>`. `hidden` and `expand` are display hints with no semantic
/// effect on programmatic access.
pub struct Device {
    name: String,
    hidden: bool,
    expand: bool,
    children: Mutex<IndexMap<String, Node>>,
    transport: Option<Arc<dyn Transport>>,
    reset: Option<Arc<dyn ResetHook>>,
}

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hidden: false,
            expand: true,
            children: Mutex::new(IndexMap::new()),
            transport: None,
            reset: None,
        }
    }

    /// Exclude from generic display traversal.
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Display hint: whether a tree view should open this node expanded.
    pub fn with_expand(mut self, expand: bool) -> Self {
        self.expand = expand;
        self
    }

    /// Attach a batch read/write transport; `read_all` then performs one
    /// external transaction for this device instead of per-variable reads.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Attach a reset capability.
    pub fn with_reset_hook(mut self, reset: Arc<dyn ResetHook>) -> Self {
        self.reset = Some(reset);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn expand(&self) -> bool {
        self.expand
    }

    /// Add a child variable, checking its shape and the shared namespace.
    pub fn add_variable(&self, variable: Variable) -> TreeResult<Arc<Variable>> {
        variable.validate_shape()?;
        let variable = Arc::new(variable);
        self.insert(Node::Variable(variable.clone()))?;
        Ok(variable)
    }

    /// Add a sub-device, checking the shared namespace.
    pub fn add_device(&self, device: Device) -> TreeResult<Arc<Device>> {
        let device = Arc::new(device);
        self.insert(Node::Device(device.clone()))?;
        Ok(device)
    }

    fn insert(&self, node: Node) -> TreeResult<()> {
        let mut children = crate::lock(&self.children);
        let name = node.name().to_string();
        if name.is_empty() || name.contains('.') {
            // Dots are reserved as the path separator.
            return Err(TreeError::Unsupported {
                what: format!("invalid node name {name:?}"),
            });
        }
        if children.contains_key(&name) {
            return Err(TreeError::DuplicateName { name });
        }
        children.insert(name, node);
        Ok(())
    }

    /// Snapshot of all children in insertion order.
    pub fn children(&self) -> Vec<Node> {
        crate::lock(&self.children).values().cloned().collect()
    }

    /// Snapshot of non-hidden children in insertion order, for building a
    /// display tree.
    pub fn visible_children(&self) -> Vec<Node> {
        self.children().into_iter().filter(|n| !n.hidden()).collect()
    }

    /// Direct child variables in insertion order.
    pub fn variables(&self) -> Vec<Arc<Variable>> {
        self.children()
            .into_iter()
            .filter_map(|node| match node {
                Node::Variable(v) => Some(v),
                Node::Device(_) => None,
            })
            .collect()
    }

    /// Direct sub-devices in insertion order.
    pub fn devices(&self) -> Vec<Arc<Device>> {
        self.children()
            .into_iter()
            .filter_map(|node| match node {
                Node::Device(d) => Some(d),
                Node::Variable(_) => None,
            })
            .collect()
    }

    /// Child by name.
    pub fn child(&self, name: &str) -> Option<Node> {
        crate::lock(&self.children).get(name).cloned()
    }

    /// Resolve a dotted path relative to this device.
    pub fn find(&self, path: &str) -> Option<Node> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut node = self.child(first)?;
        for part in parts {
            let Node::Device(device) = node else {
                return None;
            };
            node = device.child(part)?;
        }
        Some(node)
    }

    /// Visit every descendant variable with its dotted path relative to this
    /// device, in tree order. Hidden nodes are included when
    /// `include_hidden` is set; config collection uses the full walk,
    /// display trees do not.
    pub fn for_each_variable(
        &self,
        include_hidden: bool,
        visit: &mut dyn FnMut(&str, &Arc<Variable>),
    ) {
        self.walk_variables("", include_hidden, visit);
    }

    fn walk_variables(
        &self,
        prefix: &str,
        include_hidden: bool,
        visit: &mut dyn FnMut(&str, &Arc<Variable>),
    ) {
        for node in self.children() {
            if !include_hidden && node.hidden() {
                continue;
            }
            let path = join_path(prefix, node.name());
            match node {
                Node::Variable(v) => visit(&path, &v),
                Node::Device(d) => d.walk_variables(&path, include_hidden, visit),
            }
        }
    }

    /// Recursively refresh this subtree from its collaborators.
    ///
    /// With a transport attached, this device's own variables are updated by
    /// one `perform_read` fan-out; otherwise every non-hidden, non-command
    /// variable takes a forced read. Sub-devices are always recursed (their
    /// own `hidden` flag is a display hint only). Failures are collected per
    /// node; siblings proceed, and no cross-variable atomicity is promised.
    pub fn read_all(&self) -> Vec<OpFailure> {
        let mut failures = Vec::new();
        self.read_all_into("", &mut failures);
        failures
    }

    /// `here` is this device's own path relative to the operation's root
    /// (empty at the root itself), matching the `for_each_variable` and
    /// `find` conventions so a failure path resolves back through the tree.
    fn read_all_into(&self, here: &str, failures: &mut Vec<OpFailure>) {
        if let Some(transport) = &self.transport {
            debug!(device = %self.name, "batch read");
            match transport.perform_read(self) {
                Ok(values) => self.fan_out(here, values, failures),
                Err(error) => failures.push(OpFailure {
                    path: here.to_string(),
                    error,
                }),
            }
        } else {
            for variable in self.variables() {
                if variable.hidden() || variable.mode() == Mode::Command {
                    continue;
                }
                if let Err(error) = variable.get_forced() {
                    failures.push(OpFailure {
                        path: join_path(here, variable.name()),
                        error,
                    });
                }
            }
        }
        for device in self.devices() {
            device.read_all_into(&join_path(here, device.name()), failures);
        }
    }

    /// Apply one batch-read result to the named child variables.
    fn fan_out(&self, here: &str, values: Vec<(String, Value)>, failures: &mut Vec<OpFailure>) {
        for (name, value) in values {
            let path = join_path(here, &name);
            match self.child(&name) {
                Some(Node::Variable(variable)) => {
                    if let Err(error) = variable.update(value) {
                        failures.push(OpFailure { path, error });
                    }
                }
                _ => failures.push(OpFailure {
                    path,
                    error: TreeError::NoSuchNode { path: name },
                }),
            }
        }
    }

    /// Recursively apply a reset to this subtree, best-effort.
    pub fn reset(&self, kind: ResetKind) -> Vec<OpFailure> {
        let mut failures = Vec::new();
        self.reset_into("", kind, &mut failures);
        failures
    }

    fn reset_into(&self, here: &str, kind: ResetKind, failures: &mut Vec<OpFailure>) {
        if let Some(reset) = &self.reset {
            let result = match kind {
                ResetKind::Hard => reset.hard_reset(),
                ResetKind::Soft => reset.soft_reset(),
                ResetKind::Count => reset.count_reset(),
            };
            if let Err(error) = result {
                failures.push(OpFailure {
                    path: here.to_string(),
                    error,
                });
            }
        }
        for device in self.devices() {
            device.reset_into(&join_path(here, device.name()), kind, failures);
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("children", &crate::lock(&self.children).len())
            .finish_non_exhaustive()
    }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use vt_core::ValueKind;

    use super::*;

    #[test]
    fn duplicate_name_is_rejected_across_node_kinds() {
        let device = Device::new("top");
        device
            .add_variable(Variable::new("status", ValueKind::UInt, Mode::ReadOnly))
            .unwrap();

        let err = device
            .add_variable(Variable::new("status", ValueKind::UInt, Mode::ReadOnly))
            .unwrap_err();
        assert!(matches!(err, TreeError::DuplicateName { .. }));

        // A sub-device cannot share a name with a variable either.
        let err = device.add_device(Device::new("status")).unwrap_err();
        assert!(matches!(err, TreeError::DuplicateName { .. }));
    }

    #[test]
    fn children_preserve_insertion_order() {
        let device = Device::new("top");
        device
            .add_variable(Variable::new("zeta", ValueKind::UInt, Mode::ReadOnly))
            .unwrap();
        device.add_device(Device::new("alpha")).unwrap();
        device
            .add_variable(Variable::new("mid", ValueKind::UInt, Mode::ReadOnly))
            .unwrap();

        let names: Vec<_> = device.children().iter().map(|n| n.name().to_string()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn visible_traversal_skips_hidden() {
        let device = Device::new("top");
        device
            .add_variable(
                Variable::new("internal", ValueKind::UInt, Mode::ReadWrite).with_hidden(true),
            )
            .unwrap();
        device
            .add_variable(Variable::new("shown", ValueKind::UInt, Mode::ReadWrite))
            .unwrap();

        let visible: Vec<_> = device
            .visible_children()
            .iter()
            .map(|n| n.name().to_string())
            .collect();
        assert_eq!(visible, ["shown"]);

        // Programmatic access still sees the hidden variable.
        assert!(device.child("internal").is_some());
        let mut all = Vec::new();
        device.for_each_variable(true, &mut |path, _| all.push(path.to_string()));
        assert_eq!(all, ["internal", "shown"]);
    }

    #[test]
    fn find_resolves_dotted_paths() {
        let top = Device::new("top");
        let inner = top.add_device(Device::new("inner")).unwrap();
        inner
            .add_variable(Variable::new("leaf", ValueKind::UInt, Mode::ReadWrite))
            .unwrap();

        assert!(matches!(top.find("inner.leaf"), Some(Node::Variable(_))));
        assert!(matches!(top.find("inner"), Some(Node::Device(_))));
        assert!(top.find("inner.missing").is_none());
        assert!(top.find("inner.leaf.deeper").is_none());
    }

    #[test]
    fn enum_shape_is_checked_at_assembly() {
        use vt_core::EnumSpec;

        let device = Device::new("top");
        // Enum discipline over a string base type is an assembly error.
        let bad = Variable::new("state", ValueKind::Str, Mode::ReadWrite)
            .with_enum(EnumSpec::new([(0u64, "Off")]).unwrap());
        assert!(device.add_variable(bad).is_err());

        // Initial value must be a valid enum key.
        let bad_initial = Variable::new("rate", ValueKind::UInt, Mode::ReadWrite)
            .with_enum(EnumSpec::new([(1u64, "1 Hz"), (10, "10 Hz")]).unwrap());
        assert!(device.add_variable(bad_initial).is_err());

        let good = Variable::new("rate", ValueKind::UInt, Mode::ReadWrite)
            .with_enum(EnumSpec::new([(1u64, "1 Hz"), (10, "10 Hz")]).unwrap())
            .with_initial(Value::UInt(1));
        device.add_variable(good).unwrap();
    }

    struct NoopReset;

    impl ResetHook for NoopReset {}

    #[test]
    fn reset_failures_do_not_halt_siblings() {
        struct FailingReset;

        impl ResetHook for FailingReset {
            fn count_reset(&self) -> TreeResult<()> {
                Err(TreeError::Transport {
                    what: "device absent".to_string(),
                })
            }
        }

        let top = Device::new("top");
        top.add_device(Device::new("bad").with_reset_hook(Arc::new(FailingReset)))
            .unwrap();
        top.add_device(Device::new("good").with_reset_hook(Arc::new(NoopReset)))
            .unwrap();

        let failures = top.reset(ResetKind::Count);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path, "bad");
        // The failure path resolves back through the tree.
        assert!(matches!(top.find(&failures[0].path), Some(Node::Device(_))));

        // Hard reset: neither hook overrides it, nothing fails.
        assert!(top.reset(ResetKind::Hard).is_empty());
    }
}
