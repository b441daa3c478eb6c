//! End-to-end tests over assembled trees: enum round trips, batched
//! transport reads, and config save/load.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use vt_core::{DisplaySpec, EnumSpec, RangeSpec, TreeError, TreeResult, Value, ValueKind};
use vt_tree::{Device, Mode, Root, Transport, Variable};

#[test]
fn enum_variable_end_to_end() {
    let top = Device::new("top");
    let dev = top.add_device(Device::new("writer")).unwrap();
    let open = dev
        .add_variable(
            Variable::new("open", ValueKind::UInt, Mode::ReadWrite)
                .with_enum(EnumSpec::new([(0u64, "False"), (1, "True")]).unwrap()),
        )
        .unwrap();

    open.set_disp("True").unwrap();
    assert_eq!(open.get(), Value::UInt(1));
    assert_eq!(open.get_disp(false).unwrap(), "True");

    // Index-based selection, as a list-presenting adapter would do it.
    let spec = open.enum_spec().unwrap();
    let key = spec.key_at(0).unwrap();
    open.set(Value::UInt(key)).unwrap();
    assert_eq!(open.get_disp(false).unwrap(), "False");
}

struct CounterBlock {
    reads: AtomicUsize,
}

impl Transport for CounterBlock {
    fn perform_read(&self, _device: &Device) -> TreeResult<Vec<(String, Value)>> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst) as u64;
        Ok(vec![
            ("rxErrors".to_string(), Value::UInt(n)),
            ("rxCount".to_string(), Value::UInt(100 + n)),
            ("rxBytes".to_string(), Value::UInt(1000 + n)),
        ])
    }
}

#[test]
fn read_all_batches_one_transport_call() {
    let transport = Arc::new(CounterBlock {
        reads: AtomicUsize::new(0),
    });
    let top = Device::new("top");
    let rx = top
        .add_device(Device::new("rx").with_transport(transport.clone()))
        .unwrap();
    for name in ["rxErrors", "rxCount", "rxBytes"] {
        rx.add_variable(Variable::new(name, ValueKind::UInt, Mode::ReadOnly))
            .unwrap();
    }
    let root = Root::new(top).unwrap();

    let failures = root.read_all();
    assert!(failures.is_empty(), "failures: {failures:?}");
    assert_eq!(transport.reads.load(Ordering::SeqCst), 1);
    assert_eq!(root.variable("rx.rxErrors").unwrap().get(), Value::UInt(0));
    assert_eq!(root.variable("rx.rxCount").unwrap().get(), Value::UInt(100));
    assert_eq!(root.variable("rx.rxBytes").unwrap().get(), Value::UInt(1000));
}

struct BrokenBlock;

impl Transport for BrokenBlock {
    fn perform_read(&self, _device: &Device) -> TreeResult<Vec<(String, Value)>> {
        Err(TreeError::Transport {
            what: "register timeout".to_string(),
        })
    }
}

#[test]
fn transport_failure_does_not_halt_sibling_devices() {
    let top = Device::new("top");
    let bad = top
        .add_device(Device::new("bad").with_transport(Arc::new(BrokenBlock)))
        .unwrap();
    bad.add_variable(Variable::new("value", ValueKind::UInt, Mode::ReadOnly))
        .unwrap();
    let good = top
        .add_device(Device::new("good").with_transport(Arc::new(CounterBlock {
            reads: AtomicUsize::new(0),
        })))
        .unwrap();
    for name in ["rxErrors", "rxCount", "rxBytes"] {
        good.add_variable(Variable::new(name, ValueKind::UInt, Mode::ReadOnly))
            .unwrap();
    }
    let root = Root::new(top).unwrap();

    let failures = root.read_all();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path, "bad");
    assert!(matches!(failures[0].error, TreeError::Transport { .. }));
    // The failure path is root-relative, like config paths and `find`.
    assert!(root.find(&failures[0].path).is_some());
    // The sibling still read.
    assert_eq!(root.variable("good.rxCount").unwrap().get(), Value::UInt(100));
    // And the failure landed in the system log.
    assert!(root.log_text().contains("bad"));
}

fn config_tree() -> Root {
    let top = Device::new("top");
    let tx = top.add_device(Device::new("tx")).unwrap();
    tx.add_variable(
        Variable::new("size", ValueKind::UInt, Mode::ReadWrite)
            .with_display(DisplaySpec::Range(RangeSpec::new(1.0, 1000.0).unwrap()))
            .with_initial(Value::UInt(100)),
    )
    .unwrap();
    tx.add_variable(Variable::new("label", ValueKind::Str, Mode::ReadWrite))
        .unwrap();
    Root::new(top).unwrap()
}

#[test]
fn read_config_applies_valid_and_reports_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.yml");
    std::fs::write(
        &path,
        "tx.label: \"run 42\"\ntx.size: \"9999\"\n",
    )
    .unwrap();

    let root = config_tree();
    let failures = root.read_config(&path).unwrap();

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path, "tx.size");
    assert!(matches!(failures[0].error, TreeError::OutOfRange { .. }));
    // The invalid entry left its target at the prior value.
    assert_eq!(root.variable("tx.size").unwrap().get(), Value::UInt(100));
    // The valid entry applied.
    assert_eq!(root.variable("tx.label").unwrap().get(), Value::from("run 42"));
}

#[test]
fn write_then_read_config_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.yml");

    let saved = config_tree();
    saved.variable("tx.size").unwrap().set(Value::UInt(250)).unwrap();
    saved
        .variable("tx.label")
        .unwrap()
        .set(Value::from("golden"))
        .unwrap();
    saved.write_config(&path).unwrap();

    let loaded = config_tree();
    let failures = loaded.read_config(&path).unwrap();
    assert!(failures.is_empty(), "failures: {failures:?}");
    assert_eq!(loaded.variable("tx.size").unwrap().get(), Value::UInt(250));
    assert_eq!(
        loaded.variable("tx.label").unwrap().get(),
        Value::from("golden")
    );
}
