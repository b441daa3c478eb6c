//! Run-control device: acquisition state, rate selection, and a run
//! counter.
//!
//! The run loop itself belongs to an external scheduler; it watches
//! `runState`/`runRate` (by listener or poll) and feeds `runCount` back
//! through `update`.

use std::sync::Arc;

use vt_core::{EnumSpec, TreeResult, Value, ValueKind};
use vt_tree::{Device, Mode, ResetHook, Variable};

struct RunCountReset {
    run_count: Arc<Variable>,
}

impl ResetHook for RunCountReset {
    fn count_reset(&self) -> TreeResult<()> {
        self.run_count.update(Value::UInt(0))
    }
}

/// Assemble a run-control device.
///
/// Variables: `runState` (RW enum Stopped/Running), `runRate` (RW enum over
/// supported rates), `runCount` (RO, fed by the run loop, zeroed by count
/// reset).
pub fn run_control(name: &str) -> TreeResult<Device> {
    let device = Device::new(name);
    device.add_variable(
        Variable::new("runState", ValueKind::UInt, Mode::ReadWrite)
            .with_enum(EnumSpec::new([(0u64, "Stopped"), (1, "Running")])?),
    )?;
    device.add_variable(
        Variable::new("runRate", ValueKind::UInt, Mode::ReadWrite)
            .with_enum(EnumSpec::new([(1u64, "1 Hz"), (10, "10 Hz"), (30, "30 Hz")])?)
            .with_initial(Value::UInt(1)),
    )?;
    let run_count =
        device.add_variable(Variable::new("runCount", ValueKind::UInt, Mode::ReadOnly))?;
    Ok(device.with_reset_hook(Arc::new(RunCountReset { run_count })))
}

#[cfg(test)]
mod tests {
    use vt_tree::{Node, Root};

    use super::*;

    fn fixture() -> Root {
        let top = Device::new("top");
        top.add_device(run_control("runControl").unwrap()).unwrap();
        Root::new(top).unwrap()
    }

    #[test]
    fn state_and_rate_select_by_label() {
        let root = fixture();
        let state = root.variable("runControl.runState").unwrap();
        let rate = root.variable("runControl.runRate").unwrap();

        assert_eq!(state.get_disp(false).unwrap(), "Stopped");
        state.set_disp("Running").unwrap();
        assert_eq!(state.get(), Value::UInt(1));

        rate.set_disp("10 Hz").unwrap();
        assert_eq!(rate.get(), Value::UInt(10));
        assert!(rate.set_disp("100 Hz").is_err());
        assert_eq!(rate.get(), Value::UInt(10));
    }

    #[test]
    fn rate_labels_enumerate_in_key_order() {
        let root = fixture();
        let rate = root.variable("runControl.runRate").unwrap();
        let labels: Vec<_> = rate.enum_spec().unwrap().labels().collect();
        assert_eq!(labels, ["1 Hz", "10 Hz", "30 Hz"]);
    }

    #[test]
    fn count_reset_zeroes_run_count() {
        let root = fixture();
        let count = root.variable("runControl.runCount").unwrap();
        count.update(Value::UInt(42)).unwrap();

        assert!(root.count_reset().is_empty());
        assert_eq!(count.get(), Value::UInt(0));

        // The device node is still a device (sanity on tree shape).
        assert!(matches!(root.find("runControl"), Some(Node::Device(_))));
    }
}
