//! PRBS transmitter/receiver device wrappers.
//!
//! The pseudo-random-bit-sequence generator/checker itself is an external
//! collaborator supplied through [`PrbsCore`]; these wrappers expose its
//! controls and counters as tree variables. Counter variables are polled and
//! also served by a batch transport, so a bulk read samples the core once
//! and fans the result out instead of issuing one call per counter.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;
use vt_core::{DisplaySpec, EnumSpec, RangeSpec, TreeError, TreeResult, Value, ValueKind};
use vt_tree::{Device, Mode, ResetHook, Transport, ValueSource, Variable};

/// Native PRBS generator/checker surface.
///
/// The bit-sequence algorithm lives behind this trait; the wrappers only
/// configure it and read its counters.
pub trait PrbsCore: Send + Sync {
    /// Start continuous generation of frames of `frame_size` bytes.
    fn enable(&self, frame_size: u64);

    /// Stop continuous generation.
    fn disable(&self);

    /// Generate a single frame of `frame_size` bytes.
    fn gen_frame(&self, frame_size: u64);

    fn tx_count(&self) -> u64;
    fn tx_bytes(&self) -> u64;
    fn tx_errors(&self) -> u64;

    fn rx_count(&self) -> u64;
    fn rx_bytes(&self) -> u64;
    fn rx_errors(&self) -> u64;

    /// Zero every counter.
    fn reset_count(&self);
}

/// Software transmitter state shared between the size and enable knobs.
struct TxState {
    enabled: bool,
    frame_size: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct TxSizeSource {
    state: Arc<Mutex<TxState>>,
}

impl ValueSource for TxSizeSource {
    fn fetch(&self) -> TreeResult<Value> {
        Ok(Value::UInt(lock(&self.state).frame_size))
    }

    fn store(&self, value: &Value) -> TreeResult<()> {
        lock(&self.state).frame_size = expect_uint(value)?;
        Ok(())
    }
}

struct TxEnableSource {
    core: Arc<dyn PrbsCore>,
    state: Arc<Mutex<TxState>>,
}

impl ValueSource for TxEnableSource {
    fn fetch(&self) -> TreeResult<Value> {
        Ok(Value::UInt(u64::from(lock(&self.state).enabled)))
    }

    fn store(&self, value: &Value) -> TreeResult<()> {
        let desired = expect_uint(value)? != 0;
        let mut state = lock(&self.state);
        // Drive the core on the edge only; re-writing the same state is a
        // no-op against the collaborator.
        if state.enabled != desired {
            if desired {
                debug!(frame_size = state.frame_size, "prbs enable");
                self.core.enable(state.frame_size);
            } else {
                debug!("prbs disable");
                self.core.disable();
            }
            state.enabled = desired;
        }
        Ok(())
    }
}

struct GenFrameAction {
    core: Arc<dyn PrbsCore>,
    state: Arc<Mutex<TxState>>,
}

impl ValueSource for GenFrameAction {
    fn store(&self, _value: &Value) -> TreeResult<()> {
        let frame_size = lock(&self.state).frame_size;
        self.core.gen_frame(frame_size);
        Ok(())
    }
}

struct ResetCountAction {
    core: Arc<dyn PrbsCore>,
}

impl ValueSource for ResetCountAction {
    fn store(&self, _value: &Value) -> TreeResult<()> {
        self.core.reset_count();
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Counter {
    TxCount,
    TxBytes,
    TxErrors,
    RxCount,
    RxBytes,
    RxErrors,
}

impl Counter {
    fn sample(self, core: &dyn PrbsCore) -> u64 {
        match self {
            Self::TxCount => core.tx_count(),
            Self::TxBytes => core.tx_bytes(),
            Self::TxErrors => core.tx_errors(),
            Self::RxCount => core.rx_count(),
            Self::RxBytes => core.rx_bytes(),
            Self::RxErrors => core.rx_errors(),
        }
    }
}

/// Single-counter accessor for polled forced reads.
struct CounterSource {
    core: Arc<dyn PrbsCore>,
    counter: Counter,
}

impl ValueSource for CounterSource {
    fn fetch(&self) -> TreeResult<Value> {
        Ok(Value::UInt(self.counter.sample(self.core.as_ref())))
    }
}

/// Batch transport: one core sample covering a device's counter variables.
struct CounterBatch {
    core: Arc<dyn PrbsCore>,
    counters: Vec<(&'static str, Counter)>,
}

impl Transport for CounterBatch {
    fn perform_read(&self, _device: &Device) -> TreeResult<Vec<(String, Value)>> {
        Ok(self
            .counters
            .iter()
            .map(|(name, counter)| {
                ((*name).to_string(), Value::UInt(counter.sample(self.core.as_ref())))
            })
            .collect())
    }
}

struct CountReset {
    core: Arc<dyn PrbsCore>,
}

impl ResetHook for CountReset {
    fn count_reset(&self) -> TreeResult<()> {
        self.core.reset_count();
        Ok(())
    }
}

const POLL: Duration = Duration::from_secs(1);

fn counter_variable(name: &'static str, core: &Arc<dyn PrbsCore>, counter: Counter) -> Variable {
    Variable::new(name, ValueKind::UInt, Mode::ReadOnly)
        .with_poll_interval(POLL)
        .with_source(Arc::new(CounterSource {
            core: core.clone(),
            counter,
        }))
}

/// PRBS software transmitter wrapper.
///
/// Variables: `txSize` (RW, range-checked frame size in bytes), `txEnable`
/// (RW enum False/True, driving the core on state edges), `genFrame`
/// (command), polled `txErrors`/`txCount`/`txBytes`, and `resetCount`
/// (command). Count reset is also wired as the device's reset hook.
pub fn prbs_tx(name: &str, core: Arc<dyn PrbsCore>) -> TreeResult<Device> {
    let state = Arc::new(Mutex::new(TxState {
        enabled: false,
        frame_size: 1000,
    }));

    let device = Device::new(name)
        .with_transport(Arc::new(CounterBatch {
            core: core.clone(),
            counters: vec![
                ("txErrors", Counter::TxErrors),
                ("txCount", Counter::TxCount),
                ("txBytes", Counter::TxBytes),
            ],
        }))
        .with_reset_hook(Arc::new(CountReset { core: core.clone() }));

    device.add_variable(
        Variable::new("txSize", ValueKind::UInt, Mode::ReadWrite)
            .with_display(DisplaySpec::Range(RangeSpec::new(1.0, 65536.0)?))
            .with_units("bytes")
            .with_initial(Value::UInt(1000))
            .with_source(Arc::new(TxSizeSource {
                state: state.clone(),
            })),
    )?;
    device.add_variable(
        Variable::new("txEnable", ValueKind::UInt, Mode::ReadWrite)
            .with_enum(EnumSpec::new([(0u64, "False"), (1, "True")])?)
            .with_source(Arc::new(TxEnableSource {
                core: core.clone(),
                state: state.clone(),
            })),
    )?;
    device.add_variable(
        Variable::new("genFrame", ValueKind::Bool, Mode::Command).with_source(Arc::new(
            GenFrameAction {
                core: core.clone(),
                state,
            },
        )),
    )?;
    device.add_variable(counter_variable("txErrors", &core, Counter::TxErrors))?;
    device.add_variable(counter_variable("txCount", &core, Counter::TxCount))?;
    device.add_variable(counter_variable("txBytes", &core, Counter::TxBytes))?;
    device.add_variable(
        Variable::new("resetCount", ValueKind::Bool, Mode::Command)
            .with_source(Arc::new(ResetCountAction { core })),
    )?;

    Ok(device)
}

/// PRBS software receiver wrapper: polled `rxErrors`/`rxCount`/`rxBytes`
/// plus a `resetCount` command, with the same batch/reset wiring as the
/// transmitter.
pub fn prbs_rx(name: &str, core: Arc<dyn PrbsCore>) -> TreeResult<Device> {
    let device = Device::new(name)
        .with_transport(Arc::new(CounterBatch {
            core: core.clone(),
            counters: vec![
                ("rxErrors", Counter::RxErrors),
                ("rxCount", Counter::RxCount),
                ("rxBytes", Counter::RxBytes),
            ],
        }))
        .with_reset_hook(Arc::new(CountReset { core: core.clone() }));

    device.add_variable(counter_variable("rxErrors", &core, Counter::RxErrors))?;
    device.add_variable(counter_variable("rxCount", &core, Counter::RxCount))?;
    device.add_variable(counter_variable("rxBytes", &core, Counter::RxBytes))?;
    device.add_variable(
        Variable::new("resetCount", ValueKind::Bool, Mode::Command)
            .with_source(Arc::new(ResetCountAction { core })),
    )?;

    Ok(device)
}

fn expect_uint(value: &Value) -> TreeResult<u64> {
    value.as_u64().ok_or(TreeError::TypeMismatch {
        expected: ValueKind::UInt,
        found: value.kind(),
    })
}

/// Deterministic software stand-in for the native generator/checker.
///
/// Models the control/counter surface only, with loopback counting (each
/// generated frame is also "received"); it does not produce an actual bit
/// sequence. Used by the demo CLI and by tests.
#[derive(Default)]
pub struct SimPrbsCore {
    enabled: AtomicBool,
    tx_count: AtomicU64,
    tx_bytes: AtomicU64,
    tx_errors: AtomicU64,
    rx_count: AtomicU64,
    rx_bytes: AtomicU64,
    rx_errors: AtomicU64,
}

impl SimPrbsCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether continuous generation is currently enabled.
    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Record one corrupted received frame.
    pub fn inject_rx_error(&self) {
        self.rx_errors.fetch_add(1, Ordering::SeqCst);
    }
}

impl PrbsCore for SimPrbsCore {
    fn enable(&self, _frame_size: u64) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    fn gen_frame(&self, frame_size: u64) {
        self.tx_count.fetch_add(1, Ordering::SeqCst);
        self.tx_bytes.fetch_add(frame_size, Ordering::SeqCst);
        self.rx_count.fetch_add(1, Ordering::SeqCst);
        self.rx_bytes.fetch_add(frame_size, Ordering::SeqCst);
    }

    fn tx_count(&self) -> u64 {
        self.tx_count.load(Ordering::SeqCst)
    }

    fn tx_bytes(&self) -> u64 {
        self.tx_bytes.load(Ordering::SeqCst)
    }

    fn tx_errors(&self) -> u64 {
        self.tx_errors.load(Ordering::SeqCst)
    }

    fn rx_count(&self) -> u64 {
        self.rx_count.load(Ordering::SeqCst)
    }

    fn rx_bytes(&self) -> u64 {
        self.rx_bytes.load(Ordering::SeqCst)
    }

    fn rx_errors(&self) -> u64 {
        self.rx_errors.load(Ordering::SeqCst)
    }

    fn reset_count(&self) {
        self.tx_count.store(0, Ordering::SeqCst);
        self.tx_bytes.store(0, Ordering::SeqCst);
        self.tx_errors.store(0, Ordering::SeqCst);
        self.rx_count.store(0, Ordering::SeqCst);
        self.rx_bytes.store(0, Ordering::SeqCst);
        self.rx_errors.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use vt_tree::Root;

    use super::*;

    #[derive(Default)]
    struct RecordingCore {
        enables: Mutex<Vec<u64>>,
        disables: AtomicUsize,
        frames: Mutex<Vec<u64>>,
        resets: AtomicUsize,
    }

    impl PrbsCore for RecordingCore {
        fn enable(&self, frame_size: u64) {
            lock(&self.enables).push(frame_size);
        }

        fn disable(&self) {
            self.disables.fetch_add(1, Ordering::SeqCst);
        }

        fn gen_frame(&self, frame_size: u64) {
            lock(&self.frames).push(frame_size);
        }

        fn tx_count(&self) -> u64 {
            lock(&self.frames).len() as u64
        }

        fn tx_bytes(&self) -> u64 {
            lock(&self.frames).iter().sum()
        }

        fn tx_errors(&self) -> u64 {
            0
        }

        fn rx_count(&self) -> u64 {
            0
        }

        fn rx_bytes(&self) -> u64 {
            0
        }

        fn rx_errors(&self) -> u64 {
            0
        }

        fn reset_count(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn variable(device: &Device, name: &str) -> Arc<Variable> {
        match device.child(name) {
            Some(vt_tree::Node::Variable(v)) => v,
            _ => panic!("no variable {name}"),
        }
    }

    fn tx_fixture() -> (Arc<RecordingCore>, Arc<Device>) {
        let core = Arc::new(RecordingCore::default());
        let top = Device::new("top");
        let tx = top
            .add_device(prbs_tx("prbsTx", core.clone()).unwrap())
            .unwrap();
        (core, tx)
    }

    #[test]
    fn tx_enable_drives_core_on_edges_only() {
        let (core, tx) = tx_fixture();
        let enable = variable(&tx, "txEnable");

        enable.set_disp("True").unwrap();
        enable.set_disp("True").unwrap(); // same state: no second enable
        enable.set_disp("False").unwrap();

        assert_eq!(*lock(&core.enables), [1000]);
        assert_eq!(core.disables.load(Ordering::SeqCst), 1);
        assert_eq!(enable.get_disp(false).unwrap(), "False");
    }

    #[test]
    fn gen_frame_uses_current_size() {
        let (core, tx) = tx_fixture();
        let size = variable(&tx, "txSize");
        let gen_frame = variable(&tx, "genFrame");

        size.set(Value::UInt(256)).unwrap();
        gen_frame.execute().unwrap();
        assert_eq!(*lock(&core.frames), [256]);

        // Out-of-range size is rejected before it reaches the core.
        assert!(size.set(Value::UInt(1_000_000)).is_err());
        assert_eq!(size.get(), Value::UInt(256));
    }

    #[test]
    fn batch_read_updates_counters_from_one_sample() {
        let core = Arc::new(SimPrbsCore::new());
        let top = Device::new("top");
        top.add_device(prbs_tx("prbsTx", core.clone()).unwrap()).unwrap();
        top.add_device(prbs_rx("prbsRx", core.clone()).unwrap()).unwrap();
        let root = Root::new(top).unwrap();

        core.gen_frame(100);
        core.gen_frame(100);
        core.inject_rx_error();

        let failures = root.read_all();
        assert!(failures.is_empty(), "failures: {failures:?}");
        assert_eq!(root.variable("prbsTx.txCount").unwrap().get(), Value::UInt(2));
        assert_eq!(root.variable("prbsTx.txBytes").unwrap().get(), Value::UInt(200));
        assert_eq!(root.variable("prbsRx.rxCount").unwrap().get(), Value::UInt(2));
        assert_eq!(root.variable("prbsRx.rxErrors").unwrap().get(), Value::UInt(1));
    }

    #[test]
    fn count_reset_reaches_the_core() {
        let core = Arc::new(SimPrbsCore::new());
        let top = Device::new("top");
        top.add_device(prbs_tx("prbsTx", core.clone()).unwrap()).unwrap();
        let root = Root::new(top).unwrap();

        core.gen_frame(64);
        assert!(root.count_reset().is_empty());
        assert_eq!(core.tx_count(), 0);
        assert_eq!(core.tx_bytes(), 0);

        // The resetCount command does the same through the tree.
        core.gen_frame(64);
        root.variable("prbsTx.resetCount").unwrap().execute().unwrap();
        assert_eq!(core.tx_count(), 0);
    }
}
