//! Data file writer device wrapper.
//!
//! The file backend (buffered stream writer, frame sink) is an external
//! collaborator supplied through [`WriterCore`]; the wrapper exposes its
//! file controls and status counters as tree variables. `open` drives the
//! core on state edges only, like the PRBS enable knob, and a failed open
//! leaves the variable reading `False`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;
use vt_core::{EnumSpec, TreeError, TreeResult, Value, ValueKind};
use vt_tree::{Device, Mode, Transport, ValueSource, Variable};

/// File writer backend surface.
///
/// `open` receives the settings captured at the moment the file is opened;
/// later knob edits apply to the next open.
pub trait WriterCore: Send + Sync {
    /// Open `path` for writing with the given buffer and size limits
    /// (`max_size` 0 means unlimited).
    fn open(&self, path: &str, buffer_size: u64, max_size: u64) -> TreeResult<()>;

    /// Close the current file.
    fn close(&self) -> TreeResult<()>;

    /// Bytes written to the current file.
    fn file_size(&self) -> u64;

    /// Frames written to the current file.
    fn frame_count(&self) -> u64;
}

/// Writer settings shared between the knob sources and the open control.
struct WriterState {
    data_file: String,
    open: bool,
    buffer_size: u64,
    max_size: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct DataFileSource {
    state: Arc<Mutex<WriterState>>,
}

impl ValueSource for DataFileSource {
    fn fetch(&self) -> TreeResult<Value> {
        Ok(Value::Str(lock(&self.state).data_file.clone()))
    }

    fn store(&self, value: &Value) -> TreeResult<()> {
        lock(&self.state).data_file = expect_str(value)?.to_string();
        Ok(())
    }
}

struct BufferSizeSource {
    state: Arc<Mutex<WriterState>>,
}

impl ValueSource for BufferSizeSource {
    fn fetch(&self) -> TreeResult<Value> {
        Ok(Value::UInt(lock(&self.state).buffer_size))
    }

    fn store(&self, value: &Value) -> TreeResult<()> {
        lock(&self.state).buffer_size = expect_uint(value)?;
        Ok(())
    }
}

struct MaxSizeSource {
    state: Arc<Mutex<WriterState>>,
}

impl ValueSource for MaxSizeSource {
    fn fetch(&self) -> TreeResult<Value> {
        Ok(Value::UInt(lock(&self.state).max_size))
    }

    fn store(&self, value: &Value) -> TreeResult<()> {
        lock(&self.state).max_size = expect_uint(value)?;
        Ok(())
    }
}

struct OpenSource {
    core: Arc<dyn WriterCore>,
    state: Arc<Mutex<WriterState>>,
}

impl ValueSource for OpenSource {
    fn fetch(&self) -> TreeResult<Value> {
        Ok(Value::UInt(u64::from(lock(&self.state).open)))
    }

    fn store(&self, value: &Value) -> TreeResult<()> {
        let desired = expect_uint(value)? != 0;
        let mut state = lock(&self.state);
        // Edge-driven, like the PRBS enable knob. A failed open or close
        // propagates, so the variable keeps reading the prior state.
        if state.open != desired {
            if desired {
                debug!(file = %state.data_file, "data writer open");
                self.core
                    .open(&state.data_file, state.buffer_size, state.max_size)?;
            } else {
                debug!("data writer close");
                self.core.close()?;
            }
            state.open = desired;
        }
        Ok(())
    }
}

/// `autoName` command: stamp a fresh file name into `dataFile`.
struct AutoNameAction {
    data_file: Arc<Variable>,
}

impl ValueSource for AutoNameAction {
    fn store(&self, _value: &Value) -> TreeResult<()> {
        let name = chrono::Local::now()
            .format("data_%Y%m%d_%H%M%S.dat")
            .to_string();
        self.data_file.set(Value::Str(name))
    }
}

#[derive(Clone, Copy)]
enum Status {
    FileSize,
    FrameCount,
}

impl Status {
    fn sample(self, core: &dyn WriterCore) -> u64 {
        match self {
            Self::FileSize => core.file_size(),
            Self::FrameCount => core.frame_count(),
        }
    }
}

struct StatusSource {
    core: Arc<dyn WriterCore>,
    status: Status,
}

impl ValueSource for StatusSource {
    fn fetch(&self) -> TreeResult<Value> {
        Ok(Value::UInt(self.status.sample(self.core.as_ref())))
    }
}

/// Batch transport: one core sample covering both status variables.
struct StatusBatch {
    core: Arc<dyn WriterCore>,
}

impl Transport for StatusBatch {
    fn perform_read(&self, _device: &Device) -> TreeResult<Vec<(String, Value)>> {
        Ok(vec![
            (
                "fileSize".to_string(),
                Value::UInt(self.core.file_size()),
            ),
            (
                "frameCount".to_string(),
                Value::UInt(self.core.frame_count()),
            ),
        ])
    }
}

const POLL: Duration = Duration::from_secs(1);

/// Data writer wrapper.
///
/// Variables: `dataFile` (RW path), `open` (RW enum False/True, driving the
/// core on state edges), `bufferSize`/`maxSize` (RW, captured at open time),
/// polled `fileSize`/`frameCount`, and `autoName` (command stamping a fresh
/// timestamped name into `dataFile`).
pub fn data_writer(name: &str, core: Arc<dyn WriterCore>) -> TreeResult<Device> {
    let state = Arc::new(Mutex::new(WriterState {
        data_file: String::new(),
        open: false,
        buffer_size: 0,
        max_size: 0,
    }));

    let device = Device::new(name).with_transport(Arc::new(StatusBatch { core: core.clone() }));

    let data_file = device.add_variable(
        Variable::new("dataFile", ValueKind::Str, Mode::ReadWrite).with_source(Arc::new(
            DataFileSource {
                state: state.clone(),
            },
        )),
    )?;
    device.add_variable(
        Variable::new("open", ValueKind::UInt, Mode::ReadWrite)
            .with_enum(EnumSpec::new([(0u64, "False"), (1, "True")])?)
            .with_source(Arc::new(OpenSource {
                core: core.clone(),
                state: state.clone(),
            })),
    )?;
    device.add_variable(
        Variable::new("bufferSize", ValueKind::UInt, Mode::ReadWrite)
            .with_units("bytes")
            .with_source(Arc::new(BufferSizeSource {
                state: state.clone(),
            })),
    )?;
    device.add_variable(
        Variable::new("maxSize", ValueKind::UInt, Mode::ReadWrite)
            .with_units("bytes")
            .with_source(Arc::new(MaxSizeSource { state })),
    )?;
    device.add_variable(
        Variable::new("fileSize", ValueKind::UInt, Mode::ReadOnly)
            .with_units("bytes")
            .with_poll_interval(POLL)
            .with_source(Arc::new(StatusSource {
                core: core.clone(),
                status: Status::FileSize,
            })),
    )?;
    device.add_variable(
        Variable::new("frameCount", ValueKind::UInt, Mode::ReadOnly)
            .with_poll_interval(POLL)
            .with_source(Arc::new(StatusSource {
                core,
                status: Status::FrameCount,
            })),
    )?;
    device.add_variable(
        Variable::new("autoName", ValueKind::Bool, Mode::Command)
            .with_source(Arc::new(AutoNameAction { data_file })),
    )?;

    Ok(device)
}

fn expect_uint(value: &Value) -> TreeResult<u64> {
    value.as_u64().ok_or(TreeError::TypeMismatch {
        expected: ValueKind::UInt,
        found: value.kind(),
    })
}

fn expect_str(value: &Value) -> TreeResult<&str> {
    value.as_str().ok_or(TreeError::TypeMismatch {
        expected: ValueKind::Str,
        found: value.kind(),
    })
}

/// In-memory stand-in for the file backend, for the demo CLI and tests.
///
/// Counts written frames and bytes while "open"; refuses to open without a
/// file name.
#[derive(Default)]
pub struct SimWriterCore {
    open: AtomicBool,
    file_size: AtomicU64,
    frame_count: AtomicU64,
}

impl SimWriterCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a file is currently open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Record one written frame of `bytes`; dropped while closed.
    pub fn write_frame(&self, bytes: u64) {
        if self.is_open() {
            self.frame_count.fetch_add(1, Ordering::SeqCst);
            self.file_size.fetch_add(bytes, Ordering::SeqCst);
        }
    }
}

impl WriterCore for SimWriterCore {
    fn open(&self, path: &str, _buffer_size: u64, _max_size: u64) -> TreeResult<()> {
        if path.is_empty() {
            return Err(TreeError::Transport {
                what: "no data file set".to_string(),
            });
        }
        self.file_size.store(0, Ordering::SeqCst);
        self.frame_count.store(0, Ordering::SeqCst);
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> TreeResult<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn file_size(&self) -> u64 {
        self.file_size.load(Ordering::SeqCst)
    }

    fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::SeqCst)
    }
}
