//! Times the program on the device by waiting for its completion byte.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::error::{MonitorError, MonitorResult};

/// A side channel carrying bytes from the device under test.
#[async_trait]
pub trait CompletionChannel: Send {
    /// The next available byte, or `None` if nothing has arrived yet.
    /// Must not wait for data.
    async fn sample(&mut self) -> io::Result<Option<u8>>;
}

/// Monitor settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Byte the program emits when it finishes.
    #[serde(default = "default_sentinel")]
    pub sentinel: u8,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_poll_ms")]
    pub poll_interval_ms: u64,
}

impl MonitorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sentinel: default_sentinel(),
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_ms(),
        }
    }
}

fn default_sentinel() -> u8 {
    b'D'
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_poll_ms() -> u64 {
    10
}

// ── Monitor ─────────────────────────────────────────────────────────

/// Polls a channel until the sentinel arrives or time runs out.
#[derive(Clone, Debug)]
pub struct CompletionMonitor {
    poll_interval: Duration,
}

impl CompletionMonitor {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Elapsed time from the call until `sentinel` is observed.
    ///
    /// Never reports a timeout before `timeout` has passed.
    pub async fn wait_for_completion(
        &self,
        channel: &mut dyn CompletionChannel,
        sentinel: u8,
        timeout: Duration,
    ) -> MonitorResult<Duration> {
        let started = Instant::now();
        debug!(sentinel, ?timeout, "Waiting for completion signal");

        loop {
            // Drain everything already buffered before sleeping again.
            while let Some(byte) = channel.sample().await? {
                if byte == sentinel {
                    let elapsed = started.elapsed();
                    info!(elapsed_ms = elapsed.as_millis() as u64, "Completion signal received");
                    return Ok(elapsed);
                }
                trace!(byte, "Ignoring non-sentinel byte");
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                warn!(?timeout, "Completion signal not received");
                return Err(MonitorError::CompletionTimeout { timeout, elapsed });
            }
            tokio::time::sleep(self.poll_interval.min(timeout - elapsed)).await;
        }
    }
}

impl Default for CompletionMonitor {
    fn default() -> Self {
        Self::new(Duration::from_millis(default_poll_ms()))
    }
}

// ── Channels ────────────────────────────────────────────────────────

/// Emits one byte a fixed delay after creation, or never.
///
/// Stands in for the device when running against a mock toolchain.
#[derive(Debug)]
pub struct ScriptedChannel {
    ready_at: Option<Instant>,
    byte: u8,
    delivered: bool,
}

impl ScriptedChannel {
    pub fn after(delay: Duration, byte: u8) -> Self {
        Self {
            ready_at: Some(Instant::now() + delay),
            byte,
            delivered: false,
        }
    }

    pub fn silent() -> Self {
        Self {
            ready_at: None,
            byte: 0,
            delivered: false,
        }
    }
}

#[async_trait]
impl CompletionChannel for ScriptedChannel {
    async fn sample(&mut self) -> io::Result<Option<u8>> {
        match self.ready_at {
            Some(at) if !self.delivered && Instant::now() >= at => {
                self.delivered = true;
                Ok(Some(self.byte))
            }
            _ => Ok(None),
        }
    }
}

/// Serial line settings for a completion device.
///
/// The port is always opened raw, 8 data bits, no parity, one stop bit and
/// no flow control.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// How long one blocking read may wait before the reader checks whether
    /// anyone is still listening.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_read_timeout_ms() -> u64 {
    50
}

/// Where device bytes are read from.
enum DeviceSource {
    Serial(Box<dyn serialport::SerialPort>),
    Stream(std::fs::File),
}

impl DeviceSource {
    fn open(path: &Path, serial: bool, settings: &SerialConfig) -> io::Result<Self> {
        if !serial {
            return Ok(Self::Stream(std::fs::File::open(path)?));
        }
        let port = serialport::new(path.to_string_lossy(), settings.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(settings.read_timeout())
            .open()?;
        Ok(Self::Serial(port))
    }
}

impl Read for DeviceSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Serial(port) => port.read(buf),
            Self::Stream(file) => file.read(buf),
        }
    }
}

#[cfg(unix)]
fn is_serial_device(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;
    meta.file_type().is_char_device()
}

#[cfg(not(unix))]
fn is_serial_device(meta: &std::fs::Metadata) -> bool {
    !meta.is_file()
}

/// Forward bytes until the receiver goes away or the source fails.
fn pump(
    mut source: DeviceSource,
    tx: mpsc::UnboundedSender<io::Result<u8>>,
    idle: Duration,
) {
    let mut buf = [0u8; 64];
    while !tx.is_closed() {
        match source.read(&mut buf) {
            Ok(0) => std::thread::sleep(idle),
            Ok(n) => {
                for &b in &buf[..n] {
                    if tx.send(Ok(b)).is_err() {
                        return;
                    }
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        }
    }
}

/// Reads bytes from a UART such as `/dev/ttyUSB0`, or from a FIFO or file.
///
/// Character devices are opened as raw serial ports. A detached reader
/// thread forwards bytes over a channel so sampling never waits on the
/// device, and the async runtime never waits on the reader at shutdown.
pub struct DeviceChannel {
    path: PathBuf,
    rx: mpsc::UnboundedReceiver<io::Result<u8>>,
}

impl DeviceChannel {
    /// Start reading `path`. Only the existence check happens on the
    /// calling thread; opening the port happens on the reader.
    pub fn open(path: impl AsRef<Path>, settings: &SerialConfig) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let serial = is_serial_device(&std::fs::metadata(&path)?);
        let (tx, rx) = mpsc::unbounded_channel();

        let device = path.clone();
        let settings = settings.clone();
        std::thread::Builder::new()
            .name("benchloop-device".into())
            .spawn(move || match DeviceSource::open(&device, serial, &settings) {
                Ok(source) => pump(source, tx, settings.read_timeout()),
                Err(e) => {
                    warn!(path = %device.display(), error = %e, "Failed to open completion device");
                    let _ = tx.send(Err(e));
                }
            })?;

        info!(path = %path.display(), serial, "Reading completion device");
        Ok(Self { path, rx })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CompletionChannel for DeviceChannel {
    async fn sample(&mut self) -> io::Result<Option<u8>> {
        match self.rx.try_recv() {
            Ok(result) => result.map(Some),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("reader for {} stopped", self.path.display()),
            )),
        }
    }
}
