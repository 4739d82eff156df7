//! Fake devices for unit tests.
//!
//! [`FakePlatform`] hands out in-memory devices whose state lives behind
//! `Arc<Mutex<_>>`, so a test can script faults before a probe runs and
//! inspect what the probe did afterwards. Every handle carries a
//! [`HandleToken`]; [`Handles::balanced`] proves each opened handle was
//! dropped exactly once.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use time::macros::datetime;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::{Band, ErrorCode};
use crate::hw_trait::{
    Filesystem, FsStats, GpioPort, HwError, I2cBus, I2cError, PathKind, Pwm, Readiness, Result,
    Rtc, ScratchFile, SerialConfig, SerialLine, SpiControl, SpiDevice, SystemClock,
};
use crate::platform::Platform;
use crate::probe::{Probe, ProbeFailure};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap()
}

fn injected(what: &str) -> HwError {
    HwError::Io(io::Error::new(io::ErrorKind::Other, format!("injected {what} fault")))
}

/// Open/close bookkeeping shared by every fake handle.
#[derive(Debug, Default)]
pub struct Handles {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl Handles {
    fn token(self: &Arc<Self>) -> HandleToken {
        self.opened.fetch_add(1, Ordering::SeqCst);
        HandleToken(self.clone())
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Every handle opened so far has been closed exactly once.
    pub fn balanced(&self) -> bool {
        self.opened() == self.closed()
    }
}

/// Counts a close when dropped.
#[derive(Debug)]
pub struct HandleToken(Arc<Handles>);

impl Drop for HandleToken {
    fn drop(&mut self) {
        self.0.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Panics unless a family `band` probe is allowed to return `code`.
pub fn assert_in_band(band: Band, code: ErrorCode) {
    assert!(code.belongs_to(band), "{code} is outside the {band:?} band");
}

/// Run a probe that is expected to fail and check its code's band.
#[async_trait]
pub trait RunToFailure {
    async fn run_to_failure(&self, platform: &FakePlatform) -> ProbeFailure;
}

#[async_trait]
impl<P: Probe + ?Sized> RunToFailure for P {
    async fn run_to_failure(&self, platform: &FakePlatform) -> ProbeFailure {
        match self.run(platform).await {
            Ok(()) => panic!("{} passed", self.name()),
            Err(failure) => {
                assert_in_band(self.band(), failure.code);
                failure
            }
        }
    }
}

// GPIO

#[derive(Debug, Default)]
pub struct GpioState {
    /// Data register
    pub value: u32,
    /// Per-index values returned by indexed reads
    pub indexed: HashMap<u32, u32>,
    pub selected: Option<u32>,
    pub writes: Vec<u32>,
    pub fail_read: bool,
    /// Fail reads after this many successful ones
    pub fail_read_after: Option<usize>,
    pub fail_write: bool,
    /// Fail writes after this many successful ones
    pub fail_write_after: Option<usize>,
    pub reads: usize,
}

struct FakeGpio {
    state: Arc<Mutex<GpioState>>,
    _token: HandleToken,
}

impl GpioPort for FakeGpio {
    fn read(&mut self) -> Result<u32> {
        let mut s = lock(&self.state);
        let exhausted = s.fail_read_after.is_some_and(|n| s.reads >= n);
        if s.fail_read || exhausted {
            return Err(injected("GPIO read"));
        }
        s.reads += 1;
        Ok(match s.selected {
            Some(index) => s.indexed.get(&index).copied().unwrap_or(0),
            None => s.value,
        })
    }

    fn write(&mut self, value: u32) -> Result<()> {
        let mut s = lock(&self.state);
        let exhausted = s.fail_write_after.is_some_and(|n| s.writes.len() >= n);
        if s.fail_write || exhausted {
            return Err(injected("GPIO write"));
        }
        s.value = value;
        s.writes.push(value);
        Ok(())
    }

    fn select_index(&mut self, index: u32) -> Result<()> {
        lock(&self.state).selected = Some(index);
        Ok(())
    }

    fn lock(&mut self) -> Result<()> {
        Ok(())
    }

    fn unlock(&mut self) -> Result<()> {
        Ok(())
    }
}

// I2C

#[derive(Debug, Default)]
pub struct I2cState {
    /// Address that acknowledges
    pub present: Option<u8>,
    /// Register contents of the present device
    pub registers: HashMap<u8, Vec<u8>>,
    pub pointer: Option<u8>,
    read_offset: usize,
    pub fail_pointer_write: bool,
    pub fail_read: bool,
}

struct FakeI2c {
    state: Arc<Mutex<I2cState>>,
    addr: Option<u8>,
    _token: HandleToken,
}

impl I2cBus for FakeI2c {
    fn set_slave(&mut self, addr: u8) -> Result<()> {
        if lock(&self.state).present != Some(addr) {
            return Err(I2cError::from_os(addr, io::Error::from_raw_os_error(libc::ENXIO)).into());
        }
        self.addr = Some(addr);
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        let addr = self.addr.ok_or(I2cError::NoAddress)?;
        let mut s = lock(&self.state);
        if s.fail_pointer_write {
            return Err(I2cError::NoAck(addr).into());
        }
        s.pointer = Some(byte);
        s.read_offset = 0;
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8> {
        let addr = self.addr.ok_or(I2cError::NoAddress)?;
        let mut s = lock(&self.state);
        if s.fail_read {
            return Err(I2cError::NoAck(addr).into());
        }
        let pointer = s.pointer.unwrap_or(0);
        let offset = s.read_offset;
        s.read_offset += 1;
        Ok(s.registers
            .get(&pointer)
            .and_then(|bytes| bytes.get(offset))
            .copied()
            .unwrap_or(0xFF))
    }
}

// SPI

#[derive(Debug, Default)]
pub struct SpiState {
    pub control: Option<SpiControl>,
    pub frames: Vec<Vec<u8>>,
    /// 12-bit reading returned for each channel
    pub readings: HashMap<u8, u16>,
    pub fail_configure: bool,
    pub fail_transfer: bool,
}

struct FakeSpi {
    state: Arc<Mutex<SpiState>>,
    _token: HandleToken,
}

impl SpiDevice for FakeSpi {
    fn configure(&mut self, control: SpiControl) -> Result<()> {
        let mut s = lock(&self.state);
        if s.fail_configure {
            return Err(injected("SPI configure"));
        }
        s.control = Some(control);
        Ok(())
    }

    fn transfer(&mut self, mosi: &[u8], miso: &mut [u8]) -> Result<()> {
        let mut s = lock(&self.state);
        if s.fail_transfer {
            return Err(injected("SPI transfer"));
        }
        s.frames.push(mosi.to_vec());
        // Behave like an MCP3208 on a 3-byte frame.
        let channel = ((mosi[0] & 1) << 2) | (mosi[1] >> 6);
        let value = s.readings.get(&channel).copied().unwrap_or(0);
        miso.fill(0);
        miso[1] = (value >> 8) as u8 & 0x0F;
        miso[2] = value as u8;
        Ok(())
    }
}

// Serial

#[derive(Debug, Default)]
pub struct SerialPortState {
    /// Where bytes written on this port arrive
    pub peer: Option<PathBuf>,
    pub rx: VecDeque<u8>,
    pub written: Vec<u8>,
    pub fail_write: bool,
    /// Accept fewer bytes than asked and report it as a write error
    pub short_write: bool,
    pub fail_poll: bool,
    pub fail_clear: bool,
    /// Times the port's buffers were discarded
    pub clears: usize,
    /// Flip a bit in the first byte delivered to the peer
    pub corrupt: bool,
    /// Deliver only this many bytes to the peer
    pub truncate_to: Option<usize>,
}

#[derive(Debug, Default)]
pub struct SerialNet {
    pub ports: HashMap<PathBuf, SerialPortState>,
    pub opened: Vec<(PathBuf, SerialConfig)>,
}

struct FakeSerial {
    net: Arc<Mutex<SerialNet>>,
    path: PathBuf,
    _token: HandleToken,
}

#[async_trait]
impl SerialLine for FakeSerial {
    fn clear(&mut self) -> Result<()> {
        let mut net = lock(&self.net);
        let port = net.ports.entry(self.path.clone()).or_default();
        if port.fail_clear {
            return Err(injected("serial flush"));
        }
        port.rx.clear();
        port.clears += 1;
        Ok(())
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut net = lock(&self.net);
        let port = net.ports.entry(self.path.clone()).or_default();
        if port.fail_write {
            return Err(injected("serial write"));
        }
        if port.short_write {
            port.written.extend_from_slice(&data[..data.len() / 2]);
            return Err(io::Error::from(io::ErrorKind::WriteZero).into());
        }
        port.written.extend_from_slice(data);

        let mut delivered = data.to_vec();
        if let Some(n) = port.truncate_to {
            delivered.truncate(n);
        }
        if port.corrupt {
            if let Some(b) = delivered.first_mut() {
                *b ^= 0x01;
            }
        }
        if let Some(peer) = port.peer.clone() {
            net.ports.entry(peer).or_default().rx.extend(delivered);
        }
        Ok(())
    }

    async fn wait_readable(&mut self, ceiling: Duration) -> Result<Readiness> {
        {
            let net = lock(&self.net);
            let port = net.ports.get(&self.path);
            if port.is_some_and(|p| p.fail_poll) {
                return Err(injected("serial poll"));
            }
            if port.is_some_and(|p| !p.rx.is_empty()) {
                return Ok(Readiness::Ready);
            }
        }
        tokio::time::sleep(ceiling).await;
        Ok(Readiness::Idle)
    }

    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        {
            let mut net = lock(&self.net);
            let port = net.ports.entry(self.path.clone()).or_default();
            if port.rx.len() >= buf.len() {
                for b in buf.iter_mut() {
                    *b = port.rx.pop_front().unwrap_or_default();
                }
                return Ok(());
            }
        }
        // Not enough data ever arrives; the caller's timeout decides.
        std::future::pending::<()>().await;
        Ok(())
    }
}

// RTC and clock

#[derive(Debug)]
pub struct RtcState {
    pub time: PrimitiveDateTime,
    pub sets: Vec<PrimitiveDateTime>,
    pub fail_read: bool,
    /// Fail reads after this many successful ones
    pub fail_read_after: Option<usize>,
    pub reads: usize,
    pub fail_set: bool,
    /// Fail sets after this many successful ones
    pub fail_set_after: Option<usize>,
    /// Added to every time read back, to fake a drifting or broken RTC
    pub skew: time::Duration,
}

impl Default for RtcState {
    fn default() -> Self {
        Self {
            time: datetime!(2024-03-01 12:00:00),
            sets: Vec::new(),
            fail_read: false,
            fail_read_after: None,
            reads: 0,
            fail_set: false,
            fail_set_after: None,
            skew: time::Duration::ZERO,
        }
    }
}

struct FakeRtc {
    state: Arc<Mutex<RtcState>>,
    _token: HandleToken,
}

impl Rtc for FakeRtc {
    fn read_time(&mut self) -> Result<PrimitiveDateTime> {
        let mut s = lock(&self.state);
        let exhausted = s.fail_read_after.is_some_and(|n| s.reads >= n);
        if s.fail_read || exhausted {
            return Err(injected("RTC read"));
        }
        s.reads += 1;
        Ok(s.time + s.skew)
    }

    fn set_time(&mut self, time: PrimitiveDateTime) -> Result<()> {
        let mut s = lock(&self.state);
        let exhausted = s.fail_set_after.is_some_and(|n| s.sets.len() >= n);
        if s.fail_set || exhausted {
            return Err(injected("RTC set"));
        }
        s.time = time;
        s.sets.push(time);
        Ok(())
    }
}

#[derive(Debug)]
pub struct ClockState {
    pub now: OffsetDateTime,
    pub sets: Vec<OffsetDateTime>,
    pub fail_now: bool,
    pub fail_set: bool,
    /// Fail sets after this many successful ones
    pub fail_set_after: Option<usize>,
}

impl Default for ClockState {
    fn default() -> Self {
        Self {
            now: datetime!(2024-03-01 12:00:00.25 UTC),
            sets: Vec::new(),
            fail_now: false,
            fail_set: false,
            fail_set_after: None,
        }
    }
}

struct FakeClock {
    state: Arc<Mutex<ClockState>>,
}

impl SystemClock for FakeClock {
    fn now(&self) -> Result<OffsetDateTime> {
        let s = lock(&self.state);
        if s.fail_now {
            return Err(injected("gettimeofday"));
        }
        Ok(s.now)
    }

    fn set(&mut self, time: OffsetDateTime) -> Result<()> {
        let mut s = lock(&self.state);
        let exhausted = s.fail_set_after.is_some_and(|n| s.sets.len() >= n);
        if s.fail_set || exhausted {
            return Err(HwError::Io(io::Error::from_raw_os_error(libc::EPERM)));
        }
        s.now = time;
        s.sets.push(time);
        Ok(())
    }
}

// PWM

#[derive(Debug, Default)]
pub struct PwmState {
    pub widths: Vec<u32>,
    pub fail_write: bool,
}

struct FakePwm {
    state: Arc<Mutex<PwmState>>,
    _token: HandleToken,
}

impl Pwm for FakePwm {
    fn write_width_us(&mut self, width_us: u32) -> Result<()> {
        let mut s = lock(&self.state);
        if s.fail_write {
            return Err(injected("PWM write"));
        }
        s.widths.push(width_us);
        Ok(())
    }
}

// Filesystem

#[derive(Debug, Default)]
pub struct FsState {
    /// Stats per path; the front entry is consumed per call while more
    /// than one remains.
    pub stats: HashMap<PathBuf, VecDeque<FsStats>>,
    pub statfs_calls: Vec<PathBuf>,
    pub dirs: HashSet<PathBuf>,
    pub files: HashMap<PathBuf, Vec<u8>>,
    pub created: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub fail_create: bool,
    pub fail_write: bool,
    pub fail_sync: bool,
    /// Lose the last byte on the way to the medium
    pub short_medium: bool,
    /// Flip one byte on the way to the medium
    pub corrupt_medium: bool,
    /// sysfs-style attributes
    pub attrs: HashMap<PathBuf, String>,
    pub attr_writes: Vec<(PathBuf, String)>,
    pub fail_attr_write: bool,
    /// Fail attribute writes after this many successful ones
    pub fail_attr_write_after: Option<usize>,
}

#[derive(Debug, Default)]
pub struct FakeFs {
    pub state: Arc<Mutex<FsState>>,
    pub handles: Arc<Handles>,
}

struct FakeScratch {
    path: PathBuf,
    data: Vec<u8>,
    pos: usize,
    state: Arc<Mutex<FsState>>,
    _token: HandleToken,
}

impl Read for FakeScratch {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.data[self.pos.min(self.data.len())..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for FakeScratch {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if lock(&self.state).fail_write {
            return Err(io::Error::from_raw_os_error(libc::ENOSPC));
        }
        let end = self.pos + buf.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for FakeScratch {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = match pos {
            SeekFrom::Start(n) => n as usize,
            SeekFrom::End(n) => (self.data.len() as i64 + n) as usize,
            SeekFrom::Current(n) => (self.pos as i64 + n) as usize,
        };
        Ok(self.pos as u64)
    }
}

impl ScratchFile for FakeScratch {
    fn sync_barrier(&mut self) -> io::Result<()> {
        let mut s = lock(&self.state);
        if s.fail_sync {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        if s.short_medium {
            self.data.pop();
        }
        if s.corrupt_medium {
            if let Some(b) = self.data.get_mut(100) {
                *b = !*b;
            }
        }
        s.files.insert(self.path.clone(), self.data.clone());
        Ok(())
    }
}

impl Filesystem for FakeFs {
    fn statfs(&self, path: &Path) -> Result<FsStats> {
        let mut s = lock(&self.state);
        s.statfs_calls.push(path.to_path_buf());
        let queue = s
            .stats
            .get_mut(path)
            .ok_or_else(|| HwError::Io(io::Error::from_raw_os_error(libc::ENOENT)))?;
        let stats = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().copied()
        };
        stats.ok_or_else(|| HwError::Io(io::Error::from_raw_os_error(libc::ENOENT)))
    }

    fn create_scratch(&self, path: &Path) -> Result<Box<dyn ScratchFile>> {
        let mut s = lock(&self.state);
        if s.fail_create {
            return Err(HwError::Io(io::Error::from_raw_os_error(libc::EROFS)));
        }
        s.created.push(path.to_path_buf());
        s.files.insert(path.to_path_buf(), Vec::new());
        Ok(Box::new(FakeScratch {
            path: path.to_path_buf(),
            data: Vec::new(),
            pos: 0,
            state: self.state.clone(),
            _token: self.handles.token(),
        }))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let mut s = lock(&self.state);
        s.removed.push(path.to_path_buf());
        s.files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| HwError::Io(io::Error::from_raw_os_error(libc::ENOENT)))
    }

    fn path_kind(&self, path: &Path) -> Result<PathKind> {
        let s = lock(&self.state);
        if s.dirs.contains(path) {
            Ok(PathKind::Directory)
        } else if s.files.contains_key(path) {
            Ok(PathKind::Other)
        } else {
            Err(HwError::Io(io::Error::from_raw_os_error(libc::ENOENT)))
        }
    }

    fn read_attr(&self, path: &Path) -> Result<String> {
        lock(&self.state)
            .attrs
            .get(path)
            .cloned()
            .ok_or_else(|| HwError::Io(io::Error::from_raw_os_error(libc::ENOENT)))
    }

    fn write_attr(&self, path: &Path, value: &str) -> Result<()> {
        let mut s = lock(&self.state);
        let exhausted = s
            .fail_attr_write_after
            .is_some_and(|n| s.attr_writes.len() >= n);
        if s.fail_attr_write || exhausted {
            return Err(HwError::Io(io::Error::from_raw_os_error(libc::EACCES)));
        }
        if !s.attrs.contains_key(path) {
            return Err(HwError::Io(io::Error::from_raw_os_error(libc::ENOENT)));
        }
        s.attrs.insert(path.to_path_buf(), value.to_string());
        s.attr_writes.push((path.to_path_buf(), value.to_string()));
        Ok(())
    }
}

/// In-memory [`Platform`].
///
/// Most device kinds share a single state. GPIO ports and serial ports are
/// kept per path, and [`FakePlatform::missing`] makes a path fail to open.
#[derive(Debug, Default)]
pub struct FakePlatform {
    pub handles: Arc<Handles>,
    /// Paths whose open fails with ENOENT
    pub missing: HashSet<PathBuf>,
    pub gpio: HashMap<PathBuf, Arc<Mutex<GpioState>>>,
    pub i2c: Arc<Mutex<I2cState>>,
    pub spi: Arc<Mutex<SpiState>>,
    pub serial: Arc<Mutex<SerialNet>>,
    pub rtc: Arc<Mutex<RtcState>>,
    pub clock: Arc<Mutex<ClockState>>,
    pub pwm: Arc<Mutex<PwmState>>,
    pub fs: FakeFs,
}

impl FakePlatform {
    pub fn new() -> Self {
        let handles = Arc::new(Handles::default());
        Self {
            fs: FakeFs {
                state: Default::default(),
                handles: handles.clone(),
            },
            handles,
            ..Default::default()
        }
    }

    pub fn missing(mut self, path: impl Into<PathBuf>) -> Self {
        self.missing.insert(path.into());
        self
    }

    /// GPIO port state for `path`, created on first use.
    pub fn gpio_state(&mut self, path: impl Into<PathBuf>) -> Arc<Mutex<GpioState>> {
        self.gpio.entry(path.into()).or_default().clone()
    }

    /// Cross-wire two serial ports. Wiring a port to itself is a loopback
    /// plug.
    pub fn wire(&self, a: impl Into<PathBuf>, b: impl Into<PathBuf>) {
        let (a, b) = (a.into(), b.into());
        let mut net = lock(&self.serial);
        net.ports.entry(a.clone()).or_default().peer = Some(b.clone());
        net.ports.entry(b).or_default().peer = Some(a);
    }

    pub fn serial_port<R>(&self, path: &str, f: impl FnOnce(&mut SerialPortState) -> R) -> R {
        let mut net = lock(&self.serial);
        f(net.ports.entry(PathBuf::from(path)).or_default())
    }

    fn check(&self, path: &Path) -> Result<()> {
        if self.missing.contains(path) {
            Err(HwError::Io(io::Error::from_raw_os_error(libc::ENOENT)))
        } else {
            Ok(())
        }
    }
}

impl Platform for FakePlatform {
    fn open_gpio(&self, path: &Path) -> Result<Box<dyn GpioPort>> {
        self.check(path)?;
        let state = self.gpio.get(path).cloned().unwrap_or_default();
        Ok(Box::new(FakeGpio {
            state,
            _token: self.handles.token(),
        }))
    }

    fn open_i2c(&self, path: &Path) -> Result<Box<dyn I2cBus>> {
        self.check(path)?;
        Ok(Box::new(FakeI2c {
            state: self.i2c.clone(),
            addr: None,
            _token: self.handles.token(),
        }))
    }

    fn open_spi(&self, path: &Path) -> Result<Box<dyn SpiDevice>> {
        self.check(path)?;
        Ok(Box::new(FakeSpi {
            state: self.spi.clone(),
            _token: self.handles.token(),
        }))
    }

    fn open_serial(&self, path: &Path, config: &SerialConfig) -> Result<Box<dyn SerialLine>> {
        self.check(path)?;
        lock(&self.serial)
            .opened
            .push((path.to_path_buf(), *config));
        Ok(Box::new(FakeSerial {
            net: self.serial.clone(),
            path: path.to_path_buf(),
            _token: self.handles.token(),
        }))
    }

    fn open_rtc(&self, path: &Path) -> Result<Box<dyn Rtc>> {
        self.check(path)?;
        Ok(Box::new(FakeRtc {
            state: self.rtc.clone(),
            _token: self.handles.token(),
        }))
    }

    fn open_pwm(&self, path: &Path) -> Result<Box<dyn Pwm>> {
        self.check(path)?;
        Ok(Box::new(FakePwm {
            state: self.pwm.clone(),
            _token: self.handles.token(),
        }))
    }

    fn system_clock(&self) -> Box<dyn SystemClock> {
        Box::new(FakeClock {
            state: self.clock.clone(),
        })
    }

    fn filesystem(&self) -> &dyn Filesystem {
        &self.fs
    }
}
