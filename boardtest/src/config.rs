//! Probe defaults and timing.
//!
//! Every device path and scalar a probe falls back to when the caller omits
//! it lives in [`ProbeDefaults`]. The board image can move devices around
//! without a rebuild by setting the environment variables listed on
//! [`ProbeDefaults::from_env`].

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Defaults applied to omitted probe parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeDefaults {
    /// PWM channel device.
    pub pwm_device: PathBuf,

    /// Pulse width written by the PWM probe, in microseconds.
    pub pwm_width_us: u32,

    /// Directory that exists once the PLD has been programmed.
    pub pld_dir: PathBuf,

    /// GPIO port read by the GPIO probe.
    pub gpio_device: PathBuf,

    /// Value the GPIO probe expects on the port (loopback jumpers).
    pub gpio_pattern: u32,

    pub rtc_device: PathBuf,

    pub rs485_device: PathBuf,

    /// How the UART transceiver is switched into automatic RS-485 direction
    /// control.
    pub rs485_control: Rs485Control,

    /// Put the control register back after the RS-485 probe.
    ///
    /// Off by default: boards are expected to stay in RS-485 mode once the
    /// probe has switched them.
    pub rs485_restore_direction: bool,

    /// Indexed-GPIO A/D device and its channel count.
    pub atod_device: PathBuf,
    pub atod_channels: u8,

    /// MCP3208 SPI device and its channel count.
    pub mcp3208_device: PathBuf,
    pub mcp3208_channels: u8,

    /// Path on the root filesystem that the block probe compares a mount
    /// point against.
    pub root_reference: PathBuf,
}

impl Default for ProbeDefaults {
    fn default() -> Self {
        Self {
            pwm_device: PathBuf::from("/dev/pwm"),
            pwm_width_us: 5000,
            pld_dir: PathBuf::from("/sys/class/gpio/porta"),
            gpio_device: PathBuf::from("/dev/porta"),
            gpio_pattern: 0xAA,
            rtc_device: PathBuf::from("/dev/rtc0"),
            rs485_device: PathBuf::from("/dev/ttyS1"),
            rs485_control: Rs485Control::port(),
            rs485_restore_direction: false,
            atod_device: PathBuf::from("/dev/indexed_atod"),
            atod_channels: 3,
            mcp3208_device: PathBuf::from("/dev/mcp3208"),
            mcp3208_channels: 8,
            root_reference: PathBuf::from("/etc"),
        }
    }
}

/// Where the RS-485 auto-direction switch lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rs485Control {
    /// GPIO data-register write on a port device.
    Port { device: PathBuf, value: u32 },
    /// Text write to a sysfs attribute, for kernels that expose the switch
    /// through the GPIO class instead of a device node.
    Attribute { path: PathBuf, value: u32 },
}

impl Rs485Control {
    /// `/dev/rtsctl`, written with 0x1.
    pub fn port() -> Self {
        Rs485Control::Port {
            device: PathBuf::from("/dev/rtsctl"),
            value: 0x1,
        }
    }

    /// `/sys/class/gpio/rtsctl/data`, written with `0x2`.
    pub fn attribute() -> Self {
        Rs485Control::Attribute {
            path: PathBuf::from("/sys/class/gpio/rtsctl/data"),
            value: 0x2,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Rs485Control::Port { device, .. } => device,
            Rs485Control::Attribute { path, .. } => path,
        }
    }

    fn path_mut(&mut self) -> &mut PathBuf {
        match self {
            Rs485Control::Port { device, .. } => device,
            Rs485Control::Attribute { path, .. } => path,
        }
    }
}

fn path_var(name: &str, target: &mut PathBuf) {
    if let Some(value) = env::var_os(name).filter(|v| !v.is_empty()) {
        *target = PathBuf::from(value);
    }
}

impl ProbeDefaults {
    /// Built-in defaults with environment overrides applied.
    ///
    /// # Environment Variables
    ///
    /// - `BOARDTEST_PWM_DEVICE`
    /// - `BOARDTEST_PLD_DIR`
    /// - `BOARDTEST_GPIO_DEVICE`
    /// - `BOARDTEST_RTC_DEVICE`
    /// - `BOARDTEST_RS485_DEVICE`
    /// - `BOARDTEST_RS485_CONTROL_MODE`: `port` (default) or `sysfs`
    /// - `BOARDTEST_RS485_CONTROL`: control device or attribute path
    /// - `BOARDTEST_RS485_RESTORE`: `1`/`true` restores the control register
    /// - `BOARDTEST_ATOD_DEVICE`
    /// - `BOARDTEST_MCP3208_DEVICE`
    /// - `BOARDTEST_ROOT_REFERENCE`
    ///
    /// Empty values and unrecognised control modes are ignored.
    pub fn from_env() -> Self {
        let mut defaults = Self::default();

        path_var("BOARDTEST_PWM_DEVICE", &mut defaults.pwm_device);
        path_var("BOARDTEST_PLD_DIR", &mut defaults.pld_dir);
        path_var("BOARDTEST_GPIO_DEVICE", &mut defaults.gpio_device);
        path_var("BOARDTEST_RTC_DEVICE", &mut defaults.rtc_device);
        path_var("BOARDTEST_RS485_DEVICE", &mut defaults.rs485_device);
        match env::var("BOARDTEST_RS485_CONTROL_MODE").as_deref() {
            Ok("sysfs") | Ok("attribute") => defaults.rs485_control = Rs485Control::attribute(),
            Ok("port") | Ok("ioctl") => defaults.rs485_control = Rs485Control::port(),
            _ => {}
        }
        path_var(
            "BOARDTEST_RS485_CONTROL",
            defaults.rs485_control.path_mut(),
        );
        path_var("BOARDTEST_ATOD_DEVICE", &mut defaults.atod_device);
        path_var("BOARDTEST_MCP3208_DEVICE", &mut defaults.mcp3208_device);
        path_var("BOARDTEST_ROOT_REFERENCE", &mut defaults.root_reference);

        if let Ok(value) = env::var("BOARDTEST_RS485_RESTORE") {
            defaults.rs485_restore_direction =
                matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        defaults
    }
}

/// Delays, ceilings and retry counts used by the probes and live sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTiming {
    /// How long the serial probe waits for the first byte.
    pub serial_ready_ceiling: Duration,

    /// Pause after data shows up, so the rest of the payload can arrive.
    pub serial_settle: Duration,

    /// Upper bound on reading the full payload once data is ready.
    pub serial_read_timeout: Duration,

    /// Wait between block probe attempts.
    pub block_settle: Duration,

    /// Total block probe attempts before giving up.
    pub block_attempts: u32,

    /// Largest accepted difference between the time written to the RTC and
    /// the time read back.
    pub rtc_tolerance: Duration,

    pub analog_interval: Duration,
    pub gpi_interval: Duration,
    pub gpo_interval: Duration,
}

impl Default for ProbeTiming {
    fn default() -> Self {
        Self {
            serial_ready_ceiling: Duration::from_millis(1000),
            serial_settle: Duration::from_millis(50),
            serial_read_timeout: Duration::from_millis(1000),
            block_settle: Duration::from_secs(1),
            block_attempts: 2,
            rtc_tolerance: Duration::from_secs(2),
            analog_interval: Duration::from_millis(50),
            gpi_interval: Duration::from_millis(50),
            gpo_interval: Duration::from_millis(200),
        }
    }
}
