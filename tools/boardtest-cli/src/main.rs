//! Board conformance test runner.
//!
//! Runs one probe or live session per invocation and exits with its result
//! code, so a test script can branch on `$?`.

mod keypress;
mod output;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use boardtest::config::{ProbeDefaults, ProbeTiming};
use boardtest::error::ErrorCode;
use boardtest::linux::LinuxPlatform;
use boardtest::live::{self, AnalogSession, DisplayMode, GpiSession, GpoSession, LiveSession};
use boardtest::params::ParamError;
use boardtest::probe::{
    self, BlockProbe, GpioProbe, I2cReadProbe, PldProbe, Probe, ProbeReport, PwmProbe, Rs485Probe,
    RtcProbe, SerialProbe,
};
use output::OutputConfig;

/// Hardware conformance probes for embedded boards
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write and read back a file on removable media mounted at MOUNT
    #[command(alias = "block_device_test")]
    Block { mount: PathBuf },

    /// Loop a message between two cross-wired ports, or through one port
    /// with a loopback plug
    #[command(alias = "serial_test")]
    Serial {
        port_a: PathBuf,
        port_b: Option<PathBuf>,
    },

    /// Write a pulse width to a PWM channel
    #[command(alias = "pwm_test")]
    Pwm { device: Option<PathBuf> },

    /// Check that the PLD has been programmed
    #[command(alias = "pld_test")]
    Pld { dir: Option<PathBuf> },

    /// Compare a GPIO port against the fixture's jumper pattern
    #[command(alias = "gpio_test")]
    Gpio {
        device: Option<PathBuf>,
        pattern: Option<String>,
    },

    /// Set and read back the real-time clock; restores the time afterwards
    #[command(alias = "rtc_test")]
    Rtc { device: Option<PathBuf> },

    /// Enable RS-485 direction control and transmit a burst
    #[command(alias = "rs485_test")]
    Rs485 { device: Option<PathBuf> },

    /// Read an I2C register and compare it (all values hexadecimal)
    #[command(name = "i2c-read", alias = "i2c_read_test")]
    I2cRead {
        bus: PathBuf,
        addr: String,
        reg: String,
        /// Two digits for a byte register, four for a word register
        expected: String,
    },

    /// Show the on-chip A/D channels until a key is pressed
    #[command(name = "analog-gpio", alias = "gpio_analog_test")]
    AnalogGpio {
        device: Option<PathBuf>,
        channels: Option<String>,
        /// `console` or `gauge` (also `0`/`1`)
        mode: Option<DisplayMode>,
    },

    /// Show the MCP3208 channels until a key is pressed
    #[command(name = "analog-mcp3208", alias = "mcp3208_analog_test")]
    AnalogMcp3208 {
        device: Option<PathBuf>,
        channels: Option<String>,
        /// `console` or `gauge` (also `0`/`1`)
        mode: Option<DisplayMode>,
    },

    /// Walk a single set bit across a BITS-wide output port
    #[command(alias = "gpo_test")]
    Gpo { device: PathBuf, bits: String },

    /// Show an input port until a key is pressed
    #[command(alias = "gpi_test")]
    Gpi {
        device: PathBuf,
        mode: Option<DisplayMode>,
    },
}

impl Command {
    /// Probe name used in reports, matching `Probe::name`.
    fn name(&self) -> &'static str {
        match self {
            Command::Block { .. } => "block",
            Command::Serial { .. } => "serial",
            Command::Pwm { .. } => "pwm",
            Command::Pld { .. } => "pld",
            Command::Gpio { .. } => "gpio",
            Command::Rtc { .. } => "rtc",
            Command::Rs485 { .. } => "rs485",
            Command::I2cRead { .. } => "i2c-read",
            Command::AnalogGpio { .. } => "analog-gpio",
            Command::AnalogMcp3208 { .. } => "analog-mcp3208",
            Command::Gpo { .. } => "gpo",
            Command::Gpi { .. } => "gpi",
        }
    }
}

enum Job {
    Probe(Box<dyn Probe>),
    Live(Box<dyn LiveSession>, DisplayMode),
}

fn one_shot<P: Probe + 'static>(built: Result<P, ParamError>) -> Result<Job, ParamError> {
    built.map(|p| Job::Probe(Box::new(p)))
}

fn live_session<S: LiveSession + 'static>(
    built: Result<S, ParamError>,
    mode: Option<DisplayMode>,
) -> Result<Job, ParamError> {
    built.map(|s| Job::Live(Box::new(s), mode.unwrap_or_default()))
}

/// Resolve the command's arguments into a runnable job.
fn plan(
    command: &Command,
    defaults: &ProbeDefaults,
    timing: &ProbeTiming,
) -> Result<Job, ParamError> {
    match command {
        Command::Block { mount } => one_shot(Ok(BlockProbe::new(mount, defaults, *timing))),
        Command::Serial { port_a, port_b } => {
            one_shot(Ok(SerialProbe::new(port_a, port_b.clone(), *timing)))
        }
        Command::Pwm { device } => one_shot(Ok(PwmProbe::new(device.clone(), defaults))),
        Command::Pld { dir } => one_shot(Ok(PldProbe::new(dir.clone(), defaults))),
        Command::Gpio { device, pattern } => one_shot(GpioProbe::new(
            device.clone(),
            pattern.as_deref(),
            defaults,
        )),
        Command::Rtc { device } => one_shot(Ok(RtcProbe::new(device.clone(), defaults, timing))),
        Command::Rs485 { device } => one_shot(Ok(Rs485Probe::new(device.clone(), defaults))),
        Command::I2cRead {
            bus,
            addr,
            reg,
            expected,
        } => one_shot(I2cReadProbe::new(bus, addr, reg, expected)),
        Command::AnalogGpio {
            device,
            channels,
            mode,
        } => live_session(
            AnalogSession::indexed_atod(device.clone(), channels.as_deref(), defaults, timing),
            *mode,
        ),
        Command::AnalogMcp3208 {
            device,
            channels,
            mode,
        } => live_session(
            AnalogSession::mcp3208(device.clone(), channels.as_deref(), defaults, timing),
            *mode,
        ),
        Command::Gpo { device, bits } => {
            live_session(GpoSession::new(device, bits, timing), None)
        }
        Command::Gpi { device, mode } => {
            live_session(Ok(GpiSession::new(device, timing)), *mode)
        }
    }
}

/// Exit status for a command line that clap did not run. Help and version
/// requests succeed; anything else is a malformed invocation and must not
/// read as a device failure.
fn usage_status(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => output::exit_status(ErrorCode::InvalidArg.as_u16()),
    }
}

async fn run_live(
    session: &dyn LiveSession,
    platform: &LinuxPlatform,
    mode: DisplayMode,
    display: &mut (dyn Write + Send),
) -> Result<ProbeReport> {
    let stop = CancellationToken::new();
    let _terminal = keypress::stop_on_keypress(stop.clone())
        .context("Failed to put the terminal in single-key mode")?;

    let on_interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted");
            on_interrupt.cancel();
        }
    });

    let report = live::execute(session, platform, mode, stop.clone(), display).await;
    stop.cancel();
    Ok(report)
}

async fn run(command: &Command, config: &OutputConfig) -> Result<ProbeReport> {
    let defaults = ProbeDefaults::from_env();
    let timing = ProbeTiming::default();
    let platform = LinuxPlatform::new();

    let job = match plan(command, &defaults, &timing) {
        Ok(job) => job,
        Err(e) => return Ok(ProbeReport::rejected(command.name(), e)),
    };

    match job {
        Job::Probe(p) => Ok(probe::execute(p.as_ref(), &platform).await),
        Job::Live(s, mode) => {
            // Keep stdout for the report when it is machine-read.
            if config.json {
                run_live(s.as_ref(), &platform, mode, &mut std::io::stderr()).await
            } else {
                run_live(s.as_ref(), &platform, mode, &mut std::io::stdout()).await
            }
        }
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(usage_status(e.kind()));
        }
    };

    let config = OutputConfig {
        use_color: !args.no_color && atty::is(atty::Stream::Stdout),
        json: args.json,
    };
    boardtest::tracing::init_journald_or_stderr(!args.no_color && atty::is(atty::Stream::Stderr));

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")
        .and_then(|runtime| runtime.block_on(run(&args.command, &config)))
        .and_then(|report| {
            output::print_report(&report, &config)?;
            Ok(report)
        });

    match result {
        Ok(report) => ExitCode::from(output::exit_status(report.code.as_u16())),
        Err(e) => {
            eprintln!("boardtest: {e:#}");
            ExitCode::from(u8::MAX)
        }
    }
}
