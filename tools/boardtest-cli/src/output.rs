//! Report formatting.

use std::io::{self, Write};

use anyhow::Result;
use boardtest::probe::ProbeReport;
use colored::Colorize;

/// Output formatter configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
    pub json: bool,
}

/// Human-readable outcome line, e.g. `rtc: FAIL RtcNoSet: setting /dev/rtc0: ...`.
pub fn format_report(report: &ProbeReport, config: &OutputConfig) -> String {
    let verdict = if report.passed() { "PASS" } else { "FAIL" };
    let verdict = match (config.use_color, report.passed()) {
        (false, _) => verdict.to_string(),
        (true, true) => verdict.green().bold().to_string(),
        (true, false) => verdict.red().bold().to_string(),
    };

    let mut line = format!("{}: {}", report.probe, verdict);
    if !report.passed() {
        line.push_str(&format!(" {}", report.name));
        if let Some(detail) = &report.detail {
            line.push_str(&format!(": {detail}"));
        }
    }
    line
}

/// Print `report` to stdout: a verdict line and a `code=<n>` line, or a
/// single JSON object.
pub fn print_report(report: &ProbeReport, config: &OutputConfig) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if config.json {
        serde_json::to_writer(&mut out, report)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{}", format_report(report, config))?;
        writeln!(out, "code={}", report.code.as_u16())?;
    }
    out.flush()?;
    Ok(())
}

/// Process exit status for a result code. Exit statuses are 8 bits, so
/// larger codes saturate at 255; the exact code is always printed.
pub fn exit_status(code: u16) -> u8 {
    u8::try_from(code).unwrap_or(u8::MAX)
}
