//! Logging for the probe library and its tools.
//!
//! A binary calls [`init_journald_or_stderr`] once at startup. Library code
//! uses `use crate::tracing::prelude::*` for the `trace!()` .. `error!()`
//! macros.
//!
//! Logs go to stderr so that a tool's own report on stdout stays clean for
//! scripts.

use std::env;
use std::fmt;

use time::OffsetDateTime;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{format::Writer, time::FormatTime},
    prelude::*,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Install the global subscriber.
///
/// Under systemd (`JOURNAL_STREAM` set) events go to journald; otherwise to
/// stderr, with ANSI colours when `color` is true.
pub fn init_journald_or_stderr(color: bool) {
    if env::var("JOURNAL_STREAM").is_ok() {
        if let Ok(layer) = tracing_journald::layer() {
            tracing_subscriber::registry().with(layer).init();
        } else {
            use_stderr(color);
            error!("Failed to initialize journald logging, using stderr.");
        }
    } else {
        use_stderr(color);
    }
}

// Filter with RUST_LOG, defaulting to INFO.
fn use_stderr(color: bool) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(LocalTimer)
                .fmt_fields(tracing_subscriber::fmt::format::DefaultFields::new())
                .event_format(CompactFormatter { color }),
        )
        .init();
}

/// One line per event: time, level, target without the crate prefix, and
/// message. Structured fields follow on a second, indented line.
struct CompactFormatter {
    color: bool,
}

impl CompactFormatter {
    fn paint(&self, w: &mut Writer<'_>, code: &str, text: &str) -> fmt::Result {
        if self.color {
            write!(w, "\x1b[{code}m{text}\x1b[0m")
        } else {
            write!(w, "{text}")
        }
    }
}

#[derive(Default)]
struct FieldCollector {
    fields: Vec<(&'static str, String)>,
    message: Option<String>,
}

impl tracing::field::Visit for FieldCollector {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        let formatted = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(formatted);
        } else {
            // Some("/dev/rtc0") -> "/dev/rtc0"
            let cleaned = formatted
                .strip_prefix("Some(")
                .and_then(|inner| inner.strip_suffix(')'))
                .map(str::to_string)
                .unwrap_or(formatted);
            self.fields.push((field.name(), cleaned));
        }
    }
}

fn short_target(target: &str) -> &str {
    target.strip_prefix("boardtest::").unwrap_or(target)
}

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for CompactFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        let mut visitor = FieldCollector::default();
        event.record(&mut visitor);

        LocalTimer.format_time(&mut writer)?;
        write!(writer, " ")?;

        let (code, text) = match *event.metadata().level() {
            tracing::Level::ERROR => ("31", "ERROR"),
            tracing::Level::WARN => ("33", "WARN "),
            tracing::Level::INFO => ("32", "INFO "),
            tracing::Level::DEBUG => ("34", "DEBUG"),
            tracing::Level::TRACE => ("35", "TRACE"),
        };
        self.paint(&mut writer, code, text)?;
        write!(writer, " {}: ", short_target(event.metadata().target()))?;

        if let Some(msg) = &visitor.message {
            write!(writer, "{}", msg)?;
        }

        if !visitor.fields.is_empty() {
            let fields = visitor
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v.trim_matches('"')))
                .collect::<Vec<_>>()
                .join(", ");
            // Timestamp (8) + space + level (5) + space
            write!(writer, "\n               ")?;
            self.paint(&mut writer, "90", &fields)?;
        }

        writeln!(writer)
    }
}

// Local time to the nearest second.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let stamp = now
            .format(time::macros::format_description!("[hour]:[minute]:[second]"))
            .map_err(|_| fmt::Error)?;
        write!(w, "{}", stamp)
    }
}
