//! Operator-facing output of live sessions.
//!
//! Two layouts are supported. `Console` prints the prompt and a column
//! header once, then rewrites a single line of values in place with `\r`.
//! `Gauge` emits one self-contained frame per sample in the format read by
//! `dialog --gauge`:
//!
//! ```text
//! XXX
//! <percent>
//! <prompt>
//!
//! <header>
//! <values>
//! XXX
//! ```
//!
//! The percentage carries no meaning; it cycles 0..=100 so the bar moves
//! while the session is alive.

use std::fmt;
use std::str::FromStr;

/// How a live session presents its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Console,
    Gauge,
}

impl FromStr for DisplayMode {
    type Err = String;

    /// Accepts the names as well as the `0`/`1` dialog flag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" | "0" => Ok(DisplayMode::Console),
            "gauge" | "dialog" | "1" => Ok(DisplayMode::Gauge),
            other => Err(format!("unknown display mode '{other}'")),
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DisplayMode::Console => "console",
            DisplayMode::Gauge => "gauge",
        })
    }
}

/// Static text shown around the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub prompt: &'static str,
    /// Column header, empty when the values need none.
    pub header: String,
}

impl Screen {
    pub fn new(prompt: &'static str) -> Self {
        Self {
            prompt,
            header: String::new(),
        }
    }

    /// Header with one `<prefix>[i]` column per channel.
    pub fn with_columns(mut self, prefix: &str, count: u8) -> Self {
        self.header = (0..count).map(|i| format!("{prefix}[{i}]  ")).collect();
        self
    }
}

/// Width of one value column, matching `"V[0]  "`.
const COLUMN: usize = 4;

/// Format one row of readings; `None` marks a failed read.
pub fn row(values: &[Option<u32>]) -> String {
    values
        .iter()
        .map(|value| match value {
            Some(v) => format!("{v:>COLUMN$}  "),
            None => format!("{:>COLUMN$}  ", "--"),
        })
        .collect()
}

/// Turns rows into terminal output for one session.
#[derive(Debug)]
pub struct Renderer {
    mode: DisplayMode,
    screen: Screen,
    percent: u8,
}

impl Renderer {
    pub fn new(mode: DisplayMode, screen: Screen) -> Self {
        Self {
            mode,
            screen,
            percent: 0,
        }
    }

    /// Text printed once before the first sample.
    pub fn preamble(&self) -> String {
        match self.mode {
            DisplayMode::Console => {
                let mut out = format!("{}\n\n", self.screen.prompt);
                if !self.screen.header.is_empty() {
                    out.push_str(&self.screen.header);
                    out.push('\n');
                }
                out
            }
            DisplayMode::Gauge => String::new(),
        }
    }

    /// Output for one sample.
    pub fn frame(&mut self, row: &str) -> String {
        match self.mode {
            DisplayMode::Console => format!("{row}\r"),
            DisplayMode::Gauge => {
                let percent = self.percent;
                self.percent = if percent == 100 { 0 } else { percent + 1 };

                let mut out = format!("XXX\n{percent}\n{}\n\n", self.screen.prompt);
                if !self.screen.header.is_empty() {
                    out.push_str(&self.screen.header);
                    out.push('\n');
                }
                out.push_str(row);
                out.push_str("\nXXX\n");
                out
            }
        }
    }

    /// Text printed once after the last sample.
    pub fn epilogue(&self) -> &'static str {
        match self.mode {
            DisplayMode::Console => "\n",
            DisplayMode::Gauge => "",
        }
    }
}
