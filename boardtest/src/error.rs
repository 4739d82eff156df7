//! Result-code taxonomy shared by every probe.
//!
//! Codes form a flat numeric space. Zero is success; every other value names
//! exactly one failure kind and lives in a band reserved for one peripheral
//! family. Downstream tooling branches on these numbers, so the values below
//! are a wire contract and must never be renumbered.
//!
//! # Extending
//!
//! Add a code to an existing band when the failure is conceptually the same
//! as its neighbours. Split a band only when it has run out of slots, the way
//! the power band was carved out of the upper half of the serial band.

use serde::Serialize;
use std::fmt;
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

/// A probe's terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr, Serialize)]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,

    // Generic failures shared by all families (1-63)
    FdNoOpen = 1,
    FdNoWrite = 2,
    FdNoRead = 3,
    /// Two buffers that should match (written vs. read back) differ
    BufCmpFail = 4,
    Timeout = 5,
    InvalidArg = 6,

    BlockDev = 64,
    BlockNoMount = 65,

    Serial = 96,
    SerialWrite = 97,
    SerialRead = 98,
    SerialPoll = 99,

    PowerOutput = 112,

    Rs485 = 128,
    Rs485Init = 129,

    Rs422 = 160,

    PldGen = 192,
    /// The sysfs directory that signals a programmed PLD is missing
    PldDirMissing = 193,
    /// The sysfs path exists but is not a directory
    PldNotDir = 194,

    Rtc = 224,
    /// Reading or setting the host time-of-day failed
    RtcTimeOfDay = 225,
    RtcNoSet = 226,
    RtcNoGet = 227,
    /// The RTC accepted a new time but reported something else back
    RtcReadback = 228,

    Analog = 256,
    AtodFail = 257,
    SpiFail = 258,

    Audio = 288,

    Ethernet = 320,
    EthSysfs = 321,
    /// Insufficient link speed, often a cold solder joint
    EthLinkSpeed = 322,
    EthNoInterfaceUp = 323,
    EthPingDest = 324,

    Gpio = 352,
    GpioBadValue = 353,
    GpioNoWrite = 354,
    GpioNoRead = 355,

    Pwm = 384,
    PwmNoWidthWrite = 385,

    I2c = 416,
    /// Setting the slave address failed
    I2cNoDevice = 417,
    I2cNoRead = 418,
    I2cNoWrite = 419,
    /// The register held a value other than the expected one
    I2cMismatch = 420,
}

impl ErrorCode {
    /// Numeric value of this code.
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Look up a code by its numeric value.
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::iter().find(|code| code.as_u16() == value)
    }

    pub fn is_success(self) -> bool {
        self == ErrorCode::Success
    }

    /// The band this code belongs to, or `None` for `Success`.
    pub fn band(self) -> Option<Band> {
        Band::of(self.as_u16())
    }

    /// Whether a probe of family `band` may return this code: codes from
    /// its own band and from the generic band are allowed.
    pub fn belongs_to(self, band: Band) -> bool {
        matches!(self.band(), Some(b) if b == band || b == Band::Generic)
    }

    /// Which side of the harness/hardware line a failure falls on.
    pub fn class(self) -> Option<FailureClass> {
        use ErrorCode::*;
        match self {
            Success => None,
            FdNoOpen | FdNoWrite | FdNoRead | Timeout | InvalidArg | BlockDev | BlockNoMount
            | Rs485Init | PldGen | PldDirMissing | PldNotDir => Some(FailureClass::Infrastructure),
            BufCmpFail | GpioBadValue | I2cMismatch | RtcReadback | EthLinkSpeed => {
                Some(FailureClass::Verification)
            }
            _ => Some(FailureClass::Protocol),
        }
    }

    /// Short identifier, e.g. `"SerialPoll"`.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u16())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.as_u16()
    }
}

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The harness could not reach the device: missing driver, bad
    /// permissions, nothing mounted, malformed arguments.
    Infrastructure,
    /// A device-specific transaction step returned an OS error.
    Protocol,
    /// The device answered, but with the wrong value. The real sign of a
    /// defective board.
    Verification,
}

/// A block of codes reserved for one peripheral family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr, Serialize)]
pub enum Band {
    Generic,
    Block,
    Serial,
    Power,
    Rs485,
    Rs422,
    Pld,
    Rtc,
    Analog,
    Audio,
    Ethernet,
    Gpio,
    Pwm,
    I2c,
}

impl Band {
    /// First code of the band (the band's own generic code).
    pub const fn base(self) -> u16 {
        match self {
            Band::Generic => 0,
            Band::Block => 64,
            Band::Serial => 96,
            Band::Power => 112,
            Band::Rs485 => 128,
            Band::Rs422 => 160,
            Band::Pld => 192,
            Band::Rtc => 224,
            Band::Analog => 256,
            Band::Audio => 288,
            Band::Ethernet => 320,
            Band::Gpio => 352,
            Band::Pwm => 384,
            Band::I2c => 416,
        }
    }

    /// Number of codes in the band.
    pub const fn width(self) -> u16 {
        match self {
            Band::Generic => 64,
            Band::Serial | Band::Power => 16,
            _ => 32,
        }
    }

    pub fn contains(self, code: u16) -> bool {
        code >= self.base() && code < self.base() + self.width() && code != 0
    }

    /// Band that owns a numeric code.
    pub fn of(code: u16) -> Option<Band> {
        Band::iter().find(|band| band.contains(code))
    }
}
