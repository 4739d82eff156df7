//! Hardware probes.
//!
//! A probe validates one peripheral by driving it through a fixed sequence:
//!
//! 1. resolve parameters against [`ProbeDefaults`](crate::config::ProbeDefaults),
//!    rejecting malformed ones before any device is touched;
//! 2. open the device handle(s) it needs;
//! 3. run its transaction, retrying only where the protocol calls for it;
//! 4. verify the result against an expected value or against what it wrote;
//! 5. release every handle and restore any ambient state it changed.
//!
//! Step 5 is carried by ownership. Handles are boxed trait objects that
//! close on drop, and ambient state sits behind [`ambient::Restore`]
//! guards, so returning from [`Probe::run`] on any path cleans up.
//!
//! The outcome is a single [`ErrorCode`]. [`execute`] runs a probe, logs the
//! outcome and wraps it in a [`ProbeReport`].

pub mod ambient;
pub mod block;
pub mod gpio;
pub mod i2c;
pub mod pld;
pub mod pwm;
pub mod rs485;
pub mod rtc;
pub mod serial;

use std::fmt;

use async_trait::async_trait;
use serde::{Serialize, Serializer};

use crate::error::{Band, ErrorCode, FailureClass};
use crate::hw_trait::HwError;
use crate::params::ParamError;
use crate::platform::Platform;
use crate::tracing::prelude::*;

pub use block::BlockProbe;
pub use gpio::GpioProbe;
pub use i2c::I2cReadProbe;
pub use pld::PldProbe;
pub use pwm::PwmProbe;
pub use rs485::Rs485Probe;
pub use rtc::RtcProbe;
pub use serial::SerialProbe;

/// Why a probe did not pass.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {detail}")]
pub struct ProbeFailure {
    pub code: ErrorCode,
    pub detail: String,
    #[source]
    pub source: Option<HwError>,
}

impl ProbeFailure {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
            source: None,
        }
    }
}

impl From<ParamError> for ProbeFailure {
    fn from(err: ParamError) -> Self {
        ProbeFailure::new(ErrorCode::InvalidArg, err.to_string())
    }
}

/// Attach a result code to a failed primitive.
pub(crate) trait OrFail<T> {
    fn or_fail(self, code: ErrorCode, what: impl fmt::Display) -> Result<T, ProbeFailure>;
}

impl<T, E: Into<HwError>> OrFail<T> for Result<T, E> {
    fn or_fail(self, code: ErrorCode, what: impl fmt::Display) -> Result<T, ProbeFailure> {
        self.map_err(|e| {
            let e = e.into();
            ProbeFailure {
                code,
                detail: format!("{what}: {e}"),
                source: Some(e),
            }
        })
    }
}

/// A hardware conformance probe.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Short name, as used on the command line.
    fn name(&self) -> &'static str;

    /// The band this probe's family-specific codes come from. Probes may
    /// also return codes from [`Band::Generic`].
    fn band(&self) -> Band;

    /// Run the probe once against `platform`.
    async fn run(&self, platform: &dyn Platform) -> Result<(), ProbeFailure>;
}

fn code_number<S: Serializer>(code: &ErrorCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(code.as_u16())
}

/// Outcome of one probe or live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub probe: &'static str,
    #[serde(serialize_with = "code_number")]
    pub code: ErrorCode,
    pub name: &'static str,
    pub class: Option<FailureClass>,
    pub detail: Option<String>,
}

impl ProbeReport {
    pub fn new(probe: &'static str, outcome: &Result<(), ProbeFailure>) -> Self {
        let (code, detail) = match outcome {
            Ok(()) => (ErrorCode::Success, None),
            Err(failure) => (failure.code, Some(failure.detail.clone())),
        };
        Self {
            probe,
            code,
            name: code.name(),
            class: code.class(),
            detail,
        }
    }

    /// Report for a probe whose arguments were rejected before it ran.
    pub fn rejected(probe: &'static str, err: ParamError) -> Self {
        warn!(probe, error = %err, "Rejected probe arguments");
        Self::new(probe, &Err(err.into()))
    }

    pub fn passed(&self) -> bool {
        self.code.is_success()
    }
}

/// Log the outcome of a probe or session and build its report.
pub(crate) fn conclude(
    name: &'static str,
    band: Band,
    outcome: Result<(), ProbeFailure>,
) -> ProbeReport {
    match &outcome {
        Ok(()) => info!(probe = name, "PASS"),
        Err(failure) => {
            if !failure.code.belongs_to(band) {
                error!(
                    probe = name,
                    code = failure.code.as_u16(),
                    band = ?failure.code.band(),
                    "Probe returned a code outside its band"
                );
            }
            warn!(
                probe = name,
                code = failure.code.as_u16(),
                class = ?failure.code.class(),
                "FAIL: {}",
                failure.detail
            );
        }
    }
    ProbeReport::new(name, &outcome)
}

/// Run `probe` once and report its outcome.
pub async fn execute(probe: &dyn Probe, platform: &dyn Platform) -> ProbeReport {
    debug!(probe = probe.name(), "Starting probe");
    let outcome = probe.run(platform).await;
    conclude(probe.name(), probe.band(), outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePlatform;

    struct Scripted(Result<(), ErrorCode>);

    #[async_trait]
    impl Probe for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn band(&self) -> Band {
            Band::Gpio
        }

        async fn run(&self, _platform: &dyn Platform) -> Result<(), ProbeFailure> {
            self.0
                .map_err(|code| ProbeFailure::new(code, "scripted failure"))
        }
    }

    #[tokio::test]
    async fn test_execute_reports_success() {
        let report = execute(&Scripted(Ok(())), &FakePlatform::new()).await;
        assert!(report.passed());
        assert_eq!(report.code, ErrorCode::Success);
        assert_eq!(report.class, None);
        assert_eq!(report.detail, None);
    }

    #[tokio::test]
    async fn test_execute_reports_failure_class() {
        let report = execute(
            &Scripted(Err(ErrorCode::GpioBadValue)),
            &FakePlatform::new(),
        )
        .await;
        assert!(!report.passed());
        assert_eq!(report.code, ErrorCode::GpioBadValue);
        assert_eq!(report.class, Some(FailureClass::Verification));
        assert_eq!(report.detail.as_deref(), Some("scripted failure"));
    }

    #[tokio::test]
    async fn test_out_of_band_code_is_still_reported() {
        // A GPIO probe must not return an RTC code; the report keeps it anyway
        // so the mistake is visible downstream.
        assert!(!ErrorCode::RtcNoSet.belongs_to(Band::Gpio));
        let report = execute(&Scripted(Err(ErrorCode::RtcNoSet)), &FakePlatform::new()).await;
        assert_eq!(report.code, ErrorCode::RtcNoSet);
        assert_eq!(report.name, "RtcNoSet");
        assert!(!report.passed());
    }

    #[test]
    fn test_report_serializes_numeric_code() {
        let report = ProbeReport::new(
            "serial",
            &Err(ProbeFailure::new(ErrorCode::SerialPoll, "no data")),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["probe"], "serial");
        assert_eq!(json["code"], 99);
        assert_eq!(json["name"], "SerialPoll");
        assert_eq!(json["class"], "protocol");
        assert_eq!(json["detail"], "no data");
    }

    #[test]
    fn test_rejected_arguments_are_invalid_arg() {
        let report = ProbeReport::rejected("gpio", ParamError::NotANumber("x".into()));
        assert_eq!(report.code, ErrorCode::InvalidArg);
        assert_eq!(report.class, Some(FailureClass::Infrastructure));
    }

    #[test]
    fn test_or_fail_keeps_source() {
        let result: crate::hw_trait::Result<()> =
            Err(std::io::Error::from_raw_os_error(libc::EACCES).into());
        let failure = result.or_fail(ErrorCode::FdNoOpen, "opening /dev/x").unwrap_err();
        assert_eq!(failure.code, ErrorCode::FdNoOpen);
        assert!(failure.detail.starts_with("opening /dev/x: "));
        assert_eq!(
            failure.source.and_then(|e| e.raw_os_error()),
            Some(libc::EACCES)
        );
    }
}
