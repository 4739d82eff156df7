//! Real-time clock.
//!
//! Proves the RTC can be read and set by writing a fixed date to it and
//! reading it back. The system clock is stepped to the same date for the
//! duration of the test, so nothing running meanwhile sees the RTC and the
//! wall clock disagree.
//!
//! Both clocks are captured before anything is changed and restored on
//! every path out of the probe, pass or fail.

use std::path::PathBuf;

use async_trait::async_trait;
use time::macros::datetime;
use time::PrimitiveDateTime;

use super::ambient::Restore;
use super::{OrFail, Probe, ProbeFailure};
use crate::config::{ProbeDefaults, ProbeTiming};
use crate::error::{Band, ErrorCode};
use crate::hw_trait::{Rtc, SystemClock};
use crate::platform::Platform;
use crate::tracing::prelude::*;

/// Written to both clocks during the test.
pub const TEST_TIME: PrimitiveDateTime = datetime!(1999-09-09 09:09:09);

pub struct RtcProbe {
    device: PathBuf,
    tolerance: time::Duration,
}

impl RtcProbe {
    pub fn new(device: Option<PathBuf>, defaults: &ProbeDefaults, timing: &ProbeTiming) -> Self {
        Self {
            device: device.unwrap_or_else(|| defaults.rtc_device.clone()),
            tolerance: time::Duration::try_from(timing.rtc_tolerance)
                .unwrap_or(time::Duration::MAX),
        }
    }

    fn exercise(
        &self,
        rtc: &mut dyn Rtc,
        clock: &mut dyn SystemClock,
    ) -> Result<(), ProbeFailure> {
        clock
            .set(TEST_TIME.assume_utc())
            .or_fail(ErrorCode::RtcTimeOfDay, "setting system time")?;
        rtc.set_time(TEST_TIME)
            .or_fail(ErrorCode::RtcNoSet, "setting RTC")?;

        let back = rtc
            .read_time()
            .or_fail(ErrorCode::RtcNoGet, "reading RTC back")?;
        let drift = back - TEST_TIME;
        if drift.abs() > self.tolerance {
            return Err(ProbeFailure::new(
                ErrorCode::RtcReadback,
                format!("RTC was set to {TEST_TIME} but reads {back}"),
            ));
        }
        debug!(drift = %drift, "RTC read back");
        Ok(())
    }
}

#[async_trait]
impl Probe for RtcProbe {
    fn name(&self) -> &'static str {
        "rtc"
    }

    fn band(&self) -> Band {
        Band::Rtc
    }

    async fn run(&self, platform: &dyn Platform) -> Result<(), ProbeFailure> {
        let clock = platform.system_clock();
        let system_time = clock
            .now()
            .or_fail(ErrorCode::RtcTimeOfDay, "reading system time")?;

        let mut rtc = platform
            .open_rtc(&self.device)
            .or_fail(ErrorCode::FdNoOpen, format_args!("opening {}", self.device.display()))?;
        let rtc_time = rtc
            .read_time()
            .or_fail(ErrorCode::RtcNoGet, "reading RTC")?;
        debug!(system = %system_time, rtc = %rtc_time, "Captured clocks");

        let mut clock = Restore::new(clock, system_time);
        let mut rtc = Restore::new(rtc, rtc_time);

        let verdict = self.exercise(rtc.target().as_mut(), clock.target().as_mut());

        let rtc_restored = rtc
            .finish()
            .or_fail(ErrorCode::RtcNoSet, "restoring RTC");
        let clock_restored = clock
            .finish()
            .or_fail(ErrorCode::RtcTimeOfDay, "restoring system time");

        verdict.and(rtc_restored).and(clock_restored)
    }
}
