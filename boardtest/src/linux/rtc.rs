//! RTC device (`/dev/rtc0`) and the host wall clock.

use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

use super::{ior, iow, open_rw, IoctlRequest};
use crate::hw_trait::{HwError, Result, Rtc, SystemClock};

/// `struct rtc_time` from `<linux/rtc.h>`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RtcTime {
    tm_sec: libc::c_int,
    tm_min: libc::c_int,
    tm_hour: libc::c_int,
    tm_mday: libc::c_int,
    /// 0..=11
    tm_mon: libc::c_int,
    /// Years since 1900
    tm_year: libc::c_int,
    tm_wday: libc::c_int,
    tm_yday: libc::c_int,
    tm_isdst: libc::c_int,
}

const RTC_RD_TIME: IoctlRequest = ior::<RtcTime>(b'p', 0x09);
const RTC_SET_TIME: IoctlRequest = iow::<RtcTime>(b'p', 0x0a);

fn field(name: &str, value: libc::c_int) -> Result<u8> {
    u8::try_from(value)
        .map_err(|_| HwError::Other(format!("RTC returned out-of-range {name} {value}")))
}

impl RtcTime {
    fn to_datetime(self) -> Result<PrimitiveDateTime> {
        let invalid = |e: time::error::ComponentRange| HwError::Other(format!("RTC time: {e}"));

        let month = Month::try_from(field("month", self.tm_mon + 1)?).map_err(invalid)?;
        let date = Date::from_calendar_date(self.tm_year + 1900, month, field("day", self.tm_mday)?)
            .map_err(invalid)?;
        let time = Time::from_hms(
            field("hour", self.tm_hour)?,
            field("minute", self.tm_min)?,
            field("second", self.tm_sec)?,
        )
        .map_err(invalid)?;
        Ok(PrimitiveDateTime::new(date, time))
    }

    fn from_datetime(dt: PrimitiveDateTime) -> Self {
        Self {
            tm_sec: dt.second().into(),
            tm_min: dt.minute().into(),
            tm_hour: dt.hour().into(),
            tm_mday: dt.day().into(),
            tm_mon: libc::c_int::from(u8::from(dt.month())) - 1,
            tm_year: dt.year() - 1900,
            tm_wday: dt.weekday().number_days_from_sunday().into(),
            tm_yday: libc::c_int::from(dt.ordinal()) - 1,
            tm_isdst: 0,
        }
    }
}

/// An open RTC.
#[derive(Debug)]
pub struct RtcDev {
    file: File,
}

impl RtcDev {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: open_rw(path)?,
        })
    }
}

impl Rtc for RtcDev {
    fn read_time(&mut self) -> Result<PrimitiveDateTime> {
        let mut raw = RtcTime::default();
        syscall!(ioctl(
            self.file.as_raw_fd(),
            RTC_RD_TIME as _,
            &mut raw as *mut RtcTime
        ))?;
        raw.to_datetime()
    }

    fn set_time(&mut self, time: PrimitiveDateTime) -> Result<()> {
        let raw = RtcTime::from_datetime(time);
        syscall!(ioctl(
            self.file.as_raw_fd(),
            RTC_SET_TIME as _,
            &raw as *const RtcTime
        ))?;
        Ok(())
    }
}

/// The kernel's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostClock;

impl SystemClock for HostClock {
    fn now(&self) -> Result<OffsetDateTime> {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        syscall!(clock_gettime(libc::CLOCK_REALTIME, &mut ts))?;
        let nanos = i128::from(ts.tv_sec) * 1_000_000_000 + i128::from(ts.tv_nsec);
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|e| HwError::Other(format!("wall clock out of range: {e}")))
    }

    fn set(&mut self, time: OffsetDateTime) -> Result<()> {
        let tv = libc::timeval {
            tv_sec: time.unix_timestamp() as libc::time_t,
            tv_usec: time.microsecond() as libc::suseconds_t,
        };
        syscall!(settimeofday(&tv, std::ptr::null()))?;
        Ok(())
    }
}
