//! Single-keypress detection on the controlling terminal.
//!
//! Live sessions run until the operator presses any key. The terminal is
//! switched out of canonical mode so a key is seen without Enter, and put
//! back when the returned guard is dropped. Signals (Ctrl-C) still work.

use std::io;
use std::mem::MaybeUninit;
use std::os::fd::RawFd;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Restores the saved terminal mode on drop.
pub struct RawTerminal {
    fd: RawFd,
    saved: libc::termios,
}

impl RawTerminal {
    /// Disable line buffering and echo on `fd`. `None` when `fd` is not a
    /// terminal.
    fn enter(fd: RawFd) -> io::Result<Option<Self>> {
        if unsafe { libc::isatty(fd) } != 1 {
            return Ok(None);
        }

        let mut saved = MaybeUninit::<libc::termios>::uninit();
        if unsafe { libc::tcgetattr(fd, saved.as_mut_ptr()) } == -1 {
            return Err(io::Error::last_os_error());
        }
        let saved = unsafe { saved.assume_init() };

        let mut raw = saved;
        raw.c_lflag &= !(libc::ICANON | libc::ECHO);
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &raw) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(Some(Self { fd, saved }))
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        if unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, &self.saved) } == -1 {
            warn!(error = %io::Error::last_os_error(), "Failed to restore terminal mode");
        }
    }
}

/// Whether input is waiting on `fd`, without blocking.
fn input_waiting(fd: RawFd) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    match unsafe { libc::poll(&mut pfd, 1, 0) } {
        -1 => Err(io::Error::last_os_error()),
        0 => Ok(false),
        _ => Ok(pfd.revents & libc::POLLIN != 0),
    }
}

/// Consume one byte of pending input.
fn take_byte(fd: RawFd) -> io::Result<()> {
    let mut byte = 0u8;
    if unsafe { libc::read(fd, (&mut byte as *mut u8).cast(), 1) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

async fn watch(fd: RawFd, stop: CancellationToken) {
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
        match input_waiting(fd) {
            Ok(false) => {}
            Ok(true) => {
                if let Err(e) = take_byte(fd) {
                    debug!(error = %e, "Failed to consume keypress");
                }
                debug!("Key pressed");
                stop.cancel();
                break;
            }
            Err(e) => {
                warn!(error = %e, "Failed to poll the terminal; only Ctrl-C will stop");
                break;
            }
        }
    }
}

/// Cancel `stop` when a key is pressed on stdin.
///
/// When stdin is not a terminal nothing is watched and `None` is returned.
/// Otherwise the returned guard must be held until the session ends.
pub fn stop_on_keypress(stop: CancellationToken) -> io::Result<Option<RawTerminal>> {
    let fd = libc::STDIN_FILENO;
    let Some(terminal) = RawTerminal::enter(fd)? else {
        debug!("stdin is not a terminal, keypress detection disabled");
        return Ok(None);
    };
    tokio::spawn(watch(fd, stop));
    Ok(Some(terminal))
}
