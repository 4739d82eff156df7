//! Programmable logic presence.
//!
//! The PLD's GPIO driver only registers its sysfs directory once the device
//! has been programmed, so the directory's presence is the test.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{Probe, ProbeFailure};
use crate::config::ProbeDefaults;
use crate::error::{Band, ErrorCode};
use crate::hw_trait::PathKind;
use crate::platform::Platform;

pub struct PldProbe {
    dir: PathBuf,
}

impl PldProbe {
    pub fn new(dir: Option<PathBuf>, defaults: &ProbeDefaults) -> Self {
        Self {
            dir: dir.unwrap_or_else(|| defaults.pld_dir.clone()),
        }
    }
}

#[async_trait]
impl Probe for PldProbe {
    fn name(&self) -> &'static str {
        "pld"
    }

    fn band(&self) -> Band {
        Band::Pld
    }

    async fn run(&self, platform: &dyn Platform) -> Result<(), ProbeFailure> {
        match platform.filesystem().path_kind(&self.dir) {
            Ok(PathKind::Directory) => Ok(()),
            Ok(PathKind::Other) => Err(ProbeFailure::new(
                ErrorCode::PldNotDir,
                format!("{} is not a directory", self.dir.display()),
            )),
            Err(e) => Err(ProbeFailure {
                code: ErrorCode::PldDirMissing,
                detail: format!("{}: {e}", self.dir.display()),
                source: Some(e),
            }),
        }
    }
}
