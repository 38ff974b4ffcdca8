//! Camera acquisition behind an opaque capture contract.

use crate::{Error, Settings};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

/// The capture contract: after a successful call, a readable image file with
/// valid embedded timestamp metadata exists at `path`.
///
/// The device is held only for the duration of the call; a batch of N captures
/// acquires and releases it N times.
pub trait Camera {
    fn capture(&mut self, path: &Path) -> Result<(), Error>;
}

/// Captures stills by spawning an external still-capture program once per
/// shot, `libcamera-still` by default.
///
/// One process per capture keeps the device acquisition scoped to a single
/// image and leaves timestamping to the camera stack.
pub struct StillCommand {
    program: PathBuf,
    resolution: (u32, u32),
    settle_delay: Duration,
}

impl StillCommand {
    pub fn new(settings: &Settings) -> Self {
        Self::with_program("libcamera-still", settings)
    }

    /// Use a different capture program, e.g. `raspistill` on a legacy stack.
    pub fn with_program(program: impl Into<PathBuf>, settings: &Settings) -> Self {
        Self {
            program: program.into(),
            resolution: settings.resolution,
            settle_delay: settings.settle_delay,
        }
    }
}

impl Camera for StillCommand {
    fn capture(&mut self, path: &Path) -> Result<(), Error> {
        let (width, height) = self.resolution;
        let status = Command::new(&self.program)
            .arg("--nopreview")
            .arg("--immediate")
            .args(["--width", &width.to_string()])
            .args(["--height", &height.to_string()])
            .arg("--output")
            .arg(path)
            .status()
            .map_err(|e| {
                Error::DeviceCapture(format!("failed to run {}: {e}", self.program.display()))
            })?;
        if !status.success() {
            return Err(Error::DeviceCapture(format!(
                "{} exited with {status}",
                self.program.display()
            )));
        }
        thread::sleep(self.settle_delay);
        Ok(())
    }
}
