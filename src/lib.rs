//! Ground speed estimation from pairs of sequentially captured nadir photographs.
//!
//! The platform (a satellite or an airborne rig) photographs the ground at a fixed
//! cadence. Binary image features are extracted from consecutive captures and matched
//! by mutual nearest-neighbor Hamming distance. The mean pixel displacement of the
//! matched features, scaled by a ground-sample-distance calibration constant and
//! divided by the capture interval read from the embedded timestamps, yields one
//! speed sample per image pair:
//!
//! ```text
//! capture -> timestamps -> detect -> match -> mean displacement -> speed
//! ```
//!
//! Samples are averaged per batch of captures, batches are averaged over the whole
//! measuring window, and the final figure is written to a result file. See
//! [`driver::run`] for the loop and [`speed::pair_speed`] for the per-pair pipeline.

pub mod camera;
pub mod driver;
pub mod features;
pub mod geometry;
pub mod speed;
pub mod timestamp;

pub use features::{Descriptor, Match};

use chrono::NaiveDateTime;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the measurement pipeline.
///
/// None of these are recovered from: any of them aborts the run and leaves no
/// result file behind.
#[derive(Debug, Error)]
pub enum Error {
    /// The image carries no parseable `DateTimeOriginal` metadata.
    #[error("image {path} has no parseable capture timestamp: {reason}")]
    MetadataParse { path: PathBuf, reason: String },
    /// The second image of a pair was not captured strictly after the first.
    #[error("capture times are not strictly increasing ({earlier} to {later})")]
    ZeroElapsedTime {
        earlier: NaiveDateTime,
        later: NaiveDateTime,
    },
    /// No mutual nearest-neighbor matches exist between the image pair.
    #[error("no feature matches between the image pair")]
    EmptyMatchSet,
    /// The camera device failed to produce an image.
    #[error("camera capture failed: {0}")]
    DeviceCapture(String),
    /// The measuring window closed before a single batch completed.
    #[error("no batches completed before the deadline")]
    EmptyResults,
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Contains the configuration of one measurement run.
///
/// The defaults reproduce the flight configuration. Tests substitute synthetic
/// values; the computation functions all take `&Settings` rather than reading
/// globals.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Ground-sample-distance calibration constant, fixed by the platform's
    /// altitude and optics. Scaled such that
    /// `pixels * gsd / 100 000` is a distance in meters.
    pub gsd: f64,

    /// Upper bound on features kept per image. When the detector returns more,
    /// the strongest responses win.
    pub max_features: usize,

    /// Path prefix for the numbered captures; `"photo"` gives `photo1.jpg`,
    /// `photo2.jpg`, and so on (1-based).
    pub image_prefix: PathBuf,

    /// Images captured per batch. Must be at least 2 to form a pair.
    pub batch_size: usize,

    /// Length of the measuring window. A batch already in flight when the
    /// window closes still completes, so the actual run may exceed this by up
    /// to one batch's capture and compute time.
    pub run_duration: Duration,

    /// Capture resolution as (width, height).
    pub resolution: (u32, u32),

    /// Pause after every single capture, giving the device time to settle.
    pub settle_delay: Duration,

    /// Where the final averaged speed is written.
    pub result_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gsd: 12648.0,
            max_features: 750,
            image_prefix: PathBuf::from("photo"),
            batch_size: 25,
            run_duration: Duration::from_secs(29 * 60),
            resolution: (1280, 720),
            settle_delay: Duration::from_secs(1),
            result_path: PathBuf::from("result.txt"),
        }
    }
}

impl Settings {
    /// Path of the `index`-th capture (1-based) under the configured prefix.
    pub fn image_path(&self, index: usize) -> PathBuf {
        let mut name = self.image_prefix.as_os_str().to_os_string();
        name.push(format!("{index}.jpg"));
        PathBuf::from(name)
    }
}
