//! Speed computation: unit conversion plus the one-pair pipeline.

use crate::{features, geometry, timestamp, Error, Settings};
use akaze::Akaze;
use log::*;
use std::path::Path;

/// Divisor turning `pixels * GSD` into meters. The GSD calibration constant is
/// expressed in units 100 000 times smaller than a meter-per-pixel scale.
const GSD_SCALE_DIVISOR: f64 = 100_000.0;

/// Ground distance in meters covered by a mean pixel displacement.
pub fn ground_distance_m(mean_displacement: f64, gsd: f64) -> f64 {
    mean_displacement * gsd / GSD_SCALE_DIVISOR
}

/// Speed in km/s from a ground distance and the elapsed capture interval.
///
/// No plausibility bounds are applied: a tiny elapsed time or spurious matches
/// produce an arbitrarily large figure. Callers average many samples.
pub fn speed_kmps(ground_distance_m: f64, elapsed_seconds: u64) -> f64 {
    ground_distance_m / elapsed_seconds as f64
}

/// Compute one speed sample from a pair of sequential captures.
///
/// Runs the whole pipeline for the pair: elapsed time from the embedded
/// timestamps, feature extraction on both images, cross-checked matching,
/// mean pixel displacement, then scaling to km/s. Every failure aborts the
/// pair; nothing is retried.
pub fn pair_speed(earlier: &Path, later: &Path, settings: &Settings) -> Result<f64, Error> {
    let elapsed = timestamp::elapsed_seconds(earlier, later)?;
    let image_a = image::open(earlier)?;
    let image_b = image::open(later)?;
    let akaze = Akaze::default();
    let (keypoints_a, descriptors_a) = features::extract(&akaze, &image_a, settings.max_features);
    let (keypoints_b, descriptors_b) = features::extract(&akaze, &image_b, settings.max_features);
    let matches = features::symmetric_matches(&descriptors_a, &descriptors_b);
    info!(
        "{} matches between {} and {}",
        matches.len(),
        earlier.display(),
        later.display()
    );
    let (coordinates_a, coordinates_b) =
        geometry::matched_coordinates(&keypoints_a, &keypoints_b, &matches);
    let mean = geometry::mean_displacement(&coordinates_a, &coordinates_b)?;
    let speed = speed_kmps(ground_distance_m(mean, settings.gsd), elapsed);
    debug!("mean displacement {mean:.3} px over {elapsed} s gives {speed:.5} km/s");
    Ok(speed)
}
