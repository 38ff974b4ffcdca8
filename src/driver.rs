//! The measurement loop: capture batches until the deadline, then persist the
//! overall average.

use crate::camera::Camera;
use crate::{speed, Error, Settings};
use log::*;
use std::fs;
use std::time::Instant;

/// Run one full measurement and write the result file.
///
/// Until the wall clock passes `run_duration`, each iteration captures a full
/// batch of numbered images and averages the speeds of its consecutive pairs.
/// The deadline is only checked between batches, so a batch in flight always
/// completes. The mean of all batch means is written to `result_path` with
/// exactly 5 fractional digits and returned.
///
/// Fail-fast: the first error anywhere in a batch aborts the whole run and no
/// result file is written. A window that closes before any batch completes is
/// [`Error::EmptyResults`].
pub fn run(camera: &mut dyn Camera, settings: &Settings) -> Result<f64, Error> {
    let deadline = Instant::now() + settings.run_duration;
    let mut batch_speeds = Vec::new();
    while Instant::now() < deadline {
        capture_batch(camera, settings)?;
        let batch = batch_speed(settings)?;
        info!("batch {}: {batch:.5} km/s", batch_speeds.len() + 1);
        batch_speeds.push(batch);
    }
    let overall = mean(&batch_speeds).ok_or(Error::EmptyResults)?;
    fs::write(&settings.result_path, format_speed(overall))?;
    info!(
        "wrote {} km/s to {}",
        format_speed(overall),
        settings.result_path.display()
    );
    Ok(overall)
}

/// Capture images `1..=batch_size` to their numbered paths.
pub fn capture_batch(camera: &mut dyn Camera, settings: &Settings) -> Result<(), Error> {
    for index in 1..=settings.batch_size {
        camera.capture(&settings.image_path(index))?;
    }
    Ok(())
}

/// Mean speed over the consecutive pairs (1,2), (2,3), .., (N-1,N) of one
/// captured batch.
pub fn batch_speed(settings: &Settings) -> Result<f64, Error> {
    let mut speeds = Vec::new();
    for index in 1..settings.batch_size {
        let earlier = settings.image_path(index);
        let later = settings.image_path(index + 1);
        speeds.push(speed::pair_speed(&earlier, &later, settings)?);
    }
    mean(&speeds).ok_or(Error::EmptyResults)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn format_speed(speed: f64) -> String {
    format!("{speed:.5}")
}
