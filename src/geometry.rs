//! Pixel-space geometry over matched keypoints.

use crate::features::Match;
use crate::Error;
use akaze::KeyPoint;
use cv_core::nalgebra::{distance, Point2};
use cv_core::ImagePoint;

/// Resolve every match to the pixel coordinates of its two keypoints.
///
/// The returned sequences are index-aligned with each other and with the match
/// sequence.
pub fn matched_coordinates(
    keypoints_a: &[KeyPoint],
    keypoints_b: &[KeyPoint],
    matches: &[Match],
) -> (Vec<Point2<f64>>, Vec<Point2<f64>>) {
    let coordinates_a = matches
        .iter()
        .map(|m| keypoints_a[m.a].image_point())
        .collect();
    let coordinates_b = matches
        .iter()
        .map(|m| keypoints_b[m.b].image_point())
        .collect();
    (coordinates_a, coordinates_b)
}

/// Arithmetic mean of the per-index Euclidean distances between the two
/// coordinate sequences.
///
/// An empty input means the pair produced no matches, so there is nothing to
/// average; that is [`Error::EmptyMatchSet`], never a NaN.
pub fn mean_displacement(
    coordinates_a: &[Point2<f64>],
    coordinates_b: &[Point2<f64>],
) -> Result<f64, Error> {
    if coordinates_a.is_empty() {
        return Err(Error::EmptyMatchSet);
    }
    let total: f64 = coordinates_a
        .iter()
        .zip(coordinates_b)
        .map(|(a, b)| distance(a, b))
        .sum();
    Ok(total / coordinates_a.len() as f64)
}
