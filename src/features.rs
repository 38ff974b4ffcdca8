//! Feature detection and descriptor matching.
//!
//! Detection is plain AKAZE with default thresholds, capped at a configured
//! number of features per image by keeping the strongest detector responses.
//! Matching is brute-force Hamming distance with cross-checking: a pair is
//! kept only when each descriptor is the other's nearest neighbor, which
//! discards many-to-one ambiguities and yields at most one match per
//! descriptor. The exact keypoint set is detector-internal and may shift
//! between detector versions, so callers should only rely on aggregate
//! statistics.

use akaze::{Akaze, KeyPoint};
use bitarray::BitArray;
use float_ord::FloatOrd;
use image::DynamicImage;
use log::*;
use space::Neighbor;

pub type Descriptor = BitArray<64>;

/// One cross-checked descriptor match between an image pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Descriptor index in the first image.
    pub a: usize,
    /// Descriptor index in the second image.
    pub b: usize,
    /// Hamming distance between the two descriptors.
    pub distance: u32,
}

/// Extract up to `max_features` keypoint/descriptor pairs from `image`.
///
/// Grayscale conversion happens inside the detector. The returned vectors are
/// index-aligned and ordered by descending detector response.
pub fn extract(
    akaze: &Akaze,
    image: &DynamicImage,
    max_features: usize,
) -> (Vec<KeyPoint>, Vec<Descriptor>) {
    let (keypoints, descriptors) = akaze.extract(image);
    debug!("detector produced {} raw features", keypoints.len());
    cap_features(keypoints, descriptors, max_features)
}

/// Keep the `max_features` strongest responses, preserving keypoint/descriptor
/// index alignment.
pub fn cap_features(
    keypoints: Vec<KeyPoint>,
    descriptors: Vec<Descriptor>,
    max_features: usize,
) -> (Vec<KeyPoint>, Vec<Descriptor>) {
    let mut order: Vec<usize> = (0..keypoints.len()).collect();
    order.sort_unstable_by_key(|&ix| std::cmp::Reverse(FloatOrd(keypoints[ix].response)));
    order.truncate(max_features);
    let capped_keypoints = order.iter().map(|&ix| keypoints[ix]).collect();
    let capped_descriptors = order.iter().map(|&ix| descriptors[ix].clone()).collect();
    (capped_keypoints, capped_descriptors)
}

/// The nearest neighbor in `to` for every descriptor in `from`.
fn nearest_neighbors(from: &[Descriptor], to: &[Descriptor]) -> Vec<Neighbor> {
    from.iter()
        .map(|descriptor| {
            let mut neighbors = [Neighbor::invalid(); 1];
            space::linear_knn(descriptor, &mut neighbors, to);
            neighbors[0]
        })
        .collect()
}

/// Cross-checked matching between two descriptor sequences.
///
/// A pair `(a, b)` survives only if `b` is `a`'s nearest neighbor in the
/// second image and `a` is `b`'s nearest neighbor in the first. The result is
/// sorted ascending by Hamming distance. Either input being empty yields an
/// empty match sequence.
pub fn symmetric_matches(a: &[Descriptor], b: &[Descriptor]) -> Vec<Match> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let forward = nearest_neighbors(a, b);
    let reverse = nearest_neighbors(b, a);
    let mut matches: Vec<Match> = forward
        .iter()
        .enumerate()
        .filter(|&(aix, neighbor)| reverse[neighbor.index].index == aix)
        .map(|(aix, neighbor)| Match {
            a: aix,
            b: neighbor.index,
            distance: neighbor.distance as u32,
        })
        .collect();
    matches.sort_unstable_by_key(|m| m.distance);
    matches
}
