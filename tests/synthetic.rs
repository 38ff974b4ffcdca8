//! End-to-end tests over synthetic imagery.
//!
//! Scenes are deterministic constellations of blobs joined by line segments,
//! so every neighborhood is visually distinctive. Translated pairs are cut as
//! two crops of one larger scene, which shifts the content by an exact pixel
//! amount with no interpolation. Capture timestamps are injected by splicing
//! an EXIF APP1 segment into the encoded JPEG. Feature detection is not
//! guaranteed to be stable across detector versions, so assertions stay at
//! the level of aggregate statistics.

use akaze::Akaze;
use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use groundspeed::camera::Camera;
use groundspeed::{driver, features, geometry, speed, timestamp, Error, Settings};
use image::{imageops, DynamicImage, GrayImage, ImageOutputFormat, Luma};
use imageproc::drawing;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

/// Deterministic textured scene: shaded blobs joined by a polyline web.
fn textured_scene(width: u32, height: u32) -> GrayImage {
    let mut image = GrayImage::from_pixel(width, height, Luma([24u8]));
    let mut state = 0x2545_F491u32;
    let mut next = move || {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        state >> 8
    };
    let mut previous: Option<(f32, f32)> = None;
    for index in 0..140 {
        let radius = 2 + (next() % 9) as i32;
        let margin = radius as u32 + 1;
        let x = (margin + next() % (width - 2 * margin)) as i32;
        let y = (margin + next() % (height - 2 * margin)) as i32;
        let shade = 70 + ((index * 11) % 180) as u8;
        if let Some(start) = previous {
            drawing::draw_line_segment_mut(
                &mut image,
                start,
                (x as f32, y as f32),
                Luma([shade / 2 + 40]),
            );
        }
        drawing::draw_filled_circle_mut(&mut image, (x, y), radius, Luma([shade]));
        previous = Some((x as f32, y as f32));
    }
    image
}

/// Raw EXIF (TIFF) block holding a single `DateTimeOriginal` field.
fn exif_block(datetime: &str) -> Vec<u8> {
    let field = Field {
        tag: Tag::DateTimeOriginal,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![datetime.as_bytes().to_vec()]),
    };
    let mut writer = Writer::new();
    writer.push_field(&field);
    let mut cursor = Cursor::new(Vec::new());
    writer
        .write(&mut cursor, false)
        .expect("failed to assemble EXIF block");
    cursor.into_inner()
}

/// Encode `image` as JPEG and splice in an APP1 segment carrying
/// `DateTimeOriginal = datetime`.
fn jpeg_with_timestamp(image: &GrayImage, datetime: &str) -> Vec<u8> {
    let mut jpeg = Vec::new();
    DynamicImage::ImageLuma8(image.clone())
        .write_to(&mut Cursor::new(&mut jpeg), ImageOutputFormat::Jpeg(92))
        .expect("failed to encode JPEG");
    let block = exif_block(datetime);
    let mut app1 = Vec::with_capacity(block.len() + 10);
    app1.extend_from_slice(&[0xFF, 0xE1]);
    app1.extend_from_slice(&((block.len() + 8) as u16).to_be_bytes());
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&block);
    // SOI marker, then APP1, then the rest of the stream.
    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn write_jpeg(path: &Path, image: &GrayImage, datetime: &str) {
    std::fs::write(path, jpeg_with_timestamp(image, datetime)).unwrap();
}

/// Two views of the same scene offset by exactly (dx, dy) pixels.
fn translated_views(width: u32, height: u32, dx: u32, dy: u32) -> (GrayImage, GrayImage) {
    let scene = textured_scene(width + dx, height + dy);
    let view_a = imageops::crop_imm(&scene, 0, 0, width, height).to_image();
    let view_b = imageops::crop_imm(&scene, dx, dy, width, height).to_image();
    (view_a, view_b)
}

fn mean_displacement_between(image_a: &Path, image_b: &Path, settings: &Settings) -> (usize, f64) {
    let akaze = Akaze::default();
    let image_a = image::open(image_a).unwrap();
    let image_b = image::open(image_b).unwrap();
    let (kps_a, ds_a) = features::extract(&akaze, &image_a, settings.max_features);
    let (kps_b, ds_b) = features::extract(&akaze, &image_b, settings.max_features);
    let matches = features::symmetric_matches(&ds_a, &ds_b);
    let (ca, cb) = geometry::matched_coordinates(&kps_a, &kps_b, &matches);
    (matches.len(), geometry::mean_displacement(&ca, &cb).unwrap())
}

#[test]
fn identical_pair_has_exactly_zero_displacement_and_speed() {
    let _ = pretty_env_logger::try_init_timed();
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::default();
    let view = textured_scene(480, 400);
    let first = dir.path().join("photo1.jpg");
    let second = dir.path().join("photo2.jpg");
    write_jpeg(&first, &view, "2024:02:10 08:30:00");
    write_jpeg(&second, &view, "2024:02:10 08:30:10");

    let (count, mean) = mean_displacement_between(&first, &second, &settings);
    assert!(count > 0, "identical images must produce matches");
    assert_eq!(mean, 0.0);

    let sample = speed::pair_speed(&first, &second, &settings).unwrap();
    assert_eq!(sample, 0.0);
}

#[test]
fn translated_pair_displacement_approximates_the_shift() {
    let _ = pretty_env_logger::try_init_timed();
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::default();
    // hypot(30, 40) = 50 exactly.
    let (view_a, view_b) = translated_views(480, 400, 30, 40);
    let first = dir.path().join("photo1.jpg");
    let second = dir.path().join("photo2.jpg");
    write_jpeg(&first, &view_a, "2024:02:10 08:30:00");
    write_jpeg(&second, &view_b, "2024:02:10 08:30:10");

    let (count, mean) = mean_displacement_between(&first, &second, &settings);
    assert!(count >= 20, "expected a healthy match count, got {count}");
    assert!(
        (mean - 50.0).abs() < 2.0,
        "mean displacement {mean} too far from the 50 px shift"
    );
}

#[test]
fn pair_speed_matches_the_calibration_arithmetic() {
    let _ = pretty_env_logger::try_init_timed();
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::default();
    // 50 px over 10 s at GSD 12648 is 6.324 m and 0.6324 km/s.
    let (view_a, view_b) = translated_views(480, 400, 30, 40);
    let first = dir.path().join("photo1.jpg");
    let second = dir.path().join("photo2.jpg");
    write_jpeg(&first, &view_a, "2024:02:10 08:30:00");
    write_jpeg(&second, &view_b, "2024:02:10 08:30:10");

    let sample = speed::pair_speed(&first, &second, &settings).unwrap();
    assert!(
        (sample - 0.6324).abs() < 0.05,
        "pair speed {sample} too far from 0.6324 km/s"
    );
}

#[test]
fn non_increasing_timestamps_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let view = textured_scene(120, 100);
    let first = dir.path().join("photo1.jpg");
    let second = dir.path().join("photo2.jpg");

    write_jpeg(&first, &view, "2024:02:10 08:30:00");
    write_jpeg(&second, &view, "2024:02:10 08:30:00");
    assert!(matches!(
        timestamp::elapsed_seconds(&first, &second),
        Err(Error::ZeroElapsedTime { .. })
    ));

    write_jpeg(&second, &view, "2024:02:10 08:29:59");
    assert!(matches!(
        timestamp::elapsed_seconds(&first, &second),
        Err(Error::ZeroElapsedTime { .. })
    ));
}

#[test]
fn image_without_metadata_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bare.jpg");
    let mut jpeg = Vec::new();
    DynamicImage::ImageLuma8(textured_scene(120, 100))
        .write_to(&mut Cursor::new(&mut jpeg), ImageOutputFormat::Jpeg(92))
        .unwrap();
    std::fs::write(&path, jpeg).unwrap();
    assert!(matches!(
        timestamp::datetime_original(&path),
        Err(Error::MetadataParse { .. })
    ));
}

#[test]
fn featureless_pair_fails_with_empty_match_set() {
    let _ = pretty_env_logger::try_init_timed();
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::default();
    let flat = GrayImage::from_pixel(200, 200, Luma([128u8]));
    let first = dir.path().join("photo1.jpg");
    let second = dir.path().join("photo2.jpg");
    write_jpeg(&first, &flat, "2024:02:10 08:30:00");
    write_jpeg(&second, &flat, "2024:02:10 08:30:10");

    assert!(matches!(
        speed::pair_speed(&first, &second, &settings),
        Err(Error::EmptyMatchSet)
    ));
}

/// Replays pre-rendered frames in capture order.
struct ScriptedCamera {
    frames: Vec<Vec<u8>>,
    next: usize,
}

impl Camera for ScriptedCamera {
    fn capture(&mut self, path: &Path) -> Result<(), Error> {
        let frame = &self.frames[self.next % self.frames.len()];
        self.next += 1;
        std::fs::write(path, frame)?;
        Ok(())
    }
}

fn batch_settings(dir: &Path) -> Settings {
    Settings {
        batch_size: 3,
        run_duration: Duration::from_millis(1),
        image_prefix: dir.join("photo"),
        result_path: dir.join("result.txt"),
        ..Settings::default()
    }
}

fn scripted_batch() -> ScriptedCamera {
    let scene = textured_scene(480 + 30, 400 + 16);
    let crops: [(u32, u32); 3] = [(0, 0), (15, 8), (30, 16)];
    let times = [
        "2024:02:10 08:30:00",
        "2024:02:10 08:30:10",
        "2024:02:10 08:30:20",
    ];
    let frames = crops
        .iter()
        .zip(times)
        .map(|(&(dx, dy), datetime)| {
            let view = imageops::crop_imm(&scene, dx, dy, 480, 400).to_image();
            jpeg_with_timestamp(&view, datetime)
        })
        .collect();
    ScriptedCamera { frames, next: 0 }
}

#[test]
fn driver_loop_averages_consecutive_pairs_and_writes_the_result() {
    let _ = pretty_env_logger::try_init_timed();
    let dir = tempfile::tempdir().unwrap();
    let settings = batch_settings(dir.path());
    // A stale result from a previous run must be overwritten, not appended to.
    std::fs::write(&settings.result_path, "9.99999").unwrap();
    let mut camera = scripted_batch();

    let overall = driver::run(&mut camera, &settings).unwrap();

    // One batch of 3 images gives pairs (1,2) and (2,3); the captured files
    // are still on disk, so the expected mean can be recomputed directly.
    let pair_one = speed::pair_speed(
        &settings.image_path(1),
        &settings.image_path(2),
        &settings,
    )
    .unwrap();
    let pair_two = speed::pair_speed(
        &settings.image_path(2),
        &settings.image_path(3),
        &settings,
    )
    .unwrap();
    let expected = (pair_one + pair_two) / 2.0;
    assert!((overall - expected).abs() < 1e-9);

    let written = std::fs::read_to_string(&settings.result_path).unwrap();
    assert_eq!(written, format!("{overall:.5}"));
    let reparsed: f64 = written.parse().unwrap();
    assert!((reparsed - overall).abs() < 1e-5);
}

#[test]
fn zero_length_window_completes_no_batches() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        run_duration: Duration::ZERO,
        ..batch_settings(dir.path())
    };
    let mut camera = scripted_batch();

    assert!(matches!(
        driver::run(&mut camera, &settings),
        Err(Error::EmptyResults)
    ));
    // Fail-fast leaves no result file behind.
    assert!(!settings.result_path.exists());
}
