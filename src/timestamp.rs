//! Capture-time extraction from embedded image metadata.
//!
//! Every capture carries an EXIF `DateTimeOriginal` field in the
//! `YYYY:MM:DD HH:MM:SS` format. The elapsed time between two captures is the
//! whole-second difference of the two parsed values and must be strictly
//! positive, since it ends up as a divisor.

use crate::Error;
use chrono::NaiveDateTime;
use exif::{In, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// EXIF `DateTimeOriginal` layout.
pub const DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

fn metadata_error(path: &Path, reason: impl ToString) -> Error {
    Error::MetadataParse {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Parse a `DateTimeOriginal` value such as `2023:04:17 10:15:32`.
pub fn parse_datetime(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
}

/// Read the capture time embedded in the image at `path`.
pub fn datetime_original(path: &Path) -> Result<NaiveDateTime, Error> {
    let file = File::open(path)?;
    let metadata = exif::Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .map_err(|e| metadata_error(path, e))?;
    let field = metadata
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .ok_or_else(|| metadata_error(path, "missing DateTimeOriginal field"))?;
    let raw = match field.value {
        Value::Ascii(ref lines) if !lines.is_empty() => String::from_utf8_lossy(&lines[0]),
        _ => return Err(metadata_error(path, "DateTimeOriginal is not an ASCII value")),
    };
    // ASCII values may keep their NUL terminator.
    let text = raw.trim_end_matches('\0').trim();
    parse_datetime(text).map_err(|e| metadata_error(path, format!("{e} in {text:?}")))
}

/// Whole seconds elapsed between the captures at `earlier` and `later`.
///
/// The second capture must be strictly later than the first; equal or reversed
/// timestamps yield [`Error::ZeroElapsedTime`] rather than a zero divisor.
pub fn elapsed_seconds(earlier: &Path, later: &Path) -> Result<u64, Error> {
    let earlier_time = datetime_original(earlier)?;
    let later_time = datetime_original(later)?;
    let seconds = later_time.signed_duration_since(earlier_time).num_seconds();
    if seconds <= 0 {
        return Err(Error::ZeroElapsedTime {
            earlier: earlier_time,
            later: later_time,
        });
    }
    Ok(seconds as u64)
}
