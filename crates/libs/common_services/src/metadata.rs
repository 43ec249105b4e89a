//! EXIF metadata extraction for capture time, GPS position and camera info.
//!
//! Metadata is best-effort: images without EXIF (or with broken EXIF) yield
//! an empty [`MediaMetadata`], never an error, so analysis of a photo does
//! not fail over missing camera tags.

use chrono::{DateTime, NaiveDate, Utc};
use exif::{Exif, In, Tag, Value};
use std::io::Cursor;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaMetadata {
    pub taken_at: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
}

#[must_use]
pub fn extract_metadata(image: &[u8]) -> MediaMetadata {
    let mut cursor = Cursor::new(image);
    let exif = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(e) => {
            debug!("No EXIF metadata: {e}");
            return MediaMetadata::default();
        }
    };

    let taken_at = datetime_field(&exif, Tag::DateTimeOriginal)
        .or_else(|| datetime_field(&exif, Tag::DateTime));

    let (latitude, longitude) = gps_position(&exif);

    MediaMetadata {
        taken_at,
        latitude,
        longitude,
        camera_make: ascii_field(&exif, Tag::Make),
        camera_model: ascii_field(&exif, Tag::Model),
    }
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    if let Value::Ascii(ref lines) = field.value {
        let text = lines
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_owned())?;
        if text.is_empty() { None } else { Some(text) }
    } else {
        None
    }
}

fn datetime_field(exif: &Exif, tag: Tag) -> Option<DateTime<Utc>> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Ascii(ref lines) = field.value else {
        return None;
    };
    let parsed = exif::DateTime::from_ascii(lines.first()?).ok()?;
    // EXIF timestamps carry no timezone; treat them as UTC.
    NaiveDate::from_ymd_opt(
        i32::from(parsed.year),
        u32::from(parsed.month),
        u32::from(parsed.day),
    )?
    .and_hms_opt(
        u32::from(parsed.hour),
        u32::from(parsed.minute),
        u32::from(parsed.second),
    )
    .map(|naive| naive.and_utc())
}

fn gps_position(exif: &Exif) -> (Option<f64>, Option<f64>) {
    let latitude = dms_field(exif, Tag::GPSLatitude)
        .map(|deg| apply_hemisphere(deg, ascii_field(exif, Tag::GPSLatitudeRef), "S"));
    let longitude = dms_field(exif, Tag::GPSLongitude)
        .map(|deg| apply_hemisphere(deg, ascii_field(exif, Tag::GPSLongitudeRef), "W"));

    // A coordinate is only meaningful as a pair.
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => (Some(lat), Some(lon)),
        _ => (None, None),
    }
}

fn dms_field(exif: &Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Rational(ref parts) = field.value else {
        return None;
    };
    dms_to_degrees(
        parts.first()?.to_f64(),
        parts.get(1)?.to_f64(),
        parts.get(2)?.to_f64(),
    )
}

fn dms_to_degrees(degrees: f64, minutes: f64, seconds: f64) -> Option<f64> {
    let value = degrees + minutes / 60.0 + seconds / 3600.0;
    value.is_finite().then_some(value)
}

fn apply_hemisphere(degrees: f64, reference: Option<String>, negative_ref: &str) -> f64 {
    if reference.as_deref() == Some(negative_ref) {
        -degrees
    } else {
        degrees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_image_bytes_yield_empty_metadata() {
        assert_eq!(extract_metadata(b"definitely not a jpeg"), MediaMetadata::default());
    }

    #[test]
    fn empty_input_yields_empty_metadata() {
        assert_eq!(extract_metadata(&[]), MediaMetadata::default());
    }

    #[test]
    fn dms_conversion() {
        let deg = dms_to_degrees(52.0, 30.0, 0.0).unwrap();
        assert!((deg - 52.5).abs() < 1e-9);
    }

    #[test]
    fn southern_hemisphere_is_negative() {
        let lat = apply_hemisphere(33.85, Some("S".to_owned()), "S");
        assert!(lat < 0.0);
        let lon = apply_hemisphere(151.2, Some("E".to_owned()), "W");
        assert!(lon > 0.0);
    }
}
