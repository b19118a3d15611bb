use chrono::{NaiveDate, NaiveDateTime};
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::Path;

/// Read the EXIF block from an image file. `None` when the file has no EXIF
/// or cannot be parsed as an image container.
pub fn read_exif(path: &Path) -> Option<Exif> {
    let file = File::open(path).ok()?;
    read_exif_from(&mut BufReader::new(file))
}

pub fn read_exif_from<R: BufRead + Seek>(reader: &mut R) -> Option<Exif> {
    Reader::new().read_from_container(reader).ok()
}

/// Capture time from `DateTimeOriginal`.
/// EXIF datetimes have no timezone info - they are local time as-is.
pub fn capture_time(exif: &Exif) -> Option<NaiveDateTime> {
    let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(parts) => {
            let raw = parts.first()?;
            parse_exif_datetime(std::str::from_utf8(raw).ok()?)
        }
        _ => None,
    }
}

/// Pixel dimensions recorded by the camera, if any.
pub fn pixel_dimensions(exif: &Exif) -> Option<(u32, u32)> {
    let width = exif
        .get_field(Tag::PixelXDimension, In::PRIMARY)?
        .value
        .get_uint(0)?;
    let height = exif
        .get_field(Tag::PixelYDimension, In::PRIMARY)?
        .value
        .get_uint(0)?;
    Some((width, height))
}

/// Parse `YYYY:MM:DD HH:MM:SS`. Some cameras write `-`, `/` or `.` between
/// the date fields; a bare date resolves to midnight.
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let cleaned = s
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .replace(&['-', '/', '\\', '.'][..], ":");

    if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, "%Y:%m:%d %H:%M:%S") {
        return Some(dt);
    }

    let date_part = cleaned.split(' ').next()?;
    NaiveDate::parse_from_str(date_part, "%Y:%m:%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
}
