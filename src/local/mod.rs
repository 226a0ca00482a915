//! Local ground truth: walk the given paths, read capture tags, and build a
//! map from file stem to the capture time those tags describe.

pub mod error;
pub mod exif;

pub use error::LocalError;
pub use exif::{CaptureTags, ExifMetadataReader, MetadataReader};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use walkdir::WalkDir;

use crate::timestamp::{parse_offset, Timestamp, Zone};

/// Extensions (lowercase) of files that may carry capture tags.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "rw2", "mp4", "mov", "heic", "tiff", "avif", "3gp", "avi", "webp", "webm",
    "m4v", "m4a",
];

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// The capture time one local file vouches for.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRecord {
    /// File name without extension; matched against Immich original file names.
    pub key: String,
    pub timestamp: Timestamp,
    /// Whether the file carried its own UTC offset tag.
    pub has_offset: bool,
    pub path: PathBuf,
}

/// Records by match key. Built once, read-only afterwards.
#[derive(Debug, Default)]
pub struct LocalRecordMap {
    records: HashMap<String, LocalRecord>,
    files_read: usize,
}

impl LocalRecordMap {
    /// Insert a record; a later file with the same key replaces the earlier one.
    pub fn insert(&mut self, record: LocalRecord) {
        self.files_read += 1;
        if let Some(previous) = self.records.get(&record.key) {
            tracing::warn!(
                key = %record.key,
                "{} replaces {} ({} vs {})",
                record.path.display(),
                previous.path.display(),
                record.timestamp,
                previous.timestamp
            );
        }
        self.records.insert(record.key.clone(), record);
    }

    pub fn get(&self, key: &str) -> Option<&LocalRecord> {
        self.records.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Distinct keys.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Files that produced a record, including ones later replaced.
    pub fn files_read(&self) -> usize {
        self.files_read
    }
}

/// Expand paths into regular files: files are kept as given, directories
/// are walked recursively in file-name order.
pub fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.exists() {
            tracing::warn!("Path {} does not exist, skipping", path.display());
            continue;
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", path.display(), e)
                }
            }
        }
    }
    files
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read every supported file, in order, into a record map.
///
/// `reference` supplies the zone (and any missing time fields) for capture
/// times without an offset tag; pass [`Timestamp::now`] in the override zone.
pub fn build_local_records(
    files: &[PathBuf],
    reference: &Timestamp,
    reader: &dyn MetadataReader,
) -> Result<LocalRecordMap, LocalError> {
    let mut map = LocalRecordMap::default();
    for path in files {
        if let Some(record) = read_local_record(path, reference, reader)? {
            map.insert(record);
        }
    }
    Ok(map)
}

/// Derive the record for one file, or `None` when the file is skipped.
pub fn read_local_record(
    path: &Path,
    reference: &Timestamp,
    reader: &dyn MetadataReader,
) -> Result<Option<LocalRecord>, LocalError> {
    if !is_supported(path) {
        tracing::debug!("Skipping unsupported file type: {}", path.display());
        return Ok(None);
    }
    let Some(tags) = reader.read_capture_tags(path)? else {
        tracing::warn!("No metadata found for {}", path.display());
        return Ok(None);
    };
    let Some(raw) = tags.date_time_original.as_deref() else {
        tracing::info!("No date/time metadata found for {}", path.display());
        return Ok(None);
    };

    let mut reference = *reference;
    let offset = tags.offset_time_original.as_deref();
    if let Some(raw_offset) = offset {
        let offset = parse_offset(raw_offset)
            .ok_or_else(|| LocalError::malformed(path, "OffsetTimeOriginal", raw_offset))?;
        reference = reference.convert_to(Zone::Fixed(offset));
    }

    let captured = parse_capture_time(raw, &reference)
        .ok_or_else(|| LocalError::malformed(path, "DateTimeOriginal", raw))?;
    let subsec = tags.sub_sec_time_original.as_deref().unwrap_or("000");
    let micros = subsec_micros(subsec)
        .ok_or_else(|| LocalError::malformed(path, "SubSecTimeOriginal", subsec))?;
    let timestamp = captured.map_wall_clock(|w| w + TimeDelta::microseconds(micros));

    let key = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let record = LocalRecord {
        key,
        timestamp,
        has_offset: offset.is_some(),
        path: path.to_path_buf(),
    };
    tracing::debug!(
        "Read date {} from {}{}",
        record.timestamp,
        path.display(),
        if record.has_offset { " (offset tag)" } else { "" }
    );
    Ok(Some(record))
}

/// Parse an EXIF `YYYY:MM:DD HH:MM:SS` string under the zone of `reference`.
///
/// The first two colons are the date separators; turning them into dashes
/// is what tells the date apart from the time. A bare date takes its time of
/// day from `reference`.
pub(crate) fn parse_capture_time(raw: &str, reference: &Timestamp) -> Option<Timestamp> {
    let normalized = raw.trim().replacen(':', "-", 2);
    let wall = DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(reference.wall_clock().time()))
        })?;
    Some(match reference.zone() {
        Some(zone) => Timestamp::zoned(wall, zone),
        None => Timestamp::Naive(wall),
    })
}

/// Right-pad the fraction digits to six and read them as microseconds.
pub(crate) fn subsec_micros(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padded = format!("{raw:0<6}");
    padded[..6].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use std::cell::RefCell;

    fn wall(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn tags(dt: Option<&str>, subsec: Option<&str>, offset: Option<&str>) -> CaptureTags {
        CaptureTags {
            date_time_original: dt.map(str::to_string),
            sub_sec_time_original: subsec.map(str::to_string),
            offset_time_original: offset.map(str::to_string),
        }
    }

    /// Answers from a fixed table keyed by file name and records every call.
    #[derive(Default)]
    struct FakeReader {
        answers: HashMap<String, Option<CaptureTags>>,
        calls: RefCell<Vec<PathBuf>>,
    }

    impl FakeReader {
        fn with(mut self, name: &str, answer: Option<CaptureTags>) -> Self {
            self.answers.insert(name.to_string(), answer);
            self
        }
    }

    impl MetadataReader for FakeReader {
        fn read_capture_tags(&self, path: &Path) -> Result<Option<CaptureTags>, LocalError> {
            self.calls.borrow_mut().push(path.to_path_buf());
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            match self.answers.get(&name) {
                Some(answer) => Ok(answer.clone()),
                None => Err(LocalError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::other("unreadable"),
                }),
            }
        }
    }

    fn naive_reference() -> Timestamp {
        Timestamp::Naive(wall(2025, 1, 10, 9, 15, 0))
    }

    #[test]
    fn test_parse_capture_time_naive() {
        let ts = parse_capture_time("2023:06:01 14:30:00", &naive_reference()).unwrap();
        assert_eq!(ts, Timestamp::Naive(wall(2023, 6, 1, 14, 30, 0)));
    }

    #[test]
    fn test_parse_capture_time_takes_reference_zone() {
        let zone = Zone::resolve("Europe/Berlin").unwrap();
        let reference = naive_reference().relabel(zone);
        let ts = parse_capture_time("2023:06:01 14:30:00", &reference).unwrap();
        assert_eq!(ts, Timestamp::zoned(wall(2023, 6, 1, 14, 30, 0), zone));
    }

    #[test]
    fn test_parse_capture_time_date_only_uses_reference_time() {
        let ts = parse_capture_time("2023:06:01", &naive_reference()).unwrap();
        assert_eq!(ts.wall_clock(), wall(2023, 6, 1, 9, 15, 0));
    }

    #[test]
    fn test_parse_capture_time_rejects_garbage() {
        assert!(parse_capture_time("    :  :     :  :  ", &naive_reference()).is_none());
        assert!(parse_capture_time("yesterday", &naive_reference()).is_none());
    }

    #[test]
    fn test_subsec_micros_padding() {
        assert_eq!(subsec_micros("000"), Some(0));
        assert_eq!(subsec_micros("5"), Some(500_000));
        assert_eq!(subsec_micros("12"), Some(120_000));
        assert_eq!(subsec_micros("1234567"), Some(123_456));
        assert_eq!(subsec_micros("1a"), None);
        assert_eq!(subsec_micros(""), None);
    }

    #[test]
    fn test_is_supported_case_insensitive() {
        assert!(is_supported(Path::new("IMG_0001.JPG")));
        assert!(is_supported(Path::new("clip.m4v")));
        assert!(is_supported(Path::new("dir/P1000123.RW2")));
        assert!(!is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("IMG_0001.JPG.xmp")));
        assert!(!is_supported(Path::new("README")));
    }

    #[test]
    fn test_record_with_offset_and_subsec() {
        let reader = FakeReader::default().with(
            "IMG_0001.JPG",
            Some(tags(Some("2023:06:01 14:30:00"), Some("25"), Some("+02:00"))),
        );
        let record = read_local_record(Path::new("IMG_0001.JPG"), &naive_reference(), &reader)
            .unwrap()
            .unwrap();
        assert_eq!(record.key, "IMG_0001");
        assert!(record.has_offset);
        assert_eq!(
            record.timestamp,
            Timestamp::zoned(
                wall(2023, 6, 1, 14, 30, 0) + TimeDelta::microseconds(250_000),
                Zone::Fixed(FixedOffset::east_opt(7200).unwrap())
            )
        );
        assert_eq!(
            record.timestamp.to_iso8601(),
            "2023-06-01T14:30:00.250000+02:00"
        );
    }

    #[test]
    fn test_record_without_offset_inherits_reference_zone() {
        let zone = Zone::resolve("America/New_York").unwrap();
        let reader = FakeReader::default().with(
            "P1000123.RW2",
            Some(tags(Some("2023:01:01 10:00:00"), None, None)),
        );
        let reference = naive_reference().relabel(zone);
        let record = read_local_record(Path::new("P1000123.RW2"), &reference, &reader)
            .unwrap()
            .unwrap();
        assert!(!record.has_offset);
        assert_eq!(record.timestamp.to_iso8601(), "2023-01-01T10:00:00-05:00");
    }

    #[test]
    fn test_unsupported_extension_skipped_without_reading() {
        let reader = FakeReader::default();
        let result =
            read_local_record(Path::new("notes.txt"), &naive_reference(), &reader).unwrap();
        assert!(result.is_none());
        assert!(reader.calls.borrow().is_empty());
    }

    #[test]
    fn test_missing_capture_time_skipped() {
        let reader = FakeReader::default()
            .with("a.jpg", None)
            .with("b.jpg", Some(tags(None, Some("12"), Some("+01:00"))));
        assert!(read_local_record(Path::new("a.jpg"), &naive_reference(), &reader)
            .unwrap()
            .is_none());
        assert!(read_local_record(Path::new("b.jpg"), &naive_reference(), &reader)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_malformed_tags_are_fatal() {
        let reader = FakeReader::default()
            .with("bad_date.jpg", Some(tags(Some("not a date"), None, None)))
            .with(
                "bad_offset.jpg",
                Some(tags(Some("2023:06:01 14:30:00"), None, Some("two hours"))),
            )
            .with(
                "bad_subsec.jpg",
                Some(tags(Some("2023:06:01 14:30:00"), Some("x1"), None)),
            );
        for name in ["bad_date.jpg", "bad_offset.jpg", "bad_subsec.jpg"] {
            let err = read_local_record(Path::new(name), &naive_reference(), &reader).unwrap_err();
            assert!(matches!(err, LocalError::MalformedTag { .. }), "{name}");
        }
    }

    #[test]
    fn test_read_error_aborts_build() {
        let reader = FakeReader::default().with(
            "a.jpg",
            Some(tags(Some("2023:06:01 14:30:00"), None, None)),
        );
        let files = vec![PathBuf::from("a.jpg"), PathBuf::from("unreadable.jpg")];
        let err = build_local_records(&files, &naive_reference(), &reader).unwrap_err();
        assert!(matches!(err, LocalError::Io { .. }));
    }

    #[test]
    fn test_last_file_wins_on_key_collision() {
        let reader = FakeReader::default()
            .with("IMG_0001.JPG", Some(tags(Some("2023:06:01 14:30:00"), None, None)))
            .with("IMG_0001.HEIC", Some(tags(Some("2024:02:02 08:00:00"), None, None)));
        let files = vec![PathBuf::from("IMG_0001.JPG"), PathBuf::from("IMG_0001.HEIC")];
        let map = build_local_records(&files, &naive_reference(), &reader).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.files_read(), 2);
        let record = map.get("IMG_0001").unwrap();
        assert_eq!(record.path, PathBuf::from("IMG_0001.HEIC"));
        assert_eq!(record.timestamp, Timestamp::Naive(wall(2024, 2, 2, 8, 0, 0)));
    }

    #[test]
    fn test_expand_paths_sorted_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("b_sub")).unwrap();
        std::fs::write(root.join("c.jpg"), b"").unwrap();
        std::fs::write(root.join("a.jpg"), b"").unwrap();
        std::fs::write(root.join("b_sub").join("z.mov"), b"").unwrap();
        let single = root.join("a.jpg");

        let files = expand_paths(&[root.to_path_buf(), single.clone(), root.join("missing")]);
        assert_eq!(
            files,
            vec![
                root.join("a.jpg"),
                root.join("b_sub").join("z.mov"),
                root.join("c.jpg"),
                single,
            ]
        );
    }

    #[test]
    fn test_build_from_directory_orders_collisions_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("2023")).unwrap();
        std::fs::create_dir_all(root.join("2024")).unwrap();
        std::fs::write(root.join("2023").join("DSC_1.jpg"), b"").unwrap();
        std::fs::write(root.join("2024").join("DSC_1.jpg"), b"").unwrap();

        struct ByParent;
        impl MetadataReader for ByParent {
            fn read_capture_tags(&self, path: &Path) -> Result<Option<CaptureTags>, LocalError> {
                let year = path
                    .parent()
                    .unwrap()
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned();
                Ok(Some(tags(Some(&format!("{year}:01:01 00:00:00")), None, None)))
            }
        }

        let files = expand_paths(&[root.to_path_buf()]);
        let map = build_local_records(&files, &naive_reference(), &ByParent).unwrap();
        assert_eq!(
            map.get("DSC_1").unwrap().timestamp,
            Timestamp::Naive(wall(2024, 1, 1, 0, 0, 0))
        );
    }
}
