use std::path::Path;

use super::error::LocalError;

/// Raw capture tags as stored in the file, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureTags {
    /// `YYYY:MM:DD HH:MM:SS`, no zone.
    pub date_time_original: Option<String>,
    /// Fractional seconds digits, e.g. `"12"` for .12 s.
    pub sub_sec_time_original: Option<String>,
    /// Offset from UTC at capture, e.g. `"+02:00"`.
    pub offset_time_original: Option<String>,
}

/// Source of capture tags for a local file.
pub trait MetadataReader {
    /// Returns `Ok(None)` when the file carries no readable metadata at all,
    /// and `Err` only when the file itself cannot be read.
    fn read_capture_tags(&self, path: &Path) -> Result<Option<CaptureTags>, LocalError>;
}

/// Reads the EXIF block of the file with `kamadak-exif`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifMetadataReader;

impl MetadataReader for ExifMetadataReader {
    fn read_capture_tags(&self, path: &Path) -> Result<Option<CaptureTags>, LocalError> {
        let io_err = |source| LocalError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = std::fs::File::open(path).map_err(io_err)?;
        let mut bufreader = std::io::BufReader::new(&file);

        match exif::Reader::new().read_from_container(&mut bufreader) {
            Ok(data) => Ok(Some(CaptureTags {
                date_time_original: ascii_field(&data, exif::Tag::DateTimeOriginal),
                sub_sec_time_original: ascii_field(&data, exif::Tag::SubSecTimeOriginal),
                offset_time_original: ascii_field(&data, exif::Tag::OffsetTimeOriginal),
            })),
            Err(exif::Error::Io(source)) => Err(io_err(source)),
            Err(e) => {
                tracing::debug!("No EXIF data in {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }
}

/// The raw ASCII value of a primary-image tag, with NUL padding stripped.
fn ascii_field(data: &exif::Exif, tag: exif::Tag) -> Option<String> {
    let field = data.get_field(tag, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Ascii(parts) => parts
            .first()
            .map(|bytes| {
                String::from_utf8_lossy(bytes)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string()
            })
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ExifMetadataReader
            .read_capture_tags(Path::new("/nonexistent/dir/IMG_0001.JPG"))
            .unwrap_err();
        assert!(matches!(err, LocalError::Io { .. }));
    }

    #[test]
    fn test_file_without_exif_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        assert_eq!(ExifMetadataReader.read_capture_tags(&path).unwrap(), None);
    }
}
