use std::path::PathBuf;

use thiserror::Error;

/// Failures reading local capture metadata. All of them abort the run.
#[derive(Error, Debug)]
pub enum LocalError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed {tag} value {value:?} in {path}")]
    MalformedTag {
        path: PathBuf,
        tag: &'static str,
        value: String,
    },
}

impl LocalError {
    pub fn malformed(path: &std::path::Path, tag: &'static str, value: &str) -> Self {
        Self::MalformedTag {
            path: path.to_path_buf(),
            tag,
            value: value.to_string(),
        }
    }
}
