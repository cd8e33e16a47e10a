//! Loading signing credentials from disk.

use crate::types::Credentials;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading or saving credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Credentials file not found: {0}")]
    NotFound(PathBuf),

    #[error("Credentials file {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize credentials: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to access credentials file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Credentials {
    /// Read and parse a credentials JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CredentialError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => CredentialError::NotFound(path.to_path_buf()),
            _ => CredentialError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        serde_json::from_str(&contents).map_err(|source| CredentialError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write credentials as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CredentialError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(CredentialError::Serialize)?;
        fs::write(path, json).map_err(|source| CredentialError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
