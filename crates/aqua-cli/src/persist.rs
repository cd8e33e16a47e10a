//! Writing pipeline artifacts to the run directory.

use aqua_sdk::{is_plain_file_name, AquaTree, FileObject};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix appended to the document name for the serialized tree.
pub const TREE_SUFFIX: &str = ".aqua.json";

/// Errors that can occur while persisting artifacts.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Output directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    #[error("Output path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Document name {0:?} is not a plain file name")]
    InvalidName(String),

    #[error("Permission denied writing {0}")]
    PermissionDenied(PathBuf),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize tree: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PersistError {
    /// Classify an I/O failure on `path`.
    pub fn classify(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => {
                PersistError::MissingDirectory(path.parent().unwrap_or(path).to_path_buf())
            }
            io::ErrorKind::PermissionDenied => PersistError::PermissionDenied(path.to_path_buf()),
            _ => PersistError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Paths of the two artifacts written by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub tree_path: PathBuf,
    pub document_path: PathBuf,
}

impl Artifacts {
    pub fn for_file(file: &FileObject, out_dir: &Path) -> Self {
        Self {
            tree_path: out_dir.join(format!("{}{TREE_SUFFIX}", file.name)),
            document_path: out_dir.join(&file.name),
        }
    }
}

/// Write `<name>.aqua.json` and `<name>` into `out_dir`.
///
/// Either both artifacts are written or neither is left behind.
pub fn persist(
    tree: &AquaTree,
    file: &FileObject,
    out_dir: &Path,
) -> Result<Artifacts, PersistError> {
    if !is_plain_file_name(&file.name) {
        return Err(PersistError::InvalidName(file.name.clone()));
    }
    if !out_dir.exists() {
        return Err(PersistError::MissingDirectory(out_dir.to_path_buf()));
    }
    if !out_dir.is_dir() {
        return Err(PersistError::NotADirectory(out_dir.to_path_buf()));
    }

    let artifacts = Artifacts::for_file(file, out_dir);
    let json = tree.to_pretty_json()?;

    write_artifact(&artifacts.tree_path, json.as_bytes())?;
    if let Err(err) = write_artifact(&artifacts.document_path, file.content.as_bytes()) {
        let _ = fs::remove_file(&artifacts.tree_path);
        return Err(err);
    }

    Ok(artifacts)
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    fs::write(path, bytes).map_err(|source| PersistError::classify(path, source))
}
