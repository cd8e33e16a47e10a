//! Aqua data structures.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Protocol version tag stamped on every revision this crate produces.
pub const REVISION_VERSION: &str = "https://aqua-protocol.org/docs/v3/schema_2 | SHA3-256 | Method: scalar";

/// Document content, either text or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Bytes(Vec<u8>),
}

impl FileContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Text(text) => text.as_bytes(),
            FileContent::Bytes(bytes) => bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl From<&str> for FileContent {
    fn from(value: &str) -> Self {
        FileContent::Text(value.to_string())
    }
}

impl From<String> for FileContent {
    fn from(value: String) -> Self {
        FileContent::Text(value)
    }
}

impl From<Vec<u8>> for FileContent {
    fn from(value: Vec<u8>) -> Self {
        FileContent::Bytes(value)
    }
}

/// The input document handed to the SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileObject {
    /// File name, also used to name output artifacts (e.g. "test.txt")
    pub name: String,
    pub content: FileContent,
    /// Directory the document nominally lives in
    pub path: String,
}

impl FileObject {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<FileContent>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            path: path.into(),
        }
    }

    /// Read a document from disk. The record name is the path's file name.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", path.display()))?;
        let bytes =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let content = match String::from_utf8(bytes) {
            Ok(text) => FileContent::Text(text),
            Err(err) => FileContent::Bytes(err.into_bytes()),
        };
        let dir = path
            .parent()
            .map(|dir| dir.display().to_string())
            .filter(|dir| !dir.is_empty())
            .unwrap_or_else(|| "./".to_string());
        Ok(Self::new(name, content, dir))
    }
}

/// Kind of a revision in the tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RevisionType {
    File,
    Signature,
}

impl fmt::Display for RevisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionType::File => f.write_str("file"),
            RevisionType::Signature => f.write_str("signature"),
        }
    }
}

/// A single revision.
///
/// The verification hash of a revision is computed over its compact JSON
/// form, so field order here is part of the hashing contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Revision {
    /// Verification hash of the parent revision, empty for genesis
    pub previous_verification_hash: String,

    /// UTC timestamp, `YYYYMMDDHHMMSS`
    pub local_timestamp: String,

    pub revision_type: RevisionType,

    pub version: String,

    /// SHA3-256 of the document content (file revisions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,

    /// Random salt so identical documents yield distinct genesis hashes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_nonce: Option<String>,

    /// "ed25519:<hex>" over the previous verification hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_public_key: Option<String>,

    /// Label of the signer (e.g. "cli")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_type: Option<String>,
}

impl Revision {
    pub fn is_genesis(&self) -> bool {
        self.previous_verification_hash.is_empty()
    }
}

/// A revision tree for one document.
///
/// Revisions are keyed by their verification hash and linked through
/// `previous_verification_hash`; `latest` names the tip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AquaTree {
    pub revisions: BTreeMap<String, Revision>,

    /// Genesis verification hash -> document name
    #[serde(default)]
    pub file_index: BTreeMap<String, String>,

    /// Verification hash of the most recent revision
    pub latest: String,
}

impl AquaTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Get the most recent revision.
    pub fn latest_revision(&self) -> Option<&Revision> {
        self.revisions.get(&self.latest)
    }

    /// Load a tree from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).context("failed to read aqua tree file")?;
        let tree: Self = serde_json::from_str(&content).context("failed to parse aqua tree JSON")?;
        Ok(tree)
    }

    /// Save a tree as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = self.to_pretty_json().context("failed to serialize aqua tree")?;
        fs::write(path.as_ref(), json).context("failed to write aqua tree file")?;
        Ok(())
    }

    /// Pretty JSON form used for persisted artifacts.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Signing credentials.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    /// Secret phrase the signing key is derived from
    pub mnemonic: String,

    #[serde(default, rename = "did:key", skip_serializing_if = "Option::is_none")]
    pub did_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("mnemonic", &"<redacted>")
            .field("did_key", &self.did_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
