//! Revision tree operations: hashing, genesis creation and linking.

use crate::types::{AquaTree, FileObject, Revision, RevisionType, REVISION_VERSION};
use chrono::Utc;
use rand::RngCore;
use sha3::{Digest, Sha3_256};
use std::path::{Component, Path};
use thiserror::Error;

/// Errors that can occur while building a tree.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Invalid revision: {0}")]
    InvalidRevision(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// SHA3-256 of raw content, hex encoded.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Compute the verification hash of a revision.
pub fn compute_revision_hash(revision: &Revision) -> Result<String, TreeError> {
    let json = serde_json::to_string(revision)?;
    Ok(format!("0x{}", content_hash(json.as_bytes())))
}

/// True when `name` is exactly one normal path component.
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

pub(crate) fn timestamp_now() -> String {
    Utc::now().format("%Y%m%d%H%M%S").to_string()
}

fn random_nonce() -> String {
    let mut nonce = [0u8; 32];
    rand::rng().fill_bytes(&mut nonce);
    hex::encode(nonce)
}

/// Build a one-revision tree for `file`.
pub fn genesis_tree(file: &FileObject) -> Result<AquaTree, TreeError> {
    if file.name.is_empty() {
        return Err(TreeError::InvalidFile("file name cannot be empty".to_string()));
    }
    if !is_plain_file_name(&file.name) {
        return Err(TreeError::InvalidFile(format!(
            "{} is not a plain file name",
            file.name
        )));
    }
    if file.content.is_empty() {
        return Err(TreeError::InvalidFile(format!(
            "{} has no content",
            file.name
        )));
    }

    let revision = Revision {
        previous_verification_hash: String::new(),
        local_timestamp: timestamp_now(),
        revision_type: RevisionType::File,
        version: REVISION_VERSION.to_string(),
        file_hash: Some(content_hash(file.content.as_bytes())),
        file_nonce: Some(random_nonce()),
        signature: None,
        signature_public_key: None,
        signer: None,
        signature_type: None,
    };

    let mut tree = AquaTree::new();
    let hash = tree.append(revision)?;
    tree.file_index.insert(hash, file.name.clone());
    Ok(tree)
}

/// Extension trait for AquaTree with linking operations.
pub trait AquaTreeExt {
    /// Append a revision on top of `latest`.
    ///
    /// Overwrites `previous_verification_hash` with the current tip and
    /// returns the new revision's verification hash.
    fn append(&mut self, revision: Revision) -> Result<String, TreeError>;

    /// Revisions ordered from genesis to `latest`.
    fn revision_chain(&self) -> Result<Vec<(&str, &Revision)>, TreeError>;

    /// Verification hash of the genesis revision.
    fn genesis_hash(&self) -> Option<&str>;
}

impl AquaTreeExt for AquaTree {
    fn append(&mut self, mut revision: Revision) -> Result<String, TreeError> {
        if revision.version.is_empty() {
            return Err(TreeError::InvalidRevision(
                "version cannot be empty".to_string(),
            ));
        }

        revision.previous_verification_hash = self.latest.clone();
        let hash = compute_revision_hash(&revision)?;
        if self.revisions.contains_key(&hash) {
            return Err(TreeError::InvalidRevision(format!(
                "revision {hash} already present"
            )));
        }

        self.revisions.insert(hash.clone(), revision);
        self.latest = hash.clone();
        Ok(hash)
    }

    fn revision_chain(&self) -> Result<Vec<(&str, &Revision)>, TreeError> {
        let mut chain = Vec::with_capacity(self.revisions.len());
        let mut cursor = self.latest.as_str();

        while !cursor.is_empty() {
            if chain.len() >= self.revisions.len() {
                return Err(TreeError::InvalidRevision(
                    "revision links form a cycle".to_string(),
                ));
            }
            let (key, revision) = self.revisions.get_key_value(cursor).ok_or_else(|| {
                TreeError::InvalidRevision(format!("missing revision {cursor}"))
            })?;
            chain.push((key.as_str(), revision));
            cursor = revision.previous_verification_hash.as_str();
        }

        chain.reverse();
        Ok(chain)
    }

    fn genesis_hash(&self) -> Option<&str> {
        self.revision_chain()
            .ok()
            .and_then(|chain| chain.first().map(|(hash, _)| *hash))
    }
}
