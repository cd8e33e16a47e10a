//! Revision tree verification.

use crate::signature::verify_revision_signature;
use crate::tree::{compute_revision_hash, content_hash, AquaTreeExt, TreeError};
use crate::types::{AquaTree, FileObject, Revision, RevisionType};
use thiserror::Error;

/// Errors that can occur during tree verification.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Tree is empty")]
    EmptyTree,

    #[error("Broken revision chain: {0}")]
    BrokenChain(String),

    #[error("Revision {0} is not reachable from the latest revision")]
    Unreachable(String),

    #[error("Revision {expected} hashes to {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("Genesis revision {0} does not commit to an indexed file")]
    GenesisNotFile(String),

    #[error("Revision {0} has no file entry in the file index")]
    UnindexedFile(String),

    #[error("File {0} was not supplied for verification")]
    MissingFile(String),

    #[error("Content of {name} does not match revision {revision}")]
    ContentMismatch { name: String, revision: String },

    #[error("Revision {0} is missing its file hash")]
    MissingFileHash(String),

    #[error("Revision {0} signature failed verification")]
    InvalidSignature(String),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Verify `tree` against the documents in `files`.
///
/// Checks link structure, every revision's verification hash, file content
/// for file revisions and signatures for signature revisions.
pub fn verify_tree(tree: &AquaTree, files: &[FileObject]) -> Result<(), VerificationError> {
    if tree.is_empty() {
        return Err(VerificationError::EmptyTree);
    }

    let chain = tree
        .revision_chain()
        .map_err(|err| VerificationError::BrokenChain(err.to_string()))?;

    if chain.len() != tree.len() {
        let unreachable = tree
            .revisions
            .keys()
            .find(|key| !chain.iter().any(|(hash, _)| *hash == key.as_str()))
            .cloned()
            .unwrap_or_default();
        return Err(VerificationError::Unreachable(unreachable));
    }

    let (genesis_hash, genesis) = chain[0];
    if genesis.revision_type != RevisionType::File || !tree.file_index.contains_key(genesis_hash)
    {
        return Err(VerificationError::GenesisNotFile(genesis_hash.to_string()));
    }

    for (hash, revision) in &chain {
        let actual = compute_revision_hash(revision)?;
        if actual != *hash {
            return Err(VerificationError::HashMismatch {
                expected: hash.to_string(),
                actual,
            });
        }

        match revision.revision_type {
            RevisionType::File => verify_file_revision(tree, hash, revision, files)?,
            RevisionType::Signature => {
                if !verify_revision_signature(revision) {
                    return Err(VerificationError::InvalidSignature(hash.to_string()));
                }
            }
        }
    }

    Ok(())
}

fn verify_file_revision(
    tree: &AquaTree,
    hash: &str,
    revision: &Revision,
    files: &[FileObject],
) -> Result<(), VerificationError> {
    let name = tree
        .file_index
        .get(hash)
        .ok_or_else(|| VerificationError::UnindexedFile(hash.to_string()))?;

    let file = files
        .iter()
        .find(|file| &file.name == name)
        .ok_or_else(|| VerificationError::MissingFile(name.clone()))?;

    let expected = revision
        .file_hash
        .as_deref()
        .ok_or_else(|| VerificationError::MissingFileHash(hash.to_string()))?;

    if content_hash(file.content.as_bytes()) != expected {
        return Err(VerificationError::ContentMismatch {
            name: name.clone(),
            revision: hash.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::sign_tree;
    use crate::tree::genesis_tree;
    use crate::types::Credentials;

    fn file() -> FileObject {
        FileObject::new("test.txt", "Hello Aqua", "./")
    }

    fn creds() -> Credentials {
        Credentials {
            mnemonic: "verify test words".to_string(),
            did_key: None,
        }
    }

    #[test]
    fn test_verify_genesis_round_trip() {
        let tree = genesis_tree(&file()).unwrap();
        assert!(verify_tree(&tree, &[file()]).is_ok());
    }

    #[test]
    fn test_verify_empty_tree() {
        assert!(matches!(
            verify_tree(&AquaTree::new(), &[file()]),
            Err(VerificationError::EmptyTree)
        ));
    }

    #[test]
    fn test_verify_detects_tampered_content() {
        let tree = genesis_tree(&file()).unwrap();
        let tampered = FileObject::new("test.txt", "Hello Aqua!", "./");
        assert!(matches!(
            verify_tree(&tree, &[tampered]),
            Err(VerificationError::ContentMismatch { .. })
        ));
    }

    #[test]
    fn test_verify_missing_file() {
        let tree = genesis_tree(&file()).unwrap();
        let other = FileObject::new("other.txt", "Hello Aqua", "./");
        assert!(matches!(
            verify_tree(&tree, &[other]),
            Err(VerificationError::MissingFile(_))
        ));
    }

    #[test]
    fn test_verify_detects_edited_revision() {
        let mut tree = genesis_tree(&file()).unwrap();
        let hash = tree.latest.clone();
        tree.revisions.get_mut(&hash).unwrap().local_timestamp = "19700101000000".to_string();
        assert!(matches!(
            verify_tree(&tree, &[file()]),
            Err(VerificationError::HashMismatch { .. })
        ));
    }

    #[test]
    fn test_verify_signed_tree() {
        let tree = genesis_tree(&file()).unwrap();
        let signed = sign_tree(&tree, "cli", &creds(), None).unwrap();
        assert!(verify_tree(&signed, &[file()]).is_ok());
    }

    #[test]
    fn test_verify_forged_signature() {
        let tree = genesis_tree(&file()).unwrap();
        let signed = sign_tree(&tree, "cli", &creds(), None).unwrap();

        // Re-key the signature revision so its hash stays consistent but the
        // signature no longer matches the public key.
        let mut forged = tree.clone();
        let mut revision = signed.latest_revision().unwrap().clone();
        revision.signature = Some(format!("ed25519:{}", "11".repeat(64)));
        let forged_hash = compute_revision_hash(&revision).unwrap();
        forged.revisions.insert(forged_hash.clone(), revision);
        forged.latest = forged_hash;

        assert!(matches!(
            verify_tree(&forged, &[file()]),
            Err(VerificationError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_verify_dangling_revision() {
        let mut tree = genesis_tree(&file()).unwrap();
        let signed = sign_tree(&tree, "cli", &creds(), None).unwrap();
        let (hash, revision) = signed
            .revisions
            .iter()
            .find(|(hash, _)| **hash == signed.latest)
            .map(|(hash, revision)| (hash.clone(), revision.clone()))
            .unwrap();
        // Present but not linked from `latest`
        tree.revisions.insert(hash, revision);
        assert!(matches!(
            verify_tree(&tree, &[file()]),
            Err(VerificationError::Unreachable(_))
        ));
    }

    #[test]
    fn test_verify_rejects_signature_only_tree() {
        let signed = sign_tree(&genesis_tree(&file()).unwrap(), "cli", &creds(), None).unwrap();

        // A lone signature revision over "" that never commits to any content
        let mut revision = signed.latest_revision().unwrap().clone();
        revision.previous_verification_hash = String::new();
        let key = crate::signature::signing_key(&creds()).unwrap();
        revision.signature = Some(format!(
            "ed25519:{}",
            hex::encode(ed25519_dalek::Signer::sign(&key, b"").to_bytes())
        ));
        assert!(verify_revision_signature(&revision));

        let hash = compute_revision_hash(&revision).unwrap();
        let mut forged = AquaTree::new();
        forged.revisions.insert(hash.clone(), revision);
        forged.latest = hash;

        let unrelated = FileObject::new("test.txt", "totally different content", "./");
        assert!(matches!(
            verify_tree(&forged, &[unrelated]),
            Err(VerificationError::GenesisNotFile(_))
        ));
    }

    #[test]
    fn test_verify_rejects_unindexed_genesis() {
        let mut tree = genesis_tree(&file()).unwrap();
        tree.file_index.clear();
        assert!(matches!(
            verify_tree(&tree, &[file()]),
            Err(VerificationError::GenesisNotFile(_))
        ));
    }

    #[test]
    fn test_verify_broken_link() {
        let mut tree = genesis_tree(&file()).unwrap();
        tree.latest = "0xmissing".to_string();
        assert!(matches!(
            verify_tree(&tree, &[file()]),
            Err(VerificationError::BrokenChain(_))
        ));
    }
}
