//! The SDK entry point consumed by callers.

use crate::signature::{sign_tree, Confirm, SignError, StdinConfirm};
use crate::tree::{genesis_tree, TreeError};
use crate::types::{AquaTree, Credentials, FileObject};
use crate::verify::{verify_tree, VerificationError};
use tracing::debug;

/// Operations a caller can run against a document's revision tree.
///
/// Every operation returns a fresh tree on success and never mutates its
/// input.
pub trait Aquafier {
    /// Create the first revision of `file`.
    fn create_genesis_revision(&self, file: &FileObject) -> Result<AquaTree, TreeError>;

    /// Validate `tree` against the supplied documents.
    fn verify_aqua_tree(
        &self,
        tree: &AquaTree,
        files: &[FileObject],
    ) -> Result<AquaTree, VerificationError>;

    /// Attest `tree` as `signer`.
    ///
    /// When `interactive` is set, the operator is asked to confirm first.
    fn sign_aqua_tree(
        &self,
        tree: &AquaTree,
        signer: &str,
        credentials: &Credentials,
        interactive: bool,
    ) -> Result<AquaTree, SignError>;
}

/// In-process implementation backed by SHA3-256 and Ed25519.
pub struct NativeAquafier {
    confirm: Box<dyn Confirm>,
}

impl NativeAquafier {
    pub fn new() -> Self {
        Self {
            confirm: Box::new(StdinConfirm),
        }
    }

    /// Use a custom confirmation source for interactive signing.
    pub fn with_confirm(confirm: Box<dyn Confirm>) -> Self {
        Self { confirm }
    }
}

impl Default for NativeAquafier {
    fn default() -> Self {
        Self::new()
    }
}

impl Aquafier for NativeAquafier {
    fn create_genesis_revision(&self, file: &FileObject) -> Result<AquaTree, TreeError> {
        let tree = genesis_tree(file)?;
        debug!(file = %file.name, revision = %tree.latest, "genesis revision created");
        Ok(tree)
    }

    fn verify_aqua_tree(
        &self,
        tree: &AquaTree,
        files: &[FileObject],
    ) -> Result<AquaTree, VerificationError> {
        verify_tree(tree, files)?;
        debug!(revisions = tree.len(), latest = %tree.latest, "tree verified");
        Ok(tree.clone())
    }

    fn sign_aqua_tree(
        &self,
        tree: &AquaTree,
        signer: &str,
        credentials: &Credentials,
        interactive: bool,
    ) -> Result<AquaTree, SignError> {
        let confirm = interactive.then_some(self.confirm.as_ref());
        let signed = sign_tree(tree, signer, credentials, confirm)?;
        debug!(%signer, revision = %signed.latest, "tree signed");
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Never;

    impl Confirm for Never {
        fn confirm(&self, _prompt: &str) -> bool {
            false
        }
    }

    fn creds() -> Credentials {
        Credentials {
            mnemonic: "native aquafier".to_string(),
            did_key: None,
        }
    }

    #[test]
    fn test_genesis_verify_sign_verify() {
        let aqua = NativeAquafier::new();
        let file = FileObject::new("test.txt", "Hello Aqua", "./");

        let genesis = aqua.create_genesis_revision(&file).unwrap();
        let verified = aqua
            .verify_aqua_tree(&genesis, std::slice::from_ref(&file))
            .unwrap();
        assert_eq!(verified, genesis);

        let signed = aqua.sign_aqua_tree(&verified, "cli", &creds(), false).unwrap();
        assert_eq!(signed.len(), 2);
        assert!(aqua.verify_aqua_tree(&signed, &[file]).is_ok());
    }

    #[test]
    fn test_non_interactive_skips_prompt() {
        let aqua = NativeAquafier::with_confirm(Box::new(Never));
        let file = FileObject::new("test.txt", "Hello Aqua", "./");
        let genesis = aqua.create_genesis_revision(&file).unwrap();

        assert!(aqua.sign_aqua_tree(&genesis, "cli", &creds(), false).is_ok());
        assert!(matches!(
            aqua.sign_aqua_tree(&genesis, "cli", &creds(), true),
            Err(SignError::Declined(_))
        ));
    }
}
