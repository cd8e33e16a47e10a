//! Aqua revision trees: genesis creation, verification and Ed25519 signing.
//!
//! A document's integrity history is an [`AquaTree`]: content-addressed
//! revisions linked by verification hash, starting at a genesis revision that
//! commits to the document's SHA3-256 content hash.
//!
//! # Example
//!
//! ```
//! use aqua_sdk::{Aquafier, Credentials, FileObject, NativeAquafier};
//!
//! let aqua = NativeAquafier::new();
//! let file = FileObject::new("test.txt", "Hello Aqua", "./");
//!
//! let tree = aqua.create_genesis_revision(&file).unwrap();
//! let tree = aqua.verify_aqua_tree(&tree, &[file.clone()]).unwrap();
//!
//! let creds = Credentials { mnemonic: "example words".to_string(), did_key: None };
//! let signed = aqua.sign_aqua_tree(&tree, "cli", &creds, false).unwrap();
//! assert_eq!(signed.len(), 2);
//! ```

mod aquafier;
mod credentials;
mod signature;
mod tree;
mod types;
mod verify;

pub use aquafier::{Aquafier, NativeAquafier};
pub use credentials::CredentialError;
pub use signature::{
    generate_credentials, public_key_hex, sign_tree, verify_revision_signature, Confirm,
    SignError, StdinConfirm,
};
pub use tree::{
    compute_revision_hash, content_hash, genesis_tree, is_plain_file_name, AquaTreeExt, TreeError,
};
pub use types::{
    AquaTree, Credentials, FileContent, FileObject, Revision, RevisionType, REVISION_VERSION,
};
pub use verify::{verify_tree, VerificationError};
