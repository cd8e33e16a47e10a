//! Ed25519 signing of revision trees.

use crate::tree::{timestamp_now, AquaTreeExt, TreeError};
use crate::types::{AquaTree, Credentials, Revision, RevisionType, REVISION_VERSION};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use sha3::{Digest, Sha3_256};
use std::io::{self, BufRead, Write};
use thiserror::Error;

pub const SIGNATURE_TYPE: &str = "ed25519";

/// Errors that can occur while signing a tree.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("Cannot sign an empty tree")]
    EmptyTree,

    #[error("Credentials carry an empty mnemonic")]
    EmptyMnemonic,

    #[error("Signer label cannot be empty")]
    EmptySigner,

    #[error("Signing of {0} declined by operator")]
    Declined(String),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Asks the operator to approve a signature.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Confirmation read from stdin; only "y" or "yes" approve.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

/// Derive the signing key for a set of credentials.
pub fn signing_key(credentials: &Credentials) -> Result<SigningKey, SignError> {
    let mnemonic = credentials.mnemonic.trim();
    if mnemonic.is_empty() {
        return Err(SignError::EmptyMnemonic);
    }
    let mut hasher = Sha3_256::new();
    hasher.update(mnemonic.as_bytes());
    let seed: [u8; 32] = hasher.finalize().into();
    Ok(SigningKey::from_bytes(&seed))
}

/// Hex-encoded public key for a set of credentials.
pub fn public_key_hex(credentials: &Credentials) -> Result<String, SignError> {
    Ok(hex::encode(signing_key(credentials)?.verifying_key().to_bytes()))
}

/// Generate fresh credentials with a random 32-byte secret.
pub fn generate_credentials() -> Credentials {
    let mut secret = [0u8; 32];
    rand::rng().fill_bytes(&mut secret);
    Credentials {
        mnemonic: hex::encode(secret),
        did_key: None,
    }
}

/// Append a signature revision over the tree's latest verification hash.
///
/// Returns a new tree; `tree` is left untouched.
pub fn sign_tree(
    tree: &AquaTree,
    signer: &str,
    credentials: &Credentials,
    confirm: Option<&dyn Confirm>,
) -> Result<AquaTree, SignError> {
    if tree.is_empty() {
        return Err(SignError::EmptyTree);
    }
    if signer.trim().is_empty() {
        return Err(SignError::EmptySigner);
    }
    let key = signing_key(credentials)?;

    if let Some(confirm) = confirm {
        let prompt = format!("Sign revision {} as {signer}?", tree.latest);
        if !confirm.confirm(&prompt) {
            return Err(SignError::Declined(tree.latest.clone()));
        }
    }

    let signature = key.sign(tree.latest.as_bytes());
    let revision = Revision {
        previous_verification_hash: tree.latest.clone(),
        local_timestamp: timestamp_now(),
        revision_type: RevisionType::Signature,
        version: REVISION_VERSION.to_string(),
        file_hash: None,
        file_nonce: None,
        signature: Some(format!(
            "{SIGNATURE_TYPE}:{}",
            hex::encode(signature.to_bytes())
        )),
        signature_public_key: Some(hex::encode(key.verifying_key().to_bytes())),
        signer: Some(signer.to_string()),
        signature_type: Some(SIGNATURE_TYPE.to_string()),
    };

    let mut signed = tree.clone();
    signed.append(revision)?;
    Ok(signed)
}

/// Verify the signature carried by a signature revision.
///
/// Returns `false` for anything malformed.
pub fn verify_revision_signature(revision: &Revision) -> bool {
    let (Some(sig), Some(public_key)) = (&revision.signature, &revision.signature_public_key)
    else {
        return false;
    };

    let sig_hex = match sig.strip_prefix("ed25519:") {
        Some(hex_str) => hex_str,
        None => return false,
    };

    let sig_bytes = match hex::decode(sig_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let Ok(sig_array) = <[u8; 64]>::try_from(sig_bytes.as_slice()) else {
        return false;
    };

    let key_bytes = match hex::decode(public_key) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let Ok(key_array) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
        return false;
    };

    let verifying_key = match VerifyingKey::from_bytes(&key_array) {
        Ok(key) => key,
        Err(_) => return false,
    };

    let signature = ed25519_dalek::Signature::from_bytes(&sig_array);
    verifying_key
        .verify(revision.previous_verification_hash.as_bytes(), &signature)
        .is_ok()
}
