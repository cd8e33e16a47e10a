//! Inspection and key-management commands.

use anyhow::{Context, Result};
use aqua_sdk::{
    generate_credentials, public_key_hex, Aquafier, AquaTree, AquaTreeExt, FileObject,
    NativeAquafier, RevisionType,
};
use colored::Colorize;
use std::path::PathBuf;

/// Handle the `aqua log` command.
pub fn cmd_log(file: PathBuf) -> Result<()> {
    let tree = AquaTree::load(&file)
        .with_context(|| format!("failed to load aqua tree from {}", file.display()))?;

    if tree.is_empty() {
        println!("{}", "Tree is empty".yellow());
        return Ok(());
    }

    let chain = tree.revision_chain().context("revision links are broken")?;

    println!("{}", "Aqua Tree".bold().underline());
    println!("{}: {}", "File".bold(), file.display());
    println!("{}: {}", "Revisions".bold(), tree.len());
    println!("{}: {}", "Latest".bold(), tree.latest);
    println!();

    for (idx, (hash, revision)) in chain.iter().enumerate() {
        println!(
            "{} {} ({})",
            "Revision".bold().cyan(),
            (idx + 1).to_string().cyan(),
            revision.revision_type
        );
        println!("  {}: {}", "Hash".bold(), hash);
        if !revision.is_genesis() {
            println!("  {}: {}", "Previous".bold(), revision.previous_verification_hash);
        }
        println!("  {}: {}", "Timestamp".bold(), revision.local_timestamp);

        match revision.revision_type {
            RevisionType::File => {
                if let Some(name) = tree.file_index.get(*hash) {
                    println!("  {}: {}", "Document".bold(), name);
                }
                if let Some(file_hash) = &revision.file_hash {
                    println!("  {}: {}", "File SHA3".bold(), file_hash);
                }
            }
            RevisionType::Signature => {
                let signer = revision.signer.as_deref().unwrap_or("unknown");
                let sig_preview = revision
                    .signature
                    .as_deref()
                    .map(signature_preview)
                    .unwrap_or_else(|| "none".to_string());
                println!("  {}: {} {}", "Signature".bold(), signer.green(), sig_preview);
            }
        }
        println!();
    }

    Ok(())
}

/// First 20 characters of a signature, with an ellipsis when truncated.
fn signature_preview(sig: &str) -> String {
    let mut chars = sig.chars();
    let head: String = chars.by_ref().take(20).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Handle the `aqua verify` command.
pub fn cmd_verify(tree_file: PathBuf, documents: Vec<PathBuf>) -> Result<()> {
    let tree = AquaTree::load(&tree_file)
        .with_context(|| format!("failed to load aqua tree from {}", tree_file.display()))?;

    let files = documents
        .iter()
        .map(FileObject::read)
        .collect::<Result<Vec<_>>>()?;

    NativeAquafier::new()
        .verify_aqua_tree(&tree, &files)
        .context("aqua tree verification failed")?;

    let signatures = tree
        .revisions
        .values()
        .filter(|revision| revision.revision_type == RevisionType::Signature)
        .count();

    println!("{} Revision chain valid", "✓".green().bold());
    println!("{} {} document(s) match", "✓".green().bold(), files.len());
    if signatures > 0 {
        println!("{} {} signature(s) verified", "✓".green().bold(), signatures);
    }
    println!();
    println!("{}", "Summary:".bold().underline());
    println!("  {}: {}", "Revisions".bold(), tree.len());
    println!("  {}: {}", "Status".bold(), "VALID".green().bold());

    Ok(())
}

/// Handle the `aqua credentials` command.
pub fn cmd_credentials(output: Option<PathBuf>) -> Result<()> {
    let credentials = generate_credentials();
    let public_hex = public_key_hex(&credentials)?;

    if let Some(path) = output {
        if path.exists() {
            anyhow::bail!("{} already exists; refusing to overwrite", path.display());
        }
        credentials
            .save(&path)
            .with_context(|| format!("failed to write credentials to {}", path.display()))?;
        println!("{} Credentials written to {}", "✓".green(), path.display());
        println!("{}: {}", "Public Key".bold().green(), public_hex);
    } else {
        println!("{}", "Generated Signing Credentials".bold().underline());
        println!("{}: {}", "Mnemonic".bold().red(), credentials.mnemonic);
        println!("{}: {}", "Public Key".bold().green(), public_hex);
        println!();
        println!(
            "{}",
            "WARNING: Keep the mnemonic secret!".yellow().bold()
        );
    }

    Ok(())
}
