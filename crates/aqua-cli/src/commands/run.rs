//! The `aqua run` command.

use crate::config::{AquaConfig, PipelineConfig, DEFAULT_DOCUMENT_NAME};
use crate::pipeline::{PipelineRunner, RunReport, RunState, SignOutcome};
use anyhow::Result;
use aqua_sdk::{FileObject, NativeAquafier};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

/// Flags that override `aqua.toml` for a single run.
#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Document name used for output artifacts
    #[arg(long)]
    pub name: Option<String>,

    /// Inline document content
    #[arg(long, conflicts_with = "input")]
    pub content: Option<String>,

    /// Read the document from a file
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Path to the credentials JSON file
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Signer label recorded in the signature revision
    #[arg(long)]
    pub signer: Option<String>,

    /// Ask for confirmation before signing
    #[arg(long)]
    pub interactive: bool,

    /// Directory receiving the output artifacts
    #[arg(long)]
    pub run_dir: Option<PathBuf>,

    /// Skip persistence unless the tree was signed
    #[arg(long)]
    pub require_signature: bool,
}

impl RunArgs {
    /// Layer these flags over `config`.
    pub fn apply(&self, config: &mut AquaConfig) {
        if let Some(name) = &self.name {
            config.document.name = Some(name.clone());
        }
        if let Some(content) = &self.content {
            config.document.content = content.clone();
            config.document.input = None;
        }
        if let Some(input) = &self.input {
            config.document.input = Some(input.clone());
        }
        if let Some(credentials) = &self.credentials {
            config.signing.credentials = credentials.clone();
        }
        if let Some(signer) = &self.signer {
            config.signing.signer = signer.clone();
        }
        if self.interactive {
            config.signing.interactive = true;
        }
        if let Some(run_dir) = &self.run_dir {
            config.output.run_dir = run_dir.clone();
        }
        if self.require_signature {
            config.signing.require_signature = true;
        }
    }
}

/// Build the document record described by `config`.
pub fn document(config: &AquaConfig) -> Result<FileObject> {
    match &config.document.input {
        Some(path) => {
            let mut file = FileObject::read(path)?;
            if let Some(name) = &config.document.name {
                file.name = name.clone();
            }
            Ok(file)
        }
        None => Ok(FileObject::new(
            config
                .document
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_DOCUMENT_NAME.to_string()),
            config.document.content.clone(),
            "./",
        )),
    }
}

/// Handle the `aqua run` command.
pub fn cmd_run(config: &AquaConfig) -> Result<RunReport> {
    let pipeline_config = PipelineConfig::from_env(config)?;
    let file = document(config)?;
    let aqua = NativeAquafier::new();

    let report = PipelineRunner::new(&aqua, &pipeline_config).run(&file);
    print_report(&report);
    Ok(report)
}

fn print_report(report: &RunReport) {
    if let Some(tree) = &report.tree {
        println!("{}: {}", "Latest Revision".bold(), tree.latest);
        println!("{}: {}", "Revisions".bold(), tree.len());
    }

    match &report.sign {
        SignOutcome::Signed => println!("{} Tree signed", "✓".green().bold()),
        SignOutcome::CredentialsUnavailable(reason) => {
            println!("{} Signing skipped: {reason}", "!".yellow().bold())
        }
        SignOutcome::Failed(reason) => {
            println!("{} Signing failed: {reason}", "✗".red().bold())
        }
        SignOutcome::NotAttempted => {}
    }

    if let Some(artifacts) = &report.artifacts {
        println!(
            "{} Wrote {}",
            "✓".green().bold(),
            artifacts.tree_path.display()
        );
        println!(
            "{} Wrote {}",
            "✓".green().bold(),
            artifacts.document_path.display()
        );
    }

    println!();
    match report.state {
        RunState::Done => println!("{}: {}", "Status".bold(), "DONE".green().bold()),
        RunState::Failed(stage) => {
            println!(
                "{}: {} ({stage})",
                "Status".bold(),
                "FAILED".red().bold()
            );
            if let Some(error) = &report.error {
                println!("  {error}");
            }
        }
    }
}
