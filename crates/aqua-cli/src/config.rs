//! Configuration for the aqua CLI.
//!
//! Values come from built-in defaults, then an optional `aqua.toml`, then
//! command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "aqua.toml";

/// Document name used for inline content without an explicit name.
pub const DEFAULT_DOCUMENT_NAME: &str = "test.txt";

/// Top-level `aqua.toml` layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AquaConfig {
    #[serde(default)]
    pub document: DocumentConfig,

    #[serde(default)]
    pub signing: SigningConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// The document the pipeline notarizes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentConfig {
    /// Defaults to the input file's name, or `test.txt` for inline content
    #[serde(default)]
    pub name: Option<String>,

    /// Inline content, used when `input` is not set
    #[serde(default = "default_document_content")]
    pub content: String,

    /// Read the document from this file instead of inline content
    #[serde(default)]
    pub input: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SigningConfig {
    #[serde(default = "default_credentials_path")]
    pub credentials: PathBuf,

    #[serde(default = "default_signer")]
    pub signer: String,

    #[serde(default)]
    pub interactive: bool,

    /// Skip persistence when signing does not succeed
    #[serde(default)]
    pub require_signature: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    #[serde(default = "default_run_dir")]
    pub run_dir: PathBuf,
}

fn default_document_content() -> String {
    "Hello Aqua".to_string()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("./credentials.json")
}

fn default_signer() -> String {
    "cli".to_string()
}

fn default_run_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            name: None,
            content: default_document_content(),
            input: None,
        }
    }
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            credentials: default_credentials_path(),
            signer: default_signer(),
            interactive: false,
            require_signature: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_dir: default_run_dir(),
        }
    }
}

impl AquaConfig {
    /// Parse a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load `explicit` if given, else `aqua.toml` in `cwd` if present, else defaults.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = cwd.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::load(candidate)
        } else {
            Ok(Self::default())
        }
    }
}

/// Settings the pipeline runner consumes, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Directory receiving the output artifacts
    pub run_dir: PathBuf,
    pub credentials_path: PathBuf,
    pub signer: String,
    pub interactive: bool,
    pub require_signature: bool,
}

impl PipelineConfig {
    /// Resolve relative paths against `base`.
    pub fn resolve(config: &AquaConfig, base: &Path) -> Self {
        Self {
            run_dir: absolutize(&config.output.run_dir, base),
            credentials_path: absolutize(&config.signing.credentials, base),
            signer: config.signing.signer.clone(),
            interactive: config.signing.interactive,
            require_signature: config.signing.require_signature,
        }
    }

    /// Resolve against the process working directory.
    pub fn from_env(config: &AquaConfig) -> Result<Self> {
        let cwd = env::current_dir().context("failed to resolve working directory")?;
        Ok(Self::resolve(config, &cwd))
    }
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
