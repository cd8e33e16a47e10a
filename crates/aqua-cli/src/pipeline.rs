//! Genesis → verify → sign → persist orchestration.
//!
//! Stages run strictly in order. Genesis and verification failures end the
//! run immediately. Credential and signing failures are logged and the
//! verified tree is persisted unsigned, unless `require_signature` is set.
//! Persistence failures are classified and logged. None of these failures
//! escape as errors: the outcome is described by the returned [`RunReport`].

use crate::config::PipelineConfig;
use crate::persist::{persist, Artifacts, PersistError};
use aqua_sdk::{Aquafier, AquaTree, Credentials, FileObject};
use std::fmt;
use tracing::{error, info, warn};

/// A step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Genesis,
    Verify,
    LoadCredentials,
    Sign,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Genesis => "genesis",
            Stage::Verify => "verify",
            Stage::LoadCredentials => "load-credentials",
            Stage::Sign => "sign",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Done,
    Failed(Stage),
}

/// What happened to the signing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    /// An earlier stage halted the run.
    NotAttempted,
    /// Credentials could not be loaded, so signing was skipped.
    CredentialsUnavailable(String),
    Failed(String),
    Signed,
}

/// Observable result of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Stages that executed, in order.
    pub visited: Vec<Stage>,
    pub state: RunState,
    pub sign: SignOutcome,
    pub artifacts: Option<Artifacts>,
    /// The last tree the pipeline produced.
    pub tree: Option<AquaTree>,
    /// Description of the failure that ended the run.
    pub error: Option<String>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            visited: Vec::new(),
            state: RunState::Done,
            sign: SignOutcome::NotAttempted,
            artifacts: None,
            tree: None,
            error: None,
        }
    }

    pub fn ran(&self, stage: Stage) -> bool {
        self.visited.contains(&stage)
    }

    pub fn is_done(&self) -> bool {
        self.state == RunState::Done
    }

    fn enter(&mut self, stage: Stage) {
        info!(%stage, "stage started");
        self.visited.push(stage);
    }

    fn fail(mut self, stage: Stage, message: String) -> Self {
        self.state = RunState::Failed(stage);
        self.error = Some(message);
        self
    }
}

/// Runs the pipeline for one document against an [`Aquafier`].
pub struct PipelineRunner<'a, A: Aquafier + ?Sized> {
    aqua: &'a A,
    config: &'a PipelineConfig,
}

impl<'a, A: Aquafier + ?Sized> PipelineRunner<'a, A> {
    pub fn new(aqua: &'a A, config: &'a PipelineConfig) -> Self {
        Self { aqua, config }
    }

    pub fn run(&self, file: &FileObject) -> RunReport {
        let mut report = RunReport::new();

        report.enter(Stage::Genesis);
        let genesis = match self.aqua.create_genesis_revision(file) {
            Ok(tree) => tree,
            Err(err) => {
                error!(file = %file.name, error = %err, "genesis creation failed");
                return report.fail(Stage::Genesis, format!("genesis creation failed: {err}"));
            }
        };
        info!(file = %file.name, revision = %genesis.latest, "genesis created");
        report.tree = Some(genesis.clone());

        report.enter(Stage::Verify);
        let verified = match self
            .aqua
            .verify_aqua_tree(&genesis, std::slice::from_ref(file))
        {
            Ok(tree) => tree,
            Err(err) => {
                error!(file = %file.name, error = %err, "verification failed");
                return report.fail(Stage::Verify, format!("verification failed: {err}"));
            }
        };
        info!(revisions = verified.len(), "verified");
        report.tree = Some(verified.clone());

        let tree = match self.sign(&verified, &mut report) {
            Ok(signed) => signed,
            Err(stage) if self.config.require_signature => {
                let message = match &report.sign {
                    SignOutcome::CredentialsUnavailable(msg) | SignOutcome::Failed(msg) => {
                        msg.clone()
                    }
                    _ => "signing did not complete".to_string(),
                };
                warn!(%stage, "signature required; skipping persistence");
                return report.fail(stage, message);
            }
            Err(_) => verified,
        };
        report.tree = Some(tree.clone());

        report.enter(Stage::Persist);
        match persist(&tree, file, &self.config.run_dir) {
            Ok(artifacts) => {
                info!(
                    tree = %artifacts.tree_path.display(),
                    document = %artifacts.document_path.display(),
                    "artifacts written"
                );
                report.artifacts = Some(artifacts);
            }
            Err(err) => {
                match &err {
                    PersistError::MissingDirectory(path) => {
                        error!(path = %path.display(), "output directory does not exist")
                    }
                    PersistError::PermissionDenied(path) => {
                        error!(path = %path.display(), "permission denied writing artifact")
                    }
                    PersistError::NotADirectory(path) => {
                        error!(path = %path.display(), "output path is not a directory")
                    }
                    other => error!(error = %other, "failed to write artifacts"),
                }
                return report.fail(Stage::Persist, err.to_string());
            }
        }

        info!("pipeline complete");
        report
    }

    /// Load credentials and sign. On failure, returns the stage that failed.
    fn sign(&self, tree: &AquaTree, report: &mut RunReport) -> Result<AquaTree, Stage> {
        report.enter(Stage::LoadCredentials);
        let credentials = match Credentials::load(&self.config.credentials_path) {
            Ok(credentials) => credentials,
            Err(err) => {
                warn!(error = %err, "credentials unavailable; skipping signing");
                report.sign = SignOutcome::CredentialsUnavailable(err.to_string());
                return Err(Stage::LoadCredentials);
            }
        };

        report.enter(Stage::Sign);
        match self.aqua.sign_aqua_tree(
            tree,
            &self.config.signer,
            &credentials,
            self.config.interactive,
        ) {
            Ok(signed) => {
                info!(signer = %self.config.signer, revision = %signed.latest, "signed");
                report.sign = SignOutcome::Signed;
                Ok(signed)
            }
            Err(err) => {
                error!(signer = %self.config.signer, error = %err, "signing failed");
                report.sign = SignOutcome::Failed(err.to_string());
                Err(Stage::Sign)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqua_sdk::{genesis_tree, verify_tree, SignError, TreeError, VerificationError};
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Scripted backend that records which operations were called.
    #[derive(Default)]
    struct ScriptedAquafier {
        fail_genesis: bool,
        fail_verify: bool,
        fail_sign: bool,
        calls: RefCell<Vec<&'static str>>,
    }

    impl Aquafier for ScriptedAquafier {
        fn create_genesis_revision(&self, file: &FileObject) -> Result<AquaTree, TreeError> {
            self.calls.borrow_mut().push("genesis");
            if self.fail_genesis {
                return Err(TreeError::InvalidFile("scripted".to_string()));
            }
            genesis_tree(file)
        }

        fn verify_aqua_tree(
            &self,
            tree: &AquaTree,
            files: &[FileObject],
        ) -> Result<AquaTree, VerificationError> {
            self.calls.borrow_mut().push("verify");
            if self.fail_verify {
                return Err(VerificationError::EmptyTree);
            }
            verify_tree(tree, files)?;
            Ok(tree.clone())
        }

        fn sign_aqua_tree(
            &self,
            tree: &AquaTree,
            signer: &str,
            credentials: &Credentials,
            _interactive: bool,
        ) -> Result<AquaTree, SignError> {
            self.calls.borrow_mut().push("sign");
            if self.fail_sign {
                return Err(SignError::Declined(tree.latest.clone()));
            }
            aqua_sdk::sign_tree(tree, signer, credentials, None)
        }
    }

    fn config(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            run_dir: dir.to_path_buf(),
            credentials_path: dir.join("credentials.json"),
            signer: "cli".to_string(),
            interactive: false,
            require_signature: false,
        }
    }

    fn write_credentials(dir: &Path) {
        fs::write(dir.join("credentials.json"), r#"{"mnemonic": "pipeline test"}"#).unwrap();
    }

    fn file() -> FileObject {
        FileObject::new("test.txt", "Hello Aqua", "./")
    }

    #[test]
    fn test_full_run() {
        let dir = TempDir::new().unwrap();
        write_credentials(dir.path());
        let aqua = ScriptedAquafier::default();
        let config = config(dir.path());

        let report = PipelineRunner::new(&aqua, &config).run(&file());

        assert!(report.is_done());
        assert_eq!(
            report.visited,
            vec![
                Stage::Genesis,
                Stage::Verify,
                Stage::LoadCredentials,
                Stage::Sign,
                Stage::Persist
            ]
        );
        assert_eq!(report.sign, SignOutcome::Signed);
        assert_eq!(*aqua.calls.borrow(), vec!["genesis", "verify", "sign"]);
        assert_eq!(report.tree.as_ref().unwrap().len(), 2);
        assert!(report.artifacts.is_some());
    }

    #[test]
    fn test_genesis_failure_short_circuits() {
        let dir = TempDir::new().unwrap();
        write_credentials(dir.path());
        let aqua = ScriptedAquafier {
            fail_genesis: true,
            ..Default::default()
        };
        let config = config(dir.path());

        let report = PipelineRunner::new(&aqua, &config).run(&file());

        assert_eq!(report.state, RunState::Failed(Stage::Genesis));
        assert_eq!(report.visited, vec![Stage::Genesis]);
        assert_eq!(*aqua.calls.borrow(), vec!["genesis"]);
        assert_eq!(report.sign, SignOutcome::NotAttempted);
        assert!(report.error.unwrap().contains("genesis creation failed"));
        assert!(!dir.path().join("test.txt.aqua.json").exists());
    }

    #[test]
    fn test_verify_failure_never_reads_credentials() {
        let dir = TempDir::new().unwrap();
        // Corrupt credentials would surface as CredentialsUnavailable if read.
        fs::write(dir.path().join("credentials.json"), "not json").unwrap();
        let aqua = ScriptedAquafier {
            fail_verify: true,
            ..Default::default()
        };
        let config = config(dir.path());

        let report = PipelineRunner::new(&aqua, &config).run(&file());

        assert_eq!(report.state, RunState::Failed(Stage::Verify));
        assert!(!report.ran(Stage::LoadCredentials));
        assert!(!report.ran(Stage::Sign));
        assert!(!report.ran(Stage::Persist));
        assert_eq!(report.sign, SignOutcome::NotAttempted);
        assert!(report.error.unwrap().contains("verification failed"));
    }

    #[test]
    fn test_missing_credentials_skips_signing() {
        let dir = TempDir::new().unwrap();
        let aqua = ScriptedAquafier::default();
        let config = config(dir.path());

        let report = PipelineRunner::new(&aqua, &config).run(&file());

        assert!(report.is_done());
        assert!(report.ran(Stage::LoadCredentials));
        assert!(!report.ran(Stage::Sign));
        assert!(matches!(report.sign, SignOutcome::CredentialsUnavailable(_)));
        assert!(!aqua.calls.borrow().contains(&"sign"));
        // The verified, unsigned tree is persisted
        assert_eq!(report.tree.as_ref().unwrap().len(), 1);
        assert!(dir.path().join("test.txt.aqua.json").exists());
    }

    #[test]
    fn test_sign_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        write_credentials(dir.path());
        let aqua = ScriptedAquafier {
            fail_sign: true,
            ..Default::default()
        };
        let config = config(dir.path());

        let report = PipelineRunner::new(&aqua, &config).run(&file());

        assert!(report.is_done());
        assert!(matches!(report.sign, SignOutcome::Failed(_)));
        assert!(report.ran(Stage::Persist));
    }

    #[test]
    fn test_required_signature_halts_before_persist() {
        let dir = TempDir::new().unwrap();
        write_credentials(dir.path());
        let aqua = ScriptedAquafier {
            fail_sign: true,
            ..Default::default()
        };
        let mut config = config(dir.path());
        config.require_signature = true;

        let report = PipelineRunner::new(&aqua, &config).run(&file());

        assert_eq!(report.state, RunState::Failed(Stage::Sign));
        assert!(!report.ran(Stage::Persist));
        assert!(!dir.path().join("test.txt").exists());
    }

    #[test]
    fn test_required_signature_without_credentials() {
        let dir = TempDir::new().unwrap();
        let aqua = ScriptedAquafier::default();
        let mut config = config(dir.path());
        config.require_signature = true;

        let report = PipelineRunner::new(&aqua, &config).run(&file());

        assert_eq!(report.state, RunState::Failed(Stage::LoadCredentials));
        assert!(!report.ran(Stage::Sign));
        assert!(!report.ran(Stage::Persist));
        assert!(!aqua.calls.borrow().contains(&"sign"));
        assert!(matches!(report.sign, SignOutcome::CredentialsUnavailable(_)));
    }

    #[test]
    fn test_persist_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        write_credentials(dir.path());
        let aqua = ScriptedAquafier::default();
        let mut config = config(dir.path());
        config.run_dir = dir.path().join("missing");

        let report = PipelineRunner::new(&aqua, &config).run(&file());

        assert_eq!(report.state, RunState::Failed(Stage::Persist));
        assert_eq!(report.sign, SignOutcome::Signed);
        assert!(report.error.unwrap().contains("does not exist"));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::LoadCredentials.to_string(), "load-credentials");
        assert_eq!(Stage::Persist.to_string(), "persist");
    }
}
