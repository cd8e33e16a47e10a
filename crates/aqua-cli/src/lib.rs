//! Aqua CLI library components.
//!
//! Exposes the pipeline runner, persistence and configuration so they can be
//! driven from tests.

pub mod commands;
pub mod config;
pub mod persist;
pub mod pipeline;

pub use config::{AquaConfig, PipelineConfig};
pub use persist::{persist, Artifacts, PersistError};
pub use pipeline::{PipelineRunner, RunReport, RunState, SignOutcome, Stage};
