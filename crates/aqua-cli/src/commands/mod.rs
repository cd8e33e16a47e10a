pub mod run;
pub mod tree;

pub use run::{cmd_run, RunArgs};
pub use tree::{cmd_credentials, cmd_log, cmd_verify};
