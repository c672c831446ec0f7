//! edgeprov interface
//!
//! - cli: clap commands, tracing setup, dispatch
//! - prompt: terminal confirmation for datacenter reuse

pub mod cli;
pub mod prompt;


pub use cli::{CliError, run_cli};
pub use prompt::StdinConfirm;
