//! Tooling & Integration Layer
//!
//! Command-line front end for the provisioning core.

pub mod cli;

pub use cli::{AgentCommands, Cli, CliContext, Commands, ConfigCommands};
