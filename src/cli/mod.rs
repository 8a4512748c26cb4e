//! CLI module for the Kargo deployment helper.
//!
//! This module provides the command-line interface, output formatting and
//! the operator confirmation prompt.

mod commands;
mod output;
mod prompt;

pub use commands::{Cli, Commands, DeployArgs, OutputFormat};
pub use output::OutputFormatter;
pub use prompt::{Prompt, StdinPrompt, is_affirmative};

#[cfg(test)]
pub(crate) use prompt::MockPrompt;
