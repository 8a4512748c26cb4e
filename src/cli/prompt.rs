//! Operator confirmation.

use std::io::Write;

use crate::error::Result;

/// Asks the operator a yes/no question.
#[cfg_attr(test, mockall::automock)]
pub trait Prompt: Send + Sync {
    /// Returns true only for an explicit affirmative answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read.
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Prompt on stderr, answer read from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn confirm(&self, question: &str) -> Result<bool> {
        eprint!("{question} [y/N]: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        Ok(is_affirmative(&input))
    }
}

/// `y` or `yes`, case-insensitive.
#[must_use]
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
