//! External process invocation.
//!
//! Every program the deployment touches goes through [`CommandRunner`] so the
//! sequencer can be driven by a mock in tests. Calls block until the child
//! exits; there is no timeout.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{KargoError, Result};
use crate::planner::RunnerCommand;

/// How the child's standard input is wired.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StdinMode {
    /// No input.
    #[default]
    Null,
    /// Share the operator's terminal.
    Inherit,
    /// Write the given text, then close.
    Piped(String),
}

/// A fully described process launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program and arguments.
    pub command: RunnerCommand,
    /// Extra environment variables for the child.
    pub env: Vec<(String, String)>,
    /// Standard input wiring.
    pub stdin: StdinMode,
    /// Stream stdout to the terminal instead of capturing it.
    pub stream_stdout: bool,
}

/// Outcome of an external process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code, `-1` when the child was killed by a signal.
    pub exit_code: i32,
    /// Captured standard output (empty when streamed).
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Trait for executing external commands (allows mocking in tests).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the invocation to completion.
    ///
    /// A nonzero exit is not an error here; only a failure to launch is.
    async fn run(&self, invocation: &Invocation) -> Result<CommandResult>;
}

/// Runner that spawns real processes.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

impl Invocation {
    /// Creates an invocation with captured output and no input.
    #[must_use]
    pub const fn new(command: RunnerCommand) -> Self {
        Self {
            command,
            env: Vec::new(),
            stdin: StdinMode::Null,
            stream_stdout: false,
        }
    }

    /// Adds environment variables.
    #[must_use]
    pub fn with_env<I>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.env.extend(env);
        self
    }

    /// Sets the stdin mode.
    #[must_use]
    pub fn with_stdin(mut self, stdin: StdinMode) -> Self {
        self.stdin = stdin;
        self
    }

    /// Streams stdout to the terminal.
    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.stream_stdout = true;
        self
    }

    /// Program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.command.program
    }

    /// Argument list.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.command.args
    }
}

impl CommandResult {
    /// Returns true if the process exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Error detail for logs: stderr, or stdout when stderr is empty.
    #[must_use]
    pub fn error_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

impl From<std::process::Output> for CommandResult {
    fn from(output: std::process::Output) -> Self {
        Self {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandResult> {
        let mut cmd = Command::new(invocation.program());
        cmd.args(invocation.args())
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stderr(Stdio::piped())
            .stdout(if invocation.stream_stdout {
                Stdio::inherit()
            } else {
                Stdio::piped()
            })
            .stdin(match invocation.stdin {
                StdinMode::Null => Stdio::null(),
                StdinMode::Inherit => Stdio::inherit(),
                StdinMode::Piped(_) => Stdio::piped(),
            });

        debug!(command = %invocation.command, "Spawning process");

        let mut child = cmd.spawn().map_err(|e| {
            KargoError::internal(format!("failed to execute {}: {e}", invocation.program()))
        })?;

        if let StdinMode::Piped(input) = &invocation.stdin
            && let Some(mut stdin) = child.stdin.take()
        {
            let payload = format!("{input}\n");
            if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                debug!("Child closed stdin early: {e}");
            }
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        let result = CommandResult::from(output);

        debug!(
            program = invocation.program(),
            exit_code = result.exit_code,
            "Process exited"
        );

        Ok(result)
    }
}
