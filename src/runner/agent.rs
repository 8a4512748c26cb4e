//! SSH agent lifecycle.
//!
//! The agent is started once per run and its `KEY=VALUE` startup output is
//! kept as an explicit [`AgentEnvironment`] that is handed to every later
//! child process. The returned [`CredentialAgentHandle`] terminates the agent
//! exactly once, either through [`CredentialAgentHandle::release`] or on drop.

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

use crate::error::{DeployError, KargoError, Result};
use crate::planner::RunnerCommand;

use super::process::{CommandRunner, Invocation, StdinMode};

/// Program starting the agent.
pub const SSH_AGENT_BIN: &str = "ssh-agent";

/// Program managing agent identities.
pub const SSH_ADD_BIN: &str = "ssh-add";

/// Variable carrying the agent's PID.
pub const AGENT_PID_VAR: &str = "SSH_AGENT_PID";

/// Variable carrying the agent's socket path.
pub const AGENT_SOCK_VAR: &str = "SSH_AUTH_SOCK";

/// Shell assignment in the agent output. Values are socket paths and PIDs.
static ASSIGNMENT: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(\w+)=([\w*/.\-]*)"));

/// Environment exported by the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentEnvironment {
    vars: BTreeMap<String, String>,
}

/// Sends the termination signal to the agent.
pub trait AgentSignaller: Send + Sync {
    /// Requests termination of the given process. Does not wait for exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal cannot be delivered.
    fn terminate(&self, pid: i32) -> Result<()>;
}

/// Signaller sending `SIGTERM`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SigtermSignaller;

/// The running agent, owned by one deployment run.
pub struct CredentialAgentHandle {
    pid: i32,
    env: AgentEnvironment,
    signaller: Arc<dyn AgentSignaller>,
    released: bool,
}

/// Starts the agent and stores an identity in it.
pub struct CredentialAgent<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    signaller: Arc<dyn AgentSignaller>,
    passphrase: Option<String>,
}

impl AgentEnvironment {
    /// Parses `KEY=VALUE` assignments from the agent's startup output.
    ///
    /// # Errors
    ///
    /// Returns an error if the assignment pattern cannot be compiled.
    pub fn parse(output: &str) -> Result<Self> {
        let re = ASSIGNMENT
            .as_ref()
            .map_err(|e| KargoError::internal(format!("invalid agent pattern: {e}")))?;

        let vars = re
            .captures_iter(output)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect();

        Ok(Self { vars })
    }

    /// Looks up one variable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// The agent PID, if exported and a positive number.
    ///
    /// Zero and negative values would signal a process group, so they are
    /// treated as missing.
    #[must_use]
    pub fn pid(&self) -> Option<i32> {
        self.get(AGENT_PID_VAR)
            .and_then(|v| v.parse().ok())
            .filter(|pid| *pid > 0)
    }

    /// Variables as owned pairs, for child process environments.
    #[must_use]
    pub fn vars(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returns true if nothing was exported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl AgentSignaller for SigtermSignaller {
    fn terminate(&self, pid: i32) -> Result<()> {
        kill(Pid::from_raw(pid), Signal::SIGTERM)
            .map_err(|e| KargoError::internal(format!("cannot signal ssh-agent {pid}: {e}")))
    }
}

impl CredentialAgentHandle {
    /// Wraps an already running agent.
    #[must_use]
    pub fn new(pid: i32, env: AgentEnvironment, signaller: Arc<dyn AgentSignaller>) -> Self {
        Self {
            pid,
            env,
            signaller,
            released: false,
        }
    }

    /// Agent process ID.
    #[must_use]
    pub const fn pid(&self) -> i32 {
        self.pid
    }

    /// Environment to pass to child processes.
    #[must_use]
    pub const fn env(&self) -> &AgentEnvironment {
        &self.env
    }

    /// Terminates the agent.
    pub fn release(mut self) {
        self.terminate();
    }

    fn terminate(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match self.signaller.terminate(self.pid) {
            Ok(()) => debug!("Terminated ssh-agent {}", self.pid),
            Err(e) => warn!("Failed to terminate ssh-agent: {e}"),
        }
    }
}

impl Drop for CredentialAgentHandle {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl std::fmt::Debug for CredentialAgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialAgentHandle")
            .field("pid", &self.pid)
            .field("env", &self.env)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl<'a, R: CommandRunner + ?Sized> CredentialAgent<'a, R> {
    /// Creates an agent launcher.
    #[must_use]
    pub fn new(runner: &'a R, signaller: Arc<dyn AgentSignaller>) -> Self {
        Self {
            runner,
            signaller,
            passphrase: None,
        }
    }

    /// Passphrase written to `ssh-add`; without one the operator is prompted.
    #[must_use]
    pub fn with_passphrase(mut self, passphrase: Option<String>) -> Self {
        self.passphrase = passphrase;
        self
    }

    /// Starts the agent and registers one identity.
    ///
    /// If the agent started but the identity could not be stored, the agent
    /// is terminated before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns `CredentialSetup` if any step fails.
    pub async fn prepare(&self, ssh_key: Option<&Path>) -> Result<CredentialAgentHandle> {
        let handle = self.start().await?;

        if let Err(e) = self.add_identity(&handle, ssh_key).await {
            warn!("Releasing ssh-agent after failed identity setup");
            handle.release();
            return Err(e);
        }

        Ok(handle)
    }

    /// Starts the agent.
    ///
    /// # Errors
    ///
    /// Returns `CredentialSetup` if the agent cannot start or exports no PID.
    pub async fn start(&self) -> Result<CredentialAgentHandle> {
        let invocation = Invocation::new(RunnerCommand::new(SSH_AGENT_BIN));
        let result = self.runner.run(&invocation).await.map_err(|e| {
            KargoError::Deploy(DeployError::credentials(format!("Cannot run the ssh-agent: {e}")))
        })?;

        if !result.success() {
            return Err(KargoError::Deploy(DeployError::credentials(format!(
                "Cannot run the ssh-agent: {}",
                result.error_detail()
            ))));
        }

        let env = AgentEnvironment::parse(&result.stdout)?;
        let Some(pid) = env.pid() else {
            return Err(KargoError::Deploy(DeployError::credentials(format!(
                "ssh-agent output has no {AGENT_PID_VAR}"
            ))));
        };

        info!(pid, socket = env.get(AGENT_SOCK_VAR).unwrap_or(""), "Started ssh-agent");

        Ok(CredentialAgentHandle::new(pid, env, Arc::clone(&self.signaller)))
    }

    /// Adds the key (or the default identity) and checks it is listed.
    ///
    /// # Errors
    ///
    /// Returns `CredentialSetup` if the key cannot be stored or listed.
    pub async fn add_identity(
        &self,
        handle: &CredentialAgentHandle,
        ssh_key: Option<&Path>,
    ) -> Result<()> {
        let mut add = RunnerCommand::new(SSH_ADD_BIN);
        if let Some(key) = ssh_key {
            let key = std::fs::canonicalize(key).map_err(|e| {
                KargoError::Deploy(DeployError::credentials(format!(
                    "Cannot resolve ssh key {}: {e}",
                    key.display()
                )))
            })?;
            add = add.arg(key.display().to_string());
        }

        let stdin = self
            .passphrase
            .clone()
            .map_or(StdinMode::Inherit, StdinMode::Piped);
        let invocation = Invocation::new(add)
            .with_env(handle.env().vars())
            .with_stdin(stdin);

        let result = self.runner.run(&invocation).await.map_err(|e| {
            KargoError::Deploy(DeployError::credentials(format!("Failed to store ssh identity: {e}")))
        })?;
        if !result.success() {
            return Err(KargoError::Deploy(DeployError::credentials(format!(
                "Failed to store ssh identity: {}",
                result.error_detail()
            ))));
        }

        let list = Invocation::new(RunnerCommand::new(SSH_ADD_BIN).arg("-l"))
            .with_env(handle.env().vars());
        let result = self.runner.run(&list).await.map_err(|e| {
            KargoError::Deploy(DeployError::credentials(format!("Failed to list identities: {e}")))
        })?;
        if !result.success() {
            return Err(KargoError::Deploy(DeployError::credentials(format!(
                "Failed to list identities: {}",
                result.error_detail()
            ))));
        }

        debug!("Identities: {}", result.stdout.trim());
        Ok(())
    }
}

/// Signaller recording every termination request.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSignaller {
    pids: std::sync::Mutex<Vec<i32>>,
}

#[cfg(test)]
impl RecordingSignaller {
    pub(crate) fn terminated(&self) -> Vec<i32> {
        self.pids.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl AgentSignaller for RecordingSignaller {
    fn terminate(&self, pid: i32) -> Result<()> {
        self.pids.lock().unwrap().push(pid);
        Ok(())
    }
}
