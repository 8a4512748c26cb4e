//! Process boundary for the deployment.
//!
//! This module launches external programs (SSH agent, `ssh-add`, Ansible)
//! and manages the SSH agent's lifetime.

mod agent;
mod process;

pub use agent::{
    AGENT_PID_VAR, AGENT_SOCK_VAR, AgentEnvironment, AgentSignaller, CredentialAgent,
    CredentialAgentHandle, SSH_ADD_BIN, SSH_AGENT_BIN, SigtermSignaller,
};
pub use process::{CommandResult, CommandRunner, Invocation, StdinMode, SystemRunner};

#[cfg(test)]
pub(crate) use agent::RecordingSignaller;
#[cfg(test)]
pub(crate) use process::MockCommandRunner;
