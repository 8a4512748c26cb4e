//! Error types for the Kargo deployment helper.
//!
//! This module provides the error hierarchy for every stage of a deployment
//! run: configuration loading, credential setup, host checks, subnet planning
//! and playbook execution.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Kargo deployment helper.
#[derive(Debug, Error)]
pub enum KargoError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Deployment sequence errors.
    #[error("Deployment error: {0}")]
    Deploy(#[from] DeployError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// Errors that abort a deployment run.
///
/// Every variant is terminal: the run is never retried.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The SSH agent could not be started or the identity could not be stored.
    #[error("SSH credentials setup failed: {message}")]
    CredentialSetup {
        /// Description of the failure.
        message: String,
    },

    /// The ping probe failed for at least one host.
    #[error("Cannot connect to hosts: {message}")]
    UnreachableHosts {
        /// Captured runner error output.
        message: String,
    },

    /// The CoreOS bootstrap playbook failed.
    #[error("CoreOS bootstrap failed: {message}")]
    Bootstrap {
        /// Captured runner error output.
        message: String,
    },

    /// The kube network is not a valid IPv4 CIDR.
    #[error("Invalid Kubernetes network address: {network}")]
    InvalidNetwork {
        /// The rejected network string.
        network: String,
    },

    /// The kube network has a prefix length other than 16.
    #[error(
        "You have to choose a network with a prefix length = 16 (got {network}), \
         please use Ansible options if you need to configure a different netmask"
    )]
    InvalidPrefix {
        /// The rejected network.
        network: String,
        /// Its prefix length.
        prefix_len: u8,
    },

    /// The deployment playbook exited with a nonzero status.
    #[error("Deployment failed: {message}")]
    DeploymentExecution {
        /// Captured runner error output.
        message: String,
    },

    /// The operator declined the confirmation prompt.
    #[error("Deployment aborted by user")]
    UserAborted,
}

/// Result type alias for Kargo operations.
pub type Result<T> = std::result::Result<T, KargoError>;

impl KargoError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the deployment error kind, if this is a deployment error.
    #[must_use]
    pub const fn deploy_kind(&self) -> Option<&'static str> {
        match self {
            Self::Deploy(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl DeployError {
    /// Creates a credential setup error.
    #[must_use]
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::CredentialSetup {
            message: message.into(),
        }
    }

    /// Short machine-readable name of the failure kind, used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CredentialSetup { .. } => "credential_setup",
            Self::UnreachableHosts { .. } => "unreachable_hosts",
            Self::Bootstrap { .. } => "bootstrap",
            Self::InvalidNetwork { .. } => "invalid_network",
            Self::InvalidPrefix { .. } => "invalid_prefix",
            Self::DeploymentExecution { .. } => "deployment_execution",
            Self::UserAborted => "user_aborted",
        }
    }
}
