//! Validation of deployment options.
//!
//! Runs before any process is spawned so that obvious mistakes never reach
//! the SSH agent or the playbooks.

use crate::error::{ConfigError, KargoError, Result};
use crate::planner::AddressPlanner;
use tracing::debug;

use super::options::DeploymentOptions;

/// Network plugins supported by the cluster playbook.
const KNOWN_NETWORK_PLUGINS: &[&str] = &["flannel", "calico", "weave", "canal", "cloud"];

/// Accepted log levels.
const KNOWN_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validator for deployment options.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates deployment options.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any field is invalid, then
    /// `InvalidNetwork` if `kube_network` is not an IPv4 CIDR.
    pub fn validate(&self, options: &DeploymentOptions) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_connection(options, &mut result);
        Self::validate_network(options, &mut result);
        Self::validate_logging(options, &mut result);

        if let Some(first_error) = result.errors.first() {
            return Err(KargoError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }));
        }

        // Same parse as the sequencer, so both report InvalidNetwork.
        // The prefix length is only checked at deploy time.
        AddressPlanner::parse_network(&options.kube_network)?;

        debug!("Configuration validation passed");
        Ok(result)
    }

    fn validate_connection(options: &DeploymentOptions, result: &mut ValidationResult) {
        if options.ansible_user.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("ansible_user"),
                message: String::from("Ansible user is required (use --user or ansible_user)"),
            });
        }

        if !options.inventory_path.exists() {
            result.warnings.push(format!(
                "Inventory file {} does not exist yet",
                options.inventory_path.display()
            ));
        }

        if let Some(key) = &options.ssh_key
            && !key.exists()
        {
            result.errors.push(ValidationError {
                field: String::from("ssh_key"),
                message: format!("SSH key {} does not exist", key.display()),
            });
        }
    }

    fn validate_network(options: &DeploymentOptions, result: &mut ValidationResult) {
        if options.network_plugin.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("network_plugin"),
                message: String::from("Network plugin cannot be empty"),
            });
        } else if !KNOWN_NETWORK_PLUGINS.contains(&options.network_plugin.as_str()) {
            result.errors.push(ValidationError {
                field: String::from("network_plugin"),
                message: format!("Unknown network plugin '{}'", options.network_plugin),
            });
        }

        if options.aws && options.gce {
            result
                .warnings
                .push(String::from("Both aws and gce cloud providers are enabled"));
        }
    }

    fn validate_logging(options: &DeploymentOptions, result: &mut ValidationResult) {
        if let Some(level) = &options.loglevel
            && !KNOWN_LOG_LEVELS.contains(&level.to_lowercase().as_str())
        {
            result.errors.push(ValidationError {
                field: String::from("loglevel"),
                message: format!("Unknown log level '{level}'"),
            });
        }
    }
}

impl ValidationResult {
    /// Returns true if there are no errors.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
