//! Deployment option types.
//!
//! This module defines the structure that maps to `~/.kargo/config.yml` and
//! that is threaded read-only through one deployment run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default network plugin deployed by the playbooks.
pub const DEFAULT_NETWORK_PLUGIN: &str = "flannel";

/// Default Kubernetes network block, split into service and pod subnets.
pub const DEFAULT_KUBE_NETWORK: &str = "10.233.0.0/16";

/// Cloud providers that can be enabled, in the order their flags are emitted.
pub const CLOUD_PROVIDERS: [CloudProvider; 2] = [CloudProvider::Aws, CloudProvider::Gce];

/// Immutable options for one deployment run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeploymentOptions {
    /// Ansible inventory file.
    pub inventory_path: PathBuf,
    /// Directory holding the Kargo playbooks.
    pub kargo_path: PathBuf,
    /// Remote user Ansible connects as.
    pub ansible_user: String,
    /// Network plugin passed to the cluster playbook.
    pub network_plugin: String,
    /// Network block split into the service and pod subnets.
    pub kube_network: String,
    /// Enable the AWS cloud provider.
    pub aws: bool,
    /// Enable the GCE cloud provider.
    pub gce: bool,
    /// Targets run CoreOS and need a bootstrap step.
    pub coreos: bool,
    /// Skip the confirmation prompt.
    pub assume_yes: bool,
    /// Private key to add to the SSH agent.
    pub ssh_key: Option<PathBuf>,
    /// Extra options appended verbatim to the playbook command.
    pub ansible_opts: Option<String>,
    /// Log file path.
    pub logfile: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error).
    pub loglevel: Option<String>,
}

/// A cloud provider the cluster playbook can integrate with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    /// Amazon Web Services.
    Aws,
    /// Google Compute Engine.
    Gce,
}

impl Default for DeploymentOptions {
    fn default() -> Self {
        let kargo_path = default_kargo_path();
        Self {
            inventory_path: kargo_path.join("inventory").join("inventory.cfg"),
            kargo_path,
            ansible_user: String::new(),
            network_plugin: String::from(DEFAULT_NETWORK_PLUGIN),
            kube_network: String::from(DEFAULT_KUBE_NETWORK),
            aws: false,
            gce: false,
            coreos: false,
            assume_yes: false,
            ssh_key: None,
            ansible_opts: None,
            logfile: None,
            loglevel: None,
        }
    }
}

impl DeploymentOptions {
    /// Returns whether the given cloud provider is enabled.
    #[must_use]
    pub const fn cloud_enabled(&self, provider: CloudProvider) -> bool {
        match provider {
            CloudProvider::Aws => self.aws,
            CloudProvider::Gce => self.gce,
        }
    }

    /// Enabled cloud providers in their fixed emission order.
    #[must_use]
    pub fn enabled_clouds(&self) -> Vec<CloudProvider> {
        CLOUD_PROVIDERS
            .into_iter()
            .filter(|p| self.cloud_enabled(*p))
            .collect()
    }

    /// Extra playbook options split on whitespace.
    #[must_use]
    pub fn extra_args(&self) -> Vec<String> {
        self.ansible_opts
            .as_deref()
            .map(|opts| opts.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Path of a playbook inside the Kargo directory.
    #[must_use]
    pub fn playbook(&self, name: &str) -> PathBuf {
        self.kargo_path.join(name)
    }

    /// Inventory path as passed to Ansible.
    #[must_use]
    pub fn inventory(&self) -> &Path {
        &self.inventory_path
    }
}

impl CloudProvider {
    /// Name understood by the `cloud_provider` playbook variable.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Gce => "gce",
        }
    }
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default Kargo directory (`~/.kargo`).
#[must_use]
pub fn default_kargo_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kargo")
}
