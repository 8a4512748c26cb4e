//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DeploymentOptions;

/// Kargo - Kubernetes cluster deployment with Ansible.
#[derive(Parser, Debug)]
#[command(name = "kargo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file (defaults to ~/.kargo/config.yml).
    #[arg(short, long, global = true, env = "KARGO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy a Kubernetes cluster with the cluster playbook.
    Deploy(DeployArgs),

    /// Show the service and pod subnets planned for a network.
    Subnets {
        /// Network block with a /16 prefix (defaults to the configured one).
        network: Option<String>,
    },

    /// Validate the configuration.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(long)]
        warnings: bool,

        /// Option overrides.
        #[command(flatten)]
        overrides: DeployArgs,
    },
}

/// Deployment option overrides; every flag takes precedence over the file.
#[derive(Args, Debug, Default, Clone)]
pub struct DeployArgs {
    /// Ansible inventory file.
    #[arg(short, long)]
    pub inventory: Option<PathBuf>,

    /// Directory holding the Kargo playbooks.
    #[arg(long)]
    pub kargo_path: Option<PathBuf>,

    /// Remote user Ansible connects as.
    #[arg(short, long)]
    pub user: Option<String>,

    /// Network plugin (flannel, calico, weave, canal, cloud).
    #[arg(short, long)]
    pub network_plugin: Option<String>,

    /// Network block split into service and pod subnets (prefix /16).
    #[arg(long)]
    pub kube_network: Option<String>,

    /// Enable the AWS cloud provider.
    #[arg(long)]
    pub aws: bool,

    /// Enable the GCE cloud provider.
    #[arg(long)]
    pub gce: bool,

    /// Hosts run CoreOS and need a bootstrap step.
    #[arg(long)]
    pub coreos: bool,

    /// Skip the confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// Private key to add to the SSH agent.
    #[arg(short = 'k', long)]
    pub ssh_key: Option<PathBuf>,

    /// Extra options appended to the playbook command.
    #[arg(long, allow_hyphen_values = true)]
    pub ansible_opts: Option<String>,

    /// Log file path.
    #[arg(long)]
    pub logfile: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub loglevel: Option<String>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl DeployArgs {
    /// Applies the flags that were given on top of the loaded options.
    ///
    /// Boolean flags can only switch a setting on.
    pub fn apply(&self, options: &mut DeploymentOptions) {
        if let Some(inventory) = &self.inventory {
            options.inventory_path.clone_from(inventory);
        }
        if let Some(path) = &self.kargo_path {
            options.kargo_path.clone_from(path);
        }
        if let Some(user) = &self.user {
            options.ansible_user.clone_from(user);
        }
        if let Some(plugin) = &self.network_plugin {
            options.network_plugin.clone_from(plugin);
        }
        if let Some(network) = &self.kube_network {
            options.kube_network.clone_from(network);
        }
        if self.ssh_key.is_some() {
            options.ssh_key.clone_from(&self.ssh_key);
        }
        if self.ansible_opts.is_some() {
            options.ansible_opts.clone_from(&self.ansible_opts);
        }
        if self.logfile.is_some() {
            options.logfile.clone_from(&self.logfile);
        }
        if self.loglevel.is_some() {
            options.loglevel.clone_from(&self.loglevel);
        }

        options.aws |= self.aws;
        options.gce |= self.gce;
        options.coreos |= self.coreos;
        options.assume_yes |= self.yes;
    }
}
