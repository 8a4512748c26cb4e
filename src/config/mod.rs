//! Configuration module for the Kargo deployment helper.
//!
//! This module handles all configuration-related functionality:
//! - Loading `~/.kargo/config.yml` and environment overrides
//! - Validation of deployment options before any process is spawned

mod options;
mod parser;
mod validator;

pub use options::{
    CLOUD_PROVIDERS, CloudProvider, DEFAULT_KUBE_NETWORK, DEFAULT_NETWORK_PLUGIN,
    DeploymentOptions, default_kargo_path,
};
pub use parser::{ConfigParser, default_config_path};
pub use validator::{ConfigValidator, ValidationResult};
