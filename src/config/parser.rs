//! Configuration parser for loading deployment options.
//!
//! This module handles loading options from the YAML configuration file and
//! environment variables, with proper precedence and error handling.

use crate::error::{ConfigError, KargoError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::options::{DeploymentOptions, default_kargo_path};

/// Configuration parser for loading deployment options.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads options from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<DeploymentOptions> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(KargoError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            KargoError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses options from a YAML string.
    ///
    /// Relative inventory and playbook paths are resolved against the base path.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<DeploymentOptions> {
        debug!("Parsing YAML configuration");

        // An empty file is a valid, all-defaults configuration
        let mut options: DeploymentOptions = if content.trim().is_empty() {
            DeploymentOptions::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                let location = source.map(|p| p.display().to_string());
                KargoError::Config(ConfigError::ParseError {
                    message: format!("YAML parse error: {e}"),
                    location,
                })
            })?
        };

        if let Some(base) = &self.base_path {
            options.inventory_path = resolve(base, &options.inventory_path);
            options.kargo_path = resolve(base, &options.kargo_path);
        }

        Ok(options)
    }

    /// Loads options with environment variable overrides.
    ///
    /// When `path` is `None` the default file is used if it exists, otherwise
    /// the built-in defaults apply. An explicit path must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: Option<&Path>) -> Result<DeploymentOptions> {
        let mut options = match path {
            Some(path) => self.load_file(path)?,
            None => {
                let default = default_config_path();
                if default.exists() {
                    self.load_file(&default)?
                } else {
                    debug!("No configuration file at {}, using defaults", default.display());
                    DeploymentOptions::default()
                }
            }
        };

        Self::apply_env_overrides(&mut options);

        Ok(options)
    }

    /// Applies environment variable overrides to the options.
    fn apply_env_overrides(options: &mut DeploymentOptions) {
        if let Ok(path) = std::env::var("KARGO_PATH") {
            debug!("Overriding kargo_path from environment");
            options.kargo_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("KARGO_INVENTORY_PATH") {
            debug!("Overriding inventory_path from environment");
            options.inventory_path = PathBuf::from(path);
        }

        if let Ok(user) = std::env::var("KARGO_ANSIBLE_USER") {
            debug!("Overriding ansible_user from environment");
            options.ansible_user = user;
        }

        if let Ok(network) = std::env::var("KARGO_KUBE_NETWORK") {
            debug!("Overriding kube_network from environment");
            options.kube_network = network;
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                KargoError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Gets the SSH key passphrase from environment (optional).
    #[must_use]
    pub fn get_ssh_passphrase() -> Option<String> {
        std::env::var("KARGO_SSH_PASSPHRASE").ok()
    }
}

/// Default configuration file location (`~/.kargo/config.yml`).
#[must_use]
pub fn default_config_path() -> PathBuf {
    default_kargo_path().join("config.yml")
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
