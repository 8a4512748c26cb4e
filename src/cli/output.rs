//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{DeploymentOptions, ValidationResult};
use crate::planner::{RunnerCommand, SubnetPlan};

use super::commands::OutputFormat;

/// Width of the stage banner.
const BANNER_WIDTH: usize = 78;

/// Output formatter for CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Subnet row for table display.
#[derive(Tabled)]
struct SubnetRow {
    #[tabled(rename = "Network")]
    role: &'static str,
    #[tabled(rename = "CIDR")]
    cidr: String,
    #[tabled(rename = "Usable IPs")]
    hosts: u64,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Stage banner, in the style of Ansible's play headers.
    #[must_use]
    pub fn banner(title: &str) -> String {
        let stars = BANNER_WIDTH.saturating_sub(title.len() + 1).max(3);
        format!("\n{} {}", title.bold(), "*".repeat(stars))
    }

    /// Formats a subnet plan for display.
    #[must_use]
    pub fn format_subnets(&self, plan: &SubnetPlan) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&SubnetPlanJson::from(plan)).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_subnets_text(plan),
        }
    }

    /// Formats a subnet plan as text.
    fn format_subnets_text(plan: &SubnetPlan) -> String {
        let rows = vec![
            SubnetRow {
                role: "Kubernetes services",
                cidr: plan.service_network.to_string(),
                hosts: plan.service_hosts(),
            },
            SubnetRow {
                role: "Pods",
                cidr: plan.pods_network.to_string(),
                hosts: plan.pods_hosts(),
            },
        ];

        let mut output = Table::new(rows).to_string();
        output.push('\n');
        output
    }

    /// Echoes the command that is about to run.
    #[must_use]
    pub fn format_command(command: &RunnerCommand) -> String {
        command.to_string().bright_blue().to_string()
    }

    /// Formats a validation summary.
    #[must_use]
    pub fn format_validation(
        &self,
        options: &DeploymentOptions,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        if self.format == OutputFormat::Json {
            let json = serde_json::json!({
                "valid": result.is_valid(),
                "warnings": result.warnings,
                "options": options,
            });
            return serde_json::to_string_pretty(&json).unwrap_or_default();
        }

        let mut output = Self::success("Configuration is valid!");
        output.push('\n');

        if show_warnings && !result.warnings.is_empty() {
            output.push_str("\nWarnings:\n");
            for warning in &result.warnings {
                let _ = writeln!(output, "  {} {warning}", "⚠".yellow());
            }
        }

        output.push_str("\nConfiguration summary:\n");
        let _ = writeln!(output, "  Inventory: {}", options.inventory_path.display());
        let _ = writeln!(output, "  Playbooks: {}", options.kargo_path.display());
        let _ = writeln!(output, "  Ansible user: {}", options.ansible_user);
        let _ = writeln!(output, "  Network plugin: {}", options.network_plugin);
        let _ = writeln!(output, "  Kube network: {}", options.kube_network);
        let clouds: Vec<&str> = options.enabled_clouds().iter().map(|c| c.as_str()).collect();
        let _ = writeln!(
            output,
            "  Cloud providers: {}",
            if clouds.is_empty() { String::from("none") } else { clouds.join(", ") }
        );
        let _ = writeln!(output, "  CoreOS: {}", options.coreos);

        output
    }

    /// Formats a success message.
    #[must_use]
    pub fn success(message: &str) -> String {
        format!("{} {}", "✓".green(), message.green())
    }

    /// Formats an abort or failure message.
    #[must_use]
    pub fn error(message: &str) -> String {
        format!("{} {}", "✗".red(), message.red())
    }
}

// JSON serialization helpers

#[derive(serde::Serialize)]
struct SubnetPlanJson {
    service_network: String,
    service_hosts: u64,
    pods_network: String,
    pods_hosts: u64,
}

impl From<&SubnetPlan> for SubnetPlanJson {
    fn from(plan: &SubnetPlan) -> Self {
        Self {
            service_network: plan.service_network.to_string(),
            service_hosts: plan.service_hosts(),
            pods_network: plan.pods_network.to_string(),
            pods_hosts: plan.pods_hosts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::AddressPlanner;

    fn plan() -> SubnetPlan {
        AddressPlanner::new().plan("10.0.0.0/16".parse().unwrap()).unwrap()
    }

    #[test]
    fn test_subnets_text() {
        let output = OutputFormatter::new(OutputFormat::Text).format_subnets(&plan());
        assert!(output.contains("10.0.128.0/24"));
        assert!(output.contains("254"));
        assert!(output.contains("10.0.0.0/17"));
        assert!(output.contains("32766"));
    }

    #[test]
    fn test_subnets_json() {
        let output = OutputFormatter::new(OutputFormat::Json).format_subnets(&plan());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["service_network"], "10.0.128.0/24");
        assert_eq!(value["service_hosts"], 254);
        assert_eq!(value["pods_network"], "10.0.0.0/17");
        assert_eq!(value["pods_hosts"], 32766);
    }

    #[test]
    fn test_banner_contains_title() {
        colored::control::set_override(false);
        let banner = OutputFormatter::banner("RUN PLAYBOOK");
        assert!(banner.starts_with("\nRUN PLAYBOOK *"));
        assert_eq!(banner.trim_start().len(), BANNER_WIDTH);
    }
}
