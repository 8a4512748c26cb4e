// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Kargo Deploy
//!
//! Deploys a Kubernetes cluster with the Kargo Ansible playbooks.
//!
//! ## Overview
//!
//! A deployment run is a fixed sequence of external process invocations:
//!
//! - Start an SSH agent and store the operator's identity
//! - Check that every inventory host answers (bootstrapping CoreOS first)
//! - Split the Kubernetes network into service and pod subnets
//! - Ask for confirmation and run the cluster playbook
//!
//! The SSH agent is terminated once the run ends, whatever the outcome.
//!
//! ## Modules
//!
//! - [`config`]: Options loading and validation
//! - [`planner`]: Subnet planning and command assembly
//! - [`runner`]: Process execution and SSH agent lifetime
//! - [`sequencer`]: The deployment run itself
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! # ~/.kargo/config.yml
//! inventory_path: /home/ops/kargo/inventory/inventory.cfg
//! kargo_path: /home/ops/kargo
//! ansible_user: ubuntu
//! network_plugin: calico
//! kube_network: 10.233.0.0/16
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod planner;
pub mod runner;
pub mod sequencer;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, DeploymentOptions};
pub use error::{DeployError, KargoError, Result};
pub use planner::{AddressPlanner, CommandBuilder, RunnerCommand, SubnetPlan};
pub use runner::{CommandRunner, CredentialAgent, CredentialAgentHandle, SystemRunner};
pub use sequencer::{DeploymentReport, DeploymentSequencer, SequenceStage};
