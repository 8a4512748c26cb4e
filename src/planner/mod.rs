//! Planning module for deployment runs.
//!
//! This module computes the service and pod subnets and assembles the
//! Ansible command lines executed by the sequencer.

mod command;
mod subnet;

pub use command::{
    ANSIBLE_BIN, CLUSTER_PLAYBOOK, COREOS_BOOTSTRAP_PLAYBOOK, COREOS_PYTHON_INTERPRETER,
    CommandBuilder, PLAYBOOK_BIN, RunnerCommand,
};
pub use subnet::{
    AddressPlanner, PODS_PREFIX_LEN, REQUIRED_PREFIX_LEN, SERVICE_PREFIX_LEN, SubnetPlan,
    usable_hosts,
};
