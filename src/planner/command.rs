//! Ansible command lines for each deployment stage.
//!
//! Every command disables strict host key checking and escalates to root as
//! the configured remote user.

use crate::config::DeploymentOptions;

/// Single-module runner used for the ping probe.
pub const ANSIBLE_BIN: &str = "ansible";

/// Playbook runner used for bootstrap and deployment.
pub const PLAYBOOK_BIN: &str = "ansible-playbook";

/// Python interpreter installed by the CoreOS bootstrap playbook.
pub const COREOS_PYTHON_INTERPRETER: &str = "/opt/bin/python";

/// Playbook installing Python on CoreOS hosts.
pub const COREOS_BOOTSTRAP_PLAYBOOK: &str = "coreos-bootstrap.yml";

/// Main cluster playbook.
pub const CLUSTER_PLAYBOOK: &str = "cluster.yml";

/// A program and its argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCommand {
    /// Executable name, resolved from `PATH`.
    pub program: String,
    /// Arguments in order.
    pub args: Vec<String>,
}

/// Builds the Ansible command lines from deployment options.
#[derive(Debug)]
pub struct CommandBuilder<'a> {
    options: &'a DeploymentOptions,
}

impl RunnerCommand {
    /// Creates a command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends an `-e key=value` extra variable.
    #[must_use]
    pub fn extra_var(self, key: &str, value: impl std::fmt::Display) -> Self {
        self.arg("-e").arg(format!("{key}={value}"))
    }

    /// Returns true if `-e key=value` appears in the arguments.
    #[must_use]
    pub fn has_extra_var(&self, key: &str, value: &str) -> bool {
        let expected = format!("{key}={value}");
        self.args
            .windows(2)
            .any(|pair| pair[0] == "-e" && pair[1] == expected)
    }
}

impl std::fmt::Display for RunnerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl<'a> CommandBuilder<'a> {
    /// Creates a builder for the given options.
    #[must_use]
    pub const fn new(options: &'a DeploymentOptions) -> Self {
        Self { options }
    }

    /// Ping probe against every inventory host.
    ///
    /// `alternate_interpreter` selects the CoreOS Python path.
    #[must_use]
    pub fn ping(&self, alternate_interpreter: bool) -> RunnerCommand {
        let cmd = RunnerCommand::new(ANSIBLE_BIN)
            .args(Self::ssh_args())
            .args(self.become_args())
            .args(["-m", "ping", "all", "-i"])
            .arg(self.inventory());

        if alternate_interpreter {
            cmd.extra_var("ansible_python_interpreter", COREOS_PYTHON_INTERPRETER)
        } else {
            cmd
        }
    }

    /// CoreOS bootstrap playbook.
    #[must_use]
    pub fn coreos_bootstrap(&self) -> RunnerCommand {
        RunnerCommand::new(PLAYBOOK_BIN)
            .args(Self::ssh_args())
            .extra_var("ansible_python_interpreter", COREOS_PYTHON_INTERPRETER)
            .args(self.become_args())
            .arg("-i")
            .arg(self.inventory())
            .arg(self.playbook(COREOS_BOOTSTRAP_PLAYBOOK))
    }

    /// Main cluster playbook with extra options and cloud providers.
    ///
    /// The CoreOS interpreter flag is appended later, right before execution.
    #[must_use]
    pub fn deploy(&self) -> RunnerCommand {
        let mut cmd = RunnerCommand::new(PLAYBOOK_BIN)
            .args(Self::ssh_args())
            .extra_var("kube_network_plugin", &self.options.network_plugin)
            .args(self.become_args())
            .arg("-i")
            .arg(self.inventory())
            .arg(self.playbook(CLUSTER_PLAYBOOK))
            .args(self.options.extra_args());

        for cloud in self.options.enabled_clouds() {
            cmd = cmd.extra_var("cloud_provider", cloud);
        }

        cmd
    }

    fn ssh_args() -> [&'static str; 2] {
        ["--ssh-extra-args", "-o StrictHostKeyChecking=no"]
    }

    fn become_args(&self) -> Vec<String> {
        vec![
            String::from("-u"),
            self.options.ansible_user.clone(),
            String::from("-b"),
            String::from("--become-user=root"),
        ]
    }

    fn inventory(&self) -> String {
        self.options.inventory().display().to_string()
    }

    fn playbook(&self, name: &str) -> String {
        self.options.playbook(name).display().to_string()
    }
}
