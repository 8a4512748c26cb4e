//! Deployment sequencer.
//!
//! Drives one deployment run from SSH credentials to the cluster playbook:
//!
//! 1. Start the SSH agent and store the identity
//! 2. Check that every host answers (after bootstrapping on CoreOS)
//! 3. Plan the service and pod subnets
//! 4. Show the command and ask for confirmation
//! 5. Run the cluster playbook
//!
//! The agent handle is acquired once at the top of [`DeploymentSequencer::run`]
//! and released once when the run ends, whatever the outcome.

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::cli::{OutputFormatter, Prompt};
use crate::config::DeploymentOptions;
use crate::error::{DeployError, KargoError, Result};
use crate::planner::{
    AddressPlanner, COREOS_PYTHON_INTERPRETER, CommandBuilder, RunnerCommand, SubnetPlan,
};
use crate::runner::{AgentSignaller, CommandRunner, CredentialAgent, CredentialAgentHandle, Invocation};

/// Question asked before the cluster playbook runs.
pub const CONFIRM_QUESTION: &str = "Run kubernetes cluster deployment with the above command ?";

/// Stages of a deployment run, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStage {
    /// Nothing has happened yet.
    Init,
    /// The SSH agent holds the identity.
    CredentialsReady,
    /// The CoreOS bootstrap playbook succeeded.
    BootstrapComplete,
    /// Every host answered the ping probe.
    ReachabilityVerified,
    /// Service and pod subnets are computed.
    AddressesPlanned,
    /// The operator accepted the command (or `assume_yes` was set).
    Confirmed,
    /// The cluster playbook exited successfully.
    Executed,
    /// The run completed.
    Succeeded,
    /// The run aborted.
    Failed,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    /// Planned subnets.
    pub subnets: SubnetPlan,
    /// Command that deployed the cluster.
    pub command: RunnerCommand,
}

/// Sequencer for one deployment run.
pub struct DeploymentSequencer<'a, R: CommandRunner, P: Prompt> {
    /// Deployment options.
    options: &'a DeploymentOptions,
    /// Process runner.
    runner: &'a R,
    /// Operator confirmation.
    prompt: &'a P,
    /// Terminates the SSH agent.
    signaller: Arc<dyn AgentSignaller>,
    /// Output formatter.
    formatter: OutputFormatter,
    /// Passphrase for `ssh-add`.
    passphrase: Option<String>,
    /// Stages entered so far.
    stages: Vec<SequenceStage>,
}

impl<'a, R: CommandRunner, P: Prompt> DeploymentSequencer<'a, R, P> {
    /// Creates a new sequencer.
    #[must_use]
    pub fn new(
        options: &'a DeploymentOptions,
        runner: &'a R,
        prompt: &'a P,
        signaller: Arc<dyn AgentSignaller>,
    ) -> Self {
        Self {
            options,
            runner,
            prompt,
            signaller,
            formatter: OutputFormatter::default(),
            passphrase: None,
            stages: Vec::new(),
        }
    }

    /// Sets the output formatter.
    #[must_use]
    pub fn with_formatter(mut self, formatter: OutputFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Sets the passphrase written to `ssh-add`.
    #[must_use]
    pub fn with_passphrase(mut self, passphrase: Option<String>) -> Self {
        self.passphrase = passphrase;
        self
    }

    /// Stages entered so far.
    #[must_use]
    pub fn stages(&self) -> &[SequenceStage] {
        &self.stages
    }

    /// Runs the whole deployment.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure; the SSH agent has been terminated by
    /// the time the error is returned.
    pub async fn run(&mut self) -> Result<DeploymentReport> {
        debug!(
            "Running ansible-playbook command with the following options: {:?}",
            self.options
        );
        self.enter(SequenceStage::Init);

        let prepared = CredentialAgent::new(self.runner, Arc::clone(&self.signaller))
            .with_passphrase(self.passphrase.clone())
            .prepare(self.options.ssh_key.as_deref())
            .await;
        let agent = match prepared {
            Ok(agent) => agent,
            Err(e) => return Err(self.fail(e)),
        };
        self.enter(SequenceStage::CredentialsReady);

        let outcome = self.drive(&agent).await;
        agent.release();

        match outcome {
            Ok(report) => {
                self.enter(SequenceStage::Succeeded);
                Ok(report)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Everything between credential setup and agent release.
    async fn drive(&mut self, agent: &CredentialAgentHandle) -> Result<DeploymentReport> {
        let env = agent.env().vars();
        let coreos = self.options.coreos;

        // CoreOS images cannot run the ping module before Python is installed
        if coreos {
            self.bootstrap_coreos(&env).await?;
        }
        self.check_ping(&env, coreos).await?;

        let subnets = self.plan_addresses()?;
        let mut command = CommandBuilder::new(self.options).deploy();
        self.confirm(&subnets, &command)?;

        if coreos {
            self.bootstrap_coreos(&env).await?;
            self.check_ping(&env, true).await?;
            command = command.extra_var("ansible_python_interpreter", COREOS_PYTHON_INTERPRETER);
        }

        eprintln!("{}", OutputFormatter::banner("RUN PLAYBOOK"));
        info!("Running kubernetes deployment with the command: {command}");

        let invocation = Invocation::new(command.clone()).with_env(env).streaming();
        let result = self.runner.run(&invocation).await.map_err(|e| {
            KargoError::Deploy(DeployError::DeploymentExecution {
                message: e.to_string(),
            })
        })?;
        if !result.success() {
            return Err(KargoError::Deploy(DeployError::DeploymentExecution {
                message: result.error_detail(),
            }));
        }
        self.enter(SequenceStage::Executed);

        eprintln!("{}", OutputFormatter::success("Kubernetes deployed successfully"));

        Ok(DeploymentReport { subnets, command })
    }

    /// Pings every inventory host.
    async fn check_ping(&mut self, env: &[(String, String)], alternate_interpreter: bool) -> Result<()> {
        eprintln!("{}", OutputFormatter::banner("CHECKING SSH CONNECTIONS"));

        let command = CommandBuilder::new(self.options).ping(alternate_interpreter);
        debug!("Checking hosts with the command: {command}");

        let invocation = Invocation::new(command).with_env(env.to_vec());
        let result = self.runner.run(&invocation).await.map_err(|e| {
            KargoError::Deploy(DeployError::UnreachableHosts {
                message: e.to_string(),
            })
        })?;
        if !result.success() {
            return Err(KargoError::Deploy(DeployError::UnreachableHosts {
                message: result.error_detail(),
            }));
        }

        eprintln!("{}", OutputFormatter::success("All hosts are reachable"));
        self.enter(SequenceStage::ReachabilityVerified);
        Ok(())
    }

    /// Installs Python on CoreOS hosts.
    async fn bootstrap_coreos(&mut self, env: &[(String, String)]) -> Result<()> {
        eprintln!("{}", OutputFormatter::banner("BOOTSTRAP COREOS"));

        let command = CommandBuilder::new(self.options).coreos_bootstrap();
        info!("Bootstrapping CoreOS with the command: {command}");

        let invocation = Invocation::new(command).with_env(env.to_vec()).streaming();
        let result = self.runner.run(&invocation).await.map_err(|e| {
            KargoError::Deploy(DeployError::Bootstrap {
                message: e.to_string(),
            })
        })?;
        if !result.success() {
            return Err(KargoError::Deploy(DeployError::Bootstrap {
                message: result.error_detail(),
            }));
        }

        self.enter(SequenceStage::BootstrapComplete);
        Ok(())
    }

    /// Validates the kube network and splits it.
    fn plan_addresses(&mut self) -> Result<SubnetPlan> {
        let network = AddressPlanner::parse_network(&self.options.kube_network)?;
        let subnets = AddressPlanner::new().plan(network)?;

        info!(
            service = %subnets.service_network,
            pods = %subnets.pods_network,
            "Planned subnets"
        );
        self.enter(SequenceStage::AddressesPlanned);
        Ok(subnets)
    }

    /// Shows the plan and asks the operator unless `assume_yes` is set.
    fn confirm(&mut self, subnets: &SubnetPlan, command: &RunnerCommand) -> Result<()> {
        eprintln!("{}", self.formatter.format_subnets(subnets));
        eprintln!("{}", OutputFormatter::format_command(command));

        if !self.options.assume_yes && !self.prompt.confirm(CONFIRM_QUESTION)? {
            eprintln!("{}", OutputFormatter::error("Aborted"));
            return Err(KargoError::Deploy(DeployError::UserAborted));
        }

        self.enter(SequenceStage::Confirmed);
        Ok(())
    }

    fn enter(&mut self, stage: SequenceStage) {
        debug!(%stage, "Entering stage");
        self.stages.push(stage);
    }

    fn fail(&mut self, err: KargoError) -> KargoError {
        error!(kind = err.deploy_kind().unwrap_or("internal"), "{err}");
        self.enter(SequenceStage::Failed);
        err
    }
}

impl std::fmt::Display for SequenceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::CredentialsReady => "credentials-ready",
            Self::BootstrapComplete => "bootstrap-complete",
            Self::ReachabilityVerified => "reachability-verified",
            Self::AddressesPlanned => "addresses-planned",
            Self::Confirmed => "confirmed",
            Self::Executed => "executed",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::MockPrompt;
    use crate::planner::{ANSIBLE_BIN, PLAYBOOK_BIN};
    use crate::runner::{
        AGENT_SOCK_VAR, CommandResult, MockCommandRunner, RecordingSignaller, SSH_ADD_BIN,
        SSH_AGENT_BIN,
    };
    use std::path::PathBuf;

    const AGENT_OUTPUT: &str = "SSH_AUTH_SOCK=/tmp/ssh-Qx1/agent.90; export SSH_AUTH_SOCK;\n\
                                SSH_AGENT_PID=91; export SSH_AGENT_PID;\n\
                                echo Agent pid 91;\n";

    const INTERPRETER_VAR: &str = "ansible_python_interpreter=/opt/bin/python";

    fn options() -> DeploymentOptions {
        DeploymentOptions {
            inventory_path: PathBuf::from("/tmp/kargo/inventory.cfg"),
            kargo_path: PathBuf::from("/opt/kargo"),
            ansible_user: String::from("admin"),
            kube_network: String::from("10.0.0.0/16"),
            assume_yes: true,
            ..DeploymentOptions::default()
        }
    }

    fn ok() -> CommandResult {
        CommandResult {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    fn failed(stderr: &str) -> CommandResult {
        CommandResult {
            exit_code: 2,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    fn is_ping(inv: &Invocation) -> bool {
        inv.program() == ANSIBLE_BIN && inv.args().iter().any(|a| a == "ping")
    }

    fn is_bootstrap(inv: &Invocation) -> bool {
        inv.program() == PLAYBOOK_BIN
            && inv.args().iter().any(|a| a.ends_with("coreos-bootstrap.yml"))
    }

    fn is_deploy(inv: &Invocation) -> bool {
        inv.program() == PLAYBOOK_BIN && inv.args().iter().any(|a| a.ends_with("cluster.yml"))
    }

    fn has_interpreter(inv: &Invocation) -> bool {
        inv.args().iter().any(|a| a == INTERPRETER_VAR)
    }

    fn expect_credentials(runner: &mut MockCommandRunner) {
        runner
            .expect_run()
            .withf(|inv| inv.program() == SSH_AGENT_BIN)
            .times(1)
            .returning(|_| {
                Ok(CommandResult {
                    stdout: AGENT_OUTPUT.to_string(),
                    ..ok()
                })
            });
        runner
            .expect_run()
            .withf(|inv| inv.program() == SSH_ADD_BIN)
            .times(2)
            .returning(|_| Ok(ok()));
    }

    fn no_prompt() -> MockPrompt {
        let mut prompt = MockPrompt::new();
        prompt.expect_confirm().never();
        prompt
    }

    #[tokio::test]
    async fn test_successful_deployment() {
        let mut runner = MockCommandRunner::new();
        expect_credentials(&mut runner);
        runner
            .expect_run()
            .withf(|inv| {
                is_ping(inv)
                    && !has_interpreter(inv)
                    && inv.env.iter().any(|(k, v)| k == AGENT_SOCK_VAR && v == "/tmp/ssh-Qx1/agent.90")
            })
            .times(1)
            .returning(|_| Ok(ok()));
        runner
            .expect_run()
            .withf(|inv| is_deploy(inv) && !has_interpreter(inv) && inv.stream_stdout)
            .times(1)
            .returning(|_| Ok(ok()));

        let prompt = no_prompt();
        let signaller = Arc::new(RecordingSignaller::default());
        let options = options();
        let mut sequencer = DeploymentSequencer::new(&options, &runner, &prompt, signaller.clone());

        let report = sequencer.run().await.unwrap();

        assert_eq!(report.subnets.pods_network.to_string(), "10.0.0.0/17");
        assert_eq!(report.subnets.service_network.to_string(), "10.0.128.0/24");
        assert!(report.command.has_extra_var("kube_network_plugin", "flannel"));
        assert_eq!(
            sequencer.stages(),
            [
                SequenceStage::Init,
                SequenceStage::CredentialsReady,
                SequenceStage::ReachabilityVerified,
                SequenceStage::AddressesPlanned,
                SequenceStage::Confirmed,
                SequenceStage::Executed,
                SequenceStage::Succeeded,
            ]
        );
        assert_eq!(signaller.terminated(), vec![91]);
    }

    #[tokio::test]
    async fn test_operator_declines() {
        let mut runner = MockCommandRunner::new();
        expect_credentials(&mut runner);
        runner.expect_run().withf(is_ping).times(1).returning(|_| Ok(ok()));
        runner.expect_run().withf(is_deploy).never();

        let mut prompt = MockPrompt::new();
        prompt
            .expect_confirm()
            .withf(|q| q.to_string() == CONFIRM_QUESTION)
            .times(1)
            .returning(|_| Ok(false));

        let signaller = Arc::new(RecordingSignaller::default());
        let options = DeploymentOptions {
            assume_yes: false,
            ..options()
        };
        let mut sequencer = DeploymentSequencer::new(&options, &runner, &prompt, signaller.clone());

        let err = sequencer.run().await.unwrap_err();

        assert!(matches!(err, KargoError::Deploy(DeployError::UserAborted)));
        assert!(!sequencer.stages().contains(&SequenceStage::Confirmed));
        assert_eq!(sequencer.stages().last(), Some(&SequenceStage::Failed));
        assert_eq!(signaller.terminated(), vec![91]);
    }

    #[tokio::test]
    async fn test_operator_accepts() {
        let mut runner = MockCommandRunner::new();
        expect_credentials(&mut runner);
        runner.expect_run().withf(is_ping).times(1).returning(|_| Ok(ok()));
        runner.expect_run().withf(is_deploy).times(1).returning(|_| Ok(ok()));

        let mut prompt = MockPrompt::new();
        prompt.expect_confirm().times(1).returning(|_| Ok(true));

        let signaller = Arc::new(RecordingSignaller::default());
        let options = DeploymentOptions {
            assume_yes: false,
            ..options()
        };
        let mut sequencer = DeploymentSequencer::new(&options, &runner, &prompt, signaller.clone());

        assert!(sequencer.run().await.is_ok());
        assert_eq!(signaller.terminated(), vec![91]);
    }

    #[tokio::test]
    async fn test_unreachable_hosts_abort_before_planning() {
        let mut runner = MockCommandRunner::new();
        expect_credentials(&mut runner);
        runner
            .expect_run()
            .withf(is_ping)
            .times(1)
            .returning(|_| Ok(failed("node1 | UNREACHABLE!")));
        runner.expect_run().withf(is_deploy).never();

        let prompt = no_prompt();
        let signaller = Arc::new(RecordingSignaller::default());
        let options = options();
        let mut sequencer = DeploymentSequencer::new(&options, &runner, &prompt, signaller.clone());

        let err = sequencer.run().await.unwrap_err();

        match err {
            KargoError::Deploy(DeployError::UnreachableHosts { message }) => {
                assert!(message.contains("UNREACHABLE"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!sequencer.stages().contains(&SequenceStage::AddressesPlanned));
        assert_eq!(signaller.terminated(), vec![91]);
    }

    #[tokio::test]
    async fn test_invalid_network() {
        let mut runner = MockCommandRunner::new();
        expect_credentials(&mut runner);
        runner.expect_run().withf(is_ping).returning(|_| Ok(ok()));
        runner.expect_run().withf(is_deploy).never();

        let prompt = no_prompt();
        let signaller = Arc::new(RecordingSignaller::default());
        let options = DeploymentOptions {
            kube_network: String::from("10.0.0.300/16"),
            ..options()
        };
        let mut sequencer = DeploymentSequencer::new(&options, &runner, &prompt, signaller.clone());

        let err = sequencer.run().await.unwrap_err();

        assert_eq!(err.deploy_kind(), Some("invalid_network"));
        assert_eq!(signaller.terminated(), vec![91]);
    }

    #[tokio::test]
    async fn test_invalid_prefix() {
        let mut runner = MockCommandRunner::new();
        expect_credentials(&mut runner);
        runner.expect_run().withf(is_ping).returning(|_| Ok(ok()));
        runner.expect_run().withf(is_deploy).never();

        let prompt = no_prompt();
        let signaller = Arc::new(RecordingSignaller::default());
        let options = DeploymentOptions {
            kube_network: String::from("10.0.0.0/24"),
            ..options()
        };
        let mut sequencer = DeploymentSequencer::new(&options, &runner, &prompt, signaller.clone());

        let err = sequencer.run().await.unwrap_err();

        assert!(matches!(
            err,
            KargoError::Deploy(DeployError::InvalidPrefix { prefix_len: 24, .. })
        ));
        assert!(!sequencer.stages().contains(&SequenceStage::AddressesPlanned));
        assert_eq!(signaller.terminated(), vec![91]);
    }

    #[tokio::test]
    async fn test_deployment_failure() {
        let mut runner = MockCommandRunner::new();
        expect_credentials(&mut runner);
        runner.expect_run().withf(is_ping).returning(|_| Ok(ok()));
        runner
            .expect_run()
            .withf(is_deploy)
            .times(1)
            .returning(|_| Ok(failed("fatal: [node1]: FAILED!")));

        let prompt = no_prompt();
        let signaller = Arc::new(RecordingSignaller::default());
        let options = options();
        let mut sequencer = DeploymentSequencer::new(&options, &runner, &prompt, signaller.clone());

        let err = sequencer.run().await.unwrap_err();

        assert_eq!(err.deploy_kind(), Some("deployment_execution"));
        assert!(err.to_string().contains("FAILED!"));
        assert!(!sequencer.stages().contains(&SequenceStage::Executed));
        assert_eq!(sequencer.stages().last(), Some(&SequenceStage::Failed));
        assert_eq!(signaller.terminated(), vec![91]);
    }

    #[tokio::test]
    async fn test_runner_launch_failure_is_execution_error() {
        let mut runner = MockCommandRunner::new();
        expect_credentials(&mut runner);
        runner.expect_run().withf(is_ping).returning(|_| Ok(ok()));
        runner
            .expect_run()
            .withf(is_deploy)
            .returning(|_| Err(KargoError::internal("failed to execute ansible-playbook")));

        let prompt = no_prompt();
        let signaller = Arc::new(RecordingSignaller::default());
        let options = options();
        let mut sequencer = DeploymentSequencer::new(&options, &runner, &prompt, signaller.clone());

        let err = sequencer.run().await.unwrap_err();

        assert_eq!(err.deploy_kind(), Some("deployment_execution"));
        assert_eq!(signaller.terminated(), vec![91]);
    }

    #[tokio::test]
    async fn test_coreos_bootstraps_and_uses_interpreter() {
        let mut runner = MockCommandRunner::new();
        expect_credentials(&mut runner);
        runner
            .expect_run()
            .withf(|inv| is_bootstrap(inv) && has_interpreter(inv))
            .times(2)
            .returning(|_| Ok(ok()));
        runner
            .expect_run()
            .withf(|inv| is_ping(inv) && has_interpreter(inv))
            .times(2)
            .returning(|_| Ok(ok()));
        runner
            .expect_run()
            .withf(|inv| is_deploy(inv) && inv.args().last().map(String::as_str) == Some(INTERPRETER_VAR))
            .times(1)
            .returning(|_| Ok(ok()));

        let prompt = no_prompt();
        let signaller = Arc::new(RecordingSignaller::default());
        let options = DeploymentOptions {
            coreos: true,
            ..options()
        };
        let mut sequencer = DeploymentSequencer::new(&options, &runner, &prompt, signaller.clone());

        let report = sequencer.run().await.unwrap();

        assert!(report.command.has_extra_var("ansible_python_interpreter", "/opt/bin/python"));
        assert_eq!(
            sequencer.stages(),
            [
                SequenceStage::Init,
                SequenceStage::CredentialsReady,
                SequenceStage::BootstrapComplete,
                SequenceStage::ReachabilityVerified,
                SequenceStage::AddressesPlanned,
                SequenceStage::Confirmed,
                SequenceStage::BootstrapComplete,
                SequenceStage::ReachabilityVerified,
                SequenceStage::Executed,
                SequenceStage::Succeeded,
            ]
        );
        assert_eq!(signaller.terminated(), vec![91]);
    }

    #[tokio::test]
    async fn test_coreos_ping_after_bootstrap_fails() {
        let mut runner = MockCommandRunner::new();
        expect_credentials(&mut runner);
        runner
            .expect_run()
            .withf(is_bootstrap)
            .times(2)
            .returning(|_| Ok(ok()));
        let mut pings = 0;
        runner
            .expect_run()
            .withf(|inv| is_ping(inv) && has_interpreter(inv))
            .times(2)
            .returning(move |_| {
                pings += 1;
                if pings == 1 {
                    Ok(ok())
                } else {
                    Ok(failed("node2 | UNREACHABLE!"))
                }
            });
        runner.expect_run().withf(is_deploy).never();

        let prompt = no_prompt();
        let signaller = Arc::new(RecordingSignaller::default());
        let options = DeploymentOptions {
            coreos: true,
            ..options()
        };
        let mut sequencer = DeploymentSequencer::new(&options, &runner, &prompt, signaller.clone());

        let err = sequencer.run().await.unwrap_err();

        assert_eq!(err.deploy_kind(), Some("unreachable_hosts"));
        assert!(sequencer.stages().contains(&SequenceStage::Confirmed));
        assert!(!sequencer.stages().contains(&SequenceStage::Executed));
        assert_eq!(sequencer.stages().last(), Some(&SequenceStage::Failed));
        assert_eq!(signaller.terminated(), vec![91]);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(SequenceStage::ReachabilityVerified.to_string(), "reachability-verified");
        assert_eq!(SequenceStage::Failed.to_string(), "failed");
    }

    #[tokio::test]
    async fn test_coreos_bootstrap_failure() {
        let mut runner = MockCommandRunner::new();
        expect_credentials(&mut runner);
        runner
            .expect_run()
            .withf(is_bootstrap)
            .times(1)
            .returning(|_| Ok(failed("raw module failed")));
        runner.expect_run().withf(is_ping).never();
        runner.expect_run().withf(is_deploy).never();

        let prompt = no_prompt();
        let signaller = Arc::new(RecordingSignaller::default());
        let options = DeploymentOptions {
            coreos: true,
            ..options()
        };
        let mut sequencer = DeploymentSequencer::new(&options, &runner, &prompt, signaller.clone());

        let err = sequencer.run().await.unwrap_err();

        assert_eq!(err.deploy_kind(), Some("bootstrap"));
        assert_eq!(signaller.terminated(), vec![91]);
    }

    #[tokio::test]
    async fn test_credential_failure_skips_everything() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv| inv.program() == SSH_AGENT_BIN)
            .times(1)
            .returning(|_| Ok(failed("ssh-agent: command not found")));
        runner.expect_run().withf(|inv| inv.program() != SSH_AGENT_BIN).never();

        let prompt = no_prompt();
        let signaller = Arc::new(RecordingSignaller::default());
        let options = options();
        let mut sequencer = DeploymentSequencer::new(&options, &runner, &prompt, signaller.clone());

        let err = sequencer.run().await.unwrap_err();

        assert_eq!(err.deploy_kind(), Some("credential_setup"));
        assert_eq!(sequencer.stages(), [SequenceStage::Init, SequenceStage::Failed]);
        assert!(signaller.terminated().is_empty());
    }

    #[tokio::test]
    async fn test_cloud_providers_in_fixed_order() {
        let mut runner = MockCommandRunner::new();
        expect_credentials(&mut runner);
        runner.expect_run().withf(is_ping).returning(|_| Ok(ok()));
        runner
            .expect_run()
            .withf(|inv| {
                let clouds: Vec<&str> = inv
                    .args()
                    .iter()
                    .filter(|a| a.starts_with("cloud_provider="))
                    .map(String::as_str)
                    .collect();
                is_deploy(inv) && clouds == ["cloud_provider=aws", "cloud_provider=gce"]
            })
            .times(1)
            .returning(|_| Ok(ok()));

        let prompt = no_prompt();
        let signaller = Arc::new(RecordingSignaller::default());
        let options = DeploymentOptions {
            aws: true,
            gce: true,
            ansible_opts: Some(String::from("--forks 50")),
            ..options()
        };
        let mut sequencer = DeploymentSequencer::new(&options, &runner, &prompt, signaller.clone());

        let report = sequencer.run().await.unwrap();
        assert!(report.command.args.windows(2).any(|w| w == ["--forks", "50"]));
        assert_eq!(signaller.terminated(), vec![91]);
    }
}
