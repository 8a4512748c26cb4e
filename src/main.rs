//! Kargo CLI entrypoint.
//!
//! This is the main entrypoint for the kargo command-line tool.

use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use kargo_deploy::cli::{Cli, Commands, OutputFormatter, StdinPrompt};
use kargo_deploy::config::{ConfigParser, ConfigValidator, DeploymentOptions};
use kargo_deploy::error::Result;
use kargo_deploy::planner::AddressPlanner;
use kargo_deploy::runner::{AgentSignaller, SigtermSignaller, SystemRunner};
use kargo_deploy::sequencer::DeploymentSequencer;

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Options decide where logs go, so they are loaded first
    let options = match load_options(&cli) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(cli.verbose, &options) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli, options)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// With a log file configured, events go to that file without colours.
fn init_logging(verbose: bool, options: &DeploymentOptions) -> Result<()> {
    let level = if verbose {
        String::from("debug")
    } else {
        options
            .loglevel
            .as_deref()
            .map_or_else(|| String::from("info"), str::to_lowercase)
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_target(false);

    if let Some(path) = &options.logfile {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }

    Ok(())
}

/// Loads `.env`, the configuration file and the command-line overrides.
fn load_options(cli: &Cli) -> Result<DeploymentOptions> {
    let base = cli
        .config
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new("."));

    let parser = ConfigParser::new().with_base_path(base);
    parser.load_dotenv()?;

    let mut options = parser.load_with_env(cli.config.as_deref())?;

    match &cli.command {
        Commands::Deploy(args) => args.apply(&mut options),
        Commands::Validate { overrides, .. } => overrides.apply(&mut options),
        Commands::Subnets { .. } => {}
    }

    Ok(options)
}

/// Main async entry point.
async fn run(cli: Cli, options: DeploymentOptions) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Deploy(_) => cmd_deploy(&options, formatter).await,
        Commands::Subnets { network } => {
            cmd_subnets(network.as_deref().unwrap_or(&options.kube_network), formatter)
        }
        Commands::Validate { warnings, .. } => cmd_validate(&options, warnings, formatter),
    }
}

/// Deploy the cluster.
async fn cmd_deploy(options: &DeploymentOptions, formatter: OutputFormatter) -> Result<()> {
    ConfigValidator::new().validate(options).inspect_err(|e| {
        error!(kind = e.deploy_kind().unwrap_or("config"), "{e}");
    })?;

    let runner = SystemRunner;
    let prompt = StdinPrompt;
    let signaller: Arc<dyn AgentSignaller> = Arc::new(SigtermSignaller);

    let mut sequencer = DeploymentSequencer::new(options, &runner, &prompt, signaller)
        .with_formatter(formatter)
        .with_passphrase(ConfigParser::get_ssh_passphrase());

    let report = sequencer.run().await?;
    debug!(stages = ?sequencer.stages(), "Deployment finished");
    info!("Cluster deployed with: {}", report.command);

    Ok(())
}

/// Show the planned subnets.
fn cmd_subnets(network: &str, formatter: OutputFormatter) -> Result<()> {
    let network = AddressPlanner::parse_network(network)?;
    let plan = AddressPlanner::new().plan(network)?;

    eprintln!("{}", formatter.format_subnets(&plan));
    Ok(())
}

/// Validate configuration.
fn cmd_validate(
    options: &DeploymentOptions,
    show_warnings: bool,
    formatter: OutputFormatter,
) -> Result<()> {
    info!("Validating configuration");

    let result = ConfigValidator::new().validate(options)?;
    eprintln!("{}", formatter.format_validation(options, &result, show_warnings));

    Ok(())
}
