//! cfn-deploy CLI entrypoint.
//!
//! This is the main entrypoint for the cfn-deploy command-line tool.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use cfn_stack_deploy::cancel::cancel_pair;
use cfn_stack_deploy::cli::{
    ActionOutputs, Cli, Commands, LogFormat, OutputFormatter, StackArgs, TemplateSummary,
};
use cfn_stack_deploy::cloudformation::{CloudFormationClient, StatusClassifier};
use cfn_stack_deploy::config::{
    ConfigParser, ConfigValidator, DeployConfig, debug_requested, find_config_file,
};
use cfn_stack_deploy::error::{ConfigError, DeployError, Result};
use cfn_stack_deploy::orchestrator::{DeploymentReport, Orchestrator};
use cfn_stack_deploy::template::{TemplateHasher, TemplateRef};

use chrono::Utc;
use clap::Parser;
use tracing::{Instrument, debug, error, info, info_span, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Exit code for a run stopped by a signal or deadline.
const EXIT_CANCELLED: u8 = 130;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; the process environment wins over .env for the debug switch
    let dotenv = read_dotenv(cli.config.as_deref());
    let verbose = cli.verbose
        || debug_requested(|name| std::env::var(name).ok().or_else(|| dotenv.get(name).cloned()));
    init_logging(verbose, cli.log_format);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatter = OutputFormatter::new(cli.output);

    match runtime.block_on(run(cli, &formatter)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprint!("{}", formatter.format_failure(&e));
            if e.is_cancelled() {
                ExitCode::from(EXIT_CANCELLED)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    let config_path = cli.config.as_deref();

    match &cli.command {
        Commands::Deploy {
            stack,
            poll_interval,
            timeout,
        } => cmd_deploy(config_path, stack, *poll_interval, *timeout, formatter).await,
        Commands::Status { stack } => cmd_status(config_path, stack, formatter).await,
        Commands::Validate { stack, warnings } => {
            cmd_validate(config_path, stack, *warnings, formatter).await
        }
    }
}

/// Deploy the stack and wait for it to settle.
async fn cmd_deploy(
    config_path: Option<&Path>,
    stack: &StackArgs,
    poll_interval: Option<u64>,
    timeout: Option<u64>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (mut config, base_dir) = load_config(config_path, stack)?;
    if let Some(interval) = poll_interval {
        config.polling.interval_secs = interval;
    }
    if let Some(timeout) = timeout {
        config.polling.timeout_secs = Some(timeout);
    }
    ConfigValidator::new().validate(&config)?;

    let (body, template) = load_template(&config, &base_dir).await?;
    let request = config.to_request(body)?;
    let client = CloudFormationClient::new(config.stack.region.as_deref()).await;

    let (handle, token) = cancel_pair();
    let token = match config.polling.timeout_secs {
        Some(secs) => {
            info!("Run deadline set to {secs}s");
            token.with_timeout(Duration::from_secs(secs))
        }
        None => token,
    };
    tokio::spawn(async move {
        shutdown_signal().await;
        handle.cancel();
    });

    let run_id = Uuid::new_v4().to_string();
    let started_at = Utc::now();
    let span = info_span!("deploy", run_id = %run_id, stack = %request.stack_name);

    let result = Orchestrator::new(&client)
        .with_poll_interval(Duration::from_secs(config.polling.interval_secs))
        .with_cancel_token(token)
        .deploy(&request)
        .instrument(span)
        .await;

    let outputs = ActionOutputs::from_env();

    match result {
        Ok(outcome) => {
            info!("final status is {}", outcome.final_status);
            if let Some(outputs) = &outputs {
                outputs.set("status", &outcome.final_status)?;
            }
            let report = DeploymentReport::new(run_id, template.digest, started_at, outcome);
            println!("{}", formatter.format_report(&report));
            Ok(())
        }
        Err(e) => {
            error!("{e}");
            if let Some(outputs) = &outputs {
                outputs.set_outcome(e.status().unwrap_or_default(), &e.to_string())?;
            }
            Err(e)
        }
    }
}

/// Show the stack's current status.
async fn cmd_status(
    config_path: Option<&Path>,
    stack: &StackArgs,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, _) = load_config(config_path, stack)?;
    if config.stack.name.is_empty() {
        return Err(DeployError::Config(ConfigError::MissingInput {
            name: String::from("stack-name"),
        }));
    }

    let client = CloudFormationClient::new(config.stack.region.as_deref()).await;
    let classification = StatusClassifier::new(&client)
        .classify(&config.stack.name)
        .await?;

    println!("{}", formatter.format_status(&config.stack.name, &classification));
    Ok(())
}

/// Validate configuration and template.
async fn cmd_validate(
    config_path: Option<&Path>,
    stack: &StackArgs,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, base_dir) = load_config(config_path, stack)?;
    info!("Validating configuration for stack: {}", config.stack.name);

    let validator = ConfigValidator::new();
    let result = validator.check(&config);

    // The template is only read when the rest of the configuration holds up.
    let template = if result.is_valid() {
        Some(load_template(&config, &base_dir).await?.1)
    } else {
        None
    };

    println!(
        "{}",
        formatter.format_validation(&config, &result, template.as_ref(), show_warnings)
    );

    // Surface the first error as the command's failure.
    validator.validate(&config)?;
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the configuration file path, if there is one.
///
/// Without `--config`, a missing file is fine: every setting can also come
/// from the environment or flags.
fn resolve_config_path(config_path: Option<&Path>) -> Result<Option<PathBuf>> {
    match config_path {
        Some(path) => Ok(Some(path.to_path_buf())),
        None => match find_config_file(std::env::current_dir()?) {
            Ok(path) => Ok(Some(path)),
            Err(DeployError::Config(_)) => {
                debug!("No configuration file found, using environment and flags only");
                Ok(None)
            }
            Err(e) => Err(e),
        },
    }
}

/// Finds the configuration file, if any, and the directory relative paths resolve against.
fn config_location(config_path: Option<&Path>) -> Result<(Option<PathBuf>, PathBuf)> {
    let config_file = resolve_config_path(config_path)?;
    let base_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    Ok((config_file, base_dir))
}

/// Reads `.env` before logging is up. Problems resurface when the configuration loads.
fn read_dotenv(config_path: Option<&Path>) -> HashMap<String, String> {
    config_location(config_path)
        .and_then(|(_, base_dir)| ConfigParser::new().with_base_path(base_dir).read_dotenv())
        .unwrap_or_default()
}

/// Loads the layered configuration and the directory relative paths resolve against.
fn load_config(config_path: Option<&Path>, stack: &StackArgs) -> Result<(DeployConfig, PathBuf)> {
    let (config_file, base_dir) = config_location(config_path)?;

    let parser = ConfigParser::new().with_base_path(&base_dir);
    parser.load_dotenv()?;

    let mut config = parser.load_with_env(config_file.as_deref())?;
    stack.apply_to(&mut config)?;

    Ok((config, base_dir))
}

/// Loads the template and summarizes it.
async fn load_template(
    config: &DeployConfig,
    base_dir: &Path,
) -> Result<(String, TemplateSummary)> {
    let reference = TemplateRef::parse(&config.stack.template)?.relative_to(base_dir);
    let source = reference.open(config.stack.region.as_deref()).await;
    let body = source.load().await?;

    let hasher = TemplateHasher::new();
    let digest = hasher.digest(&body);
    info!(
        "Template {} ({} backend, {} bytes, sha256 {})",
        source.location(),
        source.backend_type(),
        body.len(),
        hasher.short_digest(&digest)
    );

    let summary = TemplateSummary {
        location: source.location(),
        bytes: body.len(),
        digest,
    };
    Ok((body, summary))
}

/// Resolves when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), cancelling deployment");
        }
        () = terminate => {
            info!("Received SIGTERM, cancelling deployment");
        }
    }
}
