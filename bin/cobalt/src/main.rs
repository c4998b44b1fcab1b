//! Engine API blob conformance runner.

use cobalt_cli::{
    args::{Args, Commands},
    cmd::{init::InitCmd, run::RunCmd, validate::ValidateCmd},
    config::RunConfig,
    logging, runtime,
};
use color_eyre::eyre::{Result, eyre};
use tracing::{info, trace};

mod suite;

/// Main entry point for the application
///
/// This function:
/// - Sets up error handling
/// - Parses command-line arguments
/// - Loads configuration from file and environment
/// - Initializes logging system
/// - Dispatches the subcommand
fn main() -> Result<()> {
    color_eyre::install()?;
    install_tracing_panic_hook();

    let args = Args::new();
    let config = args
        .load_config()
        .map_err(|error| eyre!("Failed to load configuration file: {error}"))?;

    // This is a drop guard responsible for flushing any remaining logs when the program terminates.
    // It must be assigned to a binding that is not _, as _ will result in the guard being dropped
    // immediately.
    let _guard = logging::init(config.logging.level, config.logging.format);

    trace!("Command-line parameters: {args:?}");

    match &args.command {
        Commands::Init(cmd) => init(&args, cmd),
        Commands::Validate(cmd) => validate(cmd, &config),
        Commands::Run(cmd) => run(cmd, config),
    }
}

fn install_tracing_panic_hook() {
    use std::panic;

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let msg: &str = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "panic"
        };

        tracing::error!(target: "panic", %location, message = %msg, "panic occurred");
        default_hook(info);
    }));
}

fn init(args: &Args, cmd: &InitCmd) -> Result<()> {
    cmd.run(args.config_file())
        .map_err(|error| eyre!("Failed to run init command: {error}"))
}

fn validate(cmd: &ValidateCmd, config: &RunConfig) -> Result<()> {
    cmd.run(config).map_err(|error| eyre!("Invalid configuration: {error}"))?;
    Ok(())
}

fn run(cmd: &RunCmd, mut config: RunConfig) -> Result<()> {
    if cmd.list {
        for scenario in suite::scenarios() {
            println!("{:<28} {}", scenario.name, scenario.about);
        }
        return Ok(());
    }

    cmd.apply_overrides(&mut config);
    trace!(?config, "Configuration");

    let rt = runtime::build_runtime(config.runtime)?;
    let summary = rt.block_on(suite::run(&config, cmd))?;
    info!(
        passed = summary.passed.len(),
        failed = summary.failed.len(),
        skipped = summary.skipped.len(),
        "Scenario run finished"
    );

    if summary.failed.is_empty() {
        Ok(())
    } else {
        Err(eyre!("{} scenario(s) failed: {}", summary.failed.len(), summary.failed.join(", ")))
    }
}
