//! The command line interface for the simulation.
use crate::config::{SCENARIO_FILE_NAME, ScenarioConfig};
use crate::input::load_model;
use crate::log;
use crate::output::{create_output_directory, get_output_dir, write_results};
use ::log::{error, info};
use anyhow::{Context, Result, anyhow, ensure};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// The command line interface for the simulation.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options for the run command
#[derive(Args)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Override the scenario's random seed
    #[arg(short, long)]
    pub seed: Option<u64>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a simulation model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Validate a model without running it.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Run every model found in a directory, one thread per scenario.
    Dispatch {
        /// Directory whose subdirectories each hold a model.
        models_dir: PathBuf,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts),
            Self::Validate { model_dir } => handle_validate_command(&model_dir),
            Self::Dispatch { models_dir } => handle_dispatch_command(&models_dir),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Handle the `run` command.
pub fn handle_run_command(model_path: &Path, opts: &RunOpts) -> Result<()> {
    let mut config = ScenarioConfig::from_path(model_path.join(SCENARIO_FILE_NAME))?;
    if let Some(seed) = opts.seed {
        config.seed = seed;
    }

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(model_path)?;
        &pathbuf
    };

    create_output_directory(output_path).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;

    // Initialise program logger
    log::init(Some(&config.log_level), Some(output_path))
        .context("Failed to initialise logging.")?;

    // Load the model to run
    let mut pathway = load_model(model_path, config).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());
    info!("Output folder: {}", output_path.display());

    // Run the simulation and write the results
    crate::simulation::run(&mut pathway)?;
    write_results(&pathway, output_path)?;
    info!("Simulation complete!");

    Ok(())
}

/// Handle the `dispatch` command.
///
/// Scenarios are independent, so each model runs on its own thread and writes into its own
/// output directory. A failure in one scenario does not stop the others.
pub fn handle_dispatch_command(models_path: &Path) -> Result<()> {
    let mut model_dirs = Vec::new();
    for entry in std::fs::read_dir(models_path)
        .with_context(|| format!("Could not read directory {}", models_path.display()))?
    {
        let path = entry?.path();
        if path.join(SCENARIO_FILE_NAME).is_file() {
            model_dirs.push(path);
        }
    }
    ensure!(
        !model_dirs.is_empty(),
        "No model directories found in {}",
        models_path.display()
    );

    log::init(None, None).context("Failed to initialise logging.")?;

    let results: Vec<Result<()>> = std::thread::scope(|scope| {
        let handles: Vec<_> = model_dirs
            .iter()
            .map(|dir| scope.spawn(move || run_scenario(dir)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| anyhow!("Scenario thread panicked"))?
            })
            .collect()
    });

    let mut failures = 0;
    for (dir, result) in model_dirs.iter().zip(results) {
        if let Err(err) = result {
            error!("Scenario {} failed: {err:#}", dir.display());
            failures += 1;
        }
    }
    ensure!(failures == 0, "{failures} scenario(s) failed");
    info!("All {} scenarios complete!", model_dirs.len());
    Ok(())
}

/// Load, run and write out a single scenario.
fn run_scenario(model_path: &Path) -> Result<()> {
    let config = ScenarioConfig::from_path(model_path.join(SCENARIO_FILE_NAME))?;
    let output_path = get_output_dir(model_path)?;
    create_output_directory(&output_path)?;

    let mut pathway = load_model(model_path, config).context("Failed to load model.")?;
    info!("Running scenario {}", model_path.display());
    crate::simulation::run(&mut pathway)?;
    write_results(&pathway, &output_path)?;
    info!("Scenario {} complete", model_path.display());
    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path) -> Result<()> {
    let config = ScenarioConfig::from_path(model_path.join(SCENARIO_FILE_NAME))?;

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(Some(&config.log_level), None).context("Failed to initialise logging.")?;

    // Load/validate the model
    load_model(model_path, config).context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}
