//! The command line interface for mgplan.
use crate::input::load_model;
use crate::log;
use crate::output::{create_output_directory, get_output_dir, write_network, write_results};
use crate::settings::Settings;
use crate::writer::ModelWriter;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Build and solve microgrid expansion-planning models.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files (defaults to `mgplan_results/<model name>`)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Replace the contents of the output directory if it is not empty
    #[arg(long)]
    pub overwrite: bool,
    /// Also report results for candidate resources which were not built
    #[arg(long)]
    pub include_inactive: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and solve a model, then write results and the sized network.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Check that a model loads and its optimisation problem can be built.
    Validate {
        /// Path to the model directory.
        model_dir: PathBuf,
    },
}

/// Parse CLI arguments and start mgplan
pub fn run_cli() -> Result<()> {
    let Some(command) = Cli::parse().command else {
        println!("{}", Cli::command().render_long_help());
        return Ok(());
    };

    match command {
        Commands::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
        Commands::Validate { model_dir } => handle_validate_command(&model_dir, None),
    }
}

/// Use the given settings or read them from the model directory
fn settings_or_load(model_path: &Path, settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load(model_path).context("Failed to load settings."),
    }
}

/// Handle the `run` command.
///
/// Loads the model, builds and solves it, writes the sizing decisions back into the network and
/// saves `results.csv` and `network.csv` to the output folder.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let mut settings = settings_or_load(model_path, settings)?;
    settings.overwrite |= opts.overwrite;
    settings.include_inactive |= opts.include_inactive;

    let output_path = match &opts.output_dir {
        Some(dir) => dir.clone(),
        None => get_output_dir(model_path)?,
    };
    let overwritten = create_output_directory(&output_path, settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    log::init(Some(&settings.log_level), Some(&output_path))
        .context("Failed to initialise logging.")?;
    if overwritten {
        warn!("Output folder was overwritten");
    }

    let writer = load_model(model_path, &settings).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());
    info!("Output folder: {}", output_path.display());

    run_model(writer, &settings, &output_path)?;
    info!("Run complete!");

    Ok(())
}

/// Build, solve and back-configure a loaded model and write its outputs
fn run_model(mut writer: ModelWriter, settings: &Settings, output_path: &Path) -> Result<()> {
    writer.create_model().context("Failed to create model.")?;
    let solution = writer
        .solve(&settings.solver_options())
        .context("Failed to solve model.")?;

    // Results are read before back-configuration takes unbuilt rows out of service
    let results = writer.get_scenes_results(&solution, settings.include_inactive)?;
    write_results(output_path, &results)?;

    writer.back_configure(&solution)?;
    let network = writer.into_network().context("Network not provided")?;
    write_network(output_path, &network)
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = settings_or_load(model_path, settings)?;

    // No log files for validation
    log::init(Some(&settings.log_level), None).context("Failed to initialise logging.")?;

    let mut writer = load_model(model_path, &settings).context("Failed to validate model.")?;
    let model = writer
        .create_model()
        .context("Failed to validate model.")?;
    info!(
        "Model validation successful! ({} variables, {} constraints)",
        model.num_variables(),
        model.num_constraints()
    );

    Ok(())
}
