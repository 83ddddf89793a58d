//! Code for loading program settings.
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use crate::optimisation::SolverOptions;
use crate::resource::DEFAULT_BIG_M;
use anyhow::{Result, ensure};
use serde::Deserialize;
use std::path::Path;

/// The name of the settings file, looked for in the model directory
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Default log level for program
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_big_m() -> f64 {
    DEFAULT_BIG_M
}

/// Program settings from config file
#[derive(Debug, Deserialize, PartialEq)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether to overwrite output files by default
    #[serde(default)]
    pub overwrite: bool,
    /// Whether results include resources which were not built
    #[serde(default)]
    pub include_inactive: bool,
    /// Big-M for resources which do not set their own
    #[serde(default = "default_big_m")]
    pub big_m: f64,
    /// Relative MIP gap at which the solver stops
    #[serde(default)]
    pub mip_rel_gap: Option<f64>,
    /// Solver time limit in seconds
    #[serde(default)]
    pub time_limit: Option<f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
            include_inactive: false,
            big_m: DEFAULT_BIG_M,
            mip_rel_gap: None,
            time_limit: None,
        }
    }
}

impl Settings {
    /// Read the settings file from the model directory.
    ///
    /// If the file is not present, default values for settings will be used
    ///
    /// # Returns
    ///
    /// The program settings as a `Settings` struct or an error if the file is invalid
    pub fn load(model_dir: &Path) -> Result<Settings> {
        Self::load_from_path(&model_dir.join(SETTINGS_FILE_NAME))
    }

    /// Read from the specified path, returning defaults if there is no file
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        ensure!(
            settings.big_m.is_finite() && settings.big_m > 0.0,
            "big_m must be a positive number"
        );

        Ok(settings)
    }

    /// Options to pass to the solver
    pub fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            mip_rel_gap: self.mip_rel_gap,
            time_limit: self.time_limit,
            verbose: false,
        }
    }
}
