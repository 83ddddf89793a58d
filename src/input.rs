//! Common routines for handling input data.
use crate::settings::Settings;
use crate::writer::ModelWriter;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub mod network;
use network::read_model_file;
pub mod scenario;
use scenario::read_scenarios;

/// Format an error message to include the file path
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing `model.toml` and `scenarios.csv`
/// * `settings` - Program settings, which supply the default big-M
///
/// # Returns
///
/// A [`ModelWriter`] holding the network and scenarios, ready to create the model.
pub fn load_model(model_dir: &Path, settings: &Settings) -> Result<ModelWriter> {
    let (options, network) = read_model_file(model_dir, settings.big_m)?;
    let scenarios = read_scenarios(model_dir)?;

    Ok(ModelWriter::new(options)
        .with_network(network)
        .with_scenarios(scenarios))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Record {
        name: String,
        value: f64,
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "name = \"grid\"\nvalue = 10").unwrap();
        }

        assert_eq!(
            read_toml::<Record>(&file_path).unwrap(),
            Record {
                name: "grid".to_string(),
                value: 10.0
            }
        );

        // Missing field
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "name = \"grid\"").unwrap();
        }
        assert!(read_toml::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_input_err_msg() {
        assert_eq!(input_err_msg("model/model.toml"), "Error reading model/model.toml");
    }
}
