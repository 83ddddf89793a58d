//! The module responsible for writing output data to disk.
use crate::network::{ElementTable, Network};
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "mgplan_results";

/// The output file name for per-scenario results
pub const RESULTS_FILE_NAME: &str = "results.csv";

/// The output file name for the back-configured network
pub const NETWORK_FILE_NAME: &str = "network.csv";

/// Per-scenario results: one row per scenario, one column per (resource, attribute) pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsTable {
    num_scenarios: usize,
    columns: IndexMap<String, Vec<f64>>,
}

impl ResultsTable {
    /// Create an empty table for the given number of scenarios
    pub fn new(num_scenarios: usize) -> Self {
        Self {
            num_scenarios,
            columns: IndexMap::new(),
        }
    }

    /// The number of rows
    pub fn num_scenarios(&self) -> usize {
        self.num_scenarios
    }

    /// Add a column, which must have one value per scenario and a new name
    pub fn add_column(&mut self, name: String, values: Vec<f64>) -> Result<()> {
        ensure!(
            values.len() == self.num_scenarios,
            "Column {name} has {} values but there are {} scenarios",
            values.len(),
            self.num_scenarios
        );
        if self.columns.contains_key(&name) {
            bail!("Duplicate results column: {name}");
        }
        self.columns.insert(name, values);

        Ok(())
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Iterate over column names in insertion order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// The number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

/// A row of the network output file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct NetworkRow {
    table: String,
    name: String,
    bus: String,
    in_service: bool,
    pr_mw: Option<f64>,
    max_p_mw: Option<f64>,
    max_q_mvar: Option<f64>,
    max_e_mwh: Option<f64>,
}

/// Get the output directory for the model in the specified directory
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory.
///
/// If the directory already exists and contains files, this fails unless `allow_overwrite` is
/// set, in which case it is emptied first.
///
/// # Returns
///
/// Whether existing output was removed
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let mut overwrite = false;
    if output_dir.is_dir() {
        let is_empty = fs::read_dir(output_dir)?.next().is_none();
        if is_empty {
            return Ok(false);
        }
        ensure!(
            allow_overwrite,
            "Output folder {} already exists and is not empty. Use --overwrite to replace it.",
            output_dir.display()
        );
        fs::remove_dir_all(output_dir)?;
        overwrite = true;
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Write per-scenario results to `results.csv`
pub fn write_results(output_dir: &Path, results: &ResultsTable) -> Result<()> {
    let file_path = output_dir.join(RESULTS_FILE_NAME);
    let mut writer = csv::Writer::from_path(&file_path)?;

    writer.write_record(std::iter::once("scenario").chain(results.column_names()))?;
    for scenario in 0..results.num_scenarios() {
        let record = std::iter::once(scenario.to_string())
            .chain(results.columns.values().map(|column| column[scenario].to_string()));
        writer.write_record(record)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write the (back-configured) network elements to `network.csv`
pub fn write_network(output_dir: &Path, network: &Network) -> Result<()> {
    let file_path = output_dir.join(NETWORK_FILE_NAME);
    let mut writer = csv::Writer::from_path(&file_path)?;

    for table in ElementTable::iter() {
        for element in network.table(table) {
            writer.serialize(NetworkRow {
                table: table.to_string(),
                name: element.name.clone(),
                bus: element.bus.to_string(),
                in_service: element.in_service,
                pr_mw: element.pr_mw.map(|p| p.value()),
                max_p_mw: element.max_p_mw.map(|p| p.value()),
                max_q_mvar: element.max_q_mvar,
                max_e_mwh: element.max_e_mwh.map(|e| e.value()),
            })?;
        }
    }
    for line in &network.line {
        writer.serialize(NetworkRow {
            table: "line".to_string(),
            name: line.name.clone(),
            bus: format!("{}-{}", line.from_bus, line.to_bus),
            in_service: line.in_service,
            pr_mw: None,
            max_p_mw: None,
            max_q_mvar: None,
            max_e_mwh: None,
        })?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::network::{Element, LineElement};
    use crate::units::{Current, Power, Voltage};
    use itertools::Itertools;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_add_column_checks() {
        let mut table = ResultsTable::new(2);
        table.add_column("grid_p_mw".into(), vec![1.0, 2.0]).unwrap();
        assert_error!(
            table.add_column("grid_p_mw".into(), vec![1.0, 2.0]),
            "Duplicate results column: grid_p_mw"
        );
        assert_error!(
            table.add_column("pv_p_mw".into(), vec![1.0]),
            "Column pv_p_mw has 1 values but there are 2 scenarios"
        );
        assert_eq!(table.column("grid_p_mw"), Some([1.0, 2.0].as_slice()));
    }

    #[test]
    fn test_write_results() {
        let mut table = ResultsTable::new(2);
        table.add_column("grid_p_mw".into(), vec![4.0, 3.5]).unwrap();
        table.add_column("house_p_mw".into(), vec![-4.0, -3.5]).unwrap();

        let dir = tempdir().unwrap();
        write_results(dir.path(), &table).unwrap();

        let mut reader = csv::Reader::from_path(dir.path().join(RESULTS_FILE_NAME)).unwrap();
        assert_eq!(
            reader.headers().unwrap().iter().collect_vec(),
            ["scenario", "grid_p_mw", "house_p_mw"]
        );
        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|record| record.unwrap().iter().map(String::from).collect())
            .collect();
        assert_eq!(rows, [["0", "4", "-4"], ["1", "3.5", "-3.5"]]);
    }

    #[test]
    fn test_write_network() {
        let mut network = Network::default();
        network.add_bus("main", Voltage(13.2));
        network.add_bus("feeder", Voltage(13.2));
        let mut generator = Element::new("pv1", 1);
        generator.pr_mw = Some(Power(2.0));
        generator.max_q_mvar = Some(1.0);
        network
            .add_element(ElementTable::Generation, generator)
            .unwrap();
        network
            .add_line(LineElement::new("l1", 0, 1, Current(0.2)))
            .unwrap();

        let dir = tempdir().unwrap();
        write_network(dir.path(), &network).unwrap();

        let rows: Vec<NetworkRow> = csv::Reader::from_path(dir.path().join(NETWORK_FILE_NAME))
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            NetworkRow {
                table: "generation".into(),
                name: "pv1".into(),
                bus: "1".into(),
                in_service: true,
                pr_mw: Some(2.0),
                max_p_mw: None,
                max_q_mvar: Some(1.0),
                max_e_mwh: None,
            }
        );
        assert_eq!(rows[1].bus, "0-1");
    }

    #[test]
    fn test_create_output_directory_overwrite() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");
        assert!(!create_output_directory(&output_dir, false).unwrap());
        File::create(output_dir.join("old.csv")).unwrap();

        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(!output_dir.join("old.csv").exists());
    }
}
