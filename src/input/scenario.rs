//! Code for reading the scenario table from a CSV file.
use super::input_err_msg;
use crate::scenario::{STANDARD_FIELDS, Scenario, ScenarioTable};
use crate::units::Hours;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use std::path::Path;

/// The name of the scenarios file in the model directory
pub const SCENARIOS_FILE_NAME: &str = "scenarios.csv";

/// Read the scenario table from the model directory.
///
/// The file must have the columns `year, day, hour, dt, dd, discount, growth`. Every other column
/// becomes a named field of each scenario (e.g. `solar_irradiance`).
pub fn read_scenarios(model_dir: &Path) -> Result<ScenarioTable> {
    let file_path = model_dir.join(SCENARIOS_FILE_NAME);
    read_scenarios_from_path(&file_path).with_context(|| input_err_msg(&file_path))
}

fn read_scenarios_from_path(file_path: &Path) -> Result<ScenarioTable> {
    let mut reader = csv::Reader::from_path(file_path)?;
    let headers = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect::<Vec<_>>();
    for field in STANDARD_FIELDS {
        ensure!(
            headers.iter().any(|header| header == field),
            "Missing column: {field}"
        );
    }

    let mut scenarios = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let values = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| {
                let parsed = value.trim().parse::<f64>().ok().filter(|v| v.is_finite());
                let parsed = parsed.with_context(|| {
                    format!("Invalid value '{value}' for {header} in scenario {row}")
                })?;
                Ok((header.clone(), parsed))
            })
            .collect::<Result<IndexMap<_, _>>>()?;
        scenarios.push(scenario_from_values(values));
    }
    ensure!(!scenarios.is_empty(), "No scenarios defined");

    Ok(ScenarioTable::new(scenarios))
}

/// Split a row into the standard fields and the named extras
fn scenario_from_values(mut values: IndexMap<String, f64>) -> Scenario {
    let mut take = |field: &str| values.shift_remove(field).unwrap_or_default();
    Scenario {
        year: take("year"),
        day: take("day"),
        hour: take("hour"),
        dt: Hours(take("dt")),
        dd: take("dd"),
        discount: take("discount"),
        growth: take("growth"),
        fields: values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_scenarios(dir: &Path, contents: &str) {
        let mut file = File::create(dir.join(SCENARIOS_FILE_NAME)).unwrap();
        write!(file, "{contents}").unwrap();
    }

    #[test]
    fn test_read_scenarios() {
        let dir = tempdir().unwrap();
        write_scenarios(
            dir.path(),
            "year,day,hour,dt,dd,discount,growth,solar_irradiance\n\
             0,0,12,1,30,1,1,850\n\
             0,0,13,0.5,30,0.9,1,700\n",
        );

        let scenarios = read_scenarios(dir.path()).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[1].hour, 13.0);
        assert_eq!(scenarios[1].dt, Hours(0.5));
        assert_eq!(scenarios[1].discount, 0.9);
        assert_eq!(scenarios[0].get("solar_irradiance"), Some(850.0));
        assert_eq!(scenarios[0].fields.len(), 1);
    }

    #[test]
    fn test_read_scenarios_missing_column() {
        let dir = tempdir().unwrap();
        write_scenarios(dir.path(), "year,day,hour,dt,dd,growth\n0,0,0,1,1,1\n");

        let err = read_scenarios(dir.path()).unwrap_err();
        assert_eq!(
            err.chain().nth(1).unwrap().to_string(),
            "Missing column: discount"
        );
    }

    #[test]
    fn test_read_scenarios_bad_value() {
        let dir = tempdir().unwrap();
        write_scenarios(
            dir.path(),
            "year,day,hour,dt,dd,discount,growth\n0,0,0,1,1,1,1\n0,0,x,1,1,1,1\n",
        );

        assert_error!(
            read_scenarios_from_path(&dir.path().join(SCENARIOS_FILE_NAME)),
            "Invalid value 'x' for hour in scenario 1"
        );
    }

    #[test]
    fn test_read_scenarios_empty() {
        let dir = tempdir().unwrap();
        write_scenarios(dir.path(), "year,day,hour,dt,dd,discount,growth\n");

        assert_error!(
            read_scenarios_from_path(&dir.path().join(SCENARIOS_FILE_NAME)),
            "No scenarios defined"
        );
    }
}
