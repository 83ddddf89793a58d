//! Scenarios are the discretised instants of the planning horizon.
//!
//! Every per-scene decision variable is indexed by the position of a [`Scenario`] in the
//! [`ScenarioTable`]. The table is produced elsewhere (e.g. by a scene builder which tiles weather
//! and price simulators) and is only ever read here.
use crate::units::Hours;
use anyhow::{Context, Result};
use indexmap::IndexMap;

/// The names of the columns which every scenario must provide
pub const STANDARD_FIELDS: [&str; 7] = ["year", "day", "hour", "dt", "dd", "discount", "growth"];

/// One row of the scenario table
#[derive(PartialEq, Debug, Clone)]
pub struct Scenario {
    /// Year of analysis (zero-based or calendar year)
    pub year: f64,
    /// Day of the year, from 0
    pub day: f64,
    /// Hour of the day (may be fractional)
    pub hour: f64,
    /// Duration represented by this scenario
    pub dt: Hours,
    /// Number of times this scenario is repeated (e.g. simulated days represented)
    pub dd: f64,
    /// Discount factor applied to costs incurred in this scenario
    pub discount: f64,
    /// Demand growth coefficient
    pub growth: f64,
    /// Weather/price-derived fields, e.g. `solar_irradiance` or `wind_speed`
    pub fields: IndexMap<String, f64>,
}

impl Default for Scenario {
    /// A single hour with unit weights and no additional fields
    fn default() -> Self {
        Self {
            year: 0.0,
            day: 0.0,
            hour: 0.0,
            dt: Hours(1.0),
            dd: 1.0,
            discount: 1.0,
            growth: 1.0,
            fields: IndexMap::new(),
        }
    }
}

impl Scenario {
    /// Look up a field by name, including the standard fields.
    ///
    /// Returns `None` if there is no such field.
    pub fn get(&self, field: &str) -> Option<f64> {
        match field {
            "year" => Some(self.year),
            "day" => Some(self.day),
            "hour" => Some(self.hour),
            "dt" => Some(self.dt.value()),
            "dd" => Some(self.dd),
            "discount" => Some(self.discount),
            "growth" => Some(self.growth),
            _ => self.fields.get(field).copied(),
        }
    }

    /// Look up a field by name, returning an error if it is absent
    pub fn require(&self, field: &str) -> Result<f64> {
        self.get(field)
            .with_context(|| format!("Scenario field '{field}' not defined"))
    }

    /// Add or replace a non-standard field
    pub fn with_field(mut self, field: &str, value: f64) -> Self {
        self.fields.insert(field.to_string(), value);
        self
    }

    /// The weight which converts an hourly cost in this scenario into a lifecycle cost
    pub fn cost_weight(&self) -> f64 {
        self.dt.value() * self.dd * self.discount
    }
}

/// The ordered collection of scenarios for one optimisation run
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ScenarioTable(Vec<Scenario>);

impl ScenarioTable {
    /// Create a new [`ScenarioTable`]
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self(scenarios)
    }

    /// The number of scenarios
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no scenarios
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the scenario at the given index
    pub fn get(&self, index: usize) -> Option<&Scenario> {
        self.0.get(index)
    }

    /// Iterate over scenarios in index order
    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.0.iter()
    }

    /// Iterate over scenario indices
    pub fn indices(&self) -> std::ops::Range<usize> {
        0..self.0.len()
    }
}

impl std::ops::Index<usize> for ScenarioTable {
    type Output = Scenario;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl FromIterator<Scenario> for ScenarioTable {
    fn from_iter<T: IntoIterator<Item = Scenario>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_scenario_get() {
        let scenario = Scenario {
            hour: 14.0,
            dt: Hours(0.5),
            ..Default::default()
        }
        .with_field("wind_speed", 7.5);

        assert_eq!(scenario.get("hour"), Some(14.0));
        assert_eq!(scenario.get("dt"), Some(0.5));
        assert_eq!(scenario.get("wind_speed"), Some(7.5));
        assert_eq!(scenario.get("solar_irradiance"), None);
    }

    #[test]
    fn test_scenario_require_missing() {
        let scenario = Scenario::default();
        assert_eq!(
            scenario.require("solar_irradiance").unwrap_err().to_string(),
            "Scenario field 'solar_irradiance' not defined"
        );
    }

    #[test]
    fn test_cost_weight() {
        let scenario = Scenario {
            dt: Hours(2.0),
            dd: 30.0,
            discount: 0.5,
            ..Default::default()
        };
        assert_approx_eq!(f64, scenario.cost_weight(), 30.0);
    }
}
