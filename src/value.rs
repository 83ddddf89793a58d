//! Parameters which may vary from scenario to scenario.
//!
//! Any resource parameter (availability, operating cost, ...) may be a constant, a series with one
//! value per scenario, a function of the scenario record or a simulator. [`IndexedValue`] is the
//! closed set of these options; resources resolve it against a scenario without knowing which
//! one they hold.
use crate::id::ResourceID;
use crate::scenario::Scenario;
use anyhow::{Context, Result, ensure};
use std::fmt;
use std::rc::Rc;

/// Something which produces a value for a given scenario (e.g. a price or weather model)
pub trait Simulate {
    /// Produce the value for `scenario`
    fn simulate(&self, scenario: &Scenario) -> Result<f64>;
}

/// A plain function of the scenario record
pub type ScenarioFn = Rc<dyn Fn(&Scenario) -> Result<f64>>;

/// A parameter which may depend on the scenario
#[derive(Clone)]
pub enum IndexedValue {
    /// The same value for every scenario
    Constant(f64),
    /// One value per scenario, indexed by scenario position
    PerScenario(Rc<[f64]>),
    /// A function evaluated against the scenario record
    Function(ScenarioFn),
    /// A simulator evaluated against the scenario record
    Simulator(Rc<dyn Simulate>),
}

impl IndexedValue {
    /// Create an [`IndexedValue`] from a closure
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Scenario) -> Result<f64> + 'static,
    {
        Self::Function(Rc::new(f))
    }

    /// Create an [`IndexedValue`] from a simulator
    pub fn simulator<S: Simulate + 'static>(simulator: S) -> Self {
        Self::Simulator(Rc::new(simulator))
    }

    /// Resolve the value for the scenario at position `index`.
    ///
    /// Simulators take precedence over plain functions, which take precedence over per-scenario
    /// series; constants are passed through.
    pub fn resolve(&self, index: usize, scenario: &Scenario) -> Result<f64> {
        match self {
            Self::Simulator(simulator) => simulator.simulate(scenario),
            Self::Function(f) => f(scenario),
            Self::PerScenario(values) => values.get(index).copied().with_context(|| {
                format!(
                    "Scenario index {index} out of range for series of length {}",
                    values.len()
                )
            }),
            Self::Constant(value) => Ok(*value),
        }
    }

    /// The value if it does not depend on the scenario
    pub fn as_constant(&self) -> Option<f64> {
        match self {
            Self::Constant(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Debug for IndexedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => write!(f, "Constant({value})"),
            Self::PerScenario(values) => write!(f, "PerScenario({values:?})"),
            Self::Function(_) => write!(f, "Function"),
            Self::Simulator(_) => write!(f, "Simulator"),
        }
    }
}

impl From<f64> for IndexedValue {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}

impl From<Vec<f64>> for IndexedValue {
    fn from(values: Vec<f64>) -> Self {
        Self::PerScenario(values.into())
    }
}

/// Resolve an optional parameter of a resource.
///
/// If the parameter is absent, `default` is used; if there is no default either, the error names
/// the resource and field.
pub fn resolve_param(
    value: Option<&IndexedValue>,
    default: Option<f64>,
    index: usize,
    scenario: &Scenario,
    resource: &ResourceID,
    field: &str,
) -> Result<f64> {
    let value = match (value, default) {
        (Some(value), _) => value
            .resolve(index, scenario)
            .with_context(|| format!("Could not evaluate {field} for resource {resource}"))?,
        (None, Some(default)) => default,
        (None, None) => anyhow::bail!("No value or default for {field} of resource {resource}"),
    };

    ensure!(
        value.is_finite(),
        "Non-finite value for {field} of resource {resource} in scenario {index}"
    );

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;

    struct Doubler;

    impl Simulate for Doubler {
        fn simulate(&self, scenario: &Scenario) -> Result<f64> {
            Ok(2.0 * scenario.hour)
        }
    }

    fn scenario_at(hour: f64) -> Scenario {
        Scenario {
            hour,
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_constant() {
        let value = IndexedValue::from(3.5);
        assert_eq!(value.resolve(7, &scenario_at(1.0)).unwrap(), 3.5);
        assert_eq!(value.as_constant(), Some(3.5));
    }

    #[test]
    fn test_resolve_per_scenario() {
        let value = IndexedValue::from(vec![1.0, 2.0, 3.0]);
        assert_eq!(value.resolve(1, &scenario_at(0.0)).unwrap(), 2.0);
        assert_error!(
            value.resolve(3, &scenario_at(0.0)),
            "Scenario index 3 out of range for series of length 3"
        );
    }

    #[test]
    fn test_resolve_function_and_simulator() {
        let function = IndexedValue::function(|s| Ok(s.hour + 1.0));
        assert_eq!(function.resolve(0, &scenario_at(5.0)).unwrap(), 6.0);

        let simulator = IndexedValue::simulator(Doubler);
        assert_eq!(simulator.resolve(0, &scenario_at(5.0)).unwrap(), 10.0);
        assert_eq!(simulator.as_constant(), None);
    }

    #[test]
    fn test_resolve_param_default() {
        let id = ResourceID::new("grid");
        let scenario = scenario_at(0.0);
        assert_eq!(
            resolve_param(None, Some(1.0), 0, &scenario, &id, "pa_pu").unwrap(),
            1.0
        );
        assert_error!(
            resolve_param(None, None, 0, &scenario, &id, "oc_1"),
            "No value or default for oc_1 of resource grid"
        );
    }

    #[test]
    fn test_resolve_param_names_field_on_failure() {
        let id = ResourceID::new("pv1");
        let value = IndexedValue::function(|s| s.require("solar_irradiance"));
        assert_error!(
            resolve_param(Some(&value), None, 0, &scenario_at(0.0), &id, "pa_pu"),
            "Could not evaluate pa_pu for resource pv1"
        );
    }
}
