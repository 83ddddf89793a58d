//! Fixtures for tests
use crate::scenario::{Scenario, ScenarioTable};
use crate::units::Hours;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Create `count` hourly scenarios with unit weights, starting at midnight
pub fn hourly_scenarios(count: usize) -> ScenarioTable {
    (0..count)
        .map(|hour| Scenario {
            hour: hour as f64,
            ..Default::default()
        })
        .collect()
}

/// Four hourly scenarios with unit weights
#[fixture]
pub fn scenarios() -> ScenarioTable {
    hourly_scenarios(4)
}

/// Two scenarios with non-trivial weights and weather fields
#[fixture]
pub fn weighted_scenarios() -> ScenarioTable {
    ScenarioTable::new(vec![
        Scenario {
            hour: 12.0,
            dt: Hours(1.0),
            dd: 2.0,
            discount: 0.5,
            ..Default::default()
        }
        .with_field("solar_irradiance", 800.0)
        .with_field("wind_speed", 9.0),
        Scenario {
            hour: 20.0,
            dt: Hours(2.0),
            dd: 1.0,
            discount: 0.25,
            ..Default::default()
        }
        .with_field("solar_irradiance", 0.0)
        .with_field("wind_speed", 15.0),
    ])
}
