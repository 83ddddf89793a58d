//! Availability and price profiles which can be plugged into an [`IndexedValue`].
//!
//! These turn weather or time fields of a [`Scenario`] into per-unit availability factors or
//! prices. Values outside the physical range a profile accepts are reported as errors naming the
//! offending field.
use crate::scenario::Scenario;
use crate::value::{IndexedValue, Simulate};
use anyhow::{Result, ensure};

/// The scenario field holding solar irradiance in W/m²
pub const SOLAR_IRRADIANCE_FIELD: &str = "solar_irradiance";

/// The scenario field holding wind speed in m/s
pub const WIND_SPEED_FIELD: &str = "wind_speed";

/// Irradiance which yields the rated output of a PV plant
const STANDARD_IRRADIANCE: f64 = 1000.0;

/// Upper limit of the irradiance model
const MAX_IRRADIANCE: f64 = 1200.0;

/// Per-unit output of a PV plant as a function of solar irradiance
#[derive(Debug, Clone)]
pub struct SolarAvailability {
    /// The scenario field to read irradiance from
    pub field: String,
}

impl Default for SolarAvailability {
    fn default() -> Self {
        Self {
            field: SOLAR_IRRADIANCE_FIELD.to_string(),
        }
    }
}

impl Simulate for SolarAvailability {
    fn simulate(&self, scenario: &Scenario) -> Result<f64> {
        let irradiance = scenario.require(&self.field)?;
        ensure!(
            (0.0..MAX_IRRADIANCE).contains(&irradiance),
            "{} outside model range: {irradiance}",
            self.field
        );

        Ok(irradiance / STANDARD_IRRADIANCE)
    }
}

/// Per-unit output of a wind turbine as a function of wind speed.
///
/// Output is zero below the cut-in speed, rises linearly up to the rated speed, stays at one
/// until the cut-out speed and is zero beyond.
#[derive(Debug, Clone)]
pub struct WindAvailability {
    /// The scenario field to read wind speed from
    pub field: String,
    /// Cut-in speed (m/s)
    pub cut_in: f64,
    /// Speed at which rated output is reached (m/s)
    pub rated: f64,
    /// Cut-out speed (m/s)
    pub cut_out: f64,
}

impl Default for WindAvailability {
    fn default() -> Self {
        Self {
            field: WIND_SPEED_FIELD.to_string(),
            cut_in: 3.0,
            rated: 15.0,
            cut_out: 25.0,
        }
    }
}

impl Simulate for WindAvailability {
    fn simulate(&self, scenario: &Scenario) -> Result<f64> {
        let speed = scenario.require(&self.field)?;
        ensure!(speed >= 0.0, "{} outside model range: {speed}", self.field);

        let output = if speed < self.cut_in || speed >= self.cut_out {
            0.0
        } else if speed < self.rated {
            (speed - self.cut_in) / (self.rated - self.cut_in)
        } else {
            1.0
        };

        Ok(output)
    }
}

/// A piecewise-constant tariff by hour of day.
///
/// The value for an hour is the one paired with the first breakpoint strictly greater than the
/// hour. Hours past the last breakpoint take the first value.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeOfUsePrice {
    /// Hour breakpoints, ascending
    pub hours: Vec<f64>,
    /// Price for each interval ending at the corresponding breakpoint
    pub values: Vec<f64>,
}

impl TimeOfUsePrice {
    /// Create a new [`TimeOfUsePrice`], checking that breakpoints and values match
    pub fn new(hours: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        ensure!(!hours.is_empty(), "Time-of-use price needs at least one breakpoint");
        ensure!(
            hours.len() == values.len(),
            "Time-of-use price has {} breakpoints but {} values",
            hours.len(),
            values.len()
        );
        ensure!(
            hours.windows(2).all(|w| w[0] < w[1]),
            "Time-of-use breakpoints must be strictly increasing"
        );

        Ok(Self { hours, values })
    }

    /// A peak/valley/rest tariff: valley overnight, rest during the day, peak in the evening
    pub fn peak_valley_rest(peak: f64, valley: f64, rest: f64) -> Self {
        Self {
            hours: vec![6.0, 18.0, 23.0, 24.0],
            values: vec![valley, rest, peak, valley],
        }
    }

    /// The price at the given hour
    pub fn price_at(&self, hour: f64) -> f64 {
        self.hours
            .iter()
            .position(|&breakpoint| hour < breakpoint)
            .map_or(self.values[0], |i| self.values[i])
    }
}

impl Simulate for TimeOfUsePrice {
    fn simulate(&self, scenario: &Scenario) -> Result<f64> {
        Ok(self.price_at(scenario.hour))
    }
}

/// Reads a scenario field, optionally scaled
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioColumn {
    /// The field to read
    pub field: String,
    /// Factor applied to the field's value
    pub scale: f64,
}

impl Simulate for ScenarioColumn {
    fn simulate(&self, scenario: &Scenario) -> Result<f64> {
        Ok(scenario.require(&self.field)? * self.scale)
    }
}

/// Availability factor for a PV plant
pub fn solar() -> IndexedValue {
    IndexedValue::simulator(SolarAvailability::default())
}

/// Availability factor for a wind turbine
pub fn wind() -> IndexedValue {
    IndexedValue::simulator(WindAvailability::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn with_field(field: &str, value: f64) -> Scenario {
        Scenario::default().with_field(field, value)
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(500.0, 0.5)]
    #[case(1100.0, 1.1)]
    fn test_solar_availability(#[case] irradiance: f64, #[case] expected: f64) {
        let scenario = with_field(SOLAR_IRRADIANCE_FIELD, irradiance);
        assert_approx_eq!(
            f64,
            SolarAvailability::default().simulate(&scenario).unwrap(),
            expected
        );
    }

    #[rstest]
    #[case(-1.0)]
    #[case(1200.0)]
    fn test_solar_availability_out_of_range(#[case] irradiance: f64) {
        let scenario = with_field(SOLAR_IRRADIANCE_FIELD, irradiance);
        assert_error!(
            SolarAvailability::default().simulate(&scenario),
            format!("solar_irradiance outside model range: {irradiance}")
        );
    }

    #[test]
    fn test_solar_availability_missing_field() {
        assert_error!(
            SolarAvailability::default().simulate(&Scenario::default()),
            "Scenario field 'solar_irradiance' not defined"
        );
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(2.9, 0.0)]
    #[case(3.0, 0.0)]
    #[case(9.0, 0.5)]
    #[case(15.0, 1.0)]
    #[case(24.9, 1.0)]
    #[case(25.0, 0.0)]
    fn test_wind_availability(#[case] speed: f64, #[case] expected: f64) {
        let scenario = with_field(WIND_SPEED_FIELD, speed);
        assert_approx_eq!(
            f64,
            WindAvailability::default().simulate(&scenario).unwrap(),
            expected
        );
    }

    #[test]
    fn test_wind_availability_negative() {
        let scenario = with_field(WIND_SPEED_FIELD, -2.0);
        assert!(WindAvailability::default().simulate(&scenario).is_err());
    }

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(5.99, 1.0)]
    #[case(6.0, 3.0)]
    #[case(18.5, 5.0)]
    #[case(23.5, 1.0)]
    #[case(30.0, 1.0)]
    fn test_time_of_use_price(#[case] hour: f64, #[case] expected: f64) {
        let tariff = TimeOfUsePrice::peak_valley_rest(5.0, 1.0, 3.0);
        assert_eq!(tariff.price_at(hour), expected);
    }

    #[test]
    fn test_time_of_use_price_new_invalid() {
        assert!(TimeOfUsePrice::new(vec![], vec![]).is_err());
        assert!(TimeOfUsePrice::new(vec![6.0, 18.0], vec![1.0]).is_err());
        assert!(TimeOfUsePrice::new(vec![18.0, 6.0], vec![1.0, 2.0]).is_err());
        assert!(TimeOfUsePrice::new(vec![6.0, 24.0], vec![1.0, 2.0]).is_ok());
    }

    #[test]
    fn test_scenario_column() {
        let column = ScenarioColumn {
            field: "price".into(),
            scale: 1e-3,
        };
        let scenario = with_field("price", 150.0);
        assert_approx_eq!(f64, column.simulate(&scenario).unwrap(), 0.15);
    }
}
