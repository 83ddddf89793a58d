//! Code for reading the network description and its resources from `model.toml`.
use super::{input_err_msg, read_toml};
use crate::network::{Bus, Element, ElementTable, LineElement, Network};
use crate::profile::{ScenarioColumn, TimeOfUsePrice, solar, wind};
use crate::resource::{
    CostParams, DiscreteGenerator, ExternalGrid, Generator, Load, Resource, ResourceParams,
    Storage, TransmissionLine,
};
use crate::units::{Current, Energy, Power, Voltage};
use crate::value::IndexedValue;
use crate::writer::WriterOptions;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

/// The name of the model file in the model directory
pub const MODEL_FILE_NAME: &str = "model.toml";

fn default_true() -> bool {
    true
}

fn default_scale() -> f64 {
    1.0
}

/// The contents of `model.toml`
#[derive(Debug, Deserialize)]
struct ModelFile {
    #[serde(default)]
    writer: WriterOptions,
    #[serde(default)]
    bus: Vec<BusRaw>,
    #[serde(default)]
    line: Vec<LineRaw>,
    #[serde(default)]
    ext_grid: Vec<ElementRaw>,
    #[serde(default)]
    load: Vec<ElementRaw>,
    #[serde(default)]
    generation: Vec<ElementRaw>,
    #[serde(default)]
    storage: Vec<ElementRaw>,
}

#[derive(Debug, Deserialize)]
struct BusRaw {
    #[serde(default)]
    name: String,
    vn_kv: f64,
}

#[derive(Debug, Deserialize)]
struct ElementRaw {
    name: String,
    bus: usize,
    #[serde(default = "default_true")]
    in_service: bool,
    pr_mw: Option<f64>,
    max_p_mw: Option<f64>,
    max_q_mvar: Option<f64>,
    max_e_mwh: Option<f64>,
    resource: Option<ResourceRaw>,
}

#[derive(Debug, Deserialize)]
struct LineRaw {
    name: String,
    from_bus: usize,
    to_bus: usize,
    max_i_ka: f64,
    #[serde(default = "default_true")]
    in_service: bool,
    resource: Option<ResourceRaw>,
}

/// The resource bound to an element.
///
/// Which variant is built depends on the table the element is in. A generator with a
/// `unit_size_mw` is built from whole units.
#[derive(Debug, Default, Deserialize)]
struct ResourceRaw {
    /// Defaults to the element name
    name: Option<String>,
    /// Defaults to the element's rating
    pr_mw: Option<f64>,
    #[serde(default)]
    decide_construction: bool,
    #[serde(default)]
    size: bool,
    pa_pu: Option<ValueRaw>,
    #[serde(default)]
    ic_0: f64,
    #[serde(default)]
    ic_1: f64,
    oc_0: Option<ValueRaw>,
    oc_1: Option<ValueRaw>,
    big_m: Option<f64>,
    unit_size_mw: Option<f64>,
    #[serde(default)]
    ic_unit: f64,
    er_mwh: Option<f64>,
    eta_bb: Option<f64>,
    sigma: Option<f64>,
    #[serde(default)]
    ic_1_cap: f64,
    max_i_pu: Option<f64>,
    soft_limit_coefficient: Option<f64>,
}

/// A parameter which may depend on the scenario, as written in the model file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ValueRaw {
    Constant(f64),
    Series(Vec<f64>),
    Column {
        column: String,
        #[serde(default = "default_scale")]
        scale: f64,
    },
    Profile(ProfileRaw),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "profile", rename_all = "snake_case")]
enum ProfileRaw {
    Solar,
    Wind,
    TimeOfUse { hours: Vec<f64>, values: Vec<f64> },
}

impl ValueRaw {
    fn into_indexed_value(self) -> Result<IndexedValue> {
        let value = match self {
            Self::Constant(value) => IndexedValue::from(value),
            Self::Series(values) => IndexedValue::from(values),
            Self::Column { column, scale } => IndexedValue::simulator(ScenarioColumn {
                field: column,
                scale,
            }),
            Self::Profile(ProfileRaw::Solar) => solar(),
            Self::Profile(ProfileRaw::Wind) => wind(),
            Self::Profile(ProfileRaw::TimeOfUse { hours, values }) => {
                IndexedValue::simulator(TimeOfUsePrice::new(hours, values)?)
            }
        };

        Ok(value)
    }
}

fn into_indexed_value(value: Option<ValueRaw>) -> Result<Option<IndexedValue>> {
    value.map(ValueRaw::into_indexed_value).transpose()
}

impl ResourceRaw {
    /// The parameters shared by every variant.
    ///
    /// `default_name` and `default_pr` come from the element the resource is bound to.
    fn params(
        &mut self,
        default_name: &str,
        default_pr: Option<f64>,
        default_big_m: f64,
    ) -> Result<ResourceParams> {
        let name = self.name.take().unwrap_or_else(|| default_name.to_string());
        let pr = self
            .pr_mw
            .or(default_pr)
            .with_context(|| format!("Resource {name} needs a rated power (pr_mw)"))?;
        ensure!(
            !self.size || self.decide_construction,
            "Resource {name} can only be sized if its construction is a decision"
        );

        let mut params = ResourceParams::new(&name, Power(pr));
        if self.decide_construction {
            params = params.with_construction(self.size);
        }
        params.pa_pu = into_indexed_value(self.pa_pu.take())?;
        params.costs = CostParams {
            ic_0: self.ic_0,
            ic_1: self.ic_1,
            oc_0: into_indexed_value(self.oc_0.take())?,
            oc_1: into_indexed_value(self.oc_1.take())?,
        };
        params.big_m = self.big_m.unwrap_or(default_big_m);

        Ok(params)
    }
}

/// Build the resource for a row of one of the single-bus tables
fn create_resource(
    table: ElementTable,
    element: &ElementRaw,
    mut raw: ResourceRaw,
    default_big_m: f64,
) -> Result<Box<dyn Resource>> {
    let default_pr = element.pr_mw.or(element.max_p_mw);
    let params = raw.params(&element.name, default_pr, default_big_m)?;
    let resource: Box<dyn Resource> = match table {
        ElementTable::ExtGrid => Box::new(ExternalGrid::new(params)),
        ElementTable::Load => Box::new(Load::new(params)),
        ElementTable::Generation => match raw.unit_size_mw {
            Some(unit_size) => Box::new(DiscreteGenerator::new(
                params,
                Power(unit_size),
                raw.ic_unit,
            )?),
            None => Box::new(Generator::new(params)),
        },
        ElementTable::Storage => {
            let er = raw.er_mwh.or(element.max_e_mwh).with_context(|| {
                format!("Storage {} needs an energy rating (er_mwh)", params.name)
            })?;
            let mut storage = Storage::new(params, Energy(er)).with_energy_cost(raw.ic_1_cap);
            if let Some(eta_bb) = raw.eta_bb {
                storage = storage.with_round_trip_efficiency(eta_bb)?;
            }
            if let Some(sigma) = raw.sigma {
                storage = storage.with_self_discharge(sigma)?;
            }
            Box::new(storage)
        }
    };

    Ok(resource)
}

/// Build the resource for a row of the line table.
///
/// The rating defaults to the one derived from the line's rated current.
fn create_line_resource(
    line: &LineElement,
    buses: &[Bus],
    mut raw: ResourceRaw,
    options: &WriterOptions,
    default_big_m: f64,
) -> Result<TransmissionLine> {
    let default_pr = line.rating(buses, options.three_phase).value();
    let params = raw.params(&line.name, Some(default_pr), default_big_m)?;
    let mut resource = TransmissionLine::new(params)?;
    if let Some(max_i_pu) = raw.max_i_pu.or(options.max_i_pu) {
        resource = resource.with_max_current(max_i_pu)?;
    }
    if let Some(coefficient) = raw.soft_limit_coefficient {
        resource = resource.with_soft_limit(coefficient);
    }

    Ok(resource)
}

fn create_element(
    table: ElementTable,
    mut raw: ElementRaw,
    default_big_m: f64,
) -> Result<Element> {
    let resource = match raw.resource.take() {
        Some(resource) => Some(create_resource(table, &raw, resource, default_big_m)?),
        None => None,
    };

    let mut element = Element::new(&raw.name, raw.bus);
    element.in_service = raw.in_service;
    element.pr_mw = raw.pr_mw.map(Power);
    element.max_p_mw = raw.max_p_mw.map(Power);
    element.max_q_mvar = raw.max_q_mvar;
    element.max_e_mwh = raw.max_e_mwh.map(Energy);
    element.resource = resource;

    Ok(element)
}

/// Build the network and writer options from the parsed file
fn create_network(file: ModelFile, default_big_m: f64) -> Result<(WriterOptions, Network)> {
    let mut options = file.writer;
    options.big_m = default_big_m;

    let mut network = Network::default();
    for bus in file.bus {
        ensure!(
            bus.vn_kv.is_finite() && bus.vn_kv > 0.0,
            "Nominal voltage of bus {} must be positive",
            bus.name
        );
        network.add_bus(&bus.name, Voltage(bus.vn_kv));
    }

    let tables = [
        (ElementTable::ExtGrid, file.ext_grid),
        (ElementTable::Load, file.load),
        (ElementTable::Generation, file.generation),
        (ElementTable::Storage, file.storage),
    ];
    for (table, elements) in tables {
        for raw in elements {
            let name = raw.name.clone();
            let element = create_element(table, raw, default_big_m)
                .with_context(|| format!("Invalid {table} element {name}"))?;
            network.add_element(table, element)?;
        }
    }

    for raw in file.line {
        let mut line = LineElement::new(&raw.name, raw.from_bus, raw.to_bus, Current(raw.max_i_ka));
        line.in_service = raw.in_service;
        network.check_bus(line.from_bus, &line.name)?;
        network.check_bus(line.to_bus, &line.name)?;
        if let Some(resource) = raw.resource {
            line.resource = Some(
                create_line_resource(&line, &network.buses, resource, &options, default_big_m)
                    .with_context(|| format!("Invalid line {}", raw.name))?,
            );
        }
        network.add_line(line)?;
    }

    Ok((options, network))
}

/// Read the network description and writer options from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing `model.toml`
/// * `default_big_m` - Big-M for resources which do not set their own
pub fn read_model_file(model_dir: &Path, default_big_m: f64) -> Result<(WriterOptions, Network)> {
    let file_path = model_dir.join(MODEL_FILE_NAME);
    let file: ModelFile = read_toml(&file_path)?;
    create_network(file, default_big_m).with_context(|| input_err_msg(&file_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, weighted_scenarios};
    use crate::optimisation::OptimisationModel;
    use crate::resource::{DEFAULT_BIG_M, ResourceKind};
    use crate::scenario::ScenarioTable;
    use crate::writer::Topology;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    const MODEL_TOML: &str = r#"
[writer]
topology = "multi"
max_investment = 1e6

[[bus]]
name = "main"
vn_kv = 13.2

[[bus]]
vn_kv = 13.2

[[line]]
name = "l1"
from_bus = 0
to_bus = 1
max_i_ka = 0.2

[[line]]
name = "l2"
from_bus = 1
to_bus = 0
max_i_ka = 0.1
[line.resource]
soft_limit_coefficient = 10.0

[[ext_grid]]
name = "grid"
bus = 0
[ext_grid.resource]
pr_mw = 10.0
oc_1 = { profile = "time_of_use", hours = [12, 24], values = [1.0, 2.0] }

[[load]]
name = "house"
bus = 1
pr_mw = 2.0
[load.resource]
pa_pu = { column = "demand", scale = 0.5 }

[[generation]]
name = "pv1"
bus = 1
[generation.resource]
pr_mw = 0.0
decide_construction = true
size = true
pa_pu = { profile = "solar" }
ic_1 = 1000.0
big_m = 50.0

[[generation]]
name = "diesel"
bus = 0
in_service = false
[generation.resource]
pr_mw = 1.5
unit_size_mw = 0.5
ic_unit = 10.0

[[storage]]
name = "bess"
bus = 0
max_e_mwh = 4.0
[storage.resource]
pr_mw = 1.0
eta_bb = 0.9
"#;

    fn parse(contents: &str) -> Result<(WriterOptions, Network)> {
        let file: ModelFile = toml::from_str(contents)?;
        create_network(file, DEFAULT_BIG_M)
    }

    #[test]
    fn test_read_model_file() {
        let (options, network) = parse(MODEL_TOML).unwrap();
        assert_eq!(options.topology, Topology::Multi);
        assert_eq!(options.max_investment, Some(1e6));
        assert_eq!(network.buses.len(), 2);
        assert_eq!(network.buses[1].label(1), "1");

        let kinds = network
            .active_elements()
            .map(|(_, resource)| resource.kind())
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            [
                ResourceKind::ExternalGrid,
                ResourceKind::Load,
                ResourceKind::Generator,
                ResourceKind::Storage
            ]
        );
        assert_eq!(
            network.generation[1].resource.as_ref().unwrap().kind(),
            ResourceKind::DiscreteGenerator
        );
        assert!(!network.generation[1].in_service);
        assert!(network.generation[0].resource.as_ref().unwrap().is_sizeable());

        // Only the second line has a resource; the first is left to the writer
        assert!(network.line[0].resource.is_none());
        assert_eq!(network.line[1].resource.as_ref().unwrap().name().as_str(), "l2");
    }

    #[rstest]
    fn test_values_resolve(weighted_scenarios: ScenarioTable) {
        let scenarios = ScenarioTable::new(
            weighted_scenarios
                .iter()
                .zip([4.0, 6.0])
                .map(|(scenario, demand)| scenario.clone().with_field("demand", demand))
                .collect(),
        );
        let (_, mut network) = parse(MODEL_TOML).unwrap();
        let mut model = OptimisationModel::new();
        for element in network
            .ext_grid
            .iter_mut()
            .chain(network.load.iter_mut())
            .chain(network.generation.iter_mut().take(1))
        {
            element
                .resource
                .as_mut()
                .unwrap()
                .initialise(&mut model, &scenarios)
                .unwrap();
        }

        // Demand of 2 MW scaled by half the scenario's demand field
        let load = network.load[0].resource.as_ref().unwrap();
        assert_approx_eq!(f64, load.available_power(1, None).unwrap(), 6.0);

        // Time-of-use price: hour 12 is in the second interval, hour 20 too
        let grid = network.ext_grid[0].resource.as_ref().unwrap();
        let p = model.find_variable("grid_p_mw[0]").unwrap();
        assert_eq!(grid.operating_cost(0).unwrap().coefficient(p), 2.0);

        // Solar availability from irradiance of 800 W/m²
        let pv = network.generation[0].resource.as_ref().unwrap();
        let pv_p = model.find_variable("pv1_p_mw[0]").unwrap();
        let pr = model.find_variable("pv1_pr_mw").unwrap();
        let row = model.constraint("pv1_p_constraint[0]").unwrap();
        assert_eq!(row.expr.coefficient(pv_p), 1.0);
        assert_approx_eq!(f64, row.expr.coefficient(pr), -0.8);
        assert!(model.constraint("pv1_p_M_constraint").is_some());
        assert!(pv.is_sizeable());
    }

    #[test]
    fn test_missing_rating() {
        let contents = r#"
[[bus]]
vn_kv = 0.4

[[ext_grid]]
name = "grid"
bus = 0
[ext_grid.resource]
oc_1 = 0.1
"#;
        let err = parse(contents).unwrap_err();
        assert_eq!(err.to_string(), "Invalid ext_grid element grid");
        assert_eq!(
            err.chain().nth(1).unwrap().to_string(),
            "Resource grid needs a rated power (pr_mw)"
        );
    }

    #[test]
    fn test_size_without_construction() {
        let contents = r#"
[[bus]]
vn_kv = 0.4

[[generation]]
name = "pv1"
bus = 0
[generation.resource]
pr_mw = 1.0
size = true
"#;
        let err = parse(contents).unwrap_err();
        assert_eq!(
            err.chain().nth(1).unwrap().to_string(),
            "Resource pv1 can only be sized if its construction is a decision"
        );
    }

    #[test]
    fn test_unknown_bus() {
        let contents = r#"
[[bus]]
vn_kv = 0.4

[[line]]
name = "l1"
from_bus = 0
to_bus = 2
max_i_ka = 0.2
"#;
        assert_error!(parse(contents), "Element l1 refers to unknown bus 2");
    }

    #[test]
    fn test_line_rating_from_current() {
        let contents = r#"
[writer]
three_phase = true
max_i_pu = 1.0

[[bus]]
vn_kv = 10.0

[[bus]]
vn_kv = 10.0

[[line]]
name = "l1"
from_bus = 0
to_bus = 1
max_i_ka = 0.1
[line.resource]
"#;
        let (_, network) = parse(contents).unwrap();
        let mut line = network.line.into_iter().next().unwrap();
        let resource = line.resource.as_mut().unwrap();
        let mut model = OptimisationModel::new();
        resource
            .initialise(&mut model, &crate::fixture::hourly_scenarios(1))
            .unwrap();
        let pf = model.find_variable("l1_pf_mw[0]").unwrap();
        assert_approx_eq!(f64, model.variable(pf).upper, 3f64.sqrt());
    }
}
