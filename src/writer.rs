//! Assembly of the optimisation model from a network description and a scenario table.
//!
//! The [`ModelWriter`] owns the network for the duration of a run. It binds default line models
//! where needed, initialises every resource, adds the balance rows and the objective, and after a
//! solve writes the sizing decisions back into the network rows.
use crate::network::{ElementTable, Network};
use crate::optimisation::{LinearExpr, OptimisationModel, Solution, SolverOptions, solver};
use crate::output::ResultsTable;
use crate::resource::{DEFAULT_BIG_M, Resource, ResourceParams, TransmissionLine};
use crate::scenario::ScenarioTable;
use crate::topology::check_connectivity;
use crate::units::{Energy, Power};
use anyhow::{Context, Result, ensure};
use log::{debug, info};
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use strum::IntoEnumIterator;

pub mod balance;
use balance::{add_bus_balance, add_power_balance};

/// Name of the optional row capping total investment
pub const MAX_INVESTMENT_CONSTRAINT: &str = "max_investment_constraint";

/// Ratio of reactive to active capacity written back for built generators
const REACTIVE_CAPACITY_RATIO: f64 = 0.5;

/// How buses are modelled
#[derive(DeserializeLabeledStringEnum, Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Topology {
    /// All resources share one busbar; lines are ignored
    #[default]
    #[string = "single"]
    Single,
    /// Each bus balances separately and lines carry power between them
    #[string = "multi"]
    Multi,
}

fn default_big_m() -> f64 {
    DEFAULT_BIG_M
}

/// Options for building the model
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Single or multi-busbar
    pub topology: Topology,
    /// Cost per MW of flow above the rating of automatically added lines
    pub soft_limit_coefficient: Option<f64>,
    /// Maximum current of automatically added lines as a multiple of their rating
    pub max_i_pu: Option<f64>,
    /// Whether automatically added lines carry three-phase power (√3 · I · V)
    pub three_phase: bool,
    /// Upper limit on the total investment cost
    pub max_investment: Option<f64>,
    /// Big-M of automatically added lines
    #[serde(skip, default = "default_big_m")]
    pub big_m: f64,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            topology: Topology::default(),
            soft_limit_coefficient: None,
            max_i_pu: None,
            three_phase: false,
            max_investment: None,
            big_m: DEFAULT_BIG_M,
        }
    }
}

/// Builds an [`OptimisationModel`] for one run
#[derive(Debug, Default)]
pub struct ModelWriter {
    options: WriterOptions,
    network: Option<Network>,
    scenarios: Option<ScenarioTable>,
    model: Option<OptimisationModel>,
}

impl ModelWriter {
    /// Create a new [`ModelWriter`] with no network or scenarios
    pub fn new(options: WriterOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Provide the network description
    pub fn with_network(mut self, network: Network) -> Self {
        self.network = Some(network);
        self
    }

    /// Provide the scenario table
    pub fn with_scenarios(mut self, scenarios: ScenarioTable) -> Self {
        self.scenarios = Some(scenarios);
        self
    }

    /// The writer options
    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// The network description, if provided
    pub fn network(&self) -> Option<&Network> {
        self.network.as_ref()
    }

    /// The scenario table, if provided
    pub fn scenarios(&self) -> Option<&ScenarioTable> {
        self.scenarios.as_ref()
    }

    /// The model, once created
    pub fn model(&self) -> Option<&OptimisationModel> {
        self.model.as_ref()
    }

    /// Take back the network description, e.g. after back-configuration
    pub fn into_network(self) -> Option<Network> {
        self.network
    }

    /// Build the model.
    ///
    /// This can only be done once per writer. If it fails, the resources of the network are left
    /// partially initialised and a new network must be loaded to try again.
    pub fn create_model(&mut self) -> Result<&OptimisationModel> {
        ensure!(self.model.is_none(), "Model already created");
        let network = self.network.as_mut().context("Network not provided")?;
        let scenarios = self.scenarios.as_ref().context("Scenarios not provided")?;
        ensure!(!scenarios.is_empty(), "Scenario table is empty");
        check_buses(network)?;

        let topology = self.options.topology;
        info!(
            "Creating {} model with {} buses and {} scenarios",
            match topology {
                Topology::Single => "single-busbar",
                Topology::Multi => "multi-busbar",
            },
            network.buses.len(),
            scenarios.len()
        );
        if topology == Topology::Multi {
            check_connectivity(network);
            add_default_lines(network, &self.options)?;
        }

        let mut model = OptimisationModel::new();
        initialise_resources(network, topology, &mut model, scenarios)?;

        let network = &*network;
        match topology {
            Topology::Single => add_power_balance(&mut model, network, scenarios.len())?,
            Topology::Multi => add_bus_balance(&mut model, network, scenarios.len())?,
        }
        if let Some(budget) = self.options.max_investment {
            let investment = total_initial_cost(network, topology)?;
            model.add_less_or_equal(MAX_INVESTMENT_CONSTRAINT, investment, budget)?;
        }
        model.set_objective(objective(network, topology, scenarios)?)?;

        info!(
            "Created model with {} variables and {} constraints",
            model.num_variables(),
            model.num_constraints()
        );

        Ok(self.model.insert(model))
    }

    /// Solve the model created by [`ModelWriter::create_model`]
    pub fn solve(&self, options: &SolverOptions) -> Result<Solution> {
        let model = self.model.as_ref().context("Model not created")?;
        solver::solve(model, options)
    }

    /// Write the construction and sizing decisions of a solution back into the network.
    ///
    /// Built resources are marked in service with their solved ratings. Unbuilt resources are
    /// taken out of service and their ratings zeroed.
    pub fn back_configure(&mut self, solution: &Solution) -> Result<()> {
        ensure!(self.model.is_some(), "Model not created");
        let network = self.network.as_mut().context("Network not provided")?;

        for table in ElementTable::iter() {
            for element in network.table_mut(table) {
                if !element.in_service {
                    continue;
                }
                let Some(sizing) = element.resource.as_ref().and_then(|r| r.sizing(solution))
                else {
                    continue;
                };

                let power = if sizing.built {
                    info!(
                        "{table} {} built with rating {} MW",
                        element.name,
                        sizing.power.value()
                    );
                    sizing.power
                } else {
                    info!("{table} {} not built", element.name);
                    Power(0.0)
                };
                element.in_service = sizing.built;
                element.pr_mw = Some(power);
                match table {
                    ElementTable::Generation => {
                        element.max_p_mw = Some(power);
                        element.max_q_mvar = Some(REACTIVE_CAPACITY_RATIO * power.value());
                    }
                    ElementTable::Storage => {
                        element.max_e_mwh = Some(if sizing.built {
                            sizing.energy.unwrap_or_default()
                        } else {
                            Energy(0.0)
                        });
                    }
                    ElementTable::ExtGrid | ElementTable::Load => {}
                }
            }
        }

        Ok(())
    }

    /// Extract every reported attribute of every active resource.
    ///
    /// Unbuilt sizeable resources are left out unless `include_inactive` is set.
    pub fn get_scenes_results(
        &self,
        solution: &Solution,
        include_inactive: bool,
    ) -> Result<ResultsTable> {
        let (network, scenarios) = self.solved_inputs()?;
        let mut table = ResultsTable::new(scenarios.len());
        for resource in registered_resources(network, self.options.topology) {
            resource.get_scenes_results(solution, &mut table, include_inactive)?;
        }

        Ok(table)
    }

    /// Extract the given attributes of every active resource, skipping resources without them
    pub fn get_attribute_results(
        &self,
        solution: &Solution,
        attributes: &[&str],
        include_inactive: bool,
    ) -> Result<ResultsTable> {
        let (network, scenarios) = self.solved_inputs()?;
        let mut table = ResultsTable::new(scenarios.len());
        for resource in registered_resources(network, self.options.topology) {
            resource.get_attribute_results(solution, &mut table, attributes, include_inactive)?;
        }

        Ok(table)
    }

    fn solved_inputs(&self) -> Result<(&Network, &ScenarioTable)> {
        ensure!(self.model.is_some(), "Model not created");
        let network = self.network.as_ref().context("Network not provided")?;
        let scenarios = self.scenarios.as_ref().context("Scenarios not provided")?;
        Ok((network, scenarios))
    }
}

/// Check that every element and line refers to an existing bus
fn check_buses(network: &Network) -> Result<()> {
    for table in ElementTable::iter() {
        for element in network.table(table) {
            network.check_bus(element.bus, &element.name)?;
        }
    }
    for line in &network.line {
        network.check_bus(line.from_bus, &line.name)?;
        network.check_bus(line.to_bus, &line.name)?;
    }

    Ok(())
}

/// Bind a [`TransmissionLine`] to every in-service line that has no resource.
///
/// The line is named `L <from>_<to>` after its buses and rated at `max_i_ka * vn_kv` of its
/// `from` bus, times √3 for three-phase lines.
fn add_default_lines(network: &mut Network, options: &WriterOptions) -> Result<()> {
    let buses = &network.buses;
    for line in network
        .line
        .iter_mut()
        .filter(|line| line.in_service && line.resource.is_none())
    {
        let name = format!(
            "L {}_{}",
            buses[line.from_bus].label(line.from_bus),
            buses[line.to_bus].label(line.to_bus)
        );
        let pr = line.rating(buses, options.three_phase);
        debug!("Adding line model {name} rated at {} MW", pr.value());

        let mut params = ResourceParams::new(&name, pr);
        params.big_m = options.big_m;
        let mut resource = TransmissionLine::new(params)?;
        if let Some(max_i_pu) = options.max_i_pu {
            resource = resource.with_max_current(max_i_pu)?;
        }
        if let Some(coefficient) = options.soft_limit_coefficient {
            resource = resource.with_soft_limit(coefficient);
        }
        line.resource = Some(resource);
    }

    Ok(())
}

/// Initialise every active resource, in table order then row order, lines last
fn initialise_resources(
    network: &mut Network,
    topology: Topology,
    model: &mut OptimisationModel,
    scenarios: &ScenarioTable,
) -> Result<()> {
    for table in ElementTable::iter() {
        for element in network.table_mut(table) {
            if !element.in_service {
                continue;
            }
            if let Some(resource) = element.resource.as_mut() {
                debug!("Initialising {table} {}", element.name);
                resource.initialise(model, scenarios)?;
            }
        }
    }

    if topology == Topology::Multi {
        for line in &mut network.line {
            if !line.in_service {
                continue;
            }
            if let Some(resource) = line.resource.as_mut() {
                debug!("Initialising line {}", line.name);
                resource.initialise(model, scenarios)?;
            }
        }
    }

    Ok(())
}

/// The resources taking part in the model: lines only with multiple busbars
fn registered_resources(
    network: &Network,
    topology: Topology,
) -> impl Iterator<Item = &dyn Resource> {
    let lines = network
        .active_lines()
        .filter(move |_| topology == Topology::Multi)
        .map(|(_, line)| line as &dyn Resource);

    network
        .active_elements()
        .map(|(_, resource)| resource)
        .chain(lines)
}

/// Sum of the investment costs of all resources
fn total_initial_cost(network: &Network, topology: Topology) -> Result<LinearExpr> {
    let mut cost = LinearExpr::zero();
    for resource in registered_resources(network, topology) {
        cost += resource.initial_cost()?;
    }

    Ok(cost)
}

/// Investment cost plus the operating cost of every scenario, weighted by duration, repetitions
/// and discount factor
fn objective(
    network: &Network,
    topology: Topology,
    scenarios: &ScenarioTable,
) -> Result<LinearExpr> {
    let mut objective = total_initial_cost(network, topology)?;
    for (scene, scenario) in scenarios.iter().enumerate() {
        let mut operating = LinearExpr::zero();
        for resource in registered_resources(network, topology) {
            operating += resource.operating_cost(scene)?;
        }
        objective += operating * scenario.cost_weight();
    }

    Ok(objective)
}
