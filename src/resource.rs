//! Resources are the buildable and dispatchable assets of a microgrid.
//!
//! Every resource owns the decision variables and constraints it adds to the shared
//! [`OptimisationModel`] and exposes the same contract to the model writer: its power contribution
//! per scenario, its investment and operating costs and which per-scenario results it reports.
//! Resources are bound to rows of the network description, which say where they connect.
use crate::id::ResourceID;
use crate::optimisation::{LinearExpr, OptimisationModel, Solution, VariableId};
use crate::output::ResultsTable;
use crate::scenario::ScenarioTable;
use crate::units::{Energy, Power};
use crate::value::{IndexedValue, resolve_param};
use anyhow::{Context, Result, ensure};
use std::fmt;

pub mod ext_grid;
pub mod generator;
pub mod line;
pub mod load;
pub mod sizing;
pub mod storage;
pub use ext_grid::ExternalGrid;
pub use generator::{DiscreteGenerator, Generator};
pub use line::TransmissionLine;
pub use load::Load;
pub use storage::Storage;

/// Default big-M for resources which do not set their own.
///
/// This must exceed any physically feasible capacity in the model, otherwise feasible solutions
/// are silently cut off.
pub const DEFAULT_BIG_M: f64 = 1000.0;

/// The variant of a resource
#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::Display)]
pub enum ResourceKind {
    /// A tie to an external grid
    ExternalGrid,
    /// A fixed demand
    Load,
    /// A generator with continuous capacity
    Generator,
    /// A generator built from whole units
    DiscreteGenerator,
    /// An energy storage unit
    Storage,
    /// A line between two buses
    TransmissionLine,
}

/// Investment and operating cost coefficients.
///
/// Investment costs are one-off; operating costs are per hour and may vary by scenario (e.g. a
/// time-of-use price).
#[derive(Clone, Debug, Default)]
pub struct CostParams {
    /// Fixed investment cost
    pub ic_0: f64,
    /// Investment cost per MW of rated power
    pub ic_1: f64,
    /// Fixed operating cost per hour
    pub oc_0: Option<IndexedValue>,
    /// Operating cost per MWh
    pub oc_1: Option<IndexedValue>,
}

/// Parameters common to every resource
#[derive(Clone, Debug)]
pub struct ResourceParams {
    /// Unique name, used as the prefix of every variable and constraint of the resource
    pub name: ResourceID,
    /// Whether the model decides if the resource is built
    pub decide_construction: bool,
    /// Whether the model decides the rated capacity (only if `decide_construction` is set)
    pub size: bool,
    /// Rated capacity (fixed input unless sized)
    pub pr: Power,
    /// Availability factor (defaults to 1)
    pub pa_pu: Option<IndexedValue>,
    /// Cost coefficients
    pub costs: CostParams,
    /// Upper bound used to gate capacity variables by the construction decision
    pub big_m: f64,
}

impl ResourceParams {
    /// Parameters for a resource with the given name and rated capacity and no costs
    pub fn new(name: &str, pr: Power) -> Self {
        Self {
            name: name.into(),
            decide_construction: false,
            size: false,
            pr,
            pa_pu: None,
            costs: CostParams::default(),
            big_m: DEFAULT_BIG_M,
        }
    }

    /// Let the model decide whether to build the resource and, if `size` is set, its capacity
    pub fn with_construction(mut self, size: bool) -> Self {
        self.decide_construction = true;
        self.size = size;
        self
    }

    /// Set the availability factor
    pub fn with_availability(mut self, pa_pu: impl Into<IndexedValue>) -> Self {
        self.pa_pu = Some(pa_pu.into());
        self
    }

    /// Set the cost coefficients
    pub fn with_costs(mut self, costs: CostParams) -> Self {
        self.costs = costs;
        self
    }

    /// Resolve the scenario-dependent parameters once for every scenario.
    ///
    /// # Arguments
    ///
    /// * `scenarios` - The scenario table
    /// * `default_oc_1` - Operating price used when none is configured
    pub fn resolve(
        &self,
        scenarios: &ScenarioTable,
        default_oc_1: Option<&IndexedValue>,
    ) -> Result<SceneParams> {
        ensure!(
            self.pr.is_finite() && self.pr.value() >= 0.0,
            "Rated capacity of resource {} must be finite and non-negative",
            self.name
        );
        ensure!(
            self.big_m > 0.0,
            "Big-M of resource {} must be positive",
            self.name
        );

        let resolve = |value: Option<&IndexedValue>, default: Option<f64>, field: &str| {
            scenarios
                .iter()
                .enumerate()
                .map(|(index, scenario)| {
                    resolve_param(value, default, index, scenario, &self.name, field)
                })
                .collect::<Result<Vec<_>>>()
        };

        Ok(SceneParams {
            pa_pu: resolve(self.pa_pu.as_ref(), Some(1.0), "pa_pu")?,
            oc_0: resolve(self.costs.oc_0.as_ref(), Some(0.0), "oc_0")?,
            oc_1: resolve(self.costs.oc_1.as_ref().or(default_oc_1), Some(0.0), "oc_1")?,
        })
    }
}

/// Scenario-dependent parameters, resolved once when a resource is initialised
#[derive(Clone, Debug, PartialEq)]
pub struct SceneParams {
    /// Availability factor per scenario
    pub pa_pu: Vec<f64>,
    /// Fixed operating cost per scenario
    pub oc_0: Vec<f64>,
    /// Operating price per scenario
    pub oc_1: Vec<f64>,
}

/// The sizing decisions of a resource, read from a solution
#[derive(Clone, Debug, PartialEq)]
pub struct SizingOutcome {
    /// Whether the construction decision solved true
    pub built: bool,
    /// Rated power (zero if not built)
    pub power: Power,
    /// Rated energy capacity, for storage
    pub energy: Option<Energy>,
}

/// The contract every resource variant implements.
///
/// [`Resource::initialise`] must be called exactly once, before any of the expression methods.
pub trait Resource: fmt::Debug {
    /// The resource's unique name
    fn name(&self) -> &ResourceID;

    /// The variant of the resource
    fn kind(&self) -> ResourceKind;

    /// Whether the model decides whether the resource is built
    fn is_sizeable(&self) -> bool {
        false
    }

    /// Add the resource's variables and constraints to the model.
    ///
    /// Fails if the resource has already been initialised.
    fn initialise(&mut self, model: &mut OptimisationModel, scenarios: &ScenarioTable)
    -> Result<()>;

    /// Net power injected at the resource's bus in a scenario (consumption is negative)
    fn active_power(&self, scene: usize) -> Result<LinearExpr>;

    /// Power carried from one bus to another in a scenario (lines only)
    fn transmitted_power(&self, _scene: usize) -> Result<Option<LinearExpr>> {
        Ok(None)
    }

    /// Maximum deliverable power in a scenario.
    ///
    /// With a solution, sized ratings are taken at their solved values; otherwise the configured
    /// rating is used.
    fn available_power(&self, scene: usize, solution: Option<&Solution>) -> Result<f64>;

    /// One-off investment cost
    fn initial_cost(&self) -> Result<LinearExpr>;

    /// Operating cost per hour in a scenario
    fn operating_cost(&self, scene: usize) -> Result<LinearExpr>;

    /// The per-scenario attributes which appear in results
    fn reported_attributes(&self) -> &[&'static str];

    /// The per-scenario variables of an attribute, if the resource has it
    fn attribute_variables(&self, attribute: &str) -> Option<&[VariableId]>;

    /// The construction and sizing decisions, for sizeable resources
    fn sizing(&self, _solution: &Solution) -> Option<SizingOutcome> {
        None
    }

    /// Whether the resource is in use in a solution.
    ///
    /// Resources which are not sizeable are always in use.
    fn is_built(&self, solution: &Solution) -> bool {
        self.sizing(solution).is_none_or(|sizing| sizing.built)
    }

    /// Append one column per reported attribute to the results table
    fn get_scenes_results(
        &self,
        solution: &Solution,
        table: &mut ResultsTable,
        include_inactive: bool,
    ) -> Result<()> {
        self.get_attribute_results(solution, table, self.reported_attributes(), include_inactive)
    }

    /// Append one column per requested attribute to the results table.
    ///
    /// Attributes the resource does not have are skipped, as are all attributes of an unbuilt
    /// sizeable resource unless `include_inactive` is set.
    fn get_attribute_results(
        &self,
        solution: &Solution,
        table: &mut ResultsTable,
        attributes: &[&str],
        include_inactive: bool,
    ) -> Result<()> {
        if !include_inactive && !self.is_built(solution) {
            return Ok(());
        }

        for attribute in attributes {
            let Some(vars) = self.attribute_variables(attribute) else {
                continue;
            };
            let values = vars.iter().map(|var| solution.value(*var)).collect();
            table.add_column(format!("{}_{attribute}", self.name()), values)?;
        }

        Ok(())
    }
}

/// Error for use of a resource before it was initialised
pub(crate) fn not_initialised<'a, T>(state: Option<&'a T>, name: &ResourceID) -> Result<&'a T> {
    state.with_context(|| format!("Resource {name} has not been initialised"))
}

/// Check that a resource has not been initialised already
pub(crate) fn check_not_initialised<T>(state: Option<&T>, name: &ResourceID) -> Result<()> {
    ensure!(state.is_none(), "Resource {name} already initialised");
    Ok(())
}

/// Look up a per-scenario entry, with an error naming the resource if out of range
pub(crate) fn scene_entry<T: Copy>(values: &[T], scene: usize, name: &ResourceID) -> Result<T> {
    values.get(scene).copied().with_context(|| {
        format!(
            "Scenario {scene} out of range for resource {name} ({} scenarios)",
            values.len()
        )
    })
}
