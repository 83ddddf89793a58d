//! Dispatchable or renewable generation, with optional construction and sizing decisions.
use super::sizing::{BuildDecision, Rating, SizingMode};
use super::{
    Resource, ResourceKind, ResourceParams, SceneParams, SizingOutcome, check_not_initialised,
    not_initialised, scene_entry,
};
use crate::id::ResourceID;
use crate::optimisation::{LinearExpr, OptimisationModel, Solution, VariableId, VariableKind};
use crate::scenario::ScenarioTable;
use crate::units::Power;
use anyhow::{Result, ensure};
use log::debug;

/// A generator whose output is limited by its rating times its availability.
///
/// If construction is a decision, the generator owns a construction binary `<name>_create`; if it
/// is also sized, its rating is the continuous variable `<name>_pr_mw`, gated by the binary.
#[derive(Debug)]
pub struct Generator {
    params: ResourceParams,
    state: Option<GenerationState>,
}

/// Variables and resolved parameters shared by both kinds of generator
#[derive(Debug)]
struct GenerationState {
    scene: SceneParams,
    build: BuildDecision,
    rating: Rating,
    p: Vec<VariableId>,
}

impl GenerationState {
    fn new(
        model: &mut OptimisationModel,
        params: &ResourceParams,
        scenarios: &ScenarioTable,
    ) -> Result<Self> {
        let name = &params.name;
        let scene = params.resolve(scenarios, None)?;
        let build = BuildDecision::new(
            model,
            name,
            SizingMode::new(params.decide_construction, params.size),
            params.big_m,
        )?;
        let rating = build.add_rating(
            model,
            format!("{name}_pr_mw"),
            format!("{name}_p_M_constraint"),
            params.pr.value(),
        )?;

        let p = model.add_variables(
            &format!("{name}_p_mw"),
            scenarios.len(),
            VariableKind::Continuous,
            0.0,
            f64::INFINITY,
        )?;
        for (s, (var, pa)) in p.iter().zip(&scene.pa_pu).enumerate() {
            model.add_less_or_equal(
                format!("{name}_p_constraint[{s}]"),
                *var,
                rating.expr() * *pa,
            )?;
        }

        Ok(Self {
            scene,
            build,
            rating,
            p,
        })
    }

    fn active_power(&self, scene: usize, name: &ResourceID) -> Result<LinearExpr> {
        Ok(scene_entry(&self.p, scene, name)?.into())
    }

    fn available_power(
        &self,
        scene: usize,
        solution: Option<&Solution>,
        name: &ResourceID,
    ) -> Result<f64> {
        let pa = scene_entry(&self.scene.pa_pu, scene, name)?;
        Ok(pa * self.rating.value(solution))
    }

    fn initial_cost(&self, params: &ResourceParams) -> LinearExpr {
        self.build.scaled(params.costs.ic_0) + self.rating.expr() * params.costs.ic_1
    }

    fn operating_cost(&self, scene: usize, name: &ResourceID) -> Result<LinearExpr> {
        let p = scene_entry(&self.p, scene, name)?;
        let oc_0 = scene_entry(&self.scene.oc_0, scene, name)?;
        let oc_1 = scene_entry(&self.scene.oc_1, scene, name)?;

        Ok(self.build.scaled(oc_0) + p * oc_1)
    }

    fn attribute_variables(&self, attribute: &str) -> Option<&[VariableId]> {
        match attribute {
            "p_mw" => Some(&self.p),
            _ => None,
        }
    }

    fn sizing(&self, solution: &Solution) -> Option<SizingOutcome> {
        self.build.variable()?;
        let built = self.build.is_built(solution);
        let power = if built {
            self.rating.value(Some(solution))
        } else {
            0.0
        };

        Some(SizingOutcome {
            built,
            power: Power(power),
            energy: None,
        })
    }
}

impl Generator {
    /// Create a new [`Generator`]
    pub fn new(params: ResourceParams) -> Self {
        Self {
            params,
            state: None,
        }
    }

    fn state(&self) -> Result<&GenerationState> {
        not_initialised(self.state.as_ref(), &self.params.name)
    }
}

impl Resource for Generator {
    fn name(&self) -> &ResourceID {
        &self.params.name
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Generator
    }

    fn is_sizeable(&self) -> bool {
        self.params.decide_construction
    }

    fn initialise(&mut self, model: &mut OptimisationModel, scenarios: &ScenarioTable) -> Result<()> {
        check_not_initialised(self.state.as_ref(), &self.params.name)?;
        debug!("Initialising generator {}", self.params.name);
        self.state = Some(GenerationState::new(model, &self.params, scenarios)?);
        Ok(())
    }

    fn active_power(&self, scene: usize) -> Result<LinearExpr> {
        self.state()?.active_power(scene, self.name())
    }

    fn available_power(&self, scene: usize, solution: Option<&Solution>) -> Result<f64> {
        self.state()?.available_power(scene, solution, self.name())
    }

    fn initial_cost(&self) -> Result<LinearExpr> {
        Ok(self.state()?.initial_cost(&self.params))
    }

    fn operating_cost(&self, scene: usize) -> Result<LinearExpr> {
        self.state()?.operating_cost(scene, self.name())
    }

    fn reported_attributes(&self) -> &[&'static str] {
        &["p_mw"]
    }

    fn attribute_variables(&self, attribute: &str) -> Option<&[VariableId]> {
        self.state.as_ref()?.attribute_variables(attribute)
    }

    fn sizing(&self, solution: &Solution) -> Option<SizingOutcome> {
        self.state.as_ref()?.sizing(solution)
    }
}

/// A generator built from a whole number of identical units.
///
/// When sized, the rating is tied to an integer unit count `<name>_units`:
/// `pr == unit_size * units`, and the count is gated by the construction binary. Otherwise the
/// number of units is the configured rating divided by the unit size, rounded up. Each unit adds
/// `ic_unit` to the investment cost.
#[derive(Debug)]
pub struct DiscreteGenerator {
    params: ResourceParams,
    unit_size: Power,
    ic_unit: f64,
    state: Option<DiscreteState>,
}

#[derive(Debug)]
struct DiscreteState {
    generation: GenerationState,
    units: LinearExpr,
}

impl DiscreteGenerator {
    /// Create a new [`DiscreteGenerator`]
    ///
    /// # Arguments
    ///
    /// * `params` - Common resource parameters
    /// * `unit_size` - Rated power of one unit
    /// * `ic_unit` - Investment cost per unit
    pub fn new(params: ResourceParams, unit_size: Power, ic_unit: f64) -> Result<Self> {
        ensure!(
            unit_size.is_finite() && unit_size.value() > 0.0,
            "Unit size of resource {} must be positive",
            params.name
        );

        Ok(Self {
            params,
            unit_size,
            ic_unit,
            state: None,
        })
    }

    fn state(&self) -> Result<&DiscreteState> {
        not_initialised(self.state.as_ref(), &self.params.name)
    }
}

impl Resource for DiscreteGenerator {
    fn name(&self) -> &ResourceID {
        &self.params.name
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::DiscreteGenerator
    }

    fn is_sizeable(&self) -> bool {
        self.params.decide_construction
    }

    fn initialise(&mut self, model: &mut OptimisationModel, scenarios: &ScenarioTable) -> Result<()> {
        let name = &self.params.name;
        check_not_initialised(self.state.as_ref(), name)?;
        debug!("Initialising discrete generator {name}");

        let generation = GenerationState::new(model, &self.params, scenarios)?;
        let unit_size = self.unit_size.value();
        let units: LinearExpr = match generation.rating.variable() {
            Some(pr) => {
                let units = model.add_variable(
                    format!("{name}_units"),
                    VariableKind::Integer,
                    0.0,
                    f64::INFINITY,
                )?;
                model.add_equality(format!("{name}_units_constraint"), pr, units * unit_size)?;
                generation
                    .build
                    .gate(model, format!("{name}_units_M_constraint"), units)?;
                units.into()
            }
            None => {
                let count = (self.params.pr.value() / unit_size).ceil();
                generation.build.scaled(count)
            }
        };

        self.state = Some(DiscreteState { generation, units });
        Ok(())
    }

    fn active_power(&self, scene: usize) -> Result<LinearExpr> {
        self.state()?.generation.active_power(scene, self.name())
    }

    fn available_power(&self, scene: usize, solution: Option<&Solution>) -> Result<f64> {
        self.state()?
            .generation
            .available_power(scene, solution, self.name())
    }

    fn initial_cost(&self) -> Result<LinearExpr> {
        let state = self.state()?;
        Ok(state.generation.initial_cost(&self.params) + state.units.clone() * self.ic_unit)
    }

    fn operating_cost(&self, scene: usize) -> Result<LinearExpr> {
        self.state()?.generation.operating_cost(scene, self.name())
    }

    fn reported_attributes(&self) -> &[&'static str] {
        &["p_mw"]
    }

    fn attribute_variables(&self, attribute: &str) -> Option<&[VariableId]> {
        self.state.as_ref()?.generation.attribute_variables(attribute)
    }

    fn sizing(&self, solution: &Solution) -> Option<SizingOutcome> {
        self.state.as_ref()?.generation.sizing(solution)
    }
}
