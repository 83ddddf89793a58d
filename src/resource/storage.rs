//! Energy storage with a state-of-charge recurrence.
use super::sizing::{BuildDecision, Rating, SizingMode};
use super::{
    Resource, ResourceKind, ResourceParams, SceneParams, SizingOutcome, check_not_initialised,
    not_initialised, scene_entry,
};
use crate::id::ResourceID;
use crate::optimisation::{LinearExpr, OptimisationModel, Solution, VariableId, VariableKind};
use crate::scenario::ScenarioTable;
use crate::units::{Energy, Power};
use anyhow::{Result, ensure};
use log::debug;

/// Default round-trip efficiency
pub const DEFAULT_ROUND_TRIP_EFFICIENCY: f64 = 0.8;

/// Default self-discharge per scenario step
pub const DEFAULT_SELF_DISCHARGE: f64 = 0.05 / 24.0;

/// A storage unit.
///
/// Power is positive when discharging and negative when charging, bounded by the power rating
/// times availability in both directions. The state of charge starts empty and follows
///
/// ```text
/// soc[s] = soc[s-1] * (1 - sigma) - p[s] * dt[s] * eta_bb
/// ```
///
/// Discharge in a scenario is also limited by the energy stored at the end of it
/// (`p[s] <= soc[s] / dt[s]`). When construction is a decision, the power and energy ratings are
/// both gated by the construction binary.
#[derive(Debug)]
pub struct Storage {
    params: ResourceParams,
    er: Energy,
    eta_bb: f64,
    sigma: f64,
    ic_1_cap: f64,
    state: Option<StorageState>,
}

#[derive(Debug)]
struct StorageState {
    scene: SceneParams,
    build: BuildDecision,
    pr: Rating,
    er: Rating,
    p: Vec<VariableId>,
    soc: Vec<VariableId>,
}

impl Storage {
    /// Create a new [`Storage`] with the given energy rating and default efficiencies
    pub fn new(params: ResourceParams, er: Energy) -> Self {
        Self {
            params,
            er,
            eta_bb: DEFAULT_ROUND_TRIP_EFFICIENCY,
            sigma: DEFAULT_SELF_DISCHARGE,
            ic_1_cap: 0.0,
            state: None,
        }
    }

    /// Set the round-trip efficiency (between zero and one)
    pub fn with_round_trip_efficiency(mut self, eta_bb: f64) -> Result<Self> {
        ensure!(
            eta_bb > 0.0 && eta_bb <= 1.0,
            "Round-trip efficiency of resource {} must be in (0, 1]",
            self.params.name
        );
        self.eta_bb = eta_bb;
        Ok(self)
    }

    /// Set the self-discharge per step (zero or more, less than one)
    pub fn with_self_discharge(mut self, sigma: f64) -> Result<Self> {
        ensure!(
            (0.0..1.0).contains(&sigma),
            "Self-discharge of resource {} must be in [0, 1)",
            self.params.name
        );
        self.sigma = sigma;
        Ok(self)
    }

    /// Set the investment cost per MWh of energy rating
    pub fn with_energy_cost(mut self, ic_1_cap: f64) -> Self {
        self.ic_1_cap = ic_1_cap;
        self
    }

    fn state(&self) -> Result<&StorageState> {
        not_initialised(self.state.as_ref(), &self.params.name)
    }
}

impl Resource for Storage {
    fn name(&self) -> &ResourceID {
        &self.params.name
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Storage
    }

    fn is_sizeable(&self) -> bool {
        self.params.decide_construction
    }

    fn initialise(&mut self, model: &mut OptimisationModel, scenarios: &ScenarioTable) -> Result<()> {
        let name = &self.params.name;
        check_not_initialised(self.state.as_ref(), name)?;
        debug!("Initialising storage {name}");
        ensure!(
            self.er.is_finite() && self.er.value() >= 0.0,
            "Energy rating of resource {name} must be finite and non-negative"
        );

        let scene = self.params.resolve(scenarios, None)?;
        let build = BuildDecision::new(
            model,
            name,
            SizingMode::new(self.params.decide_construction, self.params.size),
            self.params.big_m,
        )?;
        let pr = build.add_rating(
            model,
            format!("{name}_pr_mw"),
            format!("{name}_p_M_constraint"),
            self.params.pr.value(),
        )?;
        let er = build.add_rating(
            model,
            format!("{name}_er_mwh"),
            format!("{name}_e_M_constraint"),
            self.er.value(),
        )?;

        let p = model.add_variables(
            &format!("{name}_p_mw"),
            scenarios.len(),
            VariableKind::Continuous,
            f64::NEG_INFINITY,
            f64::INFINITY,
        )?;
        let soc = model.add_variables(
            &format!("{name}_soc_mwh"),
            scenarios.len(),
            VariableKind::Continuous,
            0.0,
            f64::INFINITY,
        )?;

        for (s, scenario) in scenarios.iter().enumerate() {
            let dt = scenario.dt.value();
            ensure!(
                dt > 0.0,
                "Storage {name} needs a positive duration in scenario {s}"
            );
            let available = pr.expr() * scene.pa_pu[s];

            model.add_less_or_equal(
                format!("{name}_p_constraint_pr[{s}]"),
                p[s],
                available.clone(),
            )?;
            model.add_less_or_equal(
                format!("{name}_p_constraint_charge[{s}]"),
                -available,
                p[s],
            )?;
            model.add_less_or_equal(
                format!("{name}_p_constraint_soc[{s}]"),
                p[s],
                soc[s] * (1.0 / dt),
            )?;

            let previous = match s {
                0 => LinearExpr::zero(),
                _ => soc[s - 1] * (1.0 - self.sigma) - p[s] * (dt * self.eta_bb),
            };
            model.add_equality(format!("{name}_soc_constraint[{s}]"), soc[s], previous)?;
            model.add_less_or_equal(format!("{name}_soc_constraint_er[{s}]"), soc[s], er.expr())?;
        }

        self.state = Some(StorageState {
            scene,
            build,
            pr,
            er,
            p,
            soc,
        });
        Ok(())
    }

    fn active_power(&self, scene: usize) -> Result<LinearExpr> {
        let state = self.state()?;
        Ok(scene_entry(&state.p, scene, self.name())?.into())
    }

    fn available_power(&self, scene: usize, solution: Option<&Solution>) -> Result<f64> {
        let state = self.state()?;
        let pa = scene_entry(&state.scene.pa_pu, scene, self.name())?;
        Ok(pa * state.pr.value(solution))
    }

    fn initial_cost(&self) -> Result<LinearExpr> {
        let state = self.state()?;
        let costs = &self.params.costs;
        Ok(state.build.scaled(costs.ic_0)
            + state.pr.expr() * costs.ic_1
            + state.er.expr() * self.ic_1_cap)
    }

    fn operating_cost(&self, scene: usize) -> Result<LinearExpr> {
        let state = self.state()?;
        let p = scene_entry(&state.p, scene, self.name())?;
        let oc_0 = scene_entry(&state.scene.oc_0, scene, self.name())?;
        let oc_1 = scene_entry(&state.scene.oc_1, scene, self.name())?;

        Ok(state.build.scaled(oc_0) + p * oc_1)
    }

    fn reported_attributes(&self) -> &[&'static str] {
        &["p_mw", "soc_mwh"]
    }

    fn attribute_variables(&self, attribute: &str) -> Option<&[VariableId]> {
        let state = self.state.as_ref()?;
        match attribute {
            "p_mw" => Some(&state.p),
            "soc_mwh" => Some(&state.soc),
            _ => None,
        }
    }

    fn sizing(&self, solution: &Solution) -> Option<SizingOutcome> {
        let state = self.state.as_ref()?;
        state.build.variable()?;
        let built = state.build.is_built(solution);
        let (power, energy) = if built {
            (
                state.pr.value(Some(solution)),
                state.er.value(Some(solution)),
            )
        } else {
            (0.0, 0.0)
        };

        Some(SizingOutcome {
            built,
            power: Power(power),
            energy: Some(Energy(energy)),
        })
    }
}
