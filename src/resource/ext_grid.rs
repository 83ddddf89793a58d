//! A tie to an external grid from which power is imported.
use super::{
    Resource, ResourceKind, ResourceParams, SceneParams, check_not_initialised, not_initialised,
    scene_entry,
};
use crate::id::ResourceID;
use crate::optimisation::{LinearExpr, OptimisationModel, Solution, VariableId, VariableKind};
use crate::profile::TimeOfUsePrice;
use crate::scenario::ScenarioTable;
use crate::value::IndexedValue;
use anyhow::Result;
use log::debug;

/// Default import price at peak times
pub const DEFAULT_PEAK_PRICE: f64 = 200e-6;
/// Default import price overnight
pub const DEFAULT_VALLEY_PRICE: f64 = 120e-6;
/// Default import price at other times
pub const DEFAULT_REST_PRICE: f64 = 160e-6;

/// An external grid connection.
///
/// Import power is non-negative and limited by the tie's capacity times its availability. If no
/// operating price is configured, a peak/valley/rest time-of-use price applies.
#[derive(Debug)]
pub struct ExternalGrid {
    params: ResourceParams,
    state: Option<ExternalGridState>,
}

#[derive(Debug)]
struct ExternalGridState {
    scene: SceneParams,
    p: Vec<VariableId>,
}

impl ExternalGrid {
    /// Create a new [`ExternalGrid`]
    pub fn new(params: ResourceParams) -> Self {
        Self {
            params,
            state: None,
        }
    }

    fn state(&self) -> Result<&ExternalGridState> {
        not_initialised(self.state.as_ref(), &self.params.name)
    }
}

/// The import price used when none is configured
pub fn default_import_price() -> IndexedValue {
    IndexedValue::simulator(TimeOfUsePrice::peak_valley_rest(
        DEFAULT_PEAK_PRICE,
        DEFAULT_VALLEY_PRICE,
        DEFAULT_REST_PRICE,
    ))
}

impl Resource for ExternalGrid {
    fn name(&self) -> &ResourceID {
        &self.params.name
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::ExternalGrid
    }

    fn initialise(&mut self, model: &mut OptimisationModel, scenarios: &ScenarioTable) -> Result<()> {
        let name = &self.params.name;
        check_not_initialised(self.state.as_ref(), name)?;
        debug!("Initialising external grid {name}");

        let scene = self
            .params
            .resolve(scenarios, Some(&default_import_price()))?;
        let pr = self.params.pr.value();
        let p = scene
            .pa_pu
            .iter()
            .enumerate()
            .map(|(s, pa)| {
                model.add_variable(
                    format!("{name}_p_mw[{s}]"),
                    VariableKind::Continuous,
                    0.0,
                    pa * pr,
                )
            })
            .collect::<Result<_>>()?;

        self.state = Some(ExternalGridState { scene, p });
        Ok(())
    }

    fn active_power(&self, scene: usize) -> Result<LinearExpr> {
        let state = self.state()?;
        Ok(scene_entry(&state.p, scene, self.name())?.into())
    }

    fn available_power(&self, scene: usize, _solution: Option<&Solution>) -> Result<f64> {
        let pa = scene_entry(&self.state()?.scene.pa_pu, scene, self.name())?;
        Ok(pa * self.params.pr.value())
    }

    fn initial_cost(&self) -> Result<LinearExpr> {
        self.state()?;
        let costs = &self.params.costs;
        Ok(LinearExpr::from_constant(
            costs.ic_0 + costs.ic_1 * self.params.pr.value(),
        ))
    }

    fn operating_cost(&self, scene: usize) -> Result<LinearExpr> {
        let state = self.state()?;
        let p = scene_entry(&state.p, scene, self.name())?;
        let oc_0 = scene_entry(&state.scene.oc_0, scene, self.name())?;
        let oc_1 = scene_entry(&state.scene.oc_1, scene, self.name())?;

        Ok(p * oc_1 + oc_0)
    }

    fn reported_attributes(&self) -> &[&'static str] {
        &["p_mw"]
    }

    fn attribute_variables(&self, attribute: &str) -> Option<&[VariableId]> {
        let state = self.state.as_ref()?;
        match attribute {
            "p_mw" => Some(&state.p),
            _ => None,
        }
    }
}
