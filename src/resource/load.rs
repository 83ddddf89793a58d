//! A fixed electrical demand.
use super::{
    Resource, ResourceKind, ResourceParams, SceneParams, check_not_initialised, not_initialised,
    scene_entry,
};
use crate::id::ResourceID;
use crate::optimisation::{LinearExpr, OptimisationModel, Solution, VariableId, VariableKind};
use crate::scenario::ScenarioTable;
use anyhow::Result;
use log::debug;

/// A load consumes all of its available power: `pa_pu(s) * pr` in every scenario.
///
/// Consumption is reported with a negative sign. The demand is computed once, when the resource
/// is initialised, and its power variables are pinned to it.
#[derive(Debug)]
pub struct Load {
    params: ResourceParams,
    state: Option<LoadState>,
}

#[derive(Debug)]
struct LoadState {
    scene: SceneParams,
    demand: Vec<f64>,
    p: Vec<VariableId>,
}

impl Load {
    /// Create a new [`Load`]
    pub fn new(params: ResourceParams) -> Self {
        Self {
            params,
            state: None,
        }
    }

    fn state(&self) -> Result<&LoadState> {
        not_initialised(self.state.as_ref(), &self.params.name)
    }
}

impl Resource for Load {
    fn name(&self) -> &ResourceID {
        &self.params.name
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Load
    }

    fn initialise(&mut self, model: &mut OptimisationModel, scenarios: &ScenarioTable) -> Result<()> {
        let name = &self.params.name;
        check_not_initialised(self.state.as_ref(), name)?;
        debug!("Initialising load {name}");

        let scene = self.params.resolve(scenarios, None)?;
        let pr = self.params.pr.value();
        let demand: Vec<_> = scene.pa_pu.iter().map(|pa| pa * pr).collect();
        let p = demand
            .iter()
            .enumerate()
            .map(|(s, demand)| {
                model.add_variable(
                    format!("{name}_p_mw[{s}]"),
                    VariableKind::Continuous,
                    -demand,
                    -demand,
                )
            })
            .collect::<Result<_>>()?;

        self.state = Some(LoadState { scene, demand, p });
        Ok(())
    }

    fn active_power(&self, scene: usize) -> Result<LinearExpr> {
        let state = self.state()?;
        Ok(scene_entry(&state.p, scene, self.name())?.into())
    }

    fn available_power(&self, scene: usize, _solution: Option<&Solution>) -> Result<f64> {
        scene_entry(&self.state()?.demand, scene, self.name())
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
        let demand = scene_entry(&state.demand, scene, self.name())?;
        let oc_0 = scene_entry(&state.scene.oc_0, scene, self.name())?;
        let oc_1 = scene_entry(&state.scene.oc_1, scene, self.name())?;

        Ok(LinearExpr::from_constant(oc_0 + oc_1 * demand))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::scenarios;
    use crate::resource::CostParams;
    use crate::units::Power;
    use crate::value::IndexedValue;
    use rstest::rstest;

    #[rstest]
    fn test_load_is_pinned(scenarios: ScenarioTable) {
        let profile = IndexedValue::function(|s| Ok(0.25 * s.hour));
        let mut load =
            Load::new(ResourceParams::new("house", Power(4.0)).with_availability(profile));
        let mut model = OptimisationModel::new();
        load.initialise(&mut model, &scenarios).unwrap();

        let p2 = model.find_variable("house_p_mw[2]").unwrap();
        let variable = model.variable(p2);
        assert_eq!((variable.lower, variable.upper), (-2.0, -2.0));
        assert_eq!(load.available_power(2, None).unwrap(), 2.0);
        assert_eq!(load.active_power(2).unwrap(), LinearExpr::from(p2));
    }

    #[rstest]
    fn test_operating_cost_is_constant(scenarios: ScenarioTable) {
        let costs = CostParams {
            oc_0: Some(1.0.into()),
            oc_1: Some(0.5.into()),
            ..Default::default()
        };
        let mut load = Load::new(ResourceParams::new("house", Power(4.0)).with_costs(costs));
        let mut model = OptimisationModel::new();
        load.initialise(&mut model, &scenarios).unwrap();

        let cost = load.operating_cost(0).unwrap();
        assert!(cost.is_constant());
        assert_eq!(cost.constant(), 3.0);
    }
}
