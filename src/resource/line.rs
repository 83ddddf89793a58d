//! Transmission lines between buses, with an optional soft limit on flow.
use super::{
    Resource, ResourceKind, ResourceParams, SceneParams, check_not_initialised, not_initialised,
    scene_entry,
};
use crate::id::ResourceID;
use crate::optimisation::{LinearExpr, OptimisationModel, Solution, VariableId, VariableKind};
use crate::scenario::ScenarioTable;
use anyhow::{Result, ensure};
use log::debug;

/// Default maximum current as a multiple of the rated current
pub const DEFAULT_MAX_I_PU: f64 = 1.5;

/// A line carrying a signed power flow `pf` from its `from` bus to its `to` bus.
///
/// Flow is bounded by `pr * max_i_pu * pa_pu` in each direction. Losses are not modelled, so the
/// line contributes no active power of its own; its flow enters the bus balance through
/// [`Resource::transmitted_power`] instead.
///
/// With a soft limit coefficient `k`, flow beyond the rating is allowed but penalised: the
/// excess in either direction is split off by a big-M disjunction and `k * excess` is added to the
/// operating cost.
#[derive(Debug)]
pub struct TransmissionLine {
    params: ResourceParams,
    max_i_pu: f64,
    soft_limit_coefficient: Option<f64>,
    state: Option<LineState>,
}

#[derive(Debug)]
struct LineState {
    scene: SceneParams,
    pf: Vec<VariableId>,
    soft_limit: Option<SoftLimit>,
}

/// Variables of the soft-limit decomposition
#[derive(Debug)]
struct SoftLimit {
    ep: Vec<VariableId>,
}

impl TransmissionLine {
    /// Create a new [`TransmissionLine`] with the default current limit and no soft limit
    pub fn new(params: ResourceParams) -> Result<Self> {
        ensure!(
            !params.decide_construction,
            "Construction of line {} cannot be a decision",
            params.name
        );

        Ok(Self {
            params,
            max_i_pu: DEFAULT_MAX_I_PU,
            soft_limit_coefficient: None,
            state: None,
        })
    }

    /// Set the maximum current as a multiple of the rated current
    pub fn with_max_current(mut self, max_i_pu: f64) -> Result<Self> {
        ensure!(
            max_i_pu.is_finite() && max_i_pu > 0.0,
            "Maximum current of line {} must be positive",
            self.params.name
        );
        self.max_i_pu = max_i_pu;
        Ok(self)
    }

    /// Penalise flow beyond the rating with the given cost per MW
    pub fn with_soft_limit(mut self, coefficient: f64) -> Self {
        self.soft_limit_coefficient = Some(coefficient);
        self
    }

    fn state(&self) -> Result<&LineState> {
        not_initialised(self.state.as_ref(), &self.params.name)
    }

    /// Add the soft-limit decomposition for every scenario
    fn add_soft_limit(
        &self,
        model: &mut OptimisationModel,
        pf: &[VariableId],
    ) -> Result<SoftLimit> {
        let name = &self.params.name;
        let count = pf.len();
        let big_m = self.params.big_m;
        let pr = self.params.pr.value();

        let mut non_negative = |suffix: &str| {
            model.add_variables(
                &format!("{name}_{suffix}"),
                count,
                VariableKind::Continuous,
                0.0,
                f64::INFINITY,
            )
        };
        let ep = non_negative("ep_mw")?;
        let epp = non_negative("epp_mw")?;
        let epn = non_negative("epn_mw")?;
        let bpp = non_negative("bpp_mw")?;
        let bpn = non_negative("bpn_mw")?;
        let y1 = model.add_variables(&format!("{name}_y1"), count, VariableKind::Binary, 0.0, 1.0)?;
        let y2 = model.add_variables(&format!("{name}_y2"), count, VariableKind::Binary, 0.0, 1.0)?;

        for s in 0..count {
            model.add_equality(format!("{name}_c1[{s}]"), ep[s], epp[s] + epn[s])?;
            model.add_less_or_equal(format!("{name}_c2[{s}]"), epp[s], y1[s] * big_m)?;
            model.add_less_or_equal(
                format!("{name}_c3[{s}]"),
                bpp[s],
                LinearExpr::from_constant(big_m) - y1[s] * big_m,
            )?;
            model.add_less_or_equal(format!("{name}_c4[{s}]"), epn[s], y2[s] * big_m)?;
            model.add_less_or_equal(
                format!("{name}_c5[{s}]"),
                bpn[s],
                LinearExpr::from_constant(big_m) - y2[s] * big_m,
            )?;
            model.add_equality(format!("{name}_c6[{s}]"), pf[s] - pr, epp[s] - bpp[s])?;
            model.add_equality(
                format!("{name}_c7[{s}]"),
                -LinearExpr::from(pf[s]) - pr,
                epn[s] - bpn[s],
            )?;
        }

        Ok(SoftLimit { ep })
    }
}

impl Resource for TransmissionLine {
    fn name(&self) -> &ResourceID {
        &self.params.name
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::TransmissionLine
    }

    fn initialise(&mut self, model: &mut OptimisationModel, scenarios: &ScenarioTable) -> Result<()> {
        let name = &self.params.name;
        check_not_initialised(self.state.as_ref(), name)?;
        debug!("Initialising line {name}");

        let scene = self.params.resolve(scenarios, None)?;
        let limit = self.params.pr.value() * self.max_i_pu;
        let pf = scene
            .pa_pu
            .iter()
            .enumerate()
            .map(|(s, pa)| {
                let bound = (limit * pa).abs();
                model.add_variable(
                    format!("{name}_pf_mw[{s}]"),
                    VariableKind::Continuous,
                    -bound,
                    bound,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let soft_limit = match self.soft_limit_coefficient {
            Some(_) => Some(self.add_soft_limit(model, &pf)?),
            None => None,
        };

        self.state = Some(LineState {
            scene,
            pf,
            soft_limit,
        });
        Ok(())
    }

    fn active_power(&self, _scene: usize) -> Result<LinearExpr> {
        self.state()?;
        Ok(LinearExpr::zero())
    }

    fn transmitted_power(&self, scene: usize) -> Result<Option<LinearExpr>> {
        let state = self.state()?;
        Ok(Some(scene_entry(&state.pf, scene, self.name())?.into()))
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
        let pf = scene_entry(&state.pf, scene, self.name())?;
        let oc_0 = scene_entry(&state.scene.oc_0, scene, self.name())?;
        let oc_1 = scene_entry(&state.scene.oc_1, scene, self.name())?;

        let mut cost = pf * oc_1 + oc_0;
        if let (Some(soft_limit), Some(coefficient)) =
            (&state.soft_limit, self.soft_limit_coefficient)
        {
            cost += scene_entry(&soft_limit.ep, scene, self.name())? * coefficient;
        }

        Ok(cost)
    }

    fn reported_attributes(&self) -> &[&'static str] {
        &["pf_mw", "ep_mw"]
    }

    fn attribute_variables(&self, attribute: &str) -> Option<&[VariableId]> {
        let state = self.state.as_ref()?;
        match attribute {
            "pf_mw" => Some(&state.pf),
            "ep_mw" => state.soft_limit.as_ref().map(|soft| soft.ep.as_slice()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, scenarios};
    use crate::units::Power;
    use rstest::rstest;

    #[rstest]
    fn test_flow_bounds(scenarios: ScenarioTable) {
        let mut line = TransmissionLine::new(
            ResourceParams::new("L 0_1", Power(2.0)).with_availability(vec![1.0, 0.5, 0.0, 1.0]),
        )
        .unwrap();
        let mut model = OptimisationModel::new();
        line.initialise(&mut model, &scenarios).unwrap();

        let pf1 = model.find_variable("L 0_1_pf_mw[1]").unwrap();
        let variable = model.variable(pf1);
        assert_eq!((variable.lower, variable.upper), (-1.5, 1.5));

        assert!(line.active_power(1).unwrap().is_constant());
        assert_eq!(
            line.transmitted_power(1).unwrap(),
            Some(LinearExpr::from(pf1))
        );
        assert!(line.attribute_variables("ep_mw").is_none());
        assert!(!line.is_sizeable());
    }

    #[rstest]
    fn test_soft_limit_rows(scenarios: ScenarioTable) {
        let mut line = TransmissionLine::new(ResourceParams::new("line", Power(2.0)))
            .unwrap()
            .with_soft_limit(5.0);
        let mut model = OptimisationModel::new();
        line.initialise(&mut model, &scenarios).unwrap();

        for i in 1..=7 {
            assert!(model.constraint(&format!("line_c{i}[3]")).is_some());
        }
        let y1 = model.find_variable("line_y1[0]").unwrap();
        assert_eq!(model.variable(y1).kind, VariableKind::Binary);

        // pf - pr = epp - bpp, with the rating moved to the bounds
        let c6 = model.constraint("line_c6[0]").unwrap();
        assert_eq!((c6.lower, c6.upper), (2.0, 2.0));

        let ep = model.find_variable("line_ep_mw[0]").unwrap();
        assert_eq!(line.operating_cost(0).unwrap().coefficient(ep), 5.0);
        assert_eq!(line.attribute_variables("ep_mw").unwrap().len(), 4);
    }

    #[test]
    fn test_line_not_sizeable() {
        assert_error!(
            TransmissionLine::new(ResourceParams::new("line", Power(1.0)).with_construction(true)),
            "Construction of line line cannot be a decision"
        );
    }
}
