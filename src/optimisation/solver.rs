//! Solve an [`OptimisationModel`] with the HiGHS solver.
use super::{LinearExpr, OptimisationModel, VariableId, VariableKind};
use anyhow::{Context, Result, anyhow};
use highs::{HighsModelStatus, RowProblem as Problem, Sense};
use log::info;

/// Options passed through to the solver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverOptions {
    /// Relative MIP gap at which branch-and-bound stops
    pub mip_rel_gap: Option<f64>,
    /// Time limit in seconds
    pub time_limit: Option<f64>,
    /// Whether to let HiGHS print its own progress output
    pub verbose: bool,
}

/// The solved value of every variable of a model
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    values: Vec<f64>,
    objective: f64,
}

impl Solution {
    /// Create a solution from variable values in model order
    pub fn new(values: Vec<f64>, objective: f64) -> Self {
        Self { values, objective }
    }

    /// The solved value of a variable
    pub fn value(&self, var: VariableId) -> f64 {
        self.values[var.index()]
    }

    /// Evaluate an expression at the solved values
    pub fn eval(&self, expr: &LinearExpr) -> f64 {
        expr.evaluate(|var| self.value(var))
    }

    /// The objective value, including any constant part of the objective
    pub fn objective(&self) -> f64 {
        self.objective
    }
}

/// Solve the model, minimising its objective.
///
/// # Returns
///
/// The solution if HiGHS reports that an optimum was found, otherwise an error carrying the
/// solver's status.
pub fn solve(model: &OptimisationModel, options: &SolverOptions) -> Result<Solution> {
    let objective = model
        .objective()
        .context("Cannot solve a model with no objective")?;

    let mut costs = vec![0.0; model.num_variables()];
    for (var, coeff) in objective.terms() {
        costs[var.index()] += coeff;
    }

    // Set up problem
    let mut problem = Problem::default();
    let columns: Vec<_> = model
        .iter_variables()
        .zip(costs)
        .map(|((_, var), cost)| match var.kind {
            VariableKind::Continuous => problem.add_column(cost, var.lower..=var.upper),
            VariableKind::Integer | VariableKind::Binary => {
                problem.add_integer_column(cost, var.lower..=var.upper)
            }
        })
        .collect();

    for constraint in model.iter_constraints() {
        let row: Vec<_> = constraint
            .expr
            .terms()
            .map(|(var, coeff)| (columns[var.index()], coeff))
            .collect();
        problem.add_row(constraint.lower..=constraint.upper, row);
    }

    info!(
        "Solving model with {} variables and {} constraints",
        model.num_variables(),
        model.num_constraints()
    );

    let mut highs_model = problem.optimise(Sense::Minimise);
    highs_model.set_option("output_flag", options.verbose);
    if let Some(gap) = options.mip_rel_gap {
        highs_model.set_option("mip_rel_gap", gap);
    }
    if let Some(time_limit) = options.time_limit {
        highs_model.set_option("time_limit", time_limit);
    }

    // Solve model
    let solved = highs_model.solve();
    match solved.status() {
        HighsModelStatus::Optimal => {
            let values = solved.get_solution().columns().to_vec();
            let objective = objective.evaluate(|var| values[var.index()]);
            info!("Optimal solution found with objective {objective}");
            Ok(Solution::new(values, objective))
        }
        status => Err(anyhow!("Could not solve: {status:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_solve_lp() {
        // min x + 2y s.t. x + y >= 3, x <= 2
        let mut model = OptimisationModel::new();
        let x = model
            .add_variable("x", VariableKind::Continuous, 0.0, 2.0)
            .unwrap();
        let y = model
            .add_variable("y", VariableKind::Continuous, 0.0, f64::INFINITY)
            .unwrap();
        model
            .add_constraint("demand", x + LinearExpr::from(y), 3.0, f64::INFINITY)
            .unwrap();
        model
            .set_objective(LinearExpr::from(x) + 2.0 * y + 10.0)
            .unwrap();

        let solution = solve(&model, &SolverOptions::default()).unwrap();
        assert_approx_eq!(f64, solution.value(x), 2.0, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.value(y), 1.0, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.objective(), 14.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve_mip() {
        // Build decision: paying 5 to unlock capacity is cheaper than buying at 3 per unit
        let mut model = OptimisationModel::new();
        let build = model
            .add_variable("build", VariableKind::Binary, 0.0, 1.0)
            .unwrap();
        let own = model
            .add_variable("own", VariableKind::Continuous, 0.0, f64::INFINITY)
            .unwrap();
        let buy = model
            .add_variable("buy", VariableKind::Continuous, 0.0, f64::INFINITY)
            .unwrap();
        model.add_less_or_equal("own_M", own, 100.0 * build).unwrap();
        model
            .add_equality("balance", LinearExpr::from(own) + buy, 4.0)
            .unwrap();
        model
            .set_objective(5.0 * build + 3.0 * LinearExpr::from(buy))
            .unwrap();

        let solution = solve(&model, &SolverOptions::default()).unwrap();
        assert_approx_eq!(f64, solution.value(build), 1.0, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.objective(), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve_infeasible() {
        let mut model = OptimisationModel::new();
        let x = model
            .add_variable("x", VariableKind::Continuous, 0.0, 1.0)
            .unwrap();
        model
            .add_constraint("c", LinearExpr::from(x), 2.0, 3.0)
            .unwrap();
        model.set_objective(LinearExpr::from(x)).unwrap();

        assert!(solve(&model, &SolverOptions::default()).is_err());
    }

    #[test]
    fn test_solve_no_objective() {
        let model = OptimisationModel::new();
        assert!(solve(&model, &SolverOptions::default()).is_err());
    }
}
