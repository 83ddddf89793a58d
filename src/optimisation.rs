//! The optimisation model which resources and the model writer populate.
//!
//! [`OptimisationModel`] is a solver-independent collection of named decision variables, named
//! constraints and a single objective to be minimised. Every entry is added through the model's
//! methods, which enforce that names are unique: resources prefix everything they add with their
//! own name, so a collision means two resources share a name or a resource was initialised twice.
//!
//! The model is handed to [`solver::solve`] once complete.
use anyhow::{Result, bail, ensure};
use indexmap::IndexMap;
use std::fmt;

pub mod expr;
pub mod solver;
pub use expr::LinearExpr;
pub use solver::{Solution, SolverOptions};

/// Refers to a decision variable of an [`OptimisationModel`].
///
/// Note that this type does **not** include the value of the variable; it is only a handle which
/// can be used in expressions and to read the value from a [`Solution`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct VariableId(usize);

impl VariableId {
    /// The position of the variable in its model
    pub fn index(self) -> usize {
        self.0
    }
}

/// The domain of a decision variable
#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::Display)]
pub enum VariableKind {
    /// A real-valued variable
    Continuous,
    /// An integer-valued variable
    Integer,
    /// An integer variable restricted to zero or one
    Binary,
}

/// A decision variable
#[derive(Clone, PartialEq, Debug)]
pub struct Variable {
    /// Unique name
    pub name: String,
    /// Domain
    pub kind: VariableKind,
    /// Lower bound (may be `-inf`)
    pub lower: f64,
    /// Upper bound (may be `inf`)
    pub upper: f64,
}

/// A linear constraint of the form `lower <= expr <= upper`.
///
/// The expression never has a constant part; constants are folded into the bounds when the
/// constraint is added.
#[derive(Clone, PartialEq, Debug)]
pub struct Constraint {
    /// Unique name
    pub name: String,
    /// The constrained expression
    pub expr: LinearExpr,
    /// Lower bound (may be `-inf`)
    pub lower: f64,
    /// Upper bound (may be `inf`)
    pub upper: f64,
}

/// A collection of variables, constraints and an objective to be minimised
#[derive(Default)]
pub struct OptimisationModel {
    variables: IndexMap<String, Variable>,
    constraints: IndexMap<String, Constraint>,
    objective: Option<LinearExpr>,
}

impl OptimisationModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a decision variable.
    ///
    /// Binary variables have their bounds clamped to `[0, 1]`.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique name for the variable
    /// * `kind` - The variable's domain
    /// * `lower` - Lower bound
    /// * `upper` - Upper bound
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        kind: VariableKind,
        lower: f64,
        upper: f64,
    ) -> Result<VariableId> {
        let name = name.into();
        let (lower, upper) = match kind {
            VariableKind::Binary => (lower.max(0.0), upper.min(1.0)),
            _ => (lower, upper),
        };
        check_bounds(&name, lower, upper)?;
        ensure!(
            !self.variables.contains_key(&name),
            "Duplicate variable name: {name}"
        );

        let id = VariableId(self.variables.len());
        self.variables.insert(
            name.clone(),
            Variable {
                name,
                kind,
                lower,
                upper,
            },
        );

        Ok(id)
    }

    /// Add one variable per index, named `<prefix>[i]`, with the same domain and bounds
    pub fn add_variables(
        &mut self,
        prefix: &str,
        count: usize,
        kind: VariableKind,
        lower: f64,
        upper: f64,
    ) -> Result<Vec<VariableId>> {
        (0..count)
            .map(|i| self.add_variable(format!("{prefix}[{i}]"), kind, lower, upper))
            .collect()
    }

    /// Change the bounds of an existing variable
    pub fn set_bounds(&mut self, var: VariableId, lower: f64, upper: f64) -> Result<()> {
        let variable = self.variable_mut(var);
        check_bounds(&variable.name, lower, upper)?;
        variable.lower = lower;
        variable.upper = upper;

        Ok(())
    }

    /// Add the constraint `lower <= expr <= upper`.
    ///
    /// Any constant part of `expr` is moved into the bounds.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        lower: f64,
        upper: f64,
    ) -> Result<()> {
        let name = name.into();
        ensure!(
            !self.constraints.contains_key(&name),
            "Duplicate constraint name: {name}"
        );
        for (var, _) in expr.terms() {
            assert!(
                var.0 < self.variables.len(),
                "Constraint {name} refers to a variable from another model"
            );
        }

        let offset = expr.constant();
        let constraint = Constraint {
            name: name.clone(),
            expr: expr.without_constant(),
            lower: lower - offset,
            upper: upper - offset,
        };
        check_bounds(&name, constraint.lower, constraint.upper)?;
        self.constraints.insert(name, constraint);

        Ok(())
    }

    /// Add the constraint `lhs == rhs`
    pub fn add_equality(
        &mut self,
        name: impl Into<String>,
        lhs: impl Into<LinearExpr>,
        rhs: impl Into<LinearExpr>,
    ) -> Result<()> {
        self.add_constraint(name, lhs.into() - rhs.into(), 0.0, 0.0)
    }

    /// Add the constraint `lhs <= rhs`
    pub fn add_less_or_equal(
        &mut self,
        name: impl Into<String>,
        lhs: impl Into<LinearExpr>,
        rhs: impl Into<LinearExpr>,
    ) -> Result<()> {
        self.add_constraint(name, lhs.into() - rhs.into(), f64::NEG_INFINITY, 0.0)
    }

    /// Set the expression to be minimised.
    ///
    /// A model has exactly one objective, so setting it twice is an error.
    pub fn set_objective(&mut self, expr: LinearExpr) -> Result<()> {
        if self.objective.is_some() {
            bail!("Objective already set");
        }
        self.objective = Some(expr);

        Ok(())
    }

    /// The objective, if one has been set
    pub fn objective(&self) -> Option<&LinearExpr> {
        self.objective.as_ref()
    }

    /// Get a variable by its handle
    pub fn variable(&self, var: VariableId) -> &Variable {
        &self.variables[var.0]
    }

    fn variable_mut(&mut self, var: VariableId) -> &mut Variable {
        &mut self.variables[var.0]
    }

    /// Look up a variable by name
    pub fn find_variable(&self, name: &str) -> Option<VariableId> {
        self.variables.get_index_of(name).map(VariableId)
    }

    /// Look up a constraint by name
    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.get(name)
    }

    /// Iterate over variables in the order they were added
    pub fn iter_variables(&self) -> impl Iterator<Item = (VariableId, &Variable)> {
        self.variables
            .values()
            .enumerate()
            .map(|(i, var)| (VariableId(i), var))
    }

    /// Iterate over constraints in the order they were added
    pub fn iter_constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values()
    }

    /// The number of variables
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// The number of constraints
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
}

impl fmt::Debug for OptimisationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimisationModel")
            .field("variables", &self.variables.len())
            .field("constraints", &self.constraints.len())
            .field("has_objective", &self.objective.is_some())
            .finish()
    }
}

/// Check that bounds are not NaN and don't cross
fn check_bounds(name: &str, lower: f64, upper: f64) -> Result<()> {
    ensure!(
        !lower.is_nan() && !upper.is_nan(),
        "Bounds for {name} must not be NaN"
    );
    ensure!(
        lower <= upper,
        "Lower bound for {name} ({lower}) exceeds upper bound ({upper})"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;

    #[test]
    fn test_add_variable_duplicate() {
        let mut model = OptimisationModel::new();
        model
            .add_variable("pv1_create", VariableKind::Binary, 0.0, 1.0)
            .unwrap();
        assert_error!(
            model.add_variable("pv1_create", VariableKind::Binary, 0.0, 1.0),
            "Duplicate variable name: pv1_create"
        );
    }

    #[test]
    fn test_add_variables_names() {
        let mut model = OptimisationModel::new();
        let vars = model
            .add_variables("grid_p_mw", 3, VariableKind::Continuous, 0.0, 10.0)
            .unwrap();
        assert_eq!(vars.len(), 3);
        assert_eq!(model.variable(vars[2]).name, "grid_p_mw[2]");
        assert_eq!(model.find_variable("grid_p_mw[1]"), Some(vars[1]));
        assert_eq!(model.find_variable("grid_p_mw[3]"), None);
    }

    #[test]
    fn test_binary_bounds_clamped() {
        let mut model = OptimisationModel::new();
        let var = model
            .add_variable("build", VariableKind::Binary, f64::NEG_INFINITY, f64::INFINITY)
            .unwrap();
        let variable = model.variable(var);
        assert_eq!((variable.lower, variable.upper), (0.0, 1.0));
    }

    #[test]
    fn test_crossed_bounds() {
        let mut model = OptimisationModel::new();
        assert_error!(
            model.add_variable("x", VariableKind::Continuous, 2.0, 1.0),
            "Lower bound for x (2) exceeds upper bound (1)"
        );
    }

    #[test]
    fn test_constant_moved_to_bounds() {
        let mut model = OptimisationModel::new();
        let x = model
            .add_variable("x", VariableKind::Continuous, 0.0, 10.0)
            .unwrap();
        model
            .add_less_or_equal("c", LinearExpr::from(x) + 3.0, 5.0)
            .unwrap();

        let constraint = model.constraint("c").unwrap();
        assert_eq!(constraint.expr.constant(), 0.0);
        assert_eq!(constraint.lower, f64::NEG_INFINITY);
        assert_eq!(constraint.upper, 2.0);
    }

    #[test]
    fn test_add_constraint_duplicate() {
        let mut model = OptimisationModel::new();
        let x = model
            .add_variable("x", VariableKind::Continuous, 0.0, 1.0)
            .unwrap();
        model.add_equality("c", x, 1.0).unwrap();
        assert_error!(
            model.add_equality("c", x, 0.0),
            "Duplicate constraint name: c"
        );
        assert_eq!(model.num_constraints(), 1);
    }

    #[test]
    fn test_set_objective_twice() {
        let mut model = OptimisationModel::new();
        model.set_objective(LinearExpr::zero()).unwrap();
        assert_error!(
            model.set_objective(LinearExpr::zero()),
            "Objective already set"
        );
    }
}
