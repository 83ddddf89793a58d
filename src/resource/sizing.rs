//! The big-M pattern shared by every resource whose construction is a decision.
//!
//! A sizeable resource owns a construction binary `<name>_create`. Every capacity-typed quantity
//! of the resource (power rating, energy rating, unit count) is gated by it: `x <= M * create`, so
//! an unbuilt resource has zero capacity.
use crate::id::ResourceID;
use crate::optimisation::{LinearExpr, OptimisationModel, Solution, VariableId, VariableKind};
use anyhow::Result;

/// How the capacity of a resource is decided
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SizingMode {
    /// The resource exists with its configured capacity
    Fixed,
    /// The model decides whether to build the resource at its configured capacity
    BuildOnly,
    /// The model decides whether to build the resource and its capacity
    Sized,
}

impl SizingMode {
    /// Derive the mode from the construction and sizing flags of a resource
    pub fn new(decide_construction: bool, size: bool) -> Self {
        match (decide_construction, size) {
            (false, _) => Self::Fixed,
            (true, false) => Self::BuildOnly,
            (true, true) => Self::Sized,
        }
    }
}

/// A construction decision: either a binary variable or a resource which always exists
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct BuildDecision {
    mode: SizingMode,
    create: Option<VariableId>,
    big_m: f64,
}

impl BuildDecision {
    /// Add the construction binary `<name>_create` to the model, unless capacity is fixed
    pub fn new(
        model: &mut OptimisationModel,
        name: &ResourceID,
        mode: SizingMode,
        big_m: f64,
    ) -> Result<Self> {
        let create = match mode {
            SizingMode::Fixed => None,
            SizingMode::BuildOnly | SizingMode::Sized => Some(model.add_variable(
                format!("{name}_create"),
                VariableKind::Binary,
                0.0,
                1.0,
            )?),
        };

        Ok(Self { mode, create, big_m })
    }

    /// The sizing mode
    pub fn mode(&self) -> SizingMode {
        self.mode
    }

    /// The construction binary, if any
    pub fn variable(&self) -> Option<VariableId> {
        self.create
    }

    /// The construction decision as an expression: the binary, or one if always built
    pub fn expr(&self) -> LinearExpr {
        self.create
            .map_or_else(|| LinearExpr::from_constant(1.0), LinearExpr::from)
    }

    /// `value` if built, else zero
    pub fn scaled(&self, value: f64) -> LinearExpr {
        self.expr() * value
    }

    /// Whether the resource was built in a solution (binary above one half)
    pub fn is_built(&self, solution: &Solution) -> bool {
        self.create.is_none_or(|var| solution.value(var) > 0.5)
    }

    /// Add the constraint `expr <= M * create`.
    ///
    /// Does nothing if there is no construction binary.
    pub fn gate(
        &self,
        model: &mut OptimisationModel,
        constraint: String,
        expr: impl Into<LinearExpr>,
    ) -> Result<()> {
        match self.create {
            Some(create) => model.add_less_or_equal(constraint, expr, create * self.big_m),
            None => Ok(()),
        }
    }

    /// Add a rating for a capacity of the resource.
    ///
    /// For [`SizingMode::Sized`] this creates the continuous variable `variable` and gates it with
    /// the constraint `constraint`; otherwise the rating is the configured value (times the
    /// construction binary in [`SizingMode::BuildOnly`]).
    pub fn add_rating(
        &self,
        model: &mut OptimisationModel,
        variable: String,
        constraint: String,
        configured: f64,
    ) -> Result<Rating> {
        let kind = match (self.mode, self.create) {
            (SizingMode::Sized, Some(_)) => {
                let var = model.add_variable(variable, VariableKind::Continuous, 0.0, f64::INFINITY)?;
                self.gate(model, constraint, var)?;
                RatingKind::Variable(var)
            }
            (SizingMode::BuildOnly, Some(create)) => RatingKind::Gated(create),
            _ => RatingKind::Fixed,
        };

        Ok(Rating { configured, kind })
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
enum RatingKind {
    Fixed,
    Gated(VariableId),
    Variable(VariableId),
}

/// A capacity of a resource, which may be a decision
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Rating {
    configured: f64,
    kind: RatingKind,
}

impl Rating {
    /// The rating as an expression over the resource's variables
    pub fn expr(&self) -> LinearExpr {
        match self.kind {
            RatingKind::Fixed => LinearExpr::from_constant(self.configured),
            RatingKind::Gated(create) => create * self.configured,
            RatingKind::Variable(var) => var.into(),
        }
    }

    /// The rating variable, if the capacity is a continuous decision
    pub fn variable(&self) -> Option<VariableId> {
        match self.kind {
            RatingKind::Variable(var) => Some(var),
            _ => None,
        }
    }

    /// The rating in a solution, or the configured rating without one
    pub fn value(&self, solution: Option<&Solution>) -> f64 {
        match solution {
            Some(solution) => solution.eval(&self.expr()),
            None => self.configured,
        }
    }
}
