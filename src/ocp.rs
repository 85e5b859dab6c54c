mod constraint;
mod error;
mod report;
mod slot;

pub use constraint::ConstraintBlock;
pub use error::Error;
pub use slot::UNBOUNDED;

use std::collections::HashMap;

use tracing::warn;

use crate::{
    dynamics::DynamicsModel,
    expr::{Expr, ExprVec},
    stage::ShootingStage,
};

use slot::SlotTable;

/// The variable and constraint registry for one optimal-control problem.
///
/// An `Ocp` owns the flat design-variable vector (with per-variable bounds
/// and guesses), the named parameters and shooting stages defined over it,
/// and the stacked constraint vector handed to a solver. Parameter and
/// stage registration are the only ways the vector grows, and every name
/// entering the problem is checked for uniqueness before any mutation, so
/// the registry's bookkeeping can never be partially applied.
///
/// Registering a shooting stage also appends that stage's inter-interval
/// dynamics-defect equalities, tying its trajectory together without any
/// caller involvement.
#[derive(Default)]
pub struct Ocp {
    slots: SlotTable,
    params: Vec<String>,
    param_slots: HashMap<String, usize>,
    stages: Vec<ShootingStage>,
    stage_index: HashMap<String, usize>,
    constraints: Vec<ConstraintBlock>,
}

impl Ocp {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named scalar parameter and returns its variable handle.
    ///
    /// The parameter starts effectively unbounded with a zero guess.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateName`] if `name` already denotes a
    /// parameter, a stage, or a name owned by a registered stage's model;
    /// nothing is mutated in that case.
    pub fn add_param(&mut self, name: &str) -> Result<Expr, Error> {
        self.assert_unique_name(name)?;

        let index = self.slots.push(name);
        self.params.push(name.to_string());
        self.param_slots.insert(name.to_string(), index);

        Ok(self.slots.var(index).clone())
    }

    /// Looks up a registered parameter's variable handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownParameter`] if `name` is not registered.
    pub fn param(&self, name: &str) -> Result<Expr, Error> {
        let index = self.param_slot(name)?;
        Ok(self.slots.var(index).clone())
    }

    /// Sets a parameter's bounds, silently clamping its guess into range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownParameter`] if `name` is not registered.
    pub fn bound_param(&mut self, name: &str, lower: f64, upper: f64) -> Result<(), Error> {
        let index = self.param_slot(name)?;
        self.slots.bound(index, lower, upper);
        Ok(())
    }

    /// Sets a parameter's initial guess, clamped to its bounds.
    ///
    /// A clamp is reported as a warning, not an error: guesses are advisory
    /// starting points.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownParameter`] if `name` is not registered.
    #[allow(clippy::float_cmp)]
    pub fn set_param_guess(&mut self, name: &str, value: f64) -> Result<(), Error> {
        let index = self.param_slot(name)?;
        let stored = self.slots.set_guess_clamped(index, value);
        if stored != value {
            warn!(
                param = name,
                requested = value,
                stored,
                "initial guess clamped to parameter bounds"
            );
        }
        Ok(())
    }

    fn param_slot(&self, name: &str) -> Result<usize, Error> {
        self.param_slots
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownParameter {
                name: name.to_string(),
            })
    }

    /// Registers a shooting stage discretizing `model` over `intervals`
    /// intervals on `[t0, tf]`.
    ///
    /// Appends `intervals * width` design variables (defaulted like
    /// parameters), constructs the stage over that slice, and wires one
    /// equality constraint block per adjacent interval pair so the stage's
    /// trajectory is dynamics-consistent by construction. `t0` and `tf` are
    /// expressions, so either may itself be a registered parameter.
    ///
    /// The stage sees the parameters registered so far; add parameters a
    /// model needs before the stage that uses them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateName`] if `name` collides with any
    /// registered name or with a name `model` owns internally, and
    /// [`Error::InvalidIntervalCount`] if `intervals` is zero. Nothing is
    /// mutated on failure.
    pub fn add_multiple_shooting(
        &mut self,
        name: &str,
        model: impl DynamicsModel + 'static,
        t0: impl Into<Expr>,
        tf: impl Into<Expr>,
        intervals: usize,
    ) -> Result<&ShootingStage, Error> {
        self.assert_unique_name(name)?;
        if model.owns_name(name) {
            return Err(Error::DuplicateName {
                name: name.to_string(),
            });
        }
        if intervals == 0 {
            return Err(Error::InvalidIntervalCount { given: 0 });
        }

        let width = model.width();
        let start = self.slots.len();
        for i in 0..intervals * width {
            self.slots.push(format!("{name}_{i}"));
        }
        let vars = (start..start + intervals * width)
            .map(|i| self.slots.var(i).clone())
            .collect();

        let params = self
            .param_slots
            .iter()
            .map(|(param, &index)| (param.clone(), self.slots.var(index).clone()))
            .collect();

        let stage = ShootingStage::new(
            name.to_string(),
            Box::new(model),
            t0.into(),
            tf.into(),
            intervals,
            start,
            vars,
            params,
        );

        let position = self.stages.len();
        self.stage_index.insert(name.to_string(), position);
        self.stages.push(stage);

        let stage = &self.stages[position];
        for k in 0..intervals - 1 {
            let defect = stage.dynamics_constraint_error(k);
            self.constraints.push(ConstraintBlock::equality(defect, name));
        }

        Ok(&self.stages[position])
    }

    /// Looks up a registered shooting stage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownStage`] if `name` is not registered.
    pub fn stage(&self, name: &str) -> Result<&ShootingStage, Error> {
        self.stage_index
            .get(name)
            .map(|&position| &self.stages[position])
            .ok_or_else(|| Error::UnknownStage {
                name: name.to_string(),
            })
    }

    /// Registered stages, in registration order.
    pub fn stages(&self) -> impl Iterator<Item = &ShootingStage> {
        self.stages.iter()
    }

    /// Registered parameters as `(name, slot index)`, in registration order.
    pub fn params(&self) -> impl Iterator<Item = (&str, usize)> {
        self.params
            .iter()
            .map(|name| (name.as_str(), self.param_slots[name.as_str()]))
    }

    /// Sets the bounds of a stage's named state or action at interval `k`,
    /// silently clamping its guess into range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownStage`] or [`Error::UnknownStageVar`] on a
    /// lookup miss.
    pub fn bound_stage_var(
        &mut self,
        stage: &str,
        name: &str,
        k: usize,
        lower: f64,
        upper: f64,
    ) -> Result<(), Error> {
        let index = self.stage_var_slot(stage, name, k)?;
        self.slots.bound(index, lower, upper);
        Ok(())
    }

    /// Sets the guess of a stage's named state or action at interval `k`,
    /// clamped to its bounds with a warning on clamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownStage`] or [`Error::UnknownStageVar`] on a
    /// lookup miss.
    #[allow(clippy::float_cmp)]
    pub fn set_stage_guess(
        &mut self,
        stage: &str,
        name: &str,
        k: usize,
        value: f64,
    ) -> Result<(), Error> {
        let index = self.stage_var_slot(stage, name, k)?;
        let stored = self.slots.set_guess_clamped(index, value);
        if stored != value {
            warn!(
                stage,
                var = name,
                interval = k,
                requested = value,
                stored,
                "initial guess clamped to variable bounds"
            );
        }
        Ok(())
    }

    fn stage_var_slot(&self, stage: &str, name: &str, k: usize) -> Result<usize, Error> {
        self.stage(stage)?
            .slot_of(name, k)
            .ok_or_else(|| Error::UnknownStageVar {
                stage: stage.to_string(),
                name: name.to_string(),
                interval: k,
            })
    }

    /// Appends an equality constraint block: every row pinned to zero.
    pub fn add_nonlcon_eq(&mut self, rows: ExprVec, label: impl Into<String>) {
        self.constraints.push(ConstraintBlock::equality(rows, label));
    }

    /// Appends an inequality constraint block: every row `g(x) <= 0`.
    pub fn add_nonlcon_ineq(&mut self, rows: ExprVec, label: impl Into<String>) {
        self.constraints
            .push(ConstraintBlock::inequality(rows, label));
    }

    /// Constraint blocks in insertion order, which is solver row order.
    #[must_use]
    pub fn constraints(&self) -> &[ConstraintBlock] {
        &self.constraints
    }

    /// All constraint rows stacked into one column, in insertion order.
    #[must_use]
    pub fn constraint_vector(&self) -> ExprVec {
        self.constraints
            .iter()
            .flat_map(|block| block.rows().iter().cloned())
            .collect()
    }

    #[must_use]
    pub fn constraint_lower_bounds(&self) -> Vec<f64> {
        self.constraints
            .iter()
            .flat_map(|block| block.bounds().iter().map(|&(lower, _)| lower))
            .collect()
    }

    #[must_use]
    pub fn constraint_upper_bounds(&self) -> Vec<f64> {
        self.constraints
            .iter()
            .flat_map(|block| block.bounds().iter().map(|&(_, upper)| upper))
            .collect()
    }

    /// Number of design variables.
    #[must_use]
    pub fn num_vars(&self) -> usize {
        self.slots.len()
    }

    /// The full design-variable column, in slot order.
    #[must_use]
    pub fn design_variables(&self) -> ExprVec {
        self.slots.vars()
    }

    #[must_use]
    pub fn lower_bounds(&self) -> Vec<f64> {
        self.slots.lower_bounds()
    }

    #[must_use]
    pub fn upper_bounds(&self) -> Vec<f64> {
        self.slots.upper_bounds()
    }

    /// Initial guesses, index-aligned with the design vector.
    #[must_use]
    pub fn guesses(&self) -> Vec<f64> {
        self.slots.guesses()
    }

    /// Checks a candidate name against every name the problem knows:
    /// parameters, stages, and each registered stage model's own states,
    /// actions, and outputs.
    fn assert_unique_name(&self, name: &str) -> Result<(), Error> {
        let taken = self.param_slots.contains_key(name)
            || self.stage_index.contains_key(name)
            || self.stages.iter().any(|stage| stage.owns_name(name));
        if taken {
            return Err(Error::DuplicateName {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}
