use std::{collections::HashMap, ops::Range};

use crate::{
    dynamics::{DynamicsModel, StepInput},
    expr::{Expr, ExprVec},
};

/// One multiple-shooting stage.
///
/// A stage owns a contiguous slice of the global design vector and
/// discretizes one [`DynamicsModel`] over `n` intervals. The slice is
/// node-major: interval `k` owns its state column followed by its action
/// column. Continuity between adjacent intervals is expressed by
/// [`dynamics_constraint_error`], which the registry wires into the global
/// constraint vector at registration.
///
/// [`dynamics_constraint_error`]: ShootingStage::dynamics_constraint_error
impl std::fmt::Debug for ShootingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShootingStage")
            .field("name", &self.name)
            .field("intervals", &self.intervals)
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}

pub struct ShootingStage {
    name: String,
    model: Box<dyn DynamicsModel>,
    t0: Expr,
    tf: Expr,
    intervals: usize,
    start: usize,
    vars: Vec<Expr>,
    params: HashMap<String, Expr>,
    state_names: Vec<String>,
    action_names: Vec<String>,
    output_names: Vec<String>,
}

impl ShootingStage {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        model: Box<dyn DynamicsModel>,
        t0: Expr,
        tf: Expr,
        intervals: usize,
        start: usize,
        vars: Vec<Expr>,
        params: HashMap<String, Expr>,
    ) -> Self {
        let state_names = model.state_names();
        let action_names = model.action_names();
        let output_names = model.output_names();
        Self {
            name,
            model,
            t0,
            tf,
            intervals,
            start,
            vars,
            params,
            state_names,
            action_names,
            output_names,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of shooting intervals.
    #[must_use]
    pub fn intervals(&self) -> usize {
        self.intervals
    }

    #[must_use]
    pub fn model(&self) -> &dyn DynamicsModel {
        self.model.as_ref()
    }

    /// The stage's owned range of global design-vector indices.
    #[must_use]
    pub fn index_range(&self) -> Range<usize> {
        self.start..self.start + self.vars.len()
    }

    #[must_use]
    pub fn state_names(&self) -> &[String] {
        &self.state_names
    }

    #[must_use]
    pub fn action_names(&self) -> &[String] {
        &self.action_names
    }

    #[must_use]
    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn width(&self) -> usize {
        self.state_names.len() + self.action_names.len()
    }

    /// State column at interval `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k >= intervals`.
    #[must_use]
    pub fn state(&self, k: usize) -> ExprVec {
        assert!(k < self.intervals, "interval {k} out of range");
        let base = k * self.width();
        self.vars[base..base + self.state_names.len()]
            .iter()
            .cloned()
            .collect()
    }

    /// Action column at interval `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k >= intervals`.
    #[must_use]
    pub fn action(&self, k: usize) -> ExprVec {
        assert!(k < self.intervals, "interval {k} out of range");
        let base = k * self.width() + self.state_names.len();
        self.vars[base..base + self.action_names.len()]
            .iter()
            .cloned()
            .collect()
    }

    /// Width of one interval on the stage's uniform time grid.
    fn interval_width(&self) -> Expr {
        if self.intervals == 1 {
            return &self.tf - &self.t0;
        }
        #[allow(clippy::cast_precision_loss)]
        let divisor = (self.intervals - 1) as f64;
        (&self.tf - &self.t0) / divisor
    }

    /// Start time of interval `k` on the stage's uniform time grid.
    ///
    /// # Panics
    ///
    /// Panics if `k >= intervals`.
    #[must_use]
    pub fn time_at(&self, k: usize) -> Expr {
        assert!(k < self.intervals, "interval {k} out of range");
        if self.intervals == 1 {
            return self.t0.clone();
        }
        #[allow(clippy::cast_precision_loss)]
        let steps = k as f64;
        &self.t0 + self.interval_width() * steps
    }

    fn step_input<'a>(&'a self, state: &'a ExprVec, action: &'a ExprVec, k: usize) -> StepInput<'a> {
        StepInput {
            state,
            action,
            params: &self.params,
            t: self.time_at(k),
            dt: self.interval_width(),
        }
    }

    /// The dynamics-defect residual between intervals `k` and `k + 1`.
    ///
    /// Propagates interval `k`'s state one step forward under the model and
    /// subtracts interval `k + 1`'s declared state; the result has one row
    /// per model state and is zero exactly when the trajectory is
    /// dynamics-consistent across the pair.
    ///
    /// # Panics
    ///
    /// Panics if `k + 1 >= intervals`.
    #[must_use]
    pub fn dynamics_constraint_error(&self, k: usize) -> ExprVec {
        assert!(
            k + 1 < self.intervals,
            "no interval pair ({k}, {}) in a stage of {} intervals",
            k + 1,
            self.intervals
        );
        let state = self.state(k);
        let action = self.action(k);
        let propagated = self.model.step(&self.step_input(&state, &action, k));
        propagated - self.state(k + 1)
    }

    /// The named state's value at every interval, in interval order.
    ///
    /// Returns `None` if the model has no state called `name`. Used for
    /// reporting, never for constraint construction.
    #[must_use]
    pub fn state_trajectory(&self, name: &str) -> Option<Vec<Expr>> {
        let offset = self.state_names.iter().position(|n| n == name)?;
        Some(self.column_trajectory(offset))
    }

    /// The named action's value at every interval, in interval order.
    #[must_use]
    pub fn action_trajectory(&self, name: &str) -> Option<Vec<Expr>> {
        let offset = self.action_names.iter().position(|n| n == name)?;
        Some(self.column_trajectory(self.state_names.len() + offset))
    }

    fn column_trajectory(&self, offset: usize) -> Vec<Expr> {
        (0..self.intervals)
            .map(|k| self.vars[k * self.width() + offset].clone())
            .collect()
    }

    /// The named model output evaluated at every interval.
    ///
    /// Returns `None` if the model does not resolve `name` at some interval.
    #[must_use]
    pub fn output_trajectory(&self, name: &str) -> Option<Vec<Expr>> {
        if !self.output_names.iter().any(|n| n == name) {
            return None;
        }
        (0..self.intervals)
            .map(|k| {
                let state = self.state(k);
                let action = self.action(k);
                self.model
                    .output(name, &self.step_input(&state, &action, k))
            })
            .collect()
    }

    /// The stage's time grid, in interval order.
    #[must_use]
    pub fn time_trajectory(&self) -> Vec<Expr> {
        (0..self.intervals).map(|k| self.time_at(k)).collect()
    }

    /// Global slot index of the named state or action at interval `k`.
    #[must_use]
    pub fn slot_of(&self, name: &str, k: usize) -> Option<usize> {
        if k >= self.intervals {
            return None;
        }
        let offset = self
            .state_names
            .iter()
            .position(|n| n == name)
            .or_else(|| {
                self.action_names
                    .iter()
                    .position(|n| n == name)
                    .map(|j| self.state_names.len() + j)
            })?;
        Some(self.start + k * self.width() + offset)
    }

    pub(crate) fn owns_name(&self, candidate: &str) -> bool {
        self.model.owns_name(candidate)
    }
}
