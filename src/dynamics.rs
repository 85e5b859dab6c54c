use std::collections::HashMap;

use crate::expr::{Expr, ExprVec};

/// Everything a dynamics model sees when propagating one shooting interval.
pub struct StepInput<'a> {
    /// State column at the interval start.
    pub state: &'a ExprVec,
    /// Action column held constant over the interval.
    pub action: &'a ExprVec,
    /// Problem parameters visible to the stage, by name.
    pub params: &'a HashMap<String, Expr>,
    /// Interval start time.
    pub t: Expr,
    /// Interval width.
    pub dt: Expr,
}

/// A continuous-time dynamics model discretized by a shooting stage.
///
/// The registry stores stages over unrelated model types, so this trait is
/// object safe and dispatched dynamically. Implementors declare their named
/// states and actions, and propagate a state one interval forward as a
/// symbolic expression; how that propagation is integrated is entirely the
/// model's business.
pub trait DynamicsModel {
    /// Names of the model's states, in state-vector order.
    fn state_names(&self) -> Vec<String>;

    /// Names of the model's actions, in action-vector order.
    fn action_names(&self) -> Vec<String>;

    /// Names of the model's derived outputs, if any.
    fn output_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Propagates the interval-start state across one interval.
    ///
    /// The returned column is the model's end-state expression and must have
    /// one row per state.
    fn step(&self, input: &StepInput) -> ExprVec;

    /// A named output expression at one interval, or `None` if the model
    /// does not expose `name`.
    fn output(&self, name: &str, input: &StepInput) -> Option<Expr> {
        let _ = (name, input);
        None
    }

    /// Whether `candidate` collides with a name this model owns internally.
    fn owns_name(&self, candidate: &str) -> bool {
        self.state_names().iter().any(|n| n == candidate)
            || self.action_names().iter().any(|n| n == candidate)
            || self.output_names().iter().any(|n| n == candidate)
    }

    fn num_states(&self) -> usize {
        self.state_names().len()
    }

    fn num_actions(&self) -> usize {
        self.action_names().len()
    }

    /// Unknowns owned per interval: states and actions concatenated.
    fn width(&self) -> usize {
        self.num_states() + self.num_actions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Cart;

    impl DynamicsModel for Cart {
        fn state_names(&self) -> Vec<String> {
            vec!["pos".into(), "vel".into()]
        }

        fn action_names(&self) -> Vec<String> {
            vec!["force".into()]
        }

        fn output_names(&self) -> Vec<String> {
            vec!["momentum".into()]
        }

        fn step(&self, input: &StepInput) -> ExprVec {
            vec![
                &input.state[0] + &input.dt * &input.state[1],
                &input.state[1] + &input.dt * &input.action[0],
            ]
            .into()
        }
    }

    #[test]
    fn widths_follow_name_lists() {
        let cart = Cart;
        assert_eq!(cart.num_states(), 2);
        assert_eq!(cart.num_actions(), 1);
        assert_eq!(cart.width(), 3);
    }

    #[test]
    fn owns_every_declared_name() {
        let cart = Cart;
        assert!(cart.owns_name("pos"));
        assert!(cart.owns_name("force"));
        assert!(cart.owns_name("momentum"));
        assert!(!cart.owns_name("cart"));
    }
}
