//! Assembles nonlinear optimal-control problems via multiple shooting.
//!
//! An [`Ocp`] registers free parameters and shooting stages, growing one
//! flat design-variable vector with per-variable bounds and guesses and
//! accumulating labeled constraint blocks. Registering a stage wires its
//! inter-interval dynamics-consistency equalities automatically, so N
//! independently discretized stages compose into a single solver-ready
//! problem. Solved vectors map back through the same name/index structures
//! for reporting.
//!
//! The symbolic engine, dynamics integration schemes, and the NLP solver
//! itself are collaborators behind the [`Expr`] and [`DynamicsModel`]
//! boundaries; this crate is the bookkeeping and composition protocol
//! between them.

mod dynamics;
mod expr;
mod stage;

pub mod ocp;

pub use dynamics::{DynamicsModel, StepInput};
pub use expr::{Expr, ExprVec};
pub use ocp::{ConstraintBlock, Error, Ocp, UNBOUNDED};
pub use stage::ShootingStage;
