use crate::expr::ExprVec;

use super::UNBOUNDED;

/// A labeled group of scalar constraint rows with per-row bounds.
///
/// Blocks are append-only on the registry; their insertion order is the
/// order rows appear to the solver.
#[derive(Clone, Debug)]
pub struct ConstraintBlock {
    label: String,
    rows: ExprVec,
    bounds: Vec<(f64, f64)>,
}

impl ConstraintBlock {
    /// An equality block: every row pinned to zero.
    #[must_use]
    pub fn equality(rows: ExprVec, label: impl Into<String>) -> Self {
        Self::equality_at(rows, label, 0.0)
    }

    /// An equality block with every row pinned to `target`.
    #[must_use]
    pub fn equality_at(rows: ExprVec, label: impl Into<String>, target: f64) -> Self {
        let bounds = vec![(target, target); rows.len()];
        Self {
            label: label.into(),
            rows,
            bounds,
        }
    }

    /// An inequality block: every row constrained to `g(x) <= 0`.
    #[must_use]
    pub fn inequality(rows: ExprVec, label: impl Into<String>) -> Self {
        let bounds = vec![(-UNBOUNDED, 0.0); rows.len()];
        Self {
            label: label.into(),
            rows,
            bounds,
        }
    }

    /// The block's label; may be empty and need not be unique.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of scalar rows in the block.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &ExprVec {
        &self.rows
    }

    /// Per-row `(lower, upper)` pairs, index-aligned with [`rows`].
    ///
    /// [`rows`]: ConstraintBlock::rows
    #[must_use]
    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }
}
