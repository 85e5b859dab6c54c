use crate::expr::{Expr, ExprVec};

/// Magnitude used for effectively-unbounded variable and constraint bounds.
///
/// Kept finite rather than `f64::INFINITY` because downstream NLP codes
/// commonly reject non-finite bounds.
pub const UNBOUNDED: f64 = 1e50;

/// One design-variable record: the symbolic handle plus its bounds and guess.
#[derive(Clone, Debug)]
pub struct Slot {
    pub var: Expr,
    pub lower: f64,
    pub upper: f64,
    pub guess: f64,
}

/// Append-only arena of design-variable slots.
///
/// The design vector and its bound/guess bookkeeping grow as a single
/// record append, so the rows can never fall out of sync.
#[derive(Debug, Default)]
pub struct SlotTable {
    slots: Vec<Slot>,
}

impl SlotTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Appends one variable slot and returns its index.
    ///
    /// New slots start effectively unbounded with a zero guess.
    pub fn push(&mut self, name: impl Into<String>) -> usize {
        let index = self.slots.len();
        self.slots.push(Slot {
            var: Expr::var(name, index),
            lower: -UNBOUNDED,
            upper: UNBOUNDED,
            guess: 0.0,
        });
        index
    }

    #[must_use]
    pub fn var(&self, index: usize) -> &Expr {
        &self.slots[index].var
    }

    /// Sets a slot's bounds, clamping its guess into the new range.
    ///
    /// The clamp is silent: a guess is advisory, not correctness-critical.
    ///
    /// # Panics
    ///
    /// Panics if `lower > upper`.
    pub fn bound(&mut self, index: usize, lower: f64, upper: f64) {
        let slot = &mut self.slots[index];
        slot.lower = lower;
        slot.upper = upper;
        slot.guess = slot.guess.clamp(lower, upper);
    }

    /// Overwrites a slot's guess without clamping.
    pub fn set_guess(&mut self, index: usize, value: f64) {
        self.slots[index].guess = value;
    }

    /// Sets a slot's guess, clamped to its bounds.
    ///
    /// Returns the stored value so callers can report when the clamp moved it.
    pub fn set_guess_clamped(&mut self, index: usize, value: f64) -> f64 {
        let slot = &mut self.slots[index];
        slot.guess = value.clamp(slot.lower, slot.upper);
        slot.guess
    }

    /// The full design-variable column, in slot order.
    #[must_use]
    pub fn vars(&self) -> ExprVec {
        self.slots.iter().map(|slot| slot.var.clone()).collect()
    }

    #[must_use]
    pub fn lower_bounds(&self) -> Vec<f64> {
        self.slots.iter().map(|slot| slot.lower).collect()
    }

    #[must_use]
    pub fn upper_bounds(&self) -> Vec<f64> {
        self.slots.iter().map(|slot| slot.upper).collect()
    }

    #[must_use]
    pub fn guesses(&self) -> Vec<f64> {
        self.slots.iter().map(|slot| slot.guess).collect()
    }
}
