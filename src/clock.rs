//! Step clock (spec.md §3, §9).
//!
//! One step is defined as one simulated hour (an Open Question; see
//! DESIGN.md). Policies phrased in "months" convert through
//! `STEPS_PER_MONTH`.

pub const STEPS_PER_MONTH: u64 = 24 * 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Step(pub u64);

impl Step {
    pub fn zero() -> Self {
        Step(0)
    }

    pub fn next(self) -> Self {
        Step(self.0 + 1)
    }

    pub fn plus_months(self, months: u64) -> Self {
        Step(self.0 + months * STEPS_PER_MONTH)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
