//! Step identifiers and the global execution order.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Layout;

/// A (phase, step) pair. Ordered by phase, then step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepId {
    pub phase: u32,
    pub step: u32,
}

impl StepId {
    pub const fn new(phase: u32, step: u32) -> Self {
        Self { phase, step }
    }

    /// The first step of any sequence.
    pub const fn first() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Phase {}.Step {}", self.phase, self.step)
    }
}

impl Layout {
    /// Total number of steps (P_max × S_max).
    pub fn total(&self) -> u32 {
        self.phases * self.steps_per_phase
    }

    /// Whether `id` names a step inside the layout.
    pub fn contains(&self, id: StepId) -> bool {
        (1..=self.phases).contains(&id.phase) && (1..=self.steps_per_phase).contains(&id.step)
    }

    /// The last step of the sequence.
    pub fn last(&self) -> StepId {
        StepId::new(self.phases, self.steps_per_phase)
    }

    /// The position one past the last step; the cursor after a full run.
    pub fn end(&self) -> StepId {
        StepId::new(self.phases + 1, 1)
    }

    /// Whether `id` is a legal cursor position: a step, or the end.
    pub fn is_position(&self, id: StepId) -> bool {
        self.contains(id) || id == self.end()
    }

    /// The step after `id`, wrapping to step 1 of the next phase.
    pub fn next(&self, id: StepId) -> StepId {
        if id.step >= self.steps_per_phase {
            StepId::new(id.phase + 1, 1)
        } else {
            StepId::new(id.phase, id.step + 1)
        }
    }

    /// Number of steps strictly before `id` in the total order.
    pub fn ordinal(&self, id: StepId) -> u32 {
        (id.phase.saturating_sub(1)) * self.steps_per_phase + id.step.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(phases: u32, steps_per_phase: u32) -> Layout {
        Layout {
            phases,
            steps_per_phase,
        }
    }

    #[test]
    fn ordering_compares_phase_first() {
        assert!(StepId::new(1, 20) < StepId::new(2, 1));
        assert!(StepId::new(2, 1) < StepId::new(2, 2));
        assert_eq!(StepId::new(3, 3), StepId::new(3, 3));
    }

    #[test]
    fn next_wraps_at_phase_boundary() {
        let l = layout(2, 3);
        assert_eq!(l.next(StepId::new(1, 2)), StepId::new(1, 3));
        assert_eq!(l.next(StepId::new(1, 3)), StepId::new(2, 1));
        assert_eq!(l.next(l.last()), l.end());
    }

    #[test]
    fn ordinal_counts_steps_before() {
        let l = layout(3, 4);
        assert_eq!(l.ordinal(StepId::first()), 0);
        assert_eq!(l.ordinal(StepId::new(1, 4)), 3);
        assert_eq!(l.ordinal(StepId::new(2, 1)), 4);
        assert_eq!(l.ordinal(l.end()), l.total());
    }

    #[test]
    fn positions_include_end_only() {
        let l = layout(2, 2);
        assert!(l.is_position(StepId::new(2, 2)));
        assert!(l.is_position(l.end()));
        assert!(!l.is_position(StepId::new(1, 3)));
        assert!(!l.is_position(StepId::new(0, 1)));
        assert!(!l.is_position(StepId::new(3, 2)));
    }

    #[test]
    fn display_names_phase_and_step() {
        assert_eq!(StepId::new(4, 12).to_string(), "Phase 4.Step 12");
    }
}
