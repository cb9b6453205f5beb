//! Steps: identifiers, labels, and the actions that perform them.
//!
//! - [`StepId`] - A (phase, step) pair in the global execution order
//! - [`StepCatalog`] - Read-only labels loaded from configuration
//! - [`StepAction`] - The work a step performs, returning a [`StepOutcome`]
//! - [`ScriptedAction`] / [`SimulatedAction`] - Configured and stand-in actions

pub mod action;
pub mod catalog;
pub mod id;

pub use action::{ScriptedAction, SimulatedAction, StepAction, StepOutcome};
pub use catalog::{StepCatalog, StepDescriptions};
pub use id::StepId;
