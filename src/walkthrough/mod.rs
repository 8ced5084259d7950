//! The walkthrough core: detect a project's toolchain, plan the onboarding
//! steps for it, explain each step, and track who has done what.
//!
//! [`extract`], [`plan`] and [`explain`] are pure and safe to call from any
//! number of threads. [`SessionTracker`] owns all persisted state.

mod catalog;
mod help;
mod planner;
mod signals;
mod store;
mod tracker;

pub use catalog::{StepKind, StepTemplate};
pub use help::{explain, NO_GUIDE_AVAILABLE};
pub use planner::{plan, step_kinds};
pub use signals::extract;
pub use store::{CasOutcome, ProgressStore};
pub use tracker::{SessionTracker, TrackerError, DEFAULT_MAX_ATTEMPTS};
