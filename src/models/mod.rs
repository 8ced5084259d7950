//! Domain models for the onboarding walkthrough.
//!
//! # Core Concepts
//!
//! ## Derived Values
//!
//! These are pure functions of a project's file list and are never stored
//! on their own:
//!
//! - [`FeatureSet`]: The toolchain inferred from file names.
//! - [`Plan`]: The ordered onboarding [`Step`]s generated from a feature set.
//!
//! ## Persistent Entities
//!
//! - [`SessionProgress`]: Completed steps for one user on one project, keyed
//!   by [`ProjectKey`]. Survives restarts; only an explicit reset clears it.
//! - [`ExecutionRecord`]: Append-only log of step execution attempts.

mod feature_set;
mod history;
mod session;
mod step;

pub use feature_set::*;
pub use history::*;
pub use session::*;
pub use step::*;
