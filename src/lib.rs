//! Guided onboarding walkthroughs for unfamiliar repositories.
//!
//! A project's file list is reduced to a [`models::FeatureSet`], planned into
//! ordered setup steps, and tracked per user in SQLite so a walkthrough can be
//! resumed from any interface.

pub mod api;
pub mod db;
pub mod gateway;
pub mod lister;
pub mod models;
pub mod walkthrough;
