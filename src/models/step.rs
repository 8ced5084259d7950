use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::feature_set::FeatureSet;
use super::session::ProjectKey;

/// One onboarding action in a [`Plan`].
///
/// `step_no` is the 1-based emission position within the plan. Prerequisites
/// may name the titles of earlier steps, never later ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub step_no: u32,
    pub title: String,
    pub description: String,
    pub prerequisites: Vec<String>,
    /// Path globs of files relevant to this step.
    pub related_files: Vec<String>,
    /// Suggested shell command for this step, if one applies.
    pub command: Option<String>,
    pub success_criteria: String,
    pub troubleshooting: String,
}

/// An ordered onboarding plan for one project snapshot.
///
/// Plans are immutable once generated. Step numbers run `1..=len` without gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Look up a step by its number.
    pub fn step(&self, step_no: u32) -> Option<&Step> {
        step_no
            .checked_sub(1)
            .and_then(|idx| self.steps.get(idx as usize))
    }

    pub fn titles(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.title.as_str()).collect()
    }
}

impl IntoIterator for Plan {
    type Item = Step;
    type IntoIter = std::vec::IntoIter<Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// The last plan generated for a walkthrough, with the features it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub project_key: ProjectKey,
    pub features: FeatureSet,
    pub plan: Plan,
    pub generated_at: DateTime<Utc>,
}
