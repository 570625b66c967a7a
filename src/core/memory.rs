use super::steps::{ActionStep, TripAction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Append-only execution trace of the action loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionTrace {
    steps: Vec<ActionStep>,
}

impl ActionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished step. Steps are never modified afterwards.
    pub fn push(&mut self, step: ActionStep) {
        info!(
            target: "tripwise::steps",
            step = self.steps.len() + 1,
            "{}",
            step.describe()
        );
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[ActionStep] {
        &self.steps
    }

    pub fn last_step(&self) -> Option<&ActionStep> {
        self.steps.last()
    }

    /// Summaries of the last `n` steps, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Value> {
        let start = self.steps.len().saturating_sub(n);
        self.steps[start..].iter().map(ActionStep::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn count_action(&self, action: &TripAction) -> usize {
        self.steps.iter().filter(|s| &s.action == action).count()
    }

    pub fn finished_explicitly(&self) -> bool {
        matches!(self.last_step(), Some(step) if step.action == TripAction::Finish)
    }

    pub fn into_steps(self) -> Vec<ActionStep> {
        self.steps
    }
}
