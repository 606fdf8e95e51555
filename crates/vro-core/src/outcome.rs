//! Structured per-unit results reported by the package pipeline.
//!
//! The pipeline never logs or exits; every item it touches produces exactly
//! one terminal [`Outcome`] (plus optional warnings) on a caller-supplied
//! [`OutcomeSink`]. Fatal conditions are returned as `Err` instead.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The unit was converted and its output written.
    Converted {
        id: String,
        name: String,
        category: String,
    },
    /// The unit is not a convertible action. Informational.
    Skipped { unit: String, reason: String },
    /// The unit looked like an action but could not be converted.
    Failed { unit: String, reason: String },
    /// The unit was converted with a soft validation problem.
    Warning { unit: String, message: String },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

pub trait OutcomeSink {
    fn report(&mut self, outcome: Outcome);
}

impl OutcomeSink for Vec<Outcome> {
    fn report(&mut self, outcome: Outcome) {
        self.push(outcome);
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub warnings: usize,
}

impl Summary {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Converted { .. } => self.converted += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
            Outcome::Failed { .. } => self.failed += 1,
            Outcome::Warning { .. } => self.warnings += 1,
        }
    }

    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> Self {
        let mut summary = Summary::default();
        for o in outcomes {
            summary.record(o);
        }
        summary
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} converted, {} skipped, {} failed, {} warnings",
            self.converted, self.skipped, self.failed, self.warnings
        )
    }
}
