use serde::Serialize;
use vro_core::outcome::{Outcome, OutcomeSink, Summary};

/// Logs each outcome as it arrives and keeps it for the run report.
#[derive(Default)]
pub struct TracingSink {
    outcomes: Vec<Outcome>,
    summary: Summary,
}

impl OutcomeSink for TracingSink {
    fn report(&mut self, outcome: Outcome) {
        match &outcome {
            Outcome::Converted { id, name, category } => {
                tracing::debug!(id = %id, category = %category, "converted {name}")
            }
            Outcome::Skipped { unit, reason } => tracing::info!(unit = %unit, "skipped: {reason}"),
            Outcome::Warning { unit, message } => tracing::warn!(unit = %unit, "{message}"),
            Outcome::Failed { unit, reason } => tracing::error!(unit = %unit, "{reason}"),
        }
        self.summary.record(&outcome);
        self.outcomes.push(outcome);
    }
}

impl TracingSink {
    pub fn into_report(self, command: &'static str, package: &str) -> RunReport {
        RunReport {
            command,
            package: package.to_string(),
            summary: self.summary,
            outcomes: self.outcomes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub command: &'static str,
    pub package: String,
    pub summary: Summary,
    pub outcomes: Vec<Outcome>,
}

impl RunReport {
    pub fn print_summary(&self) {
        println!("{} '{}': {}", self.command, self.package, self.summary);
    }

    /// With `strict`, any failed unit fails the command.
    pub fn check(&self, strict: bool) -> anyhow::Result<()> {
        if strict && self.summary.failed > 0 {
            anyhow::bail!(
                "{} of '{}' recorded {} failed unit(s)",
                self.command,
                self.package,
                self.summary.failed
            );
        }
        Ok(())
    }
}
