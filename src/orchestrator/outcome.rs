use std::fmt;

/// What happened to one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Skipped(String),
    Failed(String),
}

/// An [`Outcome`] and the project, registry or record it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub subject: String,
    pub outcome: Outcome,
}

impl StepResult {
    pub fn new(subject: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            subject: subject.into(),
            outcome,
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded)
    }

    pub const fn is_skipped(&self) -> bool {
        matches!(self.outcome, Outcome::Skipped(_))
    }

    pub const fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }
}

fn count(results: &[StepResult], predicate: impl Fn(&StepResult) -> bool) -> usize {
    results.iter().filter(|result| predicate(result)).count()
}

fn write_notes(f: &mut fmt::Formatter<'_>, title: &str, results: &[StepResult]) -> fmt::Result {
    let notes: Vec<_> = results
        .iter()
        .filter_map(|result| match &result.outcome {
            Outcome::Succeeded => None,
            Outcome::Skipped(reason) | Outcome::Failed(reason) => Some((&result.subject, reason)),
        })
        .collect();
    if notes.is_empty() {
        return Ok(());
    }

    writeln!(f)?;
    writeln!(f, "{title}:")?;
    for (subject, reason) in notes {
        writeln!(f, "  {subject}: {reason}")?;
    }
    Ok(())
}

/// Result of a register run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterSummary {
    /// Per project discovery.
    pub projects: Vec<StepResult>,
    /// Per project IAM grant.
    pub grants: Vec<StepResult>,
    /// Per registry registration.
    pub registrations: Vec<StepResult>,
}

impl RegisterSummary {
    pub fn discovered(&self) -> usize {
        self.registrations.len()
    }

    pub fn registered(&self) -> usize {
        count(&self.registrations, StepResult::is_success)
    }

    pub fn skipped(&self) -> usize {
        count(&self.registrations, StepResult::is_skipped)
    }

    pub fn failed(&self) -> usize {
        count(&self.registrations, StepResult::is_failure)
    }
}

impl fmt::Display for RegisterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Registration Summary ===")?;
        writeln!(f, "Projects scanned: {}", self.projects.len())?;
        writeln!(f, "Total registries: {}", self.discovered())?;
        writeln!(f, "Successfully registered: {}", self.registered())?;
        writeln!(f, "Skipped: {}", self.skipped())?;
        writeln!(f, "Failed: {}", self.failed())?;

        write_notes(f, "Projects without registries access", &self.projects)?;
        write_notes(f, "IAM grant problems", &self.grants)?;
        write_notes(
            f,
            "Failed registrations",
            &self
                .registrations
                .iter()
                .filter(|result| result.is_failure())
                .cloned()
                .collect::<Vec<_>>(),
        )
    }
}

/// What happened to the scanner service account during deprovisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountCleanup {
    Deleted,
    /// The account did not exist.
    Absent,
    Failed(String),
}

/// Result of a deprovision run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprovisionSummary {
    /// Why the Falcon registrations could not be listed.
    pub listing_error: Option<String>,
    /// The registration removal was not confirmed.
    pub declined: bool,
    pub removals: Vec<StepResult>,
    pub account: AccountCleanup,
}

impl DeprovisionSummary {
    pub fn removed(&self) -> usize {
        count(&self.removals, StepResult::is_success)
    }

    pub fn failed(&self) -> usize {
        count(&self.removals, StepResult::is_failure)
    }
}

impl fmt::Display for DeprovisionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Deprovisioning Summary ===")?;
        if let Some(reason) = &self.listing_error {
            writeln!(f, "Listing registrations failed: {reason}")?;
        } else if self.declined {
            writeln!(f, "Registration removal aborted")?;
        } else {
            writeln!(f, "GAR registrations found: {}", self.removals.len())?;
        }
        writeln!(f, "Removed: {}", self.removed())?;
        writeln!(f, "Failed: {}", self.failed())?;
        match &self.account {
            AccountCleanup::Deleted => writeln!(f, "Service account: deleted")?,
            AccountCleanup::Absent => writeln!(f, "Service account: did not exist")?,
            AccountCleanup::Failed(reason) => {
                writeln!(f, "Service account: deletion failed: {reason}")?;
            }
        }
        write_notes(f, "Failed removals", &self.removals)?;

        if self.removed() > 0 {
            writeln!(f)?;
            writeln!(
                f,
                "Note: Falcon hard deletes removed registrations after 48 hours."
            )?;
        }
        Ok(())
    }
}
