use crate::mutation::{CaptionEdit, MutationPlan};
use crate::types::ItemId;
use serde::{Deserialize, Serialize};

/// A caption write that the store rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub id: ItemId,
    pub error: String,
}

/// How a bulk operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOutcome {
    /// No item contained the target
    NothingFound,
    /// Items matched but none of their captions would change
    Unchanged,
    /// Every planned write succeeded
    Applied,
    /// Some writes succeeded and some failed
    Partial,
    /// Every planned write failed
    Failed,
}

/// Counts computed without mutating anything, for confirmation prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DryRun {
    pub operation: String,
    pub eligible: usize,
    pub would_modify: usize,
    pub occurrences: usize,
}

impl DryRun {
    pub fn from_plan(operation: &str, plan: &MutationPlan) -> Self {
        Self {
            operation: operation.to_string(),
            eligible: plan.eligible,
            would_modify: plan.edits.len(),
            occurrences: plan.occurrences,
        }
    }
}

/// Final report of a bulk operation after every write has settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport {
    pub operation: String,

    /// Items that contained the target
    pub eligible: usize,

    /// Writes dispatched to the store
    pub attempted: usize,

    /// Writes that succeeded
    pub modified_count: usize,

    /// Total matches across eligible items
    pub occurrences: usize,

    /// Successfully applied edits
    pub edits: Vec<CaptionEdit>,

    pub failures: Vec<ItemFailure>,
}

impl BulkReport {
    pub fn new(operation: &str, plan: &MutationPlan) -> Self {
        Self {
            operation: operation.to_string(),
            eligible: plan.eligible,
            attempted: plan.edits.len(),
            modified_count: 0,
            occurrences: plan.occurrences,
            edits: Vec::with_capacity(plan.edits.len()),
            failures: Vec::new(),
        }
    }

    pub fn record_success(&mut self, edit: CaptionEdit) {
        self.modified_count += 1;
        self.edits.push(edit);
    }

    pub fn record_failure(&mut self, id: ItemId, error: impl Into<String>) {
        self.failures.push(ItemFailure {
            id,
            error: error.into(),
        });
    }

    pub fn outcome(&self) -> BulkOutcome {
        if self.eligible == 0 {
            BulkOutcome::NothingFound
        } else if self.attempted == 0 {
            BulkOutcome::Unchanged
        } else if self.failures.is_empty() {
            BulkOutcome::Applied
        } else if self.modified_count == 0 {
            BulkOutcome::Failed
        } else {
            BulkOutcome::Partial
        }
    }

    /// One-line summary for notifications and logs
    pub fn summary(&self) -> String {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        match self.outcome() {
            BulkOutcome::NothingFound => "No captions contain the target.".to_string(),
            BulkOutcome::Unchanged => format!(
                "{} caption{} matched but none changed.",
                self.eligible,
                plural(self.eligible)
            ),
            BulkOutcome::Applied => format!(
                "Modified {} caption{} ({} occurrence{}).",
                self.modified_count,
                plural(self.modified_count),
                self.occurrences,
                plural(self.occurrences)
            ),
            BulkOutcome::Partial | BulkOutcome::Failed => format!(
                "Modified {} of {} caption{}; {} failed.",
                self.modified_count,
                self.attempted,
                plural(self.attempted),
                self.failures.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(id: &str) -> CaptionEdit {
        CaptionEdit {
            id: ItemId::new(id),
            before: "a".into(),
            after: "b".into(),
            occurrences: 1,
        }
    }

    fn plan(eligible: usize, edits: usize) -> MutationPlan {
        MutationPlan {
            eligible,
            occurrences: eligible,
            edits: (0..edits).map(|i| edit(&format!("i{i}"))).collect(),
        }
    }

    #[test]
    fn distinguishes_nothing_found_from_unchanged() {
        assert_eq!(
            BulkReport::new("x", &plan(0, 0)).outcome(),
            BulkOutcome::NothingFound
        );
        assert_eq!(
            BulkReport::new("x", &plan(2, 0)).outcome(),
            BulkOutcome::Unchanged
        );
    }

    #[test]
    fn failures_are_not_success() {
        let mut report = BulkReport::new("x", &plan(2, 2));
        report.record_failure(ItemId::new("i0"), "boom");
        report.record_failure(ItemId::new("i1"), "boom");
        assert_eq!(report.outcome(), BulkOutcome::Failed);

        let mut report = BulkReport::new("x", &plan(2, 2));
        report.record_success(edit("i0"));
        report.record_failure(ItemId::new("i1"), "boom");
        assert_eq!(report.outcome(), BulkOutcome::Partial);
        assert_eq!(report.summary(), "Modified 1 of 2 captions; 1 failed.");
    }

    #[test]
    fn applied_summary() {
        let mut report = BulkReport::new("x", &plan(1, 1));
        report.record_success(edit("i0"));
        assert_eq!(report.outcome(), BulkOutcome::Applied);
        assert_eq!(report.summary(), "Modified 1 caption (1 occurrence).");
    }

    #[test]
    fn dry_run_counts() {
        let dry = DryRun::from_plan("delete_tag", &plan(3, 2));
        assert_eq!(dry.eligible, 3);
        assert_eq!(dry.would_modify, 2);
    }
}
