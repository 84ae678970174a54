use serde::Serialize;

/// What happened to one item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// The stage did its work for this item.
    Completed,
    /// The item is not meant for this stage.
    Ignored {
        /// Why the item was skipped.
        reason: String,
    },
    /// The notification itself could not be parsed.
    Rejected {
        /// Parse error message.
        error: String,
    },
    /// Another stage already moved the record past this stage's update.
    Superseded,
    /// Processing failed.
    Failed {
        /// Failure message.
        error: String,
        /// Whether the record's `error` status was written.
        error_recorded: bool,
    },
}

/// Outcome of one item together with what it was about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    /// Position of the item in the delivered batch.
    pub index: usize,
    /// Record URL or object key, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// Per-item results of one stage invocation, in delivery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub(crate) fn push(&mut self, subject: Option<String>, outcome: ItemOutcome) {
        let index = self.items.len();
        self.items.push(ItemReport {
            index,
            subject,
            outcome,
        });
    }

    /// Number of items in the batch.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the batch was empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items the stage completed.
    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Completed))
    }

    /// Number of items that failed.
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    /// Number of items skipped as not relevant.
    pub fn ignored(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Ignored { .. }))
    }

    /// Number of unparseable items.
    pub fn rejected(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Rejected { .. }))
    }

    /// Number of items overtaken by another stage.
    pub fn superseded(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Superseded))
    }

    /// Outcome recorded for `subject`, if any.
    pub fn outcome_for(&self, subject: &str) -> Option<&ItemOutcome> {
        self.items
            .iter()
            .find(|item| item.subject.as_deref() == Some(subject))
            .map(|item| &item.outcome)
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|item| pred(&item.outcome)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_outcome() {
        let mut report = BatchReport::default();
        report.push(Some("a".into()), ItemOutcome::Completed);
        report.push(
            Some("b".into()),
            ItemOutcome::Failed {
                error: "boom".into(),
                error_recorded: true,
            },
        );
        report.push(None, ItemOutcome::Rejected { error: "bad".into() });
        report.push(Some("c".into()), ItemOutcome::Superseded);

        assert_eq!(report.len(), 4);
        assert_eq!(report.completed(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.rejected(), 1);
        assert_eq!(report.superseded(), 1);
        assert_eq!(report.ignored(), 0);
        assert_eq!(report.items[2].index, 2);
        assert_eq!(report.outcome_for("a"), Some(&ItemOutcome::Completed));
    }

    #[test]
    fn serializes_flat_items() {
        let mut report = BatchReport::default();
        report.push(
            Some("http://x/a.jpg".into()),
            ItemOutcome::Failed {
                error: "network error: fetch timed out".into(),
                error_recorded: true,
            },
        );
        report.push(None, ItemOutcome::Rejected { error: "bad".into() });

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "items": [
                    {
                        "index": 0,
                        "subject": "http://x/a.jpg",
                        "outcome": "failed",
                        "error": "network error: fetch timed out",
                        "error_recorded": true
                    },
                    { "index": 1, "outcome": "rejected", "error": "bad" }
                ]
            })
        );
    }
}
