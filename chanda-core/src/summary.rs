//! Collection totals for the admin dashboard.

use crate::{Amount, PaymentRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-branch contribution totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchTotal {
    pub branch: String,
    pub contributors: usize,
    pub total: Amount,
}

/// Contributor count and collection totals over a list of records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub contributors: usize,
    pub total: Amount,
    /// Ordered by total descending, then branch name.
    pub branches: Vec<BranchTotal>,
}

impl CollectionSummary {
    pub fn from_records(records: &[PaymentRecord]) -> Self {
        let mut by_branch: BTreeMap<&str, (usize, Amount)> = BTreeMap::new();
        for record in records {
            let entry = by_branch
                .entry(record.branch.as_str())
                .or_insert((0, Amount::ZERO));
            entry.0 += 1;
            entry.1 = entry.1 + record.amount;
        }

        let mut branches: Vec<BranchTotal> = by_branch
            .into_iter()
            .map(|(branch, (contributors, total))| BranchTotal {
                branch: branch.to_string(),
                contributors,
                total,
            })
            .collect();
        branches.sort_by(|a, b| {
            b.total
                .value()
                .total_cmp(&a.total.value())
                .then_with(|| a.branch.cmp(&b.branch))
        });

        Self {
            contributors: records.len(),
            total: records.iter().map(|r| r.amount).sum(),
            branches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PaymentId;
    use chrono::Utc;

    fn record(id: &str, branch: &str, amount: f64) -> PaymentRecord {
        PaymentRecord {
            id: PaymentId::new(id),
            name: format!("contributor {}", id),
            amount: Amount::new(amount).unwrap(),
            branch: branch.to_string(),
            screenshot: String::new(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_empty_summary() {
        let summary = CollectionSummary::from_records(&[]);
        assert_eq!(summary.contributors, 0);
        assert_eq!(summary.total, Amount::ZERO);
        assert!(summary.branches.is_empty());
    }

    #[test]
    fn test_totals_and_branch_order() {
        let records = vec![
            record("p1", "CS", 501.0),
            record("p2", "ECE", 1100.0),
            record("p3", "CS", 251.0),
            record("p4", "ME", 700.0),
        ];
        let summary = CollectionSummary::from_records(&records);

        assert_eq!(summary.contributors, 4);
        assert_eq!(summary.total.value(), 2552.0);
        let order: Vec<&str> = summary.branches.iter().map(|b| b.branch.as_str()).collect();
        assert_eq!(order, vec!["ECE", "CS", "ME"]);
        assert_eq!(summary.branches[1].contributors, 2);
        assert_eq!(summary.branches[1].total.value(), 752.0);
    }

    #[test]
    fn test_branch_tie_breaks_by_name() {
        let records = vec![record("p1", "ME", 100.0), record("p2", "CS", 100.0)];
        let summary = CollectionSummary::from_records(&records);
        assert_eq!(summary.branches[0].branch, "CS");
    }
}
