//! Receipt-verdict aggregation.
//!
//! Two distinct outputs live here. The write-path rollup decides whether the
//! request bounces back, finalizes, or stays put; the read-path display
//! status summarizes outstanding work for the reviewer. They use different
//! pending-detection rules on purpose and must not be merged.

use serde::{Deserialize, Serialize};

use crate::domain::receipt::{Receipt, ReceiptVerdict};
use crate::domain::request::RequestStatus;

/// Outcome of rolling up all receipt verdicts of a request in receipt
/// validation. `target` is `None` when no status change applies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupOutcome {
    pub target: Option<RequestStatus>,
    pub message: &'static str,
}

/// Rolls up the verdict multiset. Rejection always wins: a single rejected
/// receipt bounces the request back to trip verification no matter how many
/// approvals coexist. Only a non-empty, fully approved set finalizes; an
/// empty set never does.
pub fn rollup(verdicts: &[ReceiptVerdict]) -> RollupOutcome {
    if verdicts.contains(&ReceiptVerdict::Rejected) {
        return RollupOutcome {
            target: Some(RequestStatus::TripVerification),
            message: "Some receipts were rejected. Request moved back to trip verification.",
        };
    }

    let all_approved =
        !verdicts.is_empty() && verdicts.iter().all(|verdict| *verdict == ReceiptVerdict::Approved);
    if all_approved {
        return RollupOutcome {
            target: Some(RequestStatus::Finalized),
            message: "All receipts approved. Request finalized.",
        };
    }

    RollupOutcome { target: None, message: "Receipts still pending. No status change applied." }
}

/// Read-path aggregate shown to reviewers; informational only and distinct
/// from the rollup decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseDisplayStatus {
    Pending,
    NoPending,
}

impl ExpenseDisplayStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::NoPending => "No pending",
        }
    }
}

pub fn display_status(verdicts: &[ReceiptVerdict]) -> ExpenseDisplayStatus {
    if verdicts.contains(&ReceiptVerdict::Pending) {
        ExpenseDisplayStatus::Pending
    } else {
        ExpenseDisplayStatus::NoPending
    }
}

fn triage_rank(verdict: ReceiptVerdict) -> u8 {
    match verdict {
        ReceiptVerdict::Pending => 0,
        ReceiptVerdict::Rejected => 1,
        ReceiptVerdict::Approved => 2,
    }
}

/// Orders receipts for reviewer triage: open items first, then rejected,
/// then approved. The sort is stable so insertion order breaks ties.
pub fn sort_for_triage(receipts: &mut [Receipt]) {
    receipts.sort_by_key(|receipt| triage_rank(receipt.verdict));
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{display_status, rollup, sort_for_triage, ExpenseDisplayStatus};
    use crate::domain::receipt::{Receipt, ReceiptId, ReceiptVerdict};
    use crate::domain::request::{RequestId, RequestStatus};

    use ReceiptVerdict::{Approved, Pending, Rejected};

    #[test]
    fn any_rejection_bounces_back_regardless_of_approvals() {
        let outcome = rollup(&[Approved, Rejected, Pending]);
        assert_eq!(outcome.target, Some(RequestStatus::TripVerification));

        let outcome = rollup(&[Approved, Approved, Approved, Rejected]);
        assert_eq!(outcome.target, Some(RequestStatus::TripVerification));
    }

    #[test]
    fn fully_approved_non_empty_set_finalizes() {
        let outcome = rollup(&[Approved, Approved]);
        assert_eq!(outcome.target, Some(RequestStatus::Finalized));
    }

    #[test]
    fn pending_without_rejections_changes_nothing() {
        let outcome = rollup(&[Approved, Pending]);
        assert_eq!(outcome.target, None);

        let outcome = rollup(&[Pending, Pending]);
        assert_eq!(outcome.target, None);
    }

    #[test]
    fn empty_set_never_finalizes() {
        let outcome = rollup(&[]);
        assert_eq!(outcome.target, None);
    }

    #[test]
    fn display_status_reports_any_pending() {
        assert_eq!(display_status(&[Approved, Pending]), ExpenseDisplayStatus::Pending);
        assert_eq!(display_status(&[Approved, Rejected]), ExpenseDisplayStatus::NoPending);
        assert_eq!(display_status(&[]), ExpenseDisplayStatus::NoPending);
    }

    fn receipt(id: i64, verdict: ReceiptVerdict) -> Receipt {
        Receipt {
            id: ReceiptId(id),
            request_id: RequestId(1),
            receipt_type_id: 1,
            receipt_type_name: "Hotel".to_string(),
            amount: Decimal::new(10_000, 2),
            verdict,
        }
    }

    #[test]
    fn triage_order_surfaces_open_items_first() {
        let mut receipts = vec![
            receipt(1, Approved),
            receipt(2, Pending),
            receipt(3, Rejected),
            receipt(4, Pending),
        ];
        sort_for_triage(&mut receipts);

        let order: Vec<(i64, ReceiptVerdict)> =
            receipts.iter().map(|r| (r.id.0, r.verdict)).collect();
        assert_eq!(order, vec![(2, Pending), (4, Pending), (3, Rejected), (1, Approved)]);
    }
}
