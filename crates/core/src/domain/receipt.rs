use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::request::RequestId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptId(pub i64);

impl std::fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Verdict on a single expense receipt. A receipt is created Pending and is
/// decided exactly once; the stored integer codes are preserved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptVerdict {
    Pending,
    Approved,
    Rejected,
}

impl ReceiptVerdict {
    pub fn code(self) -> i64 {
        match self {
            Self::Pending => 1,
            Self::Approved => 2,
            Self::Rejected => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Pending),
            2 => Some(Self::Approved),
            3 => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    /// External contract for the accounts-payable action: flag 0 rejects,
    /// flag 1 approves, anything else is not a verdict.
    pub fn from_approval_flag(flag: i64) -> Option<Self> {
        match flag {
            0 => Some(Self::Rejected),
            1 => Some(Self::Approved),
            _ => None,
        }
    }

    pub fn is_decided(self) -> bool {
        self != Self::Pending
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    pub request_id: RequestId,
    pub receipt_type_id: i64,
    pub receipt_type_name: String,
    pub amount: Decimal,
    pub verdict: ReceiptVerdict,
}

/// Input for bulk receipt creation; rows are inserted as Pending.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewReceipt {
    pub request_id: RequestId,
    pub receipt_type_id: i64,
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::ReceiptVerdict;

    #[test]
    fn verdict_codes_round_trip() {
        for code in 1..=3 {
            let verdict = ReceiptVerdict::from_code(code).expect("valid code");
            assert_eq!(verdict.code(), code);
        }
        assert_eq!(ReceiptVerdict::from_code(0), None);
        assert_eq!(ReceiptVerdict::from_code(4), None);
    }

    #[test]
    fn approval_flag_contract() {
        assert_eq!(ReceiptVerdict::from_approval_flag(0), Some(ReceiptVerdict::Rejected));
        assert_eq!(ReceiptVerdict::from_approval_flag(1), Some(ReceiptVerdict::Approved));
        assert_eq!(ReceiptVerdict::from_approval_flag(2), None);
        assert_eq!(ReceiptVerdict::from_approval_flag(-1), None);
    }

    #[test]
    fn only_pending_is_undecided() {
        assert!(!ReceiptVerdict::Pending.is_decided());
        assert!(ReceiptVerdict::Approved.is_decided());
        assert!(ReceiptVerdict::Rejected.is_decided());
    }
}
