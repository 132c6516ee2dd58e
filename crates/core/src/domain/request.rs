use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::route::Route;
use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub i64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a travel request. The integer codes are stored as-is
/// and must stay compatible with existing data; see `code`/`from_code`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Open,
    FirstRevision,
    SecondRevision,
    Quote,
    AgencyAttention,
    TripVerification,
    ReceiptValidation,
    Finalized,
    Cancelled,
    Rejected,
}

impl RequestStatus {
    pub fn code(self) -> i64 {
        match self {
            Self::Open => 1,
            Self::FirstRevision => 2,
            Self::SecondRevision => 3,
            Self::Quote => 4,
            Self::AgencyAttention => 5,
            Self::TripVerification => 6,
            Self::ReceiptValidation => 7,
            Self::Finalized => 8,
            Self::Cancelled => 9,
            Self::Rejected => 10,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Open),
            2 => Some(Self::FirstRevision),
            3 => Some(Self::SecondRevision),
            4 => Some(Self::Quote),
            5 => Some(Self::AgencyAttention),
            6 => Some(Self::TripVerification),
            7 => Some(Self::ReceiptValidation),
            8 => Some(Self::Finalized),
            9 => Some(Self::Cancelled),
            10 => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Label used in notifications and listings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "Open draft",
            Self::FirstRevision => "First revision",
            Self::SecondRevision => "Second revision",
            Self::Quote => "Trip quote",
            Self::AgencyAttention => "Travel agency attention",
            Self::TripVerification => "Trip expense verification",
            Self::ReceiptValidation => "Receipt validation",
            Self::Finalized => "Finalized",
            Self::Cancelled => "Cancelled",
            Self::Rejected => "Rejected",
        }
    }

    /// Terminal statuses admit no outgoing transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Cancelled | Self::Rejected)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TravelRequest {
    pub id: RequestId,
    pub owner: UserId,
    pub status: RequestStatus,
    pub notes: String,
    pub requested_fee: Decimal,
    pub imposed_fee: Decimal,
    pub trip_days: i64,
    pub routes: Vec<Route>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TravelRequest {
    /// True when any route needs a hotel or plane booking, which routes the
    /// request through the travel agency after the accounts-payable step.
    pub fn needs_agency_routing(&self) -> bool {
        self.routes.iter().any(|route| route.hotel_needed || route.plane_needed)
    }
}

#[cfg(test)]
mod tests {
    use super::RequestStatus;

    #[test]
    fn status_codes_round_trip() {
        for code in 1..=10 {
            let status = RequestStatus::from_code(code).expect("valid code");
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert_eq!(RequestStatus::from_code(0), None);
        assert_eq!(RequestStatus::from_code(11), None);
    }

    #[test]
    fn only_closed_statuses_are_terminal() {
        let terminal =
            [RequestStatus::Finalized, RequestStatus::Cancelled, RequestStatus::Rejected];
        for code in 1..=10 {
            let status = RequestStatus::from_code(code).expect("valid code");
            assert_eq!(status.is_terminal(), terminal.contains(&status));
        }
    }
}
