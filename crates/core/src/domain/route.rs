use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Placeholder for a city or country the applicant has not picked yet.
/// Drafts are saved with this sentinel and resolved on edit.
pub const UNSELECTED_PLACE: &str = "notSelected";

/// One leg of a travel request. Routes are owned by their request and
/// replaced as a batch on every edit; `router_index` is caller-supplied and
/// not necessarily contiguous.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub router_index: i64,
    pub origin_country: String,
    pub origin_city: String,
    pub destination_country: String,
    pub destination_city: String,
    pub beginning_date: NaiveDate,
    pub beginning_time: NaiveTime,
    pub ending_date: NaiveDate,
    pub ending_time: NaiveTime,
    pub plane_needed: bool,
    pub hotel_needed: bool,
}

impl Route {
    pub fn begins_at(&self) -> NaiveDateTime {
        self.beginning_date.and_time(self.beginning_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.ending_date.and_time(self.ending_time)
    }
}
