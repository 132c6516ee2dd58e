//! Route assembly and trip-day derivation.
//!
//! A request is submitted as one main route plus zero or more additional
//! routes; partial inputs (drafts) fall back to placeholder sentinels. The
//! stored day count spans from the first route's start to the last route's
//! end, ordered by `router_index`.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::route::{Route, UNSELECTED_PLACE};

const SECONDS_PER_DAY: i64 = 86_400;

/// Caller-supplied route fields; anything omitted takes a placeholder so
/// drafts can be saved half-filled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInput {
    pub router_index: i64,
    pub origin_country: Option<String>,
    pub origin_city: Option<String>,
    pub destination_country: Option<String>,
    pub destination_city: Option<String>,
    pub beginning_date: Option<NaiveDate>,
    pub beginning_time: Option<NaiveTime>,
    pub ending_date: Option<NaiveDate>,
    pub ending_time: Option<NaiveTime>,
    pub plane_needed: Option<bool>,
    pub hotel_needed: Option<bool>,
}

impl RouteInput {
    fn into_route(self) -> Route {
        let place = |value: Option<String>| value.unwrap_or_else(|| UNSELECTED_PLACE.to_string());
        Route {
            router_index: self.router_index,
            origin_country: place(self.origin_country),
            origin_city: place(self.origin_city),
            destination_country: place(self.destination_country),
            destination_city: place(self.destination_city),
            beginning_date: self.beginning_date.unwrap_or_default(),
            beginning_time: self.beginning_time.unwrap_or_default(),
            ending_date: self.ending_date.unwrap_or_default(),
            ending_time: self.ending_time.unwrap_or_default(),
            plane_needed: self.plane_needed.unwrap_or(false),
            hotel_needed: self.hotel_needed.unwrap_or(false),
        }
    }
}

/// Combines the main route with the additional ones, fills placeholders, and
/// orders the result by `router_index` ascending. Indexes come from the
/// caller and are not necessarily contiguous.
pub fn assemble_routes(main: RouteInput, additional: Vec<RouteInput>) -> Vec<Route> {
    let mut routes: Vec<Route> = std::iter::once(main)
        .chain(additional)
        .map(RouteInput::into_route)
        .collect();
    routes.sort_by_key(|route| route.router_index);
    routes
}

/// Trip duration in whole days: ceil(last route end - first route start),
/// clamped to zero. A same-day trip with any positive duration counts as one
/// day; an empty route list yields zero. The input need not be sorted.
pub fn trip_days(routes: &[Route]) -> i64 {
    let first = routes.iter().min_by_key(|route| route.router_index);
    let last = routes.iter().max_by_key(|route| route.router_index);
    let (Some(first), Some(last)) = (first, last) else {
        return 0;
    };

    let span_seconds = (last.ends_at() - first.begins_at()).num_seconds();
    if span_seconds <= 0 {
        return 0;
    }
    // `i64::div_ceil` is unstable; span_seconds is positive here, so the
    // unsigned equivalent is exact.
    (span_seconds as u64).div_ceil(SECONDS_PER_DAY as u64) as i64
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::{assemble_routes, trip_days, RouteInput};
    use crate::domain::route::UNSELECTED_PLACE;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    fn leg(index: i64, begin: (NaiveDate, NaiveTime), end: (NaiveDate, NaiveTime)) -> RouteInput {
        RouteInput {
            router_index: index,
            origin_country: Some("Mexico".to_string()),
            origin_city: Some("Monterrey".to_string()),
            destination_country: Some("Germany".to_string()),
            destination_city: Some("Berlin".to_string()),
            beginning_date: Some(begin.0),
            beginning_time: Some(begin.1),
            ending_date: Some(end.0),
            ending_time: Some(end.1),
            plane_needed: Some(true),
            hotel_needed: Some(false),
        }
    }

    #[test]
    fn zero_span_yields_zero_days() {
        let routes = assemble_routes(
            leg(0, (date(2024, 1, 1), time(8, 0)), (date(2024, 1, 1), time(8, 0))),
            vec![],
        );
        assert_eq!(trip_days(&routes), 0);
    }

    #[test]
    fn fractional_days_round_up() {
        // 2024-01-01 08:00 to 2024-01-03 10:00 is ~2.08 days.
        let routes = assemble_routes(
            leg(0, (date(2024, 1, 1), time(8, 0)), (date(2024, 1, 2), time(8, 0))),
            vec![leg(1, (date(2024, 1, 2), time(9, 0)), (date(2024, 1, 3), time(10, 0)))],
        );
        assert_eq!(trip_days(&routes), 3);
    }

    #[test]
    fn same_day_trip_with_positive_duration_counts_as_one_day() {
        let routes = assemble_routes(
            leg(0, (date(2024, 1, 1), time(8, 0)), (date(2024, 1, 1), time(17, 30))),
            vec![],
        );
        assert_eq!(trip_days(&routes), 1);
    }

    #[test]
    fn unsorted_input_is_ordered_before_computing_the_span() {
        // The later leg is supplied first; the span must still run from the
        // index-0 start to the index-1 end.
        let assembled = assemble_routes(
            leg(1, (date(2024, 1, 2), time(9, 0)), (date(2024, 1, 3), time(10, 0))),
            vec![leg(0, (date(2024, 1, 1), time(8, 0)), (date(2024, 1, 2), time(8, 0)))],
        );
        assert_eq!(assembled[0].router_index, 0);
        assert_eq!(assembled[1].router_index, 1);
        assert_eq!(trip_days(&assembled), 3);
    }

    #[test]
    fn negative_span_clamps_to_zero() {
        let routes = assemble_routes(
            leg(0, (date(2024, 1, 5), time(8, 0)), (date(2024, 1, 1), time(8, 0))),
            vec![],
        );
        assert_eq!(trip_days(&routes), 0);
    }

    #[test]
    fn empty_route_list_yields_zero() {
        assert_eq!(trip_days(&[]), 0);
    }

    #[test]
    fn omitted_fields_take_placeholders() {
        let routes =
            assemble_routes(RouteInput { router_index: 0, ..RouteInput::default() }, vec![]);
        let route = &routes[0];
        assert_eq!(route.origin_country, UNSELECTED_PLACE);
        assert_eq!(route.destination_city, UNSELECTED_PLACE);
        assert_eq!(route.beginning_date, NaiveDate::default());
        assert_eq!(route.beginning_time, NaiveTime::default());
        assert!(!route.plane_needed);
        assert!(!route.hotel_needed);
    }

    #[test]
    fn router_indexes_need_not_be_contiguous() {
        let assembled = assemble_routes(
            leg(10, (date(2024, 1, 2), time(9, 0)), (date(2024, 1, 3), time(10, 0))),
            vec![leg(3, (date(2024, 1, 1), time(8, 0)), (date(2024, 1, 2), time(8, 0)))],
        );
        assert_eq!(assembled[0].router_index, 3);
        assert_eq!(assembled[1].router_index, 10);
        assert_eq!(trip_days(&assembled), 3);
    }
}
