pub mod aggregation;
pub mod transitions;
