pub mod config;
pub mod domain;
pub mod errors;
pub mod itinerary;
pub mod notify;
pub mod workflow;

pub use config::{
    AppConfig, ConfigError, ConfigOverrides, DatabaseConfig, LoadOptions, LogFormat, LoggingConfig,
    NotifierConfig, NotifierMode, ServerConfig,
};
pub use domain::receipt::{NewReceipt, Receipt, ReceiptId, ReceiptVerdict};
pub use domain::request::{RequestId, RequestStatus, TravelRequest};
pub use domain::route::{Route, UNSELECTED_PLACE};
pub use domain::user::{Role, User, UserId};
pub use errors::WorkflowError;
pub use itinerary::{assemble_routes, trip_days, RouteInput};
pub use notify::{Notifier, NotifyError, RecordingNotifier, TransitionNotice};
pub use workflow::aggregation::{
    display_status, rollup, sort_for_triage, ExpenseDisplayStatus, RollupOutcome,
};
