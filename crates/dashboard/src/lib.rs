//! Dashboard orchestration: configuration, upstream data, the per-location
//! session tying timeline, cursor and wind field together, and alert
//! subscriptions.

pub mod advice;
pub mod config;
pub mod provider;
pub mod readout;
pub mod session;
pub mod subscription;

pub use advice::{recommendations, Recommendation, Severity};
pub use config::DashboardConfig;
pub use provider::*;
pub use readout::*;
pub use session::*;
pub use subscription::*;
