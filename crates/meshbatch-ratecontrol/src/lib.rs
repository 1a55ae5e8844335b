//! Per-identity throttle tracking and pool-wide AIMD parallelism control (spec §4.B, §4.D).
//!
//! [`throttle::ThrottleTracker`] and [`controller::AdaptiveRateController`] are deliberately
//! separate: the tracker answers "is this identity usable right now", the controller answers
//! "how many batches total should be in flight". A pool consults both at checkout.

pub mod controller;
pub mod events;
pub mod throttle;

pub use controller::{AdaptiveRateController, RateControllerConfig, RateControllerSnapshot};
pub use events::RateControlEvent;
pub use throttle::ThrottleTracker;
