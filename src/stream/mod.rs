//! Async adapters for tooling built on `tokio` and `futures`.

pub mod replay;
pub mod throttle;

pub use replay::{Paced, replay};
pub use throttle::{Throttle, ThrottleExt};
