//! DeliveryEngine: drains the DurableQueue to the broker.

mod compression;
mod engine;
mod health;
mod throttle;

pub use compression::{Compressor, Encoded};
pub use engine::{DeliveryEngine, DeliveryStats, DrainReport, DrainSkip};
pub use health::DeliveryHealth;
pub use throttle::{Throttle, TokenBucket};
