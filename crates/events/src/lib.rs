//! In-process event bus for out-of-band generation reporting.
//!
//! - [`EventBus`]: publish/subscribe hub backed by `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the envelope published when a generation run ends.

pub mod bus;

pub use bus::{EventBus, PlatformEvent};
