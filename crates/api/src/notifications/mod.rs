//! Delivery of generation events to their owners.

pub mod router;

pub use router::NotificationRouter;
