//! Background tasks and scheduled jobs.
//!
//! Each submodule provides a long-running async `run` function meant to be
//! spawned via `tokio::spawn`. All of them stop when their
//! [`CancellationToken`](tokio_util::sync::CancellationToken) is cancelled.

pub mod limiter_sweep;
pub mod recipe_purge;
