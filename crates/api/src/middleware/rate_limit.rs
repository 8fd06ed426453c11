//! Request rate limiting.
//!
//! Two limiters guard the API:
//!
//! - [`IpRateLimiter`] applies to every request, one token bucket per client
//!   IP. Idle buckets are evicted by the sweeper in
//!   [`crate::background::limiter_sweep`].
//! - [`SharedKeyLimiter`] is a single bucket shared by every user who
//!   generates with the platform API key.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use souschef_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Requests per second allowed from one IP.
pub const PER_IP_RPS: u32 = 20;

/// Platform-key generations per second, shared by all users.
pub const SHARED_KEY_RPS: u32 = 1;

/// Platform-key burst size.
pub const SHARED_KEY_BURST: u32 = 5;

fn non_zero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

// ---------------------------------------------------------------------------
// Per-IP limiter
// ---------------------------------------------------------------------------

struct Entry {
    limiter: DirectLimiter,
    last_seen: Instant,
}

/// One token bucket per client IP.
pub struct IpRateLimiter {
    quota: Quota,
    entries: DashMap<IpAddr, Entry>,
}

impl IpRateLimiter {
    pub fn new(quota: Quota) -> Self {
        Self {
            quota,
            entries: DashMap::new(),
        }
    }

    /// `PER_IP_RPS` requests per second per IP.
    pub fn per_ip_default() -> Self {
        Self::new(Quota::per_second(non_zero(PER_IP_RPS)))
    }

    /// Take one token for `ip`. Returns `false` when the bucket is empty.
    pub fn check(&self, ip: IpAddr) -> bool {
        let mut entry = self.entries.entry(ip).or_insert_with(|| Entry {
            limiter: RateLimiter::direct(self.quota),
            last_seen: Instant::now(),
        });
        entry.last_seen = Instant::now();
        entry.limiter.check().is_ok()
    }

    /// Drop buckets not used for longer than `max_idle`. Returns how many
    /// were removed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.last_seen.elapsed() <= max_idle);
        before.saturating_sub(self.entries.len())
    }

    /// Number of IPs currently tracked.
    pub fn tracked(&self) -> usize {
        self.entries.len()
    }
}

/// Axum middleware rejecting requests from IPs over their quota with 429.
pub async fn limit_by_ip(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let ip = client_ip(&req);
    if !state.ip_limiter.check(ip) {
        tracing::debug!(%ip, "Per-IP rate limit exceeded");
        return AppError::Core(CoreError::RateLimited(
            "Too many requests, slow down".into(),
        ))
        .into_response();
    }
    next.run(req).await
}

/// Peer address recorded by `into_make_service_with_connect_info`.
///
/// Requests without connection info (in-process tests) share the
/// unspecified address.
fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

// ---------------------------------------------------------------------------
// Shared platform-key limiter
// ---------------------------------------------------------------------------

/// Single bucket protecting the platform API key.
pub struct SharedKeyLimiter {
    limiter: DirectLimiter,
}

impl SharedKeyLimiter {
    pub fn new(quota: Quota) -> Self {
        Self {
            limiter: RateLimiter::direct(quota),
        }
    }

    /// `SHARED_KEY_RPS` per second with a burst of `SHARED_KEY_BURST`.
    pub fn platform_default() -> Self {
        let quota =
            Quota::per_second(non_zero(SHARED_KEY_RPS)).allow_burst(non_zero(SHARED_KEY_BURST));
        Self::new(quota)
    }

    /// Take one token. Returns `false` when the bucket is empty.
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}
