//! Per-identity, per-policy request admission using fixed windows.
//!
//! Each `(identity, policy)` pair owns an independent counter window, so an
//! upload burst never consumes a caller's ask budget. State lives only in
//! process memory and does not survive restarts.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Expired entries are dropped once the table grows past this size.
const GC_THRESHOLD: usize = 4096;

/// A named fixed-window rate limit.
#[derive(Debug, Clone)]
pub struct RatePolicy {
    pub name: &'static str,
    pub window: Duration,
    pub max_requests: u32,
}

impl RatePolicy {
    pub const fn new(name: &'static str, window: Duration, max_requests: u32) -> Self {
        Self {
            name,
            window,
            max_requests,
        }
    }

    pub const fn per_minute(name: &'static str, max_requests: u32) -> Self {
        Self::new(name, Duration::from_secs(60), max_requests)
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy)]
pub struct Admission {
    pub allowed: bool,
    /// Requests left in the current window after this check.
    pub remaining: u32,
    /// Time until the current window resets; a denied caller should retry
    /// after this long.
    pub reset_in: Duration,
}

impl Admission {
    pub fn reset_in_ms(&self) -> u64 {
        self.reset_in.as_millis() as u64
    }
}

#[derive(Debug)]
struct RateWindow {
    count: u32,
    window_end: Instant,
}

/// Fixed-window admission control keyed by `(identity, policy name)`.
///
/// The check-and-increment runs under a single lock, so concurrent requests
/// can never admit past a policy's limit.
#[derive(Debug, Default)]
pub struct RateGovernor {
    windows: Mutex<HashMap<(String, &'static str), RateWindow>>,
}

impl RateGovernor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits or denies one request for `identity` under `policy`.
    ///
    /// The first admission for a key, or the first after the stored window
    /// has elapsed, starts a fresh window with a count of one. A live window
    /// increments until `max_requests`, then denies without resetting early.
    pub fn admit(&self, identity: &str, policy: &RatePolicy) -> Admission {
        let now = Instant::now();
        let mut windows = self.windows.lock();

        if windows.len() > GC_THRESHOLD {
            windows.retain(|_, window| window.window_end > now);
        }

        let key = (identity.to_string(), policy.name);
        if let Some(window) = windows.get_mut(&key) {
            if window.window_end > now {
                return if window.count < policy.max_requests {
                    window.count += 1;
                    Admission {
                        allowed: true,
                        remaining: policy.max_requests - window.count,
                        reset_in: window.window_end - now,
                    }
                } else {
                    Admission {
                        allowed: false,
                        remaining: 0,
                        reset_in: window.window_end - now,
                    }
                };
            }
        }

        windows.insert(
            key,
            RateWindow {
                count: 1,
                window_end: now + policy.window,
            },
        );
        Admission {
            allowed: true,
            remaining: policy.max_requests.saturating_sub(1),
            reset_in: policy.window,
        }
    }

    /// Number of tracked windows, expired ones included.
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().len()
    }
}
