use std::net::SocketAddr;

use crate::core::errors::ApiError;
use crate::ratelimit::RatePolicy;
use crate::state::AppState;

/// Runs the admission check for one request; a denial carries the window's
/// remaining time so the caller knows when to retry.
pub fn admit(state: &AppState, identity: &str, policy: &RatePolicy) -> Result<(), ApiError> {
    let admission = state.governor.admit(identity, policy);
    if admission.allowed {
        Ok(())
    } else {
        tracing::debug!(identity, policy = policy.name, "request rate limited");
        Err(ApiError::RateLimited {
            retry_after_ms: admission.reset_in_ms(),
        })
    }
}

/// The caller's opaque identity: its peer IP. Isolation between callers
/// rests entirely on this.
pub fn identity_of(addr: &SocketAddr) -> String {
    addr.ip().to_string()
}

/// Namespace key for the caller's partition in the vector index, derived
/// from its identity. Created implicitly in the index on first write.
pub fn namespace_for(identity: &str) -> String {
    let safe: String = identity
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("ns-{safe}")
}
