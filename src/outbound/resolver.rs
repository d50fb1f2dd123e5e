//! Group redirection.
//!
//! Follows the selection of group outbounds until a concrete outbound is
//! reached. Groups can select other groups, and a misconfiguration can close
//! the chain into a cycle, so the walk is bounded.

use std::sync::Arc;

use crate::health::error::{HealthError, HealthResult};
use crate::outbound::{Outbound, Router};

/// Maximum number of group hops before giving up.
pub const MAX_GROUP_DEPTH: usize = 100;

/// Resolve `outbound` to the concrete outbound it currently points to.
///
/// Concrete outbounds are returned unchanged. Nothing is cached: group
/// selections may change between calls.
pub fn resolve(router: &dyn Router, outbound: Arc<Outbound>) -> HealthResult<Arc<Outbound>> {
    let mut redirected = outbound;
    let mut hops = 0;
    loop {
        let Some(group) = redirected.as_group() else {
            return Ok(redirected);
        };
        hops += 1;
        if hops > MAX_GROUP_DEPTH {
            return Err(HealthError::TooDeepNesting);
        }
        let selected = group.selected();
        redirected = lookup(router, &selected)
            .ok_or_else(|| HealthError::OutboundNotFound(selected.to_string()))?;
    }
}

/// Find `tag` in the router's flat set, then in each provider.
pub fn lookup(router: &dyn Router, tag: &str) -> Option<Arc<Outbound>> {
    router.outbound(tag).or_else(|| {
        router
            .providers()
            .iter()
            .find_map(|provider| provider.outbound(tag))
    })
}
