use std::sync::atomic::{AtomicU64, Ordering};

use elg_common::PartnerKeys;

use crate::config::ServerConfig;

/// Immutable state shared by every connection worker. No locks: nothing in
/// here is ever mutated after startup, and the one counter is atomic rather
/// than relying on interpreter-level atomicity the way the source did.
pub struct GatewayContext {
    pub config: ServerConfig,
    pub partner_keys: PartnerKeys,
    request_count: AtomicU64,
}

impl GatewayContext {
    pub fn new(config: ServerConfig, partner_keys: PartnerKeys) -> Self {
        Self {
            config,
            partner_keys,
            request_count: AtomicU64::new(0),
        }
    }

    /// Bump the request counter and return the new total. Used only for the
    /// occasional log line; never read back for control flow.
    pub fn next_request_count(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::Relaxed) + 1
    }
}
