//! Proxy routing policy shared across one module run.
//!
//! Steps toggle the policy on and off; the request hook installed at module
//! setup reads it to decide whether a request is rerouted through the
//! configured proxy address or passed through unmodified.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable holding the proxy address.
pub const PROXY_URL_ENV: &str = "PROXY_URL";

/// Directive a step may carry to flip the shared policy before it runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ProxyDirective {
    On,
    Off,
}

/// Shared on/off switch plus the proxy address it routes through.
///
/// The address is fixed at construction; only the switch toggles at runtime,
/// so an atomic flag is enough and readers never block.
#[derive(Debug)]
pub struct ProxyPolicy {
    enabled: AtomicBool,
    address: String,
}

impl ProxyPolicy {
    pub fn new(enabled: bool, address: impl Into<String>) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            address: address.into(),
        }
    }

    /// Build a disabled policy from the `PROXY_URL` environment variable.
    /// A missing variable yields an empty address.
    pub fn from_env() -> Self {
        Self::new(false, env::var(PROXY_URL_ENV).unwrap_or_default())
    }

    pub fn enable(&self) {
        debug!(address = %self.address, "proxy policy enabled");
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        debug!("proxy policy disabled");
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Apply a step directive to the switch.
    pub fn apply(&self, directive: ProxyDirective) {
        match directive {
            ProxyDirective::On => self.enable(),
            ProxyDirective::Off => self.disable(),
        }
    }
}

impl Default for ProxyPolicy {
    fn default() -> Self {
        Self::from_env()
    }
}
