//! Tracing setup for hosts embedding the SDK.
//!
//! The runtime logs through [`tracing`] and never installs a global
//! subscriber on its own. Hosts without their own subscriber can call
//! [`init`] once at startup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install a fmt subscriber with an env-filter.
///
/// Respects `RUST_LOG` when set, otherwise falls back to `default_filter`
/// (e.g. `"next_checkout=info"`).
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init(default_filter: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
