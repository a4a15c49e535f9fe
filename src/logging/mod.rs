//! Logging infrastructure
//!
//! Structured tracing setup plus a JSONL audit trail for privileged
//! mutations.

pub mod audit;

pub use audit::{AuditEvent, AuditLogger, AuditOperation};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Safe to call once
/// per process; embedding applications that install their own subscriber
/// should skip this.
pub fn init(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
