//! Website side tasks: the newsletter submission service and the IndexNow post-build notifier.

pub mod app;
pub mod config;
mod error;
pub mod indexnow;
pub mod lock;
pub mod store;
pub mod web;

pub use app::{App, AppState};
pub use error::{Error, Result};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Compact console output without timestamps, meant for development builds.
pub fn init_dbg_tracing() {
    tracing_subscriber::fmt()
        .without_time()
        .with_target(false)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::DEBUG.into())
                .from_env_lossy(),
        )
        .compact()
        .init();
}

/// Full format without ANSI colors, `info` unless `RUST_LOG` says otherwise.
pub fn init_production_tracing() {
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();
}
