//! Process-wide tracing setup for change-set runners.
//!
//! Logs go to stderr so stdout stays free for the run summary.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "INPROD_LOG";

/// Install the global subscriber.
///
/// `INPROD_LOG`, then `RUST_LOG`, override `level`. With `json` set, each
/// event is one JSON line. Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init()
            .ok();
    }
}

/// Our crates log at `level`; dependencies stay at `warn` unless asked.
fn default_directive(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("warn,inprod_api={level},inprod_changeset={level},inprod={level}")
}
