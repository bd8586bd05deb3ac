//! Tracing subscriber setup.

use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Install a console subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Returns false if a global subscriber was already installed.
pub fn init(level: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let installed = tracing_subscriber::fmt()
        .with_target(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(env_filter)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Console logging initialized: level={}", level);
    }
    installed
}
