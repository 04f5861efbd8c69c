//! Tracing setup
//!
//! Logs go to stderr. A non-empty `RUST_LOG` replaces the verbosity flag
//! entirely; `LOG_FORMAT=json` switches to JSON lines.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default level for this crate from the `-v` count
pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Filter directives: `RUST_LOG` when set, else this crate at the `-v` level
pub fn filter_directives(rust_log: Option<&str>, verbose: u8) -> String {
    match rust_log.map(str::trim) {
        Some(env) if !env.is_empty() => env.to_string(),
        _ => format!("termux_bridge={}", level_for(verbose)),
    }
}

/// Initialize tracing/logging for the bridge
pub fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::try_new(filter_directives(rust_log.as_deref(), verbose))?;

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0), "info");
        assert_eq!(level_for(1), "debug");
        assert_eq!(level_for(5), "trace");
    }

    #[test]
    fn test_rust_log_wins_over_verbosity() {
        assert_eq!(filter_directives(Some("termux_bridge=warn"), 2), "termux_bridge=warn");
        assert_eq!(filter_directives(None, 1), "termux_bridge=debug");
        assert_eq!(filter_directives(Some("  "), 0), "termux_bridge=info");
    }
}
