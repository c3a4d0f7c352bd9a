//! Subscriber setup for binaries embedding the engine.
//!
//! The library only emits `tracing` events and the per-invocation span;
//! installing a subscriber is left to the host process.

use tracing_subscriber::EnvFilter;

/// Output format for [`init_logging`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// One line per event, prefixed with the open invocation span.
    #[default]
    Compact,
    /// Multi-line, for reading a single run.
    Pretty,
    /// One JSON object per event, with the invocation span's fields inlined.
    Json,
}

/// Filter directives in precedence order: `explicit`, then `RUST_LOG`, then
/// `fallback` (usually [`EngineConfig::log_filter`](crate::EngineConfig)).
///
/// # Errors
///
/// Fails if the chosen directives do not parse. A malformed `RUST_LOG` is
/// not skipped.
pub fn resolve_filter(explicit: Option<&str>, fallback: &str) -> anyhow::Result<EnvFilter> {
    let directives = match explicit {
        Some(directives) => directives.to_string(),
        None => std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| fallback.to_string()),
    };
    EnvFilter::try_new(&directives)
        .map_err(|e| anyhow::anyhow!("invalid log filter {directives:?}: {e}"))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(format: LogFormat, filter: EnvFilter) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("installing {format:?} subscriber: {e}"))?;

    tracing::debug!(?format, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directives_win_and_are_validated() {
        assert!(resolve_filter(Some("info,weave_engine=trace"), "warn").is_ok());

        let err = resolve_filter(Some("weave_engine=verbose"), "warn").unwrap_err();
        assert!(err.to_string().contains("weave_engine=verbose"));
    }

    #[test]
    fn log_format_parses_from_cli_value() {
        use clap::ValueEnum;

        assert_eq!(LogFormat::from_str("json", true), Ok(LogFormat::Json));
        assert_eq!(LogFormat::from_str("Pretty", true), Ok(LogFormat::Pretty));
        assert!(LogFormat::from_str("xml", true).is_err());
        assert_eq!(LogFormat::default(), LogFormat::Compact);
    }
}
