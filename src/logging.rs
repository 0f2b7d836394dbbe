//! Log subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Install the global subscriber. Logs go to stderr so stdout stays free
/// for command output.
///
/// Filter precedence: `cli_filter`, then `RUST_LOG`, then `logging.filter`.
pub fn init(settings: &LoggingSettings, cli_filter: Option<&str>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = filter_directive(settings, cli_filter, env_filter.as_deref());
    let filter = EnvFilter::try_new(directive)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}

fn filter_directive<'a>(settings: &'a LoggingSettings, cli_filter: Option<&'a str>, env_filter: Option<&'a str>) -> &'a str {
    [cli_filter, env_filter]
        .into_iter()
        .flatten()
        .find(|f| !f.trim().is_empty())
        .unwrap_or(settings.filter.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LoggingSettings {
        LoggingSettings {
            filter: "warn".to_string(),
            json: false,
        }
    }

    #[test]
    fn test_cli_filter_beats_environment() {
        assert_eq!(filter_directive(&settings(), Some("debug"), Some("info")), "debug");
    }

    #[test]
    fn test_environment_beats_config() {
        assert_eq!(filter_directive(&settings(), None, Some("info")), "info");
        assert_eq!(filter_directive(&settings(), None, Some("  ")), "warn");
        assert_eq!(filter_directive(&settings(), None, None), "warn");
    }
}
