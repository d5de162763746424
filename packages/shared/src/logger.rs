//! Logging setup utilities for the Streamhub services.

use std::str::FromStr;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, colored output (local development)
    #[default]
    Text,
    /// One JSON object per line (log shipping in production)
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{}' (expected text or json)", other)),
        }
    }
}

/// Build the default filter directive used when `RUST_LOG` is not set.
///
/// The Streamhub crates, the binary itself and `tower_http` are logged at
/// `default_log_level`; everything else stays at the `warn` level.
pub fn default_filter_directive(binary_name: &str, default_log_level: &str) -> String {
    format!(
        "warn,streamhub_server={level},streamhub_shared={level},{bin}={level},tower_http={level}",
        level = default_log_level,
        bin = binary_name.replace('-', "_"),
    )
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Examples
///
/// ```no_run
/// use streamhub_shared::logger::{LogFormat, setup_logger};
///
/// setup_logger("streamhub-server", "debug", LogFormat::Text);
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter_directive(binary_name, default_log_level).into());

    let json = format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_current_span(false)))
        .with((!json).then(|| fmt::layer()))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        // テスト項目: 文字列からログフォーマットを解釈できる（大文字小文字は区別しない）
        // given (前提条件):
        let inputs = ["text", "JSON", "pretty"];

        // when (操作):
        let parsed: Vec<LogFormat> = inputs.iter().map(|s| s.parse().unwrap()).collect();

        // then (期待する結果):
        assert_eq!(parsed, vec![LogFormat::Text, LogFormat::Json, LogFormat::Text]);
    }

    #[test]
    fn test_log_format_from_str_rejects_unknown() {
        // テスト項目: 未知のフォーマットはエラーになる
        // given (前提条件):
        let input = "xml";

        // when (操作):
        let result = input.parse::<LogFormat>();

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_default_filter_directive_normalizes_binary_name() {
        // テスト項目: バイナリ名のハイフンがアンダースコアに変換される
        // given (前提条件):
        let binary_name = "streamhub-server";

        // when (操作):
        let directive = default_filter_directive(binary_name, "debug");

        // then (期待する結果):
        assert!(directive.contains("streamhub_server=debug"));
        assert!(directive.contains("tower_http=debug"));
        assert!(!directive.contains("streamhub-server"));
    }
}
