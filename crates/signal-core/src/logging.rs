//! 배치 로깅 초기화.
//!
//! 스코어링 crate(`signal_collector`, `signal_analytics`, `signal_core`)에
//! 같은 레벨을 적용하는 `EnvFilter`와 출력 형식(pretty/json/compact)을 묶어
//! 전역 subscriber를 한 번 설치합니다. `RUST_LOG`가 있으면 그것이 우선합니다.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 레벨 필터를 적용할 crate 목록.
pub const SCORING_CRATES: &[&str] = &["signal_collector", "signal_analytics", "signal_core"];

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 사람이 읽기 쉬운 형식 (개발용)
    #[default]
    Pretty,
    /// 로그 수집용 JSON (종목 span 필드 포함)
    Json,
    /// 한 줄 형식
    Compact,
}

impl LogFormat {
    /// `LOG_FORMAT` 환경변수 값. 없거나 알 수 없으면 기본값(pretty).
    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("알 수 없는 로그 형식: {}", s)),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `EnvFilter` 지시문 (예: "signal_collector=debug,signal_core=info")
    pub filter: String,
    /// 출력 형식
    pub format: LogFormat,
}

impl LogConfig {
    /// 스코어링 crate 전체에 `level`을 적용하는 설정.
    pub fn for_crates(level: &str) -> Self {
        let filter = SCORING_CRATES
            .iter()
            .map(|krate| format!("{}={}", krate, level))
            .collect::<Vec<_>>()
            .join(",");

        Self {
            filter,
            format: LogFormat::default(),
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// 전역 subscriber를 설치합니다.
///
/// ```no_run
/// use signal_core::logging::{init_logging, LogConfig, LogFormat};
///
/// init_logging(LogConfig::for_crates("debug").with_format(LogFormat::Json)).unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.filter))?;

    let fmt_layer = match config.format {
        LogFormat::Pretty => fmt::layer().pretty().with_target(true).boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    tracing::debug!(format = ?config.format, filter = %config.filter, "로깅 초기화");
    Ok(())
}

/// 종목 단위 처리 span.
#[macro_export]
macro_rules! ticker_span {
    ($name:expr, $ticker:expr) => {
        tracing::info_span!($name, ticker = %$ticker)
    };
    ($name:expr, $ticker:expr, $date:expr) => {
        tracing::info_span!($name, ticker = %$ticker, calculation_date = %$date)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Compact ".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_filter_covers_scoring_crates() {
        let config = LogConfig::for_crates("debug").with_format(LogFormat::Json);

        assert_eq!(
            config.filter,
            "signal_collector=debug,signal_analytics=debug,signal_core=debug"
        );
        assert_eq!(config.format, LogFormat::Json);
        assert!(EnvFilter::try_new(&config.filter).is_ok());
    }
}
