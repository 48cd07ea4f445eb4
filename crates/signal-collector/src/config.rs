//! 환경변수 기반 설정 모듈.

use crate::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL
    pub database_url: String,
    /// 스코어링 설정 파일 경로 (없으면 기본값 + `SCORING__` 환경변수)
    pub scoring_config_path: Option<PathBuf>,
    /// 배치 스코어링 설정
    pub score_sync: ScoreSyncConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// 배치 스코어링 설정
#[derive(Debug, Clone)]
pub struct ScoreSyncConfig {
    /// 동시 시세 조회 워커 수
    pub concurrency: usize,
    /// 종목당 시세 조회 제한 시간 (초)
    pub fetch_timeout_secs: u64,
    /// 조회할 일봉 수
    pub lookback_bars: usize,
    /// 진행 로그 주기 (종목 수)
    pub progress_log_every: usize,
    /// 이 시간(분) 안에 끝나지 않은 실행은 stale로 간주
    pub stale_run_minutes: i64,
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 배치 실행 주기 (분 단위)
    pub interval_minutes: u64,
}

impl Default for ScoreSyncConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            fetch_timeout_secs: 30,
            lookback_bars: 120,
            progress_log_every: 100,
            stale_run_minutes: 180,
        }
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            crate::error::CollectorError::Config(
                "DATABASE_URL 환경변수가 설정되지 않았습니다".to_string(),
            )
        })?;

        let defaults = ScoreSyncConfig::default();

        Ok(Self {
            database_url,
            scoring_config_path: std::env::var("SCORING_CONFIG_PATH").ok().map(PathBuf::from),
            score_sync: ScoreSyncConfig {
                concurrency: env_var_parse("SCORE_CONCURRENCY", defaults.concurrency).max(1),
                fetch_timeout_secs: env_var_parse(
                    "SCORE_FETCH_TIMEOUT_SECS",
                    defaults.fetch_timeout_secs,
                ),
                lookback_bars: env_var_parse("SCORE_LOOKBACK_BARS", defaults.lookback_bars),
                progress_log_every: env_var_parse(
                    "SCORE_PROGRESS_LOG_EVERY",
                    defaults.progress_log_every,
                ),
                stale_run_minutes: env_var_parse(
                    "SCORE_STALE_RUN_MINUTES",
                    defaults.stale_run_minutes,
                ),
            },
            daemon: DaemonConfig {
                interval_minutes: env_var_parse("DAEMON_INTERVAL_MINUTES", 1440),
            },
        })
    }
}

impl ScoreSyncConfig {
    /// 시세 조회 제한 시간을 Duration으로 반환
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// stale 판정 기준 시간
    pub fn stale_budget(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.stale_run_minutes)
    }
}

impl DaemonConfig {
    /// 실행 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
