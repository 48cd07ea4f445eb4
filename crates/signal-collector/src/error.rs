//! 에러 타입 정의.
//!
//! - [`CollectorError`]: 실행(run) 단위 에러. 배치 전체를 중단시킵니다.
//! - [`TickerError`]: 종목 단위 에러. 실패 카운트로 변환되고 배치는 계속됩니다.
//! - [`ProviderError`], [`StorageError`], [`LedgerError`]: 협력자 경계 에러.

use std::fmt;

use signal_analytics::ScoringError;
use signal_core::{CoreError, RunStatus};
use thiserror::Error;

/// Collector 에러 타입
#[derive(Debug)]
pub enum CollectorError {
    /// 데이터베이스 에러
    Database(sqlx::Error),
    /// 설정 에러
    Config(String),
    /// 데이터 소스 에러 (티커 유니버스, 시세)
    DataSource(String),
    /// 실행 전체 실패 (유니버스 로드 실패 등)
    RunFatal(String),
    /// 실행 원장 에러
    Ledger(LedgerError),
    /// 저장소 에러
    Storage(StorageError),
    /// 일반 에러
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(e) => write!(f, "Database error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::DataSource(msg) => write!(f, "Data source error: {}", msg),
            Self::RunFatal(msg) => write!(f, "Run failed: {}", msg),
            Self::Ledger(e) => write!(f, "Run ledger error: {}", e),
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for CollectorError {}

impl From<sqlx::Error> for CollectorError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl From<std::env::VarError> for CollectorError {
    fn from(err: std::env::VarError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<CoreError> for CollectorError {
    fn from(err: CoreError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<ScoringError> for CollectorError {
    fn from(err: ScoringError) -> Self {
        match err {
            ScoringError::Config(msg) => Self::Config(msg),
            other => Self::Other(Box::new(other)),
        }
    }
}

impl From<LedgerError> for CollectorError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

impl From<StorageError> for CollectorError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CollectorError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Other(err)
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;

/// 종목 단위 처리 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickerError {
    /// 시세 조회 실패, 빈 응답, 유효 바 없음
    #[error("데이터 없음: {0}")]
    DataUnavailable(String),

    /// 시세 조회 시간 초과
    #[error("시세 조회 시간 초과 ({0}초)")]
    Timeout(u64),

    /// 지표/점수 계산 오류
    #[error("계산 오류: {0}")]
    Computation(String),

    /// 스냅샷 저장 실패
    #[error("저장 실패: {0}")]
    Persistence(String),
}

impl TickerError {
    /// 로그용 분류 이름.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataUnavailable(_) => "data_unavailable",
            Self::Timeout(_) => "timeout",
            Self::Computation(_) => "computation",
            Self::Persistence(_) => "persistence",
        }
    }
}

impl From<ScoringError> for TickerError {
    fn from(err: ScoringError) -> Self {
        match err {
            ScoringError::InsufficientData { .. } => Self::DataUnavailable(err.to_string()),
            other => Self::Computation(other.to_string()),
        }
    }
}

/// 시세/유니버스 협력자 에러.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 해당 티커의 데이터가 없음
    #[error("데이터 없음: {0}")]
    Unavailable(String),

    /// 데이터베이스 에러
    #[error("데이터베이스 에러: {0}")]
    Database(#[from] sqlx::Error),

    /// 기타 소스 에러
    #[error("데이터 소스 에러: {0}")]
    Source(String),
}

/// 저장소 에러.
#[derive(Debug, Error)]
pub enum StorageError {
    /// 데이터베이스 에러
    #[error("데이터베이스 에러: {0}")]
    Database(#[from] sqlx::Error),

    /// 저장된 값을 해석할 수 없음
    #[error("손상된 레코드: {0}")]
    Corrupt(String),
}

/// 저장소 Result 타입.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// 실행 원장 에러.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// 원장 저장 실패
    #[error("원장 저장 실패: {0}")]
    Storage(#[from] StorageError),

    /// 허용되지 않는 상태 전이
    #[error("허용되지 않는 상태 전이: {from} → {to}")]
    InvalidTransition { from: RunStatus, to: RunStatus },

    /// 처리 수가 전체 종목 수를 넘으려 함
    #[error("처리 카운트가 전체 종목 수({total})를 초과합니다")]
    CounterOverflow { total: u32 },
}
