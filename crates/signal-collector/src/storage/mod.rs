//! 스냅샷/실행 원장 저장소.
//!
//! - [`SnapshotStore`]: (계산일, 티커) 단위 upsert, 티커별 최신 스냅샷 조회
//! - [`RunStore`]: 계산일 단위 실행 레코드 저장/조회, stale 실행 정리

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use signal_core::{ScoreCalculationRun, StockScoreSnapshot};

use crate::error::StorageResult;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// stale 실행을 실패 처리할 때 기록하는 메시지.
pub const STALE_RUN_MESSAGE: &str = "제한 시간 내에 종료되지 않아 실패 처리되었습니다";

/// 종목 점수 스냅샷 저장소.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// (calculation_date, ticker) 기준 upsert. 기존 행이 있으면 모든 필드를 덮어씁니다.
    async fn upsert_snapshot(&self, snapshot: &StockScoreSnapshot) -> StorageResult<()>;

    /// 티커의 가장 최근 계산일 스냅샷.
    async fn get_latest_snapshot(&self, ticker: &str) -> StorageResult<Option<StockScoreSnapshot>>;

    /// 계산일의 전체 스냅샷 (티커순).
    async fn list_snapshots(&self, calculation_date: NaiveDate)
        -> StorageResult<Vec<StockScoreSnapshot>>;
}

/// 실행 원장 저장소.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// calculation_date 기준 upsert.
    async fn save_run(&self, run: &ScoreCalculationRun) -> StorageResult<()>;

    /// 계산일의 실행 레코드.
    async fn get_run(&self, calculation_date: NaiveDate)
        -> StorageResult<Option<ScoreCalculationRun>>;

    /// 최근 실행 목록 (계산일 내림차순).
    async fn list_runs(&self, limit: usize) -> StorageResult<Vec<ScoreCalculationRun>>;

    /// `older_than` 이전에 시작해 아직 종료되지 않은 실행을 `failed`로 바꿉니다.
    ///
    /// 변경된 실행 수를 반환합니다.
    async fn mark_stale_runs(
        &self,
        older_than: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StorageResult<u64>;
}
