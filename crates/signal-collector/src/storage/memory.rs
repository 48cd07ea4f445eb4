//! 메모리 저장소 (dry-run, 테스트).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use signal_core::{RunStatus, ScoreCalculationRun, StockScoreSnapshot};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{RunStore, SnapshotStore, STALE_RUN_MESSAGE};
use crate::error::StorageResult;

/// 메모리 저장소.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: RwLock<BTreeMap<(NaiveDate, String), StockScoreSnapshot>>,
    runs: RwLock<BTreeMap<NaiveDate, ScoreCalculationRun>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 전체 스냅샷 수.
    pub async fn snapshot_count(&self) -> usize {
        self.snapshots.read().await.len()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn upsert_snapshot(&self, snapshot: &StockScoreSnapshot) -> StorageResult<()> {
        let key = (snapshot.calculation_date, snapshot.ticker.clone());
        self.snapshots.write().await.insert(key, snapshot.clone());
        Ok(())
    }

    async fn get_latest_snapshot(&self, ticker: &str) -> StorageResult<Option<StockScoreSnapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots
            .values()
            .filter(|s| s.ticker == ticker)
            .max_by_key(|s| s.calculation_date)
            .cloned())
    }

    async fn list_snapshots(
        &self,
        calculation_date: NaiveDate,
    ) -> StorageResult<Vec<StockScoreSnapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots
            .iter()
            .filter(|((date, _), _)| *date == calculation_date)
            .map(|(_, s)| s.clone())
            .collect())
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn save_run(&self, run: &ScoreCalculationRun) -> StorageResult<()> {
        self.runs
            .write()
            .await
            .insert(run.calculation_date, run.clone());
        Ok(())
    }

    async fn get_run(
        &self,
        calculation_date: NaiveDate,
    ) -> StorageResult<Option<ScoreCalculationRun>> {
        Ok(self.runs.read().await.get(&calculation_date).cloned())
    }

    async fn list_runs(&self, limit: usize) -> StorageResult<Vec<ScoreCalculationRun>> {
        Ok(self
            .runs
            .read()
            .await
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_stale_runs(
        &self,
        older_than: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StorageResult<u64> {
        let mut runs = self.runs.write().await;
        let mut marked = 0;

        for run in runs.values_mut() {
            let started = run.start_time.unwrap_or(run.updated_at);
            if !run.status.is_terminal() && started < older_than {
                run.status = RunStatus::Failed;
                run.end_time = Some(now);
                run.current_stock = None;
                run.error_message = Some(STALE_RUN_MESSAGE.to_string());
                run.updated_at = now;
                marked += 1;
            }
        }

        Ok(marked)
    }
}
