//! 스코어 계산 실행 원장.
//!
//! 계산일 하나당 실행 레코드 하나를 유지하며, 상태 전이와 카운터 갱신을
//! 매번 저장소에 기록합니다.
//!
//! # 상태 전이
//!
//! ```text
//! pending ──start──▶ running ──finish──▶ completed
//!    │                  │
//!    └──────fail────────┴──────fail────▶ failed
//! ```
//!
//! # 불변식
//!
//! - 성공 + 실패 ≤ 전체
//! - 처리 = 성공 + 실패

use chrono::{DateTime, NaiveDate, Utc};
use signal_core::{RunStatus, ScoreCalculationRun};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::LedgerError;
use crate::storage::RunStore;

/// 실행 원장.
///
/// 카운터는 원자적으로 증가하며, 레코드 저장은 내부 잠금으로 직렬화되므로
/// 저장소에는 항상 단조 증가하는 카운터만 기록됩니다.
pub struct RunLedger {
    store: Arc<dyn RunStore>,
    record: Mutex<ScoreCalculationRun>,
    total: AtomicU32,
    successful: AtomicU32,
    failed: AtomicU32,
}

impl RunLedger {
    /// `pending` 레코드를 만들어 저장합니다.
    ///
    /// 같은 계산일의 기존 레코드는 덮어씁니다 (재실행).
    pub async fn create(
        store: Arc<dyn RunStore>,
        calculation_date: NaiveDate,
    ) -> Result<Self, LedgerError> {
        let run = ScoreCalculationRun::pending(calculation_date, Utc::now());
        store.save_run(&run).await?;

        debug!(run_id = %run.id, calculation_date = %calculation_date, "실행 레코드 생성");

        Ok(Self {
            store,
            record: Mutex::new(run),
            total: AtomicU32::new(0),
            successful: AtomicU32::new(0),
            failed: AtomicU32::new(0),
        })
    }

    /// 처리된 종목 수.
    pub fn processed(&self) -> u32 {
        self.successful.load(Ordering::SeqCst) + self.failed.load(Ordering::SeqCst)
    }

    /// `running`으로 전이하고 전체 종목 수를 기록합니다.
    pub async fn start(&self, total_count: u32) -> Result<(), LedgerError> {
        let mut record = self.record.lock().await;
        transition(&mut record, RunStatus::Running)?;

        self.total.store(total_count, Ordering::SeqCst);
        self.successful.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);

        let now = Utc::now();
        record.start_time = Some(now);
        record.total_stocks = total_count;
        record.successful_stocks = 0;
        record.failed_stocks = 0;
        record.processed_stocks = 0;
        record.updated_at = now;
        self.store.save_run(&record).await?;

        info!(run_id = %record.id, total = total_count, "실행 시작");
        Ok(())
    }

    /// 현재 처리 중인 종목을 기록합니다.
    pub async fn mark_current(&self, ticker: &str) -> Result<(), LedgerError> {
        let mut record = self.record.lock().await;
        ensure_running(&record)?;

        record.current_stock = Some(ticker.to_string());
        record.updated_at = Utc::now();
        self.store.save_run(&record).await?;
        Ok(())
    }

    /// 성공 카운트 증가.
    pub async fn increment_success(&self) -> Result<(), LedgerError> {
        self.increment(&self.successful).await
    }

    /// 실패 카운트 증가.
    pub async fn increment_failure(&self) -> Result<(), LedgerError> {
        self.increment(&self.failed).await
    }

    async fn increment(&self, counter: &AtomicU32) -> Result<(), LedgerError> {
        let mut record = self.record.lock().await;
        ensure_running(&record)?;

        let total = self.total.load(Ordering::SeqCst);
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (self.processed() < total).then_some(current + 1)
            })
            .map_err(|_| LedgerError::CounterOverflow { total })?;

        self.sync_counters(&mut record, Utc::now());
        self.store.save_run(&record).await?;
        Ok(())
    }

    /// `completed`로 전이합니다 (일부 종목 실패 포함).
    pub async fn finish(&self) -> Result<ScoreCalculationRun, LedgerError> {
        let mut record = self.record.lock().await;
        transition(&mut record, RunStatus::Completed)?;

        let now = Utc::now();
        self.sync_counters(&mut record, now);
        record.end_time = Some(now);
        record.current_stock = None;
        self.store.save_run(&record).await?;

        info!(
            run_id = %record.id,
            total = record.total_stocks,
            successful = record.successful_stocks,
            failed = record.failed_stocks,
            "실행 완료"
        );
        Ok(record.clone())
    }

    /// `failed`로 전이합니다.
    pub async fn fail(&self, message: impl Into<String>) -> Result<ScoreCalculationRun, LedgerError> {
        let mut record = self.record.lock().await;
        transition(&mut record, RunStatus::Failed)?;

        let now = Utc::now();
        self.sync_counters(&mut record, now);
        record.end_time = Some(now);
        record.current_stock = None;
        record.error_message = Some(message.into());
        self.store.save_run(&record).await?;

        warn!(
            run_id = %record.id,
            processed = record.processed_stocks,
            total = record.total_stocks,
            error = record.error_message.as_deref().unwrap_or_default(),
            "실행 실패"
        );
        Ok(record.clone())
    }

    fn sync_counters(&self, record: &mut ScoreCalculationRun, now: DateTime<Utc>) {
        record.successful_stocks = self.successful.load(Ordering::SeqCst);
        record.failed_stocks = self.failed.load(Ordering::SeqCst);
        record.processed_stocks = record.successful_stocks + record.failed_stocks;
        record.updated_at = now;
    }
}

fn transition(record: &mut ScoreCalculationRun, next: RunStatus) -> Result<(), LedgerError> {
    if !record.status.can_transition_to(next) {
        return Err(LedgerError::InvalidTransition {
            from: record.status,
            to: next,
        });
    }
    record.status = next;
    Ok(())
}

fn ensure_running(record: &ScoreCalculationRun) -> Result<(), LedgerError> {
    if record.status != RunStatus::Running {
        return Err(LedgerError::InvalidTransition {
            from: record.status,
            to: RunStatus::Running,
        });
    }
    Ok(())
}

/// 예산 시간을 넘긴 미종료 실행을 `failed`로 정리합니다.
pub async fn sweep_stale_runs(
    store: &dyn RunStore,
    budget: chrono::Duration,
) -> Result<u64, LedgerError> {
    let now = Utc::now();
    let marked = store.mark_stale_runs(now - budget, now).await?;
    if marked > 0 {
        warn!(marked, budget_minutes = budget.num_minutes(), "stale 실행 정리");
    }
    Ok(marked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()
    }

    async fn ledger() -> (Arc<MemoryStore>, RunLedger) {
        let store = Arc::new(MemoryStore::new());
        let ledger = RunLedger::create(store.clone(), date()).await.unwrap();
        (store, ledger)
    }

    #[tokio::test]
    async fn test_lifecycle_persisted() {
        let (store, ledger) = ledger().await;
        assert_eq!(
            store.get_run(date()).await.unwrap().unwrap().status,
            RunStatus::Pending
        );

        ledger.start(2).await.unwrap();
        ledger.mark_current("AAA").await.unwrap();
        ledger.increment_success().await.unwrap();
        ledger.increment_failure().await.unwrap();

        let stored = store.get_run(date()).await.unwrap().unwrap();
        assert_eq!(stored.status, RunStatus::Running);
        assert_eq!(stored.current_stock.as_deref(), Some("AAA"));
        assert_eq!(stored.processed_stocks, 2);

        let finished = ledger.finish().await.unwrap();
        assert_eq!(finished.status, RunStatus::Completed);
        assert!(finished.end_time.is_some());
        assert!(finished.current_stock.is_none());
        assert!(finished.counters_consistent());
        assert_eq!(store.get_run(date()).await.unwrap().unwrap(), finished);
    }

    #[tokio::test]
    async fn test_counter_cannot_exceed_total() {
        let (_, ledger) = ledger().await;
        ledger.start(1).await.unwrap();
        ledger.increment_success().await.unwrap();

        assert!(matches!(
            ledger.increment_failure().await,
            Err(LedgerError::CounterOverflow { total: 1 })
        ));
        assert_eq!(ledger.processed(), 1);
    }

    #[tokio::test]
    async fn test_increment_requires_running() {
        let (_, ledger) = ledger().await;
        assert!(matches!(
            ledger.increment_success().await,
            Err(LedgerError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_fail_from_pending() {
        let (_, ledger) = ledger().await;
        let run = ledger.fail("유니버스 로드 실패").await.unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.processed_stocks, 0);
        assert_eq!(run.error_message.as_deref(), Some("유니버스 로드 실패"));

        // 종료 상태에서는 더 이상 전이 불가
        assert!(ledger.finish().await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_increments_no_lost_updates() {
        let (store, ledger) = ledger().await;
        let ledger = Arc::new(ledger);
        ledger.start(50).await.unwrap();

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    if i % 5 == 0 {
                        ledger.increment_failure().await
                    } else {
                        ledger.increment_success().await
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let run = ledger.finish().await.unwrap();
        assert_eq!(run.successful_stocks, 40);
        assert_eq!(run.failed_stocks, 10);
        assert_eq!(run.processed_stocks, 50);
        assert_eq!(store.get_run(date()).await.unwrap().unwrap().processed_stocks, 50);
    }

    #[tokio::test]
    async fn test_sweep_stale_runs() {
        let store = MemoryStore::new();
        let mut run = ScoreCalculationRun::pending(date(), Utc::now() - chrono::Duration::hours(4));
        run.status = RunStatus::Running;
        store.save_run(&run).await.unwrap();

        let marked = sweep_stale_runs(&store, chrono::Duration::hours(3))
            .await
            .unwrap();
        assert_eq!(marked, 1);
        assert_eq!(
            store.get_run(date()).await.unwrap().unwrap().status,
            RunStatus::Failed
        );
    }
}
