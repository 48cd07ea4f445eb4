//! 일일 종목 스코어 배치.
//!
//! # 동작
//! 1. 실행 레코드 생성 (`pending`)
//! 2. 티커 유니버스 로드 (실패 시 실행 `failed`)
//! 3. 실행 시작 (`running`, 전체 종목 수 기록)
//! 4. 워커 N개가 작업 큐에서 티커를 꺼내 시세 조회 → 지표/점수 계산
//! 5. 오케스트레이터가 결과를 받아 스냅샷 UPSERT 후 성공/실패 카운트
//! 6. 모든 종목 처리 후 `completed` (종목 단위 실패 포함)
//!
//! 종목 단위 에러는 카운트와 로그로만 남고 배치를 중단시키지 않습니다.
//! 실행 원장 자체를 갱신할 수 없으면 실행 전체가 실패합니다.
//!
//! 같은 계산일을 다시 실행하면 스냅샷과 실행 레코드를 덮어씁니다.

use chrono::NaiveDate;
use futures::future::join_all;
use signal_analytics::StockScorer;
use signal_core::ScoreCalculationRun;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::run_ledger::RunLedger;
use super::worker::{run_worker, TickerJob, WorkerContext, WorkerEvent};
use crate::config::ScoreSyncConfig;
use crate::error::{CollectorError, LedgerError, TickerError};
use crate::provider::{MarketDataProvider, TickerUniverse};
use crate::storage::{RunStore, SnapshotStore};
use crate::Result;

/// 배치 실행 옵션
#[derive(Debug, Clone)]
pub struct ScoreSyncOptions {
    /// 계산일
    pub calculation_date: NaiveDate,
    /// 동시 워커 수
    pub concurrency: usize,
    /// 종목당 시세 조회 제한 시간
    pub fetch_timeout: Duration,
    /// 조회할 일봉 수
    pub lookback_bars: usize,
    /// 진행 로그 주기 (0이면 비활성)
    pub progress_log_every: usize,
}

impl ScoreSyncOptions {
    /// 환경 설정에서 옵션 생성.
    pub fn from_config(config: &ScoreSyncConfig, calculation_date: NaiveDate) -> Self {
        Self {
            calculation_date,
            concurrency: config.concurrency,
            fetch_timeout: config.fetch_timeout(),
            lookback_bars: config.lookback_bars,
            progress_log_every: config.progress_log_every,
        }
    }
}

/// 배치 오케스트레이터.
pub struct ScoreSync {
    universe: Arc<dyn TickerUniverse>,
    provider: Arc<dyn MarketDataProvider>,
    snapshots: Arc<dyn SnapshotStore>,
    runs: Arc<dyn RunStore>,
    scorer: Arc<StockScorer>,
}

impl ScoreSync {
    pub fn new(
        universe: Arc<dyn TickerUniverse>,
        provider: Arc<dyn MarketDataProvider>,
        snapshots: Arc<dyn SnapshotStore>,
        runs: Arc<dyn RunStore>,
        scorer: StockScorer,
    ) -> Self {
        Self {
            universe,
            provider,
            snapshots,
            runs,
            scorer: Arc::new(scorer),
        }
    }

    /// 계산일 하나에 대한 배치를 실행합니다.
    ///
    /// 취소되면 실행 레코드를 `failed`로 남기고 그 레코드를 반환합니다.
    /// 실행 수준 에러(유니버스 로드 실패, 원장 갱신 실패)는 `Err`로 반환합니다.
    pub async fn run(
        &self,
        options: ScoreSyncOptions,
        cancel: CancellationToken,
    ) -> Result<ScoreCalculationRun> {
        let date = options.calculation_date;
        let ledger = RunLedger::create(self.runs.clone(), date)
            .await
            .map_err(|e| CollectorError::RunFatal(format!("실행 레코드 생성 실패: {}", e)))?;

        // 유니버스 로드
        let tickers = match self.universe.load().await {
            Ok(tickers) => tickers,
            Err(e) => {
                let message = format!("티커 유니버스 로드 실패: {}", e);
                error!(calculation_date = %date, error = %e, "티커 유니버스 로드 실패");
                fail_quietly(&ledger, &message).await;
                return Err(CollectorError::RunFatal(message));
            }
        };

        let total = tickers.len();
        if let Err(e) = ledger.start(total as u32).await {
            return Err(abort(&ledger, e).await);
        }

        info!(
            calculation_date = %date,
            total,
            concurrency = options.concurrency,
            provider = self.provider.name(),
            "스코어 배치 시작"
        );

        // 작업 큐: 전체 티커를 미리 넣고 송신 측을 닫음
        let (job_tx, job_rx) = mpsc::channel::<TickerJob>(total.max(1));
        for ticker in tickers {
            if job_tx.send(TickerJob { ticker }).await.is_err() {
                break;
            }
        }
        drop(job_tx);

        let worker_count = options.concurrency.max(1).min(total.max(1));
        let (event_tx, mut event_rx) = mpsc::channel::<WorkerEvent>(worker_count * 2);
        let jobs = Arc::new(Mutex::new(job_rx));
        let worker_cancel = cancel.child_token();
        let ctx = Arc::new(WorkerContext {
            provider: self.provider.clone(),
            scorer: self.scorer.clone(),
            calculation_date: date,
            lookback_bars: options.lookback_bars,
            fetch_timeout: options.fetch_timeout,
        });

        let handles: Vec<_> = (0..worker_count)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    ctx.clone(),
                    jobs.clone(),
                    event_tx.clone(),
                    worker_cancel.clone(),
                ))
            })
            .collect();
        drop(event_tx);

        let mut cancelled = false;
        let mut fatal: Option<LedgerError> = None;

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                event = event_rx.recv() => event,
            };
            let Some(event) = event else {
                break;
            };

            let step = match event {
                WorkerEvent::Started { ticker } => {
                    debug!(ticker = %ticker, "종목 처리 시작");
                    ledger.mark_current(&ticker).await
                }
                WorkerEvent::Finished { ticker, result } => {
                    let step = self.record_outcome(&ledger, &ticker, result).await;
                    let processed = ledger.processed() as usize;
                    if options.progress_log_every > 0 && processed % options.progress_log_every == 0 {
                        info!(progress = format!("{}/{}", processed, total), "스코어 배치 진행 중");
                    }
                    step
                }
            };

            if let Err(e) = step {
                fatal = Some(e);
                break;
            }
        }

        // 워커 정리
        worker_cancel.cancel();
        drop(event_rx);
        for joined in join_all(handles).await {
            if let Err(e) = joined {
                error!(error = %e, "워커 비정상 종료");
            }
        }

        if let Some(e) = fatal {
            return Err(abort(&ledger, e).await);
        }

        let processed = ledger.processed();
        let result = if cancelled {
            ledger
                .fail(format!("실행이 취소되었습니다 (처리 {}/{})", processed, total))
                .await
        } else if (processed as usize) < total {
            ledger
                .fail(format!("일부 종목이 처리되지 않았습니다 (처리 {}/{})", processed, total))
                .await
        } else {
            ledger.finish().await
        };

        result.map_err(CollectorError::from)
    }

    /// 종목 결과를 저장하고 원장 카운트를 갱신합니다.
    async fn record_outcome(
        &self,
        ledger: &RunLedger,
        ticker: &str,
        result: std::result::Result<signal_core::StockScoreSnapshot, TickerError>,
    ) -> std::result::Result<(), LedgerError> {
        let outcome = match result {
            Ok(snapshot) => self
                .snapshots
                .upsert_snapshot(&snapshot)
                .await
                .map(|_| snapshot)
                .map_err(|e| TickerError::Persistence(e.to_string())),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(snapshot) => {
                debug!(
                    ticker = %ticker,
                    total_score = %snapshot.total_score,
                    action = %snapshot.recommended_action,
                    "스냅샷 저장 완료"
                );
                ledger.increment_success().await
            }
            Err(e) => {
                warn!(ticker = %ticker, kind = e.kind(), error = %e, "종목 처리 실패");
                ledger.increment_failure().await
            }
        }
    }
}

/// 원장 에러로 실행을 중단합니다. 실패 기록이 가능하면 남깁니다.
async fn abort(ledger: &RunLedger, e: LedgerError) -> CollectorError {
    let message = format!("실행 원장 갱신 실패: {}", e);
    error!(error = %e, "실행 원장 갱신 실패, 배치 중단");
    fail_quietly(ledger, &message).await;
    CollectorError::RunFatal(message)
}

async fn fail_quietly(ledger: &RunLedger, message: &str) {
    if let Err(e) = ledger.fail(message).await {
        error!(error = %e, "실행 실패 상태 기록 불가");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_config() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let options = ScoreSyncOptions::from_config(&ScoreSyncConfig::default(), date);
        assert_eq!(options.calculation_date, date);
        assert_eq!(options.concurrency, 4);
        assert_eq!(options.fetch_timeout, Duration::from_secs(30));
        assert_eq!(options.lookback_bars, 120);
    }
}
