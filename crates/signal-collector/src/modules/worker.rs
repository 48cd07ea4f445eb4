//! 종목 처리 워커.
//!
//! 오케스트레이터가 작업 큐에 넣은 티커를 꺼내 시세 조회 → 필터링 → 지표/점수
//! 계산까지 수행하고, 결과를 이벤트 채널로 돌려보냅니다. 저장과 원장 갱신은
//! 오케스트레이터가 직렬로 처리합니다.

use chrono::NaiveDate;
use signal_analytics::StockScorer;
use signal_core::{filter_trading_bars, StockScoreSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument};

use crate::error::TickerError;
use crate::provider::MarketDataProvider;

/// 작업 단위.
#[derive(Debug, Clone)]
pub struct TickerJob {
    pub ticker: String,
}

/// 워커 → 오케스트레이터 이벤트.
#[derive(Debug)]
pub enum WorkerEvent {
    /// 처리 시작
    Started { ticker: String },
    /// 처리 종료 (성공 또는 종목 단위 실패)
    Finished {
        ticker: String,
        result: Result<StockScoreSnapshot, TickerError>,
    },
}

/// 워커 공유 컨텍스트.
pub struct WorkerContext {
    pub provider: Arc<dyn MarketDataProvider>,
    pub scorer: Arc<StockScorer>,
    pub calculation_date: NaiveDate,
    pub lookback_bars: usize,
    pub fetch_timeout: Duration,
}

/// 워커들이 공유하는 작업 큐 수신 측.
pub type JobQueue = Arc<Mutex<mpsc::Receiver<TickerJob>>>;

/// 워커 루프.
///
/// 큐가 비거나, 이벤트 채널이 닫히거나, 취소되면 종료합니다.
/// 취소 시 진행 중인 종목은 결과를 보내지 않고 버립니다.
pub async fn run_worker(
    id: usize,
    ctx: Arc<WorkerContext>,
    jobs: JobQueue,
    events: mpsc::Sender<WorkerEvent>,
    cancel: CancellationToken,
) {
    debug!(worker = id, "워커 시작");

    loop {
        let job = tokio::select! {
            _ = cancel.cancelled() => break,
            job = async { jobs.lock().await.recv().await } => job,
        };
        let Some(TickerJob { ticker }) = job else {
            break;
        };

        if events
            .send(WorkerEvent::Started {
                ticker: ticker.clone(),
            })
            .await
            .is_err()
        {
            break;
        }

        let span = signal_core::ticker_span!("score_ticker", ticker, ctx.calculation_date);
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = process_ticker(&ctx, &ticker).instrument(span) => result,
        };

        if events
            .send(WorkerEvent::Finished { ticker, result })
            .await
            .is_err()
        {
            break;
        }
    }

    debug!(worker = id, "워커 종료");
}

/// 종목 하나를 조회/계산합니다.
pub async fn process_ticker(
    ctx: &WorkerContext,
    ticker: &str,
) -> Result<StockScoreSnapshot, TickerError> {
    let fetch = ctx
        .provider
        .fetch_history(ticker, ctx.lookback_bars, ctx.calculation_date);

    let bars = match tokio::time::timeout(ctx.fetch_timeout, fetch).await {
        Err(_) => return Err(TickerError::Timeout(ctx.fetch_timeout.as_secs())),
        Ok(Err(e)) => return Err(TickerError::DataUnavailable(e.to_string())),
        Ok(Ok(bars)) => bars,
    };

    let fetched = bars.len();
    let bars = filter_trading_bars(bars);
    if bars.is_empty() {
        return Err(TickerError::DataUnavailable(format!(
            "유효 거래 바 없음 (조회 {}개)",
            fetched
        )));
    }

    debug!(fetched, valid = bars.len(), "시세 조회 완료");

    Ok(ctx.scorer.score_bars(ticker, &bars, ctx.calculation_date)?)
}
