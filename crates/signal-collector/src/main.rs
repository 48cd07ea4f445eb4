//! 일일 종목 스코어링 배치 CLI.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use signal_analytics::StockScorer;
use signal_collector::modules::{self, ScoreSync, ScoreSyncOptions};
use signal_collector::provider::{parse_ticker_list, PgMarketData, PgUniverse, TickerUniverse};
use signal_collector::storage::{MemoryStore, PgStore, RunStore, SnapshotStore};
use signal_collector::{CollectionStats, CollectorConfig};
use signal_core::{LogConfig, LogFormat, RunStatus, ScoringConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "signal-collector")]
#[command(about = "Daily stock scoring batch", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 로그 형식 (pretty, json, compact). 생략하면 LOG_FORMAT 환경변수
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// 계산일 하나에 대해 전체 종목 점수 계산
    Run {
        /// 계산일 (YYYY-MM-DD, 기본: 오늘 UTC)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// 특정 티커만 계산 (쉼표로 구분, 예: "005930,000660")
        #[arg(long)]
        tickers: Option<String>,

        /// 결과를 DB에 쓰지 않고 출력만
        #[arg(long)]
        dry_run: bool,
    },

    /// 티커의 최신 스냅샷 조회
    Latest {
        /// 티커
        ticker: String,
    },

    /// 최근 실행 기록 조회
    Runs {
        /// 최대 개수
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// 제한 시간을 넘긴 미종료 실행을 failed로 정리
    SweepStale,

    /// 데몬 모드: 주기적으로 오늘 날짜 배치 실행
    Daemon,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 초기화
    signal_core::init_logging(
        LogConfig::for_crates(&cli.log_level)
            .with_format(cli.log_format.unwrap_or_else(LogFormat::from_env)),
    )?;

    tracing::info!("Signal Collector 시작");

    // 설정 로드
    let config = CollectorConfig::from_env()?;
    let scoring = ScoringConfig::load(config.scoring_config_path.as_deref())?;
    tracing::debug!(
        concurrency = config.score_sync.concurrency,
        fetch_timeout_secs = config.score_sync.fetch_timeout_secs,
        "설정 로드 완료"
    );

    // DB 연결
    let pool = sqlx::PgPool::connect(&config.database_url).await?;
    tracing::info!("데이터베이스 연결 성공");

    let store = Arc::new(PgStore::new(pool.clone()));
    store.ensure_schema().await?;

    let mut outcome: Result<(), Box<dyn std::error::Error>> = Ok(());

    match cli.command {
        Commands::Run {
            date,
            tickers,
            dry_run,
        } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let universe: Arc<dyn TickerUniverse> = match tickers {
                Some(raw) => Arc::new(PgUniverse::with_tickers(
                    pool.clone(),
                    parse_ticker_list(&raw),
                )),
                None => Arc::new(PgUniverse::new(pool.clone())),
            };

            // dry-run이면 메모리 저장소에만 기록
            let memory = dry_run.then(|| Arc::new(MemoryStore::new()));
            let snapshots: Arc<dyn SnapshotStore> = match &memory {
                Some(memory) => memory.clone(),
                None => store.clone(),
            };
            let runs: Arc<dyn RunStore> = match &memory {
                Some(memory) => memory.clone(),
                None => store.clone(),
            };

            let sync = ScoreSync::new(
                universe,
                Arc::new(PgMarketData::new(pool.clone())),
                snapshots,
                runs,
                StockScorer::new(scoring)?,
            );

            let cancel = CancellationToken::new();
            spawn_ctrl_c(cancel.clone());

            let run = sync
                .run(ScoreSyncOptions::from_config(&config.score_sync, date), cancel)
                .await?;
            CollectionStats::from_run(&run).log_summary("스코어 배치");

            if let Some(memory) = memory {
                for snapshot in memory.list_snapshots(date).await? {
                    println!("{}", serde_json::to_string(&snapshot)?);
                }
            }

            if run.status == RunStatus::Failed {
                outcome = Err(run
                    .error_message
                    .unwrap_or_else(|| "실행 실패".to_string())
                    .into());
            }
        }
        Commands::Latest { ticker } => match store.get_latest_snapshot(&ticker).await? {
            Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
            None => tracing::warn!(ticker = %ticker, "스냅샷이 없습니다"),
        },
        Commands::Runs { limit } => {
            for run in store.list_runs(limit).await? {
                println!(
                    "{} {:<9} {}/{} (성공 {}, 실패 {}){}",
                    run.calculation_date,
                    run.status.as_str(),
                    run.processed_stocks,
                    run.total_stocks,
                    run.successful_stocks,
                    run.failed_stocks,
                    run.error_message
                        .map(|m| format!(" - {}", m))
                        .unwrap_or_default()
                );
            }
        }
        Commands::SweepStale => {
            let marked =
                modules::sweep_stale_runs(store.as_ref(), config.score_sync.stale_budget()).await?;
            tracing::info!(marked, "stale 실행 정리 완료");
        }
        Commands::Daemon => {
            tracing::info!(
                "=== 데몬 모드 시작 (주기: {}분) ===",
                config.daemon.interval_minutes
            );

            let sync = ScoreSync::new(
                Arc::new(PgUniverse::new(pool.clone())),
                Arc::new(PgMarketData::new(pool.clone())),
                store.clone(),
                store.clone(),
                StockScorer::new(scoring)?,
            );

            let shutdown = CancellationToken::new();
            spawn_ctrl_c(shutdown.clone());

            let mut interval = tokio::time::interval(config.daemon.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("종료 신호 수신, 데몬 종료 중...");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Err(e) =
                            modules::sweep_stale_runs(store.as_ref(), config.score_sync.stale_budget()).await
                        {
                            tracing::error!("stale 실행 정리 실패: {}", e);
                        }

                        let date = Utc::now().date_naive();
                        let options = ScoreSyncOptions::from_config(&config.score_sync, date);
                        match sync.run(options, shutdown.child_token()).await {
                            Ok(run) => CollectionStats::from_run(&run).log_summary("스코어 배치"),
                            Err(e) => tracing::error!("스코어 배치 실패: {}", e),
                        }

                        tracing::info!(
                            "=== 배치 완료, 다음 실행: {}분 후 ===",
                            config.daemon.interval_minutes
                        );
                    }
                }
            }
        }
    }

    pool.close().await;
    tracing::info!("Signal Collector 종료");

    outcome
}

/// Ctrl-C 수신 시 토큰을 취소합니다.
fn spawn_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("종료 신호 수신");
            token.cancel();
        }
    });
}
