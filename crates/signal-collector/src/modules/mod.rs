//! 배치 스코어링 모듈.

pub mod run_ledger;
pub mod score_sync;
pub mod worker;

pub use run_ledger::{sweep_stale_runs, RunLedger};
pub use score_sync::{ScoreSync, ScoreSyncOptions};
pub use worker::{process_ticker, TickerJob, WorkerContext, WorkerEvent};
