//! 일일 종목 스코어링 배치.
//!
//! 이 crate는 티커 유니버스 전체에 대해 점수를 계산하는 배치를 제공합니다:
//! - 티커별 일봉 조회 (시간 제한, 종목 단위 실패 허용)
//! - 지표/점수 계산 후 (계산일, 티커) 단위 스냅샷 UPSERT
//! - 실행 원장 (pending → running → completed/failed) 및 진행 카운트
//! - stale 실행 정리

pub mod config;
pub mod error;
pub mod modules;
pub mod provider;
pub mod stats;
pub mod storage;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use stats::CollectionStats;
