//! 외부 데이터 협력자.
//!
//! - [`MarketDataProvider`]: 티커별 일봉 OHLCV 조회
//! - [`TickerUniverse`]: 스코어링 대상 티커 목록
//!
//! 구현체:
//! - `postgres`: `ohlcv` / `symbol_info` 테이블
//! - `memory`: 고정 데이터 (dry-run, 테스트)

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use signal_core::PriceBar;

use crate::error::ProviderError;

pub use memory::{StaticMarketData, StaticUniverse};
pub use postgres::{PgMarketData, PgUniverse};

/// 시세 조회 Provider trait.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider 이름.
    fn name(&self) -> &str;

    /// `until`(포함) 이전 최근 `lookback`개의 일봉을 시간 오름차순으로 반환합니다.
    ///
    /// 데이터가 전혀 없으면 [`ProviderError::Unavailable`]을 반환합니다.
    async fn fetch_history(
        &self,
        ticker: &str,
        lookback: usize,
        until: NaiveDate,
    ) -> Result<Vec<PriceBar>, ProviderError>;
}

/// 티커 유니버스 trait.
#[async_trait]
pub trait TickerUniverse: Send + Sync {
    /// 대상 티커 목록 (중복 없음).
    async fn load(&self) -> Result<Vec<String>, ProviderError>;
}

/// 쉼표로 구분된 티커 문자열을 파싱합니다 (공백 제거, 빈 항목 무시, 중복 제거).
pub fn parse_ticker_list(raw: &str) -> Vec<String> {
    let mut tickers: Vec<String> = Vec::new();
    for ticker in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tickers.iter().any(|t| t == ticker) {
            tickers.push(ticker.to_string());
        }
    }
    tickers
}
