//! 메모리 기반 Provider.

use async_trait::async_trait;
use chrono::NaiveDate;
use signal_core::PriceBar;
use std::collections::HashMap;

use super::{MarketDataProvider, TickerUniverse};
use crate::error::ProviderError;

/// 고정 티커 목록.
#[derive(Debug, Clone, Default)]
pub struct StaticUniverse {
    tickers: Vec<String>,
}

impl StaticUniverse {
    pub fn new<I, S>(tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for ticker in tickers.into_iter().map(Into::into) {
            if !unique.contains(&ticker) {
                unique.push(ticker);
            }
        }
        Self { tickers: unique }
    }
}

#[async_trait]
impl TickerUniverse for StaticUniverse {
    async fn load(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.tickers.clone())
    }
}

/// 티커별 고정 일봉 데이터.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    bars: HashMap<String, Vec<PriceBar>>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// 티커 데이터 추가 (기존 데이터는 교체).
    pub fn with_bars(mut self, ticker: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        self.bars.insert(ticker.into(), bars);
        self
    }
}

#[async_trait]
impl MarketDataProvider for StaticMarketData {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_history(
        &self,
        ticker: &str,
        lookback: usize,
        until: NaiveDate,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        let bars = self
            .bars
            .get(ticker)
            .ok_or_else(|| ProviderError::Unavailable(ticker.to_string()))?;

        let mut history: Vec<PriceBar> = bars
            .iter()
            .filter(|b| b.trading_date() <= until)
            .cloned()
            .collect();
        history.sort_by_key(|b| b.timestamp);

        if history.is_empty() {
            return Err(ProviderError::Unavailable(ticker.to_string()));
        }

        let skip = history.len().saturating_sub(lookback);
        Ok(history.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn bars(n: usize) -> Vec<PriceBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                PriceBar::new(
                    start + Duration::days(i as i64),
                    dec!(10),
                    dec!(11),
                    dec!(9),
                    dec!(10),
                    dec!(100),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_static_market_data_window() {
        let provider = StaticMarketData::new().with_bars("AAA", bars(10));
        let until = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();

        let history = provider.fetch_history("AAA", 3, until).await.unwrap();
        let dates: Vec<NaiveDate> = history.iter().map(PriceBar::trading_date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_ticker_unavailable() {
        let provider = StaticMarketData::new();
        let until = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        assert!(matches!(
            provider.fetch_history("ZZZ", 3, until).await,
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_static_universe_dedup() {
        let universe = StaticUniverse::new(["A", "B", "A"]);
        assert_eq!(universe.load().await.unwrap(), vec!["A", "B"]);
    }
}
