//! PostgreSQL 기반 Provider.
//!
//! 시세는 수집기가 채워 둔 `ohlcv` 테이블(일봉, `timeframe = '1d'`)에서,
//! 티커 목록은 `symbol_info` 테이블에서 읽습니다.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use signal_core::PriceBar;
use sqlx::{FromRow, PgPool};

use super::{MarketDataProvider, TickerUniverse};
use crate::error::ProviderError;

/// `ohlcv` 일봉 한 행.
#[derive(Debug, FromRow)]
struct OhlcvRow {
    open_time: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
}

impl From<OhlcvRow> for PriceBar {
    fn from(row: OhlcvRow) -> Self {
        PriceBar::new(row.open_time, row.open, row.high, row.low, row.close, row.volume)
    }
}

/// `ohlcv` 테이블 기반 시세 Provider.
#[derive(Debug, Clone)]
pub struct PgMarketData {
    pool: PgPool,
}

impl PgMarketData {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarketDataProvider for PgMarketData {
    fn name(&self) -> &str {
        "postgres_ohlcv"
    }

    async fn fetch_history(
        &self,
        ticker: &str,
        lookback: usize,
        until: NaiveDate,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        // until 당일 바까지 포함
        let end = (until + Duration::days(1)).and_time(chrono::NaiveTime::MIN).and_utc();

        let rows = sqlx::query_as::<_, OhlcvRow>(
            r#"
            SELECT open_time, open, high, low, close, volume
            FROM ohlcv
            WHERE symbol = $1 AND timeframe = '1d' AND open_time < $2
            ORDER BY open_time DESC
            LIMIT $3
            "#,
        )
        .bind(ticker)
        .bind(end)
        .bind(lookback as i64)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(ProviderError::Unavailable(format!(
                "{}: {} 이전 일봉 없음",
                ticker, until
            )));
        }

        // 시간순 정렬 (DESC로 가져왔으므로 reverse)
        Ok(rows.into_iter().rev().map(PriceBar::from).collect())
    }
}

/// `symbol_info` 테이블 기반 티커 유니버스.
#[derive(Debug, Clone)]
pub struct PgUniverse {
    pool: PgPool,
    only: Option<Vec<String>>,
}

impl PgUniverse {
    /// 활성 종목 전체.
    pub fn new(pool: PgPool) -> Self {
        Self { pool, only: None }
    }

    /// 지정한 티커 중 활성 종목만.
    pub fn with_tickers(pool: PgPool, tickers: Vec<String>) -> Self {
        Self {
            pool,
            only: Some(tickers),
        }
    }
}

#[async_trait]
impl TickerUniverse for PgUniverse {
    async fn load(&self) -> Result<Vec<String>, ProviderError> {
        let tickers = match &self.only {
            Some(only) => {
                sqlx::query_scalar::<_, String>(
                    r#"
                    SELECT DISTINCT ticker
                    FROM symbol_info
                    WHERE ticker = ANY($1)
                      AND is_active = true
                    ORDER BY ticker
                    "#,
                )
                .bind(only)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar::<_, String>(
                    r#"
                    SELECT DISTINCT ticker
                    FROM symbol_info
                    WHERE is_active = true
                      AND market != 'CRYPTO'
                    ORDER BY ticker
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(tickers)
    }
}
