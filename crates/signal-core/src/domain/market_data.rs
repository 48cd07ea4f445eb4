//! 시장 데이터 타입.
//!
//! - `PriceBar` - 일봉 OHLCV 데이터
//! - `filter_trading_bars` - 지표 계산 전 유효 거래일 필터링

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Price, Quantity};

/// OHLCV 가격 바 (일봉 1개).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// 바 시작 시각
    pub timestamp: DateTime<Utc>,
    /// 시가
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가
    pub close: Price,
    /// 거래량
    pub volume: Quantity,
}

impl PriceBar {
    /// 새 가격 바를 생성합니다.
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 바의 거래일 (UTC 기준).
    pub fn trading_date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// 지표 계산에 쓸 수 있는 바인지 확인합니다 (종가 > 0, 거래량 > 0).
    ///
    /// 휴장일/거래정지 행은 거래량이 0으로, 결측 종가는 0 이하로 들어옵니다.
    pub fn is_valid(&self) -> bool {
        self.close > Decimal::ZERO && self.volume > Decimal::ZERO
    }
}

/// 지표 계산용 유효 거래 바만 남깁니다.
///
/// - 종가 또는 거래량이 0 이하인 바 제거
/// - 시간 오름차순 정렬
/// - 같은 타임스탬프가 중복되면 첫 번째만 유지
pub fn filter_trading_bars(bars: Vec<PriceBar>) -> Vec<PriceBar> {
    let mut filtered: Vec<PriceBar> = bars.into_iter().filter(PriceBar::is_valid).collect();
    filtered.sort_by_key(|b| b.timestamp);
    filtered.dedup_by_key(|b| b.timestamp);
    filtered
}
