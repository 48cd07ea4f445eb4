//! 지표 프레임.
//!
//! 가격 바 시계열에 이동평균, OBV, OBV 이동평균, CMF를 한 번에 계산해 붙입니다.
//! 각 열은 전체 시계열에 대해 한 번씩 계산되며(O(n × period)), 행 단위 값은
//! 해당 시점까지의 바에만 의존합니다.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use signal_core::{IndicatorSettings, PriceBar};

use super::{
    CmfIndicator, CmfParams, IndicatorResult, ObvIndicator, ObvParams, SmaParams, TrendIndicators,
};

/// 지표가 붙은 단일 바.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    /// 원본 가격 바
    pub bar: PriceBar,
    /// 종가 단기 이동평균 (MA5)
    pub ma_short: Option<Decimal>,
    /// 종가 장기 이동평균 (MA10)
    pub ma_long: Option<Decimal>,
    /// 누적 OBV
    pub obv: Decimal,
    /// OBV 단기 이동평균 (OBV_MA5)
    pub obv_ma_short: Option<Decimal>,
    /// OBV 장기 이동평균 (OBV_MA10)
    pub obv_ma_long: Option<Decimal>,
    /// CMF
    pub cmf: Option<Decimal>,
}

impl IndicatorRow {
    /// 이 행의 거래일.
    pub fn trading_date(&self) -> NaiveDate {
        self.bar.trading_date()
    }

    /// 종가.
    pub fn close(&self) -> Decimal {
        self.bar.close
    }

    /// 결측이 아닌 종가. 결측 바이면 None.
    pub fn valid_close(&self) -> Option<Decimal> {
        self.bar.is_valid().then_some(self.bar.close)
    }
}

/// 지표 프레임 (시간 오름차순).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorFrame {
    rows: Vec<IndicatorRow>,
}

impl IndicatorFrame {
    /// 정렬/필터링된 바 시계열로부터 지표 프레임을 계산합니다.
    pub fn compute(bars: &[PriceBar], settings: &IndicatorSettings) -> IndicatorResult<Self> {
        let trend = TrendIndicators::new();
        let obv_indicator = ObvIndicator::new();
        let cmf_indicator = CmfIndicator::new();

        let close: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
        let high: Vec<Decimal> = bars.iter().map(|b| b.high).collect();
        let low: Vec<Decimal> = bars.iter().map(|b| b.low).collect();
        let volume: Vec<Decimal> = bars.iter().map(|b| b.volume).collect();

        let short = SmaParams {
            period: settings.ma_short,
        };
        let long = SmaParams {
            period: settings.ma_long,
        };

        // 결측 바가 낀 윈도우의 이동평균은 미정의
        let present_close: Vec<Option<Decimal>> =
            bars.iter().map(|b| b.is_valid().then_some(b.close)).collect();
        let ma_short = trend.sma_with_gaps(&present_close, short)?;
        let ma_long = trend.sma_with_gaps(&present_close, long)?;

        let obv: Vec<Decimal> = obv_indicator
            .calculate(&close, &volume, ObvParams::default())?
            .into_iter()
            .map(|r| r.obv)
            .collect();
        let obv_ma_short = trend.sma(&obv, short)?;
        let obv_ma_long = trend.sma(&obv, long)?;

        let cmf = cmf_indicator.calculate(
            &high,
            &low,
            &close,
            &volume,
            CmfParams {
                period: settings.cmf_period,
            },
        )?;

        let rows = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| IndicatorRow {
                bar: bar.clone(),
                ma_short: ma_short[i],
                ma_long: ma_long[i],
                obv: obv[i],
                obv_ma_short: obv_ma_short[i],
                obv_ma_long: obv_ma_long[i],
                cmf: cmf[i],
            })
            .collect();

        Ok(Self { rows })
    }

    /// 모든 행.
    pub fn rows(&self) -> &[IndicatorRow] {
        &self.rows
    }

    /// 마지막 행.
    pub fn latest(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }

    /// 행 수.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 비어있는지 여부.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 거래일 목록.
    pub fn trading_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.iter().map(IndicatorRow::trading_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn rising_bars(n: usize) -> Vec<PriceBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = dec!(100) + Decimal::from(i);
                PriceBar::new(
                    start + Duration::days(i as i64),
                    close - dec!(0.5),
                    close + dec!(1),
                    close - dec!(1),
                    close,
                    dec!(1000),
                )
            })
            .collect()
    }

    #[test]
    fn test_frame_columns_align() {
        let bars = rising_bars(25);
        let frame = IndicatorFrame::compute(&bars, &IndicatorSettings::default()).unwrap();

        assert_eq!(frame.len(), 25);
        let rows = frame.rows();
        assert!(rows[3].ma_short.is_none());
        assert!(rows[4].ma_short.is_some());
        assert!(rows[8].ma_long.is_none());
        assert!(rows[9].ma_long.is_some());
        assert!(rows[19].cmf.is_none());
        assert!(rows[20].cmf.is_some());
        assert_eq!(rows[0].obv, dec!(0));
        assert_eq!(rows[24].obv, dec!(24000));
    }

    #[test]
    fn test_obv_moving_averages() {
        let bars = rising_bars(25);
        let frame = IndicatorFrame::compute(&bars, &IndicatorSettings::default()).unwrap();
        let rows = frame.rows();

        // OBV[i] = 1000 × i
        assert!(rows[3].obv_ma_short.is_none());
        // (0 + 1000 + 2000 + 3000 + 4000) / 5
        assert_eq!(rows[4].obv_ma_short, Some(dec!(2000)));
        // (20000 + ... + 24000) / 5
        assert_eq!(rows[24].obv_ma_short, Some(dec!(22000)));
        assert!(rows[8].obv_ma_long.is_none());
        // (15000 + ... + 24000) / 10
        assert_eq!(rows[24].obv_ma_long, Some(dec!(19500)));
    }

    #[test]
    fn test_missing_close_masks_price_averages() {
        let mut bars = rising_bars(12);
        bars[11].close = dec!(0);
        let frame = IndicatorFrame::compute(&bars, &IndicatorSettings::default()).unwrap();
        let rows = frame.rows();

        assert_eq!(rows[10].ma_short, Some(dec!(108)));
        assert!(rows[11].ma_short.is_none());
        assert!(rows[11].ma_long.is_none());
        assert!(rows[11].valid_close().is_none());
        // OBV는 직전 값 유지
        assert_eq!(rows[11].obv, rows[10].obv);
    }

    #[test]
    fn test_frame_short_series_all_undefined() {
        let bars = rising_bars(4);
        let frame = IndicatorFrame::compute(&bars, &IndicatorSettings::default()).unwrap();

        for row in frame.rows() {
            assert!(row.ma_short.is_none());
            assert!(row.ma_long.is_none());
            assert!(row.obv_ma_short.is_none());
            assert!(row.obv_ma_long.is_none());
            assert!(row.cmf.is_none());
        }
    }

    #[test]
    fn test_empty_frame() {
        let frame = IndicatorFrame::compute(&[], &IndicatorSettings::default()).unwrap();
        assert!(frame.is_empty());
        assert!(frame.latest().is_none());
    }
}
