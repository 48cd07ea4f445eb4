//! 추세 지표 (Trend Indicators).
//!
//! - SMA (Simple Moving Average)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{IndicatorError, IndicatorResult};

/// SMA 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SmaParams {
    /// 이동평균 기간.
    pub period: usize,
}

impl Default for SmaParams {
    fn default() -> Self {
        Self { period: 5 }
    }
}

/// 추세 지표 계산기.
#[derive(Debug, Default)]
pub struct TrendIndicators;

impl TrendIndicators {
    /// 새로운 추세 지표 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// 단순 이동평균 (SMA) 계산.
    ///
    /// SMA[i] = (P[i-period+1] + ... + P[i]) / period
    ///
    /// # 인자
    /// * `values` - 가격(또는 OBV 등) 데이터, 시간 오름차순
    /// * `params` - SMA 파라미터
    ///
    /// # 반환
    /// 각 시점의 SMA 값 (i+1 < period 인 시점은 None).
    /// 데이터가 기간보다 짧으면 전부 None입니다.
    pub fn sma(
        &self,
        values: &[Decimal],
        params: SmaParams,
    ) -> IndicatorResult<Vec<Option<Decimal>>> {
        let values: Vec<Option<Decimal>> = values.iter().copied().map(Some).collect();
        self.sma_with_gaps(&values, params)
    }

    /// 결측 값(None)이 섞인 시계열의 SMA.
    ///
    /// 윈도우 안에 결측이 하나라도 있으면 그 시점의 SMA는 None입니다.
    pub fn sma_with_gaps(
        &self,
        values: &[Option<Decimal>],
        params: SmaParams,
    ) -> IndicatorResult<Vec<Option<Decimal>>> {
        let period = params.period;

        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "기간은 0보다 커야 합니다".to_string(),
            ));
        }

        let period_decimal = Decimal::from(period);

        let result = (0..values.len())
            .map(|i| {
                if i + 1 < period {
                    return None;
                }
                values[i + 1 - period..=i]
                    .iter()
                    .try_fold(Decimal::ZERO, |sum, v| v.map(|v| sum + v))
                    .map(|sum| sum / period_decimal)
            })
            .collect();

        Ok(result)
    }
}
