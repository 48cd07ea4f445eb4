//! 거래량 지표 (Volume Indicators).
//!
//! ## OBV (On-Balance Volume)
//! - 종가 상승: OBV += 거래량
//! - 종가 하락: OBV -= 거래량
//! - 종가 동일: OBV 변화 없음
//! - 종가/거래량 결측(0 이하): 직전 OBV 유지
//!
//! ## CMF (Chaikin Money Flow)
//! - MFM = ((close - low) - (high - close)) / (high - low), high == low 이면 0
//! - MFV = MFM × volume
//! - CMF = Σ MFV / Σ volume (기간 내), 거래량 합이 0이면 None
//! - 종가 결측 바는 거래량 0으로 취급 (MFV, 거래량 합 모두에서 빠짐)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ensure_same_len, IndicatorError, IndicatorResult};

/// OBV 파라미터.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ObvParams {
    /// 초기값 (기본: 0).
    pub initial_value: Decimal,
}

/// OBV 결과.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObvResult {
    /// OBV 값.
    pub obv: Decimal,
    /// OBV 변화량 (전일 대비).
    pub change: Decimal,
}

/// OBV 계산기.
#[derive(Debug, Default)]
pub struct ObvIndicator;

impl ObvIndicator {
    /// 새로운 OBV 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// OBV (On-Balance Volume) 계산.
    ///
    /// 0 이하의 종가 또는 거래량은 결측으로 보고 해당 시점의 OBV를 직전 값으로
    /// 유지합니다. 직전 바의 종가가 결측인 경우에도 비교 기준이 없으므로 유지합니다.
    ///
    /// # 반환
    /// 각 시점의 OBV 값과 변화량 (빈 입력이면 빈 벡터)
    pub fn calculate(
        &self,
        close: &[Decimal],
        volume: &[Decimal],
        params: ObvParams,
    ) -> IndicatorResult<Vec<ObvResult>> {
        ensure_same_len(&[close.len(), volume.len()])?;

        let mut result = Vec::with_capacity(close.len());
        let mut current_obv = params.initial_value;

        for i in 0..close.len() {
            let change = if i == 0 || !is_present(close[i - 1]) {
                Decimal::ZERO
            } else if !is_present(close[i]) || !is_present(volume[i]) {
                // 결측: carry-forward
                Decimal::ZERO
            } else if close[i] > close[i - 1] {
                volume[i]
            } else if close[i] < close[i - 1] {
                -volume[i]
            } else {
                Decimal::ZERO
            };

            current_obv = current_obv.checked_add(change).ok_or_else(|| {
                IndicatorError::CalculationError(format!("OBV 오버플로우 (index {})", i))
            })?;

            result.push(ObvResult {
                obv: current_obv,
                change,
            });
        }

        Ok(result)
    }
}

fn is_present(value: Decimal) -> bool {
    value > Decimal::ZERO
}

/// CMF 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CmfParams {
    /// 기간 (기본: 21).
    pub period: usize,
}

impl Default for CmfParams {
    fn default() -> Self {
        Self { period: 21 }
    }
}

/// CMF 계산기.
#[derive(Debug, Default)]
pub struct CmfIndicator;

impl CmfIndicator {
    /// 새로운 CMF 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// Money Flow Multiplier.
    ///
    /// high == low 이면 0. 고가/저가 범위를 벗어난 종가는 [-1, 1]로 제한합니다.
    pub fn money_flow_multiplier(high: Decimal, low: Decimal, close: Decimal) -> Decimal {
        let range = high - low;
        if range.is_zero() {
            return Decimal::ZERO;
        }

        let mfm = ((close - low) - (high - close)) / range;
        mfm.max(-Decimal::ONE).min(Decimal::ONE)
    }

    /// CMF (Chaikin Money Flow) 계산.
    ///
    /// 0 이하의 거래량, 그리고 종가가 0 이하인 바의 거래량은 0으로 취급합니다.
    ///
    /// # 반환
    /// 각 시점의 CMF 값 (i+1 < period 이거나 기간 내 거래량 합이 0이면 None)
    pub fn calculate(
        &self,
        high: &[Decimal],
        low: &[Decimal],
        close: &[Decimal],
        volume: &[Decimal],
        params: CmfParams,
    ) -> IndicatorResult<Vec<Option<Decimal>>> {
        ensure_same_len(&[high.len(), low.len(), close.len(), volume.len()])?;

        let period = params.period;
        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "기간은 0보다 커야 합니다".to_string(),
            ));
        }

        let volumes: Vec<Decimal> = (0..close.len())
            .map(|i| {
                if is_present(close[i]) {
                    volume[i].max(Decimal::ZERO)
                } else {
                    Decimal::ZERO
                }
            })
            .collect();
        let money_flow_volumes: Vec<Decimal> = (0..close.len())
            .map(|i| Self::money_flow_multiplier(high[i], low[i], close[i]) * volumes[i])
            .collect();

        let result = (0..close.len())
            .map(|i| {
                if i + 1 < period {
                    return None;
                }

                let window = i + 1 - period..=i;
                let volume_sum: Decimal = volumes[window.clone()].iter().sum();
                if volume_sum.is_zero() {
                    return None;
                }

                let mfv_sum: Decimal = money_flow_volumes[window].iter().sum();
                Some(mfv_sum / volume_sum)
            })
            .collect();

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_obv_basic() {
        let obv = ObvIndicator::new();
        let close = vec![dec!(10), dec!(11), dec!(10.5), dec!(10.5), dec!(12)];
        let volume = vec![dec!(100), dec!(200), dec!(150), dec!(300), dec!(50)];

        let result = obv.calculate(&close, &volume, ObvParams::default()).unwrap();
        let values: Vec<Decimal> = result.iter().map(|r| r.obv).collect();

        assert_eq!(
            values,
            vec![dec!(0), dec!(200), dec!(50), dec!(50), dec!(100)]
        );
        assert_eq!(result[2].change, dec!(-150));
    }

    #[test]
    fn test_obv_missing_bar_carries_forward() {
        let obv = ObvIndicator::new();
        let close = vec![dec!(10), dec!(11), dec!(0), dec!(12)];
        let volume = vec![dec!(100), dec!(200), dec!(300), dec!(0)];

        let result = obv.calculate(&close, &volume, ObvParams::default()).unwrap();
        let values: Vec<Decimal> = result.iter().map(|r| r.obv).collect();

        // 결측 종가(2), 결측 거래량(3) 모두 직전 값 유지
        assert_eq!(values, vec![dec!(0), dec!(200), dec!(200), dec!(200)]);
    }

    #[test]
    fn test_obv_empty_and_mismatch() {
        let obv = ObvIndicator::new();
        assert!(obv
            .calculate(&[], &[], ObvParams::default())
            .unwrap()
            .is_empty());
        assert!(obv
            .calculate(&[dec!(1)], &[], ObvParams::default())
            .is_err());
    }

    #[test]
    fn test_money_flow_multiplier() {
        // 종가 = 고가 → +1
        assert_eq!(
            CmfIndicator::money_flow_multiplier(dec!(12), dec!(10), dec!(12)),
            dec!(1)
        );
        // 종가 = 저가 → -1
        assert_eq!(
            CmfIndicator::money_flow_multiplier(dec!(12), dec!(10), dec!(10)),
            dec!(-1)
        );
        // 중간
        assert_eq!(
            CmfIndicator::money_flow_multiplier(dec!(12), dec!(10), dec!(11)),
            dec!(0)
        );
        // high == low → 0 (0으로 나누지 않음)
        assert_eq!(
            CmfIndicator::money_flow_multiplier(dec!(10), dec!(10), dec!(10)),
            dec!(0)
        );
    }

    #[test]
    fn test_cmf_window() {
        let cmf = CmfIndicator::new();
        let high = vec![dec!(12), dec!(12), dec!(12)];
        let low = vec![dec!(10), dec!(10), dec!(10)];
        let close = vec![dec!(12), dec!(10), dec!(12)];
        let volume = vec![dec!(100), dec!(100), dec!(200)];

        let result = cmf
            .calculate(&high, &low, &close, &volume, CmfParams { period: 2 })
            .unwrap();

        assert_eq!(result[0], None);
        // (100 - 100) / 200 = 0
        assert_eq!(result[1], Some(dec!(0)));
        // (-100 + 200) / 300
        assert_eq!(result[2], Some(dec!(100) / dec!(300)));
    }

    #[test]
    fn test_cmf_zero_volume_window_is_undefined() {
        let cmf = CmfIndicator::new();
        let high = vec![dec!(12); 3];
        let low = vec![dec!(10); 3];
        let close = vec![dec!(11); 3];
        let volume = vec![dec!(0); 3];

        let result = cmf
            .calculate(&high, &low, &close, &volume, CmfParams { period: 2 })
            .unwrap();
        assert!(result.iter().all(Option::is_none));
    }

    #[test]
    fn test_cmf_missing_close_is_excluded() {
        let cmf = CmfIndicator::new();
        let high = vec![dec!(12); 3];
        let low = vec![dec!(10); 3];
        let close = vec![dec!(12), dec!(12), dec!(0)];
        let volume = vec![dec!(100), dec!(100), dec!(500)];

        let result = cmf
            .calculate(&high, &low, &close, &volume, CmfParams { period: 2 })
            .unwrap();

        // index 2는 종가 결측 → 거래량 0 취급, 윈도우 [1, 2]는 index 1만 남음
        assert_eq!(result[2], Some(dec!(1)));
    }

    #[test]
    fn test_cmf_insufficient_data() {
        let cmf = CmfIndicator::new();
        let values = vec![dec!(10); 5];
        let result = cmf
            .calculate(&values, &values, &values, &values, CmfParams::default())
            .unwrap();
        assert_eq!(result.len(), 5);
        assert!(result.iter().all(Option::is_none));
    }
}
