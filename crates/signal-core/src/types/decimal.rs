//! 정밀한 금융 계산을 위한 Decimal 유틸리티.

use rust_decimal::{Decimal, RoundingStrategy};

/// 금융 정밀도를 위한 가격 타입.
pub type Price = Decimal;

/// 거래량 타입.
pub type Quantity = Decimal;

/// 비율 타입 (0.01 = 1%).
pub type Percentage = Decimal;

/// 종합 점수 타입 (-100 ~ +100).
pub type Score = Decimal;

/// 저장 시 가격 소수점 자릿수.
pub const PRICE_DP: u32 = 4;

/// Decimal 연산을 위한 확장 트레이트.
pub trait DecimalExt {
    /// 지정된 소수점 자릿수로 반올림합니다 (0.5는 0에서 먼 쪽으로).
    fn round_half_away(&self, dp: u32) -> Decimal;

    /// `[min, max]` 범위로 제한합니다.
    fn bounded(&self, min: Decimal, max: Decimal) -> Decimal;
}

impl DecimalExt for Decimal {
    fn round_half_away(&self, dp: u32) -> Decimal {
        self.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
    }

    fn bounded(&self, min: Decimal, max: Decimal) -> Decimal {
        if *self < min {
            min
        } else if *self > max {
            max
        } else {
            *self
        }
    }
}
