//! 종목 점수 스냅샷.
//!
//! (계산일, 티커) 하나당 정확히 하나의 스냅샷이 저장됩니다.
//! 같은 날짜를 다시 계산하면 기존 행을 덮어씁니다.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::{Percentage, Price, Score};

/// 추천 액션.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendedAction {
    /// 강력 매수
    StrongBuy,
    /// 매수
    Buy,
    /// 관망
    Hold,
    /// 매도
    Sell,
    /// 강력 매도
    StrongSell,
}

impl RecommendedAction {
    /// DB 저장용 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG_BUY",
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
            Self::StrongSell => "STRONG_SELL",
        }
    }

    /// 매수 계열 액션인지 확인합니다 (리스크 브래킷 산출 대상).
    pub fn is_buy(&self) -> bool {
        matches!(self, Self::StrongBuy | Self::Buy)
    }

    /// 매도 계열 액션인지 확인합니다.
    pub fn is_sell(&self) -> bool {
        matches!(self, Self::StrongSell | Self::Sell)
    }
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommendedAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STRONG_BUY" => Ok(Self::StrongBuy),
            "BUY" => Ok(Self::Buy),
            "HOLD" => Ok(Self::Hold),
            "SELL" => Ok(Self::Sell),
            "STRONG_SELL" => Ok(Self::StrongSell),
            other => Err(CoreError::InvalidInput(format!(
                "알 수 없는 추천 액션: {}",
                other
            ))),
        }
    }
}

/// 단일 규칙의 점수 기여도.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    /// 규칙 평가에 사용된 원시 값 (지표 미정의 시 None)
    pub raw_value: Option<Decimal>,
    /// 설정된 가중치 (절대값)
    pub weight: Decimal,
    /// 부호가 반영된 실제 기여 점수 (미발동 시 0)
    pub weighted_contribution: Decimal,
    /// 규칙 발동 여부
    pub triggered: bool,
    /// 발동 사유
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ScoreComponent {
    /// 발동하지 않은 컴포넌트.
    pub fn idle(raw_value: Option<Decimal>, weight: Decimal) -> Self {
        Self {
            raw_value,
            weight,
            weighted_contribution: Decimal::ZERO,
            triggered: false,
            reason: None,
        }
    }
}

/// 규칙 이름 → 기여도 매핑 (이름순 정렬로 직렬화 결과가 항상 같음).
pub type ScoreComponents = BTreeMap<String, ScoreComponent>;

/// (계산일, 티커) 단위 종목 점수 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockScoreSnapshot {
    /// 계산일 (배치 실행 기준일)
    pub calculation_date: NaiveDate,
    /// 티커
    pub ticker: String,
    /// 종합 점수 (-100 ~ +100)
    pub total_score: Score,
    /// 추천 액션
    pub recommended_action: RecommendedAction,
    /// 추천 상세 설명
    pub recommended_action_detail: String,
    /// 마지막 종가
    pub last_close: Price,
    /// 마지막 거래일
    pub last_trading_date: NaiveDate,
    /// 최신 CMF
    pub cmf: Option<Decimal>,
    /// 최신 OBV
    pub obv: Option<Decimal>,
    /// 최신 단기 이동평균
    pub ma5: Option<Price>,
    /// 최신 장기 이동평균
    pub ma10: Option<Price>,
    /// 규칙별 기여도
    pub score_components: ScoreComponents,
    /// 신호 발생일 (= 마지막 거래일)
    pub signal_date: Option<NaiveDate>,
    /// 실행 예정일 (신호 발생일 다음 거래일)
    pub execution_date: Option<NaiveDate>,
    /// 권장 비중 (0 ~ 1)
    pub suggested_position_pct: Option<Percentage>,
    /// 손절가
    pub stop_loss_price: Option<Price>,
    /// 익절가
    pub take_profit_price: Option<Price>,
}

impl StockScoreSnapshot {
    /// 컴포넌트 기여도 합계.
    ///
    /// 항상 `total_score`와 같아야 합니다.
    pub fn components_total(&self) -> Decimal {
        self.score_components
            .values()
            .map(|c| c.weighted_contribution)
            .sum()
    }

    /// 발동한 규칙 이름 목록.
    pub fn triggered_rules(&self) -> Vec<&str> {
        self.score_components
            .iter()
            .filter(|(_, c)| c.triggered)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_action_round_trip() {
        for action in [
            RecommendedAction::StrongBuy,
            RecommendedAction::Buy,
            RecommendedAction::Hold,
            RecommendedAction::Sell,
            RecommendedAction::StrongSell,
        ] {
            assert_eq!(action.as_str().parse::<RecommendedAction>().unwrap(), action);
        }
        assert!("WATCH".parse::<RecommendedAction>().is_err());
    }

    #[test]
    fn test_action_serde_format() {
        let json = serde_json::to_string(&RecommendedAction::StrongSell).unwrap();
        assert_eq!(json, "\"STRONG_SELL\"");
    }

    #[test]
    fn test_components_total() {
        let mut components = ScoreComponents::new();
        components.insert(
            "ma_crossover".to_string(),
            ScoreComponent {
                raw_value: Some(dec!(1.5)),
                weight: dec!(20),
                weighted_contribution: dec!(20),
                triggered: true,
                reason: Some("MA5 > MA10".to_string()),
            },
        );
        components.insert(
            "cmf_pressure".to_string(),
            ScoreComponent::idle(None, dec!(25)),
        );

        let snapshot = StockScoreSnapshot {
            calculation_date: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            ticker: "005930".to_string(),
            total_score: dec!(20),
            recommended_action: RecommendedAction::Hold,
            recommended_action_detail: String::new(),
            last_close: dec!(100),
            last_trading_date: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            cmf: None,
            obv: None,
            ma5: None,
            ma10: None,
            score_components: components,
            signal_date: None,
            execution_date: None,
            suggested_position_pct: None,
            stop_loss_price: None,
            take_profit_price: None,
        };

        assert_eq!(snapshot.components_total(), snapshot.total_score);
        assert_eq!(snapshot.triggered_rules(), vec!["ma_crossover"]);
    }
}
