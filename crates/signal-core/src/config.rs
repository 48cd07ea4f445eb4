//! 스코어링 설정.
//!
//! 모든 규칙 가중치와 액션 임계값을 명시적인 필드로 나열합니다.
//! 설정은 로드 시점에 한 번 검증되며, 한 번의 배치 실행 동안 모든 종목에
//! 동일하게 적용됩니다.
//!
//! # 로드 순서
//!
//! 1. 기본값 (`ScoringConfig::default()`)
//! 2. TOML 파일 (선택)
//! 3. `SCORING__` 접두사 환경변수 (예: `SCORING__THRESHOLDS__BUY=30`)

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::calendar::{CalendarPolicy, TradingCalendar};
use crate::error::{CoreError, CoreResult};

/// 스코어링 엔진 설정.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// 지표 기간 설정
    pub indicators: IndicatorSettings,
    /// 규칙별 가중치
    pub weights: RuleWeights,
    /// CMF 매수/매도 압력 임계값
    pub cmf: CmfThresholds,
    /// 종합 점수 → 액션 임계값
    pub thresholds: ActionThresholds,
    /// 손절/익절/비중 설정
    pub risk: RiskSettings,
    /// 실행일 캘린더 설정
    pub calendar: CalendarSettings,
}

/// 지표 기간 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndicatorSettings {
    /// 단기 이동평균 기간 (기본: 5)
    pub ma_short: usize,
    /// 장기 이동평균 기간 (기본: 10)
    pub ma_long: usize,
    /// CMF 기간 (기본: 21)
    pub cmf_period: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            ma_short: 5,
            ma_long: 10,
            cmf_period: 21,
        }
    }
}

/// 규칙별 가중치 (발동 시 부호를 붙여 그대로 더해짐).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuleWeights {
    /// 종가 vs 단기 이동평균
    pub price_vs_ma_short: Decimal,
    /// 종가 vs 장기 이동평균
    pub price_vs_ma_long: Decimal,
    /// 단기 이동평균 vs 장기 이동평균
    pub ma_crossover: Decimal,
    /// OBV vs OBV 단기 이동평균
    pub obv_trend: Decimal,
    /// OBV 단기 이동평균 vs OBV 장기 이동평균
    pub obv_ma_crossover: Decimal,
    /// CMF 매수/매도 압력
    pub cmf_pressure: Decimal,
}

impl Default for RuleWeights {
    fn default() -> Self {
        Self {
            price_vs_ma_short: dec!(15),
            price_vs_ma_long: dec!(15),
            ma_crossover: dec!(20),
            obv_trend: dec!(15),
            obv_ma_crossover: dec!(10),
            cmf_pressure: dec!(25),
        }
    }
}

impl RuleWeights {
    /// 가중치 합계 (모든 규칙이 같은 방향으로 발동했을 때의 최대 절대 점수).
    pub fn total(&self) -> Decimal {
        self.price_vs_ma_short
            + self.price_vs_ma_long
            + self.ma_crossover
            + self.obv_trend
            + self.obv_ma_crossover
            + self.cmf_pressure
    }

    fn entries(&self) -> [(&'static str, Decimal); 6] {
        [
            ("price_vs_ma_short", self.price_vs_ma_short),
            ("price_vs_ma_long", self.price_vs_ma_long),
            ("ma_crossover", self.ma_crossover),
            ("obv_trend", self.obv_trend),
            ("obv_ma_crossover", self.obv_ma_crossover),
            ("cmf_pressure", self.cmf_pressure),
        ]
    }
}

/// CMF 임계값.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CmfThresholds {
    /// 이 값 이상이면 매수 압력 (기본: 0.05)
    pub buy: Decimal,
    /// 이 값 이하이면 매도 압력 (기본: -0.05)
    pub sell: Decimal,
}

impl Default for CmfThresholds {
    fn default() -> Self {
        Self {
            buy: dec!(0.05),
            sell: dec!(-0.05),
        }
    }
}

/// 종합 점수 → 추천 액션 임계값.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ActionThresholds {
    /// 이상이면 STRONG_BUY
    pub strong_buy: Decimal,
    /// 이상이면 BUY
    pub buy: Decimal,
    /// 이하이면 SELL
    pub sell: Decimal,
    /// 이하이면 STRONG_SELL
    pub strong_sell: Decimal,
}

impl Default for ActionThresholds {
    fn default() -> Self {
        Self {
            strong_buy: dec!(60),
            buy: dec!(25),
            sell: dec!(-25),
            strong_sell: dec!(-60),
        }
    }
}

/// 리스크 브래킷 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RiskSettings {
    /// 손절 비율 (기본: 5%)
    pub stop_loss_pct: Decimal,
    /// 익절 비율 (기본: 10%)
    pub take_profit_pct: Decimal,
    /// 점수 100일 때의 권장 비중 (기본: 20%)
    pub max_position_pct: Decimal,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            stop_loss_pct: dec!(0.05),
            take_profit_pct: dec!(0.10),
            max_position_pct: dec!(0.20),
        }
    }
}

/// 실행일 캘린더 설정.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// 정책 (`auto`, `weekdays`, `calendar_day`)
    pub policy: CalendarPolicy,
    /// 휴장일 목록 (YYYY-MM-DD)
    pub holidays: Vec<NaiveDate>,
}

impl CalendarSettings {
    /// 캘린더 객체 생성.
    pub fn to_calendar(&self) -> TradingCalendar {
        TradingCalendar::new(self.policy, self.holidays.iter().copied())
    }
}

impl ScoringConfig {
    /// 파일(선택)과 환경 변수에서 설정을 로드하고 검증합니다.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> CoreResult<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path.as_ref()));
        }

        // 환경 변수로 오버라이드
        builder = builder.add_source(
            ::config::Environment::with_prefix("SCORING")
                .separator("__")
                .try_parsing(true),
        );

        let config: ScoringConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            max_abs_score = %config.weights.total(),
            calendar = ?config.calendar.policy,
            "스코어링 설정 로드 완료"
        );

        Ok(config)
    }

    /// 설정값 검증.
    pub fn validate(&self) -> CoreResult<()> {
        let ind = &self.indicators;
        if ind.ma_short == 0 || ind.ma_long == 0 || ind.cmf_period == 0 {
            return Err(CoreError::Config(
                "지표 기간은 0보다 커야 합니다".to_string(),
            ));
        }
        if ind.ma_short >= ind.ma_long {
            return Err(CoreError::Config(format!(
                "단기 이동평균 기간({})은 장기 기간({})보다 작아야 합니다",
                ind.ma_short, ind.ma_long
            )));
        }

        for (name, weight) in self.weights.entries() {
            if weight < Decimal::ZERO {
                return Err(CoreError::Config(format!(
                    "가중치는 음수일 수 없습니다: {} = {}",
                    name, weight
                )));
            }
        }

        let cmf = &self.cmf;
        if cmf.buy > Decimal::ONE || cmf.sell < -Decimal::ONE || cmf.sell >= cmf.buy {
            return Err(CoreError::Config(format!(
                "CMF 임계값은 -1 ≤ sell < buy ≤ 1 이어야 합니다 (sell={}, buy={})",
                cmf.sell, cmf.buy
            )));
        }

        let t = &self.thresholds;
        let bound = dec!(100);
        let ordered = -bound <= t.strong_sell
            && t.strong_sell < t.sell
            && t.sell < t.buy
            && t.buy < t.strong_buy
            && t.strong_buy <= bound;
        if !ordered {
            return Err(CoreError::Config(format!(
                "액션 임계값은 -100 ≤ strong_sell < sell < buy < strong_buy ≤ 100 이어야 합니다 \
                 (strong_sell={}, sell={}, buy={}, strong_buy={})",
                t.strong_sell, t.sell, t.buy, t.strong_buy
            )));
        }

        let r = &self.risk;
        if r.stop_loss_pct <= Decimal::ZERO || r.stop_loss_pct >= Decimal::ONE {
            return Err(CoreError::Config(format!(
                "손절 비율은 0과 1 사이여야 합니다: {}",
                r.stop_loss_pct
            )));
        }
        if r.take_profit_pct <= Decimal::ZERO {
            return Err(CoreError::Config(format!(
                "익절 비율은 0보다 커야 합니다: {}",
                r.take_profit_pct
            )));
        }
        if r.max_position_pct <= Decimal::ZERO || r.max_position_pct > Decimal::ONE {
            return Err(CoreError::Config(format!(
                "최대 비중은 0 초과 1 이하여야 합니다: {}",
                r.max_position_pct
            )));
        }

        Ok(())
    }
}
