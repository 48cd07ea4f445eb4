//! 종목 스코어링 엔진.
//!
//! 지표 프레임의 마지막 행에서 가중 규칙을 평가하여 종합 점수(-100 ~ +100)와
//! 추천 액션을 산출합니다.
//!
//! # 규칙 (발동 시 ±가중치)
//!
//! | 규칙 | 원시 값 | + 조건 | - 조건 |
//! |------|---------|--------|--------|
//! | `price_vs_ma_short` | close - MA5 | > 0 | < 0 |
//! | `price_vs_ma_long` | close - MA10 | > 0 | < 0 |
//! | `ma_crossover` | MA5 - MA10 | > 0 | < 0 |
//! | `obv_trend` | OBV - OBV_MA5 | > 0 | < 0 |
//! | `obv_ma_crossover` | OBV_MA5 - OBV_MA10 | > 0 | < 0 |
//! | `cmf_pressure` | CMF | ≥ cmf.buy | ≤ cmf.sell |
//!
//! 지표가 미정의(None)이거나 마지막 종가가 결측(0 이하)인 규칙은 발동하지 않습니다.
//! 합계가 [-100, 100]을 벗어나면 `score_clamp` 컴포넌트가 보정분을 가지므로
//! 컴포넌트 기여도 합계는 항상 `total_score`와 같습니다.
//!
//! 엔진은 시계를 읽지 않습니다. 계산일은 호출자가 넘겨줍니다.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use signal_core::{
    filter_trading_bars, DecimalExt, PriceBar, RecommendedAction, ScoreComponent, ScoreComponents,
    ScoringConfig, StockScoreSnapshot, TradingCalendar, PRICE_DP,
};
use thiserror::Error;

use crate::indicators::{IndicatorError, IndicatorFrame, IndicatorRow};

/// 규칙 이름.
pub mod rule {
    /// 종가 vs 단기 이동평균
    pub const PRICE_VS_MA_SHORT: &str = "price_vs_ma_short";
    /// 종가 vs 장기 이동평균
    pub const PRICE_VS_MA_LONG: &str = "price_vs_ma_long";
    /// 단기/장기 이동평균 교차
    pub const MA_CROSSOVER: &str = "ma_crossover";
    /// OBV vs OBV 단기 이동평균
    pub const OBV_TREND: &str = "obv_trend";
    /// OBV 이동평균 교차
    pub const OBV_MA_CROSSOVER: &str = "obv_ma_crossover";
    /// CMF 매수/매도 압력
    pub const CMF_PRESSURE: &str = "cmf_pressure";
    /// 점수 범위 보정
    pub const SCORE_CLAMP: &str = "score_clamp";
}

/// 점수 상한.
pub const MAX_SCORE: Decimal = dec!(100);

/// 저장용 지표 소수점 자릿수 (CMF).
const INDICATOR_DP: u32 = 6;

/// 스코어링 오류.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// 유효 바 부족
    #[error("데이터 부족: 필요 {required}개, 제공 {provided}개")]
    InsufficientData { required: usize, provided: usize },

    /// 지표 계산 오류
    #[error("지표 계산 실패: {0}")]
    Indicator(#[from] IndicatorError),

    /// 설정 오류
    #[error("설정 오류: {0}")]
    Config(String),
}

/// 스코어링 결과 타입.
pub type ScoringResult<T> = Result<T, ScoringError>;

/// 종목 스코어러.
///
/// 한 번의 배치 실행 동안 모든 종목에 같은 설정으로 공유됩니다.
#[derive(Debug, Clone)]
pub struct StockScorer {
    config: ScoringConfig,
    calendar: TradingCalendar,
}

impl StockScorer {
    /// 검증된 설정으로 스코어러를 생성합니다.
    pub fn new(config: ScoringConfig) -> ScoringResult<Self> {
        config
            .validate()
            .map_err(|e| ScoringError::Config(e.to_string()))?;
        let calendar = config.calendar.to_calendar();

        Ok(Self { config, calendar })
    }

    /// 사용 중인 설정.
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// 원시 가격 바에서 스냅샷을 계산합니다.
    ///
    /// 거래량이 0 이하인 바는 제외하고, 시간순 정렬 및 중복 제거 후 지표를 계산합니다.
    pub fn score_bars(
        &self,
        ticker: &str,
        bars: &[PriceBar],
        calculation_date: NaiveDate,
    ) -> ScoringResult<StockScoreSnapshot> {
        let bars = filter_trading_bars(bars.to_vec());
        let frame = IndicatorFrame::compute(&bars, &self.config.indicators)?;
        self.score_frame(ticker, &frame, calculation_date)
    }

    /// 지표 프레임에서 스냅샷을 계산합니다.
    pub fn score_frame(
        &self,
        ticker: &str,
        frame: &IndicatorFrame,
        calculation_date: NaiveDate,
    ) -> ScoringResult<StockScoreSnapshot> {
        let latest = frame.latest().ok_or(ScoringError::InsufficientData {
            required: 1,
            provided: 0,
        })?;

        let mut components = self.evaluate_rules(latest);
        let raw_total: Decimal = components.values().map(|c| c.weighted_contribution).sum();
        let total_score = raw_total.bounded(-MAX_SCORE, MAX_SCORE);

        if total_score != raw_total {
            components.insert(
                rule::SCORE_CLAMP.to_string(),
                ScoreComponent {
                    raw_value: Some(raw_total),
                    weight: Decimal::ZERO,
                    weighted_contribution: total_score - raw_total,
                    triggered: true,
                    reason: Some(format!("점수 범위 보정 ({} → {})", raw_total, total_score)),
                },
            );
        }

        let action = self.classify(total_score);
        let last_close = latest.close();
        let signal_date = latest.trading_date();
        let execution_date = self
            .calendar
            .resolve_for_series(frame.trading_dates())
            .next_trading_day(signal_date);

        let (stop_loss_price, take_profit_price, suggested_position_pct) = if action.is_buy() {
            let risk = &self.config.risk;
            let position = (risk.max_position_pct * total_score.abs() / MAX_SCORE)
                .round_half_away(4)
                .bounded(Decimal::ZERO, Decimal::ONE);
            (
                Some((last_close * (Decimal::ONE - risk.stop_loss_pct)).round_half_away(PRICE_DP)),
                Some((last_close * (Decimal::ONE + risk.take_profit_pct)).round_half_away(PRICE_DP)),
                Some(position),
            )
        } else {
            (None, None, None)
        };

        let detail = self.describe(action, total_score, &components, frame.len());

        tracing::debug!(
            ticker = %ticker,
            total_score = %total_score,
            action = %action,
            bars = frame.len(),
            "종목 점수 계산 완료"
        );

        Ok(StockScoreSnapshot {
            calculation_date,
            ticker: ticker.to_string(),
            total_score,
            recommended_action: action,
            recommended_action_detail: detail,
            last_close,
            last_trading_date: signal_date,
            cmf: latest.cmf.map(|v| v.round_half_away(INDICATOR_DP)),
            obv: Some(latest.obv),
            ma5: latest.ma_short.map(|v| v.round_half_away(PRICE_DP)),
            ma10: latest.ma_long.map(|v| v.round_half_away(PRICE_DP)),
            score_components: components,
            signal_date: Some(signal_date),
            execution_date: Some(execution_date),
            suggested_position_pct,
            stop_loss_price,
            take_profit_price,
        })
    }

    /// 종합 점수 → 추천 액션.
    pub fn classify(&self, score: Decimal) -> RecommendedAction {
        let t = &self.config.thresholds;
        if score >= t.strong_buy {
            RecommendedAction::StrongBuy
        } else if score >= t.buy {
            RecommendedAction::Buy
        } else if score <= t.strong_sell {
            RecommendedAction::StrongSell
        } else if score <= t.sell {
            RecommendedAction::Sell
        } else {
            RecommendedAction::Hold
        }
    }

    fn evaluate_rules(&self, row: &IndicatorRow) -> ScoreComponents {
        let w = &self.config.weights;
        let short = self.config.indicators.ma_short;
        let long = self.config.indicators.ma_long;
        // 결측 종가이면 가격 규칙은 모두 미발동
        let close = row.valid_close();

        let mut components = ScoreComponents::new();

        components.insert(
            rule::PRICE_VS_MA_SHORT.to_string(),
            directional(
                diff(close, row.ma_short),
                w.price_vs_ma_short,
                format!("종가가 {}일 이동평균 위", short),
                format!("종가가 {}일 이동평균 아래", short),
            ),
        );
        components.insert(
            rule::PRICE_VS_MA_LONG.to_string(),
            directional(
                diff(close, row.ma_long),
                w.price_vs_ma_long,
                format!("종가가 {}일 이동평균 위", long),
                format!("종가가 {}일 이동평균 아래", long),
            ),
        );
        components.insert(
            rule::MA_CROSSOVER.to_string(),
            directional(
                diff(row.ma_short, row.ma_long),
                w.ma_crossover,
                format!("{}일선이 {}일선 위 (정배열)", short, long),
                format!("{}일선이 {}일선 아래 (역배열)", short, long),
            ),
        );
        components.insert(
            rule::OBV_TREND.to_string(),
            directional(
                row.obv_ma_short.map(|ma| row.obv - ma),
                w.obv_trend,
                format!("OBV가 {}일 평균 위 (매집)", short),
                format!("OBV가 {}일 평균 아래 (분산)", short),
            ),
        );
        components.insert(
            rule::OBV_MA_CROSSOVER.to_string(),
            directional(
                diff(row.obv_ma_short, row.obv_ma_long),
                w.obv_ma_crossover,
                format!("OBV {}일 평균이 {}일 평균 위", short, long),
                format!("OBV {}일 평균이 {}일 평균 아래", short, long),
            ),
        );
        components.insert(rule::CMF_PRESSURE.to_string(), self.cmf_pressure(row.cmf));

        components
    }

    fn cmf_pressure(&self, cmf: Option<Decimal>) -> ScoreComponent {
        let weight = self.config.weights.cmf_pressure;
        let thresholds = &self.config.cmf;

        match cmf {
            Some(v) if v >= thresholds.buy => ScoreComponent {
                raw_value: Some(v),
                weight,
                weighted_contribution: weight,
                triggered: true,
                reason: Some(format!("CMF 매수 압력 ({} ≥ {})", v.round_half_away(4), thresholds.buy)),
            },
            Some(v) if v <= thresholds.sell => ScoreComponent {
                raw_value: Some(v),
                weight,
                weighted_contribution: -weight,
                triggered: true,
                reason: Some(format!("CMF 매도 압력 ({} ≤ {})", v.round_half_away(4), thresholds.sell)),
            },
            other => ScoreComponent::idle(other, weight),
        }
    }

    fn describe(
        &self,
        action: RecommendedAction,
        total_score: Decimal,
        components: &ScoreComponents,
        bar_count: usize,
    ) -> String {
        let reasons: Vec<&str> = components
            .values()
            .filter(|c| c.triggered)
            .filter_map(|c| c.reason.as_deref())
            .collect();

        let mut detail = format!("{} (점수 {})", action, total_score.normalize());
        if reasons.is_empty() {
            detail.push_str(": 발동한 규칙 없음");
        } else {
            detail.push_str(": ");
            detail.push_str(&reasons.join(", "));
        }

        let required = self.config.indicators.cmf_period;
        if bar_count < required {
            detail.push_str(&format!(" [데이터 부족: {}/{}개 바]", bar_count, required));
        }

        detail
    }
}

fn diff(a: Option<Decimal>, b: Option<Decimal>) -> Option<Decimal> {
    Some(a? - b?)
}

/// 부호 규칙: 원시 값 > 0 이면 +가중치, < 0 이면 -가중치, 0/None 이면 미발동.
fn directional(
    raw_value: Option<Decimal>,
    weight: Decimal,
    up_reason: String,
    down_reason: String,
) -> ScoreComponent {
    match raw_value {
        Some(v) if v > Decimal::ZERO => ScoreComponent {
            raw_value,
            weight,
            weighted_contribution: weight,
            triggered: true,
            reason: Some(up_reason),
        },
        Some(v) if v < Decimal::ZERO => ScoreComponent {
            raw_value,
            weight,
            weighted_contribution: -weight,
            triggered: true,
            reason: Some(down_reason),
        },
        _ => ScoreComponent::idle(raw_value, weight),
    }
}
