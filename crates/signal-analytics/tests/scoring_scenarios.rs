//! 지표/스코어링 시나리오 테스트.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use signal_analytics::{
    rule, CmfIndicator, CmfParams, IndicatorFrame, ObvIndicator, ObvParams, StockScorer,
};
use signal_core::{IndicatorSettings, PriceBar, RecommendedAction, ScoringConfig};

fn calc_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn daily_bars(ohlcv: &[(Decimal, Decimal, Decimal, Decimal)]) -> Vec<PriceBar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    ohlcv
        .iter()
        .enumerate()
        .map(|(i, (high, low, close, volume))| {
            PriceBar::new(
                start + Duration::days(i as i64),
                *close,
                *high,
                *low,
                *close,
                *volume,
            )
        })
        .collect()
}

/// 종가가 하루 1씩 오르고 거래량이 1000으로 일정한 30개 바.
fn monotonic_series() -> Vec<PriceBar> {
    let rows: Vec<_> = (0..30)
        .map(|i| {
            let close = dec!(50) + Decimal::from(i);
            (close + dec!(0.5), close - dec!(1), close, dec!(1000))
        })
        .collect();
    daily_bars(&rows)
}

#[test]
fn monotonic_series_indicators_and_action() {
    let bars = monotonic_series();
    let frame = IndicatorFrame::compute(&bars, &IndicatorSettings::default()).unwrap();
    let rows = frame.rows();

    assert_eq!(rows[0].obv, dec!(0));
    for i in 1..rows.len() {
        assert_eq!(rows[i].obv - rows[i - 1].obv, dec!(1000));
    }

    let expected_ma5: Decimal =
        bars[25..30].iter().map(|b| b.close).sum::<Decimal>() / Decimal::from(5);
    assert_eq!(rows[29].ma_short, Some(expected_ma5));
    assert_eq!(expected_ma5, dec!(77));

    let scorer = StockScorer::new(ScoringConfig::default()).unwrap();
    let snapshot = scorer.score_bars("MONO", &bars, calc_date()).unwrap();

    assert!(!snapshot.recommended_action.is_sell());
    assert!(snapshot.total_score > Decimal::ZERO);
    assert_eq!(snapshot.ma5, Some(dec!(77)));
    assert_eq!(snapshot.obv, Some(dec!(29000)));
    assert_eq!(snapshot.components_total(), snapshot.total_score);

    // 종가가 고가 쪽에 붙어 있으므로 CMF는 양수 (MFM = 0.5/1.5)
    let cmf = snapshot.cmf.unwrap();
    assert!(cmf > dec!(0.05));
    assert!(snapshot.score_components[rule::CMF_PRESSURE].triggered);
    assert_eq!(snapshot.recommended_action, RecommendedAction::StrongBuy);
}

#[test]
fn scoring_is_deterministic() {
    let bars = monotonic_series();
    let scorer = StockScorer::new(ScoringConfig::default()).unwrap();

    let first = scorer.score_bars("DET", &bars, calc_date()).unwrap();
    let second = scorer.score_bars("DET", &bars, calc_date()).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn unordered_input_scores_like_sorted_input() {
    let bars = monotonic_series();
    let mut shuffled = bars.clone();
    shuffled.reverse();

    let scorer = StockScorer::new(ScoringConfig::default()).unwrap();
    let a = scorer.score_bars("ORD", &bars, calc_date()).unwrap();
    let b = scorer.score_bars("ORD", &shuffled, calc_date()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn fewer_than_five_bars_yields_hold() {
    let bars: Vec<PriceBar> = monotonic_series().into_iter().take(4).collect();
    let frame = IndicatorFrame::compute(&bars, &IndicatorSettings::default()).unwrap();
    for row in frame.rows() {
        assert!(row.ma_short.is_none());
        assert!(row.ma_long.is_none());
        assert!(row.obv_ma_short.is_none());
        assert!(row.obv_ma_long.is_none());
        assert!(row.cmf.is_none());
    }

    let scorer = StockScorer::new(ScoringConfig::default()).unwrap();
    let snapshot = scorer.score_bars("SHORT", &bars, calc_date()).unwrap();

    assert_eq!(snapshot.total_score, Decimal::ZERO);
    assert_eq!(snapshot.recommended_action, RecommendedAction::Hold);
    assert!(snapshot.triggered_rules().is_empty());
    assert!(snapshot.stop_loss_price.is_none());
    assert!(snapshot.execution_date.is_some());
}

#[test]
fn flat_bars_do_not_divide_by_zero() {
    let rows: Vec<_> = (0..25)
        .map(|_| (dec!(10), dec!(10), dec!(10), dec!(500)))
        .collect();
    let bars = daily_bars(&rows);

    let frame = IndicatorFrame::compute(&bars, &IndicatorSettings::default()).unwrap();
    assert_eq!(frame.latest().unwrap().cmf, Some(Decimal::ZERO));

    let scorer = StockScorer::new(ScoringConfig::default()).unwrap();
    let snapshot = scorer.score_bars("FLAT", &bars, calc_date()).unwrap();
    assert_eq!(snapshot.recommended_action, RecommendedAction::Hold);
}

#[test]
fn weekend_series_executes_next_calendar_day() {
    // 2024-01-01부터 매일(주말 포함) 바가 있음 → 달력일 기준
    let bars = monotonic_series();
    let scorer = StockScorer::new(ScoringConfig::default()).unwrap();
    let snapshot = scorer.score_bars("CRYPTO", &bars, calc_date()).unwrap();

    // 마지막 바: 2024-01-30(화)
    assert_eq!(snapshot.signal_date, NaiveDate::from_ymd_opt(2024, 1, 30));
    assert_eq!(snapshot.execution_date, NaiveDate::from_ymd_opt(2024, 1, 31));
}

fn bar_strategy() -> impl Strategy<Value = (Decimal, Decimal, Decimal, Decimal)> {
    (1u32..10_000, 0u32..500, 0u32..=100, 0u32..100_000).prop_map(|(low, spread, pos, volume)| {
        let low = Decimal::from(low);
        let high = low + Decimal::from(spread);
        let close = low + (high - low) * Decimal::from(pos) / dec!(100);
        (high, low, close, Decimal::from(volume))
    })
}

proptest! {
    #[test]
    fn obv_change_matches_close_direction(rows in prop::collection::vec(bar_strategy(), 1..60)) {
        let close: Vec<Decimal> = rows.iter().map(|r| r.2).collect();
        let volume: Vec<Decimal> = rows.iter().map(|r| r.3).collect();
        let obv = ObvIndicator::new().calculate(&close, &volume, ObvParams::default()).unwrap();

        prop_assert_eq!(obv[0].obv, Decimal::ZERO);
        for i in 1..obv.len() {
            let delta = obv[i].obv - obv[i - 1].obv;
            let expected = if volume[i] <= Decimal::ZERO {
                Decimal::ZERO
            } else if close[i] > close[i - 1] {
                volume[i]
            } else if close[i] < close[i - 1] {
                -volume[i]
            } else {
                Decimal::ZERO
            };
            prop_assert_eq!(delta, expected);
        }
    }

    #[test]
    fn cmf_stays_within_unit_range(
        rows in prop::collection::vec(bar_strategy(), 1..60),
        period in 1usize..30,
    ) {
        let high: Vec<Decimal> = rows.iter().map(|r| r.0).collect();
        let low: Vec<Decimal> = rows.iter().map(|r| r.1).collect();
        let close: Vec<Decimal> = rows.iter().map(|r| r.2).collect();
        let volume: Vec<Decimal> = rows.iter().map(|r| r.3).collect();

        let cmf = CmfIndicator::new()
            .calculate(&high, &low, &close, &volume, CmfParams { period })
            .unwrap();

        prop_assert_eq!(cmf.len(), rows.len());
        for (i, value) in cmf.iter().enumerate() {
            if i + 1 < period {
                prop_assert!(value.is_none());
            }
            if let Some(v) = value {
                prop_assert!(*v >= -Decimal::ONE && *v <= Decimal::ONE);
            }
        }
    }

    #[test]
    fn total_score_is_clamped(
        rows in prop::collection::vec(bar_strategy(), 1..40),
        weights in prop::collection::vec(0u32..60, 6),
    ) {
        let mut config = ScoringConfig::default();
        config.weights.price_vs_ma_short = Decimal::from(weights[0]);
        config.weights.price_vs_ma_long = Decimal::from(weights[1]);
        config.weights.ma_crossover = Decimal::from(weights[2]);
        config.weights.obv_trend = Decimal::from(weights[3]);
        config.weights.obv_ma_crossover = Decimal::from(weights[4]);
        config.weights.cmf_pressure = Decimal::from(weights[5]);
        let scorer = StockScorer::new(config).unwrap();

        let bars = daily_bars(&rows);
        if let Ok(snapshot) = scorer.score_bars("PROP", &bars, calc_date()) {
            prop_assert!(snapshot.total_score >= dec!(-100) && snapshot.total_score <= dec!(100));
            prop_assert_eq!(snapshot.components_total(), snapshot.total_score);
            if let Some(pct) = snapshot.suggested_position_pct {
                prop_assert!(pct >= Decimal::ZERO && pct <= Decimal::ONE);
            }
        }
    }
}
