//! # Signal Analytics
//!
//! 가격/거래량 시계열로부터 기술적 지표를 계산하고, 이를 가중 규칙으로
//! 종합하여 종목별 점수와 추천 액션을 산출합니다.
//!
//! - [`indicators`]: 이동평균, OBV, CMF 및 지표 프레임
//! - [`scorer`]: 종합 점수, 추천 액션, 실행일, 리스크 브래킷 산출

pub mod indicators;
pub mod scorer;

pub use indicators::{
    CmfIndicator, CmfParams, IndicatorError, IndicatorFrame, IndicatorResult,
    IndicatorRow, ObvIndicator, ObvParams, ObvResult, SmaParams, TrendIndicators,
};
pub use scorer::{rule, ScoringError, ScoringResult, StockScorer};
