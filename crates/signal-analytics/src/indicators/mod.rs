//! 기술적 지표 모듈.
//!
//! 정렬된 OHLCV 시계열에 대한 순수 함수형 지표 계산을 제공합니다.
//! 같은 입력에 대해서는 항상 같은 결과를 반환하며, 부작용이 없습니다.
//!
//! # 지원 지표
//!
//! ## 추세 지표 (Trend Indicators)
//! - **SMA**: 단순 이동평균 (Simple Moving Average)
//!
//! ## 거래량 지표 (Volume Indicators)
//! - **OBV**: 누적 거래량 (On-Balance Volume)
//! - **CMF**: 차이킨 자금 흐름 (Chaikin Money Flow)
//!
//! # 미정의 값
//!
//! 기간을 채우지 못한 앞부분의 값은 `None`입니다 (0도, 에러도 아님).
//! 종가 결측 바가 낀 이동평균 윈도우도 `None`입니다.
//!
//! # 사용 예시
//!
//! ```ignore
//! use signal_analytics::indicators::{IndicatorFrame, TrendIndicators, SmaParams};
//!
//! let ma5 = TrendIndicators::new().sma(&closes, SmaParams { period: 5 })?;
//! let frame = IndicatorFrame::compute(&bars, &config.indicators)?;
//! ```

pub mod frame;
pub mod trend;
pub mod volume;

use thiserror::Error;

pub use frame::{IndicatorFrame, IndicatorRow};
pub use trend::{SmaParams, TrendIndicators};
pub use volume::{CmfIndicator, CmfParams, ObvIndicator, ObvParams, ObvResult};

/// 지표 계산 오류.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// 잘못된 파라미터
    #[error("잘못된 파라미터: {0}")]
    InvalidParameter(String),

    /// 계산 오류
    #[error("계산 오류: {0}")]
    CalculationError(String),
}

/// 지표 계산 결과 타입.
pub type IndicatorResult<T> = Result<T, IndicatorError>;

/// 입력 시계열 길이가 모두 같은지 검사합니다.
pub(crate) fn ensure_same_len(lens: &[usize]) -> IndicatorResult<()> {
    match lens.split_first() {
        Some((first, rest)) if rest.iter().any(|l| l != first) => Err(
            IndicatorError::InvalidParameter(format!("입력 데이터 길이가 일치하지 않습니다: {:?}", lens)),
        ),
        _ => Ok(()),
    }
}
