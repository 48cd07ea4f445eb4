//! 도메인 모델.
//!
//! - `market_data`: OHLCV 가격 바
//! - `snapshot`: 종목 점수 스냅샷, 점수 컴포넌트, 추천 액션
//! - `run`: 스코어 계산 실행 레코드와 상태
//! - `calendar`: 다음 거래일 계산

pub mod calendar;
pub mod market_data;
pub mod run;
pub mod snapshot;

pub use calendar::{CalendarPolicy, TradingCalendar};
pub use market_data::{filter_trading_bars, PriceBar};
pub use run::{RunStatus, ScoreCalculationRun};
pub use snapshot::{RecommendedAction, ScoreComponent, ScoreComponents, StockScoreSnapshot};
