//! # Signal Core
//!
//! 일일 종목 스코어링 엔진의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 스코어링 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - OHLCV 가격 바 (`PriceBar`)
//! - 종목 점수 스냅샷 및 점수 컴포넌트
//! - 스코어 계산 실행(run) 원장 레코드
//! - 거래일 캘린더
//! - 스코어링 설정 (가중치, 임계값, 리스크 파라미터)
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use self::config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
