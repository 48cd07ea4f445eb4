//! 스코어 계산 실행(run) 레코드.
//!
//! 계산일마다 하나의 레코드가 존재하며 배치 오케스트레이터만 수정합니다.
//!
//! ```text
//! pending ──▶ running ──▶ completed
//!    │           │
//!    └───────────┴──────▶ failed
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

/// 실행 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// 생성됨, 아직 시작 전
    Pending,
    /// 종목 처리 중
    Running,
    /// 완료 (일부 종목 실패 포함)
    Completed,
    /// 실행 수준 오류로 실패
    Failed,
}

impl RunStatus {
    /// 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// 종료 상태인지 확인합니다.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// 허용된 상태 전이인지 확인합니다.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::InvalidInput(format!(
                "알 수 없는 실행 상태: {}",
                other
            ))),
        }
    }
}

/// 배치 실행 레코드.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCalculationRun {
    /// 실행 ID (같은 계산일을 다시 실행하면 새 ID가 부여됨)
    pub id: Uuid,
    /// 계산일
    pub calculation_date: NaiveDate,
    /// 상태
    pub status: RunStatus,
    /// 시작 시각
    pub start_time: Option<DateTime<Utc>>,
    /// 종료 시각
    pub end_time: Option<DateTime<Utc>>,
    /// 전체 종목 수
    pub total_stocks: u32,
    /// 성공 종목 수
    pub successful_stocks: u32,
    /// 실패 종목 수
    pub failed_stocks: u32,
    /// 처리된 종목 수 (= 성공 + 실패)
    pub processed_stocks: u32,
    /// 현재 처리 중인 종목
    pub current_stock: Option<String>,
    /// 실패 사유
    pub error_message: Option<String>,
    /// 마지막 갱신 시각
    pub updated_at: DateTime<Utc>,
}

impl ScoreCalculationRun {
    /// `pending` 상태의 새 실행 레코드.
    pub fn pending(calculation_date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            calculation_date,
            status: RunStatus::Pending,
            start_time: Some(now),
            end_time: None,
            total_stocks: 0,
            successful_stocks: 0,
            failed_stocks: 0,
            processed_stocks: 0,
            current_stock: None,
            error_message: None,
            updated_at: now,
        }
    }

    /// 카운터 불변식 검사.
    ///
    /// - 성공 + 실패 ≤ 전체
    /// - 처리 = 성공 + 실패
    pub fn counters_consistent(&self) -> bool {
        let done = self.successful_stocks + self.failed_stocks;
        done <= self.total_stocks && self.processed_stocks == done
    }

    /// 예상 소요 시간(`budget`)을 넘겨 종료되지 않은 실행인지 확인합니다.
    pub fn is_stale(&self, now: DateTime<Utc>, budget: Duration) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        let started = self.start_time.unwrap_or(self.updated_at);
        now - started > budget
    }

    /// 남은 종목 수.
    pub fn remaining(&self) -> u32 {
        self.total_stocks.saturating_sub(self.processed_stocks)
    }
}
