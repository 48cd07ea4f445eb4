//! 배치 실행 통계 구조체.

use serde::{Deserialize, Serialize};
use signal_core::ScoreCalculationRun;
use std::time::Duration;

/// 배치 실행 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    /// 총 대상 종목 수
    pub total: usize,
    /// 성공 횟수
    pub success: usize,
    /// 에러 횟수
    pub errors: usize,
    /// 처리되지 않은 종목 수 (취소/중단)
    pub skipped: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CollectionStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 최종 실행 레코드에서 통계를 만듭니다.
    pub fn from_run(run: &ScoreCalculationRun) -> Self {
        let elapsed = match (run.start_time, run.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().unwrap_or_default(),
            _ => Duration::ZERO,
        };

        Self {
            total: run.total_stocks as usize,
            success: run.successful_stocks as usize,
            errors: run.failed_stocks as usize,
            skipped: run.remaining() as usize,
            elapsed,
        }
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            success = self.success,
            errors = self.errors,
            skipped = self.skipped,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "배치 완료"
        );
    }
}
