//! 거래일 캘린더.
//!
//! 신호 발생일(마지막 거래일) 다음 거래일을 실행일로 계산합니다.
//!
//! # 정책
//!
//! - `calendar_day`: 단순히 다음 날 (주말 거래 시장용)
//! - `weekdays`: 주말과 설정된 휴장일을 건너뜀
//! - `auto`: 가격 시계열에 주말 바가 있으면 `calendar_day`, 없으면 `weekdays`

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 실행일 계산 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarPolicy {
    /// 다음 달력일
    CalendarDay,
    /// 주말/휴장일 제외
    Weekdays,
    /// 시계열에서 추론
    #[default]
    Auto,
}

/// 다음 거래일 계산기.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradingCalendar {
    policy: CalendarPolicy,
    holidays: BTreeSet<NaiveDate>,
}

impl TradingCalendar {
    /// 새 캘린더 생성.
    pub fn new(policy: CalendarPolicy, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            policy,
            holidays: holidays.into_iter().collect(),
        }
    }

    /// 현재 정책.
    pub fn policy(&self) -> CalendarPolicy {
        self.policy
    }

    /// `auto` 정책을 주어진 시계열 기준으로 확정합니다.
    ///
    /// 시계열에 토/일 바가 하나라도 있으면 주말에도 거래되는 시장으로 봅니다.
    pub fn resolve_for_series<I>(&self, trading_dates: I) -> TradingCalendar
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        if self.policy != CalendarPolicy::Auto {
            return self.clone();
        }

        let trades_on_weekends = trading_dates.into_iter().any(is_weekend);
        let policy = if trades_on_weekends {
            CalendarPolicy::CalendarDay
        } else {
            CalendarPolicy::Weekdays
        };

        TradingCalendar {
            policy,
            holidays: self.holidays.clone(),
        }
    }

    /// 해당 날짜가 거래일인지 확인합니다.
    ///
    /// `auto` 정책은 시계열 정보가 없으므로 `weekdays`로 취급합니다.
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        match self.policy {
            CalendarPolicy::CalendarDay => true,
            CalendarPolicy::Weekdays | CalendarPolicy::Auto => {
                !is_weekend(date) && !self.holidays.contains(&date)
            }
        }
    }

    /// `date` 다음 거래일.
    pub fn next_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut next = date + Duration::days(1);
        while !self.is_trading_day(next) {
            next += Duration::days(1);
        }
        next
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
