//! Period-bucketed session history.
//!
//! Sessions are bucketed by the UTC date they ended on. Weeks start on
//! Monday; months on the first.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::storage::SessionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
}

impl Period {
    /// First day of the period containing `date`.
    pub fn start_of(self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Day => date,
            Period::Week => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
            Period::Month => date.with_day(1).unwrap_or(date),
        }
    }

    /// Start of the period before the one starting at `start`.
    fn previous(self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Period::Day => start.checked_sub_signed(Duration::days(1)),
            Period::Week => start.checked_sub_signed(Duration::days(7)),
            Period::Month => start.checked_sub_months(Months::new(1)),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Period::Day),
            "week" | "weekly" => Ok(Period::Week),
            "month" | "monthly" => Ok(Period::Month),
            other => Err(format!("unknown period '{other}' (expected day, week or month)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBucket {
    pub start: NaiveDate,
    pub sessions: u64,
    pub completed: u64,
    pub total_secs: u64,
}

/// `count` contiguous buckets ending with the one containing `today`,
/// oldest first. Sessions outside the window are ignored.
pub fn bucket_sessions(
    records: &[SessionRecord],
    period: Period,
    today: NaiveDate,
    count: usize,
) -> Vec<PeriodBucket> {
    let mut starts = Vec::with_capacity(count);
    let mut cursor = Some(period.start_of(today));
    while starts.len() < count {
        let Some(start) = cursor else { break };
        starts.push(start);
        cursor = period.previous(start);
    }
    starts.reverse();

    let mut buckets: Vec<PeriodBucket> = starts
        .into_iter()
        .map(|start| PeriodBucket {
            start,
            sessions: 0,
            completed: 0,
            total_secs: 0,
        })
        .collect();

    for record in records {
        let start = period.start_of(record.ended_at.date_naive());
        if let Some(bucket) = buckets.iter_mut().find(|b| b.start == start) {
            bucket.sessions += 1;
            if record.completed {
                bucket.completed += 1;
            }
            bucket.total_secs += u64::from(record.completed_secs);
        }
    }
    buckets
}

/// Consecutive days with at least one session, counting back from `today`.
///
/// A day without sessions yet does not break the streak until it is over,
/// so counting starts from yesterday when nothing was recorded today.
pub fn current_streak_days(records: &[SessionRecord], today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = records.iter().map(|r| r.ended_at.date_naive()).collect();

    let mut day = if days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) => yesterday,
            None => return 0,
        }
    };

    let mut streak = 0;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}
