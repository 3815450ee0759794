use breathwork_core::stats::{bucket_sessions, current_streak_days};
use breathwork_core::{Database, Period, SessionStats};
use chrono::Utc;
use clap::Subcommand;
use serde::Serialize;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Totals for the current period
    Summary {
        /// day, week or month
        #[arg(long, default_value = "day")]
        period: Period,
    },
    /// Per-period history, oldest first
    History {
        /// day, week or month
        #[arg(long, default_value = "day")]
        period: Period,
        /// Number of periods to show
        #[arg(long, default_value_t = 7)]
        count: usize,
    },
}

#[derive(Serialize)]
struct Summary {
    period: Period,
    since: chrono::NaiveDate,
    streak_days: u32,
    #[serde(flatten)]
    stats: SessionStats,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let today = Utc::now().date_naive();

    match action {
        StatsAction::Summary { period } => {
            let since = period.start_of(today);
            let start = since.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
            let records = db.sessions_since(start)?;
            let all = db.all_sessions()?;
            let summary = Summary {
                period,
                since,
                streak_days: current_streak_days(&all, today),
                stats: SessionStats::from_records(&records),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        StatsAction::History { period, count } => {
            let records = db.all_sessions()?;
            let buckets = bucket_sessions(&records, period, today, count);
            println!("{}", serde_json::to_string_pretty(&buckets)?);
        }
    }
    Ok(())
}
