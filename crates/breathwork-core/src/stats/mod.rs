//! Statistics over recorded breathing sessions.
//!
//! Everything here is a pure function of [`SessionRecord`](crate::storage::SessionRecord)
//! slices, so callers decide how the rows are fetched.

mod history;
mod summary;

pub use history::{bucket_sessions, current_streak_days, Period, PeriodBucket};
pub use summary::{ProtocolUsage, SessionStats};
