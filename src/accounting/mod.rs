//! Day accounting for leave, work-from-home and attendance.
//!
//! Everything in here is pure: callers fetch a user's rows, convert them into
//! [`LeaveRequest`](crate::model::leave_request::LeaveRequest) and
//! [`AttendanceRecord`](crate::model::attendance::AttendanceRecord) snapshots
//! and hand them over. No I/O, no clock; the year is always passed in.

use chrono::NaiveDate;
use derive_more::Display;

pub mod range;
pub mod summary;
pub mod timeline;

pub use range::{DateRange, YearWindow};
pub use summary::{LeaveStats, StatsInput};
pub use timeline::{DayEntry, year_timeline};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum AccountingError {
    #[display(fmt = "invalid date range: start {} is after end {}", start, end)]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[display(fmt = "date range is missing its start or end date")]
    MissingDate,

    #[display(fmt = "year {} is outside the supported calendar", _0)]
    YearOutOfRange(i32),
}

impl std::error::Error for AccountingError {}
