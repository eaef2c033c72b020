use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use super::range::YearWindow;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};

/// One calendar day on an employee's attendance timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DayEntry {
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub check_in: bool,
    pub status: AttendanceStatus,
}

impl From<&AttendanceRecord> for DayEntry {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            date: record.date,
            check_in: record.check_in,
            status: record.status,
        }
    }
}

/// Merges raw attendance with the days covered by approved leave/WFH requests.
///
/// Recorded days always win; a request only fills dates with no attendance
/// row. The result is ordered by date with at most one entry per date.
pub fn merge_timeline<'a, I>(attendance: &[AttendanceRecord], approved: I) -> Vec<DayEntry>
where
    I: IntoIterator<Item = &'a LeaveRequest>,
{
    let mut days: BTreeMap<NaiveDate, DayEntry> = BTreeMap::new();

    for record in attendance {
        match days.entry(record.date) {
            Entry::Vacant(slot) => {
                slot.insert(DayEntry::from(record));
            }
            // duplicate rows for one date: keep the one with a check-in
            Entry::Occupied(mut slot) => {
                if record.check_in && !slot.get().check_in {
                    slot.insert(DayEntry::from(record));
                }
            }
        }
    }

    for request in approved {
        if request.status != LeaveStatus::Approved {
            continue;
        }

        let status = match request.leave_type {
            LeaveType::Wfh => AttendanceStatus::Wfh,
            _ => AttendanceStatus::Leave,
        };

        for date in request.range.iter_days() {
            days.entry(date).or_insert(DayEntry {
                date,
                check_in: false,
                status,
            });
        }
    }

    days.into_values().collect()
}

/// The merged timeline restricted to one calendar year.
///
/// Clipping happens per day, so a request crossing New Year still paints its
/// in-year days even though the yearly counters leave it out.
pub fn year_timeline(
    attendance: &[AttendanceRecord],
    leaves: &[LeaveRequest],
    window: &YearWindow,
) -> Vec<DayEntry> {
    let mut timeline = merge_timeline(attendance, leaves);
    timeline.retain(|entry| window.contains_day(entry.date));
    timeline
}

pub fn present_days(timeline: &[DayEntry]) -> i64 {
    timeline.iter().filter(|entry| entry.check_in).count() as i64
}
