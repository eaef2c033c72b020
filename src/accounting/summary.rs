use serde::Serialize;
use utoipa::ToSchema;

use super::range::{YearWindow, filter_by_year, unique_days};
use super::timeline::{DayEntry, present_days, year_timeline};
use super::AccountingError;
use crate::model::attendance::AttendanceRecord;
use crate::model::leave_request::LeaveRequest;

/// Everything the engine needs for one employee and one year.
#[derive(Debug, Clone, Copy)]
pub struct StatsInput<'a> {
    pub year: i32,
    pub leave_quota: i64,
    pub attendance: &'a [AttendanceRecord],
    pub leaves: &'a [LeaveRequest],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaveStats {
    #[schema(example = 2026)]
    pub year: i32,
    /// Days with an actual check-in
    #[schema(example = 180)]
    pub present_days: i64,
    /// Raw span of every non-WFH request in the year, any status, overlaps included
    #[schema(example = 12)]
    pub total_leaves: i64,
    /// Distinct days of approved quota leave (everything except WFH and UNPAID)
    #[schema(example = 9)]
    pub approved_leaves: i64,
    /// Distinct days of approved WFH
    #[schema(example = 4)]
    pub wfh_days: i64,
    /// Distinct days of WFH requested, any status
    #[schema(example = 6)]
    pub wfh_applied: i64,
    #[schema(example = 21)]
    pub leave_quota: i64,
    #[schema(example = 12)]
    pub remaining_leaves: i64,
    pub attendance: Vec<DayEntry>,
}

impl LeaveStats {
    pub fn assemble(input: &StatsInput<'_>) -> Result<Self, AccountingError> {
        let window = YearWindow::new(input.year)?;
        let in_year = filter_by_year(input.leaves, &window);

        let total_leaves = in_year
            .iter()
            .filter(|l| !l.leave_type.is_wfh())
            .map(|l| l.range.days())
            .sum();

        let approved_leaves = unique_days(
            in_year
                .iter()
                .filter(|l| l.is_approved() && l.leave_type.counts_against_quota())
                .map(|l| l.range),
        );

        let wfh_days = unique_days(
            in_year
                .iter()
                .filter(|l| l.is_approved() && l.leave_type.is_wfh())
                .map(|l| l.range),
        );

        let wfh_applied = unique_days(
            in_year
                .iter()
                .filter(|l| l.leave_type.is_wfh())
                .map(|l| l.range),
        );

        let attendance = year_timeline(input.attendance, input.leaves, &window);

        Ok(Self {
            year: window.year(),
            present_days: present_days(&attendance),
            total_leaves,
            approved_leaves,
            wfh_days,
            wfh_applied,
            leave_quota: input.leave_quota,
            remaining_leaves: input.leave_quota - approved_leaves,
            attendance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::DateRange;
    use crate::model::attendance::AttendanceStatus;
    use crate::model::leave_request::{LeaveStatus, LeaveType};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn leave(
        id: u64,
        leave_type: LeaveType,
        status: LeaveStatus,
        start: &str,
        end: &str,
    ) -> LeaveRequest {
        LeaveRequest {
            id,
            employee_id: 42,
            leave_type,
            status,
            range: DateRange::new(d(start), d(end)).unwrap(),
            reason: Some("family".into()),
            reject_reason: None,
            responsible_person: None,
        }
    }

    fn present(date: &str) -> AttendanceRecord {
        AttendanceRecord {
            employee_id: 42,
            date: d(date),
            check_in: true,
            status: AttendanceStatus::Present,
        }
    }

    fn fixture() -> (Vec<AttendanceRecord>, Vec<LeaveRequest>) {
        let attendance = vec![
            present("2024-03-01"),
            present("2024-03-04"),
            present("2024-03-05"),
            present("2023-12-29"),
        ];
        let leaves = vec![
            leave(1, LeaveType::Paid, LeaveStatus::Approved, "2024-03-05", "2024-03-08"),
            leave(2, LeaveType::Sick, LeaveStatus::Approved, "2024-03-07", "2024-03-10"),
            leave(3, LeaveType::Casual, LeaveStatus::Pending, "2024-04-01", "2024-04-02"),
            leave(4, LeaveType::Unpaid, LeaveStatus::Approved, "2024-05-01", "2024-05-03"),
            leave(5, LeaveType::Wfh, LeaveStatus::Approved, "2024-06-03", "2024-06-04"),
            leave(6, LeaveType::Wfh, LeaveStatus::Approved, "2024-06-04", "2024-06-05"),
            leave(7, LeaveType::Wfh, LeaveStatus::Rejected, "2024-06-10", "2024-06-10"),
            leave(8, LeaveType::Paid, LeaveStatus::Approved, "2024-12-30", "2025-01-02"),
        ];
        (attendance, leaves)
    }

    fn input<'a>(attendance: &'a [AttendanceRecord], leaves: &'a [LeaveRequest]) -> StatsInput<'a> {
        StatsInput {
            year: 2024,
            leave_quota: 21,
            attendance,
            leaves,
        }
    }

    #[test]
    fn assembles_yearly_counters() {
        let (attendance, leaves) = fixture();
        let stats = LeaveStats::assemble(&input(&attendance, &leaves)).unwrap();

        // 4 + 4 + 2 + 3, the straddling request is outside the window
        assert_eq!(stats.total_leaves, 13);
        // Mar 5..=10 merged, unpaid and pending excluded
        assert_eq!(stats.approved_leaves, 6);
        assert_eq!(stats.wfh_days, 3);
        assert_eq!(stats.wfh_applied, 4);
        assert_eq!(stats.remaining_leaves, 15);
        assert_eq!(stats.present_days, 3);
    }

    #[test]
    fn timeline_is_clipped_to_the_year() {
        let (attendance, leaves) = fixture();
        let stats = LeaveStats::assemble(&input(&attendance, &leaves)).unwrap();

        assert!(stats.attendance.iter().all(|e| e.date.format("%Y").to_string() == "2024"));
        assert_eq!(stats.attendance.last().map(|e| e.date), Some(d("2024-12-31")));
        assert!(stats.attendance.iter().all(|e| e.date != d("2023-12-29")));

        // Mar 5 has a check-in, so the approved leave does not replace it
        let mar5 = stats.attendance.iter().find(|e| e.date == d("2024-03-05")).unwrap();
        assert!(mar5.check_in);

        // unpaid leave is not quota leave but is still time away
        let may2 = stats.attendance.iter().find(|e| e.date == d("2024-05-02")).unwrap();
        assert_eq!(may2.status, AttendanceStatus::Leave);
    }

    #[test]
    fn reassembling_is_idempotent() {
        let (attendance, leaves) = fixture();
        let first = LeaveStats::assemble(&input(&attendance, &leaves)).unwrap();
        let second = LeaveStats::assemble(&input(&attendance, &leaves)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_year_is_all_zero() {
        let stats = LeaveStats::assemble(&input(&[], &[])).unwrap();
        assert_eq!(stats.present_days, 0);
        assert_eq!(stats.total_leaves, 0);
        assert_eq!(stats.approved_leaves, 0);
        assert_eq!(stats.wfh_days, 0);
        assert_eq!(stats.remaining_leaves, 21);
        assert!(stats.attendance.is_empty());
    }

    #[test]
    fn unrepresentable_year_is_an_error() {
        let mut bad = input(&[], &[]);
        bad.year = i32::MIN;
        assert_eq!(
            LeaveStats::assemble(&bad),
            Err(AccountingError::YearOutOfRange(i32::MIN))
        );
    }
}
