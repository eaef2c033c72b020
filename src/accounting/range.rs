use chrono::NaiveDate;
use serde::Serialize;

use super::AccountingError;
use crate::model::leave_request::LeaveRequest;

/// Inclusive calendar-day range. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AccountingError> {
        if start > end {
            return Err(AccountingError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds a range from nullable storage columns.
    pub fn from_parts(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, AccountingError> {
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => Err(AccountingError::MissingDate),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |day| {
            day.succ_opt().filter(|next| *next <= end)
        })
    }
}

/// Counts the distinct calendar days covered by the union of `ranges`.
///
/// Ranges are sorted by start and swept once; a range starting on or before
/// the current merged end extends it, anything later closes the merged
/// interval and opens a new one.
pub fn unique_days<I>(ranges: I) -> i64
where
    I: IntoIterator<Item = DateRange>,
{
    let mut sorted: Vec<DateRange> = ranges.into_iter().collect();
    sorted.sort_by_key(|r| r.start);

    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return 0;
    };

    let mut merged = first;
    let mut total = 0;

    for range in iter {
        if range.start <= merged.end {
            merged.end = merged.end.max(range.end);
        } else {
            total += merged.days();
            merged = range;
        }
    }

    total + merged.days()
}

/// Jan 1 ..= Dec 31 of one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    year: i32,
    first: NaiveDate,
    last: NaiveDate,
}

impl YearWindow {
    pub fn new(year: i32) -> Result<Self, AccountingError> {
        let first = NaiveDate::from_ymd_opt(year, 1, 1);
        let last = NaiveDate::from_ymd_opt(year, 12, 31);

        match (first, last) {
            (Some(first), Some(last)) => Ok(Self { year, first, last }),
            _ => Err(AccountingError::YearOutOfRange(year)),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Jan 1.
    pub fn first(&self) -> NaiveDate {
        self.first
    }

    /// Dec 31.
    pub fn last(&self) -> NaiveDate {
        self.last
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.first <= day && day <= self.last
    }

    /// Both ends must fall inside the year; a range crossing Dec 31 / Jan 1
    /// belongs to neither year.
    pub fn contains(&self, range: &DateRange) -> bool {
        self.contains_day(range.start) && self.contains_day(range.end)
    }
}

pub fn filter_by_year<'a>(requests: &'a [LeaveRequest], window: &YearWindow) -> Vec<&'a LeaveRequest> {
    requests
        .iter()
        .filter(|request| window.contains(&request.range))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_request::{LeaveStatus, LeaveType};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn r(start: &str, end: &str) -> DateRange {
        DateRange::new(d(start), d(end)).unwrap()
    }

    fn request(id: u64, start: &str, end: &str) -> LeaveRequest {
        LeaveRequest {
            id,
            employee_id: 7,
            leave_type: LeaveType::Paid,
            status: LeaveStatus::Approved,
            range: r(start, end),
            reason: None,
            reject_reason: None,
            responsible_person: None,
        }
    }

    // Every ordering of `items`, built by repeated insertion.
    fn permutations(items: &[DateRange]) -> Vec<Vec<DateRange>> {
        let mut out: Vec<Vec<DateRange>> = vec![Vec::new()];
        for item in items {
            let mut next = Vec::new();
            for perm in &out {
                for pos in 0..=perm.len() {
                    let mut p = perm.clone();
                    p.insert(pos, *item);
                    next.push(p);
                }
            }
            out = next;
        }
        out
    }

    #[test]
    fn rejects_inverted_range() {
        let err = DateRange::new(d("2024-01-05"), d("2024-01-01")).unwrap_err();
        assert_eq!(
            err,
            AccountingError::InvalidRange {
                start: d("2024-01-05"),
                end: d("2024-01-01"),
            }
        );
    }

    #[test]
    fn missing_bound_is_reported() {
        assert_eq!(
            DateRange::from_parts(Some(d("2024-01-01")), None),
            Err(AccountingError::MissingDate)
        );
        assert_eq!(
            DateRange::from_parts(None, None),
            Err(AccountingError::MissingDate)
        );
    }

    #[test]
    fn iter_days_walks_inclusive_span() {
        let days: Vec<_> = r("2024-02-28", "2024-03-01").iter_days().collect();
        assert_eq!(days, vec![d("2024-02-28"), d("2024-02-29"), d("2024-03-01")]);
        assert_eq!(r("2024-02-28", "2024-03-01").days(), 3);
    }

    #[test]
    fn iter_days_reaches_the_last_representable_date() {
        let end = NaiveDate::MAX;
        let start = end.pred_opt().and_then(|day| day.pred_opt()).unwrap();
        let range = DateRange::new(start, end).unwrap();

        let days: Vec<_> = range.iter_days().collect();
        assert_eq!(days.len() as i64, range.days());
        assert_eq!(days.last(), Some(&NaiveDate::MAX));
    }

    #[test]
    fn empty_input_counts_zero() {
        assert_eq!(unique_days(Vec::new()), 0);
    }

    #[test]
    fn single_day_counts_one() {
        assert_eq!(unique_days([r("2024-01-01", "2024-01-01")]), 1);
    }

    #[test]
    fn overlapping_ranges_merge() {
        let ranges = [r("2024-01-01", "2024-01-05"), r("2024-01-03", "2024-01-10")];
        assert_eq!(unique_days(ranges), 10);
    }

    #[test]
    fn touching_ranges_merge() {
        let ranges = [r("2024-01-01", "2024-01-05"), r("2024-01-06", "2024-01-10")];
        assert_eq!(unique_days(ranges), 10);

        let shared_day = [r("2024-01-01", "2024-01-05"), r("2024-01-05", "2024-01-10")];
        assert_eq!(unique_days(shared_day), 10);
    }

    #[test]
    fn contained_and_duplicate_ranges_count_once() {
        let ranges = [
            r("2024-03-01", "2024-03-20"),
            r("2024-03-05", "2024-03-06"),
            r("2024-03-01", "2024-03-20"),
        ];
        assert_eq!(unique_days(ranges), 20);
    }

    #[test]
    fn disjoint_ranges_sum_their_spans() {
        let ranges = [
            r("2024-01-01", "2024-01-03"),
            r("2024-02-10", "2024-02-10"),
            r("2024-12-30", "2024-12-31"),
        ];
        let sum: i64 = ranges.iter().map(DateRange::days).sum();
        assert_eq!(unique_days(ranges), sum);
        assert_eq!(sum, 6);
    }

    #[test]
    fn merging_never_exceeds_raw_sum() {
        let ranges = [
            r("2024-04-01", "2024-04-04"),
            r("2024-04-03", "2024-04-08"),
            r("2024-05-01", "2024-05-02"),
            r("2024-04-08", "2024-04-09"),
        ];
        let sum: i64 = ranges.iter().map(DateRange::days).sum();
        let unique = unique_days(ranges);
        assert!(unique < sum);
        assert_eq!(unique, 11);
    }

    #[test]
    fn order_does_not_change_result() {
        let ranges = [
            r("2024-06-10", "2024-06-12"),
            r("2024-06-01", "2024-06-03"),
            r("2024-06-03", "2024-06-05"),
            r("2024-06-20", "2024-06-20"),
        ];
        let expected = unique_days(ranges);
        assert_eq!(expected, 9);

        for perm in permutations(&ranges) {
            assert_eq!(unique_days(perm), expected);
        }
    }

    #[test]
    fn year_window_requires_both_ends_inside() {
        let window = YearWindow::new(2024).unwrap();
        assert!(window.contains(&r("2024-01-01", "2024-12-31")));
        assert!(!window.contains(&r("2023-12-28", "2024-01-03")));
        assert!(!window.contains(&r("2024-12-28", "2025-01-03")));
        assert!(!window.contains(&r("2025-01-01", "2025-01-01")));
    }

    #[test]
    fn year_window_bounds() {
        let window = YearWindow::new(2024).unwrap();
        assert_eq!(window.first(), d("2024-01-01"));
        assert_eq!(window.last(), d("2024-12-31"));
    }

    #[test]
    fn year_window_rejects_unrepresentable_year() {
        assert_eq!(
            YearWindow::new(i32::MAX),
            Err(AccountingError::YearOutOfRange(i32::MAX))
        );
    }

    #[test]
    fn filter_by_year_drops_straddling_requests() {
        let requests = vec![
            request(1, "2024-03-01", "2024-03-02"),
            request(2, "2024-12-30", "2025-01-02"),
            request(3, "2023-05-01", "2023-05-01"),
            request(4, "2024-12-31", "2024-12-31"),
        ];
        let window = YearWindow::new(2024).unwrap();

        let kept: Vec<u64> = filter_by_year(&requests, &window)
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(kept, vec![1, 4]);
    }
}
