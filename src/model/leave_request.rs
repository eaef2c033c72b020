use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

use super::{ConversionError, parse_column};
use crate::accounting::DateRange;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, IntoStaticStr, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LeaveType {
    Paid,
    Unpaid,
    Sick,
    Casual,
    Wfh,
}

impl LeaveType {
    pub fn is_wfh(&self) -> bool {
        *self == LeaveType::Wfh
    }

    /// Paid, sick and casual days are taken from the yearly quota.
    pub fn counts_against_quota(&self) -> bool {
        !matches!(self, LeaveType::Wfh | LeaveType::Unpaid)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, IntoStaticStr, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

/// Storage shape of a `leave_requests` row, also the API response body.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "leave_type": "SICK",
    "start_date": "2026-01-01",
    "end_date": "2026-01-03",
    "status": "PENDING",
    "reason": "Fever",
    "reject_reason": null,
    "responsible_person": "Jane Doe",
    "created_at": "2026-01-01T00:00:00Z"
}))]
pub struct LeaveRow {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "SICK")]
    pub leave_type: String,
    #[schema(value_type = String, format = "date", nullable = true)]
    pub start_date: Option<NaiveDate>,
    #[schema(value_type = String, format = "date", nullable = true)]
    pub end_date: Option<NaiveDate>,
    #[schema(example = "PENDING")]
    pub status: String,
    pub reason: Option<String>,
    pub reject_reason: Option<String>,
    pub responsible_person: Option<String>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Validated leave request as the accounting engine sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type: LeaveType,
    pub status: LeaveStatus,
    pub range: DateRange,
    pub reason: Option<String>,
    /// Only ever set on rejected requests
    pub reject_reason: Option<String>,
    pub responsible_person: Option<String>,
}

impl LeaveRequest {
    pub fn is_approved(&self) -> bool {
        self.status == LeaveStatus::Approved
    }
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = ConversionError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        let leave_type: LeaveType = parse_column("leave_type", &row.leave_type)?;
        let status: LeaveStatus = parse_column("status", &row.status)?;
        let range = DateRange::from_parts(row.start_date, row.end_date)
            .map_err(|source| ConversionError::Dates { id: row.id, source })?;

        let reject_reason = match status {
            LeaveStatus::Rejected => row.reject_reason,
            _ => None,
        };

        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            leave_type,
            status,
            range,
            reason: row.reason,
            reject_reason,
            responsible_person: row.responsible_person,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::AccountingError;

    fn row(leave_type: &str, status: &str) -> LeaveRow {
        LeaveRow {
            id: 9,
            employee_id: 3,
            leave_type: leave_type.into(),
            start_date: NaiveDate::from_ymd_opt(2026, 2, 2),
            end_date: NaiveDate::from_ymd_opt(2026, 2, 4),
            status: status.into(),
            reason: None,
            reject_reason: Some("short staffed".into()),
            responsible_person: None,
            created_at: None,
        }
    }

    #[test]
    fn parses_stored_strings() {
        assert_eq!("WFH".parse::<LeaveType>().unwrap(), LeaveType::Wfh);
        assert_eq!(LeaveType::Casual.to_string(), "CASUAL");
        assert_eq!(LeaveStatus::Approved.as_ref(), "APPROVED");
        assert!("annual".parse::<LeaveType>().is_err());
    }

    #[test]
    fn serde_uses_upper_case() {
        let json = serde_json::to_string(&LeaveType::Unpaid).unwrap();
        assert_eq!(json, "\"UNPAID\"");
        let parsed: LeaveStatus = serde_json::from_str("\"REJECTED\"").unwrap();
        assert_eq!(parsed, LeaveStatus::Rejected);
    }

    #[test]
    fn quota_excludes_wfh_and_unpaid() {
        assert!(LeaveType::Paid.counts_against_quota());
        assert!(LeaveType::Sick.counts_against_quota());
        assert!(LeaveType::Casual.counts_against_quota());
        assert!(!LeaveType::Unpaid.counts_against_quota());
        assert!(!LeaveType::Wfh.counts_against_quota());
    }

    #[test]
    fn reject_reason_survives_only_on_rejected_rows() {
        let rejected = LeaveRequest::try_from(row("PAID", "REJECTED")).unwrap();
        assert_eq!(rejected.reject_reason.as_deref(), Some("short staffed"));

        let approved = LeaveRequest::try_from(row("PAID", "APPROVED")).unwrap();
        assert_eq!(approved.reject_reason, None);
        assert_eq!(approved.range.days(), 3);
    }

    #[test]
    fn bad_rows_are_reported() {
        let err = LeaveRequest::try_from(row("HOLIDAY", "PENDING")).unwrap_err();
        assert!(matches!(err, ConversionError::UnknownValue { field: "leave_type", .. }));

        let mut inverted = row("SICK", "PENDING");
        inverted.end_date = NaiveDate::from_ymd_opt(2026, 2, 1);
        let err = LeaveRequest::try_from(inverted).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::Dates { id: 9, source: AccountingError::InvalidRange { .. } }
        ));

        let mut missing = row("SICK", "PENDING");
        missing.start_date = None;
        let err = LeaveRequest::try_from(missing).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::Dates { source: AccountingError::MissingDate, .. }
        ));
    }
}
