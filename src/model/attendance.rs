use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::{ConversionError, parse_column};

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Wfh,
    Leave,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRow {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "09:02:11", value_type = String, nullable = true)]
    pub check_in: Option<NaiveTime>,
    #[schema(example = "17:45:00", value_type = String, nullable = true)]
    pub check_out: Option<NaiveTime>,
    #[schema(example = "PRESENT")]
    pub status: String,
}

/// One employee-day as the accounting engine consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub check_in: bool,
    pub status: AttendanceStatus,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = ConversionError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            employee_id: row.employee_id,
            date: row.date,
            check_in: row.check_in.is_some(),
            status: parse_column("status", &row.status)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_in_time_means_presence() {
        let row = AttendanceRow {
            id: 1,
            employee_id: 5,
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            check_in: NaiveTime::from_hms_opt(9, 0, 0),
            check_out: None,
            status: "WFH".into(),
        };

        let record = AttendanceRecord::try_from(row.clone()).unwrap();
        assert!(record.check_in);
        assert_eq!(record.status, AttendanceStatus::Wfh);

        let absent = AttendanceRow {
            check_in: None,
            status: "LEAVE".into(),
            ..row
        };
        assert!(!AttendanceRecord::try_from(absent).unwrap().check_in);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let row = AttendanceRow {
            id: 1,
            employee_id: 5,
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            check_in: None,
            check_out: None,
            status: "ON_SITE".into(),
        };
        assert!(AttendanceRecord::try_from(row).is_err());
    }
}
