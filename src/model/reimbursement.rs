use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ReimbursementStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct ReimbursementRow {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "Client visit travel")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = 1840.5)]
    pub total_amount: f64,
    #[schema(example = "PENDING")]
    pub status: String,
    pub reject_reason: Option<String>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct BillRow {
    pub id: u64,
    pub reimbursement_id: u64,
    #[schema(example = "https://files.example.com/uploads/reimbursements/bill-1718000000.pdf")]
    pub file_url: String,
    #[schema(example = 920.25)]
    pub amount: f64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewBill {
    #[schema(example = "https://files.example.com/uploads/reimbursements/bill-1718000000.pdf")]
    pub file_url: String,
    #[schema(example = 920.25)]
    pub amount: f64,
    pub note: Option<String>,
}

pub fn total_amount(bills: &[NewBill]) -> f64 {
    bills.iter().map(|b| b.amount).sum()
}

/// Returns the reason a submission is unacceptable, if any.
pub fn validate_submission(title: &str, bills: &[NewBill]) -> Option<&'static str> {
    if title.trim().is_empty() || bills.is_empty() {
        return Some("Title & bills required");
    }
    if bills.iter().any(|b| b.file_url.trim().is_empty()) {
        return Some("Every bill needs a file_url");
    }
    if bills.iter().any(|b| !b.amount.is_finite() || b.amount < 0.0) {
        return Some("Bill amounts must be non-negative numbers");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bill(amount: f64) -> NewBill {
        NewBill {
            file_url: "uploads/reimbursements/bill-1.png".into(),
            amount,
            note: None,
        }
    }

    #[test]
    fn total_is_sum_of_bills() {
        assert_eq!(total_amount(&[bill(100.5), bill(20.0), bill(0.0)]), 120.5);
        assert_eq!(total_amount(&[]), 0.0);
    }

    #[test]
    fn submission_rules() {
        assert_eq!(validate_submission("Taxi", &[bill(10.0)]), None);
        assert_eq!(validate_submission("  ", &[bill(10.0)]), Some("Title & bills required"));
        assert_eq!(validate_submission("Taxi", &[]), Some("Title & bills required"));
        assert!(validate_submission("Taxi", &[bill(-1.0)]).is_some());
        assert!(validate_submission("Taxi", &[bill(f64::NAN)]).is_some());

        let mut no_file = bill(5.0);
        no_file.file_url = String::new();
        assert!(validate_submission("Taxi", &[no_file]).is_some());
    }
}
