use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum FacultyStatus {
    Active,
    Inactive,
}

/// Manager of freelance faculty, with the number of faculty assigned to them.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct FacultyManager {
    pub id: u64,
    #[schema(example = "Neha Kapoor")]
    pub name: String,
    #[schema(example = "neha.kapoor@lyfshilp.in", format = "email")]
    pub email: String,
    pub phone: Option<String>,
    #[schema(example = 4)]
    pub faculty_count: i64,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct FreelanceFaculty {
    pub id: u64,
    pub manager_id: u64,
    #[schema(example = "Vikram Iyer")]
    pub name: String,
    #[schema(example = "vikram.iyer@gmail.com", format = "email")]
    pub email: String,
    pub phone: Option<String>,
    #[schema(example = "Data Structures")]
    pub subject: Option<String>,
    #[schema(example = "ACTIVE")]
    pub status: String,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Returns the reason a name/email pair is unacceptable, if any.
pub fn validate_contact(name: &str, email: &str) -> Option<&'static str> {
    if name.trim().is_empty() || email.trim().is_empty() {
        return Some("Name and email are required");
    }

    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => None,
        _ => Some("Invalid email address"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_column() {
        assert_eq!("INACTIVE".parse::<FacultyStatus>().unwrap(), FacultyStatus::Inactive);
        assert_eq!(FacultyStatus::Active.as_ref(), "ACTIVE");
        assert!("retired".parse::<FacultyStatus>().is_err());
    }

    #[test]
    fn contact_rules() {
        assert_eq!(validate_contact("Vikram", "vikram@iyer.dev"), None);
        assert_eq!(validate_contact(" ", "vikram@iyer.dev"), Some("Name and email are required"));
        assert_eq!(validate_contact("Vikram", ""), Some("Name and email are required"));
        assert_eq!(validate_contact("Vikram", "vikram.iyer"), Some("Invalid email address"));
        assert_eq!(validate_contact("Vikram", "@iyer.dev"), Some("Invalid email address"));
    }
}
