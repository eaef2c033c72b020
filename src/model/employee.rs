use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "AGL-001",
        "first_name": "Riya",
        "last_name": "Sen",
        "email": "riya.sen@agility.in",
        "phone": "+919812345678",
        "department_id": 2,
        "position": "Backend Engineer",
        "hire_date": "2024-01-01",
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "AGL-001")]
    pub employee_code: String,

    #[schema(example = "Riya")]
    pub first_name: String,

    #[schema(example = "Sen", nullable = true)]
    pub last_name: Option<String>,

    #[schema(example = "riya.sen@agility.in")]
    pub email: String,

    #[schema(example = "+919812345678", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = 2, nullable = true)]
    pub department_id: Option<u64>,

    #[schema(example = "Backend Engineer", nullable = true)]
    pub position: Option<String>,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub hire_date: NaiveDate,

    #[schema(example = "active")]
    pub status: String,
}

/// Short employee card embedded in manager and admin listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct EmployeeBrief {
    pub id: u64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub position: Option<String>,
}
