use serde::Serialize;
use utoipa::ToSchema;

/// Department with the number of employees assigned to it.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct DepartmentHeadcount {
    #[schema(example = 2)]
    pub id: u64,
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = 14)]
    pub count: i64,
}
