use sqlx::FromRow;

/// Credentials row read during login. `role_id` maps onto [`super::role::Role`].
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub role_id: u8,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
    pub is_active: bool,
}
