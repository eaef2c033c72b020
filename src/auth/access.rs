//! Department-manager scoping shared by the leave and reimbursement workflows.
//!
//! Admins see and act on everything. An employee listed in
//! `department_managers` additionally sees and reviews the records of the
//! employees in those departments.

use sqlx::MySqlPool;

use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};

/// Which employees' records a caller may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Employees(Vec<u64>),
}

impl Scope {
    pub fn allows(&self, employee_id: u64) -> bool {
        match self {
            Scope::All => true,
            Scope::Employees(ids) => ids.contains(&employee_id),
        }
    }

    /// `employee_id IN (...)` fragment plus bind values; empty for [`Scope::All`].
    pub fn sql_filter(&self, column: &str) -> Option<(String, Vec<u64>)> {
        match self {
            Scope::All => None,
            Scope::Employees(ids) if ids.is_empty() => Some(("1=0".to_string(), Vec::new())),
            Scope::Employees(ids) => {
                let marks = vec!["?"; ids.len()].join(", ");
                Some((format!("{column} IN ({marks})"), ids.clone()))
            }
        }
    }
}

pub async fn manages_employee(
    pool: &MySqlPool,
    manager_employee_id: u64,
    employee_id: u64,
) -> Result<bool, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM employees e
        JOIN department_managers dm ON dm.department_id = e.department_id
        WHERE e.id = ? AND dm.employee_id = ?
        "#,
    )
    .bind(employee_id)
    .bind(manager_employee_id)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// Employees in every department the given employee manages.
pub async fn managed_employee_ids(
    pool: &MySqlPool,
    manager_employee_id: u64,
) -> Result<Vec<u64>, sqlx::Error> {
    sqlx::query_scalar::<_, u64>(
        r#"
        SELECT DISTINCT e.id
        FROM employees e
        JOIN department_managers dm ON dm.department_id = e.department_id
        WHERE dm.employee_id = ?
        "#,
    )
    .bind(manager_employee_id)
    .fetch_all(pool)
    .await
}

/// Own records plus managed employees' records; everything for admins.
pub async fn visible_scope(auth: &AuthUser, pool: &MySqlPool) -> AppResult<Scope> {
    if auth.is_admin() {
        return Ok(Scope::All);
    }

    let own = auth.employee_id()?;
    let mut ids = managed_employee_ids(pool, own).await?;
    if !ids.contains(&own) {
        ids.push(own);
    }
    Ok(Scope::Employees(ids))
}

/// Scope of records the caller reviews as a manager, excluding their own.
pub async fn managed_scope(auth: &AuthUser, pool: &MySqlPool) -> AppResult<Scope> {
    if auth.is_admin() {
        return Ok(Scope::All);
    }

    let own = auth.employee_id()?;
    let ids = managed_employee_ids(pool, own)
        .await?
        .into_iter()
        .filter(|id| *id != own)
        .collect();
    Ok(Scope::Employees(ids))
}

/// Approve/reject guard: admins always, managers for their departments,
/// never for one's own record.
pub async fn ensure_can_review(
    auth: &AuthUser,
    pool: &MySqlPool,
    owner_employee_id: u64,
) -> AppResult<()> {
    if auth.is_admin() {
        return Ok(());
    }

    let reviewer = auth.employee_id()?;
    if reviewer == owner_employee_id {
        return Err(AppError::forbidden("You cannot review your own request"));
    }

    if manages_employee(pool, reviewer, owner_employee_id).await? {
        Ok(())
    } else {
        Err(AppError::forbidden("Manager has no access to this employee"))
    }
}
