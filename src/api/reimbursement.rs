//! Expense reimbursement workflow.
//!
//! Employees submit claims made of bills that were uploaded beforehand, admins
//! and department managers approve or reject them. Deletes are soft and
//! one-sided: an employee hiding a claim does not hide it from the admin list,
//! and vice versa.

use std::collections::HashMap;

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::auth::access::{ensure_can_review, managed_scope};
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::employee::EmployeeBrief;
use crate::model::reimbursement::{
    BillRow, NewBill, ReimbursementRow, ReimbursementStatus, total_amount, validate_submission,
};

const REIMBURSEMENT_COLUMNS: &str =
    "id, employee_id, title, description, total_amount, status, reject_reason, created_at";

#[derive(Deserialize, ToSchema)]
pub struct CreateReimbursement {
    #[schema(example = "Client visit travel")]
    pub title: String,
    pub description: Option<String>,
    pub bills: Vec<NewBill>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewReimbursement {
    /// APPROVED or REJECTED
    pub status: ReimbursementStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReimbursementView {
    #[serde(flatten)]
    pub reimbursement: ReimbursementRow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee: Option<EmployeeBrief>,
    pub bills: Vec<BillRow>,
}

fn review_outcome(
    status: ReimbursementStatus,
    reason: Option<String>,
) -> AppResult<(ReimbursementStatus, Option<String>)> {
    match status {
        ReimbursementStatus::Approved => Ok((status, None)),
        ReimbursementStatus::Rejected => Ok((
            status,
            reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
        )),
        ReimbursementStatus::Pending => Err(AppError::bad_request("Invalid status")),
    }
}

/// Pairs each claim with its bills and, when given, its employee card.
fn assemble_views(
    rows: Vec<ReimbursementRow>,
    bills: Vec<BillRow>,
    employees: Option<Vec<EmployeeBrief>>,
) -> Vec<ReimbursementView> {
    let mut bills_by_claim: HashMap<u64, Vec<BillRow>> = HashMap::new();
    for bill in bills {
        bills_by_claim.entry(bill.reimbursement_id).or_default().push(bill);
    }

    let employees: Option<HashMap<u64, EmployeeBrief>> =
        employees.map(|list| list.into_iter().map(|e| (e.id, e)).collect());

    rows.into_iter()
        .map(|reimbursement| ReimbursementView {
            employee: employees
                .as_ref()
                .and_then(|m| m.get(&reimbursement.employee_id).cloned()),
            bills: bills_by_claim.remove(&reimbursement.id).unwrap_or_default(),
            reimbursement,
        })
        .collect()
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

async fn load_views(
    pool: &MySqlPool,
    rows: Vec<ReimbursementRow>,
    with_employee: bool,
) -> AppResult<Vec<ReimbursementView>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let bills_sql = format!(
        "SELECT id, reimbursement_id, file_url, amount, note FROM reimbursement_bills \
         WHERE reimbursement_id IN ({}) ORDER BY id",
        placeholders(rows.len())
    );
    let mut bills_q = sqlx::query_as::<_, BillRow>(&bills_sql);
    for row in &rows {
        bills_q = bills_q.bind(row.id);
    }
    let bills = bills_q.fetch_all(pool).await?;

    let employees = if with_employee {
        let mut ids: Vec<u64> = rows.iter().map(|r| r.employee_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let sql = format!(
            "SELECT id, first_name, last_name, email, position FROM employees WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut q = sqlx::query_as::<_, EmployeeBrief>(&sql);
        for id in ids {
            q = q.bind(id);
        }
        Some(q.fetch_all(pool).await?)
    } else {
        None
    };

    Ok(assemble_views(rows, bills, employees))
}

async fn fetch_claim(pool: &MySqlPool, id: u64) -> AppResult<ReimbursementRow> {
    sqlx::query_as::<_, ReimbursementRow>(&format!(
        "SELECT {REIMBURSEMENT_COLUMNS} FROM reimbursements WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Reimbursement not found"))
}

/* =========================
Employee: submit
========================= */
#[utoipa::path(
    post,
    path = "/api/reimbursement",
    request_body = CreateReimbursement,
    responses(
        (status = 201, description = "Reimbursement submitted", body = ReimbursementView),
        (status = 400, description = "Title & bills required"),
        (status = 403, description = "Employees only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reimbursement"
)]
pub async fn create_reimbursement(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateReimbursement>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.require_employee()?;
    let payload = payload.into_inner();

    if let Some(message) = validate_submission(&payload.title, &payload.bills) {
        return Err(AppError::bad_request(message));
    }

    let total = total_amount(&payload.bills);
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO reimbursements (employee_id, title, description, total_amount, status)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.title.trim())
    .bind(payload.description.as_deref().unwrap_or(""))
    .bind(total)
    .bind(ReimbursementStatus::Pending.as_ref())
    .execute(&mut *tx)
    .await?;

    let reimbursement_id = result.last_insert_id();

    for bill in &payload.bills {
        sqlx::query(
            r#"
            INSERT INTO reimbursement_bills (reimbursement_id, file_url, amount, note)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(reimbursement_id)
        .bind(bill.file_url.trim())
        .bind(bill.amount)
        .bind(bill.note.as_deref().unwrap_or(""))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await.map_err(|e| {
        error!(error = %e, employee_id, "Failed to commit reimbursement");
        AppError::from(e)
    })?;

    info!(reimbursement_id, employee_id, bills = payload.bills.len(), total, "Reimbursement submitted");

    let row = fetch_claim(pool.get_ref(), reimbursement_id).await?;
    let mut views = load_views(pool.get_ref(), vec![row], false).await?;
    let view = views
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("reimbursement {reimbursement_id} vanished")))?;

    Ok(HttpResponse::Created().json(view))
}

/* =========================
Employee: my list
========================= */
#[utoipa::path(
    get,
    path = "/api/reimbursement/me",
    responses(
        (status = 200, description = "Caller's claims, newest first", body = [ReimbursementView]),
        (status = 403, description = "Employees only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reimbursement"
)]
pub async fn my_reimbursements(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.require_employee()?;

    let rows = sqlx::query_as::<_, ReimbursementRow>(&format!(
        "SELECT {REIMBURSEMENT_COLUMNS} FROM reimbursements \
         WHERE employee_id = ? AND is_employee_deleted = FALSE ORDER BY created_at DESC"
    ))
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await?;

    let list = load_views(pool.get_ref(), rows, false).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "list": list })))
}

/* =========================
Employee: hide from own list
========================= */
#[utoipa::path(
    delete,
    path = "/api/reimbursement/me/{id}",
    params(("id" = u64, Path, description = "Reimbursement ID")),
    responses(
        (status = 200, description = "Removed from your list"),
        (status = 403, description = "Not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Reimbursement"
)]
pub async fn employee_delete(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.require_employee()?;
    let id = path.into_inner();

    let result = sqlx::query(
        "UPDATE reimbursements SET is_employee_deleted = TRUE WHERE id = ? AND employee_id = ?",
    )
    .bind(id)
    .bind(employee_id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        // also covers a repeat delete, which MySQL counts as unchanged
        let owned = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reimbursements WHERE id = ? AND employee_id = ?",
        )
        .bind(id)
        .bind(employee_id)
        .fetch_one(pool.get_ref())
        .await?;
        if owned == 0 {
            return Err(AppError::forbidden("Unauthorized access"));
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Removed from your list"
    })))
}

/* =========================
Manager: department claims
========================= */
#[utoipa::path(
    get,
    path = "/api/reimbursement/manager",
    responses(
        (status = 200, description = "Claims of employees in managed departments", body = [ReimbursementView]),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Reimbursement"
)]
pub async fn manager_reimbursements(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> AppResult<HttpResponse> {
    let scope = managed_scope(&auth, pool.get_ref()).await?;

    let mut sql = format!("SELECT {REIMBURSEMENT_COLUMNS} FROM reimbursements");
    let mut ids = Vec::new();
    if let Some((fragment, scoped)) = scope.sql_filter("employee_id") {
        sql.push_str(" WHERE ");
        sql.push_str(&fragment);
        ids = scoped;
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut q = sqlx::query_as::<_, ReimbursementRow>(&sql);
    for id in ids {
        q = q.bind(id);
    }
    let rows = q.fetch_all(pool.get_ref()).await?;

    let list = load_views(pool.get_ref(), rows, true).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "list": list })))
}

/* =========================
Admin: everything not hidden by an admin
========================= */
#[utoipa::path(
    get,
    path = "/api/reimbursement/all",
    responses(
        (status = 200, description = "All claims, newest first", body = [ReimbursementView]),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reimbursement"
)]
pub async fn all_reimbursements(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let rows = sqlx::query_as::<_, ReimbursementRow>(&format!(
        "SELECT {REIMBURSEMENT_COLUMNS} FROM reimbursements \
         WHERE is_admin_deleted = FALSE ORDER BY created_at DESC"
    ))
    .fetch_all(pool.get_ref())
    .await?;

    let list = load_views(pool.get_ref(), rows, true).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "list": list })))
}

#[utoipa::path(
    delete,
    path = "/api/reimbursement/admin/{id}",
    params(("id" = u64, Path, description = "Reimbursement ID")),
    responses(
        (status = 200, description = "Removed from admin list"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Reimbursement not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reimbursement"
)]
pub async fn admin_delete(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let id = path.into_inner();

    fetch_claim(pool.get_ref(), id).await?;

    sqlx::query("UPDATE reimbursements SET is_admin_deleted = TRUE WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Removed from admin list"
    })))
}

/* =========================
Admin / manager: approve or reject
========================= */
#[utoipa::path(
    patch,
    path = "/api/reimbursement/{id}/status",
    params(("id" = u64, Path, description = "Reimbursement ID")),
    request_body = ReviewReimbursement,
    responses(
        (status = 200, description = "Reimbursement reviewed", body = Object, example = json!({
            "success": true,
            "message": "Reimbursement approved"
        })),
        (status = 400, description = "Invalid status"),
        (status = 403, description = "Manager has no access to this employee"),
        (status = 404, description = "Reimbursement not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reimbursement"
)]
pub async fn update_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<ReviewReimbursement>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let body = body.into_inner();

    let (status, reject_reason) = review_outcome(body.status, body.reason)?;
    let claim = fetch_claim(pool.get_ref(), id).await?;

    ensure_can_review(&auth, pool.get_ref(), claim.employee_id).await?;

    sqlx::query("UPDATE reimbursements SET status = ?, reject_reason = ? WHERE id = ?")
        .bind(status.as_ref())
        .bind(reject_reason.as_deref())
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, reimbursement_id = id, "Failed to update reimbursement status");
            AppError::from(e)
        })?;

    info!(reimbursement_id = id, reviewer = auth.user_id, %status, "Reimbursement reviewed");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Reimbursement {}", status.as_ref().to_lowercase())
    })))
}
