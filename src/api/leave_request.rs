use actix_web::{HttpResponse, web};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::accounting::{DateRange, LeaveStats, StatsInput, YearWindow};
use crate::api::attendance::fetch_attendance_for_year;
use crate::auth::access::{ensure_can_review, visible_scope};
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::leave_request::{LeaveRequest, LeaveRow, LeaveStatus, LeaveType};

pub(crate) const LEAVE_COLUMNS: &str = "id, employee_id, leave_type, start_date, end_date, status, \
     reason, reject_reason, responsible_person, created_at";

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-02", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family function")]
    pub reason: Option<String>,
    /// Colleague covering while the employee is away
    #[schema(example = "Arjun Mehta")]
    pub responsible_person: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateLeave {
    pub leave_type: Option<LeaveType>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub responsible_person: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewLeave {
    /// APPROVED or REJECTED
    pub action: LeaveStatus,
    /// Stored only when rejecting
    #[schema(example = "Quarter-end release")]
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by employee ID
    #[schema(example = 123)]
    pub employee_id: Option<u64>,
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    /// Filter by leave type
    pub leave_type: Option<LeaveType>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct YearQuery {
    /// Calendar year, defaults to the current one
    #[schema(example = 2026)]
    pub year: Option<i32>,
}

impl YearQuery {
    pub fn resolve(&self) -> i32 {
        self.year.unwrap_or_else(|| Local::now().year())
    }
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRow>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(&'static str),
}

/// Status and reject reason to persist for a review action.
fn review_outcome(
    action: LeaveStatus,
    reason: Option<String>,
) -> AppResult<(LeaveStatus, Option<String>)> {
    match action {
        LeaveStatus::Approved => Ok((LeaveStatus::Approved, None)),
        LeaveStatus::Rejected => {
            let reason = reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty());
            Ok((LeaveStatus::Rejected, reason))
        }
        LeaveStatus::Pending => Err(AppError::bad_request(
            "Invalid action. Allowed: APPROVED, REJECTED",
        )),
    }
}

/// Applies a partial edit and re-validates the date range.
fn apply_update(current: &LeaveRequest, edit: &UpdateLeave) -> AppResult<(LeaveType, DateRange)> {
    let leave_type = edit.leave_type.unwrap_or(current.leave_type);
    let range = DateRange::new(
        edit.start_date.unwrap_or(current.range.start()),
        edit.end_date.unwrap_or(current.range.end()),
    )?;
    Ok((leave_type, range))
}

async fn fetch_leave(pool: &MySqlPool, leave_id: u64) -> AppResult<Option<LeaveRow>> {
    let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ? AND is_deleted = FALSE");

    let row = sqlx::query_as::<_, LeaveRow>(&sql)
        .bind(leave_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, leave_id, "Failed to fetch leave request");
            AppError::from(e)
        })?;

    Ok(row)
}

/// Every live request of one employee touching the given year, including the
/// ones that only partly overlap it.
pub async fn fetch_leaves_for_year(
    pool: &MySqlPool,
    employee_id: u64,
    year: i32,
) -> AppResult<Vec<LeaveRequest>> {
    let window = YearWindow::new(year)?;

    let sql = format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests \
         WHERE employee_id = ? AND is_deleted = FALSE AND start_date <= ? AND end_date >= ? \
         ORDER BY start_date ASC"
    );

    let rows = sqlx::query_as::<_, LeaveRow>(&sql)
        .bind(employee_id)
        .bind(window.last())
        .bind(window.first())
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, employee_id, year, "Failed to fetch leave history");
            AppError::from(e)
        })?;

    rows.into_iter()
        .map(|row| LeaveRequest::try_from(row).map_err(AppError::from))
        .collect()
}

/// Engine output for one employee and year.
pub async fn leave_stats(
    pool: &MySqlPool,
    employee_id: u64,
    year: i32,
    leave_quota: i64,
) -> AppResult<LeaveStats> {
    let leaves = fetch_leaves_for_year(pool, employee_id, year).await?;
    let attendance = fetch_attendance_for_year(pool, employee_id, year).await?;

    let stats = LeaveStats::assemble(&StatsInput {
        year,
        leave_quota,
        attendance: &attendance,
        leaves: &leaves,
    })?;

    debug!(
        employee_id,
        year,
        approved = stats.approved_leaves,
        wfh = stats.wfh_days,
        present = stats.present_days,
        "Leave stats assembled"
    );

    Ok(stats)
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(content = CreateLeave, description = "Leave request payload", content_type = "application/json"),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRow),
        (status = 400, description = "start_date after end_date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.require_employee()?;
    let payload = payload.into_inner();

    let range = DateRange::new(payload.start_date, payload.end_date)
        .map_err(|_| AppError::bad_request("start_date cannot be after end_date"))?;

    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (employee_id, leave_type, start_date, end_date, status, reason, responsible_person)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.leave_type.as_ref())
    .bind(range.start())
    .bind(range.end())
    .bind(LeaveStatus::Pending.as_ref())
    .bind(payload.reason.as_deref())
    .bind(payload.responsible_person.as_deref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, employee_id, "Failed to create leave request");
        AppError::from(e)
    })?;

    let leave_id = result.last_insert_id();
    info!(leave_id, employee_id, leave_type = %payload.leave_type, days = range.days(), "Leave requested");

    let created = fetch_leave(pool.get_ref(), leave_id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("leave {leave_id} vanished after insert")))?;

    Ok(HttpResponse::Created().json(created))
}

/* =========================
List leave requests
========================= */
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> AppResult<HttpResponse> {
    let scope = visible_scope(&auth, pool.get_ref()).await?;

    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE is_deleted = FALSE");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some((fragment, ids)) = scope.sql_filter("employee_id") {
        where_sql.push_str(" AND ");
        where_sql.push_str(&fragment);
        args.extend(ids.into_iter().map(FilterValue::U64));
    }

    if let Some(emp_id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }

    if let Some(status) = query.status {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status.into()));
    }

    if let Some(leave_type) = query.leave_type {
        where_sql.push_str(" AND leave_type = ?");
        args.push(FilterValue::Str(leave_type.into()));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{where_sql}");

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count leave requests");
        AppError::from(e)
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests{where_sql} ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );

    let mut data_q = sqlx::query_as::<_, LeaveRow>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let data = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch leave list");
            AppError::from(e)
        })?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/* =========================
Get one leave request
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to fetch")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRow),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let leave_id = path.into_inner();
    let scope = visible_scope(&auth, pool.get_ref()).await?;

    match fetch_leave(pool.get_ref(), leave_id).await? {
        Some(row) if scope.allows(row.employee_id) => Ok(HttpResponse::Ok().json(row)),
        // out-of-scope rows look missing
        _ => Err(AppError::not_found("Leave request not found")),
    }
}

/* =========================
Edit leave request
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to edit")),
    request_body = UpdateLeave,
    responses(
        (status = 200, description = "Leave request updated", body = LeaveRow),
        (status = 400, description = "Invalid dates or request no longer pending"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn update_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateLeave>,
) -> AppResult<HttpResponse> {
    let leave_id = path.into_inner();

    let row = fetch_leave(pool.get_ref(), leave_id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave request not found"))?;
    let current = LeaveRequest::try_from(row)?;

    if !auth.is_admin() {
        if auth.employee_id()? != current.employee_id {
            return Err(AppError::forbidden("You can only edit your own leave requests"));
        }
        if current.status != LeaveStatus::Pending {
            return Err(AppError::bad_request("Only pending requests can be edited"));
        }
    }

    let (leave_type, range) = apply_update(&current, &body)?;

    sqlx::query(
        r#"
        UPDATE leave_requests
        SET leave_type = ?, start_date = ?, end_date = ?,
            reason = COALESCE(?, reason),
            responsible_person = COALESCE(?, responsible_person)
        WHERE id = ?
        "#,
    )
    .bind(leave_type.as_ref())
    .bind(range.start())
    .bind(range.end())
    .bind(body.reason.as_deref())
    .bind(body.responsible_person.as_deref())
    .bind(leave_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, leave_id, "Update leave failed");
        AppError::from(e)
    })?;

    let updated = fetch_leave(pool.get_ref(), leave_id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave request not found"))?;

    Ok(HttpResponse::Ok().json(updated))
}

/* =========================
Approve / reject (admin or department manager)
========================= */
#[utoipa::path(
    patch,
    path = "/api/leave/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "ID of the leave request to review")),
    request_body = ReviewLeave,
    responses(
        (status = 200, description = "Leave reviewed", body = Object, example = json!({
            "message": "Leave approved"
        })),
        (status = 400, description = "Leave request already processed"),
        (status = 403, description = "Not an admin or the employee's manager"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn review_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<ReviewLeave>,
) -> AppResult<HttpResponse> {
    let leave_id = path.into_inner();
    let body = body.into_inner();

    let row = fetch_leave(pool.get_ref(), leave_id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave request not found"))?;

    ensure_can_review(&auth, pool.get_ref(), row.employee_id).await?;

    let (status, reject_reason) = review_outcome(body.action, body.reason)?;

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?, reject_reason = ?
        WHERE id = ?
        AND status = ?
        "#,
    )
    .bind(status.as_ref())
    .bind(reject_reason.as_deref())
    .bind(leave_id)
    .bind(LeaveStatus::Pending.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, leave_id, "Review leave failed");
        AppError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::bad_request("Leave request already processed"));
    }

    info!(leave_id, reviewer = auth.user_id, %status, "Leave reviewed");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Leave {}", status.as_ref().to_lowercase())
    })))
}

/* =========================
Withdraw leave request
========================= */
#[utoipa::path(
    delete,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to withdraw")),
    responses(
        (status = 200, description = "Leave request withdrawn"),
        (status = 400, description = "Only pending requests can be withdrawn"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let leave_id = path.into_inner();

    let row = fetch_leave(pool.get_ref(), leave_id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave request not found"))?;

    if !auth.is_admin() {
        if auth.employee_id()? != row.employee_id {
            return Err(AppError::forbidden("You can only withdraw your own leave requests"));
        }
        if row.status != LeaveStatus::Pending.as_ref() {
            return Err(AppError::bad_request("Only pending requests can be withdrawn"));
        }
    }

    // rows are flagged, never removed
    sqlx::query("UPDATE leave_requests SET is_deleted = TRUE WHERE id = ?")
        .bind(leave_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, leave_id, "Withdraw leave failed");
            AppError::from(e)
        })?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Leave request withdrawn"
    })))
}

/* =========================
Leave page KPIs for the caller
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/summary",
    params(YearQuery),
    responses(
        (status = 200, description = "Yearly leave and WFH counters", body = LeaveStats),
        (status = 400, description = "Unsupported year"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<YearQuery>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.employee_id()?;
    let stats = leave_stats(
        pool.get_ref(),
        employee_id,
        query.resolve(),
        config.yearly_leave_quota,
    )
    .await?;

    Ok(HttpResponse::Ok().json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn pending_sick() -> LeaveRequest {
        LeaveRequest {
            id: 1,
            employee_id: 2,
            leave_type: LeaveType::Sick,
            status: LeaveStatus::Pending,
            range: DateRange::new(d(2026, 3, 2), d(2026, 3, 4)).unwrap(),
            reason: None,
            reject_reason: None,
            responsible_person: None,
        }
    }

    fn edit() -> UpdateLeave {
        UpdateLeave {
            leave_type: None,
            start_date: None,
            end_date: None,
            reason: None,
            responsible_person: None,
        }
    }

    #[test]
    fn approval_clears_reject_reason() {
        let (status, reason) =
            review_outcome(LeaveStatus::Approved, Some("ignored".into())).unwrap();
        assert_eq!(status, LeaveStatus::Approved);
        assert_eq!(reason, None);
    }

    #[test]
    fn rejection_keeps_trimmed_reason() {
        let (status, reason) =
            review_outcome(LeaveStatus::Rejected, Some("  release week ".into())).unwrap();
        assert_eq!(status, LeaveStatus::Rejected);
        assert_eq!(reason.as_deref(), Some("release week"));

        let (_, blank) = review_outcome(LeaveStatus::Rejected, Some("   ".into())).unwrap();
        assert_eq!(blank, None);
    }

    #[test]
    fn pending_is_not_a_review_action() {
        assert!(matches!(
            review_outcome(LeaveStatus::Pending, None),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn partial_update_keeps_unspecified_fields() {
        let mut change = edit();
        change.end_date = Some(d(2026, 3, 6));

        let (leave_type, range) = apply_update(&pending_sick(), &change).unwrap();
        assert_eq!(leave_type, LeaveType::Sick);
        assert_eq!(range.start(), d(2026, 3, 2));
        assert_eq!(range.days(), 5);
    }

    #[test]
    fn update_cannot_invert_range() {
        let mut change = edit();
        change.start_date = Some(d(2026, 3, 10));

        assert!(matches!(
            apply_update(&pending_sick(), &change),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn year_query_prefers_explicit_year() {
        assert_eq!(YearQuery { year: Some(2019) }.resolve(), 2019);
        assert_eq!(YearQuery { year: None }.resolve(), Local::now().year());
    }
}
