use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::accounting::{DayEntry, YearWindow, year_timeline};
use crate::api::leave_request::{YearQuery, fetch_leaves_for_year};
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult, is_duplicate_key, is_missing_reference};
use crate::model::attendance::{AttendanceRecord, AttendanceRow, AttendanceStatus};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckInReq {
    /// PRESENT or WFH; defaults to PRESENT
    pub status: Option<AttendanceStatus>,
}

/// LEAVE days come from approved leave requests, never from a check-in.
fn check_in_status(requested: Option<AttendanceStatus>) -> AppResult<AttendanceStatus> {
    match requested.unwrap_or_default() {
        AttendanceStatus::Leave => Err(AppError::bad_request(
            "Invalid status. Allowed: PRESENT, WFH",
        )),
        status => Ok(status),
    }
}

fn check_in_error(e: sqlx::Error, employee_id: u64) -> AppError {
    // one row per employee per day
    if is_duplicate_key(&e) {
        return AppError::bad_request("Already checked in today");
    }
    if is_missing_reference(&e) {
        return AppError::not_found("Employee not found");
    }
    tracing::error!(error = %e, employee_id, "Check-in failed");
    AppError::from(e)
}

pub async fn fetch_attendance_for_year(
    pool: &MySqlPool,
    employee_id: u64,
    year: i32,
) -> AppResult<Vec<AttendanceRecord>> {
    let window = YearWindow::new(year)?;

    let rows = sqlx::query_as::<_, AttendanceRow>(
        r#"
        SELECT id, employee_id, date, check_in, check_out, status
        FROM attendance
        WHERE employee_id = ? AND date BETWEEN ? AND ?
        ORDER BY date ASC
        "#,
    )
    .bind(employee_id)
    .bind(window.first())
    .bind(window.last())
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, employee_id, year, "Failed to fetch attendance");
        AppError::from(e)
    })?;

    rows.into_iter()
        .map(|row| AttendanceRecord::try_from(row).map_err(AppError::from))
        .collect()
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body(content = CheckInReq, description = "Optional day status", content_type = "application/json"),
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "success": true,
            "message": "Checked in successfully"
        })),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "success": false,
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: Option<web::Json<CheckInReq>>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.employee_id()?;
    let status = check_in_status(body.and_then(|b| b.into_inner().status))?;

    sqlx::query(
        r#"
        INSERT INTO attendance (employee_id, date, check_in, status)
        VALUES (?, CURDATE(), CURTIME(), ?)
        "#,
    )
    .bind(employee_id)
    .bind(status.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| check_in_error(e, employee_id))?;

    tracing::info!(employee_id, %status, "Checked in");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Checked in successfully"
    })))
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "success": true,
            "message": "Checked out successfully"
        })),
        (status = 400, description = "No active check-in found for today", body = Object, example = json!({
            "success": false,
            "message": "No active check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    let employee_id = auth.employee_id()?;

    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = CURTIME()
        WHERE employee_id = ?
        AND date = CURDATE()
        AND check_out IS NULL
        "#,
    )
    .bind(employee_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, employee_id, "Check-out failed");
        AppError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::bad_request("No active check-in found for today"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Checked out successfully"
    })))
}

/// Day-by-day view of the caller's year: check-ins plus approved leave and WFH.
#[utoipa::path(
    get,
    path = "/api/attendance/me",
    params(YearQuery),
    responses(
        (status = 200, description = "Merged timeline, ascending by date", body = [DayEntry]),
        (status = 400, description = "Unsupported year"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_timeline(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<YearQuery>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.employee_id()?;
    let year = query.resolve();
    let window = YearWindow::new(year)?;

    let attendance = fetch_attendance_for_year(pool.get_ref(), employee_id, year).await?;
    let leaves = fetch_leaves_for_year(pool.get_ref(), employee_id, year).await?;

    let timeline: Vec<DayEntry> = year_timeline(&attendance, &leaves, &window);

    Ok(HttpResponse::Ok().json(timeline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::fake_db::{ErrorKind, constraint_error};

    #[test]
    fn check_in_defaults_to_present() {
        assert_eq!(check_in_status(None).unwrap(), AttendanceStatus::Present);
        assert_eq!(
            check_in_status(Some(AttendanceStatus::Wfh)).unwrap(),
            AttendanceStatus::Wfh
        );
    }

    #[test]
    fn leave_is_not_a_check_in_status() {
        assert!(matches!(
            check_in_status(Some(AttendanceStatus::Leave)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn check_in_for_unknown_employee_is_not_a_repeat() {
        let repeat = check_in_error(constraint_error(ErrorKind::UniqueViolation), 4);
        assert!(matches!(repeat, AppError::BadRequest(ref m) if m == "Already checked in today"));

        let orphan = check_in_error(constraint_error(ErrorKind::ForeignKeyViolation), 4);
        assert!(matches!(orphan, AppError::NotFound(_)));
    }

    #[test]
    fn check_in_body_parses_uppercase_status() {
        let body: CheckInReq = serde_json::from_str(r#"{"status":"WFH"}"#).unwrap();
        assert_eq!(body.status, Some(AttendanceStatus::Wfh));

        let empty: CheckInReq = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.status, None);
    }
}
