use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult, is_duplicate_key, is_missing_reference};
use crate::model::payroll::{Payroll, net_salary};

const PAYROLL_COLUMNS: &str =
    "id, employee_id, salary_month, base_salary, bonus, deductions, net_salary";

#[derive(Deserialize, ToSchema)]
pub struct CreatePayroll {
    #[schema(example = 1001)]
    pub employee_id: u64,

    /// First day of the month being paid
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub salary_month: NaiveDate,

    #[schema(example = 50000.0)]
    pub base_salary: f64,

    #[schema(example = 5000.0)]
    #[serde(default)]
    pub bonus: f64,

    #[schema(example = 2000.0)]
    #[serde(default)]
    pub deductions: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePayroll {
    #[schema(example = 52000.0)]
    pub base_salary: Option<f64>,

    #[schema(example = 6000.0)]
    pub bonus: Option<f64>,

    #[schema(example = 2500.0)]
    pub deductions: Option<f64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PayrollQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,

    #[schema(example = 10)]
    pub per_page: Option<u32>,

    #[schema(example = 1001)]
    pub employee_id: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedPayrollResponse {
    pub data: Vec<Payroll>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

fn check_amounts(amounts: &[f64]) -> AppResult<()> {
    if amounts.iter().any(|a| !a.is_finite() || *a < 0.0) {
        return Err(AppError::bad_request("Amounts must be non-negative numbers"));
    }
    Ok(())
}

/// Current row with the requested fields replaced and net salary recomputed.
fn apply_update(current: &Payroll, body: &UpdatePayroll) -> Payroll {
    let base_salary = body.base_salary.unwrap_or(current.base_salary);
    let bonus = body.bonus.unwrap_or(current.bonus);
    let deductions = body.deductions.unwrap_or(current.deductions);

    Payroll {
        base_salary,
        bonus,
        deductions,
        net_salary: net_salary(base_salary, bonus, deductions),
        ..current.clone()
    }
}

fn create_error(e: sqlx::Error, employee_id: u64) -> AppError {
    if is_duplicate_key(&e) {
        return AppError::Conflict("Payroll for that month already exists".into());
    }
    if is_missing_reference(&e) {
        return AppError::not_found("Employee not found");
    }
    error!(error = %e, employee_id, "Failed to create payroll");
    AppError::from(e)
}

async fn fetch_payroll(pool: &MySqlPool, payroll_id: u64) -> AppResult<Option<Payroll>> {
    sqlx::query_as::<_, Payroll>(&format!("SELECT {PAYROLL_COLUMNS} FROM payroll WHERE id = ?"))
        .bind(payroll_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, payroll_id, "Failed to fetch payroll");
            AppError::from(e)
        })
}

#[utoipa::path(
    post,
    path = "/api/payroll",
    request_body = CreatePayroll,
    responses(
        (status = 201, description = "Payroll created", body = Object, example = json!({
            "success": true,
            "id": 31,
            "net_salary": 53000.0
        })),
        (status = 400, description = "Negative or non-numeric amount"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Payroll for that month already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn create_payroll(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePayroll>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    check_amounts(&[payload.base_salary, payload.bonus, payload.deductions])?;

    let net_salary = net_salary(payload.base_salary, payload.bonus, payload.deductions);

    let result = sqlx::query(
        r#"
        INSERT INTO payroll
        (employee_id, salary_month, base_salary, bonus, deductions, net_salary)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.salary_month)
    .bind(payload.base_salary)
    .bind(payload.bonus)
    .bind(payload.deductions)
    .bind(net_salary)
    .execute(pool.get_ref())
    .await
    .map_err(|e| create_error(e, payload.employee_id))?;

    let id = result.last_insert_id();
    info!(payroll_id = id, employee_id = payload.employee_id, "Payroll created");

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "id": id,
        "net_salary": net_salary
    })))
}

#[utoipa::path(
    put,
    path = "/api/payroll/{payroll_id}",
    request_body = UpdatePayroll,
    params(
        ("payroll_id", description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Payroll updated", body = Payroll),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Payroll not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn update_payroll(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdatePayroll>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let payroll_id = path.into_inner();

    let current = fetch_payroll(pool.get_ref(), payroll_id)
        .await?
        .ok_or_else(|| AppError::not_found("Payroll record not found"))?;

    let updated = apply_update(&current, &body);
    check_amounts(&[updated.base_salary, updated.bonus, updated.deductions])?;

    sqlx::query(
        r#"
        UPDATE payroll
        SET base_salary = ?, bonus = ?, deductions = ?, net_salary = ?
        WHERE id = ?
        "#,
    )
    .bind(updated.base_salary)
    .bind(updated.bonus)
    .bind(updated.deductions)
    .bind(updated.net_salary)
    .bind(payroll_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, payroll_id, "Failed to update payroll");
        AppError::from(e)
    })?;

    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    get,
    path = "/api/payroll/{payroll_id}",
    params(
        ("payroll_id", description = "Payroll ID")
    ),
    responses(
        (status = 200, body = Payroll),
        (status = 404, description = "Payroll not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let payroll_id = path.into_inner();

    fetch_payroll(pool.get_ref(), payroll_id)
        .await?
        .map(|p| HttpResponse::Ok().json(p))
        .ok_or_else(|| AppError::not_found("Payroll not found"))
}

#[utoipa::path(
    get,
    path = "/api/payroll",
    params(PayrollQuery),
    responses(
        (status = 200, body = PaginatedPayrollResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payrolls(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PayrollQuery>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM payroll WHERE (? IS NULL OR employee_id = ?)",
    )
    .bind(query.employee_id)
    .bind(query.employee_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to count payrolls");
        AppError::from(e)
    })?;

    let data = sqlx::query_as::<_, Payroll>(&format!(
        "SELECT {PAYROLL_COLUMNS} FROM payroll \
         WHERE (? IS NULL OR employee_id = ?) \
         ORDER BY salary_month DESC LIMIT ? OFFSET ?"
    ))
    .bind(query.employee_id)
    .bind(query.employee_id)
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch payroll list");
        AppError::from(e)
    })?;

    Ok(HttpResponse::Ok().json(PaginatedPayrollResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::fake_db::{ErrorKind, constraint_error};

    fn current() -> Payroll {
        Payroll {
            id: 4,
            employee_id: 12,
            salary_month: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            base_salary: 40_000.0,
            bonus: 1_000.0,
            deductions: 500.0,
            net_salary: 40_500.0,
        }
    }

    #[test]
    fn update_recomputes_net_salary() {
        let body = UpdatePayroll {
            base_salary: None,
            bonus: Some(4_000.0),
            deductions: None,
        };

        let updated = apply_update(&current(), &body);
        assert_eq!(updated.base_salary, 40_000.0);
        assert_eq!(updated.net_salary, 43_500.0);
        assert_eq!(updated.id, 4);
        assert_eq!(updated.salary_month, current().salary_month);
    }

    #[test]
    fn amounts_must_be_non_negative() {
        assert!(check_amounts(&[1.0, 0.0]).is_ok());
        assert!(check_amounts(&[1.0, -0.5]).is_err());
        assert!(check_amounts(&[f64::INFINITY]).is_err());
    }

    #[test]
    fn unknown_employee_is_not_a_duplicate_month() {
        let duplicate = create_error(constraint_error(ErrorKind::UniqueViolation), 12);
        assert!(matches!(duplicate, AppError::Conflict(_)));

        let orphan = create_error(constraint_error(ErrorKind::ForeignKeyViolation), 999);
        assert!(matches!(orphan, AppError::NotFound(ref m) if m == "Employee not found"));
    }

    #[test]
    fn bonus_and_deductions_default_to_zero() {
        let body: CreatePayroll = serde_json::from_str(
            r#"{"employee_id": 3, "salary_month": "2026-04-01", "base_salary": 30000}"#,
        )
        .unwrap();
        assert_eq!((body.bonus, body.deductions), (0.0, 0.0));
    }
}
