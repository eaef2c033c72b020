use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult, is_duplicate_key, is_missing_reference},
    model::{
        employee::Employee,
        role::{Company, Role},
    },
    utils::db_utils::{build_update_sql, execute_update},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, last_name, email, phone, \
     department_id, position, hire_date, status";

/// Columns a partial update may touch.
const UPDATABLE: [&str; 9] = [
    "employee_code",
    "first_name",
    "last_name",
    "email",
    "phone",
    "department_id",
    "position",
    "hire_date",
    "status",
];

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "AGL-014")]
    pub employee_code: String,
    #[schema(example = "Kabir")]
    pub first_name: String,
    #[schema(example = "Rao")]
    pub last_name: Option<String>,
    #[schema(example = "kabir.rao@agility.in", format = "email")]
    pub email: String,
    #[schema(example = "+919900112233")]
    pub phone: Option<String>,
    #[schema(example = 1)]
    pub department_id: Option<u64>,
    #[schema(example = "QA Engineer")]
    pub position: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    /// Employees whose account belongs to this company
    pub company: Option<Company>,
    pub status: Option<String>,
    /// Matches first name, last name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 57)]
    pub total: i64,
}

/// Partial update; only the fields present are written.
#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub employee_code: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department_id: Option<u64>,
    pub position: Option<String>,
    pub status: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub hire_date: Option<NaiveDate>,
}

enum Binding {
    U64(u64),
    U8(u8),
    Str(String),
}

fn employee_filters(query: &EmployeeQuery) -> (String, Vec<Binding>) {
    let mut conditions = Vec::new();
    let mut bindings = Vec::new();

    if let Some(department_id) = query.department_id {
        conditions.push("department_id = ?");
        bindings.push(Binding::U64(department_id));
    }

    if let Some(company) = query.company {
        conditions.push(
            "EXISTS (SELECT 1 FROM users u WHERE u.employee_id = employees.id AND u.role_id = ?)",
        );
        bindings.push(Binding::U8(Role::for_company(company).id()));
    }

    if let Some(status) = &query.status {
        conditions.push("status = ?");
        bindings.push(Binding::Str(status.clone()));
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("(first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)");
        let like = format!("%{search}%");
        bindings.push(Binding::Str(like.clone()));
        bindings.push(Binding::Str(like.clone()));
        bindings.push(Binding::Str(like));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bindings)
}

fn write_error(e: sqlx::Error) -> AppError {
    if is_duplicate_key(&e) {
        return AppError::Conflict("Employee code or email already in use".into());
    }
    if is_missing_reference(&e) {
        return AppError::bad_request("Unknown department");
    }
    error!(error = %e, "Failed to write employee");
    AppError::from(e)
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created successfully", body = Object, example = json!({
            "success": true,
            "id": 14
        })),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Employee code or email already in use")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let result = sqlx::query(
        r#"
        INSERT INTO employees
        (employee_code, first_name, last_name, email, phone, department_id, position, hire_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.employee_code)
    .bind(&payload.first_name)
    .bind(payload.last_name.as_deref())
    .bind(&payload.email)
    .bind(payload.phone.as_deref())
    .bind(payload.department_id)
    .bind(payload.position.as_deref())
    .bind(payload.hire_date)
    .execute(pool.get_ref())
    .await
    .map_err(write_error)?;

    let id = result.last_insert_id();
    info!(employee_id = id, code = %payload.employee_code, "Employee created");

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "id": id
    })))
}

#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 403, description = "Admin only")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let (where_clause, bindings) = employee_filters(&query);

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) as total FROM employees {where_clause}");
    debug!(sql = %count_sql, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = match b {
            Binding::U64(v) => count_query.bind(*v),
            Binding::U8(v) => count_query.bind(*v),
            Binding::Str(v) => count_query.bind(v.as_str()),
        };
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count employees");
        AppError::from(e)
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees {where_clause} ORDER BY id DESC LIMIT ? OFFSET ?"
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
    for b in &bindings {
        data_query = match b {
            Binding::U64(v) => data_query.bind(*v),
            Binding::U8(v) => data_query.bind(*v),
            Binding::Str(v) => data_query.bind(v.as_str()),
        };
    }

    let employees = data_query
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, sql = %data_sql, "Failed to fetch employees");
            AppError::from(e)
        })?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated successfully", body = Object, example = json!({
            "success": true,
            "message": "Employee updated successfully"
        })),
        (status = 400, description = "Unknown or unsupported field"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    let update = build_update_sql("employees", &UPDATABLE, &body, "id", employee_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(write_error)?;

    // MySQL reports 0 for unchanged rows too
    if affected == 0 {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE id = ?")
            .bind(employee_id)
            .fetch_one(pool.get_ref())
            .await?;
        if exists == 0 {
            return Err(AppError::not_found("Employee not found"));
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Employee updated successfully"
    })))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "success": true,
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    let res = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to delete employee");
            AppError::from(e)
        })?;

    if res.rows_affected() == 0 {
        return Err(AppError::not_found("Employee not found"));
    }

    info!(employee_id, "Employee deleted");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Successfully deleted"
    })))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "success": false,
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let employee_id: u64 = path.into_inner();

    let employee = sqlx::query_as::<_, Employee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?"
    ))
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch employee");
        AppError::from(e)
    })?;

    employee
        .map(|emp| HttpResponse::Ok().json(emp))
        .ok_or_else(|| AppError::not_found("Employee not found"))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LinkAccount {
    /// Registered user account to attach to the employee
    #[schema(example = 5)]
    pub user_id: u64,
}

fn link_error(e: sqlx::Error, employee_id: u64) -> AppError {
    if is_duplicate_key(&e) {
        return AppError::Conflict("Employee already has an account".into());
    }
    if is_missing_reference(&e) {
        return AppError::not_found("Employee not found");
    }
    error!(error = %e, employee_id, "Failed to link account");
    AppError::from(e)
}

/// Link a user account to an employee record
///
/// The link shows up in tokens issued after the next login.
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}/account",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body = LinkAccount,
    responses(
        (status = 200, description = "Account linked", body = Object, example = json!({
            "success": true,
            "message": "Account linked"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee or user not found"),
        (status = 409, description = "Employee or account already linked")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn link_account(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<LinkAccount>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let employee_id = path.into_inner();
    let user_id = body.user_id;

    // admin accounts never carry an employee profile
    let current = sqlx::query_scalar::<_, Option<u64>>(
        "SELECT employee_id FROM users WHERE id = ? AND role_id <> ?",
    )
    .bind(user_id)
    .bind(Role::Admin.id())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("User not found"))?;

    match current {
        Some(linked) if linked == employee_id => {}
        Some(_) => {
            return Err(AppError::Conflict(
                "Account is already linked to another employee".into(),
            ));
        }
        None => {
            let result = sqlx::query(
                "UPDATE users SET employee_id = ? WHERE id = ? AND employee_id IS NULL",
            )
            .bind(employee_id)
            .bind(user_id)
            .execute(pool.get_ref())
            .await
            .map_err(|e| link_error(e, employee_id))?;

            // linked by someone else since the read above
            if result.rows_affected() == 0 {
                return Err(AppError::Conflict(
                    "Account is already linked to another employee".into(),
                ));
            }
        }
    }

    info!(employee_id, user_id, "Account linked");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Account linked"
    })))
}
