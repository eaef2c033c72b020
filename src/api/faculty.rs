//! Freelance faculty and the managers they report to. Admin only.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult, is_duplicate_key, is_missing_reference};
use crate::model::faculty::{FacultyManager, FacultyStatus, FreelanceFaculty, validate_contact};

const FACULTY_COLUMNS: &str =
    "id, manager_id, name, email, phone, subject, status, created_at";

#[derive(Deserialize, ToSchema)]
pub struct CreateFacultyManager {
    #[schema(example = "Neha Kapoor")]
    pub name: String,
    #[schema(example = "neha.kapoor@lyfshilp.in")]
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AssignFaculty {
    #[schema(example = 2)]
    pub manager_id: u64,
    #[schema(example = "Vikram Iyer")]
    pub name: String,
    #[schema(example = "vikram.iyer@gmail.com")]
    pub email: String,
    pub phone: Option<String>,
    #[schema(example = "Data Structures")]
    pub subject: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct FacultyFilter {
    /// Only faculty with this status
    pub status: Option<FacultyStatus>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateFacultyStatus {
    pub status: FacultyStatus,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangeFacultyManager {
    #[schema(example = 3)]
    pub manager_id: u64,
}

fn write_error(e: sqlx::Error, missing: &'static str) -> AppError {
    if is_duplicate_key(&e) {
        return AppError::Conflict("Email already registered".into());
    }
    // the only foreign key is faculty -> manager
    if is_missing_reference(&e) {
        return AppError::not_found(missing);
    }
    error!(error = %e, "Faculty write failed");
    AppError::from(e)
}

fn check_contact(name: &str, email: &str) -> AppResult<()> {
    match validate_contact(name, email) {
        Some(message) => Err(AppError::bad_request(message)),
        None => Ok(()),
    }
}

async fn manager_exists(pool: &MySqlPool, manager_id: u64) -> AppResult<bool> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM faculty_managers WHERE id = ?")
        .bind(manager_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/* =========================
Create manager
========================= */
#[utoipa::path(
    post,
    path = "/api/faculty/managers",
    request_body = CreateFacultyManager,
    responses(
        (status = 201, description = "Faculty manager created", body = Object, example = json!({
            "success": true,
            "id": 2
        })),
        (status = 400, description = "Name and email are required"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn create_manager(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateFacultyManager>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    check_contact(&payload.name, &payload.email)?;

    let result = sqlx::query("INSERT INTO faculty_managers (name, email, phone) VALUES (?, ?, ?)")
        .bind(payload.name.trim())
        .bind(payload.email.trim())
        .bind(payload.phone.as_deref())
        .execute(pool.get_ref())
        .await
        .map_err(|e| write_error(e, "Faculty manager not found"))?;

    let id = result.last_insert_id();
    info!(manager_id = id, "Faculty manager created");

    Ok(HttpResponse::Created().json(json!({ "success": true, "id": id })))
}

/* =========================
List managers
========================= */
#[utoipa::path(
    get,
    path = "/api/faculty/managers",
    responses(
        (status = 200, description = "Managers with their faculty count", body = [FacultyManager]),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn list_managers(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let list = sqlx::query_as::<_, FacultyManager>(
        r#"
        SELECT m.id, m.name, m.email, m.phone, COUNT(f.id) AS faculty_count, m.created_at
        FROM faculty_managers m
        LEFT JOIN freelance_faculties f ON f.manager_id = m.id
        GROUP BY m.id, m.name, m.email, m.phone, m.created_at
        ORDER BY m.name
        "#,
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "list": list })))
}

/* =========================
Assign a new faculty to a manager
========================= */
#[utoipa::path(
    post,
    path = "/api/faculty",
    request_body = AssignFaculty,
    responses(
        (status = 201, description = "Faculty assigned", body = Object, example = json!({
            "success": true,
            "id": 17
        })),
        (status = 400, description = "Name and email are required"),
        (status = 404, description = "Faculty manager not found"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn assign_faculty(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<AssignFaculty>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    check_contact(&payload.name, &payload.email)?;

    let result = sqlx::query(
        r#"
        INSERT INTO freelance_faculties (manager_id, name, email, phone, subject, status)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.manager_id)
    .bind(payload.name.trim())
    .bind(payload.email.trim())
    .bind(payload.phone.as_deref())
    .bind(payload.subject.as_deref())
    .bind(FacultyStatus::Active.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| write_error(e, "Faculty manager not found"))?;

    let id = result.last_insert_id();
    info!(faculty_id = id, manager_id = payload.manager_id, "Faculty assigned");

    Ok(HttpResponse::Created().json(json!({ "success": true, "id": id })))
}

/* =========================
Faculty under one manager
========================= */
#[utoipa::path(
    get,
    path = "/api/faculty/managers/{manager_id}/faculties",
    params(
        ("manager_id" = u64, Path, description = "Faculty manager ID"),
        FacultyFilter
    ),
    responses(
        (status = 200, description = "Faculty of the manager", body = [FreelanceFaculty]),
        (status = 404, description = "Faculty manager not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn list_faculties(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<FacultyFilter>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let manager_id = path.into_inner();

    if !manager_exists(pool.get_ref(), manager_id).await? {
        return Err(AppError::not_found("Faculty manager not found"));
    }

    let status = query.status.map(|s| s.as_ref().to_string());
    let list = sqlx::query_as::<_, FreelanceFaculty>(&format!(
        "SELECT {FACULTY_COLUMNS} FROM freelance_faculties \
         WHERE manager_id = ? AND (? IS NULL OR status = ?) ORDER BY name"
    ))
    .bind(manager_id)
    .bind(status.as_deref())
    .bind(status.as_deref())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "list": list })))
}

/* =========================
Activate / deactivate
========================= */
#[utoipa::path(
    patch,
    path = "/api/faculty/{faculty_id}/status",
    params(("faculty_id" = u64, Path, description = "Faculty ID")),
    request_body = UpdateFacultyStatus,
    responses(
        (status = 200, description = "Status updated"),
        (status = 404, description = "Faculty not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn update_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateFacultyStatus>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let faculty_id = path.into_inner();

    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM freelance_faculties WHERE id = ?")
        .bind(faculty_id)
        .fetch_one(pool.get_ref())
        .await?;
    if exists == 0 {
        return Err(AppError::not_found("Faculty not found"));
    }

    sqlx::query("UPDATE freelance_faculties SET status = ? WHERE id = ?")
        .bind(body.status.as_ref())
        .bind(faculty_id)
        .execute(pool.get_ref())
        .await?;

    info!(faculty_id, status = %body.status, "Faculty status updated");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Status updated"
    })))
}

/* =========================
Move faculty to another manager
========================= */
#[utoipa::path(
    patch,
    path = "/api/faculty/{faculty_id}/manager",
    params(("faculty_id" = u64, Path, description = "Faculty ID")),
    request_body = ChangeFacultyManager,
    responses(
        (status = 200, description = "Manager changed"),
        (status = 404, description = "Faculty or faculty manager not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Faculty"
)]
pub async fn change_manager(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<ChangeFacultyManager>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let faculty_id = path.into_inner();

    let current = sqlx::query_scalar::<_, u64>("SELECT manager_id FROM freelance_faculties WHERE id = ?")
        .bind(faculty_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("Faculty not found"))?;

    if current != body.manager_id {
        sqlx::query("UPDATE freelance_faculties SET manager_id = ? WHERE id = ?")
            .bind(body.manager_id)
            .bind(faculty_id)
            .execute(pool.get_ref())
            .await
            .map_err(|e| write_error(e, "Faculty manager not found"))?;
    }

    info!(faculty_id, from = current, to = body.manager_id, "Faculty manager changed");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Manager changed"
    })))
}
