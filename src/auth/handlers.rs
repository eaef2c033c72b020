use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

use crate::{
    auth::{
        auth::bearer_token,
        jwt::{Subject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{AppError, AppResult, is_duplicate_key},
    model::{role::Role, user::UserRow},
    models::{Claims, LoginReqDto, RegisterReq, TokenPair, TokenType},
    utils::username_index,
};

fn token_error(e: jsonwebtoken::errors::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("token signing failed: {e}"))
}

/// Issues an access/refresh pair and persists the refresh `jti`.
async fn issue_pair(
    executor: impl sqlx::MySqlExecutor<'_>,
    subject: &Subject,
    config: &Config,
) -> AppResult<TokenPair> {
    let access_token =
        generate_access_token(subject, &config.jwt_secret, config.access_token_ttl).map_err(token_error)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl).map_err(token_error)?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(subject.user_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(executor)
    .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Verifies a presented refresh token; anything else is a 401.
fn refresh_claims(req: &HttpRequest, config: &Config) -> AppResult<Claims> {
    let token = bearer_token(req).ok_or(AppError::Unauthorized)?;
    let claims = verify_token(token, &config.jwt_secret).map_err(|_| AppError::Unauthorized)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized);
    }
    Ok(claims)
}

/* =========================
Register
========================= */
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = Object, example = json!({
            "success": true,
            "message": "User registered successfully"
        })),
        (status = 400, description = "Missing username or password"),
        (status = 409, description = "Username already taken")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(pool, user), fields(username = %user.username))]
pub async fn register(
    user: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
) -> AppResult<HttpResponse> {
    let username = username_index::normalize(&user.username);

    if username.is_empty() || user.password.is_empty() {
        return Err(AppError::bad_request("Username and password must not be empty"));
    }

    if !username_index::is_available(pool.get_ref(), &username).await? {
        return Err(AppError::Conflict("Username already taken".into()));
    }

    let hashed = hash_password(&user.password)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))?;
    let role = Role::for_company(user.company);

    // employee_id stays NULL until an admin links the account
    sqlx::query("INSERT INTO users (username, password, role_id) VALUES (?, ?, ?)")
        .bind(&username)
        .bind(&hashed)
        .bind(role.id())
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::Conflict("Username already exists".into())
            } else {
                AppError::from(e)
            }
        })?;

    username_index::record(&username).await;
    info!(%role, "User registered");

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "User registered successfully"
    })))
}

/* =========================
Login
========================= */
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    info!("Login request received");

    let username = username_index::normalize(&user.username);
    if username.is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::bad_request("Username or password required"));
    }

    let db_user = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, username, password, role_id, employee_id, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(&username)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Database error while fetching user");
        AppError::from(e)
    })?;

    let Some(db_user) = db_user else {
        info!("Invalid credentials: user not found");
        return Err(AppError::Unauthorized);
    };

    if !db_user.is_active {
        info!(user_id = db_user.id, "Login refused: account disabled");
        return Err(AppError::Unauthorized);
    }

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized);
    }

    let subject = Subject {
        user_id: db_user.id,
        username: db_user.username,
        role: db_user.role_id,
        employee_id: db_user.employee_id,
    };
    let pair = issue_pair(pool.get_ref(), &subject, &config).await?;

    // feeds the username index warmup; a failure here must not block login
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(subject.user_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = subject.user_id, "Login successful");
    Ok(HttpResponse::Ok().json(pair))
}

/* =========================
Refresh (rotates the refresh token)
========================= */
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token missing, expired or revoked")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[instrument(name = "auth_refresh", skip_all)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let claims = refresh_claims(&req, &config)?;

    let mut tx = pool.begin().await?;

    // revoking and checking in one statement stops a token being rotated twice
    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE jti = ? AND user_id = ? AND revoked = FALSE AND expires_at > NOW()
        "#,
    )
    .bind(&claims.jti)
    .bind(claims.user_id)
    .execute(&mut *tx)
    .await?;

    if revoked.rows_affected() == 0 {
        info!(user_id = claims.user_id, "Refresh refused: token unknown or revoked");
        return Err(AppError::Unauthorized);
    }

    let pair = issue_pair(&mut *tx, &Subject::from(&claims), &config).await?;
    tx.commit().await?;

    debug!(user_id = claims.user_id, "Refresh token rotated");
    Ok(HttpResponse::Ok().json(pair))
}

/* =========================
Logout
========================= */
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked (always succeeds)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    // logout is idempotent: bad or missing tokens still get 204
    let Ok(claims) = refresh_claims(&req, &config) else {
        return HttpResponse::NoContent().finish();
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, user_id = claims.user_id, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}
