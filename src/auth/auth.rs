use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, http::header, web::Data};
use futures::future::{Ready, ready};

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::role::Role;
use crate::models::{Claims, TokenType};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Resolves the caller from the `Authorization` header. Only access tokens are accepted.
pub fn authenticate(req: &HttpRequest) -> AppResult<AuthUser> {
    let token = bearer_token(req).ok_or(AppError::Unauthorized)?;

    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Config missing")))?;

    let claims = verify_token(token, &config.jwt_secret).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        AppError::Unauthorized
    })?;

    if claims.token_type != TokenType::Access {
        return Err(AppError::Unauthorized);
    }

    AuthUser::try_from(claims)
}

impl TryFrom<Claims> for AuthUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let role = Role::from_id(claims.role).ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
        })
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // auth_middleware already did the work on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        ready(authenticate(req).map_err(Into::into))
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin only"))
        }
    }

    /// The employee record behind this account, required for self-service endpoints.
    pub fn employee_id(&self) -> AppResult<u64> {
        self.employee_id
            .ok_or_else(|| AppError::forbidden("No employee profile"))
    }

    pub fn require_employee(&self) -> AppResult<u64> {
        if !self.role.is_employee() {
            return Err(AppError::forbidden("Employees only"));
        }
        self.employee_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{Subject, generate_access_token, generate_refresh_token};
    use actix_web::test::TestRequest;

    fn config() -> Config {
        Config {
            database_url: "mysql://localhost/hrms".into(),
            jwt_secret: "unit-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 60,
            refresh_token_ttl: 120,
            rate_login_per_min: 60,
            rate_register_per_min: 30,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            yearly_leave_quota: 21,
            log_dir: "logs".into(),
        }
    }

    fn subject(role: u8) -> Subject {
        Subject {
            user_id: 1,
            username: "riya.sen".into(),
            role,
            employee_id: Some(7),
        }
    }

    #[test]
    fn access_token_resolves_user() {
        let token = generate_access_token(&subject(2), "unit-secret", 60).unwrap();
        let req = TestRequest::default()
            .app_data(Data::new(config()))
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_http_request();

        let user = authenticate(&req).unwrap();
        assert_eq!(user.role, Role::AgilityEmployee);
        assert_eq!(user.employee_id().unwrap(), 7);
        assert!(user.require_admin().is_err());
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let (token, _) = generate_refresh_token(&subject(1), "unit-secret", 60).unwrap();
        let req = TestRequest::default()
            .app_data(Data::new(config()))
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_http_request();

        assert!(matches!(authenticate(&req), Err(AppError::Unauthorized)));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let token = generate_access_token(&subject(9), "unit-secret", 60).unwrap();
        let req = TestRequest::default()
            .app_data(Data::new(config()))
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_http_request();

        assert!(matches!(authenticate(&req), Err(AppError::Unauthorized)));
    }

    #[test]
    fn missing_header_is_unauthorized() {
        let req = TestRequest::default()
            .app_data(Data::new(config()))
            .to_http_request();
        assert!(matches!(authenticate(&req), Err(AppError::Unauthorized)));
    }

    #[test]
    fn admin_has_no_employee_profile() {
        let admin = AuthUser {
            user_id: 1,
            username: "admin".into(),
            role: Role::Admin,
            employee_id: None,
        };
        assert!(admin.require_admin().is_ok());
        assert!(admin.require_employee().is_err());
    }
}
