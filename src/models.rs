use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Company;

/// Self-service sign-up. Linking the account to an employee record is an
/// admin action (`PUT /api/employee/{id}/account`), so unknown fields such as
/// `employee_id` are rejected.
#[derive(Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RegisterReq {
    #[schema(example = "riya.sen")]
    pub username: String,
    #[schema(example = "s3cret-passw0rd")]
    pub password: String,
    /// Company of the new employee account
    pub company: Company,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "riya.sen")]
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_accepts_credentials_and_company() {
        let req: RegisterReq = serde_json::from_str(
            r#"{"username": "riya.sen", "password": "pw", "company": "lyfshilp"}"#,
        )
        .unwrap();
        assert_eq!(req.company, Company::Lyfshilp);
    }

    #[test]
    fn register_cannot_claim_an_employee_record() {
        let attempt = serde_json::from_str::<RegisterReq>(
            r#"{"username": "riya.sen", "password": "pw", "company": "agility", "employee_id": 3}"#,
        );
        assert!(attempt.is_err());
    }
}
