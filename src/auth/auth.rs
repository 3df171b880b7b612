use crate::config::Config;
use crate::models::{Claims, TokenType};
use crate::{model::role::Role, payroll::PayrollError};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};

use super::jwt::verify_token;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
    pub company_id: u64,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    pub fn from_claims(claims: Claims) -> Result<Self, &'static str> {
        if claims.token_type != TokenType::Access {
            return Err("Access token required");
        }
        let role = Role::from_id(claims.role).ok_or("Invalid role")?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            company_id: claims.company_id,
            employee_id: claims.employee_id,
        })
    }

    pub fn require_hr_or_owner(&self) -> Result<(), PayrollError> {
        if self.role.is_elevated() {
            Ok(())
        } else {
            Err(PayrollError::Forbidden("HR/Owner only".into()))
        }
    }

    /// Returns true if the user is an employee
    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by the auth middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(
                    actix_web::error::ErrorInternalServerError("Config missing"),
                ))
            }
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) => c,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        ready(AuthUser::from_claims(claims).map_err(ErrorUnauthorized))
    }
}
