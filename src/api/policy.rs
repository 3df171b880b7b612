use actix_web::{HttpResponse, Responder, web};

use crate::api::ErrorBody;
use crate::auth::auth::AuthUser;
use crate::model::policy::{Policy, PolicyUpdate};
use crate::payroll::PolicyResolver;

#[utoipa::path(
    get,
    path = "/api/policy",
    responses(
        (status = 200, description = "Effective pay policy of the caller's company", body = Policy),
        (status = 403, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Policy"
)]
pub async fn get_policy(
    auth: AuthUser,
    resolver: web::Data<PolicyResolver>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_owner()?;

    let policy = resolver.resolve(auth.company_id).await?;
    Ok(HttpResponse::Ok().json(policy.as_ref()))
}

#[utoipa::path(
    put,
    path = "/api/policy",
    request_body = PolicyUpdate,
    responses(
        (status = 200, body = Policy),
        (status = 400, description = "Unknown field or invalid value", body = ErrorBody),
        (status = 403, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Policy"
)]
pub async fn update_policy(
    auth: AuthUser,
    resolver: web::Data<PolicyResolver>,
    body: web::Json<PolicyUpdate>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_owner()?;

    let policy = resolver.update(auth.company_id, body.into_inner()).await?;
    tracing::info!(company_id = auth.company_id, user_id = auth.user_id, "Pay policy updated");
    Ok(HttpResponse::Ok().json(policy))
}
