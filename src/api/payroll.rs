use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::ErrorBody;
use crate::auth::auth::AuthUser;
use crate::model::payslip::{PaymentInput, Payslip, PayslipFilter, PayslipPage};
use crate::payroll::calculator::{AllowancesInput, ManualDeductions};
use crate::payroll::{GeneratePayroll, PayrollError, PayslipLedger};

#[derive(Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct GeneratePayslipRequest {
    #[schema(example = 1001)]
    pub employee_id: u64,

    #[schema(example = 3)]
    pub month: u32,

    #[schema(example = 2025)]
    pub year: i32,

    #[schema(example = "300000")]
    pub basic_salary: Decimal,

    #[serde(default)]
    pub allowances: AllowancesInput,

    #[serde(default)]
    pub deductions: ManualDeductions,
}

#[derive(Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct FailPayslipRequest {
    #[schema(example = "Wallet rejected the transfer")]
    pub reason: String,
}

#[utoipa::path(
    post,
    path = "/api/payroll/generate",
    request_body = GeneratePayslipRequest,
    responses(
        (status = 201, description = "Draft payslip created", body = Payslip),
        (status = 400, body = ErrorBody),
        (status = 401),
        (status = 403, body = ErrorBody),
        (status = 404, description = "Employee not in this company", body = ErrorBody),
        (status = 409, description = "Payslip already exists for the period", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn generate_payroll(
    auth: AuthUser,
    ledger: web::Data<PayslipLedger>,
    payload: web::Json<GeneratePayslipRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_owner()?;

    let payload = payload.into_inner();
    let payslip = ledger
        .generate(GeneratePayroll {
            employee_id: payload.employee_id,
            company_id: auth.company_id,
            month: payload.month,
            year: payload.year,
            basic_salary: payload.basic_salary,
            allowances: payload.allowances,
            manual_deductions: payload.deductions,
            generated_by: auth.user_id,
            at: Utc::now(),
        })
        .await?;

    Ok(HttpResponse::Created().json(payslip))
}

#[utoipa::path(
    get,
    path = "/api/payroll",
    params(PayslipFilter),
    responses(
        (status = 200, body = PayslipPage),
        (status = 403, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payslips(
    auth: AuthUser,
    ledger: web::Data<PayslipLedger>,
    query: web::Query<PayslipFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_owner()?;

    let page = ledger.list(auth.company_id, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/payroll/my",
    responses(
        (status = 200, body = Vec<Payslip>),
        (status = 403, description = "User is not linked to an employee", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn my_payslips(
    auth: AuthUser,
    ledger: web::Data<PayslipLedger>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth
        .employee_id
        .ok_or_else(|| PayrollError::Forbidden("user is not linked to an employee".into()))?;

    let payslips = ledger.list_for_employee(employee_id, auth.company_id).await?;
    Ok(HttpResponse::Ok().json(payslips))
}

#[utoipa::path(
    get,
    path = "/api/payroll/{payslip_id}",
    params(
        ("payslip_id", description = "Payslip ID")
    ),
    responses(
        (status = 200, body = Payslip),
        (status = 403, body = ErrorBody),
        (status = 404, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payslip(
    auth: AuthUser,
    ledger: web::Data<PayslipLedger>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let payslip = ledger.get(path.into_inner(), auth.company_id).await?;

    let own = auth.employee_id == Some(payslip.employee_id);
    if auth.is_employee() && !own {
        return Err(PayrollError::Forbidden("payslip belongs to another employee".into()).into());
    }

    Ok(HttpResponse::Ok().json(payslip))
}

#[utoipa::path(
    put,
    path = "/api/payroll/{payslip_id}/confirm",
    params(
        ("payslip_id", description = "Payslip ID")
    ),
    responses(
        (status = 200, body = Payslip),
        (status = 404, body = ErrorBody),
        (status = 409, description = "Payslip is not a draft", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn confirm_payroll(
    auth: AuthUser,
    ledger: web::Data<PayslipLedger>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_owner()?;

    let payslip = ledger
        .confirm(path.into_inner(), auth.company_id, Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(payslip))
}

#[utoipa::path(
    put,
    path = "/api/payroll/{payslip_id}/pay",
    request_body = PaymentInput,
    params(
        ("payslip_id", description = "Payslip ID")
    ),
    responses(
        (status = 200, body = Payslip),
        (status = 404, body = ErrorBody),
        (status = 409, description = "Payslip already paid or failed", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn mark_paid(
    auth: AuthUser,
    ledger: web::Data<PayslipLedger>,
    path: web::Path<u64>,
    body: web::Json<PaymentInput>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_owner()?;

    let payslip = ledger
        .mark_paid(
            path.into_inner(),
            auth.company_id,
            body.into_inner(),
            auth.user_id,
            Utc::now(),
        )
        .await?;
    tracing::info!(
        payslip_id = payslip.id,
        paid_by = %auth.username,
        "Payslip marked paid"
    );
    Ok(HttpResponse::Ok().json(payslip))
}

#[utoipa::path(
    put,
    path = "/api/payroll/{payslip_id}/fail",
    request_body = FailPayslipRequest,
    params(
        ("payslip_id", description = "Payslip ID")
    ),
    responses(
        (status = 200, body = Payslip),
        (status = 400, body = ErrorBody),
        (status = 409, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn mark_failed(
    auth: AuthUser,
    ledger: web::Data<PayslipLedger>,
    path: web::Path<u64>,
    body: web::Json<FailPayslipRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_owner()?;

    let reason = body.into_inner().reason.trim().to_string();
    if reason.is_empty() {
        return Err(PayrollError::Validation("reason is required".into()).into());
    }

    let payslip = ledger
        .mark_failed(path.into_inner(), auth.company_id, reason, auth.user_id, Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(payslip))
}
