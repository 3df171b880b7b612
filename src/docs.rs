use crate::api::ErrorBody;
use crate::api::payroll::{FailPayslipRequest, GeneratePayslipRequest};
use crate::model::advance_salary::{AdvanceSalary, AdvanceStatus};
use crate::model::payslip::{
    PaymentDetails, PaymentInput, PaymentMethod, Payslip, PayslipFilter, PayslipPage, PayslipStatus,
};
use crate::model::policy::{
    ContributionSettings, IncomeTaxSchedule, LatePenaltySettings, LeaveEntitlements, OvertimeRates,
    Policy, PolicyUpdate, TaxBracket,
};
use crate::payroll::aggregate::{LeaveDays, OvertimeHours};
use crate::payroll::calculator::{
    AllowancesInput, AttendanceSummary, Balance, ContributionSplit, Deductions, IncomeTax,
    LeaveBalance, ManualDeductions, OvertimePay, PayBreakdown,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Payroll API",
        version = "1.0.0",
        description = r#"
## Payroll engine of the HRM system

Computes monthly payslips per company from attendance, approved leave,
approved overtime and scheduled salary advances, using the company's pay policy.

### 🔹 Key Features
- **Payslip generation**
  - One payslip per employee and month, advances settled in the same transaction
- **Payslip lifecycle**
  - draft → confirmed → paid, or failed when the payout bounces
- **Pay policy**
  - Overtime multipliers, contribution, late penalty, leave entitlement, income tax brackets

### 🔐 Security
All endpoints require a **JWT Bearer** access token. Payroll runs and policy
edits are limited to **Owner** and **HR**; employees may read their own payslips.

### 📦 Response Format
- Money is serialized as decimal strings
- Errors are `{ "error": <kind>, "message": <text> }`
"#,
    ),
    paths(
        crate::api::payroll::generate_payroll,
        crate::api::payroll::list_payslips,
        crate::api::payroll::my_payslips,
        crate::api::payroll::get_payslip,
        crate::api::payroll::confirm_payroll,
        crate::api::payroll::mark_paid,
        crate::api::payroll::mark_failed,

        crate::api::policy::get_policy,
        crate::api::policy::update_policy
    ),
    components(
        schemas(
            ErrorBody,
            GeneratePayslipRequest,
            FailPayslipRequest,
            AllowancesInput,
            ManualDeductions,
            Payslip,
            PayslipPage,
            PayslipFilter,
            PayslipStatus,
            PaymentInput,
            PaymentDetails,
            PaymentMethod,
            PayBreakdown,
            AttendanceSummary,
            LeaveDays,
            OvertimeHours,
            OvertimePay,
            ContributionSplit,
            IncomeTax,
            Deductions,
            Balance,
            LeaveBalance,
            AdvanceSalary,
            AdvanceStatus,
            Policy,
            PolicyUpdate,
            OvertimeRates,
            ContributionSettings,
            LatePenaltySettings,
            LeaveEntitlements,
            IncomeTaxSchedule,
            TaxBracket
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Payroll", description = "Payslip generation and lifecycle APIs"),
        (name = "Policy", description = "Company pay policy APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_payroll_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/payroll/generate"));
        assert!(doc.paths.paths.contains_key("/api/payroll/{payslip_id}/pay"));
        assert!(doc.paths.paths.contains_key("/api/policy"));
    }
}
