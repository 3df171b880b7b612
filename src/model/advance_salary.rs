use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AdvanceStatus {
    Pending,
    Approved,
    Rejected,
    /// Settled against a payslip.
    Deducted,
}

/// Salary advance scheduled for deduction in `deduct_month`/`deduct_year`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdvanceSalary {
    pub id: u64,
    pub employee_id: u64,
    pub company_id: u64,
    #[schema(value_type = String, example = "50000")]
    pub amount: Decimal,
    pub status: AdvanceStatus,
    pub deduct_month: u32,
    pub deduct_year: i32,
}
