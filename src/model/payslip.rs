use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};

use crate::payroll::calculator::PayBreakdown;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PayslipStatus {
    Draft,
    Confirmed,
    Paid,
    Failed,
}

impl PayslipStatus {
    /// Forward-only lifecycle. `paid` and `failed` are terminal.
    pub fn can_transition_to(self, next: PayslipStatus) -> bool {
        use PayslipStatus::*;
        matches!(
            (self, next),
            (Draft, Confirmed) | (Draft, Paid) | (Confirmed, Paid) | (Draft, Failed) | (Confirmed, Failed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Kbzpay,
    Wavepay,
    Cbpay,
    Ayapay,
    BankTransfer,
}

/// Payment data supplied when a payslip is marked paid.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PaymentInput {
    #[serde(default)]
    pub method: PaymentMethod,
    #[schema(example = "TXN-2025-0001")]
    pub transaction_id: Option<String>,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    pub note: Option<String>,
}

/// Stamped on the payslip when it leaves the unpaid states. `method` is only
/// set for a payment; a failure carries its reason in `note`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentDetails {
    pub method: Option<PaymentMethod>,
    pub transaction_id: Option<String>,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    pub note: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub processed_by: u64,
}

impl PaymentDetails {
    pub fn paid(input: PaymentInput, paid_by: u64, at: DateTime<Utc>) -> Self {
        Self {
            method: Some(input.method),
            transaction_id: input.transaction_id,
            account_number: input.account_number,
            account_name: input.account_name,
            note: input.note,
            processed_at: at,
            processed_by: paid_by,
        }
    }

    pub fn failed(reason: String, failed_by: u64, at: DateTime<Utc>) -> Self {
        Self {
            method: None,
            transaction_id: None,
            account_number: None,
            account_name: None,
            note: Some(reason),
            processed_at: at,
            processed_by: failed_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Payslip {
    pub id: u64,
    pub employee_id: u64,
    pub company_id: u64,
    pub month: u32,
    pub year: i32,
    pub basic_salary: Decimal,
    pub breakdown: PayBreakdown,
    pub status: PayslipStatus,
    pub payment: Option<PaymentDetails>,
    pub generated_by: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payslip {
    pub fn key(&self) -> PayslipKey {
        PayslipKey {
            employee_id: self.employee_id,
            company_id: self.company_id,
            month: self.month,
            year: self.year,
        }
    }
}

/// A computed payslip that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewPayslip {
    pub key: PayslipKey,
    pub basic_salary: Decimal,
    pub breakdown: PayBreakdown,
    pub generated_by: u64,
    pub created_at: DateTime<Utc>,
}

/// Identity of a payslip: one per employee, tenant and period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PayslipKey {
    pub employee_id: u64,
    pub company_id: u64,
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PayslipFilter {
    #[schema(example = 3)]
    pub month: Option<u32>,
    #[schema(example = 2025)]
    pub year: Option<i32>,
    pub status: Option<PayslipStatus>,
    #[schema(example = 1001)]
    pub employee_id: Option<u64>,
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 10)]
    pub per_page: Option<u32>,
}

impl PayslipFilter {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(10).clamp(1, 100)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.per_page())
    }

    pub fn matches(&self, payslip: &Payslip) -> bool {
        self.month.is_none_or(|m| payslip.month == m)
            && self.year.is_none_or(|y| payslip.year == y)
            && self.status.is_none_or(|s| payslip.status == s)
            && self.employee_id.is_none_or(|e| payslip.employee_id == e)
    }
}

/// Conditional status update: applied only while the payslip is still in `from`.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub id: u64,
    pub company_id: u64,
    pub from: PayslipStatus,
    pub to: PayslipStatus,
    pub payment: Option<PaymentDetails>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PayslipPage {
    pub data: Vec<Payslip>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}
