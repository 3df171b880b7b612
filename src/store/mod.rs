//! Persistence seams of the payroll core.
//!
//! Source records (attendance, leave, overtime, advances) are owned by other
//! services and only read here, with one exception: settling an advance
//! `approved -> deducted` happens inside [`PayslipStore::commit_payslip`].

use async_trait::async_trait;

use crate::model::{
    advance_salary::AdvanceSalary,
    attendance::AttendanceRecord,
    leave_request::LeaveRecord,
    overtime::OvertimeRecord,
    payslip::{NewPayslip, Payslip, PayslipFilter, PayslipKey, StatusChange},
    policy::Policy,
};
use crate::payroll::error::StoreError;
use crate::utils::period::{DateRange, Period};

#[cfg(test)]
pub mod memory;
pub mod mysql;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    async fn employee_in_company(&self, employee_id: u64, company_id: u64) -> StoreResult<bool>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// All attendance rows in `range`, whatever their status.
    async fn attendance_between(
        &self,
        employee_id: u64,
        company_id: u64,
        range: DateRange,
    ) -> StoreResult<Vec<AttendanceRecord>>;
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    /// Approved leave whose start date falls in `range`.
    async fn approved_leave_between(
        &self,
        employee_id: u64,
        company_id: u64,
        range: DateRange,
    ) -> StoreResult<Vec<LeaveRecord>>;
}

#[async_trait]
pub trait OvertimeStore: Send + Sync {
    async fn approved_overtime_between(
        &self,
        employee_id: u64,
        company_id: u64,
        range: DateRange,
    ) -> StoreResult<Vec<OvertimeRecord>>;
}

#[async_trait]
pub trait AdvanceSalaryStore: Send + Sync {
    /// Approved, not yet deducted advances scheduled for exactly `period`.
    async fn approved_advances_for(
        &self,
        employee_id: u64,
        company_id: u64,
        period: Period,
    ) -> StoreResult<Vec<AdvanceSalary>>;
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Returns the stored policy, inserting `default` first when none exists.
    /// Concurrent callers for one tenant all observe the same row.
    async fn get_or_create(&self, company_id: u64, default: Policy) -> StoreResult<Policy>;

    async fn save_policy(&self, policy: &Policy) -> StoreResult<()>;
}

#[async_trait]
pub trait PayslipStore: Send + Sync {
    async fn payslip_exists(&self, key: PayslipKey) -> StoreResult<bool>;

    /// Inserts the payslip as `draft` and settles `advance_ids` in one unit.
    ///
    /// Fails with [`StoreError::Duplicate`] when the key is taken and with
    /// [`StoreError::StaleAdvance`] when any advance is no longer approved.
    /// Nothing is written in either case.
    async fn commit_payslip(&self, new: NewPayslip, advance_ids: &[u64]) -> StoreResult<Payslip>;

    async fn find_payslip(&self, id: u64, company_id: u64) -> StoreResult<Option<Payslip>>;

    /// Newest period first.
    async fn list_payslips(&self, company_id: u64, filter: &PayslipFilter) -> StoreResult<Vec<Payslip>>;

    async fn count_payslips(&self, company_id: u64, filter: &PayslipFilter) -> StoreResult<i64>;

    async fn list_employee_payslips(&self, employee_id: u64, company_id: u64) -> StoreResult<Vec<Payslip>>;

    /// Applies `change` only if the payslip is still in `change.from`.
    /// `None` means no row matched.
    async fn transition_payslip(&self, change: StatusChange) -> StoreResult<Option<Payslip>>;
}

/// Everything the payroll core needs from persistence.
pub trait HrStore:
    EmployeeStore
    + AttendanceStore
    + LeaveStore
    + OvertimeStore
    + AdvanceSalaryStore
    + PolicyStore
    + PayslipStore
{
}

impl<T> HrStore for T where
    T: EmployeeStore
        + AttendanceStore
        + LeaveStore
        + OvertimeStore
        + AdvanceSalaryStore
        + PolicyStore
        + PayslipStore
{
}
