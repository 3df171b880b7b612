//! In-memory store used by the test suites. One mutex guards all state, so
//! every trait call is atomic the way a database transaction would be.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{
    AdvanceSalaryStore, AttendanceStore, EmployeeStore, LeaveStore, OvertimeStore, PayslipStore,
    PolicyStore, StoreResult,
};
use crate::model::{
    ApprovalStatus,
    advance_salary::{AdvanceSalary, AdvanceStatus},
    attendance::{AttendanceRecord, AttendanceStatus},
    leave_request::LeaveRecord,
    overtime::OvertimeRecord,
    payslip::{NewPayslip, Payslip, PayslipFilter, PayslipKey, PayslipStatus, StatusChange},
    policy::Policy,
};
use crate::payroll::error::StoreError;
use crate::utils::period::{DateRange, Period};

#[derive(Default)]
struct State {
    next_id: u64,
    employees: HashSet<(u64, u64)>,
    attendance: Vec<AttendanceRecord>,
    leave: Vec<LeaveRecord>,
    overtime: Vec<OvertimeRecord>,
    advances: Vec<AdvanceSalary>,
    policies: HashMap<u64, Policy>,
    payslips: Vec<Payslip>,
    /// Applied at the start of the next payslip commit.
    advance_change_on_commit: Option<(u64, AdvanceStatus)>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn set_advance_status(&mut self, id: u64, status: AdvanceStatus) {
        if let Some(advance) = self.advances.iter_mut().find(|a| a.id == id) {
            advance.status = status;
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_employee(&self, employee_id: u64, company_id: u64) {
        self.lock().employees.insert((employee_id, company_id));
    }

    pub fn add_attendance(&self, employee_id: u64, company_id: u64, date: NaiveDate, status: AttendanceStatus) {
        let mut state = self.lock();
        let id = state.next_id();
        state.attendance.push(AttendanceRecord {
            id,
            employee_id,
            company_id,
            date,
            status,
            work_hours: Decimal::from(8),
        });
    }

    pub fn add_leave(
        &self,
        employee_id: u64,
        company_id: u64,
        leave_type: &str,
        start_date: NaiveDate,
        total_days: Decimal,
        status: ApprovalStatus,
    ) {
        let mut state = self.lock();
        let id = state.next_id();
        state.leave.push(LeaveRecord {
            id,
            employee_id,
            company_id,
            leave_type: leave_type.to_string(),
            start_date,
            end_date: start_date,
            total_days,
            status,
        });
    }

    pub fn add_overtime(
        &self,
        employee_id: u64,
        company_id: u64,
        date: NaiveDate,
        hours: Decimal,
        overtime_type: &str,
        status: ApprovalStatus,
    ) {
        let mut state = self.lock();
        let id = state.next_id();
        state.overtime.push(OvertimeRecord {
            id,
            employee_id,
            company_id,
            date,
            hours,
            overtime_type: overtime_type.to_string(),
            status,
        });
    }

    pub fn add_advance(
        &self,
        employee_id: u64,
        company_id: u64,
        amount: Decimal,
        status: AdvanceStatus,
        deduct_month: u32,
        deduct_year: i32,
    ) -> u64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.advances.push(AdvanceSalary {
            id,
            employee_id,
            company_id,
            amount,
            status,
            deduct_month,
            deduct_year,
        });
        id
    }

    /// Changes an advance after aggregation has read it but before the
    /// payslip is committed, the way a concurrent approver would.
    pub fn change_advance_before_commit(&self, id: u64, status: AdvanceStatus) {
        self.lock().advance_change_on_commit = Some((id, status));
    }

    pub fn advance_status(&self, id: u64) -> Option<AdvanceStatus> {
        self.lock().advances.iter().find(|a| a.id == id).map(|a| a.status)
    }

    pub fn put_policy(&self, policy: Policy) {
        self.lock().policies.insert(policy.company_id, policy);
    }

    pub fn policy_count(&self) -> usize {
        self.lock().policies.len()
    }

    pub fn payslip_count(&self) -> usize {
        self.lock().payslips.len()
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn employee_in_company(&self, employee_id: u64, company_id: u64) -> StoreResult<bool> {
        Ok(self.lock().employees.contains(&(employee_id, company_id)))
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn attendance_between(
        &self,
        employee_id: u64,
        company_id: u64,
        range: DateRange,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        Ok(self
            .lock()
            .attendance
            .iter()
            .filter(|r| r.employee_id == employee_id && r.company_id == company_id && range.contains(r.date))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LeaveStore for MemoryStore {
    async fn approved_leave_between(
        &self,
        employee_id: u64,
        company_id: u64,
        range: DateRange,
    ) -> StoreResult<Vec<LeaveRecord>> {
        Ok(self
            .lock()
            .leave
            .iter()
            .filter(|r| {
                r.employee_id == employee_id
                    && r.company_id == company_id
                    && r.status == ApprovalStatus::Approved
                    && range.contains(r.start_date)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OvertimeStore for MemoryStore {
    async fn approved_overtime_between(
        &self,
        employee_id: u64,
        company_id: u64,
        range: DateRange,
    ) -> StoreResult<Vec<OvertimeRecord>> {
        Ok(self
            .lock()
            .overtime
            .iter()
            .filter(|r| {
                r.employee_id == employee_id
                    && r.company_id == company_id
                    && r.status == ApprovalStatus::Approved
                    && range.contains(r.date)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AdvanceSalaryStore for MemoryStore {
    async fn approved_advances_for(
        &self,
        employee_id: u64,
        company_id: u64,
        period: Period,
    ) -> StoreResult<Vec<AdvanceSalary>> {
        Ok(self
            .lock()
            .advances
            .iter()
            .filter(|a| {
                a.employee_id == employee_id
                    && a.company_id == company_id
                    && a.status == AdvanceStatus::Approved
                    && a.deduct_month == period.month()
                    && a.deduct_year == period.year()
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn get_or_create(&self, company_id: u64, default: Policy) -> StoreResult<Policy> {
        Ok(self.lock().policies.entry(company_id).or_insert(default).clone())
    }

    async fn save_policy(&self, policy: &Policy) -> StoreResult<()> {
        self.put_policy(policy.clone());
        Ok(())
    }
}

#[async_trait]
impl PayslipStore for MemoryStore {
    async fn payslip_exists(&self, key: PayslipKey) -> StoreResult<bool> {
        Ok(self.lock().payslips.iter().any(|p| p.key() == key))
    }

    async fn commit_payslip(&self, new: NewPayslip, advance_ids: &[u64]) -> StoreResult<Payslip> {
        let mut state = self.lock();
        if let Some((id, status)) = state.advance_change_on_commit.take() {
            state.set_advance_status(id, status);
        }

        if state.payslips.iter().any(|p| p.key() == new.key) {
            return Err(StoreError::Duplicate);
        }

        let settled = state
            .advances
            .iter()
            .filter(|a| advance_ids.contains(&a.id) && a.status == AdvanceStatus::Approved)
            .count();
        if settled != advance_ids.len() {
            return Err(StoreError::StaleAdvance {
                expected: advance_ids.len(),
                settled: settled as u64,
            });
        }
        for advance in state.advances.iter_mut().filter(|a| advance_ids.contains(&a.id)) {
            advance.status = AdvanceStatus::Deducted;
        }

        let id = state.next_id();
        let payslip = Payslip {
            id,
            employee_id: new.key.employee_id,
            company_id: new.key.company_id,
            month: new.key.month,
            year: new.key.year,
            basic_salary: new.basic_salary,
            breakdown: new.breakdown,
            status: PayslipStatus::Draft,
            payment: None,
            generated_by: new.generated_by,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        state.payslips.push(payslip.clone());
        Ok(payslip)
    }

    async fn find_payslip(&self, id: u64, company_id: u64) -> StoreResult<Option<Payslip>> {
        Ok(self
            .lock()
            .payslips
            .iter()
            .find(|p| p.id == id && p.company_id == company_id)
            .cloned())
    }

    async fn list_payslips(&self, company_id: u64, filter: &PayslipFilter) -> StoreResult<Vec<Payslip>> {
        let mut rows: Vec<Payslip> = self
            .lock()
            .payslips
            .iter()
            .filter(|p| p.company_id == company_id && filter.matches(p))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.year, b.month, b.id).cmp(&(a.year, a.month, a.id)));

        Ok(rows
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.per_page() as usize)
            .collect())
    }

    async fn count_payslips(&self, company_id: u64, filter: &PayslipFilter) -> StoreResult<i64> {
        let count = self
            .lock()
            .payslips
            .iter()
            .filter(|p| p.company_id == company_id && filter.matches(p))
            .count();
        Ok(count as i64)
    }

    async fn list_employee_payslips(&self, employee_id: u64, company_id: u64) -> StoreResult<Vec<Payslip>> {
        let mut rows: Vec<Payslip> = self
            .lock()
            .payslips
            .iter()
            .filter(|p| p.employee_id == employee_id && p.company_id == company_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
        Ok(rows)
    }

    async fn transition_payslip(&self, change: StatusChange) -> StoreResult<Option<Payslip>> {
        let mut state = self.lock();
        let Some(payslip) = state
            .payslips
            .iter_mut()
            .find(|p| p.id == change.id && p.company_id == change.company_id && p.status == change.from)
        else {
            return Ok(None);
        };

        payslip.status = change.to;
        if change.payment.is_some() {
            payslip.payment = change.payment;
        }
        payslip.updated_at = change.at;
        Ok(Some(payslip.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn test_policy_get_or_create_keeps_first_row() {
        let store = MemoryStore::default();
        let mut custom = Policy::defaults_for(5);
        custom.working_days_per_month = 26;

        let first = store.get_or_create(5, custom).await.unwrap();
        let second = store.get_or_create(5, Policy::defaults_for(5)).await.unwrap();

        assert_eq!(first.working_days_per_month, 26);
        assert_eq!(second.working_days_per_month, 26);
        assert_eq!(store.policy_count(), 1);
    }
}
