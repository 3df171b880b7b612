use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use utoipa::ToSchema;

use crate::model::{
    advance_salary::AdvanceSalary,
    attendance::{AttendanceRecord, AttendanceStatus},
    leave_request::{LeaveRecord, LeaveType},
    overtime::{OvertimeRecord, OvertimeType},
};
use crate::payroll::error::PayrollError;
use crate::store::HrStore;
use crate::utils::period::Period;

/// Approved leave days per entitlement bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveDays {
    pub casual: Decimal,
    pub earned: Decimal,
    pub sick: Decimal,
    pub maternity: Decimal,
    pub paternity: Decimal,
    /// Leave of any type without an entitlement (unpaid, other, ...).
    pub unclassified: Decimal,
}

impl LeaveDays {
    pub fn total(&self) -> Decimal {
        self.casual + self.earned + self.sick + self.maternity + self.paternity + self.unclassified
    }

    pub fn used(&self, leave_type: LeaveType) -> Decimal {
        match leave_type {
            LeaveType::Casual => self.casual,
            LeaveType::Earned => self.earned,
            LeaveType::Sick => self.sick,
            LeaveType::Maternity => self.maternity,
            LeaveType::Paternity => self.paternity,
        }
    }

    fn add(&mut self, leave_type: &str, days: Decimal) {
        let bucket = match LeaveType::from_str(leave_type.trim()) {
            Ok(LeaveType::Casual) => &mut self.casual,
            Ok(LeaveType::Earned) => &mut self.earned,
            Ok(LeaveType::Sick) => &mut self.sick,
            Ok(LeaveType::Maternity) => &mut self.maternity,
            Ok(LeaveType::Paternity) => &mut self.paternity,
            Err(_) => &mut self.unclassified,
        };
        *bucket += days;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OvertimeHours {
    pub normal: Decimal,
    pub holiday: Decimal,
    pub weekend: Decimal,
}

/// Everything that happened to one employee in one period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodFacts {
    pub present_days: u32,
    pub late_days: u32,
    pub leave: LeaveDays,
    pub overtime: OvertimeHours,
    pub advances: Vec<AdvanceSalary>,
}

impl PeriodFacts {
    pub fn worked_days(&self) -> u32 {
        self.present_days + self.late_days
    }

    /// Never negative, even when worked and leave days exceed the policy.
    pub fn absent_days(&self, working_days: u32) -> Decimal {
        let absent = Decimal::from(working_days) - Decimal::from(self.worked_days()) - self.leave.total();
        absent.max(Decimal::ZERO)
    }

    pub fn advance_total(&self) -> Decimal {
        self.advances.iter().map(|a| a.amount).sum()
    }

    pub fn advance_ids(&self) -> Vec<u64> {
        self.advances.iter().map(|a| a.id).collect()
    }
}

/// Folds raw source rows into period facts.
pub fn fold_facts(
    attendance: &[AttendanceRecord],
    leave: &[LeaveRecord],
    overtime: &[OvertimeRecord],
    advances: Vec<AdvanceSalary>,
) -> PeriodFacts {
    let mut facts = PeriodFacts {
        advances,
        ..Default::default()
    };

    for record in attendance {
        match record.status {
            AttendanceStatus::Present => facts.present_days += 1,
            AttendanceStatus::Late => facts.late_days += 1,
            _ => {}
        }
    }

    for record in leave {
        facts.leave.add(&record.leave_type, record.total_days);
    }

    for record in overtime {
        match OvertimeType::from_str(record.overtime_type.trim()) {
            Ok(OvertimeType::Normal) => facts.overtime.normal += record.hours,
            Ok(OvertimeType::Holiday) => facts.overtime.holiday += record.hours,
            Ok(OvertimeType::Weekend) => facts.overtime.weekend += record.hours,
            Err(_) => warn!(
                overtime_id = record.id,
                overtime_type = %record.overtime_type,
                "Skipping overtime with unknown type"
            ),
        }
    }

    facts
}

pub struct PeriodAggregator {
    store: Arc<dyn HrStore>,
}

impl PeriodAggregator {
    pub fn new(store: Arc<dyn HrStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self), fields(month = period.month(), year = period.year()))]
    pub async fn aggregate(
        &self,
        employee_id: u64,
        company_id: u64,
        period: &Period,
    ) -> Result<PeriodFacts, PayrollError> {
        let range = period.date_range();

        let (attendance, leave, overtime, advances) = futures::try_join!(
            self.store.attendance_between(employee_id, company_id, range),
            self.store.approved_leave_between(employee_id, company_id, range),
            self.store.approved_overtime_between(employee_id, company_id, range),
            self.store.approved_advances_for(employee_id, company_id, *period),
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load period records");
            PayrollError::from(e)
        })?;

        Ok(fold_facts(&attendance, &leave, &overtime, advances))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApprovalStatus, advance_salary::AdvanceStatus};
    use crate::store::memory::MemoryStore;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn attendance(status: AttendanceStatus, d: u32) -> AttendanceRecord {
        AttendanceRecord {
            id: d as u64,
            employee_id: 1,
            company_id: 10,
            date: date(d),
            status,
            work_hours: dec!(8),
        }
    }

    fn leave(leave_type: &str, days: Decimal) -> LeaveRecord {
        LeaveRecord {
            id: 1,
            employee_id: 1,
            company_id: 10,
            leave_type: leave_type.to_string(),
            start_date: date(3),
            end_date: date(3),
            total_days: days,
            status: ApprovalStatus::Approved,
        }
    }

    fn overtime(kind: &str, hours: Decimal) -> OvertimeRecord {
        OvertimeRecord {
            id: 1,
            employee_id: 1,
            company_id: 10,
            date: date(4),
            hours,
            overtime_type: kind.to_string(),
            status: ApprovalStatus::Approved,
        }
    }

    #[test]
    fn test_late_counts_as_worked() {
        let rows = vec![
            attendance(AttendanceStatus::Present, 3),
            attendance(AttendanceStatus::Late, 4),
            attendance(AttendanceStatus::Absent, 5),
            attendance(AttendanceStatus::HalfDay, 6),
        ];
        let facts = fold_facts(&rows, &[], &[], vec![]);
        assert_eq!(facts.present_days, 1);
        assert_eq!(facts.late_days, 1);
        assert_eq!(facts.worked_days(), 2);
    }

    #[test]
    fn test_unknown_leave_type_counts_toward_total() {
        let rows = vec![
            leave("annual", dec!(2)),
            leave("casual", dec!(1)),
            leave("unpaid", dec!(3)),
        ];
        let facts = fold_facts(&[], &rows, &[], vec![]);
        assert_eq!(facts.leave.earned, dec!(2));
        assert_eq!(facts.leave.casual, dec!(1));
        assert_eq!(facts.leave.unclassified, dec!(3));
        assert_eq!(facts.leave.total(), dec!(6));
    }

    #[test]
    fn test_unknown_overtime_type_is_skipped() {
        let rows = vec![
            overtime("normal", dec!(2)),
            overtime("weekend", dec!(3.5)),
            overtime("night", dec!(4)),
        ];
        let facts = fold_facts(&[], &[], &rows, vec![]);
        assert_eq!(facts.overtime.normal, dec!(2));
        assert_eq!(facts.overtime.weekend, dec!(3.5));
        assert_eq!(facts.overtime.holiday, Decimal::ZERO);
    }

    #[test]
    fn test_absent_days_never_negative() {
        let rows: Vec<_> = (1..=25).map(|d| attendance(AttendanceStatus::Present, d)).collect();
        let facts = fold_facts(&rows, &[leave("sick", dec!(2))], &[], vec![]);
        assert_eq!(facts.absent_days(22), Decimal::ZERO);

        let facts = fold_facts(&rows[..18], &[leave("sick", dec!(2))], &[], vec![]);
        assert_eq!(facts.absent_days(22), dec!(2));
    }

    #[actix_web::test]
    async fn test_aggregate_reads_only_the_period() {
        let store = Arc::new(MemoryStore::default());
        store.add_employee(1, 10);
        store.add_attendance(1, 10, date(3), AttendanceStatus::Present);
        store.add_attendance(1, 10, date(31), AttendanceStatus::Late);
        store.add_attendance(1, 10, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(), AttendanceStatus::Present);
        // other tenant
        store.add_attendance(1, 11, date(5), AttendanceStatus::Present);
        store.add_leave(1, 10, "sick", date(10), dec!(1), ApprovalStatus::Approved);
        store.add_leave(1, 10, "casual", date(11), dec!(1), ApprovalStatus::Pending);
        store.add_overtime(1, 10, date(12), dec!(3), "holiday", ApprovalStatus::Approved);
        let due = store.add_advance(1, 10, dec!(50000), AdvanceStatus::Approved, 3, 2025);
        store.add_advance(1, 10, dec!(20000), AdvanceStatus::Approved, 4, 2025);
        store.add_advance(1, 10, dec!(10000), AdvanceStatus::Pending, 3, 2025);

        let aggregator = PeriodAggregator::new(store);
        let facts = aggregator
            .aggregate(1, 10, &Period::new(3, 2025).unwrap())
            .await
            .unwrap();

        assert_eq!(facts.present_days, 1);
        assert_eq!(facts.late_days, 1);
        assert_eq!(facts.leave.sick, dec!(1));
        assert_eq!(facts.leave.casual, Decimal::ZERO);
        assert_eq!(facts.overtime.holiday, dec!(3));
        assert_eq!(facts.advance_ids(), vec![due]);
        assert_eq!(facts.advance_total(), dec!(50000));
    }
}
