use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySqlPool, types::Json};
use std::str::FromStr;

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
    payslip::{NewPayslip, PaymentDetails, Payslip, PayslipFilter, PayslipKey, PayslipStatus, StatusChange},
    policy::Policy,
};
use crate::payroll::{calculator::PayBreakdown, error::StoreError};
use crate::utils::period::{DateRange, Period};

const PAYSLIP_COLUMNS: &str = "id, employee_id, company_id, month, year, basic_salary, breakdown, \
     status, payment, generated_by, created_at, updated_at";

/// sqlx-backed store over the MySQL schema in `migrations/`.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn parse_enum<T: FromStr>(column: &str, value: &str) -> StoreResult<T> {
    T::from_str(value).map_err(|_| StoreError::Corrupt(format!("unexpected {column} '{value}'")))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U32(u32),
    I32(i32),
    U64(u64),
    Str(&'a str),
}

/// WHERE clause shared by the payslip list and count queries.
fn payslip_filter<'a>(
    company_id: u64,
    filter: &PayslipFilter,
    status: Option<&'a str>,
) -> (String, Vec<FilterValue<'a>>) {
    let mut where_sql = String::from(" WHERE company_id = ?");
    let mut args = vec![FilterValue::U64(company_id)];

    if let Some(month) = filter.month {
        where_sql.push_str(" AND month = ?");
        args.push(FilterValue::U32(month));
    }
    if let Some(year) = filter.year {
        where_sql.push_str(" AND year = ?");
        args.push(FilterValue::I32(year));
    }
    if let Some(status) = status {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }
    if let Some(employee_id) = filter.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(employee_id));
    }

    (where_sql, args)
}

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    employee_id: u64,
    company_id: u64,
    date: NaiveDate,
    status: String,
    work_hours: Decimal,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            company_id: row.company_id,
            date: row.date,
            status: parse_enum::<AttendanceStatus>("attendance status", &row.status)?,
            work_hours: row.work_hours,
        })
    }
}

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    company_id: u64,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_days: Decimal,
    status: String,
}

impl TryFrom<LeaveRow> for LeaveRecord {
    type Error = StoreError;

    fn try_from(row: LeaveRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            company_id: row.company_id,
            leave_type: row.leave_type,
            start_date: row.start_date,
            end_date: row.end_date,
            total_days: row.total_days,
            status: parse_enum::<ApprovalStatus>("leave status", &row.status)?,
        })
    }
}

#[derive(FromRow)]
struct OvertimeRow {
    id: u64,
    employee_id: u64,
    company_id: u64,
    date: NaiveDate,
    hours: Decimal,
    overtime_type: String,
    status: String,
}

impl TryFrom<OvertimeRow> for OvertimeRecord {
    type Error = StoreError;

    fn try_from(row: OvertimeRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            company_id: row.company_id,
            date: row.date,
            hours: row.hours,
            overtime_type: row.overtime_type,
            status: parse_enum::<ApprovalStatus>("overtime status", &row.status)?,
        })
    }
}

#[derive(FromRow)]
struct AdvanceRow {
    id: u64,
    employee_id: u64,
    company_id: u64,
    amount: Decimal,
    status: String,
    deduct_month: u32,
    deduct_year: i32,
}

impl TryFrom<AdvanceRow> for AdvanceSalary {
    type Error = StoreError;

    fn try_from(row: AdvanceRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            company_id: row.company_id,
            amount: row.amount,
            status: parse_enum::<AdvanceStatus>("advance status", &row.status)?,
            deduct_month: row.deduct_month,
            deduct_year: row.deduct_year,
        })
    }
}

#[derive(FromRow)]
struct PayslipRow {
    id: u64,
    employee_id: u64,
    company_id: u64,
    month: u32,
    year: i32,
    basic_salary: Decimal,
    breakdown: Json<PayBreakdown>,
    status: String,
    payment: Option<Json<PaymentDetails>>,
    generated_by: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PayslipRow> for Payslip {
    type Error = StoreError;

    fn try_from(row: PayslipRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            company_id: row.company_id,
            month: row.month,
            year: row.year,
            basic_salary: row.basic_salary,
            breakdown: row.breakdown.0,
            status: parse_enum::<PayslipStatus>("payslip status", &row.status)?,
            payment: row.payment.map(|p| p.0),
            generated_by: row.generated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl EmployeeStore for MySqlStore {
    async fn employee_in_company(&self, employee_id: u64, company_id: u64) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE id = ? AND company_id = ?")
            .bind(employee_id)
            .bind(company_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn attendance_between(
        &self,
        employee_id: u64,
        company_id: u64,
        range: DateRange,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, employee_id, company_id, date, status, work_hours
            FROM attendance
            WHERE employee_id = ? AND company_id = ? AND date BETWEEN ? AND ?
            "#,
        )
        .bind(employee_id)
        .bind(company_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }
}

#[async_trait]
impl LeaveStore for MySqlStore {
    async fn approved_leave_between(
        &self,
        employee_id: u64,
        company_id: u64,
        range: DateRange,
    ) -> StoreResult<Vec<LeaveRecord>> {
        let rows = sqlx::query_as::<_, LeaveRow>(
            r#"
            SELECT id, employee_id, company_id, leave_type, start_date, end_date, total_days, status
            FROM leave_requests
            WHERE employee_id = ? AND company_id = ? AND status = 'approved'
              AND start_date BETWEEN ? AND ?
            "#,
        )
        .bind(employee_id)
        .bind(company_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }
}

#[async_trait]
impl OvertimeStore for MySqlStore {
    async fn approved_overtime_between(
        &self,
        employee_id: u64,
        company_id: u64,
        range: DateRange,
    ) -> StoreResult<Vec<OvertimeRecord>> {
        let rows = sqlx::query_as::<_, OvertimeRow>(
            r#"
            SELECT id, employee_id, company_id, date, hours, overtime_type, status
            FROM overtime_requests
            WHERE employee_id = ? AND company_id = ? AND status = 'approved'
              AND date BETWEEN ? AND ?
            "#,
        )
        .bind(employee_id)
        .bind(company_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }
}

#[async_trait]
impl AdvanceSalaryStore for MySqlStore {
    async fn approved_advances_for(
        &self,
        employee_id: u64,
        company_id: u64,
        period: Period,
    ) -> StoreResult<Vec<AdvanceSalary>> {
        let rows = sqlx::query_as::<_, AdvanceRow>(
            r#"
            SELECT id, employee_id, company_id, amount, status, deduct_month, deduct_year
            FROM advance_salaries
            WHERE employee_id = ? AND company_id = ? AND status = 'approved'
              AND deduct_month = ? AND deduct_year = ?
            ORDER BY id
            "#,
        )
        .bind(employee_id)
        .bind(company_id)
        .bind(period.month())
        .bind(period.year())
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }
}

#[async_trait]
impl PolicyStore for MySqlStore {
    async fn get_or_create(&self, company_id: u64, default: Policy) -> StoreResult<Policy> {
        let select = "SELECT policy FROM pay_policies WHERE company_id = ?";

        let existing: Option<Json<Policy>> = sqlx::query_scalar(select)
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(Json(policy)) = existing {
            return Ok(policy);
        }

        // a concurrent creator may win; IGNORE keeps its row and we read it back
        sqlx::query("INSERT IGNORE INTO pay_policies (company_id, policy) VALUES (?, ?)")
            .bind(company_id)
            .bind(Json(&default))
            .execute(&self.pool)
            .await?;

        let Json(policy) = sqlx::query_scalar::<_, Json<Policy>>(select)
            .bind(company_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(policy)
    }

    async fn save_policy(&self, policy: &Policy) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pay_policies (company_id, policy) VALUES (?, ?)
            ON DUPLICATE KEY UPDATE policy = VALUES(policy)
            "#,
        )
        .bind(policy.company_id)
        .bind(Json(policy))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PayslipStore for MySqlStore {
    async fn payslip_exists(&self, key: PayslipKey) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM payslips WHERE employee_id = ? AND company_id = ? AND month = ? AND year = ?",
        )
        .bind(key.employee_id)
        .bind(key.company_id)
        .bind(key.month)
        .bind(key.year)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn commit_payslip(&self, new: NewPayslip, advance_ids: &[u64]) -> StoreResult<Payslip> {
        // dropping `tx` on any early return rolls the whole unit back
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO payslips
            (employee_id, company_id, month, year, basic_salary, gross_pay, total_deductions,
             net_pay, breakdown, status, payment, generated_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'draft', NULL, ?, ?, ?)
            "#,
        )
        .bind(new.key.employee_id)
        .bind(new.key.company_id)
        .bind(new.key.month)
        .bind(new.key.year)
        .bind(new.basic_salary)
        .bind(new.breakdown.gross_pay)
        .bind(new.breakdown.total_deductions)
        .bind(new.breakdown.net_pay)
        .bind(Json(&new.breakdown))
        .bind(new.generated_by)
        .bind(new.created_at)
        .bind(new.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate
            } else {
                StoreError::Database(e)
            }
        })?;
        let id = inserted.last_insert_id();

        if !advance_ids.is_empty() {
            let placeholders = vec!["?"; advance_ids.len()].join(", ");
            let sql = format!(
                "UPDATE advance_salaries SET status = 'deducted' \
                 WHERE company_id = ? AND status = 'approved' AND id IN ({placeholders})"
            );

            let mut update = sqlx::query(&sql).bind(new.key.company_id);
            for advance_id in advance_ids {
                update = update.bind(*advance_id);
            }
            let settled = update.execute(&mut *tx).await?.rows_affected();

            if settled != advance_ids.len() as u64 {
                return Err(StoreError::StaleAdvance {
                    expected: advance_ids.len(),
                    settled,
                });
            }
        }

        tx.commit().await?;

        Ok(Payslip {
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
        })
    }

    async fn find_payslip(&self, id: u64, company_id: u64) -> StoreResult<Option<Payslip>> {
        let sql = format!("SELECT {PAYSLIP_COLUMNS} FROM payslips WHERE id = ? AND company_id = ?");
        sqlx::query_as::<_, PayslipRow>(&sql)
            .bind(id)
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Payslip::try_from)
            .transpose()
    }

    async fn list_payslips(&self, company_id: u64, filter: &PayslipFilter) -> StoreResult<Vec<Payslip>> {
        let status = filter.status.map(|s| s.to_string());
        let (where_sql, args) = payslip_filter(company_id, filter, status.as_deref());
        let sql = format!(
            "SELECT {PAYSLIP_COLUMNS} FROM payslips{where_sql} ORDER BY year DESC, month DESC, id DESC LIMIT ? OFFSET ?"
        );

        let mut query = sqlx::query_as::<_, PayslipRow>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::U32(v) => query.bind(v),
                FilterValue::I32(v) => query.bind(v),
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Str(s) => query.bind(s),
            };
        }

        let rows = query
            .bind(filter.per_page())
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn count_payslips(&self, company_id: u64, filter: &PayslipFilter) -> StoreResult<i64> {
        let status = filter.status.map(|s| s.to_string());
        let (where_sql, args) = payslip_filter(company_id, filter, status.as_deref());
        let sql = format!("SELECT COUNT(*) FROM payslips{where_sql}");

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::U32(v) => query.bind(v),
                FilterValue::I32(v) => query.bind(v),
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Str(s) => query.bind(s),
            };
        }

        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn list_employee_payslips(&self, employee_id: u64, company_id: u64) -> StoreResult<Vec<Payslip>> {
        let sql = format!(
            "SELECT {PAYSLIP_COLUMNS} FROM payslips WHERE employee_id = ? AND company_id = ? ORDER BY year DESC, month DESC"
        );
        let rows = sqlx::query_as::<_, PayslipRow>(&sql)
            .bind(employee_id)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn transition_payslip(&self, change: StatusChange) -> StoreResult<Option<Payslip>> {
        let updated = sqlx::query(
            r#"
            UPDATE payslips
            SET status = ?, payment = COALESCE(?, payment), updated_at = ?
            WHERE id = ? AND company_id = ? AND status = ?
            "#,
        )
        .bind(change.to.to_string())
        .bind(change.payment.as_ref().map(Json))
        .bind(change.at)
        .bind(change.id)
        .bind(change.company_id)
        .bind(change.from.to_string())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_payslip(change.id, change.company_id).await
    }
}
