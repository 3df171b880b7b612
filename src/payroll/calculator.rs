//! Pure payroll arithmetic. No I/O and no clock: the same inputs always
//! produce the same breakdown.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::leave_request::LeaveType;
use crate::model::policy::{Policy, TaxBracket};
use crate::payroll::aggregate::{LeaveDays, OvertimeHours, PeriodFacts};
use crate::payroll::error::PayrollError;
use crate::utils::money::{checked_sum, round_currency, round_two_places};

const HOURS_PER_DAY: Decimal = dec!(8);
const MONTHS_PER_YEAR: Decimal = dec!(12);
const HUNDRED: Decimal = dec!(100);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct AllowancesInput {
    pub transport: Decimal,
    pub meal: Decimal,
    pub housing: Decimal,
    pub phone: Decimal,
    pub position: Decimal,
    pub other: Decimal,
}

impl AllowancesInput {
    /// `None` if the sum leaves the `Decimal` range.
    pub fn total(&self) -> Option<Decimal> {
        checked_sum(self.entries().map(|(_, amount)| amount))
    }

    pub(crate) fn entries(&self) -> [(&'static str, Decimal); 6] {
        [
            ("transport", self.transport),
            ("meal", self.meal),
            ("housing", self.housing),
            ("phone", self.phone),
            ("position", self.position),
            ("other", self.other),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ManualDeductions {
    pub loan: Decimal,
    pub other: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSummary {
    pub working_days: u32,
    pub present_days: u32,
    pub late_days: u32,
    pub leave_days: Decimal,
    pub absent_days: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OvertimePay {
    /// Display only; pay is computed from the unrounded rate.
    pub hourly_rate: Decimal,
    pub hours: OvertimeHours,
    pub normal: Decimal,
    pub holiday: Decimal,
    pub weekend: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContributionSplit {
    pub base: Decimal,
    pub employee: Decimal,
    pub employer: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IncomeTax {
    pub annual_income: Decimal,
    pub annual_tax: Decimal,
    pub monthly: Decimal,
    pub effective_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Deductions {
    pub contribution: Decimal,
    pub income_tax: Decimal,
    pub late_penalty: Decimal,
    pub absent_penalty: Decimal,
    pub advance: Decimal,
    pub loan: Decimal,
    pub other: Decimal,
}

impl Deductions {
    pub fn total(&self) -> Option<Decimal> {
        checked_sum([
            self.contribution,
            self.income_tax,
            self.late_penalty,
            self.absent_penalty,
            self.advance,
            self.loan,
            self.other,
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Balance {
    pub total: Decimal,
    pub used: Decimal,
    /// May go negative when leave was approved past the entitlement.
    pub remaining: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveBalance {
    pub casual: Balance,
    pub earned: Balance,
    pub sick: Balance,
    pub maternity: Balance,
    pub paternity: Balance,
    pub unclassified_used: Decimal,
}

/// Snapshot of every figure that went into a payslip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PayBreakdown {
    pub attendance: AttendanceSummary,
    pub leave: LeaveDays,
    pub overtime: OvertimePay,
    pub allowances: AllowancesInput,
    pub total_allowances: Decimal,
    pub gross_pay: Decimal,
    pub contribution: ContributionSplit,
    pub income_tax: IncomeTax,
    pub deductions: Deductions,
    pub total_deductions: Decimal,
    /// Not clamped: deductions above gross yield a negative net.
    pub net_pay: Decimal,
    pub leave_balance: LeaveBalance,
    pub settled_advances: Vec<u64>,
}

pub fn calculate(
    basic_salary: Decimal,
    facts: &PeriodFacts,
    allowances: &AllowancesInput,
    manual: &ManualDeductions,
    policy: &Policy,
) -> Result<PayBreakdown, PayrollError> {
    policy
        .validate()
        .map_err(|e| PayrollError::InvariantViolation(format!("policy of company {}: {e}", policy.company_id)))?;

    let working_days = Decimal::from(policy.working_days_per_month);

    let overtime = overtime_pay(basic_salary, working_days, &facts.overtime, policy)?;
    let total_allowances = allowances.total().ok_or_else(|| out_of_range("total allowances"))?;
    let gross_pay = checked_sum([basic_salary, total_allowances, overtime.total])
        .ok_or_else(|| out_of_range("gross pay"))?;

    let contribution = contribution(basic_salary, policy)?;
    let income_tax = income_tax(gross_pay, &policy.income_tax.brackets)?;

    let late_penalty = if policy.late_penalty.enabled {
        Decimal::from(facts.late_days)
            .checked_mul(policy.late_penalty.penalty_per_late)
            .ok_or_else(|| out_of_range("late penalty"))?
            .min(policy.late_penalty.monthly_cap)
    } else {
        Decimal::ZERO
    };

    let absent_days = facts.absent_days(policy.working_days_per_month);
    let absent_penalty = if absent_days > Decimal::ZERO {
        absent_days
            .checked_mul(basic_salary)
            .and_then(|v| v.checked_div(working_days))
            .map(round_currency)
            .ok_or_else(|| out_of_range("absent penalty"))?
    } else {
        Decimal::ZERO
    };

    let deductions = Deductions {
        contribution: contribution.employee,
        income_tax: income_tax.monthly,
        late_penalty,
        absent_penalty,
        advance: facts.advance_total(),
        loan: manual.loan,
        other: manual.other,
    };
    let total_deductions = deductions.total().ok_or_else(|| out_of_range("total deductions"))?;
    let net_pay = gross_pay
        .checked_sub(total_deductions)
        .ok_or_else(|| out_of_range("net pay"))?;

    Ok(PayBreakdown {
        attendance: AttendanceSummary {
            working_days: policy.working_days_per_month,
            present_days: facts.present_days,
            late_days: facts.late_days,
            leave_days: facts.leave.total(),
            absent_days,
        },
        leave: facts.leave.clone(),
        overtime,
        allowances: allowances.clone(),
        total_allowances,
        gross_pay,
        contribution,
        income_tax,
        deductions,
        total_deductions,
        net_pay,
        leave_balance: leave_balance(&facts.leave, policy),
        settled_advances: facts.advance_ids(),
    })
}

fn out_of_range(figure: &str) -> PayrollError {
    PayrollError::InvariantViolation(format!("{figure} is outside the representable range"))
}

fn overtime_pay(
    basic: Decimal,
    working_days: Decimal,
    hours: &OvertimeHours,
    policy: &Policy,
) -> Result<OvertimePay, PayrollError> {
    let monthly_hours = working_days * HOURS_PER_DAY;
    let pay = |h: Decimal, multiplier: Decimal| {
        h.checked_mul(basic)
            .and_then(|v| v.checked_mul(multiplier))
            .and_then(|v| v.checked_div(monthly_hours))
            .map(round_currency)
            .ok_or_else(|| out_of_range("overtime pay"))
    };

    let normal = pay(hours.normal, policy.overtime.normal_rate)?;
    let holiday = pay(hours.holiday, policy.overtime.holiday_rate)?;
    let weekend = pay(hours.weekend, policy.overtime.weekend_rate)?;
    let hourly_rate = basic
        .checked_div(monthly_hours)
        .map(round_two_places)
        .ok_or_else(|| out_of_range("hourly rate"))?;

    Ok(OvertimePay {
        hourly_rate,
        hours: hours.clone(),
        normal,
        holiday,
        weekend,
        total: checked_sum([normal, holiday, weekend]).ok_or_else(|| out_of_range("overtime pay"))?,
    })
}

fn contribution(basic: Decimal, policy: &Policy) -> Result<ContributionSplit, PayrollError> {
    let settings = &policy.contribution;
    if !settings.enabled {
        return Ok(ContributionSplit {
            base: Decimal::ZERO,
            employee: Decimal::ZERO,
            employer: Decimal::ZERO,
        });
    }

    let base = basic.min(settings.salary_cap);
    let share = |rate: Decimal| {
        base.checked_mul(rate)
            .map(|v| round_currency(v / HUNDRED))
            .ok_or_else(|| out_of_range("contribution"))
    };
    Ok(ContributionSplit {
        base,
        employee: share(settings.employee_rate)?,
        employer: share(settings.employer_rate)?,
    })
}

/// Marginal tax over the annualised gross. `brackets` must already be validated.
fn income_tax(monthly_gross: Decimal, brackets: &[TaxBracket]) -> Result<IncomeTax, PayrollError> {
    let annual_income = monthly_gross
        .checked_mul(MONTHS_PER_YEAR)
        .ok_or_else(|| out_of_range("annual income"))?;

    let mut annual_tax = Decimal::ZERO;
    let mut floor = Decimal::ZERO;
    for bracket in brackets {
        let top = bracket.up_to.map_or(annual_income, |up_to| up_to.min(annual_income));
        if top > floor {
            annual_tax = (top - floor)
                .checked_mul(bracket.rate)
                .and_then(|slice| annual_tax.checked_add(slice / HUNDRED))
                .ok_or_else(|| out_of_range("income tax"))?;
        }
        match bracket.up_to {
            Some(up_to) if annual_income > up_to => floor = up_to,
            _ => break,
        }
    }

    let effective_rate = if annual_tax.is_zero() || annual_income <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        round_two_places(annual_tax / annual_income * HUNDRED)
    };

    Ok(IncomeTax {
        annual_income,
        annual_tax,
        monthly: round_currency(annual_tax / MONTHS_PER_YEAR),
        effective_rate,
    })
}

fn leave_balance(used: &LeaveDays, policy: &Policy) -> LeaveBalance {
    let entitlement = &policy.leave;
    let balance = |leave_type: LeaveType, total: u32| {
        let total = Decimal::from(total);
        let used = used.used(leave_type);
        Balance {
            total,
            used,
            remaining: total - used,
        }
    };

    LeaveBalance {
        casual: balance(LeaveType::Casual, entitlement.casual),
        earned: balance(LeaveType::Earned, entitlement.earned),
        sick: balance(LeaveType::Sick, entitlement.sick),
        maternity: balance(LeaveType::Maternity, entitlement.maternity),
        paternity: balance(LeaveType::Paternity, entitlement.paternity),
        unclassified_used: used.unclassified,
    }
}
