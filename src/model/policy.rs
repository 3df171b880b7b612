use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct OvertimeRates {
    #[schema(example = "1.5")]
    pub normal_rate: Decimal,
    #[schema(example = "2")]
    pub holiday_rate: Decimal,
    #[schema(example = "2")]
    pub weekend_rate: Decimal,
}

/// Social-security style contribution. Rates are percentages of basic salary,
/// and `salary_cap` is a hard ceiling on the contribution base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ContributionSettings {
    pub enabled: bool,
    #[schema(example = "2")]
    pub employee_rate: Decimal,
    #[schema(example = "3")]
    pub employer_rate: Decimal,
    #[schema(example = "300000")]
    pub salary_cap: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LatePenaltySettings {
    pub enabled: bool,
    #[schema(example = 15)]
    pub grace_minutes: u32,
    #[schema(example = "2000")]
    pub penalty_per_late: Decimal,
    #[schema(example = "50000")]
    pub monthly_cap: Decimal,
}

/// Yearly leave entitlement in days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LeaveEntitlements {
    pub casual: u32,
    pub earned: u32,
    pub sick: u32,
    pub maternity: u32,
    pub paternity: u32,
}

/// One marginal band. `up_to = None` marks the open top band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct TaxBracket {
    #[schema(example = "2000000", nullable = true)]
    pub up_to: Option<Decimal>,
    #[schema(example = "5")]
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct IncomeTaxSchedule {
    pub brackets: Vec<TaxBracket>,
}

static DEFAULT_BRACKETS: Lazy<Vec<TaxBracket>> = Lazy::new(|| {
    vec![
        TaxBracket { up_to: Some(dec!(2000000)), rate: dec!(0) },
        TaxBracket { up_to: Some(dec!(5000000)), rate: dec!(5) },
        TaxBracket { up_to: Some(dec!(10000000)), rate: dec!(10) },
        TaxBracket { up_to: Some(dec!(20000000)), rate: dec!(15) },
        TaxBracket { up_to: Some(dec!(30000000)), rate: dec!(20) },
        TaxBracket { up_to: None, rate: dec!(25) },
    ]
});

/// Complete pay policy of one tenant. Every field is populated; consumers
/// never fall back to defaults of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Policy {
    pub company_id: u64,
    #[schema(example = 22)]
    pub working_days_per_month: u32,
    pub overtime: OvertimeRates,
    pub contribution: ContributionSettings,
    pub late_penalty: LatePenaltySettings,
    pub leave: LeaveEntitlements,
    pub income_tax: IncomeTaxSchedule,
}

impl Policy {
    pub fn defaults_for(company_id: u64) -> Self {
        Self {
            company_id,
            working_days_per_month: 22,
            overtime: OvertimeRates {
                normal_rate: dec!(1.5),
                holiday_rate: dec!(2),
                weekend_rate: dec!(2),
            },
            contribution: ContributionSettings {
                enabled: true,
                employee_rate: dec!(2),
                employer_rate: dec!(3),
                salary_cap: dec!(300000),
            },
            late_penalty: LatePenaltySettings {
                enabled: true,
                grace_minutes: 15,
                penalty_per_late: dec!(2000),
                monthly_cap: dec!(50000),
            },
            leave: LeaveEntitlements {
                casual: 6,
                earned: 10,
                sick: 30,
                maternity: 98,
                paternity: 15,
            },
            income_tax: IncomeTaxSchedule {
                brackets: DEFAULT_BRACKETS.clone(),
            },
        }
    }

    /// Checks the structural invariants the calculator relies on.
    pub fn validate(&self) -> Result<(), String> {
        if self.working_days_per_month == 0 {
            return Err("working_days_per_month must be greater than 0".into());
        }

        let amounts = [
            ("overtime.normal_rate", self.overtime.normal_rate),
            ("overtime.holiday_rate", self.overtime.holiday_rate),
            ("overtime.weekend_rate", self.overtime.weekend_rate),
            ("contribution.employee_rate", self.contribution.employee_rate),
            ("contribution.employer_rate", self.contribution.employer_rate),
            ("contribution.salary_cap", self.contribution.salary_cap),
            ("late_penalty.penalty_per_late", self.late_penalty.penalty_per_late),
            ("late_penalty.monthly_cap", self.late_penalty.monthly_cap),
        ];
        if let Some((name, _)) = amounts.iter().find(|(_, v)| v.is_sign_negative()) {
            return Err(format!("{name} must not be negative"));
        }

        let brackets = &self.income_tax.brackets;
        let Some((last, bounded)) = brackets.split_last() else {
            return Err("income_tax.brackets must not be empty".into());
        };
        if last.up_to.is_some() {
            return Err("the last income tax bracket must be open-ended".into());
        }

        let mut floor = Decimal::ZERO;
        for bracket in bounded {
            let Some(up_to) = bracket.up_to else {
                return Err("only the last income tax bracket may be open-ended".into());
            };
            if up_to <= floor {
                return Err("income tax thresholds must be strictly ascending".into());
            }
            floor = up_to;
        }
        if let Some(b) = brackets.iter().find(|b| b.rate.is_sign_negative()) {
            return Err(format!("income tax rate {} must not be negative", b.rate));
        }

        Ok(())
    }

    /// Replaces every section present in `update`. Absent sections are kept.
    pub fn apply(&mut self, update: PolicyUpdate) {
        if let Some(days) = update.working_days_per_month {
            self.working_days_per_month = days;
        }
        if let Some(overtime) = update.overtime {
            self.overtime = overtime;
        }
        if let Some(contribution) = update.contribution {
            self.contribution = contribution;
        }
        if let Some(late_penalty) = update.late_penalty {
            self.late_penalty = late_penalty;
        }
        if let Some(leave) = update.leave {
            self.leave = leave;
        }
        if let Some(income_tax) = update.income_tax {
            self.income_tax = income_tax;
        }
    }
}

/// Partial policy edit. Unknown fields are rejected at deserialization.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PolicyUpdate {
    pub working_days_per_month: Option<u32>,
    pub overtime: Option<OvertimeRates>,
    pub contribution: Option<ContributionSettings>,
    pub late_penalty: Option<LatePenaltySettings>,
    pub leave: Option<LeaveEntitlements>,
    pub income_tax: Option<IncomeTaxSchedule>,
}
