use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::model::payslip::{
    NewPayslip, PaymentDetails, PaymentInput, Payslip, PayslipFilter, PayslipKey, PayslipPage,
    PayslipStatus, StatusChange,
};
use crate::payroll::aggregate::PeriodAggregator;
use crate::payroll::calculator::{self, AllowancesInput, ManualDeductions};
use crate::payroll::error::{PayrollError, StoreError};
use crate::payroll::policy::PolicyResolver;
use crate::store::HrStore;
use crate::utils::money::check_amount;
use crate::utils::period::Period;

/// Everything needed to produce one payslip.
#[derive(Debug, Clone)]
pub struct GeneratePayroll {
    pub employee_id: u64,
    pub company_id: u64,
    pub month: u32,
    pub year: i32,
    pub basic_salary: Decimal,
    pub allowances: AllowancesInput,
    pub manual_deductions: ManualDeductions,
    pub generated_by: u64,
    pub at: DateTime<Utc>,
}

impl GeneratePayroll {
    fn validate(&self) -> Result<Period, PayrollError> {
        if self.employee_id == 0 {
            return Err(PayrollError::Validation("employee_id is required".into()));
        }
        if self.company_id == 0 {
            return Err(PayrollError::Validation("company_id is required".into()));
        }
        let period = Period::new(self.month, self.year)?;

        if self.basic_salary <= Decimal::ZERO {
            return Err(PayrollError::Validation("basic_salary must be greater than 0".into()));
        }
        check_amount("basic_salary", self.basic_salary).map_err(PayrollError::Validation)?;
        for (name, amount) in self.allowances.entries() {
            check_amount(&format!("allowance {name}"), amount).map_err(PayrollError::Validation)?;
        }
        check_amount("deduction loan", self.manual_deductions.loan).map_err(PayrollError::Validation)?;
        check_amount("deduction other", self.manual_deductions.other).map_err(PayrollError::Validation)?;

        Ok(period)
    }
}

/// Owns payslip creation and the payslip lifecycle.
pub struct PayslipLedger {
    store: Arc<dyn HrStore>,
    policies: Arc<PolicyResolver>,
    aggregator: PeriodAggregator,
}

impl PayslipLedger {
    pub fn new(store: Arc<dyn HrStore>, policies: Arc<PolicyResolver>) -> Self {
        Self {
            aggregator: PeriodAggregator::new(store.clone()),
            store,
            policies,
        }
    }

    #[instrument(
        skip(self, req),
        fields(
            employee_id = req.employee_id,
            company_id = req.company_id,
            month = req.month,
            year = req.year
        )
    )]
    pub async fn generate(&self, req: GeneratePayroll) -> Result<Payslip, PayrollError> {
        let period = req.validate()?;
        let key = PayslipKey {
            employee_id: req.employee_id,
            company_id: req.company_id,
            month: period.month(),
            year: period.year(),
        };
        let duplicate = || PayrollError::DuplicatePeriod {
            employee_id: key.employee_id,
            month: key.month,
            year: key.year,
        };

        if !self.store.employee_in_company(req.employee_id, req.company_id).await? {
            return Err(PayrollError::NotFound(format!(
                "employee {} in company {}",
                req.employee_id, req.company_id
            )));
        }
        if self.store.payslip_exists(key).await? {
            return Err(duplicate());
        }

        let policy = self.policies.resolve(req.company_id).await?;
        let facts = self
            .aggregator
            .aggregate(req.employee_id, req.company_id, &period)
            .await?;
        let breakdown = calculator::calculate(
            req.basic_salary,
            &facts,
            &req.allowances,
            &req.manual_deductions,
            &policy,
        )?;

        let new = NewPayslip {
            key,
            basic_salary: req.basic_salary,
            breakdown,
            generated_by: req.generated_by,
            created_at: req.at,
        };

        match self.store.commit_payslip(new, &facts.advance_ids()).await {
            Ok(payslip) => {
                info!(payslip_id = payslip.id, net_pay = %payslip.breakdown.net_pay, "Payslip generated");
                Ok(payslip)
            }
            Err(StoreError::Duplicate) => Err(duplicate()),
            Err(e) => {
                tracing::error!(error = %e, "Failed to commit payslip");
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn confirm(&self, id: u64, company_id: u64, at: DateTime<Utc>) -> Result<Payslip, PayrollError> {
        self.transition(id, company_id, PayslipStatus::Confirmed, None, at).await
    }

    #[instrument(skip(self, payment))]
    pub async fn mark_paid(
        &self,
        id: u64,
        company_id: u64,
        payment: PaymentInput,
        paid_by: u64,
        at: DateTime<Utc>,
    ) -> Result<Payslip, PayrollError> {
        let details = PaymentDetails::paid(payment, paid_by, at);
        self.transition(id, company_id, PayslipStatus::Paid, Some(details), at)
            .await
    }

    #[instrument(skip(self))]
    pub async fn mark_failed(
        &self,
        id: u64,
        company_id: u64,
        reason: String,
        failed_by: u64,
        at: DateTime<Utc>,
    ) -> Result<Payslip, PayrollError> {
        let details = PaymentDetails::failed(reason, failed_by, at);
        self.transition(id, company_id, PayslipStatus::Failed, Some(details), at)
            .await
    }

    pub async fn get(&self, id: u64, company_id: u64) -> Result<Payslip, PayrollError> {
        self.store
            .find_payslip(id, company_id)
            .await?
            .ok_or_else(|| PayrollError::NotFound(format!("payslip {id}")))
    }

    pub async fn list(&self, company_id: u64, filter: PayslipFilter) -> Result<PayslipPage, PayrollError> {
        let (data, total) = futures::try_join!(
            self.store.list_payslips(company_id, &filter),
            self.store.count_payslips(company_id, &filter),
        )?;

        Ok(PayslipPage {
            data,
            page: filter.page(),
            per_page: filter.per_page(),
            total,
        })
    }

    pub async fn list_for_employee(&self, employee_id: u64, company_id: u64) -> Result<Vec<Payslip>, PayrollError> {
        Ok(self.store.list_employee_payslips(employee_id, company_id).await?)
    }

    /// Statuses only move forward, so a lost race is re-read and re-checked
    /// until the update lands or the move becomes illegal.
    async fn transition(
        &self,
        id: u64,
        company_id: u64,
        to: PayslipStatus,
        payment: Option<PaymentDetails>,
        at: DateTime<Utc>,
    ) -> Result<Payslip, PayrollError> {
        loop {
            let current = self.get(id, company_id).await?;
            if !current.status.can_transition_to(to) {
                return Err(PayrollError::InvalidTransition {
                    from: current.status,
                    to,
                });
            }

            let change = StatusChange {
                id,
                company_id,
                from: current.status,
                to,
                payment: payment.clone(),
                at,
            };
            if let Some(updated) = self.store.transition_payslip(change).await? {
                info!(payslip_id = id, from = %current.status, to = %to, "Payslip status changed");
                return Ok(updated);
            }
            warn!(payslip_id = id, "Payslip changed concurrently, retrying transition");
        }
    }
}
