use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use crate::model::policy::{Policy, PolicyUpdate};
use crate::payroll::error::PayrollError;
use crate::store::HrStore;

/// Loads tenant pay policies, creating the defaults on first use.
pub struct PolicyResolver {
    store: Arc<dyn HrStore>,
    cache: Cache<u64, Arc<Policy>>,
}

impl PolicyResolver {
    pub fn new(store: Arc<dyn HrStore>, capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { store, cache }
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, company_id: u64) -> Result<Arc<Policy>, PayrollError> {
        if let Some(policy) = self.cache.get(&company_id).await {
            return Ok(policy);
        }

        let policy = self
            .store
            .get_or_create(company_id, Policy::defaults_for(company_id))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, company_id, "Failed to load pay policy");
                PayrollError::from(e)
            })?;

        policy.validate().map_err(|e| {
            PayrollError::InvariantViolation(format!("stored policy of company {company_id}: {e}"))
        })?;

        let policy = Arc::new(policy);
        self.cache.insert(company_id, policy.clone()).await;
        debug!(company_id, "Pay policy cached");
        Ok(policy)
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, company_id: u64, update: PolicyUpdate) -> Result<Policy, PayrollError> {
        let mut policy = self
            .store
            .get_or_create(company_id, Policy::defaults_for(company_id))
            .await?;

        policy.apply(update);
        policy.validate().map_err(PayrollError::Validation)?;

        self.store.save_policy(&policy).await.map_err(|e| {
            tracing::error!(error = %e, company_id, "Failed to save pay policy");
            PayrollError::from(e)
        })?;
        self.cache.invalidate(&company_id).await;

        Ok(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::policy::OvertimeRates;
    use crate::store::memory::MemoryStore;
    use rust_decimal_macros::dec;

    fn resolver(store: Arc<MemoryStore>) -> PolicyResolver {
        PolicyResolver::new(store, 100, Duration::from_secs(60))
    }

    #[actix_web::test]
    async fn test_defaults_created_once() {
        let store = Arc::new(MemoryStore::default());
        let resolver = resolver(store.clone());

        let (a, b) = futures::join!(resolver.resolve(3), resolver.resolve(3));
        assert_eq!(*a.unwrap(), Policy::defaults_for(3));
        assert_eq!(*b.unwrap(), Policy::defaults_for(3));
        assert_eq!(store.policy_count(), 1);
    }

    #[actix_web::test]
    async fn test_update_invalidates_cache() {
        let store = Arc::new(MemoryStore::default());
        let resolver = resolver(store.clone());
        assert_eq!(resolver.resolve(3).await.unwrap().working_days_per_month, 22);

        let update = PolicyUpdate {
            working_days_per_month: Some(26),
            overtime: Some(OvertimeRates {
                normal_rate: dec!(1.25),
                holiday_rate: dec!(2),
                weekend_rate: dec!(1.5),
            }),
            ..Default::default()
        };
        let updated = resolver.update(3, update).await.unwrap();
        assert_eq!(updated.working_days_per_month, 26);

        let resolved = resolver.resolve(3).await.unwrap();
        assert_eq!(resolved.working_days_per_month, 26);
        assert_eq!(resolved.overtime.normal_rate, dec!(1.25));
    }

    #[actix_web::test]
    async fn test_invalid_update_is_rejected_and_not_saved() {
        let store = Arc::new(MemoryStore::default());
        let resolver = resolver(store.clone());

        let update = PolicyUpdate {
            working_days_per_month: Some(0),
            ..Default::default()
        };
        let err = resolver.update(3, update).await.unwrap_err();
        assert!(matches!(err, PayrollError::Validation(_)));
        assert_eq!(resolver.resolve(3).await.unwrap().working_days_per_month, 22);
    }

    #[actix_web::test]
    async fn test_corrupt_stored_policy_is_an_invariant_violation() {
        let store = Arc::new(MemoryStore::default());
        let mut broken = Policy::defaults_for(4);
        broken.income_tax.brackets.clear();
        store.put_policy(broken);

        let err = resolver(store).resolve(4).await.unwrap_err();
        assert!(matches!(err, PayrollError::InvariantViolation(_)));
    }
}
