use crate::error::{CatalogError, CatalogErrorExt};
use crate::repository::Catalog;
use crate::tables::{LOCALITY_ID, PLAN_AVAILABILITY, PLAN_ID, ZONE_TYPE_ID};
use fxhash::{FxHashMap, FxHashSet};
use nexo_database::{Filter, Query, Store};
use nexo_domain::{LocalityId, PlanDetails, ZoneTypeId};
use tracing::{debug, instrument};

impl<S: Store> Catalog<S> {
    /// Plans offered at a locality under a zone type, each with its features in display
    /// order.
    ///
    /// Plans appear once, in the order their first availability row was created. No
    /// matching rows yield an empty list.
    ///
    /// # Errors
    /// * [`CatalogError::ValidationFailed`] if either identifier is blank.
    /// * [`CatalogError::BackendUnavailable`] if the store cannot be reached.
    #[instrument(skip(self), fields(locality = %locality_id, zone_type = %zone_type_id))]
    pub async fn get_available_plans(
        &self,
        locality_id: &LocalityId,
        zone_type_id: &ZoneTypeId,
    ) -> Result<Vec<PlanDetails>, CatalogError> {
        if locality_id.as_str().trim().is_empty() || zone_type_id.as_str().trim().is_empty() {
            return Err(CatalogError::invalid("Locality and zone type are both required"))
                .context("get_available_plans");
        }

        let filter = Filter::eq(LOCALITY_ID, locality_id.as_str())
            .and(Filter::eq(ZONE_TYPE_ID, zone_type_id.as_str()));
        let rows = self
            .store()
            .select(PLAN_AVAILABILITY.name, Query::filter(filter))
            .await
            .context("get_available_plans")?;

        let mut seen = FxHashSet::default();
        let mut plan_ids = Vec::new();
        for row in &rows {
            let plan_id = row.text(PLAN_ID).context("get_available_plans")?;
            if seen.insert(plan_id.clone()) {
                plan_ids.push(plan_id);
            }
        }
        debug!(rows = rows.len(), plans = plan_ids.len(), "Availability resolved");
        if plan_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = plan_ids.iter().map(String::as_str).collect();
        let mut plans: FxHashMap<_, _> = self
            .plans_by_id(&ids)
            .await?
            .into_iter()
            .map(|plan| (plan.id.as_str().to_owned(), plan))
            .collect();
        let ordered = plan_ids.iter().filter_map(|id| plans.remove(id)).collect();

        self.attach_features(ordered).await.context("get_available_plans")
    }
}
