//! Plan synchronizer and the admin queries built on the base repository.

use crate::error::{CatalogError, CatalogErrorExt};
use crate::repository::Catalog;
use crate::tables::{
    CATEGORY, FEATURE, FromRecord, NAME, PLAN, PLAN_AVAILABILITY, PLAN_ID, decode, plan_fields,
};
use crate::tokens::{ParsedAvailability, parse_availability_tokens};
use chrono::Utc;
use fxhash::FxHashSet;
use nexo_database::{CREATED_AT, Direction, Filter, ID, Query, Store};
use nexo_domain::{
    AvailabilityDetail, AvailabilityPair, CatalogExport, DashboardStats, Plan, PlanDetails,
    PlanDraft, PlanForEdit, PlanId,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::ops::Deref;
use tracing::{info, instrument, warn};

const RECENT_PLANS: usize = 5;

/// Multi-step plan writes and the queries of the admin screens.
///
/// Derefs to the wrapped [`Catalog`], so every base operation is available as well.
#[derive(Debug, Clone)]
pub struct PlanAdmin<S> {
    catalog: Catalog<S>,
}

impl<S> Deref for PlanAdmin<S> {
    type Target = Catalog<S>;

    fn deref(&self) -> &Self::Target {
        &self.catalog
    }
}

impl<S: Store> PlanAdmin<S> {
    pub const fn new(catalog: Catalog<S>) -> Self {
        Self { catalog }
    }

    // --- Synchronizer ---

    /// Creates the plan, then its features in draft order, then its availability rows.
    ///
    /// Nothing is rolled back: when a feature or availability insert fails, the rows
    /// written before it stay and the error names the failing step.
    ///
    /// # Errors
    /// * [`CatalogError::ValidationFailed`] for an invalid draft (nothing is written).
    /// * [`CatalogError::NotFound`] if an availability pair names a missing locality or
    ///   zone type.
    /// * [`CatalogError::BackendUnavailable`] if the store fails.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_plan_with_features(&self, draft: &PlanDraft) -> Result<Plan, CatalogError> {
        validate_draft(draft).context("create_plan_with_features")?;

        let plan = self
            .create_plan(&draft.name, draft.price, &draft.category)
            .await
            .context("create_plan_with_features")?;
        let written = self
            .write_children(&plan.id, draft)
            .await
            .inspect_err(|e| warn!(plan_id = %plan.id, error = %e, "Plan left partially created"));
        within_step(written, "create_plan_with_features")?;

        info!(
            id = %plan.id,
            features = draft.features.len(),
            availability = draft.availability.len(),
            "Plan created"
        );
        Ok(plan)
    }

    /// Updates the plan attributes in place, then replaces its features and its
    /// availability rows. Each delete completes before the matching inserts start.
    ///
    /// A failure part way leaves a partial state; running the same update again
    /// converges to the draft.
    ///
    /// # Errors
    /// * [`CatalogError::NotFound`] if the plan does not exist.
    /// * The errors of [`PlanAdmin::create_plan_with_features`].
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn update_plan_with_features(
        &self,
        plan_id: &PlanId,
        draft: &PlanDraft,
    ) -> Result<Plan, CatalogError> {
        validate_draft(draft).context("update_plan_with_features")?;

        let updated = self
            .store()
            .update(
                PLAN.name,
                Filter::eq(ID, plan_id.as_str()),
                plan_fields(draft.name.trim(), draft.price, &draft.category),
            )
            .await
            .context("update_plan_with_features")?;
        let Some(row) = updated.into_iter().next() else {
            return Err(CatalogError::not_found(format!("Plan '{plan_id}' does not exist")))
                .context("update_plan_with_features");
        };
        let plan = Plan::from_record(row).context("update_plan_with_features")?;

        let replaced = self
            .replace_children(plan_id, draft)
            .await
            .inspect_err(|e| warn!(%plan_id, error = %e, "Plan left partially updated"));
        within_step(replaced, "update_plan_with_features")?;

        info!(id = %plan.id, "Plan updated");
        Ok(plan)
    }

    /// Deletes a plan; its features and availability go with it.
    ///
    /// # Errors
    /// [`CatalogError::NotFound`] if the plan does not exist.
    #[instrument(skip(self))]
    pub async fn delete_plan(&self, plan_id: &PlanId) -> Result<(), CatalogError> {
        let removed = self
            .store()
            .delete(PLAN.name, Filter::eq(ID, plan_id.as_str()))
            .await
            .context("delete_plan")?;
        if removed == 0 {
            return Err(CatalogError::not_found(format!("Plan '{plan_id}' does not exist")))
                .context("delete_plan");
        }
        info!(%plan_id, "Plan deleted");
        Ok(())
    }

    /// Deletes every listed plan in one store call. Unknown ids are ignored.
    ///
    /// # Errors
    /// [`CatalogError::BackendUnavailable`] if the store fails.
    #[instrument(skip(self), fields(requested = plan_ids.len()))]
    pub async fn bulk_delete_plans(&self, plan_ids: &[PlanId]) -> Result<usize, CatalogError> {
        if plan_ids.is_empty() {
            return Ok(0);
        }
        let removed = self
            .store()
            .delete(PLAN.name, Filter::is_in(ID, plan_ids.iter().map(PlanId::as_str)))
            .await
            .context("bulk_delete_plans")?;
        info!(removed, "Plans deleted");
        Ok(removed)
    }

    /// Plans whose name or category contains `term` (ignoring case), newest first.
    ///
    /// # Errors
    /// [`CatalogError::BackendUnavailable`] if the store fails.
    pub async fn search_plans(&self, term: &str) -> Result<Vec<PlanDetails>, CatalogError> {
        let term = term.trim();
        let filter = Filter::contains(NAME, term).or(Filter::contains(CATEGORY, term));
        let rows = self
            .store()
            .select(PLAN.name, Query::filter(filter).order_by(CREATED_AT, Direction::Desc))
            .await
            .context("search_plans")?;
        let plans = decode(rows).context("search_plans")?;
        self.attach_features(plans).await.context("search_plans")
    }

    // --- Editor & dashboard ---

    /// # Errors
    /// [`CatalogError::NotFound`] if the plan does not exist.
    pub async fn plan_for_edit(&self, plan_id: &PlanId) -> Result<PlanForEdit, CatalogError> {
        let PlanDetails { plan, features } = self.plan_with_features(plan_id).await?;
        let availability = self
            .availability_where(Filter::eq(PLAN_ID, plan_id.as_str()))
            .await
            .context("plan_for_edit")?
            .into_iter()
            .map(|row| AvailabilityDetail {
                id: row.id,
                locality: row.locality,
                zone_type: row.zone_type,
            })
            .collect();
        Ok(PlanForEdit { plan, features, availability })
    }

    /// Resolves `"<locality>-<zone type>"` tokens against the current name tables.
    ///
    /// # Errors
    /// [`CatalogError::BackendUnavailable`] if the store fails.
    pub async fn parse_availability<I, T>(&self, tokens: I) -> Result<ParsedAvailability, CatalogError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let (localities, zone_types) = tokio::try_join!(self.localities(), self.zone_types())?;
        let parsed = parse_availability_tokens(tokens, &localities, &zone_types);
        for dropped in &parsed.dropped {
            warn!(token = %dropped.token, reason = %dropped.reason, "Availability token dropped");
        }
        Ok(parsed)
    }

    /// # Errors
    /// [`CatalogError::BackendUnavailable`] if the store fails.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, CatalogError> {
        let (mut plans, localities, zone_types) =
            tokio::try_join!(self.plans(None), self.localities(), self.zone_types())?;

        let mut plans_by_category = BTreeMap::new();
        for plan in &plans {
            *plans_by_category.entry(plan.category.to_string()).or_insert(0) += 1;
        }
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total_plans = plans.len();
        plans.truncate(RECENT_PLANS);

        Ok(DashboardStats {
            total_plans,
            total_localities: localities.len(),
            total_zone_types: zone_types.len(),
            plans_by_category,
            recent_plans: plans,
        })
    }

    /// # Errors
    /// [`CatalogError::BackendUnavailable`] if the store fails.
    pub async fn export_catalog(&self) -> Result<CatalogExport, CatalogError> {
        let (plans, localities, zone_types) =
            tokio::try_join!(self.plans_with_features(None), self.localities(), self.zone_types())?;
        Ok(CatalogExport { exported_at: Utc::now(), plans, localities, zone_types })
    }

    // --- Children ---

    async fn write_children(&self, plan_id: &PlanId, draft: &PlanDraft) -> Result<(), CatalogError> {
        self.insert_features(plan_id, draft).await?;
        self.insert_availability(plan_id, draft).await
    }

    async fn replace_children(&self, plan_id: &PlanId, draft: &PlanDraft) -> Result<(), CatalogError> {
        let owned = || Filter::eq(PLAN_ID, plan_id.as_str());

        self.store().delete(FEATURE.name, owned()).await.context("Deleting features")?;
        self.insert_features(plan_id, draft).await?;

        self.store()
            .delete(PLAN_AVAILABILITY.name, owned())
            .await
            .context("Deleting availability")?;
        self.insert_availability(plan_id, draft).await
    }

    /// Feature `sort_order` is the position in the draft.
    async fn insert_features(&self, plan_id: &PlanId, draft: &PlanDraft) -> Result<(), CatalogError> {
        for (position, feature) in draft.features.iter().enumerate() {
            let sort_order = i64::try_from(position).unwrap_or(i64::MAX);
            self.create_feature(plan_id, feature.icon_name(), &feature.description, sort_order)
                .await
                .context("Inserting features")?;
        }
        Ok(())
    }

    async fn insert_availability(
        &self,
        plan_id: &PlanId,
        draft: &PlanDraft,
    ) -> Result<(), CatalogError> {
        let mut seen = FxHashSet::default();
        for pair in draft.availability.iter().filter(|pair| seen.insert(*pair)) {
            let AvailabilityPair { locality_id, zone_type_id } = pair;
            self.add_plan_availability(plan_id, locality_id, zone_type_id)
                .await
                .context("Inserting availability")?;
        }
        Ok(())
    }
}

/// Annotates a failed child write with the operation while keeping the step it failed
/// at, e.g. `create_plan_with_features: Inserting availability`.
fn within_step<T>(result: Result<T, CatalogError>, operation: &str) -> Result<T, CatalogError> {
    match result {
        Err(err) => {
            let context = match err.context() {
                Some(step) => format!("{operation}: {step}"),
                None => operation.to_owned(),
            };
            Err(err).context(context)
        },
        ok => ok,
    }
}

/// Rejects drafts the store would accept but the catalog must not hold.
fn validate_draft(draft: &PlanDraft) -> Result<(), CatalogError> {
    if draft.name.trim().is_empty() {
        return Err(CatalogError::invalid("Plan name is required"));
    }
    if draft.category.is_blank() {
        return Err(CatalogError::invalid("Plan category is required"));
    }
    if draft.price <= Decimal::ZERO {
        return Err(CatalogError::invalid(format!("Price must be positive, got {}", draft.price)));
    }
    if let Some(position) = draft.features.iter().position(|f| f.description.trim().is_empty()) {
        return Err(CatalogError::invalid(format!("Feature #{position} has no description")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexo_domain::FeatureSpec;

    fn draft() -> PlanDraft {
        PlanDraft::new("Internet 50MB", Decimal::new(8500, 0), "internet")
            .feature(FeatureSpec::new("50 Mbps"))
    }

    #[test]
    fn complete_drafts_pass() {
        assert!(validate_draft(&draft()).is_ok());
    }

    #[test]
    fn invalid_drafts_are_rejected() {
        let mut blank_name = draft();
        blank_name.name = "  ".into();
        let mut free = draft();
        free.price = Decimal::ZERO;
        let mut no_category = draft();
        no_category.category = "".into();
        let empty_feature = draft().feature(FeatureSpec::new(" "));

        for draft in [blank_name, free, no_category, empty_feature] {
            assert!(matches!(validate_draft(&draft), Err(CatalogError::ValidationFailed { .. })));
        }
    }
}
