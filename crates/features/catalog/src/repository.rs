//! Base repository over the five catalog tables.

use crate::admin::PlanAdmin;
use crate::error::{CatalogError, CatalogErrorExt};
use crate::tables::{
    CATEGORY, FEATURE, FromRecord, LOCALITY, LOCALITY_ID, NAME, PLAN, PLAN_AVAILABILITY, PLAN_ID,
    PRICE, SORT_ORDER, ZONE_TYPE, ZONE_TYPE_ID, availability_fields, decode, feature_fields,
    name_fields, plan_fields,
};
use fxhash::FxHashMap;
use nexo_database::{Database, Direction, Filter, ID, Query, Store, TableSchema};
use nexo_domain::{
    AvailabilityListing, Category, Feature, Locality, LocalityId, Plan, PlanAvailability,
    PlanDetails, PlanId, ZoneType, ZoneTypeId,
};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

/// Read and single-row write access to the catalog.
///
/// Cloning is as cheap as cloning the store handle.
#[derive(Debug, Clone)]
pub struct Catalog<S = Database> {
    store: S,
}

impl<S: Store> Catalog<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Turns the repository into the admin service built on top of it.
    pub const fn admin(self) -> PlanAdmin<S> {
        PlanAdmin::new(self)
    }

    // --- Localities & zone types ---

    /// All localities ordered by name.
    ///
    /// # Errors
    /// [`CatalogError::BackendUnavailable`] when the store fails.
    pub async fn localities(&self) -> Result<Vec<Locality>, CatalogError> {
        self.all_by_name(&LOCALITY).await.context("localities")
    }

    /// All zone types ordered by name.
    ///
    /// # Errors
    /// [`CatalogError::BackendUnavailable`] when the store fails.
    pub async fn zone_types(&self) -> Result<Vec<ZoneType>, CatalogError> {
        self.all_by_name(&ZONE_TYPE).await.context("zone_types")
    }

    /// # Errors
    /// [`CatalogError::ValidationFailed`] for a blank name, [`CatalogError::Conflict`] when
    /// the name is taken (ignoring case).
    #[instrument(skip(self))]
    pub async fn create_locality(&self, name: &str) -> Result<Locality, CatalogError> {
        let locality: Locality = self.create_named(&LOCALITY, name).await.context("create_locality")?;
        info!(id = %locality.id, name = %locality.name, "Locality created");
        Ok(locality)
    }

    /// # Errors
    /// [`CatalogError::ValidationFailed`] for a blank name, [`CatalogError::Conflict`] when
    /// the name is taken (ignoring case).
    #[instrument(skip(self))]
    pub async fn create_zone_type(&self, name: &str) -> Result<ZoneType, CatalogError> {
        let zone_type: ZoneType =
            self.create_named(&ZONE_TYPE, name).await.context("create_zone_type")?;
        info!(id = %zone_type.id, name = %zone_type.name, "Zone type created");
        Ok(zone_type)
    }

    /// Case-insensitive lookup by name.
    ///
    /// # Errors
    /// [`CatalogError::NotFound`] when no locality has that name.
    pub async fn locality_by_name(&self, name: &str) -> Result<Locality, CatalogError> {
        self.find_by_name(&LOCALITY, name).await.context("locality_by_name")
    }

    /// Case-insensitive lookup by name.
    ///
    /// # Errors
    /// [`CatalogError::NotFound`] when no zone type has that name.
    pub async fn zone_type_by_name(&self, name: &str) -> Result<ZoneType, CatalogError> {
        self.find_by_name(&ZONE_TYPE, name).await.context("zone_type_by_name")
    }

    // --- Plans ---

    /// Plans ordered by price ascending, optionally restricted to one category.
    ///
    /// # Errors
    /// [`CatalogError::BackendUnavailable`] when the store fails.
    pub async fn plans(&self, category: Option<&Category>) -> Result<Vec<Plan>, CatalogError> {
        let filter = category.map_or(Filter::All, |c| Filter::eq(CATEGORY, c.as_str()));
        let query = Query::filter(filter).order_by(PRICE, Direction::Asc);
        let rows = self.store.select(PLAN.name, query).await.context("plans")?;
        decode(rows).context("plans")
    }

    /// [`Catalog::plans`] with each plan's features attached in display order.
    ///
    /// # Errors
    /// [`CatalogError::BackendUnavailable`] when the store fails.
    pub async fn plans_with_features(
        &self,
        category: Option<&Category>,
    ) -> Result<Vec<PlanDetails>, CatalogError> {
        let plans = self.plans(category).await?;
        self.attach_features(plans).await.context("plans_with_features")
    }

    /// # Errors
    /// [`CatalogError::NotFound`] for an unknown id.
    pub async fn plan(&self, id: &PlanId) -> Result<Plan, CatalogError> {
        let rows = self
            .store
            .select(PLAN.name, Query::filter(Filter::eq(ID, id.as_str())))
            .await
            .context("plan")?;
        decode::<Plan>(rows)
            .context("plan")?
            .pop()
            .ok_or_else(|| CatalogError::not_found(format!("Plan '{id}' does not exist")))
            .context("plan")
    }

    /// # Errors
    /// [`CatalogError::NotFound`] for an unknown id.
    pub async fn plan_with_features(&self, id: &PlanId) -> Result<PlanDetails, CatalogError> {
        let plan = self.plan(id).await?;
        let features = self.features_of(id).await?;
        Ok(PlanDetails { plan, features })
    }

    /// Inserts a bare plan row.
    ///
    /// # Errors
    /// [`CatalogError::BackendUnavailable`] when the store fails.
    #[instrument(skip(self))]
    pub async fn create_plan(
        &self,
        name: &str,
        price: Decimal,
        category: &Category,
    ) -> Result<Plan, CatalogError> {
        let row = self
            .store
            .insert(PLAN.name, plan_fields(name.trim(), price, category))
            .await
            .context("create_plan")?;
        let plan = Plan::from_record(row).context("create_plan")?;
        debug!(id = %plan.id, "Plan row inserted");
        Ok(plan)
    }

    // --- Features ---

    /// # Errors
    /// [`CatalogError::NotFound`] when the plan does not exist.
    #[instrument(skip(self, description))]
    pub async fn create_feature(
        &self,
        plan_id: &PlanId,
        icon_name: &str,
        description: &str,
        sort_order: i64,
    ) -> Result<Feature, CatalogError> {
        let fields = feature_fields(plan_id, icon_name, description.trim(), sort_order);
        let row = self.store.insert(FEATURE.name, fields).await.context("create_feature")?;
        Feature::from_record(row).context("create_feature")
    }

    /// Features of one plan ordered by `sort_order`, ties in insertion order.
    ///
    /// # Errors
    /// [`CatalogError::BackendUnavailable`] when the store fails.
    pub async fn features_of(&self, plan_id: &PlanId) -> Result<Vec<Feature>, CatalogError> {
        let query = Query::filter(Filter::eq(PLAN_ID, plan_id.as_str()))
            .order_by(SORT_ORDER, Direction::Asc);
        let rows = self.store.select(FEATURE.name, query).await.context("features_of")?;
        decode(rows).context("features_of")
    }

    // --- Availability ---

    /// # Errors
    /// [`CatalogError::NotFound`] when the plan, locality or zone type does not exist.
    #[instrument(skip(self))]
    pub async fn add_plan_availability(
        &self,
        plan_id: &PlanId,
        locality_id: &LocalityId,
        zone_type_id: &ZoneTypeId,
    ) -> Result<PlanAvailability, CatalogError> {
        let fields = availability_fields(plan_id, locality_id, zone_type_id);
        let row = self
            .store
            .insert(PLAN_AVAILABILITY.name, fields)
            .await
            .context("add_plan_availability")?;
        PlanAvailability::from_record(row).context("add_plan_availability")
    }

    /// Availability rows joined with their plan, locality and zone type.
    ///
    /// # Errors
    /// [`CatalogError::BackendUnavailable`] when the store fails.
    pub async fn plan_availability(
        &self,
        locality_id: Option<&LocalityId>,
        zone_type_id: Option<&ZoneTypeId>,
    ) -> Result<Vec<AvailabilityListing>, CatalogError> {
        let mut filters = Vec::new();
        if let Some(id) = locality_id {
            filters.push(Filter::eq(LOCALITY_ID, id.as_str()));
        }
        if let Some(id) = zone_type_id {
            filters.push(Filter::eq(ZONE_TYPE_ID, id.as_str()));
        }

        self.availability_where(Filter::And(filters)).await.context("plan_availability")
    }

    // --- Shared helpers ---

    /// Availability rows matching `filter`, joined with their plan, locality and zone type.
    pub(crate) async fn availability_where(
        &self,
        filter: Filter,
    ) -> Result<Vec<AvailabilityListing>, CatalogError> {
        let rows = self.store.select(PLAN_AVAILABILITY.name, Query::filter(filter)).await?;
        let rows: Vec<PlanAvailability> = decode(rows)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let plan_ids: Vec<&str> = rows.iter().map(|row| row.plan_id.as_str()).collect();
        let (plans, localities, zone_types) = tokio::try_join!(
            self.plans_by_id(&plan_ids),
            self.localities(),
            self.zone_types()
        )?;
        let plans: FxHashMap<_, _> = plans.into_iter().map(|p| (p.id.clone(), p)).collect();
        let localities: FxHashMap<_, _> =
            localities.into_iter().map(|l| (l.id.clone(), l)).collect();
        let zone_types: FxHashMap<_, _> =
            zone_types.into_iter().map(|z| (z.id.clone(), z)).collect();

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                Some(AvailabilityListing {
                    plan: plans.get(&row.plan_id)?.clone(),
                    locality: localities.get(&row.locality_id)?.clone(),
                    zone_type: zone_types.get(&row.zone_type_id)?.clone(),
                    id: row.id,
                })
            })
            .collect())
    }

    pub(crate) async fn plans_by_id(&self, ids: &[&str]) -> Result<Vec<Plan>, CatalogError> {
        let query = Query::filter(Filter::is_in(ID, ids.iter().copied()));
        let rows = self.store.select(PLAN.name, query).await.context("plans_by_id")?;
        decode(rows).context("plans_by_id")
    }

    /// Loads the features of every plan in one query and pairs them up, keeping plan order.
    pub(crate) async fn attach_features(
        &self,
        plans: Vec<Plan>,
    ) -> Result<Vec<PlanDetails>, CatalogError> {
        if plans.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::filter(Filter::is_in(PLAN_ID, plans.iter().map(|p| p.id.as_str())))
            .order_by(SORT_ORDER, Direction::Asc);
        let rows = self.store.select(FEATURE.name, query).await.context("attach_features")?;

        let mut by_plan: FxHashMap<PlanId, Vec<Feature>> = FxHashMap::default();
        for feature in decode::<Feature>(rows).context("attach_features")? {
            by_plan.entry(feature.plan_id.clone()).or_default().push(feature);
        }

        Ok(plans
            .into_iter()
            .map(|plan| {
                let features = by_plan.remove(&plan.id).unwrap_or_default();
                PlanDetails { plan, features }
            })
            .collect())
    }

    async fn all_by_name<T: FromRecord>(
        &self,
        table: &'static TableSchema,
    ) -> Result<Vec<T>, CatalogError> {
        let rows = self.store.select(table.name, Query::all().order_by(NAME, Direction::Asc)).await?;
        Ok(decode(rows)?)
    }

    async fn create_named<T: FromRecord>(
        &self,
        table: &'static TableSchema,
        name: &str,
    ) -> Result<T, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::invalid(format!("A {} needs a name", table.name)));
        }
        let row = self.store.insert(table.name, name_fields(name)).await?;
        Ok(T::from_record(row)?)
    }

    async fn find_by_name<T: FromRecord>(
        &self,
        table: &'static TableSchema,
        name: &str,
    ) -> Result<T, CatalogError> {
        let wanted = name.trim().to_lowercase();
        let rows = self.store.select(table.name, Query::filter(Filter::contains(NAME, &wanted))).await?;
        let row = rows
            .into_iter()
            .find(|row| row.text(NAME).is_ok_and(|n| n.to_lowercase() == wanted))
            .ok_or_else(|| {
                CatalogError::not_found(format!("No {} named '{}'", table.name, name.trim()))
            })?;
        Ok(T::from_record(row)?)
    }
}
