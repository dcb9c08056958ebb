//! Bundled sample catalog.

use crate::admin::PlanAdmin;
use crate::error::{CatalogError, CatalogErrorExt};
use nexo_database::Store;
use nexo_domain::{Category, FeatureSpec, Locality, PlanDraft, ZoneType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, info, instrument};

const SAMPLE: &str = include_str!("../data/sample.toml");

#[derive(Debug, Deserialize)]
struct SampleCatalog {
    localities: Vec<String>,
    zone_types: Vec<String>,
    plans: Vec<SamplePlan>,
}

#[derive(Debug, Deserialize)]
struct SamplePlan {
    name: String,
    price: Decimal,
    category: Category,
    #[serde(default)]
    features: Vec<FeatureSpec>,
}

/// What a [`seed`] run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub localities_created: usize,
    pub localities_reused: usize,
    pub zone_types_created: usize,
    pub zone_types_reused: usize,
    pub plans_created: usize,
    /// Sample plans left alone because a plan with the same name already exists.
    pub plans_skipped: usize,
}

/// Loads the sample catalog. Safe to run again: existing localities and zone types are
/// reused and plans already present by name are skipped.
///
/// # Errors
/// Any error of the underlying writes; rows written before it stay.
#[instrument(skip(admin))]
pub async fn seed<S: Store>(admin: &PlanAdmin<S>) -> Result<SeedReport, CatalogError> {
    let sample: SampleCatalog = toml::from_str(SAMPLE).map_err(|e| {
        CatalogError::ValidationFailed { message: e.to_string().into(), context: None }
    })?;
    let mut report = SeedReport::default();

    let mut localities: Vec<Locality> = Vec::new();
    for name in &sample.localities {
        let (locality, created) = get_or_create(
            admin.create_locality(name),
            || admin.locality_by_name(name),
        )
        .await
        .context("seed")?;
        if created {
            report.localities_created += 1;
        } else {
            report.localities_reused += 1;
        }
        localities.push(locality);
    }

    let mut zone_types: Vec<ZoneType> = Vec::new();
    for name in &sample.zone_types {
        let (zone_type, created) = get_or_create(
            admin.create_zone_type(name),
            || admin.zone_type_by_name(name),
        )
        .await
        .context("seed")?;
        if created {
            report.zone_types_created += 1;
        } else {
            report.zone_types_reused += 1;
        }
        zone_types.push(zone_type);
    }

    let existing: Vec<String> =
        admin.plans(None).await?.into_iter().map(|plan| plan.name.to_lowercase()).collect();
    for plan in sample.plans {
        if existing.contains(&plan.name.to_lowercase()) {
            debug!(name = %plan.name, "Sample plan already present");
            report.plans_skipped += 1;
            continue;
        }

        let mut draft = PlanDraft::new(plan.name, plan.price, plan.category);
        draft.features = plan.features;
        for locality in &localities {
            for zone_type in &zone_types {
                draft = draft.available_at(locality.id.clone(), zone_type.id.clone());
            }
        }
        admin.create_plan_with_features(&draft).await.context("seed")?;
        report.plans_created += 1;
    }

    info!(?report, "Sample catalog seeded");
    Ok(report)
}

/// Runs `create`; on a name conflict falls back to `lookup`. The flag tells whether the
/// row is new.
async fn get_or_create<T, C, L, F>(create: C, lookup: L) -> Result<(T, bool), CatalogError>
where
    C: Future<Output = Result<T, CatalogError>>,
    L: FnOnce() -> F,
    F: Future<Output = Result<T, CatalogError>>,
{
    match create.await {
        Ok(row) => Ok((row, true)),
        Err(CatalogError::Conflict { .. }) => Ok((lookup().await?, false)),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_sample_parses() {
        let sample: SampleCatalog = toml::from_str(SAMPLE).unwrap();
        assert_eq!(sample.localities.len(), 6);
        assert_eq!(sample.zone_types, ["Urbano", "Rural"]);
        assert_eq!(sample.plans.len(), 4);

        let fiber = &sample.plans[0];
        assert_eq!(fiber.name, "Internet 50MB Fibra");
        assert_eq!(fiber.price, Decimal::new(8500, 0));
        assert_eq!(fiber.category, Category::Internet);
        assert_eq!(fiber.features[0].icon_name(), "speed");
    }
}
