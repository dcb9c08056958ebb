use crate::args::{Command, NameAction, PlanAction, PlanArgs};
use anyhow::{Context, Result};
use nexo_catalog::{PlanAdmin, seed};
use nexo_database::Store;
use nexo_kernel::domain::{Category, FeatureSpec, PlanDraft, PlanId};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

fn to_json(value: &impl Serialize) -> Result<Value> {
    serde_json::to_value(value).context("Serializing command output")
}

/// Runs one command and returns the document to print.
pub(crate) async fn execute<S: Store>(admin: &PlanAdmin<S>, command: Command) -> Result<Value> {
    match command {
        Command::Seed => to_json(&seed(admin).await?),
        Command::Localities { action } => match action {
            NameAction::List => to_json(&admin.localities().await?),
            NameAction::Add { name } => to_json(&admin.create_locality(&name).await?),
        },
        Command::Zones { action } => match action {
            NameAction::List => to_json(&admin.zone_types().await?),
            NameAction::Add { name } => to_json(&admin.create_zone_type(&name).await?),
        },
        Command::Plans { action } => plans(admin, action).await,
        Command::Coverage { locality, zone } => {
            let (locality, zone_type) =
                tokio::try_join!(admin.locality_by_name(&locality), admin.zone_type_by_name(&zone))?;
            to_json(&admin.get_available_plans(&locality.id, &zone_type.id).await?)
        },
        Command::Stats => to_json(&admin.dashboard_stats().await?),
        Command::Export { output } => {
            let export = admin.export_catalog().await?;
            let Some(path) = output else {
                return to_json(&export);
            };
            let body = serde_json::to_vec_pretty(&export).context("Serializing export")?;
            tokio::fs::write(&path, body)
                .await
                .with_context(|| format!("Writing export to {}", path.display()))?;
            info!(path = %path.display(), plans = export.plans.len(), "Catalog exported");
            Ok(json!({ "written": path, "plans": export.plans.len() }))
        },
    }
}

async fn plans<S: Store>(admin: &PlanAdmin<S>, action: PlanAction) -> Result<Value> {
    match action {
        PlanAction::List { category } => {
            let category = category.map(Category::from);
            to_json(&admin.plans_with_features(category.as_ref()).await?)
        },
        PlanAction::Show { id } => to_json(&admin.plan_for_edit(&PlanId::from(id)).await?),
        PlanAction::Search { term } => to_json(&admin.search_plans(&term).await?),
        PlanAction::Create(args) => {
            let draft = draft(admin, args).await?;
            let plan = admin.create_plan_with_features(&draft).await?;
            to_json(&admin.plan_for_edit(&plan.id).await?)
        },
        PlanAction::Update { id, plan } => {
            let draft = draft(admin, plan).await?;
            let plan = admin.update_plan_with_features(&PlanId::from(id), &draft).await?;
            to_json(&admin.plan_for_edit(&plan.id).await?)
        },
        PlanAction::Delete { id } => {
            admin.delete_plan(&PlanId::from(id.as_str())).await?;
            Ok(json!({ "deleted": id }))
        },
        PlanAction::BulkDelete { ids } => {
            let ids: Vec<PlanId> = ids.into_iter().map(PlanId::from).collect();
            Ok(json!({ "deleted": admin.bulk_delete_plans(&ids).await? }))
        },
    }
}

/// Builds the draft, resolving `--available` tokens against the stored names.
async fn draft<S: Store>(admin: &PlanAdmin<S>, args: PlanArgs) -> Result<PlanDraft> {
    let mut draft = PlanDraft::new(args.name, args.price, args.category);
    draft.features = args.features.iter().map(String::as_str).map(feature).collect();
    if !args.available.is_empty() {
        draft.availability = admin.parse_availability(&args.available).await?.pairs;
    }
    Ok(draft)
}

const ICON_SEPARATOR: &str = "::";

/// `icon::description` sets the icon; text without the separator is all description.
fn feature(raw: &str) -> FeatureSpec {
    match raw.split_once(ICON_SEPARATOR) {
        Some((icon, description))
            if !icon.trim().is_empty() && !icon.trim().contains(char::is_whitespace) =>
        {
            FeatureSpec::new(description.trim()).with_icon(icon.trim())
        },
        _ => FeatureSpec::new(raw.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_take_an_optional_icon_prefix() {
        assert_eq!(
            feature("speed::50 Mbps Bajada"),
            FeatureSpec::new("50 Mbps Bajada").with_icon("speed")
        );
        assert_eq!(feature("Soporte 24/7"), FeatureSpec::new("Soporte 24/7"));
        assert_eq!(feature("Hora pico: 10 Mbps"), FeatureSpec::new("Hora pico: 10 Mbps"));
    }

    #[test]
    fn single_colons_stay_in_the_description() {
        assert_eq!(feature("WiFi:incluido"), FeatureSpec::new("WiFi:incluido"));
        assert_eq!(feature("Ratio:1/8"), FeatureSpec::new("Ratio:1/8"));
        assert_eq!(feature("Hora pico :: 10 Mbps"), FeatureSpec::new("Hora pico :: 10 Mbps"));
    }
}
