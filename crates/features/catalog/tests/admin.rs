use nexo_catalog::{CatalogError, DropReason, PlanAdmin, SeedReport, seed};
use nexo_database::{Database, DatabaseBuilder, MEMORY_URL};
use nexo_domain::{Category, FeatureSpec, LocalityId, PlanDraft, PlanForEdit, PlanId};
use rust_decimal::Decimal;

async fn admin() -> PlanAdmin<Database> {
    nexo_catalog::open(DatabaseBuilder::new().url(MEMORY_URL)).await.unwrap().admin()
}

fn internet(name: &str, price: i64) -> PlanDraft {
    PlanDraft::new(name, Decimal::new(price, 0), "internet")
}

#[tokio::test]
async fn locality_names_are_unique_ignoring_case() {
    let admin = admin().await;
    admin.create_locality("Resistencia").await.unwrap();

    let err = admin.create_locality("  RESISTENCIA ").await.unwrap_err();
    assert!(matches!(err, CatalogError::Conflict { .. }));
    assert_eq!(err.context(), Some("create_locality"));

    let err = admin.create_zone_type("   ").await.unwrap_err();
    assert!(matches!(err, CatalogError::ValidationFailed { .. }));

    let found = admin.locality_by_name("resistencia").await.unwrap();
    assert_eq!(found.name, "Resistencia");
    assert!(matches!(admin.zone_type_by_name("Rural").await, Err(CatalogError::NotFound { .. })));
}

#[tokio::test]
async fn name_tables_are_listed_alphabetically() {
    let admin = admin().await;
    for name in ["Fontana", "Charata", "Resistencia"] {
        admin.create_locality(name).await.unwrap();
    }
    let names: Vec<_> = admin.localities().await.unwrap().into_iter().map(|l| l.name).collect();
    assert_eq!(names, ["Charata", "Fontana", "Resistencia"]);
}

#[tokio::test]
async fn plans_are_listed_by_price_and_filtered_by_category() {
    let admin = admin().await;
    admin.create_plan_with_features(&internet("Fibra 100", 12500)).await.unwrap();
    admin.create_plan_with_features(&internet("Fibra 50", 8500)).await.unwrap();
    admin
        .create_plan_with_features(&PlanDraft::new("TV", Decimal::new(6500, 0), "TV"))
        .await
        .unwrap();

    let names: Vec<_> = admin.plans(None).await.unwrap().into_iter().map(|p| p.name).collect();
    assert_eq!(names, ["TV", "Fibra 50", "Fibra 100"]);

    let internet = admin.plans_with_features(Some(&Category::Internet)).await.unwrap();
    assert_eq!(internet.len(), 2);
    assert!(internet.iter().all(|p| p.plan.category == Category::Internet));
}

#[tokio::test]
async fn replace_update_is_idempotent() {
    let admin = admin().await;
    let l1 = admin.create_locality("Resistencia").await.unwrap();
    let l2 = admin.create_locality("Fontana").await.unwrap();
    let z1 = admin.create_zone_type("Urbano").await.unwrap();

    let plan = admin
        .create_plan_with_features(
            &internet("Internet 50MB", 8500)
                .feature(FeatureSpec::new("old"))
                .available_at(l1.id.clone(), z1.id.clone()),
        )
        .await
        .unwrap();

    let draft = internet("Internet 100MB", 12500)
        .feature(FeatureSpec::new("100 Mbps").with_icon("speed"))
        .feature(FeatureSpec::new("WiFi"))
        .available_at(l2.id.clone(), z1.id.clone());
    admin.update_plan_with_features(&plan.id, &draft).await.unwrap();
    let once = admin.plan_for_edit(&plan.id).await.unwrap();
    admin.update_plan_with_features(&plan.id, &draft).await.unwrap();
    let twice = admin.plan_for_edit(&plan.id).await.unwrap();

    let shape = |edit: &PlanForEdit| {
        let features: Vec<_> = edit
            .features
            .iter()
            .map(|f| (f.description.clone(), f.icon_name.clone(), f.sort_order))
            .collect();
        let availability: Vec<_> =
            edit.availability.iter().map(|a| (a.locality.id.clone(), a.zone_type.id.clone())).collect();
        (edit.plan.name.clone(), edit.plan.price, features, availability)
    };
    assert_eq!(shape(&once), shape(&twice));
    assert_eq!(twice.plan.name, "Internet 100MB");
    assert_eq!(twice.features.len(), 2);
    assert_eq!(twice.availability.len(), 1);
    assert_eq!(twice.availability[0].locality.name, "Fontana");

    assert!(admin.get_available_plans(&l1.id, &z1.id).await.unwrap().is_empty());
    assert_eq!(admin.get_available_plans(&l2.id, &z1.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn updating_a_missing_plan_is_not_found() {
    let admin = admin().await;
    let err = admin
        .update_plan_with_features(&PlanId::from("missing"), &internet("X", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { .. }));
    assert!(matches!(
        admin.delete_plan(&PlanId::from("missing")).await,
        Err(CatalogError::NotFound { .. })
    ));
}

#[tokio::test]
async fn failed_availability_leaves_a_partial_plan() {
    let admin = admin().await;
    let z1 = admin.create_zone_type("Urbano").await.unwrap();
    let draft = internet("Internet 50MB", 8500)
        .feature(FeatureSpec::new("50 Mbps"))
        .available_at(LocalityId::from("bogus"), z1.id.clone());

    let err = admin.create_plan_with_features(&draft).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { .. }));
    assert_eq!(err.context(), Some("create_plan_with_features: Inserting availability"));

    let plans = admin.plans_with_features(None).await.unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].features.len(), 1);
    assert!(admin.plan_availability(None, None).await.unwrap().is_empty());

    let err = admin.update_plan_with_features(&plans[0].plan.id, &draft).await.unwrap_err();
    assert!(err.to_string().contains("update_plan_with_features: Inserting availability"));
}

#[tokio::test]
async fn edit_view_holds_only_its_own_availability() {
    let admin = admin().await;
    let l1 = admin.create_locality("Resistencia").await.unwrap();
    let z1 = admin.create_zone_type("Urbano").await.unwrap();
    let z2 = admin.create_zone_type("Rural").await.unwrap();
    let mine = admin
        .create_plan_with_features(
            &internet("Internet 50MB", 8500).available_at(l1.id.clone(), z1.id.clone()),
        )
        .await
        .unwrap();
    admin
        .create_plan_with_features(
            &internet("Internet 100MB", 12500)
                .available_at(l1.id.clone(), z1.id.clone())
                .available_at(l1.id.clone(), z2.id.clone()),
        )
        .await
        .unwrap();
    let bare = admin.create_plan_with_features(&internet("Sin cobertura", 100)).await.unwrap();

    let edit = admin.plan_for_edit(&mine.id).await.unwrap();
    assert_eq!(edit.availability.len(), 1);
    assert_eq!(edit.availability[0].zone_type.name, "Urbano");
    assert!(admin.plan_for_edit(&bare.id).await.unwrap().availability.is_empty());
}

#[tokio::test]
async fn open_ended_categories_are_stored_as_given() {
    let admin = admin().await;
    let plan = admin
        .create_plan_with_features(&PlanDraft::new("Telefonía fija", Decimal::new(3000, 0), " Telefonía "))
        .await
        .unwrap();
    let stored = admin.plan(&plan.id).await.unwrap();
    assert_eq!(stored.category, Category::Other("Telefonía".to_owned()));
    assert_eq!(stored.category.to_string(), "Telefonía");
}

#[tokio::test]
async fn invalid_drafts_write_nothing() {
    let admin = admin().await;
    let err = admin.create_plan_with_features(&internet("Free", 0)).await.unwrap_err();
    assert!(matches!(err, CatalogError::ValidationFailed { .. }));
    assert_eq!(err.context(), Some("create_plan_with_features"));
    assert!(admin.plans(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn search_matches_name_or_category() {
    let admin = admin().await;
    admin.create_plan_with_features(&internet("Internet 100MB Fibra", 12500)).await.unwrap();
    admin.create_plan_with_features(&internet("Fibra Hogar", 9000)).await.unwrap();
    admin
        .create_plan_with_features(&PlanDraft::new("TV Digital", Decimal::new(6500, 0), "tv"))
        .await
        .unwrap();

    let mut names: Vec<_> =
        admin.search_plans("internet").await.unwrap().into_iter().map(|p| p.plan.name).collect();
    names.sort();
    assert_eq!(names, ["Fibra Hogar", "Internet 100MB Fibra"]);

    assert_eq!(admin.search_plans("DIGITAL").await.unwrap().len(), 1);
    assert!(admin.search_plans("satellite").await.unwrap().is_empty());
}

#[tokio::test]
async fn bulk_delete_ignores_unknown_ids() {
    let admin = admin().await;
    let keep = admin.create_plan_with_features(&internet("Keep", 1)).await.unwrap();
    let gone = admin.create_plan_with_features(&internet("Gone", 2)).await.unwrap();

    let removed =
        admin.bulk_delete_plans(&[gone.id.clone(), PlanId::from("unknown")]).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(admin.bulk_delete_plans(&[]).await.unwrap(), 0);

    let left: Vec<_> = admin.plans(None).await.unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(left, [keep.id]);
}

#[tokio::test]
async fn availability_listing_joins_names() {
    let admin = admin().await;
    let l1 = admin.create_locality("Resistencia").await.unwrap();
    let z1 = admin.create_zone_type("Urbano").await.unwrap();
    let z2 = admin.create_zone_type("Rural").await.unwrap();
    let plan = admin
        .create_plan_with_features(
            &internet("Internet 50MB", 8500)
                .available_at(l1.id.clone(), z1.id.clone())
                .available_at(l1.id.clone(), z2.id.clone())
                .available_at(l1.id.clone(), z1.id.clone()),
        )
        .await
        .unwrap();

    let all = admin.plan_availability(Some(&l1.id), None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|row| row.plan.id == plan.id && row.locality.name == "Resistencia"));

    let rural = admin.plan_availability(None, Some(&z2.id)).await.unwrap();
    assert_eq!(rural.len(), 1);
    assert_eq!(rural[0].zone_type.name, "Rural");
}

#[tokio::test]
async fn tokens_resolve_against_live_names() {
    let admin = admin().await;
    let l1 = admin.create_locality("Puerto Vilelas").await.unwrap();
    let z1 = admin.create_zone_type("Urbano").await.unwrap();

    let parsed = admin
        .parse_availability(["puerto vilelas-URBANO", "Charata-Urbano", "broken"])
        .await
        .unwrap();
    assert_eq!(parsed.pairs.len(), 1);
    assert_eq!(parsed.pairs[0].locality_id, l1.id);
    assert_eq!(parsed.pairs[0].zone_type_id, z1.id);
    assert_eq!(parsed.dropped.len(), 2);
    assert_eq!(parsed.dropped[0].reason, DropReason::UnknownLocality("charata".into()));
    assert_eq!(parsed.dropped[1].reason, DropReason::Malformed);
}

#[tokio::test]
async fn dashboard_counts_everything() {
    let admin = admin().await;
    admin.create_locality("Resistencia").await.unwrap();
    admin.create_zone_type("Urbano").await.unwrap();
    for price in 1..=6 {
        admin.create_plan_with_features(&internet(&format!("Plan {price}"), price)).await.unwrap();
    }
    admin
        .create_plan_with_features(&PlanDraft::new("TV", Decimal::new(6500, 0), "tv"))
        .await
        .unwrap();

    let stats = admin.dashboard_stats().await.unwrap();
    assert_eq!(stats.total_plans, 7);
    assert_eq!(stats.total_localities, 1);
    assert_eq!(stats.total_zone_types, 1);
    assert_eq!(stats.plans_by_category.get("internet"), Some(&6));
    assert_eq!(stats.plans_by_category.get("tv"), Some(&1));
    assert_eq!(stats.recent_plans.len(), 5);
    assert!(stats.recent_plans.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}

#[tokio::test]
async fn export_serializes_the_whole_catalog() {
    let admin = admin().await;
    admin.create_locality("Resistencia").await.unwrap();
    admin
        .create_plan_with_features(&internet("Internet 50MB", 8500).feature(FeatureSpec::new("50 Mbps")))
        .await
        .unwrap();

    let export = admin.export_catalog().await.unwrap();
    assert_eq!(export.plans.len(), 1);
    assert_eq!(export.localities.len(), 1);
    assert!(export.zone_types.is_empty());

    let json = serde_json::to_value(&export).unwrap();
    assert_eq!(json["plans"][0]["name"], "Internet 50MB");
    assert_eq!(json["plans"][0]["features"][0]["description"], "50 Mbps");
}

#[tokio::test]
async fn seeding_twice_reuses_existing_rows() {
    let admin = admin().await;
    admin.create_locality("Resistencia").await.unwrap();

    let first = seed(&admin).await.unwrap();
    assert_eq!(
        first,
        SeedReport {
            localities_created: 5,
            localities_reused: 1,
            zone_types_created: 2,
            zone_types_reused: 0,
            plans_created: 4,
            plans_skipped: 0,
        }
    );

    let second = seed(&admin).await.unwrap();
    assert_eq!(second.localities_reused, 6);
    assert_eq!(second.plans_created, 0);
    assert_eq!(second.plans_skipped, 4);

    let resistencia = admin.locality_by_name("Resistencia").await.unwrap();
    let rural = admin.zone_type_by_name("rural").await.unwrap();
    let offered = admin.get_available_plans(&resistencia.id, &rural.id).await.unwrap();
    assert_eq!(offered.len(), 4);
    let fiber = offered.iter().find(|p| p.plan.name == "Internet 100MB Fibra").unwrap();
    assert_eq!(fiber.features.len(), 5);
    assert_eq!(fiber.features[4].description, "Soporte 24/7");

    assert_eq!(admin.plan_availability(None, None).await.unwrap().len(), 4 * 6 * 2);
}

#[tokio::test]
async fn outage_is_reported_for_writes_too() {
    let admin = admin().await;
    admin.store().as_memory().unwrap().set_online(false);

    let err = admin.create_locality("Resistencia").await.unwrap_err();
    assert!(matches!(err, CatalogError::BackendUnavailable { .. }));
    let err = admin.create_plan_with_features(&internet("X", 1)).await.unwrap_err();
    assert!(matches!(err, CatalogError::BackendUnavailable { .. }));
}
