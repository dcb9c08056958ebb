use nexo_catalog::{Catalog, CatalogError, PlanAdmin, TABLES};
use nexo_database::{Database, MEMORY_URL};
use nexo_domain::{Category, FeatureSpec, Locality, LocalityId, PlanDraft, ZoneType, ZoneTypeId};
use rust_decimal::Decimal;

async fn admin() -> PlanAdmin<Database> {
    let db = Database::builder().url(MEMORY_URL).tables(TABLES).init().await.unwrap();
    Catalog::new(db).admin()
}

async fn area(admin: &PlanAdmin<Database>, locality: &str, zone: &str) -> (Locality, ZoneType) {
    let locality = admin.create_locality(locality).await.unwrap();
    let zone_type = admin.create_zone_type(zone).await.unwrap();
    (locality, zone_type)
}

#[tokio::test]
async fn no_availability_rows_yield_an_empty_result() {
    let admin = admin().await;
    let (l1, z1) = area(&admin, "Resistencia", "Urbano").await;
    let draft = PlanDraft::new("TV Digital", Decimal::new(6500, 0), "tv");
    admin.create_plan_with_features(&draft).await.unwrap();

    let plans = admin.get_available_plans(&l1.id, &z1.id).await.unwrap();
    assert!(plans.is_empty());

    let unknown =
        admin.get_available_plans(&LocalityId::from("nope"), &ZoneTypeId::from("nope")).await;
    assert!(unknown.unwrap().is_empty());
}

#[tokio::test]
async fn created_plan_round_trips_through_the_resolver() {
    let admin = admin().await;
    let (l1, z1) = area(&admin, "Resistencia", "Urbano").await;
    let (l2, _) = area(&admin, "Fontana", "Rural").await;

    let draft = PlanDraft::new("Internet 50MB", Decimal::new(8500, 0), "internet")
        .feature(FeatureSpec::new("50 Mbps"))
        .available_at(l1.id.clone(), z1.id.clone());
    let created = admin.create_plan_with_features(&draft).await.unwrap();

    let plans = admin.get_available_plans(&l1.id, &z1.id).await.unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].plan, created);
    assert_eq!(plans[0].plan.name, "Internet 50MB");
    assert_eq!(plans[0].plan.price, Decimal::new(8500, 0));
    assert_eq!(plans[0].plan.category, Category::Internet);
    assert_eq!(plans[0].features.len(), 1);
    assert_eq!(plans[0].features[0].description, "50 Mbps");
    assert_eq!(plans[0].features[0].icon_name, "check_circle");

    assert!(admin.get_available_plans(&l2.id, &z1.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn features_come_back_in_insertion_order() {
    let admin = admin().await;
    let (l1, z1) = area(&admin, "Resistencia", "Urbano").await;
    let draft = PlanDraft::new("Combo", Decimal::new(16500, 0), "combo")
        .feature(FeatureSpec::new("f0").with_icon("speed"))
        .feature(FeatureSpec::new("f1"))
        .feature(FeatureSpec::new("f2").with_icon("tv"))
        .available_at(l1.id.clone(), z1.id.clone());
    admin.create_plan_with_features(&draft).await.unwrap();

    let plans = admin.get_available_plans(&l1.id, &z1.id).await.unwrap();
    let features: Vec<_> =
        plans[0].features.iter().map(|f| (f.description.as_str(), f.sort_order)).collect();
    assert_eq!(features, [("f0", 0), ("f1", 1), ("f2", 2)]);
    assert_eq!(plans[0].features[0].icon_name, "speed");
}

#[tokio::test]
async fn duplicate_rows_resolve_to_distinct_plans_in_first_seen_order() {
    let admin = admin().await;
    let (l1, z1) = area(&admin, "Resistencia", "Urbano").await;
    let first = admin
        .create_plan_with_features(
            &PlanDraft::new("B plan", Decimal::new(2, 0), "internet").available_at(
                l1.id.clone(),
                z1.id.clone(),
            ),
        )
        .await
        .unwrap();
    let second = admin
        .create_plan_with_features(
            &PlanDraft::new("A plan", Decimal::new(1, 0), "internet").available_at(
                l1.id.clone(),
                z1.id.clone(),
            ),
        )
        .await
        .unwrap();
    admin.add_plan_availability(&first.id, &l1.id, &z1.id).await.unwrap();

    let plans = admin.get_available_plans(&l1.id, &z1.id).await.unwrap();
    let ids: Vec<_> = plans.iter().map(|p| p.plan.id.clone()).collect();
    assert_eq!(ids, [first.id, second.id]);
}

#[tokio::test]
async fn deleted_plan_disappears_from_results() {
    let admin = admin().await;
    let (l1, z1) = area(&admin, "Resistencia", "Urbano").await;
    let draft = PlanDraft::new("Internet 50MB", Decimal::new(8500, 0), "internet")
        .feature(FeatureSpec::new("50 Mbps"))
        .available_at(l1.id.clone(), z1.id.clone());
    let plan = admin.create_plan_with_features(&draft).await.unwrap();

    admin.delete_plan(&plan.id).await.unwrap();

    assert!(admin.get_available_plans(&l1.id, &z1.id).await.unwrap().is_empty());
    assert!(admin.features_of(&plan.id).await.unwrap().is_empty());
    assert!(matches!(admin.plan(&plan.id).await, Err(CatalogError::NotFound { .. })));
}

#[tokio::test]
async fn blank_identifiers_are_rejected() {
    let admin = admin().await;
    let err = admin
        .get_available_plans(&LocalityId::from(" "), &ZoneTypeId::from("z"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::ValidationFailed { .. }));
    assert_eq!(err.context(), Some("get_available_plans"));
}

#[tokio::test]
async fn store_outage_surfaces_as_backend_unavailable() {
    let admin = admin().await;
    let (l1, z1) = area(&admin, "Resistencia", "Urbano").await;
    admin.store().as_memory().unwrap().set_online(false);

    let err = admin.get_available_plans(&l1.id, &z1.id).await.unwrap_err();
    assert!(matches!(err, CatalogError::BackendUnavailable { .. }));
    assert_eq!(err.context(), Some("get_available_plans"));
}
