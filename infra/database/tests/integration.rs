use nexo_database::*;

static LOCALITY: TableSchema =
    TableSchema { name: "locality", version: 1, columns: &[Column::text("name").unique()] };
static COVERAGE: TableSchema = TableSchema {
    name: "coverage",
    version: 1,
    columns: &[Column::text("locality_id").references("locality"), Column::int("rank")],
};

async fn memory() -> Database {
    Database::builder()
        .url(MEMORY_URL)
        .tables([&LOCALITY, &COVERAGE])
        .init()
        .await
        .expect("open memory store")
}

fn named(name: &str) -> Fields {
    Fields::from([("name", Value::from(name))])
}

#[tokio::test]
async fn missing_parameters_fail_validation() {
    let err = Database::builder().init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));

    let err = Database::builder().url("mem://").init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));
}

#[tokio::test]
async fn inconsistent_schemas_are_rejected_before_connecting() {
    let err = Database::builder()
        .url(MEMORY_URL)
        .tables([&COVERAGE, &LOCALITY])
        .init()
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));
}

#[tokio::test]
async fn memory_handle_is_shared_between_clones() {
    let db = memory().await;
    let clone = db.clone();
    let row = db.insert("locality", named("Fontana")).await.unwrap();

    let rows = clone.select("locality", Query::filter(Filter::eq(ID, row.id.as_str()))).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text("name").unwrap(), "Fontana");
    assert_eq!(clone.url(), MEMORY_URL);
    assert!(clone.as_memory().is_some());
}

#[tokio::test]
async fn search_and_order_through_the_handle() {
    let db = memory().await;
    for name in ["Charata", "Barranqueras", "Puerto Vilelas"] {
        db.insert("locality", named(name)).await.unwrap();
    }

    let query = Query::filter(Filter::contains("name", "AR"))
        .order_by("name", Direction::Desc);
    let names: Vec<String> = db
        .select("locality", query)
        .await
        .unwrap()
        .iter()
        .map(|r| r.text("name").unwrap())
        .collect();
    assert_eq!(names, ["Charata", "Barranqueras"]);

    let newest = db
        .select("locality", Query::all().order_by(CREATED_AT, Direction::Desc))
        .await
        .unwrap();
    assert_eq!(newest.len(), 3);
    assert!(newest[0].created_at >= newest[2].created_at);
}

#[tokio::test]
async fn delete_counts_only_the_target_table() {
    let db = memory().await;
    let locality = db.insert("locality", named("Resistencia")).await.unwrap();
    for rank in 0..3_i64 {
        let fields = Fields::from([
            ("locality_id", Value::from(&locality.id)),
            ("rank", Value::from(rank)),
        ]);
        db.insert("coverage", fields).await.unwrap();
    }

    let removed = db.delete("locality", Filter::All).await.unwrap();
    assert_eq!(removed, 1);
    assert!(db.select("coverage", Query::all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn embedded_surreal_engine_applies_migrations() {
    let db = Database::builder()
        .url("mem://")
        .session("nexo", "test")
        .tables([&LOCALITY, &COVERAGE])
        .init()
        .await
        .expect("connect to mem://");

    assert!(db.as_memory().is_none());
    assert!(db.select("locality", Query::all()).await.unwrap().is_empty());
}

async fn embedded(database: &str) -> Database {
    Database::builder()
        .url("mem://")
        .session("nexo", database)
        .tables([&LOCALITY, &COVERAGE])
        .init()
        .await
        .expect("connect to mem://")
}

fn coverage(locality: &Record, rank: i64) -> Fields {
    Fields::from([("locality_id", Value::from(&locality.id)), ("rank", Value::from(rank))])
}

#[tokio::test]
async fn embedded_engine_enforces_unique_names_and_references() {
    let db = embedded("constraints").await;
    db.insert("locality", named("Resistencia")).await.unwrap();

    let err = db.insert("locality", named("RESISTENCIA")).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Conflict { .. }));

    let fields =
        Fields::from([("locality_id", Value::from("missing")), ("rank", Value::from(0_i64))]);
    let err = db.insert("coverage", fields).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Reference { .. }));

    assert_eq!(db.select("locality", Query::all()).await.unwrap().len(), 1);
    assert!(db.select("coverage", Query::all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn embedded_engine_updates_by_id_and_returns_the_rows() {
    let db = embedded("updates").await;
    let locality = db.insert("locality", named("Fontana")).await.unwrap();
    let target = db.insert("coverage", coverage(&locality, 0)).await.unwrap();
    db.insert("coverage", coverage(&locality, 1)).await.unwrap();

    let changes = Fields::from([("rank", Value::from(7_i64))]);
    let updated =
        db.update("coverage", Filter::eq(ID, target.id.as_str()), changes.clone()).await.unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].id, target.id);
    assert_eq!(updated[0].int("rank").unwrap(), 7);
    assert_eq!(updated[0].text("locality_id").unwrap(), locality.id);

    let none = db.update("coverage", Filter::eq(ID, "missing"), changes).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn embedded_engine_counts_deletes_and_cascades() {
    let db = embedded("deletes").await;
    let gone = db.insert("locality", named("Charata")).await.unwrap();
    let kept = db.insert("locality", named("Barranqueras")).await.unwrap();
    for rank in 0..3_i64 {
        db.insert("coverage", coverage(&gone, rank)).await.unwrap();
    }
    db.insert("coverage", coverage(&kept, 0)).await.unwrap();

    let removed = db.delete("locality", Filter::eq(ID, gone.id.as_str())).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(db.delete("locality", Filter::eq(ID, gone.id.as_str())).await.unwrap(), 0);

    let left = db.select("coverage", Query::all()).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].text("locality_id").unwrap(), kept.id);
}

#[tokio::test]
async fn embedded_engine_orders_by_column_and_creation() {
    let db = embedded("ordering").await;
    let locality = db.insert("locality", named("Puerto Vilelas")).await.unwrap();
    for rank in [2_i64, 0, 1] {
        db.insert("coverage", coverage(&locality, rank)).await.unwrap();
    }

    let ranks: Vec<i64> = db
        .select("coverage", Query::all().order_by("rank", Direction::Asc))
        .await
        .unwrap()
        .iter()
        .map(|r| r.int("rank").unwrap())
        .collect();
    assert_eq!(ranks, [0, 1, 2]);

    let oldest_first: Vec<i64> = db
        .select("coverage", Query::all().order_by(CREATED_AT, Direction::Asc))
        .await
        .unwrap()
        .iter()
        .map(|r| r.int("rank").unwrap())
        .collect();
    assert_eq!(oldest_first, [2, 0, 1]);
}
