use super::sql::define_table;
use crate::error::{DatabaseError, DatabaseErrorExt};
use crate::schema::TableSchema;
use fxhash::FxHashMap;
use sha2::{Digest, Sha256};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::types::SurrealValue;

const HISTORY_TABLE: &str = "schema_migration";

/// Schema definition of one table at one version.
#[derive(Debug)]
pub(crate) struct Migration {
    table: &'static str,
    version: String,
    script: String,
    checksum: String,
}

impl Migration {
    pub(crate) fn for_table(schema: &TableSchema) -> Self {
        let script = define_table(schema);
        let checksum = hex::encode(Sha256::digest(script.as_bytes()));
        Self { table: schema.name, version: schema.version.to_string(), script, checksum }
    }

    fn key(&self) -> String {
        format!("{}:{}", self.table, self.version)
    }

    fn to_applied(&self) -> AppliedMigration {
        AppliedMigration {
            table_name: self.table.to_owned(),
            version: self.version.clone(),
            checksum: self.checksum.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct MigrationReport {
    pub(crate) applied: Vec<AppliedMigration>,
    pub(crate) skipped: Vec<AppliedMigration>,
}

#[derive(Debug, SurrealValue)]
pub(crate) struct AppliedMigration {
    pub(crate) table_name: String,
    pub(crate) version: String,
    pub(crate) checksum: String,
}

/// Applies table definitions that are not yet recorded in the migration history.
#[derive(Debug)]
pub(crate) struct MigrationRunner<'a> {
    db: &'a Surreal<Any>,
}

impl<'a> MigrationRunner<'a> {
    pub(crate) const fn new(db: &'a Surreal<Any>) -> Self {
        Self { db }
    }

    pub(crate) async fn run(
        &self,
        schemas: &[&'static TableSchema],
    ) -> Result<MigrationReport, DatabaseError> {
        let mut report = MigrationReport::default();
        let applied_migrations = self.get_migrations_map().await?;

        for migration in schemas.iter().map(|schema| Migration::for_table(schema)) {
            if let Some(applied) = applied_migrations.get(&migration.key()) {
                ensure_checksum_match(&migration, &applied.checksum)?;
                report.skipped.push(migration.to_applied());
                continue;
            }

            self.apply_migration(&migration).await?;
            report.applied.push(migration.to_applied());
        }

        Ok(report)
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<(), DatabaseError> {
        let query = format!(
            "BEGIN TRANSACTION;
            {}
            CREATE {HISTORY_TABLE} CONTENT {{
                table_name: $table, version: $version, checksum: $checksum, applied_at: time::now()
            }} RETURN NONE;
            COMMIT TRANSACTION;",
            migration.script,
        );

        self.db
            .query(&query)
            .bind(("table", migration.table))
            .bind(("version", migration.version.clone()))
            .bind(("checksum", migration.checksum.clone()))
            .await
            .context(format!("SQL execution failed at {}", migration.key()))?
            .check()
            .map_err(surrealdb::Error::from)
            .context(format!("Applying migration {}", migration.key()))?;

        Ok(())
    }

    async fn get_migrations_map(
        &self,
    ) -> Result<FxHashMap<String, AppliedMigration>, DatabaseError> {
        let query = format!(
            "DEFINE TABLE IF NOT EXISTS {HISTORY_TABLE} SCHEMALESS;
            SELECT table_name, version, checksum FROM {HISTORY_TABLE};"
        );
        let entries = self
            .db
            .query(&query)
            .await
            .context("Loading applied migrations")?
            .take::<Vec<AppliedMigration>>(1)
            .context("Parsing migrations map")?;

        Ok(entries
            .into_iter()
            .map(|entry| (format!("{}:{}", entry.table_name, entry.version), entry))
            .collect())
    }
}

fn ensure_checksum_match(migration: &Migration, existing: &str) -> Result<(), DatabaseError> {
    if existing != migration.checksum {
        return Err(DatabaseError::Migration {
            message: format!(
                "Checksum mismatch for {} (expected {}, got {})",
                migration.key(),
                existing,
                migration.checksum
            )
            .into(),
            context: Some("Bump the table version when its columns change".into()),
        });
    }
    Ok(())
}
