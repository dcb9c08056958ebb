//! [SurrealDB](https://surrealdb.com) backed store reached through the `any` engine
//! (`mem://`, `rocksdb://`, `ws://`, `http://`).

mod migrations;
mod sql;

use crate::error::{DatabaseError, DatabaseErrorExt};
use crate::memory::check_fields;
use crate::query::{Filter, Query, sort_records};
use crate::record::{Fields, Record, Value};
use crate::schema::{ColumnKind, TableSchema};
use crate::store::Store;
use chrono::{DateTime, Utc};
use migrations::MigrationRunner;
use rust_decimal::Decimal;
use sql::{Args, UID, condition, projection};
use std::str::FromStr;
use std::time::Duration;
use surrealdb::Surreal;
use surrealdb::engine::any::{Any, connect};
use surrealdb::opt::auth::Root;
use tracing::{info, trace, warn};

const HEALTH_CHECK_ATTEMPTS: u32 = 3;

/// Connection parameters collected by [`crate::DatabaseBuilder`].
#[derive(Debug)]
pub(crate) struct ConnectOptions {
    pub(crate) url: String,
    pub(crate) namespace: String,
    pub(crate) database: String,
    pub(crate) auth: Option<(String, String)>,
}

#[derive(Debug)]
pub struct SurrealStore {
    instance: Surreal<Any>,
    schemas: Vec<&'static TableSchema>,
}

impl SurrealStore {
    /// Starts the engine, waits for it to become healthy, signs in, selects the session
    /// and applies pending table migrations.
    pub(crate) async fn connect(
        options: ConnectOptions,
        schemas: Vec<&'static TableSchema>,
    ) -> Result<Self, DatabaseError> {
        let ConnectOptions { url, namespace, database, auth } = options;

        let instance = connect(&url).await.map_err(|e| DatabaseError::Connection {
            message: e.to_string().into(),
            context: Some("Initializing engine".into()),
        })?;

        let mut delay = Duration::from_millis(500);
        for attempt in 1..=HEALTH_CHECK_ATTEMPTS {
            if instance.health().await.is_ok() {
                break;
            }
            if attempt == HEALTH_CHECK_ATTEMPTS {
                return Err(DatabaseError::Connection {
                    message: "Unhealthy after retries".into(),
                    context: Some(url.into()),
                });
            }
            warn!(attempt, ?delay, "Database not ready, retrying...");
            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        if let Some((username, password)) = auth {
            instance.signin(Root { username, password }).await.map_err(|e| {
                DatabaseError::Auth { message: e.to_string().into(), context: Some(url.into()) }
            })?;
        }

        instance.use_ns(&namespace).use_db(&database).await.context("Activating session")?;

        let version =
            instance.version().await.map_or_else(|_| "unknown".to_owned(), |v| v.to_string());
        info!(%namespace, %database, %version, "SurrealDB connection established");

        let report = MigrationRunner::new(&instance).run(&schemas).await?;
        for skipped in report.skipped {
            trace!(table = %skipped.table_name, version = %skipped.version, "Skipping migration");
        }
        for applied in report.applied {
            info!(table = %applied.table_name, version = %applied.version, "Applied migration");
        }

        Ok(Self { instance, schemas })
    }

    fn schema(&self, table: &str) -> Result<&'static TableSchema, DatabaseError> {
        self.schemas.iter().copied().find(|schema| schema.name == table).ok_or_else(|| {
            DatabaseError::Validation {
                message: format!("Unknown table '{table}'").into(),
                context: None,
            }
        })
    }

    /// Runs `statement` and reads the row arrays produced by statement `index`.
    async fn rows(
        &self,
        statement: &str,
        args: Args,
        index: usize,
        schema: &TableSchema,
        operation: &'static str,
    ) -> Result<Vec<Record>, DatabaseError> {
        trace!(%statement, "Executing statement");
        let rows = self
            .instance
            .query(statement)
            .bind(("args", args.into_inner()))
            .await
            .map_err(|e| classify(e, operation))?
            .check()
            .map_err(|e| classify(surrealdb::Error::from(e), operation))?
            .take::<Vec<Vec<String>>>(index)
            .context(operation)?;
        rows.into_iter().map(|row| decode_row(schema, row)).collect()
    }
}

impl Store for SurrealStore {
    async fn select(&self, table: &'static str, query: Query) -> Result<Vec<Record>, DatabaseError> {
        let schema = self.schema(table)?;
        query.validate(schema)?;

        let mut args = Args::default();
        let statement = format!(
            "SELECT VALUE {} FROM {table} WHERE {};",
            projection(schema),
            condition(&query.filter, &mut args)
        );
        let mut records = self.rows(&statement, args, 0, schema, "Selecting rows").await?;
        sort_records(&mut records, &query.order);
        Ok(records)
    }

    async fn insert(&self, table: &'static str, fields: Fields) -> Result<Record, DatabaseError> {
        let schema = self.schema(table)?;
        check_fields(schema, &fields, true)?;

        let record = Record::assign(fields);
        let mut args = Args::default();
        let id = args.push(record.id.clone(), ColumnKind::Text);
        let created_at = args.push(record.created_at.to_rfc3339(), ColumnKind::Text);
        let mut content = vec![format!("{UID}: {id}"), format!("created_at: <datetime> {created_at}")];
        content.extend(
            record.fields.iter().map(|(column, value)| format!("{column}: {}", args.value(value))),
        );
        let statement = format!("CREATE {table} CONTENT {{ {} }} RETURN NONE;", content.join(", "));

        trace!(%statement, "Executing statement");
        self.instance
            .query(&statement)
            .bind(("args", args.into_inner()))
            .await
            .map_err(|e| classify(e, "Inserting row"))?
            .check()
            .map_err(|e| classify(surrealdb::Error::from(e), "Inserting row"))?;
        trace!(table, id = %record.id, "Inserted row");
        Ok(record)
    }

    async fn update(
        &self,
        table: &'static str,
        filter: Filter,
        changes: Fields,
    ) -> Result<Vec<Record>, DatabaseError> {
        let schema = self.schema(table)?;
        filter.validate(schema)?;
        check_fields(schema, &changes, false)?;

        let mut args = Args::default();
        let matched = condition(&filter, &mut args);
        let assignments: Vec<String> = changes
            .iter()
            .map(|(column, value)| format!("{column} = {}", args.value(value)))
            .collect();
        let update = if assignments.is_empty() {
            String::new()
        } else {
            format!("UPDATE {table} SET {} WHERE {UID} IN $ids RETURN NONE;", assignments.join(", "))
        };
        let statement = format!(
            "LET $ids = (SELECT VALUE {UID} FROM {table} WHERE {matched});
            {update}
            SELECT VALUE {} FROM {table} WHERE {UID} IN $ids;",
            projection(schema)
        );

        let index = if assignments.is_empty() { 1 } else { 2 };
        let mut records = self.rows(&statement, args, index, schema, "Updating rows").await?;
        sort_records(&mut records, &[]);
        Ok(records)
    }

    async fn delete(&self, table: &'static str, filter: Filter) -> Result<usize, DatabaseError> {
        let schema = self.schema(table)?;
        filter.validate(schema)?;

        let mut args = Args::default();
        let statement = format!(
            "LET $ids = (SELECT VALUE {UID} FROM {table} WHERE {});
            DELETE {table} WHERE {UID} IN $ids RETURN NONE;
            RETURN array::len($ids);",
            condition(&filter, &mut args)
        );

        trace!(%statement, "Executing statement");
        let removed = self
            .instance
            .query(&statement)
            .bind(("args", args.into_inner()))
            .await
            .map_err(|e| classify(e, "Deleting rows"))?
            .check()
            .map_err(|e| classify(surrealdb::Error::from(e), "Deleting rows"))?
            .take::<Option<i64>>(2)
            .context("Deleting rows")?
            .unwrap_or_default();
        Ok(usize::try_from(removed).unwrap_or_default())
    }
}

/// Maps engine errors onto the store-neutral variants by their message.
fn classify(err: surrealdb::Error, operation: &'static str) -> DatabaseError {
    let message = err.to_string();
    if message.contains("already contains") {
        DatabaseError::Conflict { message: message.into(), context: Some(operation.into()) }
    } else if message.contains("must conform to") {
        DatabaseError::Reference { message: message.into(), context: Some(operation.into()) }
    } else {
        DatabaseError::Surreal { source: err, context: Some(operation.into()) }
    }
}

fn decode_row(schema: &TableSchema, row: Vec<String>) -> Result<Record, DatabaseError> {
    let mut cells = row.into_iter();
    let (Some(id), Some(created_at)) = (cells.next(), cells.next()) else {
        return Err(malformed(schema, "row is missing its identifier or timestamp"));
    };

    let mut fields = Fields::new();
    for (column, cell) in schema.columns.iter().zip(cells) {
        let value = match column.kind {
            ColumnKind::Text => Value::Text(cell),
            ColumnKind::Int => Value::Int(
                cell.parse().map_err(|_| malformed(schema, &format!("bad integer '{cell}'")))?,
            ),
            ColumnKind::Decimal => Value::Decimal(parse_decimal(&cell).ok_or_else(|| {
                malformed(schema, &format!("bad decimal '{cell}'"))
            })?),
        };
        fields.insert(column.name, value);
    }
    if fields.len() != schema.columns.len() {
        return Err(malformed(schema, "row has fewer columns than the table"));
    }

    Ok(Record { id, created_at: parse_datetime(&created_at)?, fields })
}

fn parse_decimal(cell: &str) -> Option<Decimal> {
    let raw = cell.trim().trim_end_matches("dec");
    Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw)).ok()
}

fn parse_datetime(cell: &str) -> Result<DateTime<Utc>, DatabaseError> {
    let raw = cell.trim().trim_start_matches("d'").trim_matches('\'').trim_matches('"');
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)).map_err(|e| {
        DatabaseError::Internal {
            message: format!("Cannot parse timestamp '{cell}': {e}").into(),
            context: Some("Decoding row".into()),
        }
    })
}

fn malformed(schema: &TableSchema, detail: &str) -> DatabaseError {
    DatabaseError::Internal {
        message: format!("Malformed {} row: {detail}", schema.name).into(),
        context: Some("Decoding row".into()),
    }
}
