//! In-process store selected with the `memory://` URL.
//!
//! Keeps every table in a vector guarded by a single lock, so each operation is atomic on
//! its own. The store can be switched offline to exercise unavailability handling.

use crate::error::DatabaseError;
use crate::query::{Filter, Query, sort_records};
use crate::record::{Fields, Record, Value};
use crate::schema::{ColumnKind, TableSchema};
use crate::store::Store;
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

type Tables = FxHashMap<&'static str, Vec<Record>>;

#[derive(Debug)]
pub struct MemoryStore {
    schemas: Vec<&'static TableSchema>,
    tables: RwLock<Tables>,
    online: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn new(schemas: Vec<&'static TableSchema>) -> Self {
        let tables = schemas.iter().map(|schema| (schema.name, Vec::new())).collect();
        Self { schemas, tables: RwLock::new(tables), online: AtomicBool::new(true) }
    }

    /// Simulates losing (or regaining) the connection to the store.
    pub fn set_online(&self, online: bool) {
        debug!(online, "Memory store availability changed");
        self.online.store(online, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> Result<(), DatabaseError> {
        if self.is_online() {
            Ok(())
        } else {
            Err(DatabaseError::Connection {
                message: "Memory store is offline".into(),
                context: None,
            })
        }
    }

    fn schema(&self, table: &str) -> Result<&'static TableSchema, DatabaseError> {
        self.schemas.iter().copied().find(|schema| schema.name == table).ok_or_else(|| {
            DatabaseError::Validation {
                message: format!("Unknown table '{table}'").into(),
                context: None,
            }
        })
    }

    fn select_rows(&self, table: &'static str, query: &Query) -> Result<Vec<Record>, DatabaseError> {
        self.ensure_online()?;
        let schema = self.schema(table)?;
        query.validate(schema)?;

        let tables = self.tables.read();
        let mut rows: Vec<Record> = rows_of(&tables, table)
            .iter()
            .filter(|record| query.filter.matches(record))
            .cloned()
            .collect();
        sort_records(&mut rows, &query.order);
        Ok(rows)
    }

    fn insert_row(&self, table: &'static str, fields: Fields) -> Result<Record, DatabaseError> {
        self.ensure_online()?;
        let schema = self.schema(table)?;
        check_fields(schema, &fields, true)?;

        let mut tables = self.tables.write();
        check_references(&tables, schema, &fields)?;
        check_unique(&tables, schema, &fields, &FxHashSet::default())?;

        let record = Record::assign(fields);
        tables.entry(table).or_default().push(record.clone());
        trace!(table, id = %record.id, "Inserted row");
        Ok(record)
    }

    fn update_rows(
        &self,
        table: &'static str,
        filter: &Filter,
        changes: &Fields,
    ) -> Result<Vec<Record>, DatabaseError> {
        self.ensure_online()?;
        let schema = self.schema(table)?;
        filter.validate(schema)?;
        check_fields(schema, changes, false)?;

        let mut tables = self.tables.write();
        check_references(&tables, schema, changes)?;

        let targets: FxHashSet<String> = rows_of(&tables, table)
            .iter()
            .filter(|record| filter.matches(record))
            .map(|record| record.id.clone())
            .collect();
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        let touches_unique = schema.columns.iter().any(|c| c.unique && changes.contains_key(c.name));
        if targets.len() > 1 && touches_unique {
            return Err(DatabaseError::Conflict {
                message: format!("Cannot write the same unique value to {} rows", targets.len())
                    .into(),
                context: Some(table.into()),
            });
        }
        check_unique(&tables, schema, changes, &targets)?;

        let mut updated = Vec::with_capacity(targets.len());
        for record in tables.entry(table).or_default().iter_mut() {
            if targets.contains(&record.id) {
                for (column, value) in changes {
                    record.fields.insert(*column, value.clone());
                }
                updated.push(record.clone());
            }
        }
        trace!(table, rows = updated.len(), "Updated rows");
        Ok(updated)
    }

    fn delete_rows(&self, table: &'static str, filter: &Filter) -> Result<usize, DatabaseError> {
        self.ensure_online()?;
        let schema = self.schema(table)?;
        filter.validate(schema)?;

        let mut tables = self.tables.write();
        let removed = self.delete_cascading(&mut tables, table, filter);
        trace!(table, rows = removed, "Deleted rows");
        Ok(removed)
    }

    fn delete_cascading(&self, tables: &mut Tables, table: &'static str, filter: &Filter) -> usize {
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        let mut removed_ids = Vec::new();
        rows.retain(|record| {
            let keep = !filter.matches(record);
            if !keep {
                removed_ids.push(Value::Text(record.id.clone()));
            }
            keep
        });
        let removed = before - rows.len();
        if removed_ids.is_empty() {
            return 0;
        }

        for dependent in &self.schemas {
            for column in dependent.references_to(table) {
                let cascade = Filter::In(column.name, removed_ids.clone());
                let count = self.delete_cascading(tables, dependent.name, &cascade);
                if count > 0 {
                    debug!(table = dependent.name, column = column.name, count, "Cascaded delete");
                }
            }
        }
        removed
    }
}

impl Store for MemoryStore {
    async fn select(&self, table: &'static str, query: Query) -> Result<Vec<Record>, DatabaseError> {
        self.select_rows(table, &query)
    }

    async fn insert(&self, table: &'static str, fields: Fields) -> Result<Record, DatabaseError> {
        self.insert_row(table, fields)
    }

    async fn update(
        &self,
        table: &'static str,
        filter: Filter,
        changes: Fields,
    ) -> Result<Vec<Record>, DatabaseError> {
        self.update_rows(table, &filter, &changes)
    }

    async fn delete(&self, table: &'static str, filter: Filter) -> Result<usize, DatabaseError> {
        self.delete_rows(table, &filter)
    }
}

fn rows_of<'a>(tables: &'a Tables, table: &str) -> &'a [Record] {
    tables.get(table).map(Vec::as_slice).unwrap_or_default()
}

/// Checks that `fields` only name known columns with values of the right kind.
///
/// Inserts must provide every column of the table.
pub(crate) fn check_fields(
    schema: &TableSchema,
    fields: &Fields,
    complete: bool,
) -> Result<(), DatabaseError> {
    for (name, value) in fields {
        let column = schema.column(name).ok_or_else(|| DatabaseError::Validation {
            message: format!("Unknown column '{name}'").into(),
            context: Some(schema.name.into()),
        })?;
        if column.kind != value.kind() {
            return Err(DatabaseError::Validation {
                message: format!("Column '{name}' is {:?}, got {:?}", column.kind, value.kind())
                    .into(),
                context: Some(schema.name.into()),
            });
        }
    }
    if complete
        && let Some(missing) = schema.columns.iter().find(|c| !fields.contains_key(c.name))
    {
        return Err(DatabaseError::Validation {
            message: format!("Column '{}' is required", missing.name).into(),
            context: Some(schema.name.into()),
        });
    }
    Ok(())
}

fn check_references(
    tables: &Tables,
    schema: &TableSchema,
    fields: &Fields,
) -> Result<(), DatabaseError> {
    for column in schema.columns {
        let (Some(target), Some(value)) = (column.references, fields.get(column.name)) else {
            continue;
        };
        let exists = rows_of(tables, target)
            .iter()
            .any(|record| Some(record.id.as_str()) == value.as_text());
        if !exists {
            return Err(DatabaseError::Reference {
                message: format!("No {target} row with id '{value}'").into(),
                context: Some(format!("{}.{}", schema.name, column.name).into()),
            });
        }
    }
    Ok(())
}

fn check_unique(
    tables: &Tables,
    schema: &TableSchema,
    fields: &Fields,
    ignore: &FxHashSet<String>,
) -> Result<(), DatabaseError> {
    for column in schema.columns.iter().filter(|c| c.unique && c.kind == ColumnKind::Text) {
        let Some(candidate) = fields.get(column.name).and_then(Value::as_text) else {
            continue;
        };
        let candidate = candidate.to_lowercase();
        let taken = rows_of(tables, schema.name).iter().any(|record| {
            !ignore.contains(&record.id)
                && record
                    .fields
                    .get(column.name)
                    .and_then(Value::as_text)
                    .is_some_and(|existing| existing.to_lowercase() == candidate)
        });
        if taken {
            return Err(DatabaseError::Conflict {
                message: format!(
                    "{}.{} already contains '{}'",
                    schema.name,
                    column.name,
                    fields.get(column.name).map(ToString::to_string).unwrap_or_default()
                )
                .into(),
                context: None,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Direction;
    use crate::schema::{Column, ID};

    static PARENT: TableSchema =
        TableSchema { name: "parent", version: 1, columns: &[Column::text("name").unique()] };
    static CHILD: TableSchema = TableSchema {
        name: "child",
        version: 1,
        columns: &[Column::text("parent_id").references("parent"), Column::int("rank")],
    };
    static GRANDCHILD: TableSchema = TableSchema {
        name: "grandchild",
        version: 1,
        columns: &[Column::text("child_id").references("child")],
    };

    fn store() -> MemoryStore {
        MemoryStore::new(vec![&PARENT, &CHILD, &GRANDCHILD])
    }

    fn named(name: &str) -> Fields {
        Fields::from([("name", Value::from(name))])
    }

    fn child(parent: &str, rank: i64) -> Fields {
        Fields::from([("parent_id", Value::from(parent)), ("rank", Value::from(rank))])
    }

    #[tokio::test]
    async fn unique_columns_ignore_case() {
        let store = store();
        store.insert("parent", named("Resistencia")).await.unwrap();
        let err = store.insert("parent", named("RESISTENCIA")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict { .. }));
    }

    #[tokio::test]
    async fn dangling_references_are_rejected() {
        let store = store();
        let err = store.insert("child", child("missing", 0)).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Reference { .. }));
    }

    #[tokio::test]
    async fn deletes_cascade_transitively() {
        let store = store();
        let parent = store.insert("parent", named("a")).await.unwrap();
        let other = store.insert("parent", named("b")).await.unwrap();
        let first = store.insert("child", child(&parent.id, 0)).await.unwrap();
        store.insert("child", child(&other.id, 0)).await.unwrap();
        store
            .insert("grandchild", Fields::from([("child_id", Value::from(&first.id))]))
            .await
            .unwrap();

        let removed = store.delete("parent", Filter::eq(ID, parent.id.as_str())).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.select("child", Query::all()).await.unwrap().len(), 1);
        assert!(store.select("grandchild", Query::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn select_orders_with_creation_tie_break() {
        let store = store();
        let parent = store.insert("parent", named("a")).await.unwrap();
        for rank in [2, 1, 2, 0] {
            store.insert("child", child(&parent.id, rank)).await.unwrap();
        }
        let rows = store
            .select("child", Query::all().order_by("rank", Direction::Asc))
            .await
            .unwrap();
        let ranks: Vec<_> = rows.iter().map(|r| r.int("rank").unwrap()).collect();
        assert_eq!(ranks, [0, 1, 2, 2]);
        assert!(rows[2].created_at <= rows[3].created_at);
    }

    #[tokio::test]
    async fn update_keeps_uniqueness_and_returns_rows() {
        let store = store();
        let a = store.insert("parent", named("a")).await.unwrap();
        store.insert("parent", named("b")).await.unwrap();

        let err = store.update("parent", Filter::eq(ID, a.id.as_str()), named("B")).await;
        assert!(matches!(err, Err(DatabaseError::Conflict { .. })));

        let renamed = store.update("parent", Filter::eq(ID, a.id.as_str()), named("A")).await.unwrap();
        assert_eq!(renamed.len(), 1);
        assert_eq!(renamed[0].text("name").unwrap(), "A");
        assert!(store.update("parent", Filter::eq(ID, "none"), named("c")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inserts_must_be_complete_and_typed() {
        let store = store();
        let err = store.insert("child", Fields::new()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Validation { .. }));
        let err = store.insert("parent", Fields::from([("name", Value::from(3_i64))])).await;
        assert!(matches!(err, Err(DatabaseError::Validation { .. })));
        let err = store.select("nowhere", Query::all()).await;
        assert!(matches!(err, Err(DatabaseError::Validation { .. })));
    }

    #[tokio::test]
    async fn offline_store_reports_connection_errors() {
        let store = store();
        store.set_online(false);
        let err = store.select("parent", Query::all()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Connection { .. }));
        store.set_online(true);
        assert!(store.select("parent", Query::all()).await.is_ok());
    }
}
