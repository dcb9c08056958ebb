//! Declarative table descriptions shared by every store backend.

use crate::error::DatabaseError;

/// System column holding the store-assigned identifier of a row.
pub const ID: &str = "id";
/// System column holding the store-assigned creation timestamp of a row.
pub const CREATED_AT: &str = "created_at";

/// Value kind of a user column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Text,
    Int,
    Decimal,
}

/// One user column of a table.
///
/// Unique columns are compared case-insensitively. A referencing column holds the `id`
/// of a row in another table; deleting that row deletes the referencing rows as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub unique: bool,
    pub references: Option<&'static str>,
}

impl Column {
    #[must_use]
    pub const fn text(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Text, unique: false, references: None }
    }

    #[must_use]
    pub const fn int(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Int, unique: false, references: None }
    }

    #[must_use]
    pub const fn decimal(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Decimal, unique: false, references: None }
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the column as a cascading reference to `table`.
    #[must_use]
    pub const fn references(mut self, table: &'static str) -> Self {
        self.references = Some(table);
        self
    }
}

/// A named row collection.
///
/// `version` is bumped whenever `columns` change so that stores keeping a migration
/// history apply the new definition instead of reporting a checksum mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub version: u32,
    pub columns: &'static [Column],
}

impl TableSchema {
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns of this table that reference `table`.
    pub fn references_to<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Column> + 'a {
        self.columns.iter().filter(move |c| c.references == Some(table))
    }
}

/// Checks a set of schemas before a store is opened with them.
///
/// Table names must be unique, column names must not shadow the system columns or repeat,
/// and references may only target tables registered *earlier* in `tables`.
pub(crate) fn validate_tables(tables: &[&'static TableSchema]) -> Result<(), DatabaseError> {
    for (position, table) in tables.iter().enumerate() {
        let earlier = &tables[..position];

        if table.name.is_empty() || !table.name.chars().all(|c| c.is_ascii_lowercase() || c == '_')
        {
            return Err(invalid(format!("Table name '{}' must be lowercase snake_case", table.name)));
        }
        if earlier.iter().any(|t| t.name == table.name) {
            return Err(invalid(format!("Table '{}' is registered twice", table.name)));
        }

        for (index, column) in table.columns.iter().enumerate() {
            if column.name == ID || column.name == CREATED_AT {
                return Err(invalid(format!(
                    "Column '{}.{}' shadows a system column",
                    table.name, column.name
                )));
            }
            if table.columns[..index].iter().any(|c| c.name == column.name) {
                return Err(invalid(format!("Column '{}.{}' is declared twice", table.name, column.name)));
            }
            if let Some(target) = column.references {
                if column.kind != ColumnKind::Text {
                    return Err(invalid(format!(
                        "Reference column '{}.{}' must be a text column",
                        table.name, column.name
                    )));
                }
                if !earlier.iter().any(|t| t.name == target) {
                    return Err(invalid(format!(
                        "Column '{}.{}' references '{target}', which is not registered before it",
                        table.name, column.name
                    )));
                }
            }
        }
    }

    Ok(())
}

fn invalid(message: String) -> DatabaseError {
    DatabaseError::Validation { message: message.into(), context: Some("Table schema".into()) }
}
