//! Backend-neutral row filters and orderings.
//!
//! Both stores evaluate the same [`Filter`] semantics: `Eq`/`In` compare exactly,
//! `ContainsIgnoreCase` is a case-insensitive substring test on a text column, an empty
//! `In` or `Or` matches nothing and an empty `And` matches everything. Sorting is stable
//! and always starts from creation order, so rows that compare equal keep the order in
//! which they were inserted.

use crate::error::DatabaseError;
use crate::record::{Record, Value};
use crate::schema::{CREATED_AT, ColumnKind, ID, TableSchema};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    Eq(&'static str, Value),
    In(&'static str, Vec<Value>),
    ContainsIgnoreCase(&'static str, String),
    And(Vec<Self>),
    Or(Vec<Self>),
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Self::Eq(column, value.into())
    }

    pub fn is_in<V: Into<Value>>(column: &'static str, values: impl IntoIterator<Item = V>) -> Self {
        Self::In(column, values.into_iter().map(Into::into).collect())
    }

    pub fn contains(column: &'static str, needle: impl Into<String>) -> Self {
        Self::ContainsIgnoreCase(column, needle.into())
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            },
            first => Self::And(vec![first, other]),
        }
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Or(mut filters) => {
                filters.push(other);
                Self::Or(filters)
            },
            first => Self::Or(vec![first, other]),
        }
    }

    /// Checks that every referenced column exists in `schema` and that values fit its kind.
    ///
    /// # Errors
    /// [`DatabaseError::Validation`] naming the offending column.
    pub fn validate(&self, schema: &TableSchema) -> Result<(), DatabaseError> {
        match self {
            Self::All => Ok(()),
            Self::Eq(column, value) => check_value(schema, column, value),
            Self::In(column, values) => {
                values.iter().try_for_each(|value| check_value(schema, column, value))?;
                column_kind(schema, column).map(|_| ())
            },
            Self::ContainsIgnoreCase(column, _) => match column_kind(schema, column)? {
                ColumnKind::Text => Ok(()),
                kind => Err(invalid(
                    schema,
                    format!("Substring search needs a text column, '{column}' is {kind:?}"),
                )),
            },
            Self::And(filters) | Self::Or(filters) => {
                filters.iter().try_for_each(|filter| filter.validate(schema))
            },
        }
    }

    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::Eq(column, value) => record.get(column).as_ref() == Some(value),
            Self::In(column, values) => {
                record.get(column).is_some_and(|current| values.contains(&current))
            },
            Self::ContainsIgnoreCase(column, needle) => {
                record.get(column).as_ref().and_then(Value::as_text).is_some_and(|text| {
                    text.to_lowercase().contains(&needle.to_lowercase())
                })
            },
            Self::And(filters) => filters.iter().all(|filter| filter.matches(record)),
            Self::Or(filters) => filters.iter().any(|filter| filter.matches(record)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub direction: Direction,
}

/// Filter plus orderings applied by [`crate::Store::select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub filter: Filter,
    pub order: Vec<Order>,
}

impl Default for Query {
    fn default() -> Self {
        Self::all()
    }
}

impl Query {
    #[must_use]
    pub const fn all() -> Self {
        Self { filter: Filter::All, order: Vec::new() }
    }

    #[must_use]
    pub const fn filter(filter: Filter) -> Self {
        Self { filter, order: Vec::new() }
    }

    /// Adds an ordering; earlier orderings take precedence over later ones.
    #[must_use]
    pub fn order_by(mut self, column: &'static str, direction: Direction) -> Self {
        self.order.push(Order { column, direction });
        self
    }

    /// # Errors
    /// [`DatabaseError::Validation`] for unknown columns or mismatched value kinds.
    pub fn validate(&self, schema: &TableSchema) -> Result<(), DatabaseError> {
        self.filter.validate(schema)?;
        for order in &self.order {
            if order.column != CREATED_AT {
                column_kind(schema, order.column)?;
            }
        }
        Ok(())
    }
}

/// Sorts `records` by creation time and then, stably, by `orders`.
pub fn sort_records(records: &mut [Record], orders: &[Order]) {
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    if orders.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        orders
            .iter()
            .map(|order| {
                let ordering = compare_column(a, b, order.column);
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

fn compare_column(a: &Record, b: &Record, column: &str) -> Ordering {
    if column == CREATED_AT {
        return a.created_at.cmp(&b.created_at);
    }
    match (a.get(column), b.get(column)) {
        (Some(Value::Text(x)), Some(Value::Text(y))) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Some(Value::Int(x)), Some(Value::Int(y))) => x.cmp(&y),
        (Some(Value::Decimal(x)), Some(Value::Decimal(y))) => x.cmp(&y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn column_kind(schema: &TableSchema, column: &str) -> Result<ColumnKind, DatabaseError> {
    if column == ID {
        return Ok(ColumnKind::Text);
    }
    schema
        .column(column)
        .map(|c| c.kind)
        .ok_or_else(|| invalid(schema, format!("Unknown column '{column}'")))
}

fn check_value(schema: &TableSchema, column: &str, value: &Value) -> Result<(), DatabaseError> {
    let kind = column_kind(schema, column)?;
    if value.kind() == kind {
        Ok(())
    } else {
        Err(invalid(
            schema,
            format!("Column '{column}' is {kind:?}, got a {:?} value", value.kind()),
        ))
    }
}

fn invalid(schema: &TableSchema, message: String) -> DatabaseError {
    DatabaseError::Validation { message: message.into(), context: Some(schema.name.into()) }
}
