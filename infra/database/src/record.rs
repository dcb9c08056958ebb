use crate::error::DatabaseError;
use crate::schema::{ColumnKind, ID};
use chrono::{DateTime, Utc};
use nanoid::nanoid;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Text(String),
    Int(i64),
    Decimal(Decimal),
}

impl Value {
    #[must_use]
    pub const fn kind(&self) -> ColumnKind {
        match self {
            Self::Text(_) => ColumnKind::Text,
            Self::Int(_) => ColumnKind::Int,
            Self::Decimal(_) => ColumnKind::Decimal,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Int(int) => write!(f, "{int}"),
            Self::Decimal(decimal) => write!(f, "{decimal}"),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

/// User column values keyed by column name.
pub type Fields = BTreeMap<&'static str, Value>;

// Alphabet excludes visually ambiguous characters (I, O, l, 0, 1) and the `-`/`_` of
// the default one, so identifiers never read as command-line flags.
const ID_ALPHABET: [char; 55] = [
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
const ID_LENGTH: usize = 20;

/// A stored row: the store-assigned `id` and `created_at` plus the user columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub fields: Fields,
}

impl Record {
    /// A fresh row with a new identifier, stamped now.
    pub(crate) fn assign(fields: Fields) -> Self {
        Self { id: nanoid!(ID_LENGTH, &ID_ALPHABET), created_at: Utc::now(), fields }
    }

    /// Value of `column`; `id` resolves to the record identifier.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<Value> {
        if column == ID {
            return Some(Value::Text(self.id.clone()));
        }
        self.fields.get(column).cloned()
    }

    /// # Errors
    /// [`DatabaseError::Validation`] when the column is missing or not a text column.
    pub fn text(&self, column: &str) -> Result<String, DatabaseError> {
        match self.fields.get(column) {
            Some(Value::Text(text)) => Ok(text.clone()),
            other => Err(unexpected(column, "text", other)),
        }
    }

    /// # Errors
    /// [`DatabaseError::Validation`] when the column is missing or not an integer column.
    pub fn int(&self, column: &str) -> Result<i64, DatabaseError> {
        match self.fields.get(column) {
            Some(Value::Int(int)) => Ok(*int),
            other => Err(unexpected(column, "integer", other)),
        }
    }

    /// # Errors
    /// [`DatabaseError::Validation`] when the column is missing or not a decimal column.
    pub fn decimal(&self, column: &str) -> Result<Decimal, DatabaseError> {
        match self.fields.get(column) {
            Some(Value::Decimal(decimal)) => Ok(*decimal),
            other => Err(unexpected(column, "decimal", other)),
        }
    }
}

fn unexpected(column: &str, expected: &str, found: Option<&Value>) -> DatabaseError {
    let message = match found {
        Some(value) => format!("Column '{column}' holds {:?}, expected {expected}", value.kind()),
        None => format!("Column '{column}' is missing, expected {expected}"),
    };
    DatabaseError::Validation { message: message.into(), context: Some("Reading record".into()) }
}
