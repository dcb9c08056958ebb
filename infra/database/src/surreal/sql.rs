//! SurrealQL rendering of table schemas and filters.
//!
//! Every value travels through the single `$args` string array and is cast back to its
//! column kind inside the statement, so identifiers are the only interpolated text and
//! those come from validated schemas.

use crate::query::Filter;
use crate::record::Value;
use crate::schema::{ColumnKind, ID, TableSchema};

/// Field holding the store-assigned identifier.
pub(crate) const UID: &str = "uid";

/// Accumulates `$args` while a statement is rendered.
#[derive(Debug, Default)]
pub(crate) struct Args(Vec<String>);

impl Args {
    /// Pushes `value` and returns the expression reading it back as `kind`.
    pub(crate) fn push(&mut self, value: String, kind: ColumnKind) -> String {
        let index = self.0.len();
        self.0.push(value);
        format!("{}$args[{index}]", cast(kind))
    }

    pub(crate) fn value(&mut self, value: &Value) -> String {
        self.push(value.to_string(), value.kind())
    }

    pub(crate) fn into_inner(self) -> Vec<String> {
        self.0
    }
}

const fn cast(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Text => "",
        ColumnKind::Int => "<int> ",
        ColumnKind::Decimal => "<decimal> ",
    }
}

fn field(column: &str) -> &str {
    if column == ID { UID } else { column }
}

/// Renders `filter` as a `WHERE` condition.
pub(crate) fn condition(filter: &Filter, args: &mut Args) -> String {
    match filter {
        Filter::All => "true".to_owned(),
        Filter::Eq(column, value) => format!("{} = {}", field(column), args.value(value)),
        Filter::In(_, values) if values.is_empty() => "false".to_owned(),
        Filter::In(column, values) => {
            let items: Vec<String> = values.iter().map(|v| args.value(v)).collect();
            format!("{} IN [{}]", field(column), items.join(", "))
        },
        Filter::ContainsIgnoreCase(column, needle) => format!(
            "string::contains(string::lowercase({}), {})",
            field(column),
            args.push(needle.to_lowercase(), ColumnKind::Text)
        ),
        Filter::And(filters) if filters.is_empty() => "true".to_owned(),
        Filter::Or(filters) if filters.is_empty() => "false".to_owned(),
        Filter::And(filters) => join(filters, " AND ", args),
        Filter::Or(filters) => join(filters, " OR ", args),
    }
}

fn join(filters: &[Filter], separator: &str, args: &mut Args) -> String {
    let parts: Vec<String> = filters.iter().map(|f| condition(f, args)).collect();
    format!("({})", parts.join(separator))
}

/// Projection returning `[uid, created_at, <columns in schema order>]` as strings.
pub(crate) fn projection(schema: &TableSchema) -> String {
    let mut items = vec![UID.to_owned(), "<string> created_at".to_owned()];
    items.extend(schema.columns.iter().map(|c| format!("<string> {}", c.name)));
    format!("[{}]", items.join(", "))
}

/// DDL defining `schema` and the cascade events on the tables it references.
pub(crate) fn define_table(schema: &TableSchema) -> String {
    let table = schema.name;
    let mut script = format!(
        "DEFINE TABLE OVERWRITE {table} SCHEMALESS;\n\
         DEFINE INDEX OVERWRITE {table}_{UID} ON TABLE {table} FIELDS {UID} UNIQUE;\n"
    );

    for column in schema.columns {
        let name = column.name;
        if column.unique {
            script.push_str(&format!(
                "DEFINE FIELD OVERWRITE {name}_key ON TABLE {table} VALUE string::lowercase({name});\n\
                 DEFINE INDEX OVERWRITE {table}_{name}_key ON TABLE {table} FIELDS {name}_key UNIQUE;\n"
            ));
        }
        if let Some(target) = column.references {
            script.push_str(&format!(
                "DEFINE FIELD OVERWRITE {name} ON TABLE {table} \
                 ASSERT $value IN (SELECT VALUE {UID} FROM {target});\n\
                 DEFINE INDEX OVERWRITE {table}_{name} ON TABLE {table} FIELDS {name};\n\
                 DEFINE EVENT OVERWRITE {table}_{name}_cascade ON TABLE {target} \
                 WHEN $event = \"DELETE\" THEN (DELETE {table} WHERE {name} = $before.{UID});\n"
            ));
        }
    }
    script
}
