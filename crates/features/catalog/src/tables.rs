//! Table layout of the catalog and conversions between store records and domain types.

use nexo_database::{Column, DatabaseError, Fields, Record, TableSchema, Value};
use nexo_domain::{
    AvailabilityId, Category, Feature, FeatureId, Locality, LocalityId, Plan, PlanAvailability,
    PlanId, ZoneType, ZoneTypeId,
};
use rust_decimal::Decimal;

pub(crate) const NAME: &str = "name";
pub(crate) const PRICE: &str = "price";
pub(crate) const CATEGORY: &str = "category";
pub(crate) const PLAN_ID: &str = "plan_id";
pub(crate) const ICON_NAME: &str = "icon_name";
pub(crate) const DESCRIPTION: &str = "description";
pub(crate) const SORT_ORDER: &str = "sort_order";
pub(crate) const LOCALITY_ID: &str = "locality_id";
pub(crate) const ZONE_TYPE_ID: &str = "zone_type_id";

pub static LOCALITY: TableSchema =
    TableSchema { name: "locality", version: 1, columns: &[Column::text(NAME).unique()] };

pub static ZONE_TYPE: TableSchema =
    TableSchema { name: "zone_type", version: 1, columns: &[Column::text(NAME).unique()] };

pub static PLAN: TableSchema = TableSchema {
    name: "plan",
    version: 1,
    columns: &[Column::text(NAME), Column::decimal(PRICE), Column::text(CATEGORY)],
};

pub static FEATURE: TableSchema = TableSchema {
    name: "feature",
    version: 1,
    columns: &[
        Column::text(PLAN_ID).references("plan"),
        Column::text(ICON_NAME),
        Column::text(DESCRIPTION),
        Column::int(SORT_ORDER),
    ],
};

pub static PLAN_AVAILABILITY: TableSchema = TableSchema {
    name: "plan_availability",
    version: 1,
    columns: &[
        Column::text(PLAN_ID).references("plan"),
        Column::text(LOCALITY_ID).references("locality"),
        Column::text(ZONE_TYPE_ID).references("zone_type"),
    ],
};

/// Every catalog table, in registration order (referenced tables first).
pub static TABLES: [&TableSchema; 5] = [&LOCALITY, &ZONE_TYPE, &PLAN, &FEATURE, &PLAN_AVAILABILITY];

pub(crate) trait FromRecord: Sized {
    fn from_record(record: Record) -> Result<Self, DatabaseError>;
}

pub(crate) fn decode<T: FromRecord>(records: Vec<Record>) -> Result<Vec<T>, DatabaseError> {
    records.into_iter().map(T::from_record).collect()
}

impl FromRecord for Locality {
    fn from_record(record: Record) -> Result<Self, DatabaseError> {
        Ok(Self { name: record.text(NAME)?, id: LocalityId::from(record.id) })
    }
}

impl FromRecord for ZoneType {
    fn from_record(record: Record) -> Result<Self, DatabaseError> {
        Ok(Self { name: record.text(NAME)?, id: ZoneTypeId::from(record.id) })
    }
}

impl FromRecord for Plan {
    fn from_record(record: Record) -> Result<Self, DatabaseError> {
        Ok(Self {
            name: record.text(NAME)?,
            price: record.decimal(PRICE)?,
            category: Category::from(record.text(CATEGORY)?),
            created_at: record.created_at,
            id: PlanId::from(record.id),
        })
    }
}

impl FromRecord for Feature {
    fn from_record(record: Record) -> Result<Self, DatabaseError> {
        Ok(Self {
            plan_id: PlanId::from(record.text(PLAN_ID)?),
            icon_name: record.text(ICON_NAME)?,
            description: record.text(DESCRIPTION)?,
            sort_order: record.int(SORT_ORDER)?,
            id: FeatureId::from(record.id),
        })
    }
}

impl FromRecord for PlanAvailability {
    fn from_record(record: Record) -> Result<Self, DatabaseError> {
        Ok(Self {
            plan_id: PlanId::from(record.text(PLAN_ID)?),
            locality_id: LocalityId::from(record.text(LOCALITY_ID)?),
            zone_type_id: ZoneTypeId::from(record.text(ZONE_TYPE_ID)?),
            id: AvailabilityId::from(record.id),
        })
    }
}

pub(crate) fn name_fields(name: &str) -> Fields {
    Fields::from([(NAME, Value::from(name))])
}

pub(crate) fn plan_fields(name: &str, price: Decimal, category: &Category) -> Fields {
    Fields::from([
        (NAME, Value::from(name)),
        (PRICE, Value::from(price)),
        (CATEGORY, Value::from(category.as_str())),
    ])
}

pub(crate) fn feature_fields(
    plan_id: &PlanId,
    icon: &str,
    description: &str,
    sort_order: i64,
) -> Fields {
    Fields::from([
        (PLAN_ID, Value::from(plan_id.as_str())),
        (ICON_NAME, Value::from(icon)),
        (DESCRIPTION, Value::from(description)),
        (SORT_ORDER, Value::from(sort_order)),
    ])
}

pub(crate) fn availability_fields(
    plan_id: &PlanId,
    locality_id: &LocalityId,
    zone_type_id: &ZoneTypeId,
) -> Fields {
    Fields::from([
        (PLAN_ID, Value::from(plan_id.as_str())),
        (LOCALITY_ID, Value::from(locality_id.as_str())),
        (ZONE_TYPE_ID, Value::from(zone_type_id.as_str())),
    ])
}
