//! # Plan Catalog
//!
//! Plans, their ordered features and where they are offered (locality × zone type).
//!
//! - [`Catalog`]: the base repository and the availability resolver
//!   ([`Catalog::get_available_plans`]).
//! - [`PlanAdmin`]: the plan synchronizer (create, replace, delete, search) and the admin
//!   screen queries.
//! - [`parse_availability_tokens`]: `"<locality>-<zone type>"` token parsing.
//! - [`seed()`]: the bundled sample catalog.
//!
//! ## Example
//!
//! ```rust
//! use nexo_catalog::{Catalog, TABLES};
//! use nexo_database::Database;
//! use nexo_domain::{FeatureSpec, PlanDraft};
//! use rust_decimal::Decimal;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::builder().url("memory://").tables(TABLES).init().await?;
//!     let admin = Catalog::new(db).admin();
//!
//!     let locality = admin.create_locality("Resistencia").await?;
//!     let zone = admin.create_zone_type("Urbano").await?;
//!     let draft = PlanDraft::new("Internet 50MB", Decimal::new(8500, 0), "internet")
//!         .feature(FeatureSpec::new("50 Mbps"))
//!         .available_at(locality.id.clone(), zone.id.clone());
//!     admin.create_plan_with_features(&draft).await?;
//!
//!     let offered = admin.get_available_plans(&locality.id, &zone.id).await?;
//!     assert_eq!(offered.len(), 1);
//!     Ok(())
//! }
//! ```

mod admin;
mod error;
mod repository;
mod resolver;
pub mod seed;
pub mod tables;
pub mod tokens;

pub use admin::PlanAdmin;
pub use error::{CatalogError, CatalogErrorExt};
pub use repository::Catalog;
pub use seed::{SeedReport, seed};
pub use tables::TABLES;
pub use tokens::{DropReason, DroppedToken, ParsedAvailability, parse_availability_tokens};

use nexo_database::{Database, DatabaseBuilder};

/// Opens the store with the catalog tables registered.
///
/// # Errors
/// [`CatalogError::ValidationFailed`] for an incomplete builder,
/// [`CatalogError::BackendUnavailable`] if the store cannot be opened.
pub async fn open(builder: DatabaseBuilder) -> Result<Catalog<Database>, CatalogError> {
    let db = builder.tables(TABLES).init().await.context("open")?;
    Ok(Catalog::new(db))
}
