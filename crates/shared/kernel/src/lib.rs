//! Kernel utilities shared across the Nexo applications.
//! Keep this crate lightweight; today it only owns layered configuration loading.
//!
//! ## Config loading
//! ```rust
//! use nexo_kernel::config::load_config;
//! use nexo_kernel::domain::config::AppConfig;
//!
//! let cfg: AppConfig = load_config(None::<&str>).unwrap();
//! assert_eq!(cfg.database.namespace, "nexo");
//! ```
pub mod config;

pub use nexo_domain as domain;
