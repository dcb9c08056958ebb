use crate::error::DatabaseError;
use crate::query::{Filter, Query};
use crate::record::{Fields, Record};
use std::future::Future;

/// Row-level operations every backend provides.
///
/// Stores assign `id` and `created_at` on insert, enforce case-insensitive uniqueness of
/// unique columns ([`DatabaseError::Conflict`]), reject reference columns pointing at
/// missing rows ([`DatabaseError::Reference`]) and cascade deletes to referencing rows.
/// An unreachable store fails with [`DatabaseError::Connection`] (or a wrapped engine error).
pub trait Store: Send + Sync {
    /// Rows of `table` matching `query.filter`, ordered by `query.order` and then by
    /// creation time.
    fn select(
        &self,
        table: &'static str,
        query: Query,
    ) -> impl Future<Output = Result<Vec<Record>, DatabaseError>> + Send;

    /// Inserts one row and returns it with the assigned `id` and `created_at`.
    fn insert(
        &self,
        table: &'static str,
        fields: Fields,
    ) -> impl Future<Output = Result<Record, DatabaseError>> + Send;

    /// Overwrites `changes` on every matching row and returns the updated rows.
    fn update(
        &self,
        table: &'static str,
        filter: Filter,
        changes: Fields,
    ) -> impl Future<Output = Result<Vec<Record>, DatabaseError>> + Send;

    /// Deletes the matching rows (and, transitively, the rows referencing them).
    ///
    /// Returns how many rows of `table` itself were removed.
    fn delete(
        &self,
        table: &'static str,
        filter: Filter,
    ) -> impl Future<Output = Result<usize, DatabaseError>> + Send;
}
