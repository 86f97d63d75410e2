//! Storage abstraction for the catalogue.
//!
//! # Architecture
//!
//! - `CatalogueStorage` trait: every read and write the grid performs
//! - `PgCatalogueStorage`: PostgreSQL implementation (see `catalogue::pg`)
//! - `MockCatalogueStorage`: in-memory implementation for tests (see `catalogue::mock`)
//!
//! Listing products never costs one query per row: implementations load the
//! relations requested in [`ProductQuery::prefetch`] in batch.

use super::{
    AttributeId, AttributeValueData, CatalogueProduct, Category, CategoryId, Partner, PartnerId,
    ProductAttribute, ProductClass, ProductFieldValue, ProductId, ProductQuery, StockRecordWrite,
};
use std::future::Future;

/// Error type for catalogue storage operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogueStorageError {
    /// A database or driver error occurred.
    #[error("Storage error: {0}")]
    Db(String),

    /// The row the write targets does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The write violates a uniqueness or foreign key constraint.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for CatalogueStorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound(err.to_string()),
            sqlx::Error::Database(db)
                if db.is_unique_violation() || db.is_foreign_key_violation() =>
            {
                Self::Conflict(db.message().to_owned())
            }
            _ => Self::Db(err.to_string()),
        }
    }
}

/// Trait for catalogue storage operations used by the product grid.
pub trait CatalogueStorage: Clone + Send + Sync + 'static {
    /// Whether the backing store answers at all.
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    fn category_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Category>, CatalogueStorageError>> + Send;

    /// Ids of the category and all of its descendants.
    fn category_descendants(
        &self,
        category_id: CategoryId,
    ) -> impl Future<Output = Result<Vec<CategoryId>, CatalogueStorageError>> + Send;

    /// Number of products matching the query filter, ignoring pagination.
    fn products_count(
        &self,
        query: &ProductQuery,
    ) -> impl Future<Output = Result<u64, CatalogueStorageError>> + Send;

    /// Products matching the query, ordered by `title, id`, with the
    /// requested relations prefetched.
    fn products_list(
        &self,
        query: &ProductQuery,
    ) -> impl Future<Output = Result<Vec<CatalogueProduct>, CatalogueStorageError>> + Send;

    fn product_classes_list(
        &self,
    ) -> impl Future<Output = Result<Vec<ProductClass>, CatalogueStorageError>> + Send;

    /// Every attribute declaration of every class, ordered by `code, id`,
    /// with option group options loaded.
    fn attributes_list(
        &self,
    ) -> impl Future<Output = Result<Vec<ProductAttribute>, CatalogueStorageError>> + Send;

    /// All partners ordered by name.
    fn partners_list(
        &self,
    ) -> impl Future<Output = Result<Vec<Partner>, CatalogueStorageError>> + Send;

    fn partner_by_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<Partner>, CatalogueStorageError>> + Send;

    /// Sets one product field and bumps `date_updated`.
    fn product_update_field(
        &self,
        product_id: ProductId,
        value: ProductFieldValue,
    ) -> impl Future<Output = Result<(), CatalogueStorageError>> + Send;

    /// Creates or replaces the value of `attribute_id` for the product.
    ///
    /// A `MultiOption` value replaces the stored option set wholesale.
    fn attribute_value_upsert(
        &self,
        product_id: ProductId,
        attribute_id: AttributeId,
        value: AttributeValueData,
    ) -> impl Future<Output = Result<(), CatalogueStorageError>> + Send;

    /// Returns `true` if a value existed and was deleted.
    fn attribute_value_delete(
        &self,
        product_id: ProductId,
        attribute_id: AttributeId,
    ) -> impl Future<Output = Result<bool, CatalogueStorageError>> + Send;

    fn stockrecord_upsert(
        &self,
        product_id: ProductId,
        partner_id: PartnerId,
        record: StockRecordWrite,
    ) -> impl Future<Output = Result<(), CatalogueStorageError>> + Send;

    /// Returns `true` if a record existed and was deleted.
    fn stockrecord_delete(
        &self,
        product_id: ProductId,
        partner_id: PartnerId,
    ) -> impl Future<Output = Result<bool, CatalogueStorageError>> + Send;
}
