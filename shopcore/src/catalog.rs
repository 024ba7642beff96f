//! Catalog operations: product lookup, listing, and administrative edits.
//!
//! Catalog writes are full-row updates with no lock protocol; unlike stock
//! decrements they are not contended, and the checkout transaction re-reads
//! prices under its own lock anyway.

use tracing::{info, instrument};

use crate::errors::{StoreError, StoreResult};
use crate::model::{Product, ProductDraft};
use crate::query::ProductQueryParams;
use crate::store::ShopStore;
use crate::types::ProductId;

/// Orchestrates catalog reads and writes against a [`ShopStore`].
#[derive(Debug, Clone)]
pub struct CatalogService<S> {
    store: S,
}

impl<S: ShopStore> CatalogService<S> {
    /// Creates the service over its store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Fetches a product by id.
    pub async fn product_by_id(&self, product_id: ProductId) -> StoreResult<Option<Product>> {
        self.store.product_by_id(product_id).await
    }

    /// Returns one page of products plus the total filtered count.
    pub async fn list_products(
        &self,
        params: &ProductQueryParams,
    ) -> StoreResult<(Vec<Product>, u64)> {
        self.store.list_products(params).await
    }

    /// Creates a product and returns the stored row.
    #[instrument(skip(self, draft), fields(product_name = %draft.product_name))]
    pub async fn create_product(&self, draft: &ProductDraft) -> StoreResult<Product> {
        let product_id = self.store.create_product(draft).await?;
        info!(product_id = %product_id, "[catalog.create_product] product created");
        self.store
            .product_by_id(product_id)
            .await?
            .ok_or_else(|| StoreError::Failure {
                operation: "create_product",
                detail: format!("inserted product {product_id} not found on re-read"),
            })
    }

    /// Replaces a product's attributes, returning the updated row, or
    /// `None` when the product does not exist.
    #[instrument(skip(self, draft), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        product_id: ProductId,
        draft: &ProductDraft,
    ) -> StoreResult<Option<Product>> {
        if !self.store.update_product(product_id, draft).await? {
            return Ok(None);
        }
        self.store.product_by_id(product_id).await
    }

    /// Deletes a product. Idempotent: deleting an absent product succeeds.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn delete_product(&self, product_id: ProductId) -> StoreResult<()> {
        self.store.delete_product(product_id).await
    }
}
