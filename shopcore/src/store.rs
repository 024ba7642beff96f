//! Storage port traits.
//!
//! These traits are the backend-independent boundary between the services
//! and persistence. `shopcore-postgres` implements them over sqlx;
//! `shopcore-memory` implements them over in-process maps for tests and
//! development.

use async_trait::async_trait;

use crate::errors::StoreResult;
use crate::model::{NewOrderItem, Order, OrderItem, Product, ProductDraft, User};
use crate::query::{OrderQueryParams, ProductQueryParams};
use crate::types::{OrderId, ProductId, UserId};

/// Read-only access to users. Registration and authentication are outside
/// this system; checkout only ever needs an existence check.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Looks up a user by id.
    async fn user_by_id(&self, user_id: UserId) -> StoreResult<Option<User>>;
}

/// The inventory-and-orders store.
///
/// Plain reads and catalog writes are individual operations; order
/// placement goes through [`ShopStore::begin_checkout`] and the returned
/// [`CheckoutTx`], which is the only path allowed to decrement stock.
#[async_trait]
pub trait ShopStore: Send + Sync {
    /// The transaction type for order placement.
    type Checkout: CheckoutTx;

    /// Opens a checkout transaction.
    async fn begin_checkout(&self) -> StoreResult<Self::Checkout>;

    /// Fetches a product without locking.
    async fn product_by_id(&self, product_id: ProductId) -> StoreResult<Option<Product>>;

    /// Returns one page of products plus the total count of the filtered
    /// set (independent of pagination).
    async fn list_products(&self, params: &ProductQueryParams)
        -> StoreResult<(Vec<Product>, u64)>;

    /// Inserts a product, returning its generated id.
    async fn create_product(&self, draft: &ProductDraft) -> StoreResult<ProductId>;

    /// Replaces a product's attributes. Returns `false` when no such row
    /// exists.
    async fn update_product(&self, product_id: ProductId, draft: &ProductDraft)
        -> StoreResult<bool>;

    /// Deletes a product. Deleting an absent product is a no-op.
    async fn delete_product(&self, product_id: ProductId) -> StoreResult<()>;

    /// Fetches an order header (no items).
    async fn order_by_id(&self, order_id: OrderId) -> StoreResult<Option<Order>>;

    /// Fetches an order's line items, enriched with the product's current
    /// display name and image, ordered by item id.
    async fn order_items(&self, order_id: OrderId) -> StoreResult<Vec<OrderItem>>;

    /// Returns one page of order headers plus the total count of the
    /// filtered set.
    async fn list_orders(&self, params: &OrderQueryParams) -> StoreResult<(Vec<Order>, u64)>;
}

/// One order placement transaction.
///
/// All effects are staged against the transaction and become visible
/// atomically at [`CheckoutTx::commit`]. Dropping an uncommitted
/// transaction rolls everything back and releases all locks, leaving state
/// as if the checkout never happened.
#[async_trait]
pub trait CheckoutTx: Send {
    /// Locked read of a product row.
    ///
    /// Acquires an exclusive lock held for the remainder of the
    /// transaction; a concurrent transaction requesting the same product
    /// blocks here until this one commits or rolls back. The returned
    /// stock value observes this transaction's own earlier writes, and it
    /// is the only stock value a caller may use to validate sufficiency.
    async fn lock_product(&mut self, product_id: ProductId) -> StoreResult<Option<Product>>;

    /// Unconditionally writes `new_stock` and refreshes the modification
    /// timestamp. The caller must have computed `new_stock` from the value
    /// returned by [`CheckoutTx::lock_product`] in this same transaction.
    async fn decrement_stock(&mut self, product_id: ProductId, new_stock: u32)
        -> StoreResult<()>;

    /// Inserts the order header, returning the generated order id.
    async fn insert_order(&mut self, user_id: UserId, total_amount: i64) -> StoreResult<OrderId>;

    /// Inserts all line items for `order_id` as a single batched write.
    async fn insert_order_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> StoreResult<()>;

    /// Commits the transaction, publishing all staged effects atomically.
    async fn commit(self) -> StoreResult<()>;
}
