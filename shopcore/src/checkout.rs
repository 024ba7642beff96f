//! The order placement service.
//!
//! `place_order` is the checkout state machine: Validating -> Pricing ->
//! Persisting -> Committed, with an abort from any state rolling the whole
//! transaction back. Correctness under concurrency rests on two rules:
//!
//! 1. Sufficiency is only ever judged against the stock value returned by
//!    the locked read, and the decrement happens while that lock is still
//!    held. A non-locked read would allow two buyers to both observe
//!    sufficient stock and oversubscribe inventory.
//! 2. Products are locked in ascending product-id order. That totally
//!    orders lock acquisition across all concurrent checkouts, so two
//!    transactions over overlapping product sets can never deadlock, and
//!    no storage-level deadlock retry is needed.

use tracing::{info, instrument, warn};

use crate::errors::{CheckoutError, CheckoutResult, StoreResult};
use crate::model::{BuyItem, NewOrderItem, Order};
use crate::query::OrderQueryParams;
use crate::store::{CheckoutTx, ShopStore, UserDirectory};
use crate::types::{OrderId, UserId};

/// Orchestrates checkout against a [`ShopStore`] and a [`UserDirectory`].
#[derive(Debug, Clone)]
pub struct OrderPlacementService<S, U> {
    store: S,
    users: U,
}

impl<S, U> OrderPlacementService<S, U>
where
    S: ShopStore,
    U: UserDirectory,
{
    /// Creates the service over its collaborators.
    pub const fn new(store: S, users: U) -> Self {
        Self { store, users }
    }

    /// Places an order for `user_id` and returns the generated order id.
    ///
    /// The caller re-fetches the hydrated order via
    /// [`Self::order_by_id`]; this method deliberately returns only the id.
    ///
    /// An empty `buy_items` list is accepted and produces an order with
    /// `total_amount = 0` and no items.
    ///
    /// Line items are persisted in the caller-supplied order; only lock
    /// acquisition is reordered (ascending product id, see module docs).
    /// Any failure aborts the whole transaction with zero side effects.
    #[instrument(skip(self, buy_items), fields(user_id = %user_id, line_items = buy_items.len()))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        buy_items: &[BuyItem],
    ) -> CheckoutResult<OrderId> {
        // Validating: user existence is checked before any lock is taken.
        if self.users.user_by_id(user_id).await?.is_none() {
            warn!(user_id = %user_id, "[checkout.place_order] user does not exist");
            return Err(CheckoutError::UserNotFound(user_id));
        }

        // Deterministic lock order: ascending product id. Amounts are
        // written back by original position so persisted items keep the
        // caller's order.
        let mut lock_order: Vec<usize> = (0..buy_items.len()).collect();
        lock_order.sort_by_key(|&i| buy_items[i].product_id);

        let mut tx = self.store.begin_checkout().await?;
        let mut amounts = vec![0_i64; buy_items.len()];
        let mut total_amount = 0_i64;

        // Pricing: one locked read + one decrement per line item, decrement
        // issued while the lock from the read is still held.
        for &i in &lock_order {
            let buy_item = &buy_items[i];
            let product = tx
                .lock_product(buy_item.product_id)
                .await?
                .ok_or(CheckoutError::ProductNotFound(buy_item.product_id))?;

            let requested = u32::from(buy_item.quantity);
            let available = product.stock;
            if available < requested {
                warn!(
                    product_id = %buy_item.product_id,
                    requested,
                    available,
                    "[checkout.place_order] insufficient stock"
                );
                return Err(CheckoutError::InsufficientStock {
                    product_id: buy_item.product_id,
                    requested,
                    available,
                });
            }

            let amount = i64::from(requested)
                .checked_mul(i64::from(product.price))
                .ok_or(CheckoutError::AmountOverflow(buy_item.product_id))?;
            total_amount = total_amount
                .checked_add(amount)
                .ok_or(CheckoutError::AmountOverflow(buy_item.product_id))?;
            amounts[i] = amount;

            tx.decrement_stock(buy_item.product_id, available - requested)
                .await?;
        }

        // Persisting: header first for the generated id, then all items in
        // one batched write.
        let order_id = tx.insert_order(user_id, total_amount).await?;
        let new_items: Vec<NewOrderItem> = buy_items
            .iter()
            .zip(amounts)
            .map(|(buy_item, amount)| NewOrderItem {
                product_id: buy_item.product_id,
                quantity: buy_item.quantity,
                amount,
            })
            .collect();
        tx.insert_order_items(order_id, &new_items).await?;

        tx.commit().await?;
        info!(
            order_id = %order_id,
            total_amount,
            "[checkout.place_order] order committed"
        );
        Ok(order_id)
    }

    /// Fetches an order header hydrated with its full ordered item list.
    pub async fn order_by_id(&self, order_id: OrderId) -> StoreResult<Option<Order>> {
        let Some(mut order) = self.store.order_by_id(order_id).await? else {
            return Ok(None);
        };
        order.order_item_list = self.store.order_items(order_id).await?;
        Ok(Some(order))
    }

    /// Lists order headers matching `params`, each hydrated with its
    /// items, plus the total count of the filtered set.
    ///
    /// One item fetch per returned header; at page sizes bounded by
    /// [`crate::types::Limit`] the N+1 shape is acceptable.
    pub async fn list_orders(&self, params: &OrderQueryParams) -> StoreResult<(Vec<Order>, u64)> {
        let (headers, total) = self.store.list_orders(params).await?;
        let mut orders = Vec::with_capacity(headers.len());
        for mut order in headers {
            order.order_item_list = self.store.order_items(order.order_id).await?;
            orders.push(order);
        }
        Ok((orders, total))
    }
}
