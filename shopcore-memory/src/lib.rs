//! In-memory adapter for the `shopcore` storage ports.
//!
//! This crate provides an in-process implementation of [`ShopStore`],
//! [`CheckoutTx`], and [`UserDirectory`], useful for tests and development
//! where persistence is not required.
//!
//! Checkout transactions are serialized by a single async mutex rather than
//! per-row locks. That is coarser than the postgres adapter, but the
//! observable contract is the same: a transaction holds exclusivity until
//! commit or drop, its effects are journaled and published atomically on
//! commit, and a dropped transaction leaves no trace. Locked reads overlay
//! the journal so a transaction observes its own earlier decrements.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use shopcore::errors::StoreResult;
use shopcore::model::{NewOrderItem, Order, OrderItem, Product, ProductDraft, User};
use shopcore::query::{
    OrderQueryParams, OrderSortKey, ProductQueryParams, ProductSortKey, SortDirection,
};
use shopcore::store::{CheckoutTx, ShopStore, UserDirectory};
use shopcore::types::{OrderId, ProductId, Quantity, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A stored line item; display fields are joined from the product at read
/// time, never stored.
#[derive(Debug, Clone)]
struct ItemRecord {
    order_item_id: i64,
    order_id: i64,
    product_id: i64,
    quantity: Quantity,
    amount: i64,
}

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<i64, Product>,
    users: HashMap<i64, User>,
    orders: HashMap<i64, Order>,
    order_items: Vec<ItemRecord>,
    next_product_id: i64,
    next_user_id: i64,
    next_order_id: i64,
    next_order_item_id: i64,
}

/// Thread-safe in-memory shop store.
///
/// Cloning shares the underlying storage, so a clone handed to a service
/// observes the same data as the original.
#[derive(Debug, Clone, Default)]
pub struct MemoryShopStore {
    tables: Arc<RwLock<Tables>>,
    checkout_gate: Arc<Mutex<()>>,
}

impl MemoryShopStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user directly; there is no user registration in scope, so
    /// tests seed users through this helper.
    pub fn insert_user(&self, email: &str) -> User {
        let mut tables = self.tables.write().expect("RwLock poisoned");
        tables.next_user_id += 1;
        let next_user_id = tables.next_user_id;
        let user = User {
            user_id: UserId::try_new(next_user_id).expect("counter starts at 1"),
            email: email.to_string(),
            created_date: Utc::now(),
        };
        tables.users.insert(next_user_id, user.clone());
        user
    }
}

#[async_trait]
impl UserDirectory for MemoryShopStore {
    async fn user_by_id(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let tables = self.tables.read().expect("RwLock poisoned");
        Ok(tables.users.get(&i64::from(user_id)).cloned())
    }
}

#[async_trait]
impl ShopStore for MemoryShopStore {
    type Checkout = MemoryCheckout;

    async fn begin_checkout(&self) -> StoreResult<MemoryCheckout> {
        let gate = Arc::clone(&self.checkout_gate).lock_owned().await;
        Ok(MemoryCheckout {
            tables: Arc::clone(&self.tables),
            _gate: gate,
            pending_stock: HashMap::new(),
            pending_header: None,
            pending_items: Vec::new(),
        })
    }

    async fn product_by_id(&self, product_id: ProductId) -> StoreResult<Option<Product>> {
        let tables = self.tables.read().expect("RwLock poisoned");
        Ok(tables.products.get(&i64::from(product_id)).cloned())
    }

    async fn list_products(
        &self,
        params: &ProductQueryParams,
    ) -> StoreResult<(Vec<Product>, u64)> {
        let tables = self.tables.read().expect("RwLock poisoned");
        let mut filtered: Vec<Product> = tables
            .products
            .values()
            .filter(|product| {
                params
                    .category
                    .map_or(true, |category| product.category == category)
            })
            .filter(|product| {
                params
                    .search
                    .as_ref()
                    .map_or(true, |term| product.product_name.as_str().contains(term.as_str()))
            })
            .cloned()
            .collect();
        let total = filtered.len() as u64;

        filtered.sort_by(|a, b| {
            let key = match params.sort {
                ProductSortKey::CreatedDate => a.created_date.cmp(&b.created_date),
                ProductSortKey::Price => a.price.cmp(&b.price),
                ProductSortKey::Stock => a.stock.cmp(&b.stock),
            };
            let key = match params.direction {
                SortDirection::Asc => key,
                SortDirection::Desc => key.reverse(),
            };
            // Stable id tiebreak, same as the rendered SQL.
            key.then(a.product_id.cmp(&b.product_id))
        });

        Ok((paginate(filtered, params.limit.into(), params.offset.into()), total))
    }

    async fn create_product(&self, draft: &ProductDraft) -> StoreResult<ProductId> {
        let mut tables = self.tables.write().expect("RwLock poisoned");
        tables.next_product_id += 1;
        let next_product_id = tables.next_product_id;
        let now = Utc::now();
        let product_id = ProductId::try_new(next_product_id).expect("counter starts at 1");
        tables.products.insert(
            next_product_id,
            Product {
                product_id,
                product_name: draft.product_name.clone(),
                category: draft.category,
                image_url: draft.image_url.clone(),
                price: draft.price,
                stock: draft.stock,
                description: draft.description.clone(),
                created_date: now,
                last_modified_date: now,
            },
        );
        Ok(product_id)
    }

    async fn update_product(
        &self,
        product_id: ProductId,
        draft: &ProductDraft,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().expect("RwLock poisoned");
        let Some(product) = tables.products.get_mut(&i64::from(product_id)) else {
            return Ok(false);
        };
        product.product_name = draft.product_name.clone();
        product.category = draft.category;
        product.image_url = draft.image_url.clone();
        product.price = draft.price;
        product.stock = draft.stock;
        product.description = draft.description.clone();
        product.last_modified_date = Utc::now();
        Ok(true)
    }

    async fn delete_product(&self, product_id: ProductId) -> StoreResult<()> {
        let mut tables = self.tables.write().expect("RwLock poisoned");
        tables.products.remove(&i64::from(product_id));
        Ok(())
    }

    async fn order_by_id(&self, order_id: OrderId) -> StoreResult<Option<Order>> {
        let tables = self.tables.read().expect("RwLock poisoned");
        Ok(tables.orders.get(&i64::from(order_id)).cloned())
    }

    async fn order_items(&self, order_id: OrderId) -> StoreResult<Vec<OrderItem>> {
        let tables = self.tables.read().expect("RwLock poisoned");
        let mut items: Vec<OrderItem> = tables
            .order_items
            .iter()
            .filter(|record| record.order_id == i64::from(order_id))
            .filter_map(|record| {
                // Inner join: items whose product has been deleted from the
                // catalog drop out, matching the SQL adapter.
                let product = tables.products.get(&record.product_id)?;
                Some(OrderItem {
                    order_item_id: record.order_item_id,
                    order_id,
                    product_id: product.product_id,
                    quantity: record.quantity,
                    amount: record.amount,
                    product_name: product.product_name.clone(),
                    image_url: product.image_url.clone(),
                })
            })
            .collect();
        items.sort_by_key(|item| item.order_item_id);
        Ok(items)
    }

    async fn list_orders(&self, params: &OrderQueryParams) -> StoreResult<(Vec<Order>, u64)> {
        let tables = self.tables.read().expect("RwLock poisoned");
        let mut filtered: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| params.user_id.map_or(true, |user_id| order.user_id == user_id))
            .cloned()
            .collect();
        let total = filtered.len() as u64;

        filtered.sort_by(|a, b| {
            let key = match params.sort {
                OrderSortKey::CreatedDate => a.created_date.cmp(&b.created_date),
                OrderSortKey::TotalAmount => a.total_amount.cmp(&b.total_amount),
            };
            let key = match params.direction {
                SortDirection::Asc => key,
                SortDirection::Desc => key.reverse(),
            };
            key.then(a.order_id.cmp(&b.order_id))
        });

        Ok((paginate(filtered, params.limit.into(), params.offset.into()), total))
    }
}

fn paginate<T>(rows: Vec<T>, limit: u32, offset: u64) -> Vec<T> {
    rows.into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(limit as usize)
        .collect()
}

/// An in-flight checkout transaction.
///
/// Holds the store-wide checkout gate; all effects are journaled locally
/// and applied in one write-locked pass at [`CheckoutTx::commit`]. Dropping
/// the value releases the gate and discards the journal.
#[derive(Debug)]
pub struct MemoryCheckout {
    tables: Arc<RwLock<Tables>>,
    _gate: OwnedMutexGuard<()>,
    pending_stock: HashMap<i64, u32>,
    pending_header: Option<Order>,
    pending_items: Vec<(i64, NewOrderItem)>,
}

#[async_trait]
impl CheckoutTx for MemoryCheckout {
    async fn lock_product(&mut self, product_id: ProductId) -> StoreResult<Option<Product>> {
        let tables = self.tables.read().expect("RwLock poisoned");
        Ok(tables
            .products
            .get(&i64::from(product_id))
            .cloned()
            .map(|mut product| {
                if let Some(&pending) = self.pending_stock.get(&i64::from(product_id)) {
                    product.stock = pending;
                }
                product
            }))
    }

    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        new_stock: u32,
    ) -> StoreResult<()> {
        self.pending_stock.insert(i64::from(product_id), new_stock);
        Ok(())
    }

    async fn insert_order(&mut self, user_id: UserId, total_amount: i64) -> StoreResult<OrderId> {
        // Id allocation is not rolled back on drop; sequences burn ids in
        // real databases too.
        let mut tables = self.tables.write().expect("RwLock poisoned");
        tables.next_order_id += 1;
        let order_id = OrderId::try_new(tables.next_order_id).expect("counter starts at 1");
        let now = Utc::now();
        self.pending_header = Some(Order {
            order_id,
            user_id,
            total_amount,
            created_date: now,
            last_modified_date: now,
            order_item_list: Vec::new(),
        });
        Ok(order_id)
    }

    async fn insert_order_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> StoreResult<()> {
        self.pending_items
            .extend(items.iter().map(|item| (i64::from(order_id), item.clone())));
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        let mut tables = self.tables.write().expect("RwLock poisoned");
        let now = Utc::now();
        for (product_id, new_stock) in &self.pending_stock {
            if let Some(product) = tables.products.get_mut(product_id) {
                product.stock = *new_stock;
                product.last_modified_date = now;
            }
        }
        if let Some(header) = self.pending_header {
            tables.orders.insert(i64::from(header.order_id), header);
        }
        for (order_id, item) in self.pending_items {
            tables.next_order_item_id += 1;
            let record = ItemRecord {
                order_item_id: tables.next_order_item_id,
                order_id,
                product_id: i64::from(item.product_id),
                quantity: item.quantity,
                amount: item.amount,
            };
            tables.order_items.push(record);
        }
        Ok(())
    }
}
