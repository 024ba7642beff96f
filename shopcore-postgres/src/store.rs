//! `ShopStore` / `CheckoutTx` / `UserDirectory` implementations over sqlx.

use async_trait::async_trait;
use chrono::Utc;
use shopcore::errors::StoreResult;
use shopcore::model::{NewOrderItem, Order, OrderItem, Product, ProductDraft, User};
use shopcore::query::{order_listing, product_listing, OrderQueryParams, ProductQueryParams, SqlArg, SqlQuery};
use shopcore::store::{CheckoutTx, ShopStore, UserDirectory};
use shopcore::types::{OrderId, ProductId, UserId};
use sqlx::postgres::PgArguments;
use sqlx::{Postgres, Row, Transaction};
use tracing::instrument;

use crate::row::{decode_order, decode_order_item, decode_product, decode_user};
use crate::{map_sqlx_error, PostgresShopStore};

const PRODUCT_COLUMNS: &str = "product_id, product_name, category, image_url, price, stock, \
     description, created_date, last_modified_date";

const ORDER_COLUMNS: &str = "order_id, user_id, total_amount, created_date, last_modified_date";

fn bind_args<'q>(
    mut query: sqlx::query::Query<'q, Postgres, PgArguments>,
    args: &'q [SqlArg],
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    for arg in args {
        query = match arg {
            SqlArg::BigInt(value) => query.bind(*value),
            SqlArg::Text(value) => query.bind(value.as_str()),
        };
    }
    query
}

impl PostgresShopStore {
    async fn fetch_total(&self, count: &SqlQuery, operation: &'static str) -> StoreResult<u64> {
        let row = bind_args(sqlx::query(&count.sql), &count.args)
            .fetch_one(self.pool())
            .await
            .map_err(|err| map_sqlx_error(err, operation))?;
        let total: i64 = row.try_get(0).map_err(|err| map_sqlx_error(err, operation))?;
        Ok(u64::try_from(total).unwrap_or(0))
    }
}

#[async_trait]
impl UserDirectory for PostgresShopStore {
    async fn user_by_id(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT user_id, email, created_date FROM users WHERE user_id = $1")
            .bind(i64::from(user_id))
            .fetch_optional(self.pool())
            .await
            .map_err(|err| map_sqlx_error(err, "user_by_id"))?;
        row.as_ref().map(decode_user).transpose()
    }
}

#[async_trait]
impl ShopStore for PostgresShopStore {
    type Checkout = PostgresCheckout;

    async fn begin_checkout(&self) -> StoreResult<PostgresCheckout> {
        let tx = self
            .pool()
            .begin()
            .await
            .map_err(|err| map_sqlx_error(err, "begin_checkout"))?;
        Ok(PostgresCheckout { tx })
    }

    async fn product_by_id(&self, product_id: ProductId) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE product_id = $1");
        let row = sqlx::query(&sql)
            .bind(i64::from(product_id))
            .fetch_optional(self.pool())
            .await
            .map_err(|err| map_sqlx_error(err, "product_by_id"))?;
        row.as_ref().map(decode_product).transpose()
    }

    #[instrument(name = "postgres.list_products", skip(self, params))]
    async fn list_products(
        &self,
        params: &ProductQueryParams,
    ) -> StoreResult<(Vec<Product>, u64)> {
        let (data, count) = product_listing(params);
        let rows = bind_args(sqlx::query(&data.sql), &data.args)
            .fetch_all(self.pool())
            .await
            .map_err(|err| map_sqlx_error(err, "list_products"))?;
        let products = rows.iter().map(decode_product).collect::<StoreResult<Vec<_>>>()?;
        let total = self.fetch_total(&count, "count_products").await?;
        Ok((products, total))
    }

    async fn create_product(&self, draft: &ProductDraft) -> StoreResult<ProductId> {
        let row = sqlx::query(
            "INSERT INTO product (product_name, category, image_url, price, stock, description, \
             created_date, last_modified_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING product_id",
        )
        .bind(draft.product_name.as_str())
        .bind(draft.category.as_str())
        .bind(draft.image_url.as_str())
        .bind(i64::from(draft.price))
        .bind(i64::from(draft.stock))
        .bind(draft.description.as_deref())
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await
        .map_err(|err| map_sqlx_error(err, "create_product"))?;
        let product_id: i64 = row
            .try_get("product_id")
            .map_err(|err| map_sqlx_error(err, "create_product"))?;
        ProductId::try_new(product_id).map_err(|err| shopcore::errors::StoreError::Decode {
            detail: format!("generated product_id {product_id}: {err}"),
        })
    }

    async fn update_product(
        &self,
        product_id: ProductId,
        draft: &ProductDraft,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE product SET product_name = $1, category = $2, image_url = $3, price = $4, \
             stock = $5, description = $6, last_modified_date = $7 WHERE product_id = $8",
        )
        .bind(draft.product_name.as_str())
        .bind(draft.category.as_str())
        .bind(draft.image_url.as_str())
        .bind(i64::from(draft.price))
        .bind(i64::from(draft.stock))
        .bind(draft.description.as_deref())
        .bind(Utc::now())
        .bind(i64::from(product_id))
        .execute(self.pool())
        .await
        .map_err(|err| map_sqlx_error(err, "update_product"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_product(&self, product_id: ProductId) -> StoreResult<()> {
        sqlx::query("DELETE FROM product WHERE product_id = $1")
            .bind(i64::from(product_id))
            .execute(self.pool())
            .await
            .map_err(|err| map_sqlx_error(err, "delete_product"))?;
        Ok(())
    }

    async fn order_by_id(&self, order_id: OrderId) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1");
        let row = sqlx::query(&sql)
            .bind(i64::from(order_id))
            .fetch_optional(self.pool())
            .await
            .map_err(|err| map_sqlx_error(err, "order_by_id"))?;
        row.as_ref().map(decode_order).transpose()
    }

    async fn order_items(&self, order_id: OrderId) -> StoreResult<Vec<OrderItem>> {
        let rows = sqlx::query(
            "SELECT oi.order_item_id, oi.order_id, oi.product_id, oi.quantity, oi.amount, \
             p.product_name, p.image_url \
             FROM order_item oi JOIN product p ON oi.product_id = p.product_id \
             WHERE oi.order_id = $1 ORDER BY oi.order_item_id ASC",
        )
        .bind(i64::from(order_id))
        .fetch_all(self.pool())
        .await
        .map_err(|err| map_sqlx_error(err, "order_items"))?;
        rows.iter().map(decode_order_item).collect()
    }

    #[instrument(name = "postgres.list_orders", skip(self, params))]
    async fn list_orders(&self, params: &OrderQueryParams) -> StoreResult<(Vec<Order>, u64)> {
        let (data, count) = order_listing(params);
        let rows = bind_args(sqlx::query(&data.sql), &data.args)
            .fetch_all(self.pool())
            .await
            .map_err(|err| map_sqlx_error(err, "list_orders"))?;
        let orders = rows.iter().map(decode_order).collect::<StoreResult<Vec<_>>>()?;
        let total = self.fetch_total(&count, "count_orders").await?;
        Ok((orders, total))
    }
}

/// A checkout transaction bound to one pooled connection.
///
/// Row locks taken by [`CheckoutTx::lock_product`] live exactly as long as
/// the underlying database transaction. Dropping the value rolls it back.
pub struct PostgresCheckout {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CheckoutTx for PostgresCheckout {
    #[instrument(name = "postgres.lock_product", skip(self))]
    async fn lock_product(&mut self, product_id: ProductId) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE product_id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(i64::from(product_id))
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|err| map_sqlx_error(err, "lock_product"))?;
        row.as_ref().map(decode_product).transpose()
    }

    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        new_stock: u32,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE product SET stock = $2, last_modified_date = $3 WHERE product_id = $1",
        )
        .bind(i64::from(product_id))
        .bind(i64::from(new_stock))
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await
        .map_err(|err| map_sqlx_error(err, "decrement_stock"))?;
        Ok(())
    }

    async fn insert_order(&mut self, user_id: UserId, total_amount: i64) -> StoreResult<OrderId> {
        let row = sqlx::query(
            "INSERT INTO orders (user_id, total_amount, created_date, last_modified_date) \
             VALUES ($1, $2, $3, $3) RETURNING order_id",
        )
        .bind(i64::from(user_id))
        .bind(total_amount)
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|err| map_sqlx_error(err, "insert_order"))?;
        let order_id: i64 = row
            .try_get("order_id")
            .map_err(|err| map_sqlx_error(err, "insert_order"))?;
        OrderId::try_new(order_id).map_err(|err| shopcore::errors::StoreError::Decode {
            detail: format!("generated order_id {order_id}: {err}"),
        })
    }

    async fn insert_order_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> StoreResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        let mut builder = sqlx::QueryBuilder::<Postgres>::new(
            "INSERT INTO order_item (order_id, product_id, quantity, amount) ",
        );
        builder.push_values(items, |mut b, item| {
            b.push_bind(i64::from(order_id))
                .push_bind(i64::from(item.product_id))
                .push_bind(i64::from(u32::from(item.quantity)))
                .push_bind(item.amount);
        });
        builder
            .build()
            .execute(&mut *self.tx)
            .await
            .map_err(|err| map_sqlx_error(err, "insert_order_items"))?;
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|err| map_sqlx_error(err, "commit_checkout"))
    }
}
