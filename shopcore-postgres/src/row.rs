//! Row decoding.
//!
//! Plain functions from a raw row to a domain value object, with an
//! explicit error for every malformed row. Nothing here defaults: an
//! unknown category string or a negative stock value is surfaced as
//! [`StoreError::Decode`], never papered over.

use chrono::{DateTime, Utc};
use shopcore::errors::{StoreError, StoreResult};
use shopcore::model::{Order, OrderItem, Product, ProductCategory, User};
use shopcore::types::{OrderId, Price, ProductId, ProductName, Quantity, UserId};
use sqlx::postgres::PgRow;
use sqlx::Row;

fn column<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name).map_err(|err| StoreError::Decode {
        detail: format!("column {name}: {err}"),
    })
}

fn decode_stock(raw: i64) -> StoreResult<u32> {
    u32::try_from(raw).map_err(|_| StoreError::Decode {
        detail: format!("stock value {raw} out of range"),
    })
}

pub(crate) fn decode_product(row: &PgRow) -> StoreResult<Product> {
    let product_id: i64 = column(row, "product_id")?;
    let product_name: String = column(row, "product_name")?;
    let category: String = column(row, "category")?;
    let image_url: String = column(row, "image_url")?;
    let price: i64 = column(row, "price")?;
    let stock: i64 = column(row, "stock")?;
    let description: Option<String> = column(row, "description")?;
    let created_date: DateTime<Utc> = column(row, "created_date")?;
    let last_modified_date: DateTime<Utc> = column(row, "last_modified_date")?;

    Ok(Product {
        product_id: ProductId::try_new(product_id).map_err(|err| StoreError::Decode {
            detail: format!("product_id {product_id}: {err}"),
        })?,
        product_name: ProductName::try_new(product_name).map_err(|err| StoreError::Decode {
            detail: format!("product_name: {err}"),
        })?,
        category: category.parse::<ProductCategory>().map_err(|err| StoreError::Decode {
            detail: err.to_string(),
        })?,
        image_url,
        price: Price::try_new(price).map_err(|err| StoreError::Decode {
            detail: format!("price {price}: {err}"),
        })?,
        stock: decode_stock(stock)?,
        description,
        created_date,
        last_modified_date,
    })
}

pub(crate) fn decode_order(row: &PgRow) -> StoreResult<Order> {
    let order_id: i64 = column(row, "order_id")?;
    let user_id: i64 = column(row, "user_id")?;

    Ok(Order {
        order_id: OrderId::try_new(order_id).map_err(|err| StoreError::Decode {
            detail: format!("order_id {order_id}: {err}"),
        })?,
        user_id: UserId::try_new(user_id).map_err(|err| StoreError::Decode {
            detail: format!("user_id {user_id}: {err}"),
        })?,
        total_amount: column(row, "total_amount")?,
        created_date: column(row, "created_date")?,
        last_modified_date: column(row, "last_modified_date")?,
        order_item_list: Vec::new(),
    })
}

pub(crate) fn decode_order_item(row: &PgRow) -> StoreResult<OrderItem> {
    let order_id: i64 = column(row, "order_id")?;
    let product_id: i64 = column(row, "product_id")?;
    let quantity: i64 = column(row, "quantity")?;
    let product_name: String = column(row, "product_name")?;

    let quantity = u32::try_from(quantity)
        .ok()
        .and_then(|q| Quantity::try_new(q).ok())
        .ok_or_else(|| StoreError::Decode {
            detail: format!("quantity {quantity} out of range"),
        })?;

    Ok(OrderItem {
        order_item_id: column(row, "order_item_id")?,
        order_id: OrderId::try_new(order_id).map_err(|err| StoreError::Decode {
            detail: format!("order_id {order_id}: {err}"),
        })?,
        product_id: ProductId::try_new(product_id).map_err(|err| StoreError::Decode {
            detail: format!("product_id {product_id}: {err}"),
        })?,
        quantity,
        amount: column(row, "amount")?,
        product_name: ProductName::try_new(product_name).map_err(|err| StoreError::Decode {
            detail: format!("product_name: {err}"),
        })?,
        image_url: column(row, "image_url")?,
    })
}

pub(crate) fn decode_user(row: &PgRow) -> StoreResult<User> {
    let user_id: i64 = column(row, "user_id")?;
    Ok(User {
        user_id: UserId::try_new(user_id).map_err(|err| StoreError::Decode {
            detail: format!("user_id {user_id}: {err}"),
        })?,
        email: column(row, "email")?,
        created_date: column(row, "created_date")?,
    })
}
