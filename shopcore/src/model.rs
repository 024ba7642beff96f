//! Domain value objects for products, orders, and users.
//!
//! These are plain data carriers; the invariants that matter (positive
//! quantities, non-negative prices, valid ids) are guaranteed by the types
//! from [`crate::types`], so nothing here re-validates.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{OrderId, Price, ProductId, ProductName, Quantity, UserId};

/// Closed set of product categories.
///
/// Stored as an uppercase string; an unrecognized stored value is a data
/// corruption and must fail row decoding loudly rather than default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductCategory {
    /// Groceries and food items.
    Food,
    /// Printed books.
    Book,
    /// Vehicles.
    Car,
}

impl ProductCategory {
    /// The stored/wire representation of the category.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Food => "FOOD",
            Self::Book => "BOOK",
            Self::Car => "CAR",
        }
    }
}

/// Error returned when a category name is not in the closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown product category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for ProductCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FOOD" => Ok(Self::Food),
            "BOOK" => Ok(Self::Book),
            "CAR" => Ok(Self::Car),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// A catalog product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Generated primary key.
    pub product_id: ProductId,
    /// Display name.
    pub product_name: ProductName,
    /// Category from the closed set.
    pub category: ProductCategory,
    /// Image reference.
    pub image_url: String,
    /// Unit price in the smallest currency unit.
    pub price: Price,
    /// Current stock on hand. Never negative; the placement protocol
    /// guarantees it, not a column constraint.
    pub stock: u32,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Row creation time.
    pub created_date: DateTime<Utc>,
    /// Last mutation time (catalog edit or stock decrement).
    pub last_modified_date: DateTime<Utc>,
}

/// Payload for creating or replacing a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    /// Display name.
    pub product_name: ProductName,
    /// Category from the closed set.
    pub category: ProductCategory,
    /// Image reference.
    pub image_url: String,
    /// Unit price in the smallest currency unit.
    pub price: Price,
    /// Initial (or replacement) stock value.
    pub stock: u32,
    /// Optional free-form description.
    pub description: Option<String>,
}

/// An order header together with its owned, ordered line items.
///
/// Orders are created exactly once by a successful checkout and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Generated primary key.
    pub order_id: OrderId,
    /// The buyer.
    pub user_id: UserId,
    /// Sum of the line item amounts.
    pub total_amount: i64,
    /// Row creation time.
    pub created_date: DateTime<Utc>,
    /// Row creation time; equal to `created_date` since orders are immutable.
    pub last_modified_date: DateTime<Utc>,
    /// Line items in the order the buyer supplied them.
    pub order_item_list: Vec<OrderItem>,
}

/// A committed order line item as read back from storage.
///
/// `amount` is the price snapshot taken at order time. `product_name` and
/// `image_url` are denormalized from the product row at read time for
/// display convenience; they are never stored on the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Generated primary key.
    pub order_item_id: i64,
    /// The owning order.
    pub order_id: OrderId,
    /// The product this line refers to (a reference, not ownership).
    pub product_id: ProductId,
    /// Units purchased.
    pub quantity: Quantity,
    /// `quantity * unit price` captured at order time. Immutable snapshot.
    pub amount: i64,
    /// Current product display name (joined at read time).
    pub product_name: ProductName,
    /// Current product image (joined at read time).
    pub image_url: String,
}

/// A line item about to be written as part of a checkout transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    /// The product this line refers to.
    pub product_id: ProductId,
    /// Units purchased.
    pub quantity: Quantity,
    /// Snapshot amount computed under the product lock.
    pub amount: i64,
}

/// A requested line item as supplied by the caller.
///
/// Untrusted input: it deliberately carries no price. The unit price is
/// always re-read from the product row inside the transaction so a client
/// can never influence what it pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyItem {
    /// The product to purchase.
    pub product_id: ProductId,
    /// How many units to purchase.
    pub quantity: Quantity,
}

/// A user as exposed by the [`crate::store::UserDirectory`] collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Generated primary key.
    pub user_id: UserId,
    /// Login email.
    pub email: String,
    /// Row creation time.
    pub created_date: DateTime<Utc>,
}
