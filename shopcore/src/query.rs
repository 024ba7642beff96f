//! Listing query construction.
//!
//! Translates immutable query-params value objects into a filtered, sorted,
//! paginated data query and a predicate-identical count query. The output is
//! backend-neutral: SQL text with `$n` placeholders plus a typed argument
//! list that the postgres adapter binds positionally. The memory adapter
//! evaluates the same params natively and never touches the SQL.
//!
//! Sort columns are closed enums parsed against an allow-list, so the only
//! identifiers ever interpolated into SQL are `as_str()` constants —
//! caller-controlled text can reach a query exclusively through a bind
//! argument.

use std::str::FromStr;

use crate::errors::QueryError;
use crate::model::ProductCategory;
use crate::types::{Limit, Offset, SearchTerm, UserId};

/// Default page size for product listings.
pub const DEFAULT_PRODUCT_LIMIT: u32 = 5;

/// Default page size for order listings.
pub const DEFAULT_ORDER_LIMIT: u32 = 10;

/// Columns selected by every product query.
const PRODUCT_COLUMNS: &str = "product_id, product_name, category, image_url, price, stock, \
     description, created_date, last_modified_date";

/// Columns selected by every order header query.
const ORDER_COLUMNS: &str = "order_id, user_id, total_amount, created_date, last_modified_date";

/// A value to be bound positionally into a rendered query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlArg {
    /// A 64-bit integer bind.
    BigInt(i64),
    /// A text bind.
    Text(String),
}

/// A rendered query: SQL text with `$1..$n` placeholders and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQuery {
    /// The SQL text.
    pub sql: String,
    /// Arguments in placeholder order.
    pub args: Vec<SqlArg>,
}

/// Sort direction for listing queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending (the default, newest first).
    #[default]
    Desc,
}

impl SortDirection {
    /// SQL keyword for the direction.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(QueryError::UnknownSortDirection(s.to_string()))
        }
    }
}

/// Sortable product columns. The allow-list for caller-supplied `orderBy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSortKey {
    /// Sort by row creation time (the default).
    #[default]
    CreatedDate,
    /// Sort by unit price.
    Price,
    /// Sort by stock on hand.
    Stock,
}

impl ProductSortKey {
    /// Column name; only these constants are ever interpolated.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedDate => "created_date",
            Self::Price => "price",
            Self::Stock => "stock",
        }
    }
}

impl FromStr for ProductSortKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_date" => Ok(Self::CreatedDate),
            "price" => Ok(Self::Price),
            "stock" => Ok(Self::Stock),
            other => Err(QueryError::UnknownSortColumn(other.to_string())),
        }
    }
}

/// Sortable order columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderSortKey {
    /// Sort by row creation time (the default).
    #[default]
    CreatedDate,
    /// Sort by order total.
    TotalAmount,
}

impl OrderSortKey {
    /// Column name; only these constants are ever interpolated.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedDate => "created_date",
            Self::TotalAmount => "total_amount",
        }
    }
}

impl FromStr for OrderSortKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_date" => Ok(Self::CreatedDate),
            "total_amount" => Ok(Self::TotalAmount),
            other => Err(QueryError::UnknownSortColumn(other.to_string())),
        }
    }
}

/// Immutable filter/sort/page descriptor for product listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQueryParams {
    /// Equality filter on category, applied only when present.
    pub category: Option<ProductCategory>,
    /// Substring filter over `product_name`, applied only when present.
    pub search: Option<SearchTerm>,
    /// Sort column from the allow-list.
    pub sort: ProductSortKey,
    /// Sort direction.
    pub direction: SortDirection,
    /// Page size.
    pub limit: Limit,
    /// Page offset.
    pub offset: Offset,
}

impl ProductQueryParams {
    /// Parses raw caller-supplied strings into typed params.
    ///
    /// Everything is validated here, before any SQL exists; absent values
    /// fall back to the documented defaults (`created_date desc`, limit 5,
    /// offset 0).
    pub fn parse(
        category: Option<&str>,
        search: Option<&str>,
        order_by: Option<&str>,
        sort: Option<&str>,
        limit: Option<u32>,
        offset: Option<u64>,
    ) -> Result<Self, QueryError> {
        let category = category
            .map(ProductCategory::from_str)
            .transpose()
            .map_err(QueryError::from)?;
        let search = search
            .map(|s| SearchTerm::try_new(s.to_string()).map_err(|_| QueryError::EmptySearch))
            .transpose()?;
        let sort_key = order_by.map(ProductSortKey::from_str).transpose()?;
        let direction = sort.map(SortDirection::from_str).transpose()?;
        let limit_raw = limit.unwrap_or(DEFAULT_PRODUCT_LIMIT);
        let limit =
            Limit::try_new(limit_raw).map_err(|_| QueryError::LimitOutOfRange(limit_raw))?;
        Ok(Self {
            category,
            search,
            sort: sort_key.unwrap_or_default(),
            direction: direction.unwrap_or_default(),
            limit,
            offset: Offset::new(offset.unwrap_or(0)),
        })
    }
}

/// Immutable filter/sort/page descriptor for order listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQueryParams {
    /// Equality filter on the owning user, applied only when present.
    pub user_id: Option<UserId>,
    /// Sort column from the allow-list.
    pub sort: OrderSortKey,
    /// Sort direction.
    pub direction: SortDirection,
    /// Page size.
    pub limit: Limit,
    /// Page offset.
    pub offset: Offset,
}

impl OrderQueryParams {
    /// Builds params for one user's orders, newest first.
    pub fn for_user(user_id: UserId, limit: Option<u32>, offset: Option<u64>) -> Result<Self, QueryError> {
        let limit_raw = limit.unwrap_or(DEFAULT_ORDER_LIMIT);
        let limit =
            Limit::try_new(limit_raw).map_err(|_| QueryError::LimitOutOfRange(limit_raw))?;
        Ok(Self {
            user_id: Some(user_id),
            sort: OrderSortKey::default(),
            direction: SortDirection::default(),
            limit,
            offset: Offset::new(offset.unwrap_or(0)),
        })
    }
}

/// Accumulates conjunctive predicates, then renders the data query and the
/// matching count query.
///
/// Both renderings share the same predicate list and argument prefix by
/// construction, which is what keeps `total` consistent with the page
/// contents regardless of limit/offset.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    columns: &'static str,
    table: &'static str,
    predicates: Vec<String>,
    args: Vec<SqlArg>,
}

impl SelectBuilder {
    /// Starts a builder over `table` selecting `columns`.
    pub fn new(columns: &'static str, table: &'static str) -> Self {
        Self {
            columns,
            table,
            predicates: Vec::new(),
            args: Vec::new(),
        }
    }

    /// Adds `column = $n` with a bound argument.
    pub fn filter_eq(&mut self, column: &str, arg: SqlArg) {
        self.args.push(arg);
        self.predicates.push(format!("{column} = ${}", self.args.len()));
    }

    /// Adds `column LIKE $n` with a bound pattern.
    pub fn filter_like(&mut self, column: &str, pattern: String) {
        self.args.push(SqlArg::Text(pattern));
        self.predicates
            .push(format!("{column} LIKE ${}", self.args.len()));
    }

    fn where_clause(&self) -> String {
        if self.predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.predicates.join(" AND "))
        }
    }

    /// Renders the sorted, paginated data query.
    ///
    /// `tiebreak` is the primary-key column appended ascending behind the
    /// requested sort so that pagination is deterministic across repeated
    /// calls over stable data.
    pub fn build_page(
        &self,
        sort_column: &'static str,
        direction: SortDirection,
        tiebreak: &'static str,
        limit: Limit,
        offset: Offset,
    ) -> SqlQuery {
        let mut args = self.args.clone();
        args.push(SqlArg::BigInt(i64::from(u32::from(limit))));
        let limit_pos = args.len();
        args.push(SqlArg::BigInt(offset_as_i64(offset)));
        let offset_pos = args.len();

        let sql = format!(
            "SELECT {columns} FROM {table}{where_clause} ORDER BY {sort_column} {direction}, \
             {tiebreak} ASC LIMIT ${limit_pos} OFFSET ${offset_pos}",
            columns = self.columns,
            table = self.table,
            where_clause = self.where_clause(),
            direction = direction.as_str(),
        );
        SqlQuery { sql, args }
    }

    /// Renders the count query over exactly the same predicates, ignoring
    /// sort and pagination.
    pub fn build_count(&self) -> SqlQuery {
        SqlQuery {
            sql: format!(
                "SELECT count(*) FROM {table}{where_clause}",
                table = self.table,
                where_clause = self.where_clause(),
            ),
            args: self.args.clone(),
        }
    }
}

/// Offsets beyond i64 cannot address any real page; clamp instead of wrap.
fn offset_as_i64(offset: Offset) -> i64 {
    i64::try_from(u64::from(offset)).unwrap_or(i64::MAX)
}

/// Renders the product listing (data, count) query pair.
pub fn product_listing(params: &ProductQueryParams) -> (SqlQuery, SqlQuery) {
    let mut builder = SelectBuilder::new(PRODUCT_COLUMNS, "product");
    if let Some(category) = params.category {
        builder.filter_eq("category", SqlArg::Text(category.as_str().to_string()));
    }
    if let Some(search) = &params.search {
        builder.filter_like("product_name", format!("%{}%", search.as_ref()));
    }
    let data = builder.build_page(
        params.sort.as_str(),
        params.direction,
        "product_id",
        params.limit,
        params.offset,
    );
    let count = builder.build_count();
    (data, count)
}

/// Renders the order listing (data, count) query pair.
pub fn order_listing(params: &OrderQueryParams) -> (SqlQuery, SqlQuery) {
    let mut builder = SelectBuilder::new(ORDER_COLUMNS, "orders");
    if let Some(user_id) = params.user_id {
        builder.filter_eq("user_id", SqlArg::BigInt(i64::from(user_id)));
    }
    let data = builder.build_page(
        params.sort.as_str(),
        params.direction,
        "order_id",
        params.limit,
        params.offset,
    );
    let count = builder.build_count();
    (data, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params(
        category: Option<&str>,
        search: Option<&str>,
        order_by: Option<&str>,
        sort: Option<&str>,
    ) -> ProductQueryParams {
        ProductQueryParams::parse(category, search, order_by, sort, Some(10), Some(20)).unwrap()
    }

    #[test]
    fn unfiltered_product_listing_has_no_where_clause() {
        let (data, count) = product_listing(&params(None, None, None, None));
        assert_eq!(
            data.sql,
            "SELECT product_id, product_name, category, image_url, price, stock, description, \
             created_date, last_modified_date FROM product ORDER BY created_date DESC, \
             product_id ASC LIMIT $1 OFFSET $2"
        );
        assert_eq!(data.args, vec![SqlArg::BigInt(10), SqlArg::BigInt(20)]);
        assert_eq!(count.sql, "SELECT count(*) FROM product");
        assert!(count.args.is_empty());
    }

    #[test]
    fn filters_are_conjunctive_and_ordered() {
        let (data, count) = product_listing(&params(Some("FOOD"), Some("apple"), None, None));
        assert!(data
            .sql
            .contains("WHERE category = $1 AND product_name LIKE $2"));
        assert_eq!(
            data.args,
            vec![
                SqlArg::Text("FOOD".to_string()),
                SqlArg::Text("%apple%".to_string()),
                SqlArg::BigInt(10),
                SqlArg::BigInt(20),
            ]
        );
        // Count shares predicates and filter args, drops pagination.
        assert!(count.sql.contains("WHERE category = $1 AND product_name LIKE $2"));
        assert_eq!(count.args, data.args[..2].to_vec());
    }

    #[test]
    fn absent_filters_impose_no_constraint() {
        let (data, _) = product_listing(&params(None, Some("apple"), None, None));
        assert!(data.sql.contains("WHERE product_name LIKE $1"));
        assert!(!data.sql.contains("category"));
    }

    #[test]
    fn sort_key_and_direction_are_interpolated_from_the_allow_list() {
        let (data, _) = product_listing(&params(None, None, Some("price"), Some("asc")));
        assert!(data.sql.contains("ORDER BY price ASC, product_id ASC"));
    }

    #[test]
    fn unknown_sort_column_is_rejected_before_sql_is_built() {
        let err = ProductQueryParams::parse(
            None,
            None,
            Some("price; DROP TABLE product--"),
            None,
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownSortColumn("price; DROP TABLE product--".to_string())
        );
    }

    #[test]
    fn unknown_sort_direction_is_rejected() {
        let err = ProductQueryParams::parse(None, None, None, Some("sideways"), None, None)
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownSortDirection("sideways".to_string())
        );
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err =
            ProductQueryParams::parse(Some("GADGET"), None, None, None, None, None).unwrap_err();
        assert_eq!(err, QueryError::UnknownCategory("GADGET".to_string()));
    }

    #[test]
    fn limit_above_bound_is_rejected() {
        let err =
            ProductQueryParams::parse(None, None, None, None, Some(1001), None).unwrap_err();
        assert_eq!(err, QueryError::LimitOutOfRange(1001));
    }

    #[test]
    fn defaults_apply_when_params_are_absent() {
        let params = ProductQueryParams::parse(None, None, None, None, None, None).unwrap();
        assert_eq!(params.sort, ProductSortKey::CreatedDate);
        assert_eq!(params.direction, SortDirection::Desc);
        assert_eq!(u32::from(params.limit), DEFAULT_PRODUCT_LIMIT);
        assert_eq!(u64::from(params.offset), 0);
    }

    #[test]
    fn order_listing_filters_by_user_and_tiebreaks_on_order_id() {
        let params =
            OrderQueryParams::for_user(UserId::try_new(42).unwrap(), None, None).unwrap();
        let (data, count) = order_listing(&params);
        assert!(data.sql.contains("FROM orders WHERE user_id = $1"));
        assert!(data.sql.contains("ORDER BY created_date DESC, order_id ASC"));
        assert_eq!(data.args[0], SqlArg::BigInt(42));
        assert_eq!(count.sql, "SELECT count(*) FROM orders WHERE user_id = $1");
        assert_eq!(count.args, vec![SqlArg::BigInt(42)]);
    }

    proptest! {
        // The count query must carry exactly the filter args of the data
        // query, in the same order, for any combination of filters.
        #[test]
        fn count_predicates_always_agree_with_data_predicates(
            with_category in any::<bool>(),
            search in proptest::option::of("[a-z]{1,10}"),
            limit in 0u32..=1000,
            offset in 0u64..10_000,
        ) {
            let params = ProductQueryParams::parse(
                with_category.then_some("BOOK"),
                search.as_deref(),
                None,
                None,
                Some(limit),
                Some(offset),
            ).unwrap();
            let (data, count) = product_listing(&params);
            prop_assert_eq!(&data.args[..data.args.len() - 2], &count.args[..]);
            let data_where = data.sql.find("WHERE").map(|i| {
                let end = data.sql.find(" ORDER BY").unwrap();
                &data.sql[i..end]
            });
            let count_where = count.sql.find("WHERE").map(|i| &count.sql[i..]);
            prop_assert_eq!(data_where, count_where);
        }

        // Rendering is deterministic: identical params, identical SQL.
        #[test]
        fn rendering_is_deterministic(limit in 0u32..=1000, offset in 0u64..10_000) {
            let params = ProductQueryParams::parse(
                Some("FOOD"), Some("a"), Some("price"), Some("asc"), Some(limit), Some(offset),
            ).unwrap();
            let first = product_listing(&params);
            let second = product_listing(&params);
            prop_assert_eq!(first, second);
        }
    }
}
