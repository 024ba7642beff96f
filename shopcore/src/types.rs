//! Core identifier and quantity types.
//!
//! All types use smart constructors so that validity is established at
//! construction time, following the "parse, don't validate" principle.
//! Once a value exists it needs no further checking anywhere in the crate.

use nutype::nutype;

/// Identifier of a product row.
///
/// Product ids are database-generated positive integers.
#[nutype(
    validate(greater_or_equal = 1),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        TryFrom,
        Serialize,
        Deserialize
    )
)]
pub struct ProductId(i64);

/// Identifier of an order row, generated on insert and immutable thereafter.
#[nutype(
    validate(greater_or_equal = 1),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        TryFrom,
        Serialize,
        Deserialize
    )
)]
pub struct OrderId(i64);

/// Identifier of a user row.
#[nutype(
    validate(greater_or_equal = 1),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        TryFrom,
        Serialize,
        Deserialize
    )
)]
pub struct UserId(i64);

/// Quantity of a single line item.
///
/// Always positive: a zero-quantity line item is rejected at the boundary,
/// never carried into the checkout transaction.
#[nutype(
    validate(greater_or_equal = 1),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        TryFrom,
        Serialize,
        Deserialize
    )
)]
pub struct Quantity(u32);

/// Unit price in the smallest currency unit.
///
/// All money in the system is integer arithmetic on this unit; there is no
/// floating point anywhere in a price computation.
#[nutype(
    validate(greater_or_equal = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        TryFrom,
        Serialize,
        Deserialize
    )
)]
pub struct Price(i64);

/// Display name of a product.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 128),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        TryFrom,
        Serialize,
        Deserialize
    )
)]
pub struct ProductName(String);

/// Substring filter over product names.
///
/// Trimmed and guaranteed non-empty; an absent filter is represented by
/// `Option::None`, never by an empty term.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 128),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        AsRef,
        Deref,
        Display,
        TryFrom,
        Serialize,
        Deserialize
    )
)]
pub struct SearchTerm(String);

/// Page size for listing queries, bounded to `[0, 1000]`.
#[nutype(
    validate(less_or_equal = 1000),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        Display,
        Into,
        TryFrom,
        Serialize,
        Deserialize
    )
)]
pub struct Limit(u32);

/// Page offset for listing queries.
///
/// Unsigned by construction, so "offset >= 0" holds in the type.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Display,
    Into,
    From,
    Serialize,
    Deserialize
))]
pub struct Offset(u64);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn product_id_accepts_positive_values(raw in 1i64..=i64::MAX) {
            let id = ProductId::try_new(raw);
            prop_assert!(id.is_ok());
            prop_assert_eq!(i64::from(id.unwrap()), raw);
        }

        #[test]
        fn product_id_rejects_non_positive_values(raw in i64::MIN..=0) {
            prop_assert!(ProductId::try_new(raw).is_err());
        }

        #[test]
        fn quantity_rejects_zero_only(raw in 0u32..=u32::MAX) {
            prop_assert_eq!(Quantity::try_new(raw).is_ok(), raw >= 1);
        }

        #[test]
        fn limit_enforces_upper_bound(raw in 0u32..=10_000) {
            prop_assert_eq!(Limit::try_new(raw).is_ok(), raw <= 1000);
        }

        #[test]
        fn price_rejects_negative_values(raw in i64::MIN..0) {
            prop_assert!(Price::try_new(raw).is_err());
        }

        #[test]
        fn product_id_roundtrip_serialization(raw in 1i64..=i64::MAX) {
            let id = ProductId::try_new(raw).unwrap();
            let json = serde_json::to_string(&id).unwrap();
            let back: ProductId = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(id, back);
        }
    }

    #[test]
    fn product_name_trims_and_rejects_blank() {
        let name = ProductName::try_new("  Apple  ".to_string()).unwrap();
        assert_eq!(name.as_ref(), "Apple");
        assert!(ProductName::try_new("   ".to_string()).is_err());
        assert!(ProductName::try_new("a".repeat(129)).is_err());
    }

    #[test]
    fn search_term_rejects_blank() {
        assert!(SearchTerm::try_new(String::new()).is_err());
        assert!(SearchTerm::try_new(" \t ".to_string()).is_err());
        assert_eq!(SearchTerm::try_new(" ap ".to_string()).unwrap().as_ref(), "ap");
    }

    #[test]
    fn limit_boundary_values() {
        assert!(Limit::try_new(0).is_ok());
        assert!(Limit::try_new(1000).is_ok());
        assert!(Limit::try_new(1001).is_err());
    }
}
