//! Query-key derivation for the list cache.
//!
//! A key is the type's qualified name, a `:`, each criterion's string form followed by
//! `|` in the order supplied, and, when a result-count limit is given, the tag `|N:`
//! followed by the limit. Keys are compared as plain strings, so the format must stay
//! stable for cache hits to line up.

use std::fmt::{self, Display, Write};

use crate::TypeKey;

/// Separator between the type name and the criteria.
const TYPE_SEPARATOR: char = ':';
/// Terminator after each criterion.
const CRITERION_SEPARATOR: char = '|';
/// Tag introducing the result-count limit.
const LIMIT_TAG: &str = "|N:";

/// Builds the list-cache key for a query.
///
/// Criteria are taken in the order supplied: the same filters in a different order give a
/// different key.
///
/// # Examples
///
/// ```
/// use entity_cache_core::{build_query_key, Criterion, FilterOperator, TypeKey};
///
/// const ORDER: TypeKey = TypeKey::qualified("Order", "shop::Order");
///
/// let status = Criterion::new("Status", FilterOperator::Equals, "Open");
/// let total = Criterion::new("Total", FilterOperator::GreaterThan, "100");
///
/// let key = build_query_key(ORDER, &[status.clone(), total.clone()], Some(10));
/// assert_eq!(key, "shop::Order:Status = Open|Total > 100||N:10");
///
/// assert_ne!(key, build_query_key(ORDER, &[total, status], Some(10)));
/// assert_eq!(build_query_key::<Criterion>(ORDER, &[], None), "shop::Order:");
/// ```
pub fn build_query_key<C: Display>(
    entity_type: TypeKey,
    criteria: &[C],
    limit: Option<usize>,
) -> String {
    let mut key = String::with_capacity(64);
    key.push_str(entity_type.qualified_name());
    key.push(TYPE_SEPARATOR);

    for criterion in criteria {
        // Writing into a String cannot fail
        let _ = write!(key, "{}", criterion);
        key.push(CRITERION_SEPARATOR);
    }

    if let Some(limit) = limit {
        key.push_str(LIMIT_TAG);
        let _ = write!(key, "{}", limit);
    }

    key
}

/// Comparison used by a [`Criterion`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Equals,
    NotEquals,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Contains,
    StartsWith,
    In,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "=",
            FilterOperator::NotEquals => "!=",
            FilterOperator::LessThan => "<",
            FilterOperator::LessOrEqual => "<=",
            FilterOperator::GreaterThan => ">",
            FilterOperator::GreaterOrEqual => ">=",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "starts-with",
            FilterOperator::In => "in",
        }
    }
}

impl Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One filter of a query, rendered as `property operator value`.
///
/// Data layers with their own criterion types can pass those to [`build_query_key`]
/// directly, as long as their `Display` output is stable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Criterion {
    pub property: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl Criterion {
    pub fn new(
        property: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            property: property.into(),
            operator,
            value: value.into(),
        }
    }
}

impl Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.property, self.operator, self.value)
    }
}
