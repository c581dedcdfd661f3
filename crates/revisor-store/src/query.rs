//! Collection queries: filter, order, limit

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{Fields, Value};

/// Filter comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `=`
    Equal,
    /// `>=`
    GreaterOrEqual,
    /// `>`
    Greater,
}

impl Comparator {
    /// Whether `field <op> value` holds given `field.compare(value)`
    pub fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Comparator::Less => ordering == Ordering::Less,
            Comparator::LessOrEqual => ordering != Ordering::Greater,
            Comparator::Equal => ordering == Ordering::Equal,
            Comparator::GreaterOrEqual => ordering != Ordering::Less,
            Comparator::Greater => ordering == Ordering::Greater,
        }
    }

    /// Operator symbol
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Less => "<",
            Comparator::LessOrEqual => "<=",
            Comparator::Equal => "=",
            Comparator::GreaterOrEqual => ">=",
            Comparator::Greater => ">",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// One `where field <op> value` clause
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name; dots descend into nested maps
    pub field: String,
    /// Operator
    pub comparator: Comparator,
    /// Right-hand side
    pub value: Value,
}

impl Filter {
    /// Whether a document satisfies this clause
    ///
    /// Missing fields and values of incomparable types never match.
    pub fn matches(&self, data: &Fields) -> bool {
        lookup(data, &self.field)
            .and_then(|field| field.compare(&self.value))
            .map(|ordering| self.comparator.accepts(ordering))
            .unwrap_or(false)
    }
}

/// Resolve a dotted field path inside a document
pub fn lookup<'a>(data: &'a Fields, field: &str) -> Option<&'a Value> {
    let mut parts = field.split('.');
    let mut current = data.get(parts.next()?)?;
    for part in parts {
        current = current.as_map()?.get(part)?;
    }
    Some(current)
}

/// Query over the direct children of one collection
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Collection path
    pub collection: String,
    /// Conjunction of filters
    pub filters: Vec<Filter>,
    /// Sort key and direction
    pub order_by: Option<(String, Direction)>,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl Query {
    /// Start a query over a collection
    pub fn collection(path: impl Into<String>) -> Self {
        Self {
            collection: path.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Add a filter clause
    pub fn filter(
        mut self,
        field: impl Into<String>,
        comparator: Comparator,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            comparator,
            value: value.into(),
        });
        self
    }

    /// Sort results
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Cap the number of results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a document passes every filter
    pub fn matches(&self, data: &Fields) -> bool {
        self.filters.iter().all(|filter| filter.matches(data))
    }

    /// Sort and truncate matched documents in place
    ///
    /// Documents whose sort key is missing or incomparable sort as equal; ties
    /// fall back to the document id so results are deterministic.
    pub fn arrange(&self, documents: &mut Vec<StoredDocument>) {
        if let Some((field, direction)) = &self.order_by {
            documents.sort_by(|a, b| {
                let ordering = match (lookup(&a.data, field), lookup(&b.data, field)) {
                    (Some(x), Some(y)) => x.compare(y).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                }
                .then_with(|| a.id.cmp(&b.id));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            documents.truncate(limit);
        }
    }
}

/// A query result row
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Last path segment
    pub id: String,
    /// Full document path
    pub path: String,
    /// Document body
    pub data: Fields,
}
