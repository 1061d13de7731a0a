//! Sort keys accepted for transaction listings.
//!
//! Every key renders two ways: an `ORDER BY` fragment for Postgres and a
//! comparator for transactions already in memory. Both order unranked or
//! non-numeric meta values after everything else, in either direction.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::domain::Transaction;
use crate::error::{LedgerError, LedgerResult};
use crate::validation::{validate_enum, ValidationError, SORT_DIRECTIONS};

/// Display priority of `meta.source` values.
pub const SOURCE_PRIORITY: [&str; 7] = [
    "purchase", "cancel", "granted", "order", "penalty", "transfer", "payout",
];

const NUMERIC_TEXT_PATTERN: &str = r"^\s*[-+]?([0-9]+(\.[0-9]*)?|\.[0-9]+)\s*$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        validate_enum("direction", &lowered, SORT_DIRECTIONS)?;
        Ok(if lowered == "desc" {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    Source,
    OrderId,
    PayoutId,
    Id,
    Type,
    Amount,
    CreatedAt,
}

impl SortKey {
    pub const ALL: [SortKey; 7] = [
        SortKey::Source,
        SortKey::OrderId,
        SortKey::PayoutId,
        SortKey::Id,
        SortKey::Type,
        SortKey::Amount,
        SortKey::CreatedAt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Source => "source",
            SortKey::OrderId => "orderid",
            SortKey::PayoutId => "payoutid",
            SortKey::Id => "id",
            SortKey::Type => "type",
            SortKey::Amount => "amount",
            SortKey::CreatedAt => "created_at",
        }
    }

    /// Meta field the key reads, if it orders on meta at all.
    pub fn meta_field(&self) -> Option<&'static str> {
        match self {
            SortKey::Source => Some("source"),
            SortKey::OrderId => Some("order_id"),
            SortKey::PayoutId => Some("payout_id"),
            _ => None,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<&str> = SortKey::ALL.iter().map(SortKey::as_str).collect();
                LedgerError::Validation(ValidationError::new(
                    "sort",
                    format!("must be one of: {}", allowed.join(", ")),
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for Sort {
    fn default() -> Self {
        Self::new(SortKey::CreatedAt, SortDirection::Desc)
    }
}

impl Sort {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    pub fn asc(key: SortKey) -> Self {
        Self::new(key, SortDirection::Asc)
    }

    pub fn desc(key: SortKey) -> Self {
        Self::new(key, SortDirection::Desc)
    }

    /// Parses `?sort=...&direction=...` style input; direction defaults to asc.
    pub fn parse(key: &str, direction: Option<&str>) -> LedgerResult<Self> {
        let key = key.trim().parse::<SortKey>()?;
        let direction = match direction {
            Some(raw) => raw.parse::<SortDirection>()?,
            None => SortDirection::Asc,
        };
        Ok(Self { key, direction })
    }

    /// `ORDER BY` body (without the keywords) against columns of `table`.
    /// `table` must already be a validated identifier.
    pub fn order_by_sql(&self, table: &str) -> String {
        let dir = self.direction.as_sql();
        match self.key {
            SortKey::Source => {
                let ranks = SOURCE_PRIORITY
                    .iter()
                    .enumerate()
                    .map(|(idx, source)| format!("WHEN '{}' THEN {}", source, idx + 1))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!(
                    "(CASE {table}.meta->>'source' {ranks} END) {dir} NULLS LAST, {table}.id {dir}"
                )
            }
            SortKey::OrderId | SortKey::PayoutId => {
                let field = self.key.meta_field().unwrap_or_default();
                let pattern = NUMERIC_TEXT_PATTERN;
                format!(
                    "(CASE WHEN {table}.meta->>'{field}' ~ '{pattern}' \
                     THEN ({table}.meta->>'{field}')::numeric END) {dir} NULLS LAST"
                )
            }
            SortKey::Id => format!("{table}.id {dir}"),
            SortKey::Type => format!("{table}.\"type\" {dir}"),
            SortKey::Amount => format!("{table}.amount {dir}"),
            SortKey::CreatedAt => format!("{table}.created_at {dir}"),
        }
    }

    pub fn compare(&self, a: &Transaction, b: &Transaction) -> Ordering {
        let dir = self.direction;
        match self.key {
            SortKey::Source => nulls_last(source_rank(a), source_rank(b), dir)
                .then_with(|| dir.apply(a.id.cmp(&b.id))),
            SortKey::OrderId | SortKey::PayoutId => {
                let field = self.key.meta_field().unwrap_or_default();
                nulls_last(numeric_meta(a, field), numeric_meta(b, field), dir)
            }
            SortKey::Id => dir.apply(a.id.cmp(&b.id)),
            SortKey::Type => dir.apply(
                a.transaction_type
                    .as_str()
                    .cmp(b.transaction_type.as_str()),
            ),
            SortKey::Amount => dir.apply(a.amount.cmp(&b.amount)),
            SortKey::CreatedAt => dir.apply(a.created_at.cmp(&b.created_at)),
        }
    }

    pub fn sort(&self, transactions: &mut [Transaction]) {
        transactions.sort_by(|a, b| self.compare(a, b));
    }
}

fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>, dir: SortDirection) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => dir.apply(x.cmp(&y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn source_rank(tx: &Transaction) -> Option<usize> {
    let source = tx.meta_value("source")?.as_str()?;
    SOURCE_PRIORITY
        .iter()
        .position(|candidate| *candidate == source)
        .map(|idx| idx + 1)
}

/// Numeric reading of a meta field: JSON numbers, or strings that look like
/// a plain decimal. Anything else has no value.
pub fn numeric_meta(tx: &Transaction, field: &str) -> Option<BigDecimal> {
    match tx.meta_value(field)? {
        serde_json::Value::Number(number) => number.to_string().parse().ok(),
        serde_json::Value::String(text) if is_plain_decimal(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn is_plain_decimal(text: &str) -> bool {
    let body = text.trim();
    let body = body.strip_prefix(['-', '+']).unwrap_or(body);
    let (int_part, frac_part) = match body.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (body, None),
    };

    let all_digits = |s: &str| s.chars().all(|ch| ch.is_ascii_digit());
    match frac_part {
        None => !int_part.is_empty() && all_digits(int_part),
        Some(frac) => {
            all_digits(int_part) && all_digits(frac) && !(int_part.is_empty() && frac.is_empty())
        }
    }
}
