//! Embedded in-memory table backend.
//!
//! Keeps every table as an ordered map keyed by the (partition key,
//! row key) pair, so enumeration order matches what a real table
//! service guarantees. Filter strings are parsed with `odata_params`
//! and evaluated per row. Intended for local development and tests;
//! semantics (create-if-missing, token-guarded writes, paged
//! enumeration) mirror the remote collaborator exactly.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use dashmap::DashMap;
use odata_params::filters as od;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{Continuation, RowPage, TableClient};
use crate::error::StoreError;
use crate::row::{FieldValue, RowBag};

type TableMap = BTreeMap<(String, String), RowBag>;

/// In-memory [`TableClient`] implementation.
///
/// Tables are created implicitly on first insert. Concurrency tokens are
/// process-local monotonic counters; they carry no meaning beyond
/// equality.
#[derive(Debug, Default)]
pub struct MemoryTableClient {
    tables: DashMap<String, TableMap>,
    etag_seq: AtomicU64,
}

impl MemoryTableClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_etag(&self) -> String {
        let n = self.etag_seq.fetch_add(1, AtomicOrdering::Relaxed);
        format!("W/\"{n}\"")
    }

    fn key_of(row: &RowBag) -> (String, String) {
        (row.partition_key.clone(), row.row_key.clone())
    }
}

#[async_trait]
impl TableClient for MemoryTableClient {
    async fn insert(
        &self,
        table: &str,
        mut row: RowBag,
        cancel: CancellationToken,
    ) -> Result<RowBag, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let mut map = self.tables.entry(table.to_owned()).or_default();
        let key = Self::key_of(&row);
        if map.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                partition_key: key.0,
                row_key: key.1,
            });
        }
        row.etag = Some(self.next_etag());
        let stored = row.clone();
        map.insert(key, row);
        Ok(stored)
    }

    async fn get(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
        cancel: CancellationToken,
    ) -> Result<Option<RowBag>, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let found = self.tables.get(table).and_then(|map| {
            map.get(&(partition_key.to_owned(), row_key.to_owned()))
                .cloned()
        });
        Ok(found)
    }

    async fn update(
        &self,
        table: &str,
        mut row: RowBag,
        etag: &str,
        cancel: CancellationToken,
    ) -> Result<RowBag, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let key = Self::key_of(&row);
        let mut map = self
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::NotFound {
                partition_key: key.0.clone(),
                row_key: key.1.clone(),
            })?;
        let current = map.get_mut(&key).ok_or_else(|| StoreError::NotFound {
            partition_key: key.0.clone(),
            row_key: key.1.clone(),
        })?;
        if current.etag.as_deref() != Some(etag) {
            return Err(StoreError::EtagMismatch {
                partition_key: key.0,
                row_key: key.1,
            });
        }
        row.etag = Some(self.next_etag());
        *current = row.clone();
        Ok(row)
    }

    async fn delete(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
        etag: &str,
        cancel: CancellationToken,
    ) -> Result<(), StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let key = (partition_key.to_owned(), row_key.to_owned());
        let mut map = self
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::NotFound {
                partition_key: key.0.clone(),
                row_key: key.1.clone(),
            })?;
        let current = map.get(&key).ok_or_else(|| StoreError::NotFound {
            partition_key: key.0.clone(),
            row_key: key.1.clone(),
        })?;
        if current.etag.as_deref() != Some(etag) {
            return Err(StoreError::EtagMismatch {
                partition_key: key.0,
                row_key: key.1,
            });
        }
        map.remove(&key);
        Ok(())
    }

    async fn query(
        &self,
        table: &str,
        filter: Option<&str>,
        limit: Option<usize>,
        continuation: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<RowPage, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let parsed = match filter {
            Some(raw) => Some(
                od::parse_str(raw).map_err(|e| StoreError::InvalidFilter(format!("{e:?}")))?,
            ),
            None => None,
        };
        if limit == Some(0) {
            return Ok(RowPage {
                rows: Vec::new(),
                continuation: None,
            });
        }

        let start = match continuation {
            Some(token) => {
                let c = Continuation::decode(token)?;
                Bound::Excluded((c.partition_key, c.row_key))
            }
            None => Bound::Unbounded,
        };

        let Some(map) = self.tables.get(table) else {
            return Ok(RowPage {
                rows: Vec::new(),
                continuation: None,
            });
        };

        let mut rows: Vec<RowBag> = Vec::new();
        let mut next = None;
        for (_, row) in map.range((start, Bound::Unbounded)) {
            if let Some(expr) = &parsed {
                if !eval(expr, row)? {
                    continue;
                }
            }
            if limit.is_some_and(|l| rows.len() >= l) {
                // at least one more match exists past this page
                next = rows.last().map(|last: &RowBag| {
                    Continuation {
                        partition_key: last.partition_key.clone(),
                        row_key: last.row_key.clone(),
                    }
                    .encode()
                });
                break;
            }
            rows.push(row.clone());
        }
        debug!(table, returned = rows.len(), more = next.is_some(), "query page");
        Ok(RowPage {
            rows,
            continuation: next,
        })
    }
}

/// Resolve a filter identifier against a row. The structural key pair is
/// addressable alongside declared fields.
fn lookup(row: &RowBag, name: &str) -> Option<FieldValue> {
    match name {
        "PartitionKey" => Some(FieldValue::String(row.partition_key.clone())),
        "RowKey" => Some(FieldValue::String(row.row_key.clone())),
        _ => row.get(name).cloned(),
    }
}

/// Type-directed comparison between a stored field and a filter literal.
/// `None` means the pair is incomparable (absent field or kind mismatch);
/// rows where a comparison is incomparable never match it.
fn compare(field: &FieldValue, literal: &od::Value) -> Option<Ordering> {
    match (field, literal) {
        (FieldValue::String(s), od::Value::String(l)) => Some(s.as_str().cmp(l.as_str())),
        (FieldValue::Bool(b), od::Value::Bool(l)) => Some(b.cmp(l)),
        (FieldValue::I64(i), od::Value::Number(n)) => Some(BigDecimal::from(*i).cmp(n)),
        (FieldValue::F64(f), od::Value::Number(n)) => {
            BigDecimal::try_from(*f).ok().map(|b| b.cmp(n))
        }
        (FieldValue::Uuid(u), od::Value::Uuid(l)) => Some(u.cmp(l)),
        (FieldValue::DateTime(d), od::Value::DateTime(l)) => Some(d.cmp(l)),
        _ => None,
    }
}

fn op_matches(op: &od::CompareOperator, ord: Ordering) -> bool {
    use od::CompareOperator::{
        Equal, GreaterOrEqual, GreaterThan, LessOrEqual, LessThan, NotEqual,
    };
    match op {
        Equal => ord == Ordering::Equal,
        NotEqual => ord != Ordering::Equal,
        GreaterThan => ord == Ordering::Greater,
        GreaterOrEqual => ord != Ordering::Less,
        LessThan => ord == Ordering::Less,
        LessOrEqual => ord != Ordering::Greater,
    }
}

fn eval(expr: &od::Expr, row: &RowBag) -> Result<bool, StoreError> {
    use od::Expr as E;

    match expr {
        E::And(a, b) => Ok(eval(a, row)? && eval(b, row)?),
        E::Or(a, b) => Ok(eval(a, row)? || eval(b, row)?),
        E::Not(inner) => Ok(!eval(inner, row)?),
        E::Compare(left, op, right) => {
            let (name, literal) = match (&**left, &**right) {
                (E::Identifier(name), E::Value(value)) => (name, value),
                _ => {
                    return Err(StoreError::InvalidFilter(
                        "comparison must be between a field and a literal".to_owned(),
                    ));
                }
            };
            Ok(lookup(row, name)
                .and_then(|field| compare(&field, literal))
                .is_some_and(|ord| op_matches(op, ord)))
        }
        E::Function(name, args) => {
            let name_lower = name.to_ascii_lowercase();
            match (name_lower.as_str(), args.as_slice()) {
                (
                    "contains" | "startswith" | "endswith",
                    [E::Identifier(field), E::Value(od::Value::String(needle))],
                ) => {
                    let Some(value) = lookup(row, field) else {
                        return Ok(false);
                    };
                    let Some(s) = value.as_str() else {
                        return Ok(false);
                    };
                    Ok(match name_lower.as_str() {
                        "contains" => s.contains(needle.as_str()),
                        "startswith" => s.starts_with(needle.as_str()),
                        _ => s.ends_with(needle.as_str()),
                    })
                }
                _ => Err(StoreError::InvalidFilter(format!(
                    "unsupported function '{name}'"
                ))),
            }
        }
        E::In(_, _) => Err(StoreError::InvalidFilter(
            "'in' is not supported by this backend".to_owned(),
        )),
        E::Identifier(name) => Err(StoreError::InvalidFilter(format!(
            "bare identifier '{name}'"
        ))),
        E::Value(_) => Err(StoreError::InvalidFilter("bare literal".to_owned())),
    }
}
