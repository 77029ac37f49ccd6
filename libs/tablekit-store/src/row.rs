use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Semantic type of a row field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    I64,
    F64,
    String,
    Uuid,
    DateTimeUtc,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Bool => write!(f, "Bool"),
            FieldKind::I64 => write!(f, "I64"),
            FieldKind::F64 => write!(f, "F64"),
            FieldKind::String => write!(f, "String"),
            FieldKind::Uuid => write!(f, "Uuid"),
            FieldKind::DateTimeUtc => write!(f, "DateTimeUtc"),
        }
    }
}

/// Tagged value stored in a row field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
}

impl FieldValue {
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::I64(_) => FieldKind::I64,
            FieldValue::F64(_) => FieldKind::F64,
            FieldValue::String(_) => FieldKind::String,
            FieldValue::Uuid(_) => FieldKind::Uuid,
            FieldValue::DateTime(_) => FieldKind::DateTimeUtc,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::I64(v) => write!(f, "{v}"),
            FieldValue::F64(v) => write!(f, "{v}"),
            FieldValue::String(v) => write!(f, "{v}"),
            FieldValue::Uuid(v) => write!(f, "{v}"),
            FieldValue::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

/// Conversion of a domain member value into a row field value.
pub trait IntoFieldValue {
    /// The field kind this type maps to.
    const KIND: FieldKind;

    fn into_field_value(self) -> FieldValue;
}

/// Conversion of a row field value back into a domain member value.
///
/// Returns `None` when the stored value has a different kind than the
/// member expects.
pub trait FromFieldValue: Sized {
    fn from_field_value(value: FieldValue) -> Option<Self>;
}

macro_rules! impl_field_convert {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl IntoFieldValue for $ty {
            const KIND: FieldKind = FieldKind::$kind;

            fn into_field_value(self) -> FieldValue {
                FieldValue::$variant(self)
            }
        }

        impl FromFieldValue for $ty {
            fn from_field_value(value: FieldValue) -> Option<Self> {
                match value {
                    FieldValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_field_convert!(bool, Bool, Bool);
impl_field_convert!(i64, I64, I64);
impl_field_convert!(f64, F64, F64);
impl_field_convert!(String, String, String);
impl_field_convert!(Uuid, Uuid, Uuid);
impl_field_convert!(DateTime<Utc>, DateTimeUtc, DateTime);

/// The flat field bag a table service stores and returns.
///
/// Every row carries the mandatory structural triple (partition key,
/// row key, concurrency token); everything else lives in the ordered
/// field map. The bag itself imposes no schema; callers that need one
/// validate before writing.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct RowBag {
    pub partition_key: String,
    pub row_key: String,
    /// Concurrency token assigned by the backend on every write.
    pub etag: Option<String>,
    fields: BTreeMap<String, FieldValue>,
}

impl RowBag {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            etag: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_kinds() {
        assert_eq!(FieldValue::Bool(true).kind(), FieldKind::Bool);
        assert_eq!(FieldValue::I64(7).kind(), FieldKind::I64);
        assert_eq!(FieldValue::String("x".to_owned()).kind(), FieldKind::String);
    }

    #[test]
    fn round_trip_conversions() {
        let v = 42i64.into_field_value();
        assert_eq!(i64::from_field_value(v), Some(42));

        let v = "hello".to_owned().into_field_value();
        assert_eq!(String::from_field_value(v), Some("hello".to_owned()));

        // kind mismatch declines rather than coercing
        assert_eq!(i64::from_field_value(FieldValue::Bool(true)), None);
    }

    #[test]
    fn row_bag_field_order_is_deterministic() {
        let mut row = RowBag::new("p", "r");
        row.set("zeta", FieldValue::I64(1));
        row.set("alpha", FieldValue::I64(2));

        let names: Vec<&str> = row.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
