//! Predicate expressions over domain entity members.
//!
//! A predicate is a boolean expression tree whose leaves compare a
//! domain member against a literal. It is written against the domain
//! model, not the row shape; the translator turns it into the storage
//! collaborator's native filter grammar by consulting the mapper that
//! owns each member.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use tablekit_store::FieldKind;

/// Boolean expression over domain members.
#[derive(Clone, Debug)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare(Box<Expr>, CompareOperator, Box<Expr>),
    Member(String),
    Literal(Literal),
}

impl Expr {
    /// Combine two expressions with AND: `expr1 and expr2`
    #[must_use]
    pub fn and(self, other: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(other))
    }

    /// Combine two expressions with OR: `expr1 or expr2`
    #[must_use]
    pub fn or(self, other: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(other))
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Self::Output {
        Expr::Not(Box::new(self))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl fmt::Display for CompareOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOperator::Eq => write!(f, "eq"),
            CompareOperator::Ne => write!(f, "ne"),
            CompareOperator::Gt => write!(f, "gt"),
            CompareOperator::Ge => write!(f, "ge"),
            CompareOperator::Lt => write!(f, "lt"),
            CompareOperator::Le => write!(f, "le"),
        }
    }
}

/// Literal operand of a comparison.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
}

impl Literal {
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            Literal::Bool(_) => FieldKind::Bool,
            Literal::I64(_) => FieldKind::I64,
            Literal::F64(_) => FieldKind::F64,
            Literal::String(_) => FieldKind::String,
            Literal::Uuid(_) => FieldKind::Uuid,
            Literal::DateTime(_) => FieldKind::DateTimeUtc,
        }
    }

    /// Render as a filter-grammar literal: strings single-quoted with
    /// `''` escaping, everything else bare.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Literal::Bool(b) => b.to_string(),
            Literal::I64(i) => i.to_string(),
            Literal::F64(x) => x.to_string(),
            Literal::String(s) => format!("'{}'", s.replace('\'', "''")),
            Literal::Uuid(u) => u.to_string(),
            Literal::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::I64(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::I64(v.into())
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::F64(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::String(v.to_owned())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::String(v)
    }
}

impl From<Uuid> for Literal {
    fn from(v: Uuid) -> Self {
        Literal::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Literal {
    fn from(v: DateTime<Utc>) -> Self {
        Literal::DateTime(v)
    }
}

/// Reference to a domain member, for building comparison leaves.
///
/// ```rust,ignore
/// let filter = member("status").eq("active").and(member("priority").ge(3));
/// ```
#[derive(Clone, Debug)]
pub struct MemberRef(String);

/// Start a comparison against the named domain member.
pub fn member(name: impl Into<String>) -> MemberRef {
    MemberRef(name.into())
}

impl MemberRef {
    fn compare<V: Into<Literal>>(self, op: CompareOperator, value: V) -> Expr {
        Expr::Compare(
            Box::new(Expr::Member(self.0)),
            op,
            Box::new(Expr::Literal(value.into())),
        )
    }

    /// `member eq value`
    #[must_use]
    pub fn eq<V: Into<Literal>>(self, value: V) -> Expr {
        self.compare(CompareOperator::Eq, value)
    }

    /// `member ne value`
    #[must_use]
    pub fn ne<V: Into<Literal>>(self, value: V) -> Expr {
        self.compare(CompareOperator::Ne, value)
    }

    /// `member gt value`
    #[must_use]
    pub fn gt<V: Into<Literal>>(self, value: V) -> Expr {
        self.compare(CompareOperator::Gt, value)
    }

    /// `member ge value`
    #[must_use]
    pub fn ge<V: Into<Literal>>(self, value: V) -> Expr {
        self.compare(CompareOperator::Ge, value)
    }

    /// `member lt value`
    #[must_use]
    pub fn lt<V: Into<Literal>>(self, value: V) -> Expr {
        self.compare(CompareOperator::Lt, value)
    }

    /// `member le value`
    #[must_use]
    pub fn le<V: Into<Literal>>(self, value: V) -> Expr {
        self.compare(CompareOperator::Le, value)
    }
}
