use thiserror::Error;

use tablekit_store::{FieldKind, StoreError};

use crate::codec::CodecError;
use crate::predicate::CompareOperator;

/// Bad field or member wiring, detected at first compilation or at
/// schema-synthesis time. Always a programming error in the mapper set,
/// never a data error.
#[derive(Debug, Error, Clone)]
pub enum ConfigError {
    #[error("duplicate row field declared: {field}")]
    DuplicateField { field: String },

    #[error("row field '{field}' does not exist in schema [{signature}]")]
    UnknownRowField { field: String, signature: String },

    #[error("accessor cache entry '{key}' holds a different entity type")]
    AccessorTypeConflict { key: String },

    #[error("mapper set has no key mapper")]
    MissingKeyMapper,
}

/// Failure while converting between a domain entity and a row.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("codec failure on field '{field}': {source}")]
    Codec {
        field: String,
        #[source]
        source: CodecError,
    },

    #[error("field '{field}' holds {got}, expected {expected}")]
    KindMismatch {
        field: String,
        expected: FieldKind,
        got: FieldKind,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A predicate shape or operator the translator cannot express in the
/// storage filter grammar. Translation fails closed: no partial filter
/// string is ever produced.
#[derive(Debug, Error, Clone)]
pub enum QueryError {
    #[error("no mapper owns member '{0}'")]
    UnknownMember(String),

    #[error("member '{member}' cannot be translated with operator '{op}'")]
    Untranslatable {
        member: String,
        op: CompareOperator,
    },

    #[error("member-to-member comparisons are not supported")]
    MemberToMemberComparison,

    #[error("bare member '{0}' in predicate")]
    BareMember(String),

    #[error("bare literal in predicate")]
    BareLiteral,

    #[error("unsupported predicate shape: {0}")]
    UnsupportedShape(String),
}

/// Repository-level failure surfaced to callers unmodified.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("entity not found: {partition_key}/{row_key}")]
    EntityNotFound {
        partition_key: String,
        row_key: String,
    },

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
