//! Entity mapping and dynamic schema composition for key/value table
//! storage.
//!
//! Application code defines its domain types freely; a set of property
//! mappers per type describes how members translate to and from the flat
//! row shape a table service requires. From that set the engine:
//!
//! - composes the row schema once per unique field signature
//!   ([`schema`]),
//! - compiles and caches bidirectional field accessors so warm mapping
//!   is a direct copy ([`registry`]),
//! - maps entities to rows and back in deterministic mapper order
//!   ([`entity`]),
//! - translates domain predicates into the storage filter grammar,
//!   failing closed on anything it cannot express ([`translate`]),
//! - and drives CRUD, lookup and paged queries through any
//!   [`tablekit_store::TableClient`] ([`repository`]).
//!
//! All engine caches live in a [`registry::MapperRegistry`] created once
//! at application start and shared by `Arc`.

pub mod codec;
pub mod entity;
pub mod error;
pub mod mapper;
pub mod predicate;
pub mod registry;
pub mod repository;
pub mod schema;
pub mod translate;

pub use codec::{CodecError, ContentCodec, JsonCodec};
pub use entity::EntityMapper;
pub use error::{ConfigError, MappingError, QueryError, RepoError};
pub use mapper::{
    CONTENT_FIELD_PREFIX, ContentMapper, DirectMapper, KeyMapper, MapperSet, MapperSetBuilder,
    PropertyMapper, RowKeys, Translation,
};
pub use predicate::{CompareOperator, Expr, Literal, MemberRef, member};
pub use registry::{FieldAccessor, MapperRegistry};
pub use repository::{Page, TableRepository};
pub use schema::{RowFieldDecl, RowSchema, SchemaBuilder, build_schema};
pub use translate::translate_predicate;

pub use tablekit_store as store;
