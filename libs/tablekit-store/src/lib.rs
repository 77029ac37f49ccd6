//! Storage collaborator contract for flat key/value table services.
//!
//! A table service stores rows as flat field bags addressed by a
//! (partition key, row key) pair and guarded by an opaque concurrency
//! token (etag). This crate defines:
//! - the row representation ([`RowBag`], [`FieldValue`], [`FieldKind`]),
//! - the async [`TableClient`] contract (create-if-missing, point get,
//!   update/delete with concurrency token, filtered + paged enumeration),
//! - [`StoreError`] and continuation tokens for paging,
//! - an embedded [`MemoryTableClient`] backend that evaluates the native
//!   filter grammar in process, for local development and tests.
//!
//! Filter strings use the `OData` comparison grammar
//! (`status eq 'active' and priority ge 3`).

pub mod client;
pub mod error;
pub mod memory;
pub mod row;

pub use client::{Continuation, RowPage, TableClient};
pub use error::StoreError;
pub use memory::MemoryTableClient;
pub use row::{FieldKind, FieldValue, FromFieldValue, IntoFieldValue, RowBag};
