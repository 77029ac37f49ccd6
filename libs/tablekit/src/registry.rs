//! Process-wide mapper registry.
//!
//! The registry owns the two monotonically growing caches of the mapping
//! engine: compiled field accessors and resolved row schemas. It is
//! created once at application start, shared by `Arc`, and never torn
//! down; entries are permanently valid because the structural contract
//! they encode cannot change without redeploying code.

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use tablekit_store::FieldValue;

use crate::error::{ConfigError, MappingError};
use crate::schema::RowSchema;

/// Compiled bidirectional accessor between a domain member and a row
/// field. Immutable once compiled; safe for unlimited concurrent use.
pub struct FieldAccessor<E> {
    get: Arc<dyn Fn(&E) -> Option<FieldValue> + Send + Sync>,
    set: Arc<dyn Fn(&mut E, FieldValue) -> Result<(), MappingError> + Send + Sync>,
}

impl<E> FieldAccessor<E> {
    pub fn new(
        get: Arc<dyn Fn(&E) -> Option<FieldValue> + Send + Sync>,
        set: Arc<dyn Fn(&mut E, FieldValue) -> Result<(), MappingError> + Send + Sync>,
    ) -> Self {
        Self { get, set }
    }

    #[must_use]
    pub fn read(&self, entity: &E) -> Option<FieldValue> {
        (self.get)(entity)
    }

    /// # Errors
    /// Returns `MappingError::KindMismatch` when the value's kind does
    /// not match the member.
    pub fn write(&self, entity: &mut E, value: FieldValue) -> Result<(), MappingError> {
        (self.set)(entity, value)
    }
}

impl<E> Clone for FieldAccessor<E> {
    fn clone(&self) -> Self {
        Self {
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<E> std::fmt::Debug for FieldAccessor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldAccessor").finish_non_exhaustive()
    }
}

/// Shared get-or-create caches for accessors and schemas.
#[derive(Default)]
pub struct MapperRegistry {
    accessors: DashMap<String, Arc<dyn Any + Send + Sync>>,
    schemas: DashMap<String, Arc<RowSchema>>,
}

impl MapperRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for an accessor: entity type path, schema signature and
    /// row field name. Type paths from `std::any::type_name` keep
    /// identically-named entity types in different modules apart.
    fn accessor_key<E>(signature: &str, field: &str) -> String {
        format!("{}::{signature}::{field}", std::any::type_name::<E>())
    }

    /// Get or compile the accessor for `field` on the given schema.
    ///
    /// The compile step runs at most once per key, even under concurrent
    /// callers; everyone else reuses the cached entry.
    ///
    /// # Errors
    /// `ConfigError::UnknownRowField` when `field` is not part of the
    /// schema (surfaces at first use, not at mapper construction);
    /// `ConfigError::AccessorTypeConflict` when the cached entry belongs
    /// to a different entity type (impossible under the documented key
    /// composition, but checked rather than assumed).
    pub fn accessor_for<E: 'static>(
        &self,
        schema: &RowSchema,
        field: &str,
        build: impl FnOnce() -> FieldAccessor<E>,
    ) -> Result<Arc<FieldAccessor<E>>, ConfigError> {
        if !schema.contains(field) {
            return Err(ConfigError::UnknownRowField {
                field: field.to_owned(),
                signature: schema.signature().to_owned(),
            });
        }
        let key = Self::accessor_key::<E>(schema.signature(), field);
        let entry = self.accessors.entry(key.clone()).or_insert_with(|| {
            trace!(key = %key, "compiling field accessor");
            Arc::new(build()) as Arc<dyn Any + Send + Sync>
        });
        let erased = Arc::clone(&*entry);
        drop(entry);
        erased
            .downcast::<FieldAccessor<E>>()
            .map_err(|_| ConfigError::AccessorTypeConflict { key })
    }

    /// Get or insert the schema for a field signature. Mapper sets that
    /// produce identical signatures share one schema instance.
    pub fn schema_for(
        &self,
        signature: &str,
        build: impl FnOnce() -> RowSchema,
    ) -> Arc<RowSchema> {
        let entry = self
            .schemas
            .entry(signature.to_owned())
            .or_insert_with(|| Arc::new(build()));
        Arc::clone(&*entry)
    }
}
