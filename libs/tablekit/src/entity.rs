//! Entity-level mapping orchestration.

use std::sync::{Arc, OnceLock};

use tablekit_store::RowBag;

use crate::error::{ConfigError, MappingError, QueryError};
use crate::mapper::{MapperSet, RowKeys};
use crate::predicate::Expr;
use crate::registry::MapperRegistry;
use crate::schema::{RowSchema, build_schema};
use crate::translate::translate_predicate;

/// Maps one domain type to and from rows by running its mapper set in
/// declaration order.
///
/// The synthesized row schema is resolved once per instance and reused
/// for every call; the registry deduplicates it against other instances
/// with the same field signature.
pub struct EntityMapper<E> {
    registry: Arc<MapperRegistry>,
    mappers: MapperSet<E>,
    schema: OnceLock<Arc<RowSchema>>,
}

impl<E: Default + 'static> EntityMapper<E> {
    pub fn new(registry: Arc<MapperRegistry>, mappers: MapperSet<E>) -> Self {
        Self {
            registry,
            mappers,
            schema: OnceLock::new(),
        }
    }

    /// The row schema this type's mapper set produces.
    ///
    /// # Errors
    /// Returns `ConfigError` when the mapper set's declarations collide.
    pub fn schema(&self) -> Result<Arc<RowSchema>, ConfigError> {
        if let Some(schema) = self.schema.get() {
            return Ok(Arc::clone(schema));
        }
        let built = build_schema(&self.registry, &self.mappers)?;
        Ok(Arc::clone(self.schema.get_or_init(|| built)))
    }

    /// Map a domain entity into a fresh row.
    ///
    /// Mappers run in declaration order; on the first failure the
    /// partial row is discarded and the error surfaces unchanged.
    ///
    /// # Errors
    /// Returns `MappingError` from the failing mapper step.
    pub fn to_row(&self, entity: &E) -> Result<RowBag, MappingError> {
        let schema = self.schema()?;
        let keys = self.mappers.key().keys_of(entity);
        let mut row = RowBag::new(keys.partition_key, keys.row_key);
        for mapper in self.mappers.iter() {
            mapper.map_to_row(&self.registry, &schema, entity, &mut row)?;
        }
        Ok(row)
    }

    /// Map a row into a fresh domain entity, starting from `E::default()`.
    ///
    /// # Errors
    /// Returns `MappingError` from the failing mapper step; the partial
    /// entity is discarded.
    pub fn from_row(&self, row: &RowBag) -> Result<E, MappingError> {
        let schema = self.schema()?;
        let mut entity = E::default();
        for mapper in self.mappers.iter() {
            mapper.map_from_row(&self.registry, &schema, row, &mut entity)?;
        }
        Ok(entity)
    }

    #[must_use]
    pub fn keys_of(&self, entity: &E) -> RowKeys {
        self.mappers.key().keys_of(entity)
    }

    /// Translate a domain predicate via this type's mapper set.
    ///
    /// # Errors
    /// Returns `QueryError` when the predicate cannot be expressed.
    pub fn filter(&self, expr: &Expr) -> Result<String, QueryError> {
        translate_predicate(expr, &self.mappers)
    }

    #[must_use]
    pub fn mappers(&self) -> &MapperSet<E> {
        &self.mappers
    }
}
