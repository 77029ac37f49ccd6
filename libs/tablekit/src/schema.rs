//! Row schema composition.
//!
//! Property mappers declare the row fields they need through a
//! [`SchemaBuilder`]; the ordered, deduplicated declarations form a
//! field signature, and each unique signature resolves to exactly one
//! [`RowSchema`] for the process lifetime. The structural fields every
//! row carries (partition key, row key, concurrency token) live on the
//! row itself and are never declared here.

use std::sync::Arc;

use tablekit_store::FieldKind;

use crate::error::ConfigError;
use crate::mapper::MapperSet;
use crate::registry::MapperRegistry;

/// A (field name, semantic kind) pair contributed by a property mapper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowFieldDecl {
    pub name: String,
    pub kind: FieldKind,
}

/// Ordered collector of field declarations for one mapper set.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<RowFieldDecl>,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare one row field.
    ///
    /// # Errors
    /// Returns `ConfigError::DuplicateField` when the name was already
    /// declared by this or another mapper; two mappers writing the same
    /// row field is a wiring error, never a silent precedence.
    pub fn declare(&mut self, name: impl Into<String>, kind: FieldKind) -> Result<(), ConfigError> {
        let name = name.into();
        if self.fields.iter().any(|f| f.name == name) {
            return Err(ConfigError::DuplicateField { field: name });
        }
        self.fields.push(RowFieldDecl { name, kind });
        Ok(())
    }

    /// Seal the declarations into a schema.
    #[must_use]
    pub fn finish(self) -> RowSchema {
        let signature = self
            .fields
            .iter()
            .map(|f| format!("{}:{}", f.name, f.kind))
            .collect::<Vec<_>>()
            .join("|");
        RowSchema {
            signature,
            fields: self.fields,
        }
    }
}

/// The shape of the rows a mapper set reads and writes: exactly the
/// union of the declared fields, in declaration order. Never mutated
/// after creation.
#[derive(Clone, Debug)]
pub struct RowSchema {
    signature: String,
    fields: Vec<RowFieldDecl>,
}

impl RowSchema {
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    #[must_use]
    pub fn fields(&self) -> &[RowFieldDecl] {
        &self.fields
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.name == field)
    }

    #[must_use]
    pub fn kind_of(&self, field: &str) -> Option<FieldKind> {
        self.fields.iter().find(|f| f.name == field).map(|f| f.kind)
    }
}

/// Resolve the row schema for a mapper set, reusing the cached instance
/// when another mapper set already produced the same field signature.
///
/// # Errors
/// Propagates declaration collisions (`ConfigError::DuplicateField`)
/// from the mapper set.
pub fn build_schema<E>(
    registry: &MapperRegistry,
    mappers: &MapperSet<E>,
) -> Result<Arc<RowSchema>, ConfigError> {
    let mut builder = SchemaBuilder::new();
    for mapper in mappers.iter() {
        mapper.describe(&mut builder)?;
    }
    let schema = builder.finish();
    let signature = schema.signature.clone();
    Ok(registry.schema_for(&signature, move || schema))
}
