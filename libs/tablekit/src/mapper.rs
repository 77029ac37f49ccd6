//! Property mappers: the composable units of entity↔row mapping.
//!
//! A mapper owns one domain member (or, for key mappers, the key pair)
//! and knows how to declare its row fields, copy values in both
//! directions, and optionally translate comparison predicates on its
//! member into the storage filter grammar. Mappers are wired with
//! explicit member names and caller-supplied accessor closures; there is
//! no reflection anywhere.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use tablekit_store::{FieldKind, FieldValue, FromFieldValue, IntoFieldValue, RowBag};

use crate::codec::{CodecError, ContentCodec, JsonCodec};
use crate::error::{ConfigError, MappingError};
use crate::predicate::{CompareOperator, Literal};
use crate::registry::{FieldAccessor, MapperRegistry};
use crate::schema::{RowSchema, SchemaBuilder};

/// Row field name prefix for serialized-content members.
pub const CONTENT_FIELD_PREFIX: &str = "content_";

/// Outcome of asking a mapper to translate a comparison on its member.
/// `Unsupported` is an ordinary answer, not an error; the translator
/// decides what to do with it.
#[derive(Clone, Debug)]
pub enum Translation {
    Fragment(String),
    Unsupported,
}

/// Capability set every mapper variant implements.
pub trait PropertyMapper<E>: Send + Sync {
    /// Contribute this mapper's row field declarations.
    ///
    /// # Errors
    /// Returns `ConfigError::DuplicateField` when another mapper already
    /// declared one of the names.
    fn describe(&self, builder: &mut SchemaBuilder) -> Result<(), ConfigError>;

    /// Copy this mapper's member from the entity into the row.
    ///
    /// # Errors
    /// Returns `MappingError` on codec failures or wiring errors.
    fn map_to_row(
        &self,
        registry: &MapperRegistry,
        schema: &RowSchema,
        entity: &E,
        row: &mut RowBag,
    ) -> Result<(), MappingError>;

    /// Copy this mapper's member from the row into the entity.
    ///
    /// # Errors
    /// Returns `MappingError` on codec failures or wiring errors.
    fn map_from_row(
        &self,
        registry: &MapperRegistry,
        schema: &RowSchema,
        row: &RowBag,
        entity: &mut E,
    ) -> Result<(), MappingError>;

    /// The domain member this mapper owns, used to locate the owner of a
    /// predicate leaf. Key mappers own no single member.
    fn member(&self) -> Option<&str>;

    /// Translate `member op literal` into a filter fragment, or decline.
    fn translate(&self, op: CompareOperator, literal: &Literal) -> Translation {
        let _ = (op, literal);
        Translation::Unsupported
    }
}

/// Scalar mapper: one domain member to one row field of the member's own
/// kind, copied through the compiled accessor cache.
pub struct DirectMapper<E> {
    member: String,
    field: String,
    kind: FieldKind,
    get: Arc<dyn Fn(&E) -> Option<FieldValue> + Send + Sync>,
    set: Arc<dyn Fn(&mut E, FieldValue) -> Result<(), MappingError> + Send + Sync>,
}

impl<E: 'static> DirectMapper<E> {
    pub fn new<V, G, S>(
        member: impl Into<String>,
        field: impl Into<String>,
        get: G,
        set: S,
    ) -> Self
    where
        V: IntoFieldValue + FromFieldValue + 'static,
        G: Fn(&E) -> V + Send + Sync + 'static,
        S: Fn(&mut E, V) + Send + Sync + 'static,
    {
        let field: String = field.into();
        let expected = V::KIND;
        let field_in_set = field.clone();
        Self {
            member: member.into(),
            kind: V::KIND,
            get: Arc::new(move |entity: &E| Some(get(entity).into_field_value())),
            set: Arc::new(move |entity: &mut E, value: FieldValue| {
                let got = value.kind();
                match V::from_field_value(value) {
                    Some(v) => {
                        set(entity, v);
                        Ok(())
                    }
                    None => Err(MappingError::KindMismatch {
                        field: field_in_set.clone(),
                        expected,
                        got,
                    }),
                }
            }),
            field,
        }
    }

    fn accessor(
        &self,
        registry: &MapperRegistry,
        schema: &RowSchema,
    ) -> Result<Arc<FieldAccessor<E>>, ConfigError> {
        registry.accessor_for::<E>(schema, &self.field, || {
            FieldAccessor::new(Arc::clone(&self.get), Arc::clone(&self.set))
        })
    }
}

impl<E: 'static> PropertyMapper<E> for DirectMapper<E> {
    fn describe(&self, builder: &mut SchemaBuilder) -> Result<(), ConfigError> {
        builder.declare(self.field.clone(), self.kind)
    }

    fn map_to_row(
        &self,
        registry: &MapperRegistry,
        schema: &RowSchema,
        entity: &E,
        row: &mut RowBag,
    ) -> Result<(), MappingError> {
        let accessor = self.accessor(registry, schema)?;
        if let Some(value) = accessor.read(entity) {
            row.set(self.field.clone(), value);
        }
        Ok(())
    }

    fn map_from_row(
        &self,
        registry: &MapperRegistry,
        schema: &RowSchema,
        row: &RowBag,
        entity: &mut E,
    ) -> Result<(), MappingError> {
        let accessor = self.accessor(registry, schema)?;
        // a row lacking the field leaves the member at its current value
        if let Some(value) = row.get(&self.field) {
            accessor.write(entity, value.clone())?;
        }
        Ok(())
    }

    fn member(&self) -> Option<&str> {
        Some(&self.member)
    }

    fn translate(&self, op: CompareOperator, literal: &Literal) -> Translation {
        if literal.kind() == self.kind {
            Translation::Fragment(format!("{} {op} {}", self.field, literal.render()))
        } else {
            Translation::Unsupported
        }
    }
}

/// Serialized-content mapper: one domain member to one textual row field
/// named `content_<member>`, through a pluggable codec.
///
/// An absent member writes nothing; an absent or empty row field leaves
/// the member untouched on the way back.
pub struct ContentMapper<E> {
    member: String,
    field: String,
    encode: Arc<dyn Fn(&E) -> Result<Option<String>, CodecError> + Send + Sync>,
    decode: Arc<dyn Fn(&mut E, &str) -> Result<(), CodecError> + Send + Sync>,
}

impl<E: 'static> ContentMapper<E> {
    pub fn new<V, C, G, S>(member: impl Into<String>, get: G, set: S, codec: C) -> Self
    where
        V: Serialize + DeserializeOwned + 'static,
        C: ContentCodec,
        G: Fn(&E) -> Option<V> + Send + Sync + 'static,
        S: Fn(&mut E, V) + Send + Sync + 'static,
    {
        let member: String = member.into();
        let field = format!("{CONTENT_FIELD_PREFIX}{member}");
        let codec = Arc::new(codec);
        let encode_codec = Arc::clone(&codec);
        Self {
            member,
            field,
            encode: Arc::new(move |entity: &E| match get(entity) {
                Some(value) => encode_codec.encode(&value).map(Some),
                None => Ok(None),
            }),
            decode: Arc::new(move |entity: &mut E, text: &str| {
                let value: V = codec.decode(text)?;
                set(entity, value);
                Ok(())
            }),
        }
    }

    /// Content mapper over the default JSON codec.
    pub fn json<V, G, S>(member: impl Into<String>, get: G, set: S) -> Self
    where
        V: Serialize + DeserializeOwned + 'static,
        G: Fn(&E) -> Option<V> + Send + Sync + 'static,
        S: Fn(&mut E, V) + Send + Sync + 'static,
    {
        Self::new(member, get, set, JsonCodec)
    }

    fn codec_error(&self, source: CodecError) -> MappingError {
        MappingError::Codec {
            field: self.field.clone(),
            source,
        }
    }
}

impl<E: 'static> PropertyMapper<E> for ContentMapper<E> {
    fn describe(&self, builder: &mut SchemaBuilder) -> Result<(), ConfigError> {
        builder.declare(self.field.clone(), FieldKind::String)
    }

    fn map_to_row(
        &self,
        _registry: &MapperRegistry,
        schema: &RowSchema,
        entity: &E,
        row: &mut RowBag,
    ) -> Result<(), MappingError> {
        if !schema.contains(&self.field) {
            return Err(ConfigError::UnknownRowField {
                field: self.field.clone(),
                signature: schema.signature().to_owned(),
            }
            .into());
        }
        if let Some(text) = (self.encode)(entity).map_err(|e| self.codec_error(e))? {
            row.set(self.field.clone(), FieldValue::String(text));
        }
        Ok(())
    }

    fn map_from_row(
        &self,
        _registry: &MapperRegistry,
        _schema: &RowSchema,
        row: &RowBag,
        entity: &mut E,
    ) -> Result<(), MappingError> {
        match row.get_str(&self.field) {
            None | Some("") => Ok(()),
            Some(text) => (self.decode)(entity, text).map_err(|e| self.codec_error(e)),
        }
    }

    fn member(&self) -> Option<&str> {
        Some(&self.member)
    }
}

/// The partition/row key pair extracted from one entity instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowKeys {
    pub partition_key: String,
    pub row_key: String,
}

/// Key mapper: extracts the key pair from designated members. Declares
/// nothing to the schema builder; the key fields are structural on every
/// row.
pub struct KeyMapper<E> {
    partition: Arc<dyn Fn(&E) -> String + Send + Sync>,
    row: Arc<dyn Fn(&E) -> String + Send + Sync>,
    restore: Option<Arc<dyn Fn(&mut E, &str, &str) + Send + Sync>>,
}

impl<E> KeyMapper<E> {
    pub fn new<P, R>(partition: P, row: R) -> Self
    where
        P: Fn(&E) -> String + Send + Sync + 'static,
        R: Fn(&E) -> String + Send + Sync + 'static,
    {
        Self {
            partition: Arc::new(partition),
            row: Arc::new(row),
            restore: None,
        }
    }

    /// Also write the key pair back into the entity when mapping rows to
    /// entities.
    #[must_use]
    pub fn with_restore<F>(mut self, restore: F) -> Self
    where
        F: Fn(&mut E, &str, &str) + Send + Sync + 'static,
    {
        self.restore = Some(Arc::new(restore));
        self
    }

    #[must_use]
    pub fn keys_of(&self, entity: &E) -> RowKeys {
        RowKeys {
            partition_key: (self.partition)(entity),
            row_key: (self.row)(entity),
        }
    }
}

impl<E> PropertyMapper<E> for KeyMapper<E> {
    fn describe(&self, _builder: &mut SchemaBuilder) -> Result<(), ConfigError> {
        Ok(())
    }

    fn map_to_row(
        &self,
        _registry: &MapperRegistry,
        _schema: &RowSchema,
        entity: &E,
        row: &mut RowBag,
    ) -> Result<(), MappingError> {
        row.partition_key = (self.partition)(entity);
        row.row_key = (self.row)(entity);
        Ok(())
    }

    fn map_from_row(
        &self,
        _registry: &MapperRegistry,
        _schema: &RowSchema,
        row: &RowBag,
        entity: &mut E,
    ) -> Result<(), MappingError> {
        if let Some(restore) = &self.restore {
            restore(entity, &row.partition_key, &row.row_key);
        }
        Ok(())
    }

    fn member(&self) -> Option<&str> {
        None
    }
}

/// The immutable, declaration-ordered mapper collection for one domain
/// type. Fixed at construction; shared process-wide across all mapping
/// calls for that type.
pub struct MapperSet<E> {
    mappers: Arc<[Arc<dyn PropertyMapper<E>>]>,
    key: Arc<KeyMapper<E>>,
}

impl<E> MapperSet<E> {
    #[must_use]
    pub fn builder() -> MapperSetBuilder<E>
    where
        E: 'static,
    {
        MapperSetBuilder::new()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn PropertyMapper<E>>> {
        self.mappers.iter()
    }

    #[must_use]
    pub fn key(&self) -> &KeyMapper<E> {
        &self.key
    }

    /// The mapper owning the named domain member, if any.
    #[must_use]
    pub fn owner_of(&self, member: &str) -> Option<&dyn PropertyMapper<E>> {
        self.mappers
            .iter()
            .find(|m| m.member() == Some(member))
            .map(|m| &**m)
    }
}

impl<E> Clone for MapperSet<E> {
    fn clone(&self) -> Self {
        Self {
            mappers: Arc::clone(&self.mappers),
            key: Arc::clone(&self.key),
        }
    }
}

impl<E> std::fmt::Debug for MapperSet<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperSet")
            .field("mappers", &self.mappers.len())
            .finish_non_exhaustive()
    }
}

/// Declaration-order builder for a [`MapperSet`].
pub struct MapperSetBuilder<E> {
    mappers: Vec<Arc<dyn PropertyMapper<E>>>,
    key: Option<Arc<KeyMapper<E>>>,
}

impl<E> Default for MapperSetBuilder<E> {
    fn default() -> Self {
        Self {
            mappers: Vec::new(),
            key: None,
        }
    }
}

impl<E: 'static> MapperSetBuilder<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, mapper: impl PropertyMapper<E> + 'static) -> Self {
        self.mappers.push(Arc::new(mapper));
        self
    }

    /// Add the key mapper. It participates in the ordered mapper list at
    /// this position and is also addressable for point-key extraction.
    #[must_use]
    pub fn with_keys(mut self, key: KeyMapper<E>) -> Self {
        let key = Arc::new(key);
        self.mappers.push(Arc::clone(&key) as Arc<dyn PropertyMapper<E>>);
        self.key = Some(key);
        self
    }

    /// # Errors
    /// Returns `ConfigError::MissingKeyMapper` when no key mapper was
    /// added; every domain type needs at least its key-designated
    /// members.
    pub fn build(self) -> Result<MapperSet<E>, ConfigError> {
        let key = self.key.ok_or(ConfigError::MissingKeyMapper)?;
        Ok(MapperSet {
            mappers: self.mappers.into(),
            key,
        })
    }
}
