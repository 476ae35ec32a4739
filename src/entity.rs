//! Hydrated entities and the factories that build them.

use serde::de::DeserializeOwned;
use serde::ser::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::{HydrationError, HydrationResult};
use crate::metadata::EntityMetadata;
use crate::value::{Key, Value};

/// A field of a hydrated record.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// A column value, or the raw foreign key of a lazy relation.
    Value(Value),
    /// A single-valued eager relation; `None` when nothing matched.
    One(Option<Box<Entity>>),
    /// A to-many eager relation.
    Many(Vec<Entity>),
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Value(v) => v.serialize(serializer),
            Field::One(e) => e.serialize(serializer),
            Field::Many(es) => es.serialize(serializer),
        }
    }
}

/// Field name to field, in name order.
pub type Record = BTreeMap<String, Field>;

/// A hydrated entity: its type, its primary key and its record.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    kind: String,
    key: Key,
    record: Record,
}

impl Entity {
    pub fn new(kind: impl Into<String>, key: Key, record: Record) -> Self {
        Self {
            kind: kind.into(),
            key,
            record,
        }
    }

    /// Entity type name.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    pub fn get(&self, field: &str) -> Option<&Field> {
        self.record.get(field)
    }

    /// Get a scalar field.
    pub fn value(&self, field: &str) -> Option<&Value> {
        match self.record.get(field)? {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Get a single-valued relation. The outer `Option` is `None` when the
    /// field is missing or not single-valued; the inner one when no entity matched.
    pub fn one(&self, field: &str) -> Option<Option<&Entity>> {
        match self.record.get(field)? {
            Field::One(e) => Some(e.as_deref()),
            _ => None,
        }
    }

    /// Get a to-many relation.
    pub fn many(&self, field: &str) -> Option<&[Entity]> {
        match self.record.get(field)? {
            Field::Many(es) => Some(es),
            _ => None,
        }
    }

    /// Render the entity and everything attached to it as JSON.
    pub fn to_json(&self) -> HydrationResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Convert into any deserialisable type with matching field names.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> HydrationResult<T> {
        Ok(serde_json::from_value(self.to_json()?)?)
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.record.iter())
    }
}

/// Builds entities from hydrated records.
///
/// Factories are the typed-construction hook: they may validate, rename or
/// compute fields before the entity is attached to its parent.
pub trait EntityFactory: Send + Sync {
    fn instantiate(
        &self,
        metadata: &EntityMetadata,
        key: Key,
        record: Record,
    ) -> HydrationResult<Entity>;
}

/// Builds an [`Entity`] from the record unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFactory;

impl EntityFactory for DefaultFactory {
    fn instantiate(
        &self,
        metadata: &EntityMetadata,
        key: Key,
        record: Record,
    ) -> HydrationResult<Entity> {
        Ok(Entity::new(metadata.name(), key, record))
    }
}

impl<F> EntityFactory for F
where
    F: Fn(&EntityMetadata, Key, Record) -> HydrationResult<Entity> + Send + Sync,
{
    fn instantiate(
        &self,
        metadata: &EntityMetadata,
        key: Key,
        record: Record,
    ) -> HydrationResult<Entity> {
        self(metadata, key, record)
    }
}

/// Factories keyed by entity type, with a fallback for everything else.
#[derive(Clone)]
pub struct FactoryRegistry {
    factories: HashMap<String, Arc<dyn EntityFactory>>,
    fallback: Arc<dyn EntityFactory>,
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self {
            factories: HashMap::new(),
            fallback: Arc::new(DefaultFactory),
        }
    }
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for one entity type.
    pub fn with_factory(mut self, entity: impl Into<String>, factory: impl EntityFactory + 'static) -> Self {
        self.factories.insert(entity.into(), Arc::new(factory));
        self
    }

    /// Replace the factory used for unregistered entity types.
    pub fn with_fallback(mut self, factory: impl EntityFactory + 'static) -> Self {
        self.fallback = Arc::new(factory);
        self
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.factories.contains_key(entity)
    }

    /// Instantiate an entity with the factory registered for its type.
    pub fn instantiate(
        &self,
        metadata: &EntityMetadata,
        key: Key,
        record: Record,
    ) -> HydrationResult<Entity> {
        self.factories
            .get(metadata.name())
            .unwrap_or(&self.fallback)
            .instantiate(metadata, key, record)
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("FactoryRegistry")
            .field("factories", &names)
            .finish_non_exhaustive()
    }
}

/// Reject records that lack one of the given fields.
///
/// A small building block for factories that need required fields.
pub fn require_fields(metadata: &EntityMetadata, record: &Record, fields: &[&str]) -> HydrationResult<()> {
    for field in fields {
        match record.get(*field) {
            Some(Field::Value(Value::Null)) | None => {
                return Err(HydrationError::factory(
                    metadata.name(),
                    format!("required field '{}' is empty", field),
                ));
            }
            Some(_) => {}
        }
    }
    Ok(())
}
