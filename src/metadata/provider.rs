//! MetadataProvider trait and the TOML-backed metadata registry.
//!
//! The registry is the catalogue of entity types. Schemas are written in
//! TOML, one table per entity:
//!
//! ```toml
//! [entities.user]
//! table = "users"
//! primary_key = "id"
//! columns = ["id", "name", "profile_id"]
//!
//! [[entities.user.relations]]
//! name = "posts"
//! target = "post"
//! cardinality = "one_to_many"
//!
//! [[entities.user.relations]]
//! name = "profile"
//! target = "profile"
//! cardinality = "one_to_one"
//! loading = "lazy"
//! foreign_key = "profile_id"
//! ```

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::entity::EntityMetadata;
use super::relation::Relation;
use crate::error::{SchemaError, SchemaResult};

/// Source of entity metadata, keyed by entity type name.
pub trait MetadataProvider: Send + Sync {
    /// Look up an entity type.
    fn entity(&self, name: &str) -> SchemaResult<Arc<EntityMetadata>>;

    /// All known entity type names.
    fn entity_names(&self) -> Vec<String>;

    /// Metadata of the entity a relation points at.
    fn target_of(&self, relation: &Relation) -> SchemaResult<Arc<EntityMetadata>> {
        self.entity(relation.target())
    }
}

/// In-memory catalogue of entity metadata.
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    entities: BTreeMap<String, Arc<EntityMetadata>>,
}

impl MetadataRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity, replacing any previous one with the same name.
    pub fn with_entity(mut self, entity: EntityMetadata) -> Self {
        self.insert(entity);
        self
    }

    pub fn insert(&mut self, entity: EntityMetadata) {
        self.entities
            .insert(entity.name().to_string(), Arc::new(entity));
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EntityMetadata>> {
        self.entities.values()
    }

    /// Parse and validate a schema from TOML source.
    pub fn from_toml_str(source: &str) -> SchemaResult<Self> {
        let file: SchemaFile = toml::from_str(source)?;
        let registry = file.into_registry();
        registry.validate()?;
        Ok(registry)
    }

    /// Load and validate a schema file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SchemaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SchemaError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate the registry.
    ///
    /// Checks that:
    /// - every relation targets a registered entity
    /// - no field name is used twice on an entity
    /// - lazy single-valued relations name their foreign key
    /// - eager relations do not form a cycle
    pub fn validate(&self) -> SchemaResult<()> {
        for entity in self.entities.values() {
            let mut seen: Vec<&str> = entity.columns().iter().map(String::as_str).collect();

            for relation in entity.relations() {
                if !self.entities.contains_key(relation.target()) {
                    return Err(SchemaError::UnknownTarget {
                        entity: entity.name().to_string(),
                        relation: relation.name().to_string(),
                        target: relation.target().to_string(),
                    });
                }

                if seen.contains(&relation.name()) {
                    return Err(SchemaError::DuplicateField {
                        entity: entity.name().to_string(),
                        field: relation.name().to_string(),
                    });
                }
                seen.push(relation.name());

                if relation.is_lazy() && relation.is_one_to_one() && relation.foreign_key().is_none()
                {
                    return Err(SchemaError::MissingForeignKey {
                        entity: entity.name().to_string(),
                        relation: relation.name().to_string(),
                    });
                }
            }
        }

        if let Some(cycle) = self.detect_eager_cycle() {
            return Err(SchemaError::EagerCycle(cycle));
        }

        Ok(())
    }

    /// Find a cycle among eager relations, returned as a closed path of
    /// entity names (first == last).
    fn detect_eager_cycle(&self) -> Option<Vec<String>> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();

        for name in self.entities.keys() {
            index.insert(name.as_str(), graph.add_node(name.as_str()));
        }

        for entity in self.entities.values() {
            for relation in entity.eager_relations() {
                if let (Some(&from), Some(&to)) =
                    (index.get(entity.name()), index.get(relation.target()))
                {
                    graph.add_edge(from, to, ());
                }
            }
        }

        for component in tarjan_scc(&graph) {
            let start = component[0];
            let is_cycle = component.len() > 1 || graph.contains_edge(start, start);
            if !is_cycle {
                continue;
            }

            let members: HashSet<NodeIndex> = component.iter().copied().collect();
            let Some(path) = shortest_cycle(&graph, start, &members) else {
                continue;
            };

            return Some(path.into_iter().map(|n| graph[n].to_string()).collect());
        }

        None
    }
}

/// Shortest closed path from `start` back to itself, staying inside
/// `members`. Breadth-first, so the first return to `start` is the shortest.
fn shortest_cycle(
    graph: &DiGraph<&str, ()>,
    start: NodeIndex,
    members: &HashSet<NodeIndex>,
) -> Option<Vec<NodeIndex>> {
    let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        for next in graph.neighbors(current).filter(|n| members.contains(n)) {
            if next == start {
                let mut tail = Vec::new();
                let mut node = current;
                while let Some(&parent) = previous.get(&node) {
                    tail.push(node);
                    node = parent;
                }
                tail.reverse();

                let mut path = vec![start];
                path.extend(tail);
                path.push(start);
                return Some(path);
            }
            if !previous.contains_key(&next) {
                previous.insert(next, current);
                queue.push_back(next);
            }
        }
    }
    None
}

impl MetadataProvider for MetadataRegistry {
    fn entity(&self, name: &str) -> SchemaResult<Arc<EntityMetadata>> {
        self.entities
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))
    }

    fn entity_names(&self) -> Vec<String> {
        self.entities.keys().cloned().collect()
    }
}

/// On-disk schema layout.
#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    entities: BTreeMap<String, EntityDef>,
}

#[derive(Debug, Deserialize)]
struct EntityDef {
    #[serde(default)]
    table: Option<String>,
    primary_key: String,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    relations: Vec<Relation>,
}

impl SchemaFile {
    fn into_registry(self) -> MetadataRegistry {
        let mut registry = MetadataRegistry::new();
        for (name, def) in self.entities {
            let mut entity = EntityMetadata::new(name, def.primary_key).with_columns(def.columns);
            if let Some(table) = def.table {
                entity = entity.with_table(table);
            }
            for relation in def.relations {
                entity = entity.with_relation(relation);
            }
            registry.insert(entity);
        }
        registry
    }
}
