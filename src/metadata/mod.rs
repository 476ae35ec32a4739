//! Entity metadata module.
//!
//! Describes entity types (primary key, columns, relations) and provides
//! them to the planner and mapper.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MetadataProvider                           │
//! │  - entity(name) -> Arc<EntityMetadata>                          │
//! │  - entity_names()                                               │
//! └─────────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MetadataRegistry                           │
//! │        (built in code or loaded from a TOML schema file)        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use nano_orm::metadata::{EntityMetadata, MetadataProvider, MetadataRegistry, Relation};
//!
//! let registry = MetadataRegistry::new()
//!     .with_entity(
//!         EntityMetadata::new("user", "id")
//!             .with_columns(["name"])
//!             .with_relation(Relation::one_to_many("posts", "post")),
//!     )
//!     .with_entity(EntityMetadata::new("post", "id").with_columns(["title"]));
//!
//! registry.validate().unwrap();
//! assert_eq!(registry.entity("user").unwrap().primary_key(), "id");
//! ```

mod entity;
mod provider;
mod relation;

pub use entity::EntityMetadata;
pub use provider::{MetadataProvider, MetadataRegistry};
pub use relation::{Cardinality, Loading, Relation};
