//! # Nano ORM
//!
//! Entity-graph hydration for the Nano framework's Active-Record ORM.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Schema (EntityMetadata + Relation, TOML)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [plan]
//! ┌─────────────────────────────────────────────────────────┐
//! │   EagerPlan (iteration positions, {column}_{i} aliases)  │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [query collaborator runs the join]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Flattened rows (RowSet)                  │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [mapper: collect, then hydrate]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Entities with nested related entities           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use nano_orm::prelude::*;
//!
//! let registry = MetadataRegistry::new()
//!     .with_entity(
//!         EntityMetadata::new("user", "id")
//!             .with_columns(["name"])
//!             .with_relation(Relation::one_to_many("posts", "post")),
//!     )
//!     .with_entity(EntityMetadata::new("post", "id").with_columns(["title"]));
//!
//! let mapper = Mapper::for_root(&registry, "user").unwrap();
//! let rows = vec![
//!     Row::new().with("id_0", 1).with("name_0", "ada").with("id_1", 10).with("title_1", "hello"),
//!     Row::new().with("id_0", 1).with("name_0", "ada").with("id_1", 11).with("title_1", "again"),
//! ];
//!
//! let users = mapper.map_to_entities(&rows).unwrap();
//! assert_eq!(users.len(), 1);
//! assert_eq!(users[0].many("posts").unwrap().len(), 2);
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod logging;
pub mod mapper;
pub mod metadata;
pub mod plan;
pub mod row;
pub mod value;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::entity::{DefaultFactory, Entity, EntityFactory, FactoryRegistry, Field, Record};
    pub use crate::error::{HydrationError, HydrationResult, SchemaError};
    pub use crate::mapper::{Mapper, MapperOptions};
    pub use crate::metadata::{
        Cardinality, EntityMetadata, Loading, MetadataProvider, MetadataRegistry, Relation,
    };
    pub use crate::plan::{alias, EagerPlan};
    pub use crate::row::{Row, RowSet};
    pub use crate::value::{Key, Value};
}

pub use error::{HydrationError, HydrationResult, SchemaError};
pub use mapper::Mapper;
