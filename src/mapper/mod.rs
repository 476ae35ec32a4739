//! Result-set to entity-graph hydration.
//!
//! The mapper turns a flattened join result into root entities with their
//! eager relations attached:
//!
//! ```text
//! rows (id_0, name_0, id_1, title_1, ...)
//!          │
//!          ▼  collect: dedupe records per iteration, record parent -> child keys
//! temporary_data[i]  +  associations[i]
//!          │
//!          ▼  hydrate: depth-first from iteration 0, factories build entities
//! Vec<Entity> (roots, first-seen order)
//! ```
//!
//! The mapper itself is immutable. All working state is allocated per call,
//! so one mapper can be shared between threads and reused freely.

mod context;

use std::sync::Arc;
use tracing::debug_span;

use crate::entity::{Entity, FactoryRegistry};
use crate::error::HydrationResult;
use crate::metadata::{MetadataProvider, Relation};
use crate::plan::EagerPlan;
use crate::row::Row;

use context::MappingContext;

/// Behaviour switches for the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapperOptions {
    /// Fail on rows missing an expected `{column}_{iteration}` key. When
    /// off, a missing column reads as NULL.
    pub strict_columns: bool,

    /// Check the first row for columns beyond the plan's last iteration.
    pub verify_shape: bool,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            strict_columns: true,
            verify_shape: false,
        }
    }
}

impl MapperOptions {
    pub fn lenient() -> Self {
        Self {
            strict_columns: false,
            ..Self::default()
        }
    }

    pub fn with_verify_shape(mut self, verify: bool) -> Self {
        self.verify_shape = verify;
        self
    }
}

/// Hydrates flattened rows into entity graphs for one query shape.
#[derive(Debug, Clone)]
pub struct Mapper {
    plan: Arc<EagerPlan>,
    factories: FactoryRegistry,
    options: MapperOptions,
}

impl Mapper {
    /// Create a mapper for an existing plan.
    pub fn new(plan: impl Into<Arc<EagerPlan>>) -> Self {
        Self {
            plan: plan.into(),
            factories: FactoryRegistry::default(),
            options: MapperOptions::default(),
        }
    }

    /// Create a mapper loading every eager relation reachable from `root`.
    pub fn for_root(provider: &dyn MetadataProvider, root: &str) -> HydrationResult<Self> {
        Ok(Self::new(EagerPlan::build(provider, root)?))
    }

    /// Create a mapper from a root and a pre-flattened eager relation list.
    pub fn from_relations(
        provider: &dyn MetadataProvider,
        root: &str,
        relations: &[Relation],
    ) -> HydrationResult<Self> {
        Ok(Self::new(EagerPlan::from_relations(provider, root, relations)?))
    }

    pub fn with_factories(mut self, factories: FactoryRegistry) -> Self {
        self.factories = factories;
        self
    }

    pub fn with_options(mut self, options: MapperOptions) -> Self {
        self.options = options;
        self
    }

    pub fn plan(&self) -> &EagerPlan {
        &self.plan
    }

    pub fn options(&self) -> MapperOptions {
        self.options
    }

    /// Map rows to root entities.
    ///
    /// Roots are returned in the order their primary key first appears in
    /// `rows`. Rows with a NULL primary key at an iteration contribute
    /// nothing at that iteration.
    pub fn map_to_entities(&self, rows: &[Row]) -> HydrationResult<Vec<Entity>> {
        let span = debug_span!(
            "map_to_entities",
            root = self.plan.root().metadata.name(),
            rows = rows.len()
        );
        let _enter = span.enter();

        let mut context = MappingContext::new(&self.plan, &self.options, &self.factories);

        if self.options.verify_shape {
            if let Some(first) = rows.first() {
                context.verify_shape(first)?;
            }
        }

        context.collect(rows)?;
        context.hydrate(0, None)
    }
}
