//! Eager-load plan: assignment of iteration positions to entities.
//!
//! A result set joins a root entity with every eagerly loaded relation. Each
//! joined entity gets an *iteration* index and every one of its columns is
//! selected as `{column}_{iteration}`. The plan is the single place where
//! that assignment happens, so the query builder that produces the rows and
//! the mapper that consumes them cannot drift apart.
//!
//! Positions are assigned depth-first, pre-order, following relation
//! declaration order:
//!
//! ```text
//! user                      0
//! ├── posts (1:N)           1
//! │   └── comments (1:N)    2
//! └── profile (1:1)         3
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{HydrationError, HydrationResult, SchemaError};
use crate::metadata::{EntityMetadata, MetadataProvider, Relation};

/// Build the aliased column name for a column at an iteration position.
pub fn alias(column: &str, iteration: usize) -> String {
    format!("{}_{}", column, iteration)
}

/// Split an aliased column name into its column stem and iteration.
///
/// Returns `None` when the name does not end in `_{number}`.
pub fn split_alias(aliased: &str) -> Option<(&str, usize)> {
    let (stem, suffix) = aliased.rsplit_once('_')?;
    if stem.is_empty() {
        return None;
    }
    suffix.parse().ok().map(|iteration| (stem, iteration))
}

/// An eager child of a plan node.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanChild {
    /// The relation on the parent that reaches the child.
    pub relation: Relation,
    /// Iteration position of the child.
    pub iteration: usize,
}

/// One entity position in the plan.
#[derive(Debug, Clone)]
pub struct PlanNode {
    pub iteration: usize,
    pub metadata: Arc<EntityMetadata>,
    /// Iteration of the eager parent; `None` for the root.
    pub parent: Option<usize>,
    /// Relation through which this node is reached; `None` for the root.
    pub relation: Option<Relation>,
    /// Eager children in declaration order.
    pub children: Vec<PlanChild>,
}

/// A column the query must select for the mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAlias {
    pub iteration: usize,
    pub table: String,
    pub column: String,
    pub alias: String,
}

/// Flattened eager-load tree.
#[derive(Debug, Clone)]
pub struct EagerPlan {
    nodes: Vec<PlanNode>,
}

impl EagerPlan {
    /// Flatten the eager relation tree below `root`.
    pub fn build(provider: &dyn MetadataProvider, root: &str) -> HydrationResult<Self> {
        let root = provider.entity(root)?;
        let mut plan = Self {
            nodes: vec![PlanNode {
                iteration: 0,
                metadata: Arc::clone(&root),
                parent: None,
                relation: None,
                children: Vec::new(),
            }],
        };
        let mut path = vec![root.name().to_string()];
        plan.expand(provider, 0, &mut path)?;
        Ok(plan)
    }

    fn expand(
        &mut self,
        provider: &dyn MetadataProvider,
        parent: usize,
        path: &mut Vec<String>,
    ) -> HydrationResult<()> {
        let metadata = Arc::clone(&self.nodes[parent].metadata);
        check_lazy_foreign_keys(&metadata)?;

        for relation in metadata.eager_relations() {
            if path.iter().any(|name| name == relation.target()) {
                let mut cycle = path.clone();
                cycle.push(relation.target().to_string());
                return Err(SchemaError::EagerCycle(cycle).into());
            }

            let target = provider.target_of(relation)?;
            let iteration = self.push_child(parent, relation.clone(), target);

            path.push(relation.target().to_string());
            self.expand(provider, iteration, path)?;
            path.pop();
        }
        Ok(())
    }

    /// Build a plan from a root and an already flattened eager relation list.
    ///
    /// Positions are `[root] ++ relations`. Each relation is attached to the
    /// nearest preceding position whose entity declares it as an eager
    /// relation and has not used it yet. A relation that fits nowhere means
    /// the list was not produced by a depth-first walk from `root`.
    pub fn from_relations(
        provider: &dyn MetadataProvider,
        root: &str,
        relations: &[Relation],
    ) -> HydrationResult<Self> {
        let root = provider.entity(root)?;
        check_lazy_foreign_keys(&root)?;

        let mut plan = Self {
            nodes: vec![PlanNode {
                iteration: 0,
                metadata: root,
                parent: None,
                relation: None,
                children: Vec::new(),
            }],
        };
        let mut used: HashSet<(usize, String)> = HashSet::new();

        for relation in relations {
            if relation.is_lazy() {
                return Err(HydrationError::InconsistentMetadata(format!(
                    "relation '{}' is lazy and cannot occupy an iteration",
                    relation.name()
                )));
            }

            let parent = (0..plan.nodes.len()).rev().find(|&i| {
                plan.nodes[i].metadata.relation(relation.name()) == Some(relation)
                    && !used.contains(&(i, relation.name().to_string()))
            });
            let Some(parent) = parent else {
                return Err(HydrationError::InconsistentMetadata(format!(
                    "relation '{}' (-> {}) is not declared by any preceding entity",
                    relation.name(),
                    relation.target()
                )));
            };

            let target = provider.target_of(relation)?;
            check_lazy_foreign_keys(&target)?;
            used.insert((parent, relation.name().to_string()));
            plan.push_child(parent, relation.clone(), target);
        }

        Ok(plan)
    }

    fn push_child(&mut self, parent: usize, relation: Relation, target: Arc<EntityMetadata>) -> usize {
        let iteration = self.nodes.len();
        self.nodes[parent].children.push(PlanChild {
            relation: relation.clone(),
            iteration,
        });
        self.nodes.push(PlanNode {
            iteration,
            metadata: target,
            parent: Some(parent),
            relation: Some(relation),
            children: Vec::new(),
        });
        iteration
    }

    pub fn root(&self) -> &PlanNode {
        &self.nodes[0]
    }

    pub fn node(&self, iteration: usize) -> Option<&PlanNode> {
        self.nodes.get(iteration)
    }

    pub fn nodes(&self) -> &[PlanNode] {
        &self.nodes
    }

    /// Number of positions, root included. Never zero.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn max_iteration(&self) -> usize {
        self.nodes.len() - 1
    }

    /// The relations occupying positions `1..`, in plan order.
    pub fn relations(&self) -> Vec<&Relation> {
        self.nodes.iter().filter_map(|n| n.relation.as_ref()).collect()
    }

    /// Every aliased column a result set must carry for this plan.
    ///
    /// Lazy foreign keys that are not data columns are listed after the
    /// data columns of their position.
    pub fn column_aliases(&self) -> Vec<ColumnAlias> {
        let mut aliases = Vec::new();
        for node in &self.nodes {
            let meta = &node.metadata;
            let lazy_keys = meta.lazy_single_relations().filter_map(Relation::foreign_key);

            let mut columns: Vec<&str> = meta.columns().iter().map(String::as_str).collect();
            for key in lazy_keys {
                if !columns.contains(&key) {
                    columns.push(key);
                }
            }

            for column in columns {
                aliases.push(ColumnAlias {
                    iteration: node.iteration,
                    table: meta.table().to_string(),
                    column: column.to_string(),
                    alias: alias(column, node.iteration),
                });
            }
        }
        aliases
    }

    /// Check whether a column stem belongs to any position of the plan.
    pub fn knows_column(&self, column: &str) -> bool {
        self.nodes.iter().any(|n| {
            n.metadata.columns().iter().any(|c| c == column)
                || n.metadata
                    .lazy_single_relations()
                    .any(|r| r.foreign_key() == Some(column))
        })
    }
}

fn check_lazy_foreign_keys(metadata: &EntityMetadata) -> Result<(), SchemaError> {
    match metadata
        .lazy_single_relations()
        .find(|r| r.foreign_key().is_none())
    {
        Some(relation) => Err(SchemaError::MissingForeignKey {
            entity: metadata.name().to_string(),
            relation: relation.name().to_string(),
        }),
        None => Ok(()),
    }
}

impl fmt::Display for EagerPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            match (&node.relation, node.parent) {
                (Some(rel), Some(parent)) => {
                    let depth = std::iter::successors(Some(parent), |p| self.nodes[*p].parent).count();
                    writeln!(
                        f,
                        "{}: {}{}.{} ({}) -> {}",
                        node.iteration,
                        "  ".repeat(depth - 1),
                        self.nodes[parent].metadata.name(),
                        rel.name(),
                        rel.cardinality(),
                        node.metadata.name()
                    )?;
                }
                _ => writeln!(f, "{}: {}", node.iteration, node.metadata.name())?,
            }
        }
        Ok(())
    }
}
