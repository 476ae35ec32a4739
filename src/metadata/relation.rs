//! Relation descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cardinality of a relation, seen from the declaring entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// The owner has at most one related entity.
    OneToOne,
    /// Many owners point at one related entity (belongs-to).
    ManyToOne,
    /// The owner has many related entities.
    OneToMany,
    /// Owners and related entities are linked through a join table.
    ManyToMany,
}

impl Cardinality {
    /// Single-valued relations hydrate to an entity or null.
    pub fn is_single(self) -> bool {
        matches!(self, Cardinality::OneToOne | Cardinality::ManyToOne)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Cardinality::OneToOne => "1:1",
            Cardinality::ManyToOne => "N:1",
            Cardinality::OneToMany => "1:N",
            Cardinality::ManyToMany => "N:M",
        };
        f.write_str(s)
    }
}

/// When a related entity is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loading {
    /// Joined into the same result set as its owner.
    #[default]
    Eager,
    /// Loaded on demand; only the foreign key travels with the owner.
    Lazy,
}

/// A relation declared on an entity.
///
/// The target is referenced by entity name and resolved through a
/// [`MetadataProvider`](super::MetadataProvider), so several relations
/// (including self references) can share one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Field name on the owning entity.
    name: String,

    cardinality: Cardinality,

    #[serde(default)]
    loading: Loading,

    /// Name of the related entity type.
    target: String,

    /// Column on the owner holding the related key (lazy single-valued relations).
    #[serde(default)]
    foreign_key: Option<String>,
}

impl Relation {
    /// Create an eager relation.
    pub fn new(name: impl Into<String>, target: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            name: name.into(),
            cardinality,
            loading: Loading::Eager,
            target: target.into(),
            foreign_key: None,
        }
    }

    pub fn one_to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, Cardinality::OneToOne)
    }

    pub fn many_to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, Cardinality::ManyToOne)
    }

    pub fn one_to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, Cardinality::OneToMany)
    }

    pub fn many_to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, Cardinality::ManyToMany)
    }

    /// Mark the relation as lazily loaded.
    pub fn lazy(mut self) -> Self {
        self.loading = Loading::Lazy;
        self
    }

    /// Mark the relation as lazily loaded through an owner-side foreign key.
    pub fn lazy_via(self, foreign_key: impl Into<String>) -> Self {
        self.lazy().with_foreign_key(foreign_key)
    }

    pub fn with_loading(mut self, loading: Loading) -> Self {
        self.loading = loading;
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: impl Into<String>) -> Self {
        self.foreign_key = Some(foreign_key.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn loading(&self) -> Loading {
        self.loading
    }

    /// Name of the related entity type.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn foreign_key(&self) -> Option<&str> {
        self.foreign_key.as_deref()
    }

    pub fn is_eager(&self) -> bool {
        self.loading == Loading::Eager
    }

    pub fn is_lazy(&self) -> bool {
        self.loading == Loading::Lazy
    }

    /// True for single-valued relations (one-to-one and many-to-one).
    pub fn is_one_to_one(&self) -> bool {
        self.cardinality.is_single()
    }

    pub fn is_to_many(&self) -> bool {
        !self.cardinality.is_single()
    }
}
