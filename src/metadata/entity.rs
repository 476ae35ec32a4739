//! Entity metadata: primary key, data columns and declared relations.

use serde::Serialize;

use super::relation::Relation;

/// Describes one entity type: where it lives, how it is identified, which
/// columns it carries and which relations it declares.
///
/// Metadata is immutable once built and is shared through `Arc` by the
/// registry, plans and mappers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityMetadata {
    /// Entity type identifier (e.g., "user").
    name: String,

    /// Physical table name (defaults to the entity name).
    table: String,

    /// Primary key column.
    primary_key: String,

    /// Data columns in declaration order. Always contains the primary key.
    columns: Vec<String>,

    /// Relations in declaration order.
    relations: Vec<Relation>,
}

impl EntityMetadata {
    /// Create metadata with only a primary key column.
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        let name = name.into();
        let primary_key = primary_key.into();
        Self {
            table: name.clone(),
            name,
            columns: vec![primary_key.clone()],
            primary_key,
            relations: Vec::new(),
        }
    }

    /// Set the physical table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Add a data column. Adding the primary key or an existing column is a no-op.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        if !self.columns.contains(&column) {
            self.columns.push(column);
        }
        self
    }

    /// Add several data columns.
    pub fn with_columns<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        columns.into_iter().fold(self, |meta, c| meta.with_column(c))
    }

    /// Declare a relation.
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Get a relation by name.
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name() == name)
    }

    /// Eagerly loaded relations, in declaration order.
    pub fn eager_relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(|r| r.is_eager())
    }

    /// Lazy single-valued relations. Only their foreign key is hydrated.
    pub fn lazy_single_relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations
            .iter()
            .filter(|r| r.is_lazy() && r.is_one_to_one())
    }

    /// Check whether a name is already used by a column or a relation.
    pub fn has_field(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name) || self.relation(name).is_some()
    }
}
