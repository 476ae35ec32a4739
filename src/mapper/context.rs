//! Per-call working state of the mapper.
//!
//! A [`MappingContext`] lives for one `map_to_entities` call. The collect
//! pass fills it from the rows; the hydrate pass reads it to build entities.

use std::collections::HashMap;
use tracing::{debug, trace, warn};

use super::MapperOptions;
use crate::entity::{Entity, FactoryRegistry, Field, Record};
use crate::error::{HydrationError, HydrationResult};
use crate::plan::{alias, EagerPlan, PlanNode};
use crate::row::Row;
use crate::value::{Key, Value};

/// Records of one iteration position, deduplicated by primary key and kept
/// in first-seen order.
#[derive(Debug, Default)]
struct Bucket {
    entries: Vec<(Key, Record)>,
    index: HashMap<Key, usize>,
}

impl Bucket {
    fn contains(&self, key: &Key) -> bool {
        self.index.contains_key(key)
    }

    fn insert(&mut self, key: Key, record: Record) {
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, record));
    }

    fn position(&self, key: &Key) -> Option<usize> {
        self.index.get(key).copied()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub(crate) struct MappingContext<'a> {
    plan: &'a EagerPlan,
    options: &'a MapperOptions,
    factories: &'a FactoryRegistry,
    /// `temporary_data[i]`: records at iteration `i`.
    temporary_data: Vec<Bucket>,
    /// `associations[i]`: parent key -> child keys at iteration `i`.
    /// Slot 0 stays empty; the root has no parent.
    associations: Vec<HashMap<Key, Vec<Key>>>,
}

impl<'a> MappingContext<'a> {
    pub(crate) fn new(
        plan: &'a EagerPlan,
        options: &'a MapperOptions,
        factories: &'a FactoryRegistry,
    ) -> Self {
        Self {
            plan,
            options,
            factories,
            temporary_data: plan.nodes().iter().map(|_| Bucket::default()).collect(),
            associations: plan.nodes().iter().map(|_| HashMap::new()).collect(),
        }
    }

    /// Compare the columns of a sample row with the plan.
    pub(crate) fn verify_shape(&self, row: &Row) -> HydrationResult<()> {
        let max = self.plan.max_iteration();
        for column in row.column_names() {
            let Some((stem, iteration)) = crate::plan::split_alias(column) else {
                continue;
            };
            if iteration > max && self.plan.knows_column(stem) {
                return Err(HydrationError::InconsistentMetadata(format!(
                    "column '{}' refers to iteration {} but the plan ends at {}",
                    column, iteration, max
                )));
            }
        }
        Ok(())
    }

    /// Collect pass: deduplicate records and record parent/child edges.
    ///
    /// A null primary key removes the row from that position and from every
    /// position below it, whatever those columns hold.
    pub(crate) fn collect(&mut self, rows: &[Row]) -> HydrationResult<()> {
        let plan = self.plan;
        let mut present = vec![false; plan.len()];

        for (row_index, row) in rows.iter().enumerate() {
            present.fill(false);

            for node in plan.nodes() {
                let iteration = node.iteration;
                // Pre-order: a parent is always visited before its children.
                if node.parent.is_some_and(|parent| !present[parent]) {
                    continue;
                }

                let pk_column = alias(node.metadata.primary_key(), iteration);
                let Some(key) = self.read_key(row_index, row, iteration, &pk_column)? else {
                    trace!(row = row_index, iteration, "null primary key, branch skipped");
                    continue;
                };
                present[iteration] = true;

                for child in &node.children {
                    let child_meta = &plan.nodes()[child.iteration].metadata;
                    let child_column = alias(child_meta.primary_key(), child.iteration);
                    if let Some(child_key) =
                        self.read_key(row_index, row, child.iteration, &child_column)?
                    {
                        self.associations[child.iteration]
                            .entry(key.clone())
                            .or_default()
                            .push(child_key);
                    }
                }

                if !self.temporary_data[iteration].contains(&key) {
                    let record = self.read_record(row_index, row, node)?;
                    self.temporary_data[iteration].insert(key, record);
                }
            }
        }

        for (iteration, bucket) in self.temporary_data.iter().enumerate() {
            debug!(
                iteration,
                entity = plan.nodes()[iteration].metadata.name(),
                distinct = bucket.len(),
                parents = self.associations[iteration].len(),
                "collected"
            );
        }
        Ok(())
    }

    /// Hydrate pass for one position.
    ///
    /// With `filter`, only the listed keys are hydrated (a parent's
    /// children). Output follows first-seen order of the position, and each
    /// key appears once however often it is listed.
    pub(crate) fn hydrate(
        &self,
        iteration: usize,
        filter: Option<&[Key]>,
    ) -> HydrationResult<Vec<Entity>> {
        let node = &self.plan.nodes()[iteration];
        let bucket = &self.temporary_data[iteration];

        let positions: Vec<usize> = match filter {
            None => (0..bucket.len()).collect(),
            Some(wanted) => {
                let mut positions: Vec<usize> =
                    wanted.iter().filter_map(|key| bucket.position(key)).collect();
                positions.sort_unstable();
                positions.dedup();
                positions
            }
        };

        let mut entities = Vec::with_capacity(positions.len());
        for position in positions {
            let (key, base) = &bucket.entries[position];
            let mut record = base.clone();

            for child in &node.children {
                let child_keys = self.associations[child.iteration]
                    .get(key)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                let related = self.hydrate(child.iteration, Some(child_keys))?;

                let field = if child.relation.is_one_to_one() {
                    Field::One(related.into_iter().next().map(Box::new))
                } else {
                    Field::Many(related)
                };
                record.insert(child.relation.name().to_string(), field);
            }

            entities.push(
                self.factories
                    .instantiate(&node.metadata, key.clone(), record)?,
            );
        }

        Ok(entities)
    }

    fn read_value(
        &self,
        row_index: usize,
        row: &Row,
        iteration: usize,
        column: &str,
    ) -> HydrationResult<Value> {
        match row.get(column) {
            Some(value) => Ok(value.clone()),
            None if self.options.strict_columns => {
                warn!(row = row_index, iteration, column, "row is missing a column");
                Err(HydrationError::MalformedRow {
                    row: row_index,
                    iteration,
                    column: column.to_string(),
                })
            }
            None => Ok(Value::Null),
        }
    }

    fn read_key(
        &self,
        row_index: usize,
        row: &Row,
        iteration: usize,
        column: &str,
    ) -> HydrationResult<Option<Key>> {
        let value = self.read_value(row_index, row, iteration, column)?;
        Key::from_value(&value).map_err(|rejected| HydrationError::InvalidPrimaryKey {
            iteration,
            column: column.to_string(),
            value: rejected.to_string(),
        })
    }

    fn read_record(&self, row_index: usize, row: &Row, node: &PlanNode) -> HydrationResult<Record> {
        let iteration = node.iteration;
        let mut record = Record::new();

        for column in node.metadata.columns() {
            let value = self.read_value(row_index, row, iteration, &alias(column, iteration))?;
            record.insert(column.clone(), Field::Value(value));
        }

        for relation in node.metadata.lazy_single_relations() {
            // Plans reject lazy single-valued relations without a foreign key.
            let Some(foreign_key) = relation.foreign_key() else {
                continue;
            };
            let value = self.read_value(row_index, row, iteration, &alias(foreign_key, iteration))?;
            record.insert(relation.name().to_string(), Field::Value(value));
        }

        Ok(record)
    }
}
