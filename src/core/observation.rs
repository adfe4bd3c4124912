//! Raw weekly sales observations and the immutable table that holds them.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Read;

/// Identifier of a selling location (store, branch, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

/// Which observations a query covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntitySelector {
    /// Sum every entity's sales per week.
    All,
    /// A single entity's sales.
    Entity(EntityId),
}

impl EntitySelector {
    pub fn entity(id: impl Into<EntityId>) -> Self {
        EntitySelector::Entity(id.into())
    }
}

impl fmt::Display for EntitySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntitySelector::All => f.write_str("all"),
            EntitySelector::Entity(id) => write!(f, "entity {id}"),
        }
    }
}

/// One week of sales for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub entity_id: EntityId,
    /// 1-based week number.
    pub week_index: u32,
    pub sales_amount: f64,
}

impl Observation {
    pub fn new(entity_id: impl Into<EntityId>, week_index: u32, sales_amount: f64) -> Self {
        Self {
            entity_id: entity_id.into(),
            week_index,
            sales_amount,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.week_index == 0 {
            return Err(ForecastError::InvalidObservation(format!(
                "entity {} has week_index 0; weeks are 1-based",
                self.entity_id
            )));
        }
        if !self.sales_amount.is_finite() || self.sales_amount < 0.0 {
            return Err(ForecastError::InvalidObservation(format!(
                "entity {} week {} has sales_amount {}",
                self.entity_id, self.week_index, self.sales_amount
            )));
        }
        Ok(())
    }
}

/// Immutable in-memory table of observations keyed by (entity, week).
///
/// Per-entity rows are kept sorted by week so series construction is a
/// linear scan.
#[derive(Debug, Clone, Default)]
pub struct SalesTable {
    by_entity: BTreeMap<EntityId, Vec<(u32, f64)>>,
    len: usize,
}

impl SalesTable {
    /// Build a table, rejecting duplicate keys and invalid rows.
    pub fn new(observations: Vec<Observation>) -> Result<Self> {
        let mut by_entity: BTreeMap<EntityId, Vec<(u32, f64)>> = BTreeMap::new();
        let len = observations.len();

        for obs in observations {
            obs.validate()?;
            by_entity
                .entry(obs.entity_id)
                .or_default()
                .push((obs.week_index, obs.sales_amount));
        }

        for (entity, rows) in by_entity.iter_mut() {
            rows.sort_by_key(|&(week, _)| week);
            if let Some(w) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
                return Err(ForecastError::DuplicateObservation {
                    entity: entity.clone(),
                    week: w[0].0,
                });
            }
        }

        tracing::debug!(rows = len, entities = by_entity.len(), "sales table loaded");

        Ok(Self { by_entity, len })
    }

    /// Read `entity_id,week_index,sales_amount` rows with a header line.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let observations = rdr
            .deserialize::<Observation>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Self::new(observations)
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Distinct entity identifiers in ascending order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityId> {
        self.by_entity.keys()
    }

    /// Week-sorted `(week_index, sales_amount)` rows for one entity.
    pub fn rows(&self, entity: &EntityId) -> Option<&[(u32, f64)]> {
        self.by_entity.get(entity).map(|v| v.as_slice())
    }

    /// Iterate over every entity's rows.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &[(u32, f64)])> {
        self.by_entity.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// All distinct week indices present in the table.
    pub fn weeks(&self) -> BTreeSet<u32> {
        self.by_entity
            .values()
            .flat_map(|rows| rows.iter().map(|&(w, _)| w))
            .collect()
    }
}
