//! Reference entries: ids stored in cells, resolved to data through a map.

use crate::model::sentinel::{Sentinel, NO_VALUE_MAGIC, PENDING_MAGIC};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

/// Default number of generated entries kept by [`GeneratedReferenceEntries`].
pub const DEFAULT_GENERATED_CACHE_CAPACITY: usize = 1024;

/// Id of a reference entry, stored in reference-entry cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceEntryId(u32);

impl ReferenceEntryId {
    /// Creates a new id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Sentinel for ReferenceEntryId {
    const PENDING: Self = Self(PENDING_MAGIC);
    const NO_VALUE: Self = Self(NO_VALUE_MAGIC);
}

/// Number of different reference entries seen for a cell.
///
/// Measured cells always report one (or a sentinel), calculated cells report
/// the distinct count of the aggregated interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceEntryIdsCount(u32);

impl ReferenceEntryIdsCount {
    /// Exactly one entry.
    pub const ONE: Self = Self(1);

    /// Creates a new count.
    pub const fn new(count: u32) -> Self {
        Self(count)
    }

    /// Returns the raw count.
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Sentinel for ReferenceEntryIdsCount {
    const PENDING: Self = Self(PENDING_MAGIC);
    const NO_VALUE: Self = Self(NO_VALUE_MAGIC);
}

/// Descriptive data of a reference entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntryData {
    /// The id.
    pub id: ReferenceEntryId,
    /// Human readable label.
    pub label: String,
    /// Optional opaque payload.
    pub payload: Option<String>,
}

impl ReferenceEntryData {
    /// Creates data without payload.
    pub fn new(id: ReferenceEntryId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            payload: None,
        }
    }

    /// Attaches a payload.
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }
}

/// Resolves reference-entry ids to their data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ReferenceEntriesDataMap {
    /// Resolves nothing.
    #[default]
    Empty,
    /// Synthesizes data from the id.
    Generated(GeneratedReferenceEntries),
    /// Backed by an explicit map.
    Default(BTreeMap<ReferenceEntryId, ReferenceEntryData>),
}

impl ReferenceEntriesDataMap {
    /// Creates a generated map with the given label prefix.
    pub fn generated(prefix: impl Into<String>) -> Self {
        ReferenceEntriesDataMap::Generated(GeneratedReferenceEntries::new(prefix))
    }

    /// Returns a builder for an explicit map.
    pub fn builder() -> ReferenceEntriesDataMapBuilder {
        ReferenceEntriesDataMapBuilder::default()
    }

    /// Resolves the id. Sentinel ids never resolve.
    pub fn get(&self, id: ReferenceEntryId) -> Option<ReferenceEntryData> {
        if id.is_pending() || id.is_no_value() {
            return None;
        }
        match self {
            ReferenceEntriesDataMap::Empty => None,
            ReferenceEntriesDataMap::Generated(generated) => Some(generated.get(id)),
            ReferenceEntriesDataMap::Default(entries) => entries.get(&id).cloned(),
        }
    }

    /// Number of explicitly known entries. Generated maps report their cache size.
    pub fn len(&self) -> usize {
        match self {
            ReferenceEntriesDataMap::Empty => 0,
            ReferenceEntriesDataMap::Generated(generated) => generated.cached_len(),
            ReferenceEntriesDataMap::Default(entries) => entries.len(),
        }
    }

    /// Returns true if no entry is explicitly known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Combines two maps for a chunk merge. Entries of `other` win.
    pub fn merge(&self, other: &ReferenceEntriesDataMap) -> ReferenceEntriesDataMap {
        match (self, other) {
            (_, ReferenceEntriesDataMap::Empty) => self.clone(),
            (ReferenceEntriesDataMap::Empty, _) => other.clone(),
            (ReferenceEntriesDataMap::Default(mine), ReferenceEntriesDataMap::Default(theirs)) => {
                let mut entries = mine.clone();
                entries.extend(theirs.iter().map(|(id, data)| (*id, data.clone())));
                ReferenceEntriesDataMap::Default(entries)
            }
            _ => other.clone(),
        }
    }
}

/// Builder for [`ReferenceEntriesDataMap::Default`].
#[derive(Debug, Default)]
pub struct ReferenceEntriesDataMapBuilder {
    entries: BTreeMap<ReferenceEntryId, ReferenceEntryData>,
}

impl ReferenceEntriesDataMapBuilder {
    /// Adds (or replaces) an entry.
    pub fn add(mut self, data: ReferenceEntryData) -> Self {
        self.entries.insert(data.id, data);
        self
    }

    /// Finishes the map.
    pub fn build(self) -> ReferenceEntriesDataMap {
        ReferenceEntriesDataMap::Default(self.entries)
    }
}

/// Synthesizes `"{prefix}{id}"` labels and keeps the most recent ones.
#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratedReferenceEntries {
    prefix: String,
    capacity: usize,
    #[serde(skip)]
    cache: Mutex<GeneratedCache>,
}

#[derive(Debug, Default)]
struct GeneratedCache {
    entries: HashMap<ReferenceEntryId, ReferenceEntryData>,
    order: VecDeque<ReferenceEntryId>,
}

impl GeneratedReferenceEntries {
    /// Creates a generator with [`DEFAULT_GENERATED_CACHE_CAPACITY`].
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_capacity(prefix, DEFAULT_GENERATED_CACHE_CAPACITY)
    }

    /// Creates a generator keeping at most `capacity` entries.
    pub fn with_capacity(prefix: impl Into<String>, capacity: usize) -> Self {
        Self {
            prefix: prefix.into(),
            capacity: capacity.max(1),
            cache: Mutex::new(GeneratedCache::default()),
        }
    }

    /// Returns the label prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the data for the id, synthesizing it on a miss.
    pub fn get(&self, id: ReferenceEntryId) -> ReferenceEntryData {
        let mut cache = self.cache.lock().unwrap_or_else(|err| err.into_inner());
        if let Some(data) = cache.entries.get(&id) {
            return data.clone();
        }

        let data = ReferenceEntryData::new(id, format!("{}{}", self.prefix, id.value()));
        if cache.entries.len() >= self.capacity {
            if let Some(evicted) = cache.order.pop_front() {
                cache.entries.remove(&evicted);
            }
        }
        cache.entries.insert(id, data.clone());
        cache.order.push_back(id);
        data
    }

    fn cached_len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .entries
            .len()
    }
}

impl Clone for GeneratedReferenceEntries {
    fn clone(&self) -> Self {
        Self::with_capacity(self.prefix.clone(), self.capacity)
    }
}

impl PartialEq for GeneratedReferenceEntries {
    fn eq(&self, other: &Self) -> bool {
        self.prefix == other.prefix && self.capacity == other.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_resolves_nothing() {
        let map = ReferenceEntriesDataMap::Empty;
        assert_eq!(map.get(ReferenceEntryId::new(1)), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_generated_bounded_cache() {
        let generated = GeneratedReferenceEntries::with_capacity("Entry ", 2);
        assert_eq!(generated.get(ReferenceEntryId::new(7)).label, "Entry 7");
        generated.get(ReferenceEntryId::new(8));
        generated.get(ReferenceEntryId::new(9));
        assert_eq!(generated.cached_len(), 2);
        // evicted entries are synthesized again
        assert_eq!(generated.get(ReferenceEntryId::new(7)).label, "Entry 7");
    }

    #[test]
    fn test_sentinel_ids_do_not_resolve() {
        let map = ReferenceEntriesDataMap::generated("x");
        assert_eq!(map.get(ReferenceEntryId::PENDING), None);
        assert_eq!(map.get(ReferenceEntryId::NO_VALUE), None);
    }

    #[test]
    fn test_merge_default_maps() {
        let a = ReferenceEntriesDataMap::builder()
            .add(ReferenceEntryData::new(ReferenceEntryId::new(1), "a1"))
            .add(ReferenceEntryData::new(ReferenceEntryId::new(2), "a2"))
            .build();
        let b = ReferenceEntriesDataMap::builder()
            .add(ReferenceEntryData::new(ReferenceEntryId::new(2), "b2").with_payload("p"))
            .build();

        let merged = a.merge(&b);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get(ReferenceEntryId::new(1)).unwrap().label, "a1");
        let second = merged.get(ReferenceEntryId::new(2)).unwrap();
        assert_eq!(second.label, "b2");
        assert_eq!(second.payload.as_deref(), Some("p"));

        assert_eq!(ReferenceEntriesDataMap::Empty.merge(&a), a);
        assert_eq!(a.merge(&ReferenceEntriesDataMap::Empty), a);
    }
}
