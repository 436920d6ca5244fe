//! Memoizing decorator over a query source.
//!
//! Remote queries are slow and rate limited, and one run asks the same
//! `(threshold, day)` pair many times (the consistency check re-reads the
//! value bisection just found). The cache sits behind the same
//! [`QuerySource`] trait as the real source, so the engine cannot tell the
//! difference, and can be saved to disk so repeated runs over an unchanged
//! dataset skip the network entirely.
//!
//! Contents are only valid while the dataset is stable: the engine flushes
//! the cache on every consistency failure. `requery` goes back to the source
//! for answers learned during the run, but keeps trusting entries restored
//! from a snapshot so a replay stays offline.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, SourceError};
use crate::model::{Day, Totals};
use crate::source::QuerySource;

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub threshold: Option<i64>,
    pub day: Option<Day>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub flushes: u64,
}

/// On-disk form of the cache. Entries are sorted by key so two saves of the
/// same contents are byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub schema_version: u32,
    pub label: String,
    pub entries: Vec<CacheEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub threshold: Option<i64>,
    pub day: Option<Day>,
    pub amount_cents: i64,
    pub count: i64,
}

pub struct QueryCache<S> {
    inner: S,
    label: String,
    entries: HashMap<CacheKey, Totals>,
    restored: HashSet<CacheKey>,
    stats: CacheStats,
    progress_period: u64,
}

impl<S: QuerySource> QueryCache<S> {
    /// `label` names the dataset (e.g. the offering slug); snapshots saved
    /// under one label are refused by a cache with another.
    pub fn new(inner: S, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
            entries: HashMap::new(),
            restored: HashSet::new(),
            stats: CacheStats::default(),
            progress_period: 0,
        }
    }

    /// Log a progress line every `period` hits and every `period` misses
    /// (0 disables).
    pub fn set_progress_period(&mut self, period: u64) {
        self.progress_period = period;
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let mut keys: Vec<&CacheKey> = self.entries.keys().collect();
        keys.sort();
        let entries = keys
            .into_iter()
            .map(|key| {
                let totals = self.entries[key];
                CacheEntry {
                    threshold: key.threshold,
                    day: key.day,
                    amount_cents: totals.amount_cents,
                    count: totals.count,
                }
            })
            .collect();
        CacheSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            label: self.label.clone(),
            entries,
        }
    }

    /// Replace the cache contents with `snapshot`. Returns the entry count.
    pub fn restore(&mut self, snapshot: CacheSnapshot) -> Result<usize, ExtractError> {
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(ExtractError::Cache(format!(
                "unsupported snapshot schema version {} (expected {})",
                snapshot.schema_version, SNAPSHOT_SCHEMA_VERSION
            )));
        }
        if snapshot.label != self.label {
            return Err(ExtractError::Cache(format!(
                "snapshot is for '{}', cache is for '{}'",
                snapshot.label, self.label
            )));
        }
        self.entries = snapshot
            .entries
            .into_iter()
            .map(|e| {
                (
                    CacheKey { threshold: e.threshold, day: e.day },
                    Totals::new(e.amount_cents, e.count),
                )
            })
            .collect();
        self.restored = self.entries.keys().copied().collect();
        Ok(self.entries.len())
    }

    pub fn save(&self, path: &Path) -> Result<(), ExtractError> {
        let json = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| ExtractError::Cache(format!("cannot encode snapshot: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| ExtractError::Cache(format!("cannot write {}: {e}", path.display())))?;
        info!("cache [{}]: saved {} entries to {}", self.label, self.len(), path.display());
        Ok(())
    }

    pub fn load(&mut self, path: &Path) -> Result<usize, ExtractError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| ExtractError::Cache(format!("cannot read {}: {e}", path.display())))?;
        let snapshot: CacheSnapshot = serde_json::from_str(&data)
            .map_err(|e| ExtractError::Cache(format!("cannot decode {}: {e}", path.display())))?;
        let n = self.restore(snapshot)?;
        info!("cache [{}]: loaded {n} entries from {}", self.label, path.display());
        Ok(n)
    }

    fn tick(&self, kind: &str, n: u64) {
        if self.progress_period > 0 && n % self.progress_period == 0 {
            debug!("cache [{}]: {n} {kind}", self.label);
        }
    }

    fn fetch(&mut self, key: CacheKey, fresh: bool) -> Result<Totals, SourceError> {
        self.stats.misses += 1;
        self.tick("misses", self.stats.misses);
        let totals = if fresh {
            self.inner.requery(key.threshold, key.day)?
        } else {
            self.inner.query(key.threshold, key.day)?
        };
        self.entries.insert(key, totals);
        Ok(totals)
    }

    fn hit(&mut self, totals: Totals) -> Totals {
        self.stats.hits += 1;
        self.tick("hits", self.stats.hits);
        totals
    }
}

impl<S: QuerySource> QuerySource for QueryCache<S> {
    fn query(&mut self, threshold: Option<i64>, day: Option<Day>) -> Result<Totals, SourceError> {
        let key = CacheKey { threshold, day };
        match self.entries.get(&key) {
            Some(&totals) => Ok(self.hit(totals)),
            None => self.fetch(key, false),
        }
    }

    fn requery(&mut self, threshold: Option<i64>, day: Option<Day>) -> Result<Totals, SourceError> {
        let key = CacheKey { threshold, day };
        match self.entries.get(&key) {
            Some(&totals) if self.restored.contains(&key) => Ok(self.hit(totals)),
            _ => {
                self.restored.remove(&key);
                self.fetch(key, true)
            }
        }
    }

    fn flush(&mut self) {
        self.entries.clear();
        self.restored.clear();
        self.stats.flushes += 1;
        if self.progress_period > 0 {
            debug!("cache [{}]: flushed", self.label);
        }
        self.inner.flush();
    }
}
