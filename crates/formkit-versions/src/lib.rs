//! Version history: append-only per-form snapshot log with diff and
//! rollback.
//!
//! Every save records the full schema snapshot plus the structural changes
//! against the previous version. Rollback never rewrites history: restoring
//! version N appends a new version whose content equals N.

mod diff;

pub use diff::{ChangeKind, ChangeTarget, SchemaChange, diff};

use std::collections::{BTreeMap, VecDeque};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use formkit_model::{FormId, FormSchema};

/// How many versions are retained per form before the oldest is dropped.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// One committed version of a form schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: u64,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub comment: String,
    /// Changes relative to the previous record (all `Added` for the first).
    pub changes: Vec<SchemaChange>,
    pub schema: FormSchema,
}

/// Bounded append-only version log, one history per form id.
#[derive(Debug, Clone)]
pub struct VersionManager {
    capacity: usize,
    histories: BTreeMap<FormId, VecDeque<VersionRecord>>,
}

impl VersionManager {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            histories: BTreeMap::new(),
        }
    }

    /// Append a snapshot to the form's history and return the stored record.
    ///
    /// The record's version is the snapshot's own version number; the diff is
    /// taken against the latest stored record, or against an empty schema for
    /// the first save, so a first save reports every field and rule as added.
    pub fn save(&mut self, schema: FormSchema, author: &str, comment: &str) -> VersionRecord {
        let history = self.histories.entry(schema.id.clone()).or_default();
        let baseline = match history.back() {
            Some(previous) => previous.schema.clone(),
            None => FormSchema::new(schema.id.clone(), schema.name.clone()),
        };
        let record = VersionRecord {
            version: schema.version,
            author: author.to_string(),
            timestamp: Utc::now(),
            comment: comment.to_string(),
            changes: diff(&baseline, &schema),
            schema,
        };
        if history.len() >= self.capacity {
            history.pop_front();
        }
        history.push_back(record.clone());
        record
    }

    /// Restore an earlier version by appending a copy of it as the newest
    /// version. History before the rollback point is left untouched.
    pub fn rollback(&mut self, form_id: &FormId, version: u64, author: &str) -> Result<VersionRecord> {
        let (mut restored, latest) = {
            let history = self
                .histories
                .get(form_id)
                .with_context(|| format!("no history for form '{form_id}'"))?;
            let record = history
                .iter()
                .find(|record| record.version == version)
                .with_context(|| format!("form '{form_id}' has no version {version}"))?;
            let latest = history
                .back()
                .map(|record| record.version)
                .unwrap_or(version);
            (record.schema.clone(), latest)
        };
        restored.version = latest + 1;
        Ok(self.save(restored, author, &format!("rollback to version {version}")))
    }

    /// Changes between two stored versions of the same form, oldest first.
    pub fn compare(&self, form_id: &FormId, from: u64, to: u64) -> Result<Vec<SchemaChange>> {
        let from = self
            .record(form_id, from)
            .with_context(|| format!("form '{form_id}' has no version {from}"))?;
        let to = self
            .record(form_id, to)
            .with_context(|| format!("form '{form_id}' has no version {to}"))?;
        Ok(diff(&from.schema, &to.schema))
    }

    pub fn latest(&self, form_id: &FormId) -> Option<&VersionRecord> {
        self.histories.get(form_id).and_then(VecDeque::back)
    }

    pub fn record(&self, form_id: &FormId, version: u64) -> Option<&VersionRecord> {
        self.histories
            .get(form_id)?
            .iter()
            .find(|record| record.version == version)
    }

    /// All stored records for a form, oldest first.
    pub fn history(&self, form_id: &FormId) -> impl Iterator<Item = &VersionRecord> {
        self.histories.get(form_id).into_iter().flatten()
    }
}

impl Default for VersionManager {
    fn default() -> Self {
        Self::new()
    }
}
