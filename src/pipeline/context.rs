//! Run context threaded through a pipeline.
//!
//! Each step consumes a context value and returns a new one; nothing is
//! mutated in place, so composing or retrying steps cannot alias state.

use std::collections::HashMap;

use serde::Deserialize;

use crate::errors::{Error, Result};
use crate::validity::ValidityPeriod;

/// Identifies one data-source slot of one contributor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct SlotKey {
    pub contributor: String,
    pub data_source: String,
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.contributor, self.data_source)
    }
}

/// Immutable-per-step pipeline state: which blob currently backs each
/// data-source slot, plus the last computed validity period.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    slots: HashMap<SlotKey, String>,
    pub validity: Option<ValidityPeriod>,
}

impl RunContext {
    pub fn new() -> RunContext {
        RunContext::default()
    }

    /// Returns a new context with `slot` bound to `blob_id`.
    pub fn with_slot(mut self, slot: SlotKey, blob_id: impl Into<String>) -> RunContext {
        self.slots.insert(slot, blob_id.into());
        self
    }

    /// Returns a new context carrying `period` as the latest validity result.
    pub fn with_validity(mut self, period: ValidityPeriod) -> RunContext {
        self.validity = Some(period);
        self
    }

    /// Iterates over all `(slot, blob_id)` bindings.
    pub fn slots(&self) -> impl Iterator<Item = (&SlotKey, &str)> {
        self.slots.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Resolves the blob id currently bound to `slot`. A missing slot is a
    /// configuration error, not a data error.
    pub fn blob_id(&self, slot: &SlotKey) -> Result<&str> {
        self.slots
            .get(slot)
            .map(String::as_str)
            .ok_or_else(|| Error::Parameter(format!("no data-source slot '{}'", slot)))
    }
}
