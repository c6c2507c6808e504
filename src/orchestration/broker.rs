//! Context Broker
//!
//! Run-scoped key/value store for state shared between components. Keys are
//! namespaced: `run/...` is written by the orchestrator, `<perspective>/...`
//! only by that perspective's task. Each key has exactly one owner; a write by
//! a different owner is a [`DocweaveError::ContextConflict`].
//!
//! Lock-free reads and per-key exclusive writes via `DashMap`.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::types::{ContextSnapshot, DocweaveError, Perspective, Result};

pub const RUN_NAMESPACE: &str = "run";

/// Well-known run keys
pub mod keys {
    pub const CHANGE: &str = "run/change";
    pub const SNAPSHOT: &str = "run/snapshot";
    pub const DECISIONS: &str = "run/decisions";
}

/// Who may write a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Orchestrator,
    Perspective(Perspective),
}

impl Owner {
    fn namespace(&self) -> &'static str {
        match self {
            Self::Orchestrator => RUN_NAMESPACE,
            Self::Perspective(p) => p.as_str(),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orchestrator => write!(f, "orchestrator"),
            Self::Perspective(p) => write!(f, "{}", p),
        }
    }
}

#[derive(Debug, Clone)]
struct BrokerEntry {
    owner: Owner,
    value: Value,
}

/// Shared state for one orchestration run. Dropped with the run.
#[derive(Debug, Default)]
pub struct ContextBroker {
    entries: DashMap<String, BrokerEntry>,
}

pub type SharedBroker = Arc<ContextBroker>;

impl ContextBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full key for `name` inside the owner's namespace
    pub fn key(owner: Owner, name: &str) -> String {
        format!("{}/{}", owner.namespace(), name)
    }

    /// Write `value` under `key`. The first writer becomes the key's owner;
    /// the owner may overwrite, anyone else conflicts.
    pub fn put(&self, owner: Owner, key: &str, value: Value) -> Result<()> {
        let namespace = key.split('/').next().unwrap_or_default();
        if !key.contains('/') || namespace != owner.namespace() {
            return Err(DocweaveError::ContextConflict {
                key: key.to_string(),
                owner: format!("namespace '{}'", namespace),
                writer: owner.to_string(),
            });
        }

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get().owner;
                if existing != owner {
                    return Err(DocweaveError::ContextConflict {
                        key: key.to_string(),
                        owner: existing.to_string(),
                        writer: owner.to_string(),
                    });
                }
                occupied.get_mut().value = value;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(BrokerEntry { owner, value });
            }
        }
        Ok(())
    }

    pub fn put_typed<T: Serialize>(&self, owner: Owner, key: &str, value: &T) -> Result<()> {
        self.put(owner, key, serde_json::to_value(value)?)
    }

    pub fn get(&self, key: &str) -> Result<Value> {
        self.entries
            .get(key)
            .map(|e| e.value.clone())
            .ok_or_else(|| DocweaveError::ContextNotFound(key.to_string()))
    }

    pub fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        Ok(serde_json::from_value(self.get(key)?)?)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Point-in-time copy; later writes are not visible through it
    pub fn snapshot(&self) -> ContextSnapshot {
        let entries: BTreeMap<String, Value> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().value.clone()))
            .collect();
        ContextSnapshot::new(entries)
    }
}
