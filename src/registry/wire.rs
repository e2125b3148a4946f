//! JSON snapshot format of the registry
//!
//! The snapshot is an array of records `{"key": .., "val": .., "type": "key" | "set"}`.
//! Identifiers are written as `[number, name]` pairs; older snapshots may hold a bare
//! string, which is read as a number-only identifier.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::registry::{Entry, Registry};
use crate::types::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WireIdentifier {
    Pair(Option<String>, Option<String>),
    Bare(String),
}

impl From<&Identifier> for WireIdentifier {
    fn from(identifier: &Identifier) -> Self {
        WireIdentifier::Pair(identifier.number.clone(), identifier.name.clone())
    }
}

impl From<WireIdentifier> for Identifier {
    fn from(wire: WireIdentifier) -> Self {
        match wire {
            WireIdentifier::Pair(number, name) => Identifier::new(number, name),
            WireIdentifier::Bare(number) => Identifier::new(Some(number), None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RecordKind {
    Key,
    Set,
}

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    key: WireIdentifier,
    val: Value,
    #[serde(rename = "type")]
    kind: RecordKind,
}

fn to_value<T: Serialize>(value: &T) -> ResolveResult<Value> {
    serde_json::to_value(value).map_err(|e| ResolveError::Serialization(e.to_string()))
}

pub(crate) fn encode(registry: &Registry) -> ResolveResult<String> {
    let mut records = Vec::with_capacity(registry.len());
    for (key, entry) in registry.iter() {
        let (val, kind) = match entry {
            Entry::Alias(target) => (to_value(&WireIdentifier::from(target))?, RecordKind::Key),
            Entry::Representative(members) => {
                let members: Vec<WireIdentifier> = members.iter().map(WireIdentifier::from).collect();
                (to_value(&members)?, RecordKind::Set)
            }
        };
        records.push(Record {
            key: WireIdentifier::from(key),
            val,
            kind,
        });
    }
    serde_json::to_string(&records).map_err(|e| ResolveError::Serialization(e.to_string()))
}

pub(crate) fn decode(content: &str) -> ResolveResult<Registry> {
    let records: Vec<Record> =
        serde_json::from_str(content).map_err(|e| ResolveError::Serialization(e.to_string()))?;

    let mut registry = Registry::new();
    for record in records {
        let key = Identifier::from(record.key);
        let entry = match record.kind {
            RecordKind::Key => {
                let target: WireIdentifier = serde_json::from_value(record.val).map_err(|e| {
                    ResolveError::Serialization(format!("alias record {}: {}", key, e))
                })?;
                Entry::Alias(target.into())
            }
            RecordKind::Set => {
                let members: Vec<WireIdentifier> =
                    serde_json::from_value(record.val).map_err(|e| {
                        ResolveError::Serialization(format!("set record {}: {}", key, e))
                    })?;
                Entry::Representative(members.into_iter().map(Identifier::from).collect::<BTreeSet<_>>())
            }
        };
        registry.insert_entry(key, entry)?;
    }
    Ok(registry)
}
