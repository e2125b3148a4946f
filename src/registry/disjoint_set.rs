//! Disjoint-set registry with flat membership sets
//!
//! Every known identifier maps either to its representative (an alias entry) or,
//! for representatives only, to the full membership set of its group. Sets are
//! kept flat, so `find_comp` is a single lookup while merging costs a pass over
//! the absorbed group.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::registry::wire;
use crate::types::*;

/// Registry entry for one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Points at the representative of the group
    Alias(Identifier),
    /// Held by representatives: every member of the group, the key included
    Representative(BTreeSet<Identifier>),
}

/// Groups of identifiers known to be the same real-world account
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: BTreeMap<Identifier, Entry>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from canonical identifiers and their known equivalences
    pub fn from_groups<I, D>(groups: I) -> ResolveResult<Self>
    where
        I: IntoIterator<Item = (Identifier, D)>,
        D: IntoIterator<Item = Identifier>,
    {
        let mut registry = Self::new();
        for (repr, duplicates) in groups {
            registry.add_repres(repr.clone())?;
            for duplicate in duplicates {
                if duplicate != repr {
                    registry.add_elem(duplicate, &repr)?;
                }
            }
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &Identifier) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &Identifier) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Iterate over every entry in key order
    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &Entry)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Identifier> {
        self.entries.keys()
    }

    /// Create a new singleton group `{key}`
    pub fn add_repres(&mut self, key: Identifier) -> ResolveResult<()> {
        if self.entries.contains_key(&key) {
            return Err(ResolveError::DuplicateKey(key));
        }
        let members = BTreeSet::from([key.clone()]);
        self.entries.insert(key, Entry::Representative(members));
        Ok(())
    }

    /// Attach `key` as an alias of the representative `repr`
    pub fn add_elem(&mut self, key: Identifier, repr: &Identifier) -> ResolveResult<()> {
        match self.entries.get(&key) {
            Some(Entry::Alias(target)) if target == repr => return Ok(()),
            Some(_) => return Err(ResolveError::DuplicateKey(key)),
            None => {}
        }
        match self.entries.get_mut(repr) {
            Some(Entry::Representative(members)) => {
                members.insert(key.clone());
            }
            _ => return Err(ResolveError::MissingRepresentative(repr.clone())),
        }
        self.entries.insert(key, Entry::Alias(repr.clone()));
        Ok(())
    }

    /// Merge the groups of `k1` and `k2`, creating them as needed.
    ///
    /// Returns the surviving representative; `k1`'s side wins when both exist.
    pub fn union(&mut self, k1: &Identifier, k2: &Identifier) -> ResolveResult<Identifier> {
        let repr1 = self.find_repr(k1).cloned();
        let repr2 = self.find_repr(k2).cloned();

        match (repr1, repr2) {
            (Some(r1), Some(r2)) => {
                if r1 == r2 {
                    return Ok(r1);
                }
                let absorbed = match self.entries.remove(&r2) {
                    Some(Entry::Representative(members)) => members,
                    _ => return Err(ResolveError::NotARepresentative(r2)),
                };
                for member in &absorbed {
                    self.entries
                        .insert(member.clone(), Entry::Alias(r1.clone()));
                }
                if let Some(Entry::Representative(members)) = self.entries.get_mut(&r1) {
                    members.extend(absorbed);
                }
                Ok(r1)
            }
            (None, Some(r2)) => {
                self.add_elem(k1.clone(), &r2)?;
                Ok(r2)
            }
            (Some(r1), None) => {
                self.add_elem(k2.clone(), &r1)?;
                Ok(r1)
            }
            (None, None) => {
                self.add_repres(k1.clone())?;
                if k1 != k2 {
                    self.add_elem(k2.clone(), k1)?;
                }
                Ok(k1.clone())
            }
        }
    }

    /// Representative of `key`'s group
    pub fn find_repr<'a>(&'a self, key: &'a Identifier) -> Option<&'a Identifier> {
        match self.entries.get(key)? {
            Entry::Alias(target) => Some(target),
            Entry::Representative(_) => Some(key),
        }
    }

    /// Full membership set of `key`'s group
    pub fn find_comp(&self, key: &Identifier) -> Option<&BTreeSet<Identifier>> {
        match self.entries.get(key)? {
            Entry::Representative(members) => Some(members),
            Entry::Alias(target) => match self.entries.get(target)? {
                Entry::Representative(members) => Some(members),
                Entry::Alias(_) => None,
            },
        }
    }

    /// True when both keys are known and share a representative
    pub fn same_comp(&self, k1: &Identifier, k2: &Identifier) -> bool {
        match (self.find_repr(k1), self.find_repr(k2)) {
            (Some(r1), Some(r2)) => r1 == r2,
            _ => false,
        }
    }

    /// Make `new_repr` the representative of `old_repr`'s group.
    ///
    /// The membership set is kept as is (plus `new_repr` if it was unknown);
    /// aliases of `old_repr` and `old_repr` itself now point at `new_repr`.
    pub fn update_repr(&mut self, old_repr: &Identifier, new_repr: &Identifier) -> ResolveResult<()> {
        if old_repr == new_repr {
            return Ok(());
        }
        let in_group = match self.entries.get(old_repr) {
            Some(Entry::Representative(members)) => members.contains(new_repr),
            _ => return Err(ResolveError::NotARepresentative(old_repr.clone())),
        };
        if !in_group && self.entries.contains_key(new_repr) {
            return Err(ResolveError::DuplicateKey(new_repr.clone()));
        }

        let mut members = match self.entries.remove(old_repr) {
            Some(Entry::Representative(members)) => members,
            _ => return Err(ResolveError::NotARepresentative(old_repr.clone())),
        };
        members.insert(new_repr.clone());
        for member in &members {
            if member != new_repr {
                self.entries
                    .insert(member.clone(), Entry::Alias(new_repr.clone()));
            }
        }
        self.entries
            .insert(new_repr.clone(), Entry::Representative(members));
        Ok(())
    }

    /// All keys currently holding a membership set
    pub fn representatives(&self) -> Vec<Identifier> {
        self.entries
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::Representative(_)))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Check the alias/set invariants, typically after loading a snapshot
    pub fn validate(&self) -> ResolveResult<()> {
        let mut seen = BTreeSet::new();
        for (key, entry) in &self.entries {
            match entry {
                Entry::Alias(target) => match self.entries.get(target) {
                    Some(Entry::Representative(members)) if members.contains(key) => {}
                    _ => {
                        return Err(ResolveError::Validation(format!(
                            "alias {} points at {} which does not list it as a member",
                            key, target
                        )))
                    }
                },
                Entry::Representative(members) => {
                    if !members.contains(key) {
                        return Err(ResolveError::Validation(format!(
                            "representative {} is missing from its own group",
                            key
                        )));
                    }
                    for member in members {
                        if !seen.insert(member) {
                            return Err(ResolveError::Validation(format!(
                                "{} is a member of more than one group",
                                member
                            )));
                        }
                        if member != key && self.find_repr(member) != Some(key) {
                            return Err(ResolveError::Validation(format!(
                                "member {} of {} is not aliased to it",
                                member, key
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Serialize to the persisted JSON record format
    pub fn to_json(&self) -> ResolveResult<String> {
        wire::encode(self)
    }

    /// Parse the persisted JSON record format and check invariants
    pub fn from_json(content: &str) -> ResolveResult<Self> {
        let registry = wire::decode(content)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Write the snapshot to `path`
    pub fn save_to_json(&self, path: &Path) -> ResolveResult<()> {
        let content = self.to_json()?;
        std::fs::write(path, content)
            .map_err(|e| ResolveError::Storage(format!("{}: {}", path.display(), e)))
    }

    /// Read a snapshot from `path`
    pub fn load_from_json(path: &Path) -> ResolveResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ResolveError::Storage(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub(crate) fn insert_entry(&mut self, key: Identifier, entry: Entry) -> ResolveResult<()> {
        if self.entries.contains_key(&key) {
            return Err(ResolveError::DuplicateKey(key));
        }
        self.entries.insert(key, entry);
        Ok(())
    }
}
