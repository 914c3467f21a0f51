//! Map-backed Partition
//!
//! Entries live in an ordered map keyed by the reversed normalized DN, so
//! the entries of a subtree occupy one contiguous key range and one-level
//! and subtree scans are range walks rather than full sweeps.
//!
//! The partition applies each operation atomically under a single writer
//! lock, which trivially satisfies the boundary contract: a logical write
//! is observed atomically, and mid-chain reads see a consistent snapshot.

use crate::filter;
use arbor_core::{
    AttributeType, DirectoryError, DirectoryResult, Dn, Entry, ModDnAva, ModDnAvaKind,
    Modification, ModificationOp, Rdn, SchemaView,
};
use arbor_pipeline::{
    AttributeSelection, EntryCursor, Operation, OperationContext, Partition, SearchScope,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Separator between reversed RDN components in storage keys. Control
/// characters cannot appear in normalized RDNs, so prefixes are
/// unambiguous.
const KEY_SEP: char = '\u{1}';

fn storage_key(dn: &Dn) -> String {
    let parts: Vec<String> = dn.rdns().iter().rev().map(Rdn::normalized).collect();
    parts.join(&KEY_SEP.to_string())
}

fn subtree_prefix(dn: &Dn) -> String {
    let mut prefix = storage_key(dn);
    prefix.push(KEY_SEP);
    prefix
}

/// In-memory implementation of the partition boundary.
///
/// Not a production store: it exists so the pipeline contract can be
/// exercised end-to-end by tests and embedders.
pub struct MemoryPartition {
    schema: Arc<dyn SchemaView>,
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryPartition {
    /// An empty partition resolving attribute types against `schema`.
    #[must_use]
    pub fn new(schema: Arc<dyn SchemaView>) -> Self {
        Self {
            schema,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert entries directly, bypassing parent checks. Intended for
    /// seeding fixtures and bootstrap data.
    pub async fn seed(&self, entries: Vec<Entry>) {
        let mut map = self.entries.write().await;
        for entry in entries {
            map.insert(storage_key(entry.dn()), entry);
        }
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the partition holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn require_target(ctx: &OperationContext) -> DirectoryResult<Dn> {
        ctx.target_dn()
            .cloned()
            .ok_or_else(|| DirectoryError::InvalidRequest {
                message: "operation has no target DN".to_string(),
            })
    }

    fn no_such_entry(dn: &Dn) -> DirectoryError {
        DirectoryError::NoSuchEntry { dn: dn.to_string() }
    }

    fn has_children(map: &BTreeMap<String, Entry>, dn: &Dn) -> bool {
        let prefix = subtree_prefix(dn);
        map.range(prefix.clone()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(&prefix))
    }

    fn subtree_keys(map: &BTreeMap<String, Entry>, dn: &Dn) -> Vec<String> {
        let own = storage_key(dn);
        let prefix = subtree_prefix(dn);
        let mut keys: Vec<String> = map
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.clone())
            .collect();
        if map.contains_key(&own) {
            keys.push(own);
        }
        keys
    }

    /// Re-root every entry at or below `old_base` under `new_base`.
    fn rekey_subtree(map: &mut BTreeMap<String, Entry>, old_base: &Dn, new_base: &Dn) {
        for key in Self::subtree_keys(map, old_base) {
            let Some(mut entry) = map.remove(&key) else {
                continue;
            };
            let new_dn = match entry.dn().suffix_from(old_base) {
                Some(suffix) => {
                    let mut dn = new_base.clone();
                    for rdn in suffix.into_iter().rev() {
                        dn = dn.child(rdn);
                    }
                    dn
                }
                None => new_base.clone(),
            };
            entry.set_dn(new_dn);
            map.insert(storage_key(entry.dn()), entry);
        }
    }

    fn apply_modifications(
        entry: &mut Entry,
        mods: &[Modification],
    ) -> DirectoryResult<()> {
        for modification in mods {
            let id = modification.attribute.id();
            match modification.op {
                ModificationOp::Add => {
                    for value in modification.attribute.values() {
                        entry.add_value(id, value.clone());
                    }
                }
                ModificationOp::Remove => {
                    let Some(existing) = entry.get(id) else {
                        return Err(DirectoryError::InvalidAttribute {
                            id: id.to_string(),
                            message: "cannot remove values from an absent attribute".to_string(),
                        });
                    };
                    if modification.attribute.is_empty() {
                        entry.remove(id);
                    } else {
                        let mut updated = existing.clone();
                        for value in modification.attribute.values() {
                            updated.remove(value);
                        }
                        if updated.is_empty() {
                            entry.remove(id);
                        } else {
                            entry.put(updated);
                        }
                    }
                }
                ModificationOp::Replace => {
                    if modification.attribute.is_empty() {
                        entry.remove(id);
                    } else {
                        entry.put(modification.attribute.clone());
                    }
                }
            }
        }
        Ok(())
    }

    /// Apply the rename reconciliation records to the entry's attributes.
    fn apply_rdn_avas(entry: &mut Entry, payload_avas: &[ModDnAva]) {
        for record in payload_avas {
            match record.kind {
                ModDnAvaKind::Added | ModDnAvaKind::UpdatedNew => {
                    entry.add_value(record.ava.attr(), record.ava.value());
                }
                ModDnAvaKind::Deleted | ModDnAvaKind::UpdatedOld => {
                    if let Some(attr) = entry.get(record.ava.attr()) {
                        let mut updated = attr.clone();
                        updated.remove(&record.ava.value().into());
                        if updated.is_empty() {
                            entry.remove(record.ava.attr());
                        } else {
                            entry.put(updated);
                        }
                    }
                }
            }
        }
    }

    fn select_attributes(&self, entry: &Entry, selection: &AttributeSelection) -> Entry {
        let mut reduced = Entry::new(entry.dn().clone());
        for attribute in entry.attributes() {
            let attribute_type = self
                .schema
                .resolve(attribute.id())
                .unwrap_or_else(|| AttributeType::user(&[attribute.id()], ""));
            if selection.includes(&attribute_type) {
                reduced.put(attribute.clone());
            }
        }
        reduced
    }
}

#[async_trait]
impl Partition for MemoryPartition {
    async fn add(&self, ctx: &mut OperationContext) -> DirectoryResult<()> {
        let Operation::Add(payload) = ctx.operation() else {
            return Err(DirectoryError::InvalidRequest {
                message: "not an add context".to_string(),
            });
        };
        let entry = payload.entry.clone();
        let dn = entry.dn().clone();

        let mut map = self.entries.write().await;
        if map.contains_key(&storage_key(&dn)) {
            return Err(DirectoryError::EntryAlreadyExists { dn: dn.to_string() });
        }
        if let Some(parent) = dn.parent().filter(|p| !p.is_root()) {
            if !map.contains_key(&storage_key(&parent)) {
                return Err(Self::no_such_entry(&parent));
            }
        }
        debug!(dn = %dn, "adding entry");
        map.insert(storage_key(&dn), entry);
        Ok(())
    }

    async fn delete(&self, ctx: &mut OperationContext) -> DirectoryResult<()> {
        let dn = Self::require_target(ctx)?;
        let leaf_only = match ctx.operation() {
            Operation::Delete(payload) => payload.leaf_only,
            _ => true,
        };

        let mut map = self.entries.write().await;
        let key = storage_key(&dn);
        let Some(existing) = map.get(&key).cloned() else {
            return Err(Self::no_such_entry(&dn));
        };
        if Self::has_children(&map, &dn) {
            if leaf_only {
                return Err(DirectoryError::NotAllowedOnNonLeaf { dn: dn.to_string() });
            }
            for child_key in Self::subtree_keys(&map, &dn) {
                map.remove(&child_key);
            }
        }
        map.remove(&key);
        ctx.set_original_entry(existing);
        debug!(dn = %dn, "deleted entry");
        Ok(())
    }

    async fn modify(&self, ctx: &mut OperationContext) -> DirectoryResult<()> {
        let dn = Self::require_target(ctx)?;
        let mods = match ctx.operation() {
            Operation::Modify(payload) => payload.mods.clone(),
            _ => {
                return Err(DirectoryError::InvalidRequest {
                    message: "not a modify context".to_string(),
                })
            }
        };

        let mut map = self.entries.write().await;
        let key = storage_key(&dn);
        let Some(entry) = map.get(&key) else {
            return Err(Self::no_such_entry(&dn));
        };
        let original = entry.clone();
        let mut updated = entry.clone();
        Self::apply_modifications(&mut updated, &mods)?;
        map.insert(key, updated);
        ctx.set_original_entry(original);
        Ok(())
    }

    async fn rename(&self, ctx: &mut OperationContext) -> DirectoryResult<()> {
        let dn = Self::require_target(ctx)?;
        let Operation::Rename(payload) = ctx.operation().clone() else {
            return Err(DirectoryError::InvalidRequest {
                message: "not a rename context".to_string(),
            });
        };

        let new_dn = dn
            .parent()
            .ok_or_else(|| DirectoryError::InvalidRequest {
                message: "cannot rename the root DSE".to_string(),
            })?
            .child(payload.new_rdn.clone());

        let mut map = self.entries.write().await;
        let key = storage_key(&dn);
        let Some(mut entry) = map.get(&key).cloned() else {
            return Err(Self::no_such_entry(&dn));
        };
        if map.contains_key(&storage_key(&new_dn)) {
            return Err(DirectoryError::EntryAlreadyExists {
                dn: new_dn.to_string(),
            });
        }

        ctx.set_original_entry(entry.clone());
        Self::apply_rdn_avas(&mut entry, &payload.mod_avas);
        map.insert(key, entry);
        Self::rekey_subtree(&mut map, &dn, &new_dn);
        debug!(from = %dn, to = %new_dn, "renamed entry");
        Ok(())
    }

    async fn move_entry(&self, ctx: &mut OperationContext) -> DirectoryResult<()> {
        let dn = Self::require_target(ctx)?;
        let Operation::Move(payload) = ctx.operation() else {
            return Err(DirectoryError::InvalidRequest {
                message: "not a move context".to_string(),
            });
        };
        let new_superior = payload.new_superior.clone();
        let rdn = dn.rdn().cloned().ok_or_else(|| DirectoryError::InvalidRequest {
            message: "cannot move the root DSE".to_string(),
        })?;
        let new_dn = new_superior.child(rdn);

        let mut map = self.entries.write().await;
        if !map.contains_key(&storage_key(&dn)) {
            return Err(Self::no_such_entry(&dn));
        }
        if !map.contains_key(&storage_key(&new_superior)) {
            return Err(Self::no_such_entry(&new_superior));
        }
        if map.contains_key(&storage_key(&new_dn)) {
            return Err(DirectoryError::EntryAlreadyExists {
                dn: new_dn.to_string(),
            });
        }
        Self::rekey_subtree(&mut map, &dn, &new_dn);
        debug!(from = %dn, to = %new_dn, "moved entry");
        Ok(())
    }

    async fn move_and_rename(&self, ctx: &mut OperationContext) -> DirectoryResult<()> {
        let dn = Self::require_target(ctx)?;
        let Operation::MoveAndRename(payload) = ctx.operation().clone() else {
            return Err(DirectoryError::InvalidRequest {
                message: "not a move-and-rename context".to_string(),
            });
        };
        let new_dn = payload.new_superior.child(payload.new_rdn.clone());

        let mut map = self.entries.write().await;
        let key = storage_key(&dn);
        let Some(mut entry) = map.get(&key).cloned() else {
            return Err(Self::no_such_entry(&dn));
        };
        if !map.contains_key(&storage_key(&payload.new_superior)) {
            return Err(Self::no_such_entry(&payload.new_superior));
        }
        if map.contains_key(&storage_key(&new_dn)) {
            return Err(DirectoryError::EntryAlreadyExists {
                dn: new_dn.to_string(),
            });
        }

        ctx.set_original_entry(entry.clone());
        Self::apply_rdn_avas(&mut entry, &payload.mod_avas);
        map.insert(key, entry);
        Self::rekey_subtree(&mut map, &dn, &new_dn);
        debug!(from = %dn, to = %new_dn, "moved and renamed entry");
        Ok(())
    }

    async fn compare(&self, ctx: &mut OperationContext) -> DirectoryResult<bool> {
        let dn = Self::require_target(ctx)?;
        let Operation::Compare(payload) = ctx.operation() else {
            return Err(DirectoryError::InvalidRequest {
                message: "not a compare context".to_string(),
            });
        };

        let map = self.entries.read().await;
        let entry = map
            .get(&storage_key(&dn))
            .ok_or_else(|| Self::no_such_entry(&dn))?;
        Ok(entry
            .get(&payload.attribute)
            .is_some_and(|a| a.contains(&payload.value)))
    }

    async fn lookup(&self, ctx: &mut OperationContext) -> DirectoryResult<Entry> {
        let dn = Self::require_target(ctx)?;
        let map = self.entries.read().await;
        let entry = map
            .get(&storage_key(&dn))
            .ok_or_else(|| Self::no_such_entry(&dn))?;

        let result = match ctx.operation() {
            Operation::Lookup(payload) => self.select_attributes(entry, &payload.selection),
            _ => entry.clone(),
        };
        Ok(result)
    }

    async fn has_entry(&self, ctx: &mut OperationContext) -> DirectoryResult<bool> {
        let dn = Self::require_target(ctx)?;
        Ok(self.entries.read().await.contains_key(&storage_key(&dn)))
    }

    async fn list(&self, ctx: &mut OperationContext) -> DirectoryResult<EntryCursor> {
        let dn = Self::require_target(ctx)?;
        let map = self.entries.read().await;
        if !dn.is_root() && !map.contains_key(&storage_key(&dn)) {
            return Err(Self::no_such_entry(&dn));
        }
        let children = map
            .values()
            .filter(|e| e.dn().parent().is_some_and(|p| p.normalized() == dn.normalized()))
            .cloned()
            .collect();
        Ok(EntryCursor::new(children))
    }

    async fn search(&self, ctx: &mut OperationContext) -> DirectoryResult<EntryCursor> {
        let dn = Self::require_target(ctx)?;
        let Operation::Search(payload) = ctx.operation() else {
            return Err(DirectoryError::InvalidRequest {
                message: "not a search context".to_string(),
            });
        };

        let map = self.entries.read().await;
        if !dn.is_root() && !map.contains_key(&storage_key(&dn)) {
            return Err(Self::no_such_entry(&dn));
        }

        let in_scope = |entry: &Entry| -> bool {
            match payload.scope {
                SearchScope::Object => entry.dn().normalized() == dn.normalized(),
                SearchScope::OneLevel => entry
                    .dn()
                    .parent()
                    .is_some_and(|p| p.normalized() == dn.normalized()),
                SearchScope::Subtree => {
                    entry.dn().normalized() == dn.normalized()
                        || entry.dn().is_descendant_of(&dn)
                }
            }
        };

        let mut found: Vec<Entry> = map
            .values()
            .filter(|e| in_scope(e))
            .filter(|e| filter::matches(&payload.filter, e))
            .map(|e| self.select_attributes(e, &payload.selection))
            .collect();

        if let Some(limit) = payload.size_limit {
            found.truncate(limit as usize);
        }
        debug!(base = %dn, results = found.len(), "search complete");
        Ok(EntryCursor::new(found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_orders_subtrees_contiguously() {
        let base: Dn = "ou=people,dc=example".parse().unwrap();
        let child: Dn = "cn=a,ou=people,dc=example".parse().unwrap();
        let sibling: Dn = "ou=groups,dc=example".parse().unwrap();

        assert!(storage_key(&child).starts_with(&subtree_prefix(&base)));
        assert!(!storage_key(&sibling).starts_with(&subtree_prefix(&base)));
    }

    #[test]
    fn test_subtree_prefix_does_not_match_similar_names() {
        // "ou=peopleX" must not fall inside the "ou=people" subtree
        let base: Dn = "ou=people,dc=example".parse().unwrap();
        let similar: Dn = "cn=a,ou=peoplex,dc=example".parse().unwrap();
        assert!(!storage_key(&similar).starts_with(&subtree_prefix(&base)));
    }
}
