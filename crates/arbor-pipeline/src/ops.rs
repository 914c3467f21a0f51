//! Operation Variants
//!
//! The flat tagged union of directory operations and their payloads. The
//! shared per-request state lives in
//! [`OperationContext`](crate::context::OperationContext); each variant here
//! carries only what is specific to its operation kind.
//!
//! Construction validation happens in the payload constructors: a malformed
//! request (move without a new superior, rename to an empty RDN) fails
//! before any pipeline stage runs.

use arbor_core::{
    Ava, AttributeValue, DirectoryError, DirectoryResult, Dn, Entry, ModDnAva, ModDnAvaKind,
    Modification, Rdn,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The kind of a directory operation, used to key interceptor chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Add,
    Delete,
    Modify,
    Rename,
    Move,
    MoveAndRename,
    Compare,
    Bind,
    Lookup,
    List,
    Search,
    GetRootDse,
    EntryExists,
}

impl OperationKind {
    /// All operation kinds.
    #[must_use]
    pub fn all() -> &'static [OperationKind] {
        &[
            OperationKind::Add,
            OperationKind::Delete,
            OperationKind::Modify,
            OperationKind::Rename,
            OperationKind::Move,
            OperationKind::MoveAndRename,
            OperationKind::Compare,
            OperationKind::Bind,
            OperationKind::Lookup,
            OperationKind::List,
            OperationKind::Search,
            OperationKind::GetRootDse,
            OperationKind::EntryExists,
        ]
    }

    /// The string form used in configuration and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Add => "add",
            OperationKind::Delete => "delete",
            OperationKind::Modify => "modify",
            OperationKind::Rename => "rename",
            OperationKind::Move => "move",
            OperationKind::MoveAndRename => "move_and_rename",
            OperationKind::Compare => "compare",
            OperationKind::Bind => "bind",
            OperationKind::Lookup => "lookup",
            OperationKind::List => "list",
            OperationKind::Search => "search",
            OperationKind::GetRootDse => "get_root_dse",
            OperationKind::EntryExists => "entry_exists",
        }
    }

    /// Whether this kind mutates directory data (changelog-relevant).
    #[must_use]
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            OperationKind::Add
                | OperationKind::Delete
                | OperationKind::Modify
                | OperationKind::Rename
                | OperationKind::Move
                | OperationKind::MoveAndRename
        )
    }

    /// Whether contexts of this kind carry a referral policy. Binding
    /// never participates in referral chasing.
    #[must_use]
    pub fn supports_referral_policy(&self) -> bool {
        !matches!(self, OperationKind::Bind)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// The target entry only.
    Object,
    /// Immediate children of the target.
    OneLevel,
    /// The target and everything below it.
    Subtree,
}

/// Alias dereferencing mode for search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasDerefMode {
    /// Never dereference aliases.
    #[default]
    Never,
    /// Dereference while searching below the base.
    Searching,
    /// Dereference while locating the base.
    Finding,
    /// Dereference always.
    Always,
}

/// Bind mechanism. SASL mechanics are out of scope; external binds carry
/// their evidence in the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindMechanism {
    Simple,
    External,
}

/// A search filter expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterNode {
    /// Attribute equals value.
    Equality { attribute: String, value: String },

    /// Attribute is present with any value.
    Present { attribute: String },

    /// Substring match.
    Substring {
        attribute: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        any: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none", rename = "final")]
        final_: Option<String>,
    },

    /// Attribute ordered greater-or-equal to value.
    GreaterOrEqual { attribute: String, value: String },

    /// Attribute ordered less-or-equal to value.
    LessOrEqual { attribute: String, value: String },

    /// All sub-filters match.
    And { filters: Vec<FilterNode> },

    /// Any sub-filter matches.
    Or { filters: Vec<FilterNode> },

    /// The sub-filter does not match.
    Not { filter: Box<FilterNode> },
}

impl FilterNode {
    /// Equality filter.
    #[must_use]
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        FilterNode::Equality {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Presence filter.
    #[must_use]
    pub fn present(attribute: impl Into<String>) -> Self {
        FilterNode::Present {
            attribute: attribute.into(),
        }
    }

    /// Conjunction.
    #[must_use]
    pub fn and(filters: Vec<FilterNode>) -> Self {
        FilterNode::And { filters }
    }

    /// Disjunction.
    #[must_use]
    pub fn or(filters: Vec<FilterNode>) -> Self {
        FilterNode::Or { filters }
    }

    /// Negation.
    #[must_use]
    pub fn negate(filter: FilterNode) -> Self {
        FilterNode::Not {
            filter: Box::new(filter),
        }
    }
}

/// Payload of an add operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPayload {
    /// The entry to create; its DN is the operation target.
    pub entry: Entry,
}

/// Payload of a delete operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePayload {
    /// When `true` (the default), deleting an entry with children fails;
    /// the subtree-delete request control clears it.
    pub leaf_only: bool,
}

/// Payload of a modify operation.
///
/// `original_mods` preserves a deep copy of the modification list so the
/// context can be replayed after a reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyPayload {
    /// The ordered modification deltas.
    pub mods: Vec<Modification>,
    /// Snapshot captured by `save_original`, at most once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_mods: Option<Vec<Modification>>,
}

impl ModifyPayload {
    /// Capture the pre-mutation modification list. Later calls are no-ops;
    /// the first snapshot wins.
    pub fn save_original(&mut self) {
        if self.original_mods.is_none() {
            self.original_mods = Some(self.mods.clone());
        }
    }

    /// Restore the modification list from the preserved snapshot, if one
    /// was captured.
    pub fn restore_original(&mut self) {
        if let Some(original) = &self.original_mods {
            self.mods = original.clone();
        }
    }
}

/// Payload of a rename (modify-RDN) operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePayload {
    /// The new leaf RDN.
    pub new_rdn: Rdn,
    /// Whether the old RDN's values are removed from the entry.
    pub delete_old_rdn: bool,
    /// Attribute-value pairs affected by the rename, for index
    /// reconciliation.
    pub mod_avas: Vec<ModDnAva>,
}

/// Payload of a move (new superior, same RDN) operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovePayload {
    /// The DN the entry is re-parented under.
    pub new_superior: Dn,
}

/// Payload of a combined move-and-rename operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveAndRenamePayload {
    /// The DN the entry is re-parented under.
    pub new_superior: Dn,
    /// The new leaf RDN.
    pub new_rdn: Rdn,
    /// Whether the old RDN's values are removed from the entry.
    pub delete_old_rdn: bool,
    /// Attribute-value pairs affected by the rename half.
    pub mod_avas: Vec<ModDnAva>,
}

/// Payload of a compare operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparePayload {
    /// The attribute to compare.
    pub attribute: String,
    /// The asserted value.
    pub value: AttributeValue,
}

/// Payload of a bind operation. Carries no referral policy by
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindPayload {
    /// The bind mechanism.
    pub mechanism: BindMechanism,
    /// Raw credentials; interpretation belongs to the authentication
    /// stage.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<u8>,
}

/// Payload of a lookup (single-entry read) operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupPayload {
    /// Which attributes to return.
    pub selection: crate::select::AttributeSelection,
}

/// Payload of a search operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPayload {
    /// Search scope relative to the target DN.
    pub scope: SearchScope,
    /// The filter expression tree.
    pub filter: FilterNode,
    /// Which attributes to return.
    pub selection: crate::select::AttributeSelection,
    /// Advisory maximum number of results; interpreted by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_limit: Option<u64>,
    /// Advisory time limit; interpreted by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<Duration>,
    /// Alias dereferencing mode.
    #[serde(default)]
    pub alias_mode: AliasDerefMode,
}

/// The tagged union of operation payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Add(AddPayload),
    Delete(DeletePayload),
    Modify(ModifyPayload),
    Rename(RenamePayload),
    Move(MovePayload),
    MoveAndRename(MoveAndRenamePayload),
    Compare(ComparePayload),
    Bind(BindPayload),
    Lookup(LookupPayload),
    List,
    Search(SearchPayload),
    GetRootDse,
    EntryExists,
}

impl Operation {
    /// The kind tag of this payload.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Add(_) => OperationKind::Add,
            Operation::Delete(_) => OperationKind::Delete,
            Operation::Modify(_) => OperationKind::Modify,
            Operation::Rename(_) => OperationKind::Rename,
            Operation::Move(_) => OperationKind::Move,
            Operation::MoveAndRename(_) => OperationKind::MoveAndRename,
            Operation::Compare(_) => OperationKind::Compare,
            Operation::Bind(_) => OperationKind::Bind,
            Operation::Lookup(_) => OperationKind::Lookup,
            Operation::List => OperationKind::List,
            Operation::Search(_) => OperationKind::Search,
            Operation::GetRootDse => OperationKind::GetRootDse,
            Operation::EntryExists => OperationKind::EntryExists,
        }
    }
}

/// Compute the attribute-value reconciliation records for a rename from
/// `old_rdn` to `new_rdn`.
///
/// A value kept by both sides produces no record. An attribute present on
/// both sides with a different value produces an updated-old/updated-new
/// pair; an attribute only in the new RDN produces `Added`; an attribute
/// only in the old RDN produces `Deleted` when the old RDN is being
/// removed.
#[must_use]
pub fn compute_mod_avas(old_rdn: &Rdn, new_rdn: &Rdn, delete_old_rdn: bool) -> Vec<ModDnAva> {
    let mut records = Vec::new();
    let old_avas = old_rdn.avas();

    for new_ava in new_rdn.avas() {
        let same_attr = old_avas
            .iter()
            .find(|a| a.attr().eq_ignore_ascii_case(new_ava.attr()));
        match same_attr {
            Some(old_ava) if old_ava.value().eq_ignore_ascii_case(new_ava.value()) => {}
            Some(old_ava) => {
                records.push(ModDnAva::new(ModDnAvaKind::UpdatedOld, old_ava.clone()));
                records.push(ModDnAva::new(ModDnAvaKind::UpdatedNew, new_ava.clone()));
            }
            None => records.push(ModDnAva::new(ModDnAvaKind::Added, new_ava.clone())),
        }
    }

    if delete_old_rdn {
        for old_ava in old_avas {
            let covered = new_rdn
                .avas()
                .iter()
                .any(|a| a.attr().eq_ignore_ascii_case(old_ava.attr()));
            if !covered {
                records.push(ModDnAva::new(ModDnAvaKind::Deleted, old_ava.clone()));
            }
        }
    }

    records
}

/// Validate a move request: the new superior may not be the root DSE and
/// may not sit below the entry being moved.
pub(crate) fn validate_new_superior(target: &Dn, new_superior: &Dn) -> DirectoryResult<()> {
    if new_superior.is_root() {
        return Err(DirectoryError::InvalidRequest {
            message: "move requires a new superior DN".to_string(),
        });
    }
    if new_superior.is_descendant_of(target) || new_superior.normalized() == target.normalized() {
        return Err(DirectoryError::InvalidRequest {
            message: format!("new superior '{new_superior}' lies under the moved entry '{target}'"),
        });
    }
    Ok(())
}

/// Validate a rename request target against its new RDN.
pub(crate) fn validate_new_rdn(target: &Dn, new_rdn: &Rdn) -> DirectoryResult<()> {
    if target.is_root() {
        return Err(DirectoryError::InvalidRequest {
            message: "cannot rename the root DSE".to_string(),
        });
    }
    if new_rdn.avas().iter().any(|a: &Ava| a.value().is_empty()) {
        return Err(DirectoryError::InvalidRequest {
            message: "new RDN has an empty value".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rdn(s: &str) -> Rdn {
        s.parse().unwrap()
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in OperationKind::all() {
            let json = serde_json::to_string(kind).unwrap();
            let back: OperationKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, *kind);
        }
    }

    #[test]
    fn test_change_classification() {
        assert!(OperationKind::Add.is_change());
        assert!(OperationKind::MoveAndRename.is_change());
        assert!(!OperationKind::Search.is_change());
        assert!(!OperationKind::Bind.is_change());
    }

    #[test]
    fn test_bind_has_no_referral_policy() {
        assert!(!OperationKind::Bind.supports_referral_policy());
        assert!(OperationKind::Lookup.supports_referral_policy());
    }

    #[test]
    fn test_mod_avas_value_change() {
        let records = compute_mod_avas(&rdn("cn=old"), &rdn("cn=new"), true);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, ModDnAvaKind::UpdatedOld);
        assert_eq!(records[0].ava.value(), "old");
        assert_eq!(records[1].kind, ModDnAvaKind::UpdatedNew);
        assert_eq!(records[1].ava.value(), "new");
    }

    #[test]
    fn test_mod_avas_attr_change() {
        let records = compute_mod_avas(&rdn("cn=x"), &rdn("uid=x1"), true);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, ModDnAvaKind::Added);
        assert_eq!(records[0].ava.attr(), "uid");
        assert_eq!(records[1].kind, ModDnAvaKind::Deleted);
        assert_eq!(records[1].ava.attr(), "cn");
    }

    #[test]
    fn test_mod_avas_keep_old_rdn() {
        // old RDN retained: nothing is deleted
        let records = compute_mod_avas(&rdn("cn=x"), &rdn("uid=x1"), false);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ModDnAvaKind::Added);
    }

    #[test]
    fn test_mod_avas_unchanged_value() {
        let records = compute_mod_avas(&rdn("cn=X"), &rdn("cn=x"), true);
        assert!(records.is_empty());
    }

    #[test]
    fn test_validate_new_superior_rejects_cycle() {
        let target: Dn = "ou=a,dc=example".parse().unwrap();
        let below: Dn = "ou=b,ou=a,dc=example".parse().unwrap();
        assert!(validate_new_superior(&target, &below).is_err());
        assert!(validate_new_superior(&target, &target).is_err());
        assert!(validate_new_superior(&target, &Dn::root()).is_err());

        let ok: Dn = "ou=c,dc=example".parse().unwrap();
        assert!(validate_new_superior(&target, &ok).is_ok());
    }

    #[test]
    fn test_modify_payload_save_restore() {
        use arbor_core::{Attribute, ModificationOp};

        let mut payload = ModifyPayload {
            mods: vec![Modification::new(
                ModificationOp::Add,
                Attribute::with_value("cn", "a"),
            )],
            original_mods: None,
        };
        payload.save_original();
        payload.mods.push(Modification::new(
            ModificationOp::Remove,
            Attribute::with_value("cn", "b"),
        ));
        // second save must not overwrite the first snapshot
        payload.save_original();
        payload.restore_original();
        assert_eq!(payload.mods.len(), 1);
    }

    #[test]
    fn test_filter_serde_round_trip() {
        let filter = FilterNode::and(vec![
            FilterNode::eq("objectClass", "person"),
            FilterNode::negate(FilterNode::present("ref")),
        ]);
        let json = serde_json::to_string(&filter).unwrap();
        let back: FilterNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, filter);
    }
}
