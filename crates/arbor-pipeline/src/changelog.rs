//! Changelog Boundary
//!
//! An optional sink that change-inducing operations report to once the
//! rest of the chain has succeeded. Reporting is gated per context by its
//! log/no-log flag, which defaults to log and is cleared on context reset
//! so replayed operations are not recorded twice.

use arbor_core::{ChangeId, DirectoryResult, Dn, Entry, Modification, Rdn};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The change half of a changelog record, mirroring the change-inducing
/// operation payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeKind {
    Add {
        entry: Entry,
    },
    Delete {
        dn: Dn,
    },
    Modify {
        dn: Dn,
        mods: Vec<Modification>,
    },
    Rename {
        dn: Dn,
        new_rdn: Rdn,
        delete_old_rdn: bool,
    },
    Move {
        dn: Dn,
        new_superior: Dn,
    },
    MoveAndRename {
        dn: Dn,
        new_superior: Dn,
        new_rdn: Rdn,
        delete_old_rdn: bool,
    },
}

/// One recorded change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Record id.
    pub id: ChangeId,
    /// When the change was committed.
    pub at: DateTime<Utc>,
    /// The effective principal that performed the change.
    pub principal: String,
    /// What changed.
    pub change: ChangeKind,
}

impl ChangeRecord {
    /// A record stamped now.
    #[must_use]
    pub fn new(principal: impl Into<String>, change: ChangeKind) -> Self {
        Self {
            id: ChangeId::new(),
            at: Utc::now(),
            principal: principal.into(),
            change,
        }
    }
}

/// Sink contract for changelog records.
#[async_trait]
pub trait ChangelogSink: Send + Sync {
    /// Persist one record. Errors propagate to the caller of the change
    /// operation.
    async fn record(&self, record: ChangeRecord) -> DirectoryResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::Attribute;

    #[test]
    fn test_record_serde_round_trip() {
        let entry = Entry::new("cn=x,dc=example".parse().unwrap())
            .with(Attribute::with_value("cn", "x"));
        let record = ChangeRecord::new("uid=admin,ou=system", ChangeKind::Add { entry });

        let json = serde_json::to_string(&record).unwrap();
        let back: ChangeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, record.id);
        assert_eq!(back.principal, "uid=admin,ou=system");
        assert!(matches!(back.change, ChangeKind::Add { .. }));
    }
}
