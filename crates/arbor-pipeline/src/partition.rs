//! Partition Boundary
//!
//! The terminal collaborator of the pipeline: once the interceptor chain
//! is exhausted, the backend executes the physical operation using the
//! final state of the context. Implementations own their internal
//! concurrency control and must guarantee that a single logical write is
//! observed atomically by concurrent readers, and that `has_entry` and
//! `lookup` calls made mid-chain observe a consistent snapshot.

use crate::context::OperationContext;
use arbor_core::{DirectoryResult, Entry};
use async_trait::async_trait;
use std::collections::VecDeque;

/// Owned forward cursor over result entries.
#[derive(Debug, Default)]
pub struct EntryCursor {
    entries: VecDeque<Entry>,
}

impl EntryCursor {
    /// A cursor over the given entries, in order.
    #[must_use]
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// An empty cursor.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Advance and return the next entry.
    pub fn next_entry(&mut self) -> Option<Entry> {
        self.entries.pop_front()
    }

    /// Entries not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }

    /// Drain the rest of the cursor into a vector.
    #[must_use]
    pub fn collect_remaining(mut self) -> Vec<Entry> {
        self.entries.drain(..).collect()
    }
}

impl Iterator for EntryCursor {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        self.next_entry()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.entries.len(), Some(self.entries.len()))
    }
}

/// The backend contract. Each method receives the fully-resolved context
/// after chain completion (or directly, for collateral operations that
/// bypass the chain).
#[async_trait]
pub trait Partition: Send + Sync {
    /// Create the entry carried by an add context.
    async fn add(&self, ctx: &mut OperationContext) -> DirectoryResult<()>;

    /// Delete the entry at the context's target DN.
    async fn delete(&self, ctx: &mut OperationContext) -> DirectoryResult<()>;

    /// Apply a modify context's deltas.
    async fn modify(&self, ctx: &mut OperationContext) -> DirectoryResult<()>;

    /// Apply a rename (modify-RDN) context.
    async fn rename(&self, ctx: &mut OperationContext) -> DirectoryResult<()>;

    /// Re-parent the entry under the context's new superior.
    async fn move_entry(&self, ctx: &mut OperationContext) -> DirectoryResult<()>;

    /// Combined move and rename.
    async fn move_and_rename(&self, ctx: &mut OperationContext) -> DirectoryResult<()>;

    /// Compare the asserted value against the stored entry.
    async fn compare(&self, ctx: &mut OperationContext) -> DirectoryResult<bool>;

    /// Read one entry.
    async fn lookup(&self, ctx: &mut OperationContext) -> DirectoryResult<Entry>;

    /// Whether an entry exists at the context's target DN.
    async fn has_entry(&self, ctx: &mut OperationContext) -> DirectoryResult<bool>;

    /// Enumerate the immediate children of the target DN.
    async fn list(&self, ctx: &mut OperationContext) -> DirectoryResult<EntryCursor>;

    /// Execute a search context.
    async fn search(&self, ctx: &mut OperationContext) -> DirectoryResult<EntryCursor>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::Dn;

    fn entry(s: &str) -> Entry {
        Entry::new(s.parse::<Dn>().unwrap())
    }

    #[test]
    fn test_cursor_order_and_remaining() {
        let mut cursor = EntryCursor::new(vec![entry("cn=a,dc=x"), entry("cn=b,dc=x")]);
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.next_entry().unwrap().dn().to_string(), "cn=a,dc=x");
        assert_eq!(cursor.remaining(), 1);
        let rest = cursor.collect_remaining();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].dn().to_string(), "cn=b,dc=x");
    }

    #[test]
    fn test_cursor_is_iterator() {
        let cursor = EntryCursor::new(vec![entry("cn=a,dc=x"), entry("cn=b,dc=x")]);
        assert_eq!(cursor.count(), 2);
        assert_eq!(EntryCursor::empty().next_entry(), None);
    }
}
