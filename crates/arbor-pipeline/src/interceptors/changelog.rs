//! Changelog Stage
//!
//! Forwards change-inducing operations to the changelog sink once the
//! rest of the chain and the backend have succeeded, gated by the
//! context's log/no-log flag. Placed last in the standard chain so the
//! recorded payload is the final, normalized one.

use crate::chain::{ChainOutcome, ChainRunner};
use crate::changelog::{ChangeKind, ChangeRecord, ChangelogSink};
use crate::context::OperationContext;
use crate::interceptor::Interceptor;
use crate::ops::Operation;
use arbor_core::DirectoryResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Reports committed changes to a [`ChangelogSink`].
pub struct ChangelogInterceptor {
    sink: Arc<dyn ChangelogSink>,
}

impl ChangelogInterceptor {
    /// A stage reporting to the given sink.
    #[must_use]
    pub fn new(sink: Arc<dyn ChangelogSink>) -> Self {
        Self { sink }
    }

    fn change_for(ctx: &OperationContext) -> Option<ChangeKind> {
        let dn = ctx.target_dn()?.clone();
        match ctx.operation() {
            Operation::Add(payload) => Some(ChangeKind::Add {
                entry: payload.entry.clone(),
            }),
            Operation::Delete(_) => Some(ChangeKind::Delete { dn }),
            Operation::Modify(payload) => Some(ChangeKind::Modify {
                dn,
                mods: payload.mods.clone(),
            }),
            Operation::Rename(payload) => Some(ChangeKind::Rename {
                dn,
                new_rdn: payload.new_rdn.clone(),
                delete_old_rdn: payload.delete_old_rdn,
            }),
            Operation::Move(payload) => Some(ChangeKind::Move {
                dn,
                new_superior: payload.new_superior.clone(),
            }),
            Operation::MoveAndRename(payload) => Some(ChangeKind::MoveAndRename {
                dn,
                new_superior: payload.new_superior.clone(),
                new_rdn: payload.new_rdn.clone(),
                delete_old_rdn: payload.delete_old_rdn,
            }),
            _ => None,
        }
    }

    async fn record_after(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        let outcome = next.proceed(ctx).await?;
        if ctx.log_change() {
            if let Some(change) = Self::change_for(ctx) {
                let record = ChangeRecord::new(ctx.effective_principal().name, change);
                debug!(id = %record.id, operation = %ctx.kind(), "recording change");
                self.sink.record(record).await?;
            }
        }
        Ok(outcome)
    }
}

#[async_trait]
impl Interceptor for ChangelogInterceptor {
    async fn add(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.record_after(next, ctx).await
    }

    async fn delete(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.record_after(next, ctx).await
    }

    async fn modify(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.record_after(next, ctx).await
    }

    async fn rename(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.record_after(next, ctx).await
    }

    async fn move_entry(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.record_after(next, ctx).await
    }

    async fn move_and_rename(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.record_after(next, ctx).await
    }
}
