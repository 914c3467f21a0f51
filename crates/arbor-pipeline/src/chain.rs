//! Chain Dispatch
//!
//! The dispatcher advances a context through its bound chain one stage at
//! a time: resolve the stage at the cursor, invoke its handler for the
//! context's operation kind, and let the handler call back through
//! [`ChainRunner::proceed`] as its continuation. When the cursor reaches
//! the terminal sentinel the partition executes the physical operation.
//!
//! Ordering is exactly the configured sequence; a bypass set may skip
//! specific stages for specific collateral calls without reordering the
//! rest. Errors propagate verbatim; the dispatcher adds no retry logic.

use crate::context::{ChainStep, OperationContext};
use crate::interceptor::{Interceptor, InterceptorId, InterceptorRegistry};
use crate::ops::OperationKind;
use crate::partition::{EntryCursor, Partition};
use arbor_core::{DirectoryError, DirectoryResult, Entry};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument};

/// What a completed traversal produced, by operation kind.
#[derive(Debug)]
pub enum ChainOutcome {
    /// Change operations and bind: nothing beyond success.
    Done,
    /// Lookup and root-DSE reads.
    Entry(Entry),
    /// List and search.
    Entries(EntryCursor),
    /// Compare and entry-exists.
    Matched(bool),
}

impl ChainOutcome {
    /// Unwrap a single-entry outcome.
    pub fn into_entry(self) -> DirectoryResult<Entry> {
        match self {
            ChainOutcome::Entry(entry) => Ok(entry),
            other => Err(DirectoryError::InvalidRequest {
                message: format!("expected an entry outcome, got {other:?}"),
            }),
        }
    }

    /// Unwrap a cursor outcome.
    pub fn into_entries(self) -> DirectoryResult<EntryCursor> {
        match self {
            ChainOutcome::Entries(cursor) => Ok(cursor),
            other => Err(DirectoryError::InvalidRequest {
                message: format!("expected a cursor outcome, got {other:?}"),
            }),
        }
    }

    /// Unwrap a boolean outcome.
    pub fn into_matched(self) -> DirectoryResult<bool> {
        match self {
            ChainOutcome::Matched(matched) => Ok(matched),
            other => Err(DirectoryError::InvalidRequest {
                message: format!("expected a boolean outcome, got {other:?}"),
            }),
        }
    }
}

/// Per-operation-kind interceptor chains, resolved once at configuration
/// time and read-only afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// The chain applied to kinds without an explicit override.
    default_chain: Vec<InterceptorId>,
    /// Kind-specific chains.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    overrides: HashMap<OperationKind, Vec<InterceptorId>>,
}

impl ChainConfig {
    /// A configuration applying `default_chain` to every operation kind.
    #[must_use]
    pub fn new(default_chain: Vec<InterceptorId>) -> Self {
        Self {
            default_chain,
            overrides: HashMap::new(),
        }
    }

    /// The built-in stage order.
    #[must_use]
    pub fn standard() -> Self {
        let mut config = Self::new(vec![
            InterceptorId::Normalization,
            InterceptorId::Referral,
            InterceptorId::OperationalAttributes,
            InterceptorId::Changelog,
        ]);
        // bind never chases referrals and logs no change
        config.set_override(
            OperationKind::Bind,
            vec![InterceptorId::Normalization, InterceptorId::Authentication],
        );
        config.set_override(OperationKind::GetRootDse, vec![]);
        config
    }

    /// Replace the chain for one operation kind.
    pub fn set_override(&mut self, kind: OperationKind, chain: Vec<InterceptorId>) {
        self.overrides.insert(kind, chain);
    }

    /// The chain configured for `kind`.
    #[must_use]
    pub fn chain_for(&self, kind: OperationKind) -> &[InterceptorId] {
        self.overrides
            .get(&kind)
            .map_or(&self.default_chain, Vec::as_slice)
    }

    /// Validate against a registry: every referenced stage must be
    /// registered, and no chain may name a stage twice.
    pub fn validate(&self, registry: &InterceptorRegistry) -> DirectoryResult<()> {
        let mut chains: Vec<(&str, &[InterceptorId])> =
            vec![("default", self.default_chain.as_slice())];
        for (kind, chain) in &self.overrides {
            chains.push((kind.as_str(), chain.as_slice()));
        }

        for (name, chain) in chains {
            let mut seen = HashSet::new();
            for id in chain {
                if !registry.contains(id) {
                    return Err(DirectoryError::InvalidConfiguration {
                        message: format!("chain '{name}' references unregistered stage '{id}'"),
                    });
                }
                if !seen.insert(id.clone()) {
                    return Err(DirectoryError::InvalidConfiguration {
                        message: format!("chain '{name}' names stage '{id}' twice"),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// The dispatcher driving one context through its chain and into the
/// partition. Also the continuation handed to each stage handler.
pub struct ChainRunner<'a> {
    registry: &'a InterceptorRegistry,
    partition: &'a dyn Partition,
    root_dse: &'a Entry,
    bypass: HashSet<InterceptorId>,
}

impl<'a> ChainRunner<'a> {
    /// A runner over the given collaborators with an empty bypass set.
    #[must_use]
    pub fn new(
        registry: &'a InterceptorRegistry,
        partition: &'a dyn Partition,
        root_dse: &'a Entry,
    ) -> Self {
        Self {
            registry,
            partition,
            root_dse,
            bypass: HashSet::new(),
        }
    }

    /// Skip the named stages for this traversal; the relative order of
    /// the remaining stages is unchanged.
    #[must_use]
    pub fn with_bypass(mut self, bypass: HashSet<InterceptorId>) -> Self {
        self.bypass = bypass;
        self
    }

    /// Advance to the next stage (or the backend) and run it to
    /// completion. Stage handlers call this as their continuation.
    #[instrument(level = "debug", skip(self, ctx), fields(operation = %ctx.kind(), id = %ctx.id()))]
    pub async fn proceed(&mut self, ctx: &mut OperationContext) -> DirectoryResult<ChainOutcome> {
        loop {
            match ctx.next_interceptor() {
                ChainStep::Stage(id) => {
                    if self.bypass.contains(&id) {
                        debug!(stage = %id, "bypassing stage");
                        continue;
                    }
                    let interceptor = self.registry.get(&id)?;
                    debug!(stage = %id, "entering stage");
                    return self.invoke(interceptor, ctx).await;
                }
                ChainStep::Terminal => {
                    debug!("chain exhausted, executing backend");
                    return self.terminal(ctx).await;
                }
            }
        }
    }

    async fn invoke(
        &mut self,
        interceptor: Arc<dyn Interceptor>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        match ctx.kind() {
            OperationKind::Add => interceptor.add(self, ctx).await,
            OperationKind::Delete => interceptor.delete(self, ctx).await,
            OperationKind::Modify => interceptor.modify(self, ctx).await,
            OperationKind::Rename => interceptor.rename(self, ctx).await,
            OperationKind::Move => interceptor.move_entry(self, ctx).await,
            OperationKind::MoveAndRename => interceptor.move_and_rename(self, ctx).await,
            OperationKind::Compare => interceptor.compare(self, ctx).await,
            OperationKind::Bind => interceptor.bind(self, ctx).await,
            OperationKind::Lookup => interceptor.lookup(self, ctx).await,
            OperationKind::List => interceptor.list(self, ctx).await,
            OperationKind::Search => interceptor.search(self, ctx).await,
            OperationKind::GetRootDse => interceptor.root_dse(self, ctx).await,
            OperationKind::EntryExists => interceptor.entry_exists(self, ctx).await,
        }
    }

    async fn terminal(&self, ctx: &mut OperationContext) -> DirectoryResult<ChainOutcome> {
        match ctx.kind() {
            OperationKind::Add => self.partition.add(ctx).await.map(|()| ChainOutcome::Done),
            OperationKind::Delete => {
                self.partition.delete(ctx).await.map(|()| ChainOutcome::Done)
            }
            OperationKind::Modify => {
                self.partition.modify(ctx).await.map(|()| ChainOutcome::Done)
            }
            OperationKind::Rename => {
                self.partition.rename(ctx).await.map(|()| ChainOutcome::Done)
            }
            OperationKind::Move => self
                .partition
                .move_entry(ctx)
                .await
                .map(|()| ChainOutcome::Done),
            OperationKind::MoveAndRename => self
                .partition
                .move_and_rename(ctx)
                .await
                .map(|()| ChainOutcome::Done),
            OperationKind::Compare => self
                .partition
                .compare(ctx)
                .await
                .map(ChainOutcome::Matched),
            // credential verification is the authentication stage's job;
            // the backend has nothing left to do for a bind
            OperationKind::Bind => Ok(ChainOutcome::Done),
            OperationKind::Lookup => self.partition.lookup(ctx).await.map(ChainOutcome::Entry),
            OperationKind::List => self.partition.list(ctx).await.map(ChainOutcome::Entries),
            OperationKind::Search => self.partition.search(ctx).await.map(ChainOutcome::Entries),
            OperationKind::GetRootDse => Ok(ChainOutcome::Entry(self.root_dse.clone())),
            OperationKind::EntryExists => self
                .partition
                .has_entry(ctx)
                .await
                .map(ChainOutcome::Matched),
        }
    }
}
