//! Test support: a seeded in-process partition and probe interceptors.

use crate::chain::{ChainConfig, ChainOutcome, ChainRunner};
use crate::config::PipelineConfig;
use crate::context::OperationContext;
use crate::interceptor::{Interceptor, InterceptorRegistry};
use crate::ops::Operation;
use crate::partition::{EntryCursor, Partition};
use crate::session::{CoreSession, DirectoryService, Principal};
use arbor_core::{CoreSchema, DirectoryError, DirectoryResult, Entry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Minimal map-backed partition for unit tests.
#[derive(Default)]
pub(crate) struct SeededPartition {
    entries: Mutex<HashMap<String, Entry>>,
}

impl SeededPartition {
    pub(crate) fn with_entries(entries: Vec<Entry>) -> Self {
        let map = entries
            .into_iter()
            .map(|e| (e.dn().normalized(), e))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    fn target_key(ctx: &OperationContext) -> DirectoryResult<String> {
        ctx.target_dn()
            .map(arbor_core::Dn::normalized)
            .ok_or_else(|| DirectoryError::InvalidRequest {
                message: "operation has no target DN".to_string(),
            })
    }
}

#[async_trait]
impl Partition for SeededPartition {
    async fn add(&self, ctx: &mut OperationContext) -> DirectoryResult<()> {
        let Operation::Add(payload) = ctx.operation() else {
            return Err(DirectoryError::InvalidRequest {
                message: "not an add context".to_string(),
            });
        };
        let entry = payload.entry.clone();
        let key = entry.dn().normalized();
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(&key) {
            return Err(DirectoryError::EntryAlreadyExists {
                dn: entry.dn().to_string(),
            });
        }
        entries.insert(key, entry);
        Ok(())
    }

    async fn delete(&self, ctx: &mut OperationContext) -> DirectoryResult<()> {
        let key = Self::target_key(ctx)?;
        let mut entries = self.entries.lock().unwrap();
        match entries.remove(&key) {
            Some(_) => Ok(()),
            None => Err(DirectoryError::NoSuchEntry {
                dn: ctx.target_dn().map(ToString::to_string).unwrap_or_default(),
            }),
        }
    }

    async fn modify(&self, _ctx: &mut OperationContext) -> DirectoryResult<()> {
        Ok(())
    }

    async fn rename(&self, _ctx: &mut OperationContext) -> DirectoryResult<()> {
        Ok(())
    }

    async fn move_entry(&self, _ctx: &mut OperationContext) -> DirectoryResult<()> {
        Ok(())
    }

    async fn move_and_rename(&self, _ctx: &mut OperationContext) -> DirectoryResult<()> {
        Ok(())
    }

    async fn compare(&self, ctx: &mut OperationContext) -> DirectoryResult<bool> {
        let Operation::Compare(payload) = ctx.operation() else {
            return Err(DirectoryError::InvalidRequest {
                message: "not a compare context".to_string(),
            });
        };
        let key = Self::target_key(ctx)?;
        let entries = self.entries.lock().unwrap();
        let entry = entries.get(&key).ok_or_else(|| DirectoryError::NoSuchEntry {
            dn: ctx.target_dn().map(ToString::to_string).unwrap_or_default(),
        })?;
        Ok(entry
            .get(&payload.attribute)
            .is_some_and(|a| a.contains(&payload.value)))
    }

    async fn lookup(&self, ctx: &mut OperationContext) -> DirectoryResult<Entry> {
        let key = Self::target_key(ctx)?;
        let entries = self.entries.lock().unwrap();
        entries
            .get(&key)
            .cloned()
            .ok_or_else(|| DirectoryError::NoSuchEntry {
                dn: ctx.target_dn().map(ToString::to_string).unwrap_or_default(),
            })
    }

    async fn has_entry(&self, ctx: &mut OperationContext) -> DirectoryResult<bool> {
        let key = Self::target_key(ctx)?;
        Ok(self.entries.lock().unwrap().contains_key(&key))
    }

    async fn list(&self, ctx: &mut OperationContext) -> DirectoryResult<EntryCursor> {
        let base = ctx.target_dn().cloned().unwrap_or_else(arbor_core::Dn::root);
        let entries = self.entries.lock().unwrap();
        let children = entries
            .values()
            .filter(|e| e.dn().parent().is_some_and(|p| p.normalized() == base.normalized()))
            .cloned()
            .collect();
        Ok(EntryCursor::new(children))
    }

    async fn search(&self, ctx: &mut OperationContext) -> DirectoryResult<EntryCursor> {
        let base = ctx.target_dn().cloned().unwrap_or_else(arbor_core::Dn::root);
        let entries = self.entries.lock().unwrap();
        let found = entries
            .values()
            .filter(|e| {
                e.dn().normalized() == base.normalized() || e.dn().is_descendant_of(&base)
            })
            .cloned()
            .collect();
        Ok(EntryCursor::new(found))
    }
}

/// Logs which handler ran, then passes through.
pub(crate) struct RecordingInterceptor {
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingInterceptor {
    pub(crate) fn new(log: Arc<Mutex<Vec<&'static str>>>) -> Self {
        Self { log }
    }

    fn note(&self, handler: &'static str) {
        self.log.lock().unwrap().push(handler);
    }
}

#[async_trait]
impl Interceptor for RecordingInterceptor {
    async fn add(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.note("add");
        next.proceed(ctx).await
    }

    async fn delete(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.note("delete");
        next.proceed(ctx).await
    }

    async fn modify(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.note("modify");
        next.proceed(ctx).await
    }

    async fn lookup(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.note("lookup");
        next.proceed(ctx).await
    }

    async fn search(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.note("search");
        next.proceed(ctx).await
    }

    async fn entry_exists(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.note("entry_exists");
        next.proceed(ctx).await
    }
}

/// Always fails with an authorization error.
pub(crate) struct FailingInterceptor;

#[async_trait]
impl Interceptor for FailingInterceptor {
    async fn delete(
        &self,
        _next: &mut ChainRunner<'_>,
        _ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        Err(DirectoryError::Unauthorized {
            message: "denied by test stage".to_string(),
        })
    }
}

/// A service plus session over the given collaborators.
pub(crate) fn test_service_with(
    registry: InterceptorRegistry,
    chains: ChainConfig,
    partition: SeededPartition,
) -> (Arc<DirectoryService>, Arc<CoreSession>) {
    let config = PipelineConfig {
        chains,
        ..PipelineConfig::default()
    };
    let service = DirectoryService::new(
        config,
        Arc::new(CoreSchema::new()),
        registry,
        Arc::new(partition),
        None,
    )
    .expect("test service config must validate");
    let session = CoreSession::new(service.clone(), Principal::authenticated("uid=admin,ou=system"));
    (service, session)
}

/// A session over an empty backend with an empty chain.
pub(crate) fn test_session() -> Arc<CoreSession> {
    let (_, session) = test_service_with(
        InterceptorRegistry::new(),
        ChainConfig::new(vec![]),
        SeededPartition::default(),
    );
    session
}
