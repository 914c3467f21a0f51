//! Interceptor Contract
//!
//! An interceptor is one pluggable stage of the operation pipeline,
//! performing a single cross-cutting concern. Stages are identified by a
//! stable [`InterceptorId`] key, resolved against the
//! [`InterceptorRegistry`] once at service configuration time, never by
//! per-call string lookup.
//!
//! The trait has one handler per operation kind, each defaulting to
//! pass-through: an implementation overrides only the kinds its concern
//! applies to, mutates the context as needed, then either calls through
//! to the next stage via the continuation or short-circuits by returning
//! an error.

use crate::chain::{ChainOutcome, ChainRunner};
use crate::context::OperationContext;
use arbor_core::{DirectoryError, DirectoryResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Stable key identifying one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InterceptorId {
    /// DN and payload normalization against the schema.
    Normalization,
    /// Credential verification on bind.
    Authentication,
    /// Referral detection along the ancestor path.
    Referral,
    /// Access control.
    Authorization,
    /// Server-maintained attribute stamping.
    OperationalAttributes,
    /// Schema conformance checks on mutations.
    SchemaCheck,
    /// Change capture for the changelog sink.
    Changelog,
    /// An embedder-registered stage.
    Custom(String),
}

impl InterceptorId {
    /// The configuration/log name of this stage.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            InterceptorId::Normalization => "normalization",
            InterceptorId::Authentication => "authentication",
            InterceptorId::Referral => "referral",
            InterceptorId::Authorization => "authorization",
            InterceptorId::OperationalAttributes => "operational_attributes",
            InterceptorId::SchemaCheck => "schema_check",
            InterceptorId::Changelog => "changelog",
            InterceptorId::Custom(name) => name,
        }
    }
}

impl fmt::Display for InterceptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for InterceptorId {
    fn from(s: String) -> Self {
        match s.as_str() {
            "normalization" => InterceptorId::Normalization,
            "authentication" => InterceptorId::Authentication,
            "referral" => InterceptorId::Referral,
            "authorization" => InterceptorId::Authorization,
            "operational_attributes" => InterceptorId::OperationalAttributes,
            "schema_check" => InterceptorId::SchemaCheck,
            "changelog" => InterceptorId::Changelog,
            _ => InterceptorId::Custom(s),
        }
    }
}

impl From<InterceptorId> for String {
    fn from(id: InterceptorId) -> Self {
        id.as_str().to_string()
    }
}

/// One pipeline stage. Every handler defaults to calling through to the
/// next stage unchanged.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn add(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        next.proceed(ctx).await
    }

    async fn delete(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        next.proceed(ctx).await
    }

    async fn modify(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        next.proceed(ctx).await
    }

    async fn rename(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        next.proceed(ctx).await
    }

    async fn move_entry(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        next.proceed(ctx).await
    }

    async fn move_and_rename(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        next.proceed(ctx).await
    }

    async fn compare(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        next.proceed(ctx).await
    }

    async fn bind(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        next.proceed(ctx).await
    }

    async fn lookup(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        next.proceed(ctx).await
    }

    async fn list(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        next.proceed(ctx).await
    }

    async fn search(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        next.proceed(ctx).await
    }

    async fn entry_exists(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        next.proceed(ctx).await
    }

    async fn root_dse(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        next.proceed(ctx).await
    }
}

/// Registry mapping stage keys to their implementations. Populated at
/// service configuration time; read-only while requests are in flight.
#[derive(Default, Clone)]
pub struct InterceptorRegistry {
    interceptors: HashMap<InterceptorId, Arc<dyn Interceptor>>,
}

impl InterceptorRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation under a stage key, replacing any
    /// earlier registration.
    pub fn register(&mut self, id: InterceptorId, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.insert(id, interceptor);
    }

    /// Builder-style [`InterceptorRegistry::register`].
    #[must_use]
    pub fn with(mut self, id: InterceptorId, interceptor: Arc<dyn Interceptor>) -> Self {
        self.register(id, interceptor);
        self
    }

    /// Look up a stage implementation.
    pub fn get(&self, id: &InterceptorId) -> DirectoryResult<Arc<dyn Interceptor>> {
        self.interceptors
            .get(id)
            .cloned()
            .ok_or_else(|| DirectoryError::InvalidConfiguration {
                message: format!("no interceptor registered for stage '{id}'"),
            })
    }

    /// Whether a stage is registered.
    #[must_use]
    pub fn contains(&self, id: &InterceptorId) -> bool {
        self.interceptors.contains_key(id)
    }

    /// Number of registered stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl fmt::Debug for InterceptorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&InterceptorId> = self.interceptors.keys().collect();
        ids.sort_by_key(|id| id.as_str().to_string());
        f.debug_struct("InterceptorRegistry")
            .field("stages", &ids)
            .finish()
    }
}
