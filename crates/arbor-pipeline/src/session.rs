//! Sessions and the Directory Service
//!
//! [`CoreSession`] is the client-facing entry point: it constructs an
//! operation context from a decoded request, binds the configured chain
//! for the operation kind, and hands the context to the dispatcher.
//!
//! [`DirectoryService`] owns the read-mostly collaborators (stage
//! registry, chain configuration, schema, partition, optional changelog
//! sink) and doubles as the [`OperationManager`] that collateral
//! operations execute against directly, bypassing chain traversal.

use crate::chain::{ChainConfig, ChainOutcome, ChainRunner};
use crate::changelog::ChangelogSink;
use crate::config::PipelineConfig;
use crate::context::OperationContext;
use crate::controls::ControlBag;
use crate::interceptor::InterceptorRegistry;
use crate::ops::{BindMechanism, SearchPayload};
use crate::partition::{EntryCursor, Partition};
use crate::select::AttributeSelection;
use arbor_core::{
    AttributeValue, DirectoryResult, Dn, Entry, Modification, Rdn, SchemaView, SessionId,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// How strongly the session's principal was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthLevel {
    /// No authentication.
    #[default]
    Anonymous,
    /// Simple (password) authentication.
    Simple,
    /// Strong (external/certificate) authentication.
    Strong,
}

/// The identity an operation runs as.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Principal {
    /// The principal's entry DN, when it maps to one.
    pub dn: Option<Dn>,
    /// Display/audit name.
    pub name: String,
    /// Authentication strength.
    pub auth_level: AuthLevel,
}

impl Principal {
    /// The anonymous principal.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            dn: None,
            name: "anonymous".to_string(),
            auth_level: AuthLevel::Anonymous,
        }
    }

    /// A simply-authenticated principal named by a DN string.
    #[must_use]
    pub fn authenticated(name: &str) -> Self {
        Self {
            dn: name.parse().ok(),
            name: name.to_string(),
            auth_level: AuthLevel::Simple,
        }
    }
}

/// The direct-execution surface collateral operations run against. No
/// chain traversal happens here; call depth stays bounded at one level of
/// collateral indirection.
#[async_trait]
pub trait OperationManager: Send + Sync {
    /// Read one entry directly from the partition.
    async fn lookup(&self, ctx: &mut OperationContext) -> DirectoryResult<Entry>;

    /// Existence check directly against the partition.
    async fn has_entry(&self, ctx: &mut OperationContext) -> DirectoryResult<bool>;

    /// Delete directly against the partition.
    async fn delete(&self, ctx: &mut OperationContext) -> DirectoryResult<()>;
}

/// One configured directory-service instance. Construction resolves and
/// validates everything request processing reads.
pub struct DirectoryService {
    config: PipelineConfig,
    schema: Arc<dyn SchemaView>,
    registry: InterceptorRegistry,
    partition: Arc<dyn Partition>,
    changelog: Option<Arc<dyn ChangelogSink>>,
    root_dse: Entry,
}

impl DirectoryService {
    /// Create a service. Fails when a configured chain references an
    /// unregistered stage or a naming context is malformed.
    pub fn new(
        config: PipelineConfig,
        schema: Arc<dyn SchemaView>,
        registry: InterceptorRegistry,
        partition: Arc<dyn Partition>,
        changelog: Option<Arc<dyn ChangelogSink>>,
    ) -> DirectoryResult<Arc<Self>> {
        config.validate(&registry)?;
        let root_dse = config.build_root_dse();
        Ok(Arc::new(Self {
            config,
            schema,
            registry,
            partition,
            changelog,
            root_dse,
        }))
    }

    /// The schema view.
    #[must_use]
    pub fn schema(&self) -> &Arc<dyn SchemaView> {
        &self.schema
    }

    /// The chain configuration.
    #[must_use]
    pub fn chains(&self) -> &ChainConfig {
        &self.config.chains
    }

    /// The partition backend.
    #[must_use]
    pub fn partition(&self) -> &Arc<dyn Partition> {
        &self.partition
    }

    /// The changelog sink, if configured.
    #[must_use]
    pub fn changelog(&self) -> Option<&Arc<dyn ChangelogSink>> {
        self.changelog.as_ref()
    }

    /// The root DSE advertised by this instance.
    #[must_use]
    pub fn root_dse(&self) -> &Entry {
        &self.root_dse
    }

    /// The collateral-operation surface.
    #[must_use]
    pub fn operation_manager(&self) -> &dyn OperationManager {
        self
    }

    /// A dispatcher over this service's collaborators.
    #[must_use]
    pub fn runner(&self) -> ChainRunner<'_> {
        ChainRunner::new(&self.registry, self.partition.as_ref(), &self.root_dse)
    }

    pub(crate) async fn direct_lookup(&self, ctx: &mut OperationContext) -> DirectoryResult<Entry> {
        OperationManager::lookup(self, ctx).await
    }

    pub(crate) async fn direct_has_entry(
        &self,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<bool> {
        OperationManager::has_entry(self, ctx).await
    }

    pub(crate) async fn direct_delete(&self, ctx: &mut OperationContext) -> DirectoryResult<()> {
        OperationManager::delete(self, ctx).await
    }
}

#[async_trait]
impl OperationManager for DirectoryService {
    async fn lookup(&self, ctx: &mut OperationContext) -> DirectoryResult<Entry> {
        self.partition.lookup(ctx).await
    }

    async fn has_entry(&self, ctx: &mut OperationContext) -> DirectoryResult<bool> {
        self.partition.has_entry(ctx).await
    }

    async fn delete(&self, ctx: &mut OperationContext) -> DirectoryResult<()> {
        self.partition.delete(ctx).await
    }
}

/// One client session. Contexts reference their session; the session
/// always outlives them.
pub struct CoreSession {
    id: SessionId,
    principal: Principal,
    service: Arc<DirectoryService>,
}

impl std::fmt::Debug for CoreSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreSession")
            .field("id", &self.id)
            .field("principal", &self.principal.name)
            .finish_non_exhaustive()
    }
}

impl CoreSession {
    /// A session for an authenticated principal.
    #[must_use]
    pub fn new(service: Arc<DirectoryService>, principal: Principal) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId::new(),
            principal,
            service,
        })
    }

    /// An anonymous session.
    #[must_use]
    pub fn anonymous(service: Arc<DirectoryService>) -> Arc<Self> {
        Self::new(service, Principal::anonymous())
    }

    /// The session id.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The authenticated principal.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// The directory service this session talks to.
    #[must_use]
    pub fn service(&self) -> &Arc<DirectoryService> {
        &self.service
    }

    /// Add an entry.
    pub async fn add(
        self: &Arc<Self>,
        entry: Entry,
        controls: ControlBag,
    ) -> DirectoryResult<()> {
        let mut ctx = OperationContext::add(self.clone(), entry)?.with_controls(controls);
        self.execute(&mut ctx).await.map(|_| ())
    }

    /// Delete the entry at `dn`.
    pub async fn delete(self: &Arc<Self>, dn: Dn, controls: ControlBag) -> DirectoryResult<()> {
        let mut ctx = OperationContext::delete(self.clone(), dn).with_controls(controls);
        self.execute(&mut ctx).await.map(|_| ())
    }

    /// Apply modifications to the entry at `dn`.
    pub async fn modify(
        self: &Arc<Self>,
        dn: Dn,
        mods: Vec<Modification>,
        controls: ControlBag,
    ) -> DirectoryResult<()> {
        let mut ctx = OperationContext::modify(self.clone(), dn, mods)?.with_controls(controls);
        self.execute(&mut ctx).await.map(|_| ())
    }

    /// Rename the entry at `dn`.
    pub async fn rename(
        self: &Arc<Self>,
        dn: Dn,
        new_rdn: Rdn,
        delete_old_rdn: bool,
        controls: ControlBag,
    ) -> DirectoryResult<()> {
        let mut ctx = OperationContext::rename(self.clone(), dn, new_rdn, delete_old_rdn)?
            .with_controls(controls);
        self.execute(&mut ctx).await.map(|_| ())
    }

    /// Move the entry at `dn` under `new_superior`.
    pub async fn move_entry(
        self: &Arc<Self>,
        dn: Dn,
        new_superior: Dn,
        controls: ControlBag,
    ) -> DirectoryResult<()> {
        let mut ctx =
            OperationContext::move_entry(self.clone(), dn, new_superior)?.with_controls(controls);
        self.execute(&mut ctx).await.map(|_| ())
    }

    /// Combined move and rename.
    pub async fn move_and_rename(
        self: &Arc<Self>,
        dn: Dn,
        new_superior: Dn,
        new_rdn: Rdn,
        delete_old_rdn: bool,
        controls: ControlBag,
    ) -> DirectoryResult<()> {
        let mut ctx = OperationContext::move_and_rename(
            self.clone(),
            dn,
            new_superior,
            new_rdn,
            delete_old_rdn,
        )?
        .with_controls(controls);
        self.execute(&mut ctx).await.map(|_| ())
    }

    /// Compare an asserted value against the entry at `dn`.
    pub async fn compare(
        self: &Arc<Self>,
        dn: Dn,
        attribute: impl Into<String>,
        value: impl Into<AttributeValue>,
        controls: ControlBag,
    ) -> DirectoryResult<bool> {
        let mut ctx =
            OperationContext::compare(self.clone(), dn, attribute, value).with_controls(controls);
        self.execute(&mut ctx).await?.into_matched()
    }

    /// Bind. Credential verification belongs to the authentication
    /// stage; referral toggles are unsupported on the resulting context.
    pub async fn bind(
        self: &Arc<Self>,
        dn: Option<Dn>,
        mechanism: BindMechanism,
        credentials: Vec<u8>,
        controls: ControlBag,
    ) -> DirectoryResult<()> {
        let mut ctx = OperationContext::bind(self.clone(), dn, mechanism, credentials)
            .with_controls(controls);
        self.execute(&mut ctx).await.map(|_| ())
    }

    /// Read one entry.
    pub async fn lookup(
        self: &Arc<Self>,
        dn: Dn,
        selection: AttributeSelection,
        controls: ControlBag,
    ) -> DirectoryResult<Entry> {
        let mut ctx =
            OperationContext::lookup(self.clone(), dn, selection).with_controls(controls);
        self.execute(&mut ctx).await?.into_entry()
    }

    /// Enumerate the immediate children of `dn`.
    pub async fn list(self: &Arc<Self>, dn: Dn, controls: ControlBag) -> DirectoryResult<EntryCursor> {
        let mut ctx = OperationContext::list(self.clone(), dn).with_controls(controls);
        self.execute(&mut ctx).await?.into_entries()
    }

    /// Search below `dn`.
    pub async fn search(
        self: &Arc<Self>,
        dn: Dn,
        payload: SearchPayload,
        controls: ControlBag,
    ) -> DirectoryResult<EntryCursor> {
        let mut ctx = OperationContext::search(self.clone(), dn, payload).with_controls(controls);
        self.execute(&mut ctx).await?.into_entries()
    }

    /// Read the root DSE.
    pub async fn root_dse(self: &Arc<Self>) -> DirectoryResult<Entry> {
        let mut ctx = OperationContext::root_dse(self.clone());
        self.execute(&mut ctx).await?.into_entry()
    }

    /// Whether an entry exists at `dn`.
    pub async fn exists(self: &Arc<Self>, dn: Dn) -> DirectoryResult<bool> {
        let mut ctx = OperationContext::entry_exists(self.clone(), dn);
        self.execute(&mut ctx).await?.into_matched()
    }

    #[instrument(level = "debug", skip(self, ctx), fields(session = %self.id, operation = %ctx.kind()))]
    async fn execute(&self, ctx: &mut OperationContext) -> DirectoryResult<ChainOutcome> {
        let chain = self.service.chains().chain_for(ctx.kind()).to_vec();
        debug!(stages = chain.len(), "binding interceptor chain");
        ctx.set_interceptors(chain)?;
        self.service.runner().proceed(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{test_service_with, SeededPartition};
    use arbor_core::Attribute;

    fn dn(s: &str) -> Dn {
        s.parse().unwrap()
    }

    #[test]
    fn test_principal_authenticated_parses_dn() {
        let principal = Principal::authenticated("uid=admin,ou=system");
        assert_eq!(principal.auth_level, AuthLevel::Simple);
        assert_eq!(principal.dn.unwrap().to_string(), "uid=admin,ou=system");

        let anon = Principal::anonymous();
        assert_eq!(anon.auth_level, AuthLevel::Anonymous);
        assert!(anon.dn.is_none());
    }

    #[tokio::test]
    async fn test_session_executes_against_partition() {
        let entry = Entry::new(dn("cn=x,dc=example")).with(Attribute::with_value("cn", "x"));
        let (_, session) = test_service_with(
            InterceptorRegistry::new(),
            ChainConfig::new(vec![]),
            SeededPartition::with_entries(vec![entry]),
        );

        assert!(session.exists(dn("cn=x,dc=example")).await.unwrap());
        assert!(!session.exists(dn("cn=missing,dc=example")).await.unwrap());

        let found = session
            .lookup(
                dn("cn=x,dc=example"),
                AttributeSelection::all_user(),
                ControlBag::new(),
            )
            .await
            .unwrap();
        assert_eq!(found.get("cn").unwrap().first_text(), Some("x"));
    }

    #[tokio::test]
    async fn test_root_dse_read() {
        let (_, session) = test_service_with(
            InterceptorRegistry::new(),
            ChainConfig::new(vec![]),
            SeededPartition::default(),
        );
        let root = session.root_dse().await.unwrap();
        assert!(root.dn().is_root());
        assert!(root.get("vendorName").is_some());
    }

    #[tokio::test]
    async fn test_service_rejects_invalid_chain() {
        let config = PipelineConfig::default(); // standard chains, nothing registered
        let result = DirectoryService::new(
            config,
            Arc::new(arbor_core::CoreSchema::new()),
            InterceptorRegistry::new(),
            Arc::new(SeededPartition::default()),
            None,
        );
        assert!(result.is_err());
    }
}
