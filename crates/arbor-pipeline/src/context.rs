//! Operation Contexts
//!
//! One [`OperationContext`] is created per client request (or per internal
//! collateral operation), threaded by `&mut` reference through the
//! interceptor chain, and discarded after the backend completes. The
//! shared per-request state lives here; operation-specific parameters live
//! in the [`Operation`] payload variants.
//!
//! Contexts are not designed for concurrent advancement: a single request
//! is one logical thread of control, and the only state shared between
//! concurrent requests is the read-only chain registry and the partition.

use crate::controls::{Control, ControlBag, MANAGE_DSA_IT_OID, SUBTREE_DELETE_OID};
use crate::interceptor::InterceptorId;
use crate::ops::{
    compute_mod_avas, validate_new_rdn, validate_new_superior, AddPayload, BindMechanism,
    BindPayload, ComparePayload, DeletePayload, LookupPayload, ModifyPayload,
    MoveAndRenamePayload, MovePayload, Operation, OperationKind, RenamePayload, SearchPayload,
};
use crate::referral::ReferralHandling;
use crate::select::AttributeSelection;
use crate::session::{CoreSession, Principal};
use arbor_core::{
    AttributeValue, DirectoryError, DirectoryResult, Dn, Entry, Modification, OperationId, Rdn,
};
use std::sync::Arc;
use tracing::debug;

/// One step of chain traversal: the next configured stage, or the
/// terminal sentinel handing off to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStep {
    /// The interceptor at the current cursor position.
    Stage(InterceptorId),
    /// The chain is exhausted; the backend executes next.
    Terminal,
}

/// The mutable per-request value object carrying operation parameters and
/// pipeline state.
#[derive(Debug, Clone)]
pub struct OperationContext {
    id: OperationId,
    session: Arc<CoreSession>,
    target_dn: Option<Dn>,
    request_controls: ControlBag,
    response_controls: ControlBag,
    interceptors: Vec<InterceptorId>,
    cursor: usize,
    authorized_principal: Option<Principal>,
    // None exactly when the operation kind carries no referral policy
    // (bind)
    referral_handling: Option<ReferralHandling>,
    entry: Option<Entry>,
    original_entry: Option<Entry>,
    log_change: bool,
    operation: Operation,
}

impl OperationContext {
    fn new(session: Arc<CoreSession>, target_dn: Option<Dn>, operation: Operation) -> Self {
        let kind = operation.kind();
        Self {
            id: OperationId::new(),
            session,
            target_dn,
            request_controls: ControlBag::new(),
            response_controls: ControlBag::new(),
            interceptors: Vec::new(),
            cursor: 0,
            authorized_principal: None,
            referral_handling: kind
                .supports_referral_policy()
                .then_some(ReferralHandling::Throw),
            entry: None,
            original_entry: None,
            log_change: kind.is_change(),
            operation,
        }
    }

    /// Context for adding `entry`.
    pub fn add(session: Arc<CoreSession>, entry: Entry) -> DirectoryResult<Self> {
        if entry.dn().is_root() {
            return Err(DirectoryError::InvalidRequest {
                message: "cannot add an entry at the root DSE".to_string(),
            });
        }
        let target = entry.dn().clone();
        Ok(Self::new(
            session,
            Some(target),
            Operation::Add(AddPayload { entry }),
        ))
    }

    /// Context for deleting the entry at `dn`.
    #[must_use]
    pub fn delete(session: Arc<CoreSession>, dn: Dn) -> Self {
        Self::new(
            session,
            Some(dn),
            Operation::Delete(DeletePayload { leaf_only: true }),
        )
    }

    /// Context for modifying the entry at `dn`.
    pub fn modify(
        session: Arc<CoreSession>,
        dn: Dn,
        mods: Vec<Modification>,
    ) -> DirectoryResult<Self> {
        if mods.is_empty() {
            return Err(DirectoryError::InvalidRequest {
                message: "modify requires at least one modification".to_string(),
            });
        }
        Ok(Self::new(
            session,
            Some(dn),
            Operation::Modify(ModifyPayload {
                mods,
                original_mods: None,
            }),
        ))
    }

    /// Context for renaming the entry at `dn` to `new_rdn`.
    pub fn rename(
        session: Arc<CoreSession>,
        dn: Dn,
        new_rdn: Rdn,
        delete_old_rdn: bool,
    ) -> DirectoryResult<Self> {
        validate_new_rdn(&dn, &new_rdn)?;
        let old_rdn = dn.rdn().cloned().ok_or_else(|| DirectoryError::InvalidRequest {
            message: "rename target has no RDN".to_string(),
        })?;
        let mod_avas = compute_mod_avas(&old_rdn, &new_rdn, delete_old_rdn);
        Ok(Self::new(
            session,
            Some(dn),
            Operation::Rename(RenamePayload {
                new_rdn,
                delete_old_rdn,
                mod_avas,
            }),
        ))
    }

    /// Context for moving the entry at `dn` under `new_superior`.
    pub fn move_entry(
        session: Arc<CoreSession>,
        dn: Dn,
        new_superior: Dn,
    ) -> DirectoryResult<Self> {
        validate_new_superior(&dn, &new_superior)?;
        Ok(Self::new(
            session,
            Some(dn),
            Operation::Move(MovePayload { new_superior }),
        ))
    }

    /// Context for a combined move and rename.
    pub fn move_and_rename(
        session: Arc<CoreSession>,
        dn: Dn,
        new_superior: Dn,
        new_rdn: Rdn,
        delete_old_rdn: bool,
    ) -> DirectoryResult<Self> {
        validate_new_superior(&dn, &new_superior)?;
        validate_new_rdn(&dn, &new_rdn)?;
        let old_rdn = dn.rdn().cloned().ok_or_else(|| DirectoryError::InvalidRequest {
            message: "move-and-rename target has no RDN".to_string(),
        })?;
        let mod_avas = compute_mod_avas(&old_rdn, &new_rdn, delete_old_rdn);
        Ok(Self::new(
            session,
            Some(dn),
            Operation::MoveAndRename(MoveAndRenamePayload {
                new_superior,
                new_rdn,
                delete_old_rdn,
                mod_avas,
            }),
        ))
    }

    /// Context for comparing an asserted value at `dn`.
    #[must_use]
    pub fn compare(
        session: Arc<CoreSession>,
        dn: Dn,
        attribute: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        Self::new(
            session,
            Some(dn),
            Operation::Compare(ComparePayload {
                attribute: attribute.into(),
                value: value.into(),
            }),
        )
    }

    /// Context for a bind. Bind contexts carry no referral policy; the
    /// referral accessors fail fast on them.
    #[must_use]
    pub fn bind(
        session: Arc<CoreSession>,
        dn: Option<Dn>,
        mechanism: BindMechanism,
        credentials: Vec<u8>,
    ) -> Self {
        Self::new(
            session,
            dn,
            Operation::Bind(BindPayload {
                mechanism,
                credentials,
            }),
        )
    }

    /// Context for a single-entry lookup.
    #[must_use]
    pub fn lookup(session: Arc<CoreSession>, dn: Dn, selection: AttributeSelection) -> Self {
        Self::new(
            session,
            Some(dn),
            Operation::Lookup(LookupPayload { selection }),
        )
    }

    /// Context for listing the children of `dn`.
    #[must_use]
    pub fn list(session: Arc<CoreSession>, dn: Dn) -> Self {
        Self::new(session, Some(dn), Operation::List)
    }

    /// Context for a search based at `dn`.
    #[must_use]
    pub fn search(session: Arc<CoreSession>, dn: Dn, payload: SearchPayload) -> Self {
        Self::new(session, Some(dn), Operation::Search(payload))
    }

    /// Context for reading the root DSE.
    #[must_use]
    pub fn root_dse(session: Arc<CoreSession>) -> Self {
        Self::new(session, Some(Dn::root()), Operation::GetRootDse)
    }

    /// Context for an existence check at `dn`.
    #[must_use]
    pub fn entry_exists(session: Arc<CoreSession>, dn: Dn) -> Self {
        Self::new(session, Some(dn), Operation::EntryExists)
    }

    /// Attach the decoded request controls and derive the control-driven
    /// state: the referral policy (manage-DSA-IT) and the subtree-delete
    /// flag. Part of construction; the request side is immutable once the
    /// chain runs.
    #[must_use]
    pub fn with_controls(mut self, controls: ControlBag) -> Self {
        if self.kind().supports_referral_policy() {
            self.referral_handling = Some(if controls.has(MANAGE_DSA_IT_OID) {
                ReferralHandling::Ignore
            } else {
                ReferralHandling::Throw
            });
        }
        if let Operation::Delete(payload) = &mut self.operation {
            payload.leaf_only = !controls.has(SUBTREE_DELETE_OID);
        }
        self.request_controls = controls;
        self
    }

    // ------------------------------------------------------------------
    // identity and shared state

    /// The operation's unique id.
    #[must_use]
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// The originating session. Shared, not owned; a context's lifetime
    /// is always shorter than its session's.
    #[must_use]
    pub fn session(&self) -> &Arc<CoreSession> {
        &self.session
    }

    /// The operation kind tag.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    /// The operation payload.
    #[must_use]
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Mutable access to the operation payload (normalization and schema
    /// stages rewrite it in place).
    pub fn operation_mut(&mut self) -> &mut Operation {
        &mut self.operation
    }

    /// The DN this operation addresses, if any.
    #[must_use]
    pub fn target_dn(&self) -> Option<&Dn> {
        self.target_dn.as_ref()
    }

    /// Rewrite the target DN (normalization).
    pub fn set_target_dn(&mut self, dn: Dn) {
        self.target_dn = Some(dn);
    }

    /// The principal this operation is executed as: the explicit
    /// authorized-principal override when one is set (collateral
    /// sub-operations), the session principal otherwise.
    #[must_use]
    pub fn effective_principal(&self) -> Principal {
        self.authorized_principal
            .clone()
            .unwrap_or_else(|| self.session.principal().clone())
    }

    /// Set the authorized-principal override.
    pub fn set_authorized_principal(&mut self, principal: Principal) {
        self.authorized_principal = Some(principal);
    }

    /// Whether this change should be reported to the changelog sink.
    #[must_use]
    pub fn log_change(&self) -> bool {
        self.log_change
    }

    // ------------------------------------------------------------------
    // controls

    /// The request controls.
    #[must_use]
    pub fn request_controls(&self) -> &ControlBag {
        &self.request_controls
    }

    /// Whether a request control with the given OID is present.
    #[must_use]
    pub fn has_request_control(&self, oid: &str) -> bool {
        self.request_controls.has(oid)
    }

    /// Add or replace a response control; visible to all later stages and
    /// to the final response assembly.
    pub fn add_response_control(&mut self, control: Control) {
        self.response_controls.add(control);
    }

    /// The accumulated response controls.
    #[must_use]
    pub fn response_controls(&self) -> &ControlBag {
        &self.response_controls
    }

    /// Whether a response control with the given OID has been added.
    #[must_use]
    pub fn has_response_control(&self, oid: &str) -> bool {
        self.response_controls.has(oid)
    }

    /// Number of distinct response-control OIDs added so far.
    #[must_use]
    pub fn response_control_count(&self) -> usize {
        self.response_controls.count()
    }

    // ------------------------------------------------------------------
    // chain traversal

    /// Bind the resolved interceptor chain. Rebinding is permitted only
    /// after an explicit [`OperationContext::reset`].
    pub fn set_interceptors(&mut self, interceptors: Vec<InterceptorId>) -> DirectoryResult<()> {
        if !self.interceptors.is_empty() {
            return Err(DirectoryError::InvalidRequest {
                message: "interceptor chain is already bound; reset the context first"
                    .to_string(),
            });
        }
        self.interceptors = interceptors;
        self.cursor = 0;
        Ok(())
    }

    /// The bound chain.
    #[must_use]
    pub fn interceptors(&self) -> &[InterceptorId] {
        &self.interceptors
    }

    /// Zero-based cursor into the bound chain.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Return the stage at the cursor and advance, or the terminal
    /// sentinel once the chain is exhausted. The cursor never moves
    /// backward; calls past the end keep yielding the sentinel.
    pub fn next_interceptor(&mut self) -> ChainStep {
        if self.cursor < self.interceptors.len() {
            let id = self.interceptors[self.cursor].clone();
            self.cursor += 1;
            ChainStep::Stage(id)
        } else {
            ChainStep::Terminal
        }
    }

    // ------------------------------------------------------------------
    // entry snapshots

    /// The working entry snapshot, if one was captured.
    #[must_use]
    pub fn entry(&self) -> Option<&Entry> {
        self.entry.as_ref()
    }

    /// Capture the working entry snapshot so later stages avoid redundant
    /// backend lookups.
    pub fn set_entry(&mut self, entry: Entry) {
        self.entry = Some(entry);
    }

    /// The original entry snapshot; immutable once captured.
    #[must_use]
    pub fn original_entry(&self) -> Option<&Entry> {
        self.original_entry.as_ref()
    }

    /// Capture the original entry snapshot. The first capture wins;
    /// later calls are ignored.
    pub fn set_original_entry(&mut self, entry: Entry) {
        if self.original_entry.is_none() {
            self.original_entry = Some(entry);
        }
    }

    // ------------------------------------------------------------------
    // referral policy

    /// Whether this context kind carries a referral policy at all.
    #[must_use]
    pub fn supports_referral_policy(&self) -> bool {
        self.kind().supports_referral_policy()
    }

    fn referral_policy(&self, operation: &'static str) -> DirectoryResult<ReferralHandling> {
        self.referral_handling
            .ok_or(DirectoryError::UnsupportedOperation {
                operation,
                kind: "bind",
            })
    }

    /// Require ancestor referrals to raise a referral outcome.
    pub fn throw_referral(&mut self) -> DirectoryResult<()> {
        self.referral_policy("throw_referral")?;
        self.referral_handling = Some(ReferralHandling::Throw);
        Ok(())
    }

    /// Treat referral entries as ordinary entries for this operation.
    pub fn ignore_referral(&mut self) -> DirectoryResult<()> {
        self.referral_policy("ignore_referral")?;
        self.referral_handling = Some(ReferralHandling::Ignore);
        Ok(())
    }

    /// Whether ancestor referrals raise a referral outcome.
    pub fn is_referral_thrown(&self) -> DirectoryResult<bool> {
        Ok(self.referral_policy("is_referral_thrown")? == ReferralHandling::Throw)
    }

    /// Whether referral entries are treated as ordinary entries.
    pub fn is_referral_ignored(&self) -> DirectoryResult<bool> {
        Ok(self.referral_policy("is_referral_ignored")? == ReferralHandling::Ignore)
    }

    // ------------------------------------------------------------------
    // reset

    /// Restore the context to its pre-chain-execution state so the
    /// operation can be replayed, e.g. after a referral-triggered backend
    /// substitution. Referral handling is restored to ignore (the replay
    /// re-enters below the referral boundary) and the change is no longer
    /// reported to the changelog.
    pub fn reset(&mut self) {
        debug!(operation = %self.kind(), id = %self.id, "resetting operation context");
        self.entry = None;
        self.original_entry = None;
        self.response_controls.clear();
        self.interceptors.clear();
        self.cursor = 0;
        if self.supports_referral_policy() {
            self.referral_handling = Some(ReferralHandling::Ignore);
        }
        self.log_change = false;
        match &mut self.operation {
            Operation::Modify(payload) => payload.restore_original(),
            Operation::Rename(payload) => payload.mod_avas.clear(),
            Operation::MoveAndRename(payload) => payload.mod_avas.clear(),
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // collateral operations

    /// Perform a collateral lookup: a fresh lookup context inheriting
    /// only the authorized-principal override, executed directly against
    /// the backend's operation manager. The chain is bypassed so
    /// interceptors can read entries without re-entering the pipeline.
    pub async fn collateral_lookup(
        &self,
        dn: Dn,
        selection: AttributeSelection,
    ) -> DirectoryResult<Entry> {
        let mut ctx = OperationContext::lookup(self.session.clone(), dn, selection);
        ctx.authorized_principal = self.authorized_principal.clone();
        self.session.service().direct_lookup(&mut ctx).await
    }

    /// Collateral existence check; same contract as
    /// [`OperationContext::collateral_lookup`].
    pub async fn collateral_exists(&self, dn: Dn) -> DirectoryResult<bool> {
        let mut ctx = OperationContext::entry_exists(self.session.clone(), dn);
        ctx.authorized_principal = self.authorized_principal.clone();
        self.session.service().direct_has_entry(&mut ctx).await
    }

    /// Perform a collateral delete; same contract as
    /// [`OperationContext::collateral_lookup`].
    pub async fn collateral_delete(&self, dn: Dn) -> DirectoryResult<()> {
        let mut ctx = OperationContext::delete(self.session.clone(), dn);
        ctx.authorized_principal = self.authorized_principal.clone();
        self.session.service().direct_delete(&mut ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::test_session;
    use arbor_core::{Attribute, ModificationOp};

    fn dn(s: &str) -> Dn {
        s.parse().unwrap()
    }

    fn sample_entry(dn_str: &str) -> Entry {
        Entry::new(dn(dn_str)).with(Attribute::with_value("objectClass", "person"))
    }

    #[test]
    fn test_chain_exhaustion() {
        let session = test_session();
        let mut ctx = OperationContext::delete(session, dn("cn=x,dc=example"));
        let chain = vec![
            InterceptorId::Normalization,
            InterceptorId::Referral,
            InterceptorId::Changelog,
        ];
        ctx.set_interceptors(chain.clone()).unwrap();

        for expected in &chain {
            match ctx.next_interceptor() {
                ChainStep::Stage(id) => assert_eq!(id, *expected),
                ChainStep::Terminal => panic!("terminal before chain exhausted"),
            }
        }
        assert_eq!(ctx.next_interceptor(), ChainStep::Terminal);
        // calling again does not move the cursor backward
        assert_eq!(ctx.next_interceptor(), ChainStep::Terminal);
        assert_eq!(ctx.cursor(), 3);
    }

    #[test]
    fn test_rebind_requires_reset() {
        let session = test_session();
        let mut ctx = OperationContext::delete(session, dn("cn=x,dc=example"));
        ctx.set_interceptors(vec![InterceptorId::Referral]).unwrap();
        assert!(ctx.set_interceptors(vec![InterceptorId::Referral]).is_err());

        ctx.reset();
        assert!(ctx.set_interceptors(vec![InterceptorId::Referral]).is_ok());
    }

    #[test]
    fn test_response_control_idempotence() {
        let session = test_session();
        let mut ctx = OperationContext::delete(session, dn("cn=x,dc=example"));
        ctx.add_response_control(Control::new("1.2.3").with_value(vec![1]));
        ctx.add_response_control(Control::new("1.2.3").with_value(vec![2]));
        ctx.add_response_control(Control::new("4.5.6"));

        assert_eq!(ctx.response_control_count(), 2);
        assert!(ctx.has_response_control("1.2.3"));
        assert_eq!(
            ctx.response_controls().get("1.2.3").unwrap().value,
            vec![2]
        );
    }

    #[test]
    fn test_manage_dsa_it_derives_ignore() {
        let session = test_session();
        let ctx = OperationContext::delete(session.clone(), dn("cn=x,dc=example"))
            .with_controls(ControlBag::new().with(Control::manage_dsa_it()));
        assert!(ctx.is_referral_ignored().unwrap());

        let ctx = OperationContext::delete(session, dn("cn=x,dc=example"));
        assert!(ctx.is_referral_thrown().unwrap());
    }

    #[test]
    fn test_subtree_delete_control_clears_leaf_only() {
        let session = test_session();
        let ctx = OperationContext::delete(session, dn("ou=a,dc=example"))
            .with_controls(ControlBag::new().with(Control::subtree_delete()));
        match ctx.operation() {
            Operation::Delete(payload) => assert!(!payload.leaf_only),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_bind_referral_ops_unsupported() {
        let session = test_session();
        let mut ctx =
            OperationContext::bind(session, Some(dn("cn=admin,dc=example")), BindMechanism::Simple, b"secret".to_vec());

        assert!(!ctx.supports_referral_policy());
        for result in [
            ctx.throw_referral().err(),
            ctx.ignore_referral().err(),
            ctx.is_referral_thrown().err(),
            ctx.is_referral_ignored().err(),
        ] {
            match result {
                Some(DirectoryError::UnsupportedOperation { kind, .. }) => {
                    assert_eq!(kind, "bind");
                }
                other => panic!("expected unsupported-operation, got {other:?}"),
            }
        }
        // repeated calls keep failing with no side effect
        assert!(ctx.is_referral_thrown().is_err());
    }

    #[test]
    fn test_modify_reset_round_trip() {
        let session = test_session();
        let original = vec![Modification::new(
            ModificationOp::Add,
            Attribute::with_value("description", "one"),
        )];
        let mut ctx =
            OperationContext::modify(session, dn("cn=x,dc=example"), original.clone()).unwrap();

        if let Operation::Modify(payload) = ctx.operation_mut() {
            payload.save_original();
            payload.mods.push(Modification::new(
                ModificationOp::Remove,
                Attribute::with_value("description", "two"),
            ));
            payload.mods[0] = Modification::new(
                ModificationOp::Replace,
                Attribute::with_value("description", "mutated"),
            );
        }
        ctx.reset();

        match ctx.operation() {
            Operation::Modify(payload) => assert_eq!(payload.mods, original),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_reset_restores_shared_state() {
        let session = test_session();
        let mut ctx = OperationContext::delete(session, dn("cn=x,dc=example"));
        ctx.set_interceptors(vec![InterceptorId::Referral]).unwrap();
        ctx.next_interceptor();
        ctx.set_entry(sample_entry("cn=x,dc=example"));
        ctx.set_original_entry(sample_entry("cn=x,dc=example"));
        ctx.add_response_control(Control::new("1.2.3"));
        assert!(ctx.log_change());

        ctx.reset();

        assert!(ctx.entry().is_none());
        assert!(ctx.original_entry().is_none());
        assert_eq!(ctx.response_control_count(), 0);
        assert_eq!(ctx.cursor(), 0);
        assert!(ctx.interceptors().is_empty());
        assert!(ctx.is_referral_ignored().unwrap());
        assert!(!ctx.log_change());
    }

    #[test]
    fn test_original_entry_first_capture_wins() {
        let session = test_session();
        let mut ctx = OperationContext::delete(session, dn("cn=x,dc=example"));
        let first = sample_entry("cn=x,dc=example");
        let mut second = sample_entry("cn=x,dc=example");
        second.add_value("description", "later");

        ctx.set_original_entry(first.clone());
        ctx.set_original_entry(second);
        assert_eq!(ctx.original_entry(), Some(&first));
    }

    #[test]
    fn test_construction_errors() {
        let session = test_session();

        let err = OperationContext::add(session.clone(), Entry::new(Dn::root())).unwrap_err();
        assert!(err.is_construction_error());

        let err = OperationContext::modify(session.clone(), dn("cn=x,dc=example"), vec![])
            .unwrap_err();
        assert!(err.is_construction_error());

        let err = OperationContext::move_entry(
            session.clone(),
            dn("ou=a,dc=example"),
            Dn::root(),
        )
        .unwrap_err();
        assert!(err.is_construction_error());

        let err = OperationContext::move_and_rename(
            session,
            dn("ou=a,dc=example"),
            dn("ou=b,ou=a,dc=example"),
            "cn=z".parse().unwrap(),
            true,
        )
        .unwrap_err();
        assert!(err.is_construction_error());
    }

    #[test]
    fn test_rename_computes_mod_avas() {
        let session = test_session();
        let ctx = OperationContext::rename(
            session,
            dn("cn=old,dc=example"),
            "cn=new".parse().unwrap(),
            true,
        )
        .unwrap();
        match ctx.operation() {
            Operation::Rename(payload) => {
                assert_eq!(payload.mod_avas.len(), 2);
                assert!(payload.delete_old_rdn);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_effective_principal_falls_back_to_session() {
        let session = test_session();
        let mut ctx = OperationContext::delete(session.clone(), dn("cn=x,dc=example"));
        assert_eq!(ctx.effective_principal().name, session.principal().name);

        let admin = Principal::authenticated("uid=admin,ou=system");
        ctx.set_authorized_principal(admin.clone());
        assert_eq!(ctx.effective_principal().name, admin.name);
    }
}
