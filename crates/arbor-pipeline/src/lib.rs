//! # arbor-pipeline
//!
//! The operation pipeline of the arbor directory server core: every
//! directory operation is a typed, mutable [`OperationContext`] threaded
//! by reference through an ordered chain of pluggable interceptors, each
//! of which may read, transform, short-circuit or reject the operation
//! before it reaches the partition backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐    ┌───────────────────────────────────────┐    ┌───────────┐
//! │ CoreSession│───►│ normalization ► referral ► ... chain  │───►│ Partition │
//! │ (context)  │    │        (ChainRunner dispatch)         │    │ (backend) │
//! └────────────┘    └───────────────────────────────────────┘    └───────────┘
//!                          │ collateral lookups bypass the chain ▲
//!                          └──────── OperationManager ───────────┘
//! ```
//!
//! ## Features
//!
//! - **Operation contexts**: one tagged variant per operation kind, with
//!   shared chain/control/referral state and per-kind payloads
//! - **Chain dispatch**: configured stage order per operation kind,
//!   bypass sets, terminal hand-off to the partition
//! - **Referral policy**: throw (enumerating rewritten URLs for the
//!   nearest referring ancestor) or ignore (manage-DSA-IT)
//! - **Attribute selection**: `*`/`+`/`1.1` resolution with silent drops
//! - **Boundary contracts**: partition, changelog sink, schema view
//!
//! ## Example
//!
//! ```ignore
//! use arbor_pipeline::prelude::*;
//!
//! let registry = InterceptorRegistry::new()
//!     .with(InterceptorId::Normalization, Arc::new(NormalizationInterceptor::new(schema.clone())))
//!     .with(InterceptorId::Referral, Arc::new(ReferralInterceptor::new()));
//! let service = DirectoryService::new(config, schema, registry, partition, None)?;
//! let session = CoreSession::anonymous(service);
//!
//! session.add(entry, ControlBag::new()).await?;
//! ```

pub mod chain;
pub mod changelog;
pub mod config;
pub mod context;
pub mod controls;
pub mod interceptor;
pub mod interceptors;
pub mod ops;
pub mod partition;
pub mod referral;
pub mod select;
pub mod session;

#[cfg(test)]
pub(crate) mod testkit;

// Re-export main types for convenient access
pub use chain::{ChainConfig, ChainOutcome, ChainRunner};
pub use changelog::{ChangeKind, ChangeRecord, ChangelogSink};
pub use config::PipelineConfig;
pub use context::{ChainStep, OperationContext};
pub use controls::{Control, ControlBag, MANAGE_DSA_IT_OID, SUBTREE_DELETE_OID};
pub use interceptor::{Interceptor, InterceptorId, InterceptorRegistry};
pub use ops::{
    AliasDerefMode, BindMechanism, FilterNode, Operation, OperationKind, SearchPayload,
    SearchScope,
};
pub use partition::{EntryCursor, Partition};
pub use referral::{ReferralHandling, ReferralManager};
pub use select::{AttributeSelection, SelectedAttribute};
pub use session::{AuthLevel, CoreSession, DirectoryService, OperationManager, Principal};

/// Prelude module for convenient imports.
///
/// ```
/// use arbor_pipeline::prelude::*;
/// ```
pub mod prelude {
    pub use crate::chain::{ChainConfig, ChainOutcome, ChainRunner};
    pub use crate::changelog::{ChangeKind, ChangeRecord, ChangelogSink};
    pub use crate::config::PipelineConfig;
    pub use crate::context::{ChainStep, OperationContext};
    pub use crate::controls::{Control, ControlBag, MANAGE_DSA_IT_OID};
    pub use crate::interceptor::{Interceptor, InterceptorId, InterceptorRegistry};
    pub use crate::interceptors::{
        ChangelogInterceptor, NormalizationInterceptor, OperationalAttributeInterceptor,
        ReferralInterceptor,
    };
    pub use crate::ops::{
        AliasDerefMode, BindMechanism, FilterNode, Operation, OperationKind, SearchPayload,
        SearchScope,
    };
    pub use crate::partition::{EntryCursor, Partition};
    pub use crate::referral::{ReferralHandling, ReferralManager};
    pub use crate::select::AttributeSelection;
    pub use crate::session::{AuthLevel, CoreSession, DirectoryService, OperationManager, Principal};

    pub use arbor_core::{
        Attribute, AttributeValue, DirectoryError, DirectoryResult, Dn, Entry, Modification,
        ModificationOp, Rdn, ReferralOutcome, SchemaView,
    };
}
