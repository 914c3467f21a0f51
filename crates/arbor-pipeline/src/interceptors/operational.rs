//! Operational Attribute Stage
//!
//! Stamps server-maintained attributes: `createTimestamp`, `creatorsName`
//! and `entryUUID` on add; `modifyTimestamp` and `modifiersName` on
//! modify. Timestamp maintenance for moved and renamed entries belongs to
//! the partition, which rewrites the stored entry.

use crate::chain::{ChainOutcome, ChainRunner};
use crate::context::OperationContext;
use crate::interceptor::Interceptor;
use crate::ops::Operation;
use arbor_core::{Attribute, DirectoryResult, Modification, ModificationOp};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

/// LDAP generalized-time form of the current instant.
fn now_generalized() -> String {
    Utc::now().format("%Y%m%d%H%M%SZ").to_string()
}

/// Stamps server-maintained attributes on change operations.
#[derive(Debug, Default, Clone, Copy)]
pub struct OperationalAttributeInterceptor;

impl OperationalAttributeInterceptor {
    /// An operational-attribute stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Interceptor for OperationalAttributeInterceptor {
    async fn add(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        let principal = ctx.effective_principal().name;
        if let Operation::Add(payload) = ctx.operation_mut() {
            payload
                .entry
                .put(Attribute::with_value("createTimestamp", now_generalized()));
            payload
                .entry
                .put(Attribute::with_value("creatorsName", principal));
            payload
                .entry
                .put(Attribute::with_value("entryUUID", Uuid::new_v4().to_string()));
        }
        next.proceed(ctx).await
    }

    async fn modify(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        let principal = ctx.effective_principal().name;
        if let Operation::Modify(payload) = ctx.operation_mut() {
            payload.mods.push(Modification::new(
                ModificationOp::Replace,
                Attribute::with_value("modifyTimestamp", now_generalized()),
            ));
            payload.mods.push(Modification::new(
                ModificationOp::Replace,
                Attribute::with_value("modifiersName", principal),
            ));
        }
        next.proceed(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generalized_time_shape() {
        let stamp = now_generalized();
        // YYYYMMDDHHMMSSZ
        assert_eq!(stamp.len(), 15);
        assert!(stamp.ends_with('Z'));
        assert!(stamp[..14].chars().all(|c| c.is_ascii_digit()));
    }
}
