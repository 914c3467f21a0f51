//! DN Normalization Stage
//!
//! Rewrites every DN and RDN the operation carries so attribute types use
//! their canonical schema names (`commonName` becomes `cn`). Runs before
//! any stage that compares or stores names; unknown attribute types are
//! left as given.

use crate::chain::{ChainOutcome, ChainRunner};
use crate::context::OperationContext;
use crate::interceptor::Interceptor;
use crate::ops::Operation;
use arbor_core::{Ava, DirectoryResult, Dn, Rdn, SchemaView};
use async_trait::async_trait;
use std::sync::Arc;

/// Normalizes target and payload names against the schema.
pub struct NormalizationInterceptor {
    schema: Arc<dyn SchemaView>,
}

impl NormalizationInterceptor {
    /// A stage resolving against the given schema view.
    #[must_use]
    pub fn new(schema: Arc<dyn SchemaView>) -> Self {
        Self { schema }
    }

    fn normalize_ava(&self, ava: &Ava) -> Ava {
        match self.schema.resolve(ava.attr()) {
            Some(attribute_type) => Ava::new(attribute_type.name(), ava.value()),
            None => ava.clone(),
        }
    }

    fn normalize_rdn(&self, rdn: &Rdn) -> Rdn {
        let avas = rdn.avas().iter().map(|ava| self.normalize_ava(ava)).collect();
        Rdn::from_avas(avas).unwrap_or_else(|_| rdn.clone())
    }

    fn normalize_dn(&self, dn: &Dn) -> Dn {
        Dn::from_rdns(dn.rdns().iter().map(|rdn| self.normalize_rdn(rdn)).collect())
    }

    fn normalize_context(&self, ctx: &mut OperationContext) {
        if let Some(target) = ctx.target_dn() {
            let normalized = self.normalize_dn(target);
            ctx.set_target_dn(normalized);
        }
        match ctx.operation_mut() {
            Operation::Add(payload) => {
                let dn = payload.entry.dn().clone();
                payload.entry.set_dn(self.normalize_dn(&dn));
            }
            Operation::Move(payload) => {
                payload.new_superior = self.normalize_dn(&payload.new_superior);
            }
            Operation::Rename(payload) => {
                payload.new_rdn = self.normalize_rdn(&payload.new_rdn);
            }
            Operation::MoveAndRename(payload) => {
                payload.new_superior = self.normalize_dn(&payload.new_superior);
                payload.new_rdn = self.normalize_rdn(&payload.new_rdn);
            }
            Operation::Compare(payload) => {
                if let Some(attribute_type) = self.schema.resolve(&payload.attribute) {
                    payload.attribute = attribute_type.name().to_string();
                }
            }
            _ => {}
        }
    }
}

#[async_trait]
impl Interceptor for NormalizationInterceptor {
    async fn add(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.normalize_context(ctx);
        next.proceed(ctx).await
    }

    async fn delete(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.normalize_context(ctx);
        next.proceed(ctx).await
    }

    async fn modify(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.normalize_context(ctx);
        next.proceed(ctx).await
    }

    async fn rename(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.normalize_context(ctx);
        next.proceed(ctx).await
    }

    async fn move_entry(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.normalize_context(ctx);
        next.proceed(ctx).await
    }

    async fn move_and_rename(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.normalize_context(ctx);
        next.proceed(ctx).await
    }

    async fn compare(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.normalize_context(ctx);
        next.proceed(ctx).await
    }

    async fn bind(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.normalize_context(ctx);
        next.proceed(ctx).await
    }

    async fn lookup(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.normalize_context(ctx);
        next.proceed(ctx).await
    }

    async fn list(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.normalize_context(ctx);
        next.proceed(ctx).await
    }

    async fn search(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.normalize_context(ctx);
        next.proceed(ctx).await
    }

    async fn entry_exists(
        &self,
        next: &mut ChainRunner<'_>,
        ctx: &mut OperationContext,
    ) -> DirectoryResult<ChainOutcome> {
        self.normalize_context(ctx);
        next.proceed(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::CoreSchema;

    fn interceptor() -> NormalizationInterceptor {
        NormalizationInterceptor::new(Arc::new(CoreSchema::new()))
    }

    #[test]
    fn test_normalize_dn_canonicalizes_attr_names() {
        let dn: Dn = "commonName=John,organizationalUnitName=people,dc=example"
            .parse()
            .unwrap();
        let normalized = interceptor().normalize_dn(&dn);
        assert_eq!(normalized.to_string(), "cn=John,ou=people,dc=example");
    }

    #[test]
    fn test_unknown_attr_left_as_given() {
        let dn: Dn = "x-custom=1,dc=example".parse().unwrap();
        let normalized = interceptor().normalize_dn(&dn);
        assert_eq!(normalized.to_string(), "x-custom=1,dc=example");
    }

    #[test]
    fn test_values_survive_normalization() {
        let rdn: Rdn = "commonName=Doe\\, John".parse().unwrap();
        let normalized = interceptor().normalize_rdn(&rdn);
        assert_eq!(normalized.ava().attr(), "cn");
        assert_eq!(normalized.ava().value(), "Doe, John");
    }
}
