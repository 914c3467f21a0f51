//! Pipeline Configuration
//!
//! Deserializable configuration for a directory-service instance: the
//! interceptor chains per operation kind plus the identity advertised in
//! the root DSE. Resolved and validated once at startup; read-only from
//! the perspective of request processing.

use crate::chain::ChainConfig;
use crate::controls::{MANAGE_DSA_IT_OID, SUBTREE_DELETE_OID};
use crate::interceptor::InterceptorRegistry;
use arbor_core::{Attribute, DirectoryResult, Dn, Entry};
use serde::{Deserialize, Serialize};

/// Configuration for one directory-service instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Vendor name advertised in the root DSE.
    #[serde(default = "default_vendor_name")]
    pub vendor_name: String,

    /// Vendor version advertised in the root DSE.
    #[serde(default = "default_vendor_version")]
    pub vendor_version: String,

    /// Naming contexts advertised in the root DSE.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub naming_contexts: Vec<String>,

    /// Interceptor chains per operation kind.
    #[serde(default)]
    pub chains: ChainConfig,
}

fn default_vendor_name() -> String {
    "arbor".to_string()
}

fn default_vendor_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vendor_name: default_vendor_name(),
            vendor_version: default_vendor_version(),
            naming_contexts: Vec::new(),
            chains: ChainConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate the configuration against the stage registry: every
    /// configured chain must resolve, and every naming context must be a
    /// well-formed DN.
    pub fn validate(&self, registry: &InterceptorRegistry) -> DirectoryResult<()> {
        self.chains.validate(registry)?;
        for context in &self.naming_contexts {
            context.parse::<Dn>()?;
        }
        Ok(())
    }

    /// Build the root DSE entry this configuration advertises.
    #[must_use]
    pub fn build_root_dse(&self) -> Entry {
        let mut root = Entry::new(Dn::root());
        root.put(Attribute::with_values(
            "objectClass",
            ["top", "extensibleObject"],
        ));
        root.put(Attribute::with_value("vendorName", self.vendor_name.as_str()));
        root.put(Attribute::with_value(
            "vendorVersion",
            self.vendor_version.as_str(),
        ));
        root.put(Attribute::with_value("supportedLDAPVersion", "3"));
        root.put(Attribute::with_values(
            "supportedControl",
            [MANAGE_DSA_IT_OID, SUBTREE_DELETE_OID],
        ));
        if !self.naming_contexts.is_empty() {
            root.put(Attribute::with_values(
                "namingContexts",
                self.naming_contexts.iter().map(String::as_str),
            ));
        }
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainConfig;

    #[test]
    fn test_default_config_builds_root_dse() {
        let config = PipelineConfig::default();
        let root = config.build_root_dse();
        assert!(root.dn().is_root());
        assert_eq!(root.get("vendorName").unwrap().first_text(), Some("arbor"));
        assert!(root.get("namingContexts").is_none());
    }

    #[test]
    fn test_naming_contexts_advertised() {
        let config = PipelineConfig {
            naming_contexts: vec!["dc=example,dc=com".to_string()],
            ..PipelineConfig::default()
        };
        let root = config.build_root_dse();
        assert_eq!(
            root.get("namingContexts").unwrap().first_text(),
            Some("dc=example,dc=com")
        );
    }

    #[test]
    fn test_validate_rejects_bad_naming_context() {
        let config = PipelineConfig {
            naming_contexts: vec!["not a dn".to_string()],
            chains: ChainConfig::new(vec![]),
            ..PipelineConfig::default()
        };
        assert!(config.validate(&InterceptorRegistry::new()).is_err());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.vendor_name, "arbor");
        assert!(!config.chains.chain_for(crate::ops::OperationKind::Add).is_empty());
    }
}
