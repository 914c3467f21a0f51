//! Schema View
//!
//! The narrow schema contract the pipeline needs: resolving attribute
//! names or OIDs to canonical attribute-type descriptors. Resolution
//! failure is non-fatal by contract; callers that require a resolvable
//! type (modify validation) turn a miss into their own error.
//!
//! [`CoreSchema`] keeps its lookup cache instance-owned and lazily
//! populated, scoped to the schema component's lifetime rather than held
//! in process-wide statics, so independent service instances (and tests)
//! never observe each other's resolutions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Canonical descriptor for an attribute type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeType {
    /// All names this type answers to; the first is canonical.
    pub names: Vec<String>,
    /// The numeric OID.
    pub oid: String,
    /// Whether clients may modify values of this type.
    pub user_modifiable: bool,
    /// Whether this is an operational (server-maintained) attribute.
    pub operational: bool,
}

impl AttributeType {
    /// Create a user attribute type.
    #[must_use]
    pub fn user(names: &[&str], oid: &str) -> Self {
        Self {
            names: names.iter().map(ToString::to_string).collect(),
            oid: oid.to_string(),
            user_modifiable: true,
            operational: false,
        }
    }

    /// Create an operational attribute type.
    #[must_use]
    pub fn operational(names: &[&str], oid: &str) -> Self {
        Self {
            names: names.iter().map(ToString::to_string).collect(),
            oid: oid.to_string(),
            user_modifiable: false,
            operational: true,
        }
    }

    /// The canonical (first) name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.names[0]
    }
}

/// Resolution contract consumed by the pipeline.
pub trait SchemaView: Send + Sync {
    /// Resolve an attribute name or OID (options already stripped) to its
    /// descriptor. `None` when unknown; never an error.
    fn resolve(&self, name_or_oid: &str) -> Option<AttributeType>;
}

/// Strip attribute options (`;binary`, `;lang-en`) from a requested name,
/// returning the bare name and the options in request order.
#[must_use]
pub fn strip_options(requested: &str) -> (&str, Vec<&str>) {
    let mut parts = requested.split(';');
    let name = parts.next().unwrap_or_default();
    (name, parts.filter(|o| !o.is_empty()).collect())
}

/// In-memory schema registry with a lazily populated resolution cache.
///
/// Seeds the attribute types a bare pipeline needs; embedders register
/// the rest at service configuration time.
pub struct CoreSchema {
    types: Vec<AttributeType>,
    // negative results are cached too, so repeated unknown-attribute
    // lookups from the selection logic stay cheap
    cache: RwLock<HashMap<String, Option<AttributeType>>>,
}

impl CoreSchema {
    /// A schema holding only the built-in attribute types.
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: builtin_types(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// An empty schema (tests and embedders that seed everything).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            types: Vec::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Register an attribute type. Clears the cache so stale negative
    /// results do not mask the registration.
    pub fn register(&mut self, attribute_type: AttributeType) {
        self.types.push(attribute_type);
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for CoreSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaView for CoreSchema {
    fn resolve(&self, name_or_oid: &str) -> Option<AttributeType> {
        let key = name_or_oid.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        if let Ok(cache) = self.cache.read() {
            if let Some(hit) = cache.get(&key) {
                return hit.clone();
            }
        }
        let found = self.types.iter().find(|t| {
            t.oid == key || t.names.iter().any(|n| n.to_lowercase() == key)
        });
        let result = found.cloned();
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, result.clone());
        }
        result
    }
}

fn builtin_types() -> Vec<AttributeType> {
    vec![
        AttributeType::user(&["objectClass"], "2.5.4.0"),
        AttributeType::user(&["cn", "commonName"], "2.5.4.3"),
        AttributeType::user(&["sn", "surname"], "2.5.4.4"),
        AttributeType::user(&["ou", "organizationalUnitName"], "2.5.4.11"),
        AttributeType::user(&["dc", "domainComponent"], "0.9.2342.19200300.100.1.25"),
        AttributeType::user(&["uid", "userid"], "0.9.2342.19200300.100.1.1"),
        AttributeType::user(&["member"], "2.5.4.31"),
        AttributeType::user(&["description"], "2.5.4.13"),
        AttributeType::user(&["ref"], "2.16.840.1.113730.3.1.34"),
        AttributeType::operational(&["createTimestamp"], "2.5.18.1"),
        AttributeType::operational(&["modifyTimestamp"], "2.5.18.2"),
        AttributeType::operational(&["creatorsName"], "2.5.18.3"),
        AttributeType::operational(&["modifiersName"], "2.5.18.4"),
        AttributeType::operational(&["entryUUID"], "1.3.6.1.1.16.4"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_name_case_insensitive() {
        let schema = CoreSchema::new();
        let cn = schema.resolve("CN").unwrap();
        assert_eq!(cn.name(), "cn");
        assert!(cn.user_modifiable);
    }

    #[test]
    fn test_resolve_by_alias_and_oid() {
        let schema = CoreSchema::new();
        assert_eq!(schema.resolve("commonName").unwrap().oid, "2.5.4.3");
        assert_eq!(schema.resolve("2.5.4.3").unwrap().name(), "cn");
    }

    #[test]
    fn test_resolve_unknown_is_none() {
        let schema = CoreSchema::new();
        assert!(schema.resolve("noSuchAttribute").is_none());
        // cached negative result stays consistent
        assert!(schema.resolve("noSuchAttribute").is_none());
    }

    #[test]
    fn test_register_clears_negative_cache() {
        let mut schema = CoreSchema::empty();
        assert!(schema.resolve("mail").is_none());
        schema.register(AttributeType::user(&["mail"], "0.9.2342.19200300.100.1.3"));
        assert_eq!(schema.resolve("mail").unwrap().name(), "mail");
    }

    #[test]
    fn test_operational_flag() {
        let schema = CoreSchema::new();
        assert!(schema.resolve("createTimestamp").unwrap().operational);
        assert!(!schema.resolve("cn").unwrap().operational);
    }

    #[test]
    fn test_strip_options() {
        assert_eq!(strip_options("cn"), ("cn", vec![]));
        assert_eq!(strip_options("cn;lang-en"), ("cn", vec!["lang-en"]));
        let (name, opts) = strip_options("userCertificate;binary;x-opt");
        assert_eq!(name, "userCertificate");
        assert_eq!(opts, vec!["binary", "x-opt"]);
    }

    #[test]
    fn test_instances_do_not_share_cache() {
        let a = CoreSchema::empty();
        let mut b = CoreSchema::empty();
        b.register(AttributeType::user(&["mail"], "0.9.2342.19200300.100.1.3"));
        assert!(a.resolve("mail").is_none());
        assert!(b.resolve("mail").is_some());
    }
}
