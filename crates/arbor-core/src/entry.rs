//! Entries and Attributes
//!
//! The in-core entry model: multi-valued attributes keyed case-insensitively
//! by attribute id, plus the modification types carried by modify and
//! modify-DN operations.

use crate::dn::{Ava, Dn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Object class marking an entry as a referral.
pub const REFERRAL_OBJECT_CLASS: &str = "referral";

/// Attribute holding a referral entry's alternate-location URLs.
pub const REF_ATTRIBUTE: &str = "ref";

/// A single attribute value, either a directory string or raw bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A directory string, compared case-insensitively.
    Text(String),
    /// Binary data, compared byte-for-byte.
    Binary(Vec<u8>),
}

impl AttributeValue {
    /// Get as a string slice if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            AttributeValue::Binary(_) => None,
        }
    }

    /// Get the raw bytes of this value.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AttributeValue::Text(s) => s.as_bytes(),
            AttributeValue::Binary(b) => b,
        }
    }

    /// Whether this is a binary value.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self, AttributeValue::Binary(_))
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // directory-string matching ignores case
            (AttributeValue::Text(a), AttributeValue::Text(b)) => a.eq_ignore_ascii_case(b),
            (AttributeValue::Binary(a), AttributeValue::Binary(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AttributeValue {}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(bytes: Vec<u8>) -> Self {
        AttributeValue::Binary(bytes)
    }
}

/// A multi-valued attribute.
///
/// Duplicate values (under directory-string matching) are rejected on add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    id: String,
    values: Vec<AttributeValue>,
}

impl Attribute {
    /// Create an attribute with no values.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: Vec::new(),
        }
    }

    /// Create a single-valued attribute.
    #[must_use]
    pub fn with_value(id: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        let mut attr = Self::new(id);
        attr.add(value);
        attr
    }

    /// Create an attribute from several values; duplicates are dropped.
    #[must_use]
    pub fn with_values<V: Into<AttributeValue>>(
        id: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let mut attr = Self::new(id);
        for v in values {
            attr.add(v);
        }
        attr
    }

    /// The attribute id as given.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// All values, in insertion order.
    #[must_use]
    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    /// Add a value; returns `false` if an equal value was already present.
    pub fn add(&mut self, value: impl Into<AttributeValue>) -> bool {
        let value = value.into();
        if self.values.contains(&value) {
            return false;
        }
        self.values.push(value);
        true
    }

    /// Remove a value; returns `true` if it was present.
    pub fn remove(&mut self, value: &AttributeValue) -> bool {
        let before = self.values.len();
        self.values.retain(|v| v != value);
        self.values.len() != before
    }

    /// Whether an equal value is present.
    #[must_use]
    pub fn contains(&self, value: &AttributeValue) -> bool {
        self.values.contains(value)
    }

    /// The first value as text, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.values.first().and_then(AttributeValue::as_text)
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the attribute has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A directory entry: a DN plus its attributes.
///
/// Attributes are keyed by lowercased id, so `objectClass` and
/// `objectclass` address the same attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    dn: Dn,
    attributes: HashMap<String, Attribute>,
}

impl Entry {
    /// Create an entry with no attributes.
    #[must_use]
    pub fn new(dn: Dn) -> Self {
        Self {
            dn,
            attributes: HashMap::new(),
        }
    }

    /// The entry's distinguished name.
    #[must_use]
    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    /// Rewrite the entry's DN (used by move/rename application).
    pub fn set_dn(&mut self, dn: Dn) {
        self.dn = dn;
    }

    /// Insert or replace an attribute wholesale.
    pub fn put(&mut self, attribute: Attribute) {
        self.attributes
            .insert(attribute.id().to_lowercase(), attribute);
    }

    /// Builder-style [`Entry::put`].
    #[must_use]
    pub fn with(mut self, attribute: Attribute) -> Self {
        self.put(attribute);
        self
    }

    /// Add one value to an attribute, creating the attribute if absent.
    /// Returns `false` if an equal value was already present.
    pub fn add_value(&mut self, id: &str, value: impl Into<AttributeValue>) -> bool {
        self.attributes
            .entry(id.to_lowercase())
            .or_insert_with(|| Attribute::new(id))
            .add(value)
    }

    /// Look up an attribute by id, case-insensitively.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Attribute> {
        self.attributes.get(&id.to_lowercase())
    }

    /// Remove an attribute wholesale.
    pub fn remove(&mut self, id: &str) -> Option<Attribute> {
        self.attributes.remove(&id.to_lowercase())
    }

    /// Whether the attribute is present with at least one value.
    #[must_use]
    pub fn has_attribute(&self, id: &str) -> bool {
        self.get(id).is_some_and(|a| !a.is_empty())
    }

    /// All attributes, in no particular order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /// Number of attributes.
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the entry carries the given object class.
    #[must_use]
    pub fn has_object_class(&self, name: &str) -> bool {
        self.get("objectClass")
            .map(|a| a.contains(&AttributeValue::from(name)))
            .unwrap_or(false)
    }

    /// Whether this entry is a referral: `objectClass=referral` plus at
    /// least one `ref` value.
    #[must_use]
    pub fn is_referral(&self) -> bool {
        self.has_object_class(REFERRAL_OBJECT_CLASS) && self.has_attribute(REF_ATTRIBUTE)
    }

    /// The referral URLs held by this entry, in storage order.
    #[must_use]
    pub fn referral_urls(&self) -> Vec<&str> {
        self.get(REF_ATTRIBUTE)
            .map(|a| a.values().iter().filter_map(AttributeValue::as_text).collect())
            .unwrap_or_default()
    }
}

/// The kind of change a single modification applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationOp {
    /// Add the given values to the attribute.
    Add,
    /// Remove the given values (or the whole attribute when no values).
    Remove,
    /// Replace the attribute's values entirely.
    Replace,
}

/// One attribute modification within a modify operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    /// What to do.
    pub op: ModificationOp,
    /// The attribute (id plus the values the op applies to).
    pub attribute: Attribute,
}

impl Modification {
    /// Create a modification.
    #[must_use]
    pub fn new(op: ModificationOp, attribute: Attribute) -> Self {
        Self { op, attribute }
    }
}

/// How one attribute-value pair is affected by a rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModDnAvaKind {
    /// The assertion is introduced by the new RDN.
    Added,
    /// The assertion is removed with the old RDN.
    Deleted,
    /// The old side of an assertion whose value changed.
    UpdatedOld,
    /// The new side of an assertion whose value changed.
    UpdatedNew,
}

/// One attribute-value pair affected by a rename, tagged with how.
///
/// Consumed by index reconciliation when a modify-DN is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModDnAva {
    /// The change kind.
    pub kind: ModDnAvaKind,
    /// The affected assertion.
    pub ava: Ava,
}

impl ModDnAva {
    /// Create a tagged assertion record.
    #[must_use]
    pub fn new(kind: ModDnAvaKind, ava: Ava) -> Self {
        Self { kind, ava }
    }
}
