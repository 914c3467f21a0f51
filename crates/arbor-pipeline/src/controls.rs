//! Request and Response Controls
//!
//! Controls are opaque per-operation extensions keyed by OID. The request
//! side is populated once from the inbound request; the response side
//! accumulates as interceptors add controls, and re-adding an OID replaces
//! the earlier control.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// OID of the manage-DSA-IT control (RFC 3296): treat referral entries as
/// ordinary entries instead of triggering referral redirection.
pub const MANAGE_DSA_IT_OID: &str = "2.16.840.1.113730.3.4.2";

/// OID of the subtree-delete control.
pub const SUBTREE_DELETE_OID: &str = "1.2.840.113556.1.4.805";

/// A single control: an OID, a criticality flag, and an opaque value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    /// The control's OID.
    pub oid: String,

    /// Whether the server must reject the operation if it does not
    /// recognize this control.
    #[serde(default)]
    pub criticality: bool,

    /// Undecoded control value; empty for value-less controls.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value: Vec<u8>,
}

impl Control {
    /// Create a value-less, non-critical control.
    #[must_use]
    pub fn new(oid: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            criticality: false,
            value: Vec::new(),
        }
    }

    /// Set the criticality flag.
    #[must_use]
    pub fn critical(mut self) -> Self {
        self.criticality = true;
        self
    }

    /// Attach an opaque value.
    #[must_use]
    pub fn with_value(mut self, value: Vec<u8>) -> Self {
        self.value = value;
        self
    }

    /// The manage-DSA-IT control.
    #[must_use]
    pub fn manage_dsa_it() -> Self {
        Self::new(MANAGE_DSA_IT_OID).critical()
    }

    /// The subtree-delete control.
    #[must_use]
    pub fn subtree_delete() -> Self {
        Self::new(SUBTREE_DELETE_OID)
    }
}

/// A set of controls keyed by OID.
///
/// Insertion order is irrelevant; adding a control whose OID is already
/// present replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlBag {
    #[serde(flatten)]
    controls: HashMap<String, Control>,
}

impl ControlBag {
    /// Create an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a control.
    pub fn add(&mut self, control: Control) {
        self.controls.insert(control.oid.clone(), control);
    }

    /// Builder-style [`ControlBag::add`].
    #[must_use]
    pub fn with(mut self, control: Control) -> Self {
        self.add(control);
        self
    }

    /// Look up a control by OID.
    #[must_use]
    pub fn get(&self, oid: &str) -> Option<&Control> {
        self.controls.get(oid)
    }

    /// Whether a control with the given OID is present.
    #[must_use]
    pub fn has(&self, oid: &str) -> bool {
        self.controls.contains_key(oid)
    }

    /// Whether the bag holds any control at all.
    #[must_use]
    pub fn has_any(&self) -> bool {
        !self.controls.is_empty()
    }

    /// Number of distinct control OIDs present.
    #[must_use]
    pub fn count(&self) -> usize {
        self.controls.len()
    }

    /// Remove every control.
    pub fn clear(&mut self) {
        self.controls.clear();
    }

    /// Iterate the controls in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Control> {
        self.controls.values()
    }
}
