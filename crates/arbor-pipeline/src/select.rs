//! Attribute Selection
//!
//! Resolves a client-requested return-attribute list into resolved
//! attribute types plus the three special flags: all user attributes
//! (`*`), all operational attributes (`+`), and no attributes (`1.1`).
//!
//! Unknown attribute names are silently dropped per protocol convention;
//! the count of dropped names feeds the fallback decision: a request in
//! which nothing resolved and no special token appeared degrades to "all
//! user attributes".

use arbor_core::{strip_options, AttributeType, SchemaView};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Token selecting all user attributes.
pub const ALL_USER_TOKEN: &str = "*";

/// Token selecting all operational attributes.
pub const ALL_OPERATIONAL_TOKEN: &str = "+";

/// Token selecting no attributes at all (RFC 4511 `1.1`).
pub const NO_ATTRIBUTES_TOKEN: &str = "1.1";

/// One resolved requested attribute: the schema descriptor plus any
/// attribute options that were attached to the request (`;binary`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedAttribute {
    /// The resolved attribute type.
    pub attribute_type: AttributeType,
    /// Options attached to the requested name, in request order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// The resolved return-attribute selection for a read operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSelection {
    all_user: bool,
    all_operational: bool,
    no_attributes: bool,
    attributes: Vec<SelectedAttribute>,
    invalid_count: usize,
}

impl AttributeSelection {
    /// Selection returning all user attributes (the protocol default for
    /// an empty request list).
    #[must_use]
    pub fn all_user() -> Self {
        Self {
            all_user: true,
            ..Self::default()
        }
    }

    /// Resolve a requested attribute list against the schema.
    #[must_use]
    pub fn resolve(requested: &[&str], schema: &dyn SchemaView) -> Self {
        let mut selection = Self::default();
        selection.add_all(requested, schema);

        // nothing usable requested at all: protocol default
        if selection.is_degenerate() {
            debug!(
                invalid = selection.invalid_count,
                "attribute selection degenerated, falling back to all user attributes"
            );
            selection.all_user = true;
        }
        selection
    }

    /// Add further requested names to an existing selection. A concrete
    /// attribute or special token added after `1.1` clears the
    /// no-attributes flag (last write wins).
    pub fn add_all(&mut self, requested: &[&str], schema: &dyn SchemaView) {
        for name in requested {
            self.add(name, schema);
        }
    }

    /// Add one requested name.
    pub fn add(&mut self, requested: &str, schema: &dyn SchemaView) {
        let token = requested.trim();
        match token {
            ALL_USER_TOKEN => {
                self.all_user = true;
                self.no_attributes = false;
            }
            ALL_OPERATIONAL_TOKEN => {
                self.all_operational = true;
                self.no_attributes = false;
            }
            NO_ATTRIBUTES_TOKEN => {
                self.no_attributes = true;
            }
            _ => {
                let (name, options) = strip_options(token);
                match schema.resolve(name) {
                    Some(attribute_type) => {
                        self.no_attributes = false;
                        let options: Vec<String> =
                            options.iter().map(ToString::to_string).collect();
                        let already = self.attributes.iter().any(|s| {
                            s.attribute_type.oid == attribute_type.oid && s.options == options
                        });
                        if !already {
                            self.attributes.push(SelectedAttribute {
                                attribute_type,
                                options,
                            });
                        }
                    }
                    None => {
                        // unknown attributes are ignored per protocol
                        debug!(attribute = %token, "dropping unresolvable requested attribute");
                        self.invalid_count += 1;
                    }
                }
            }
        }
    }

    /// Whether all user attributes are selected.
    #[must_use]
    pub fn all_user_attributes(&self) -> bool {
        self.all_user
    }

    /// Whether all operational attributes are selected.
    #[must_use]
    pub fn all_operational_attributes(&self) -> bool {
        self.all_operational
    }

    /// Whether the request asked for no attributes at all.
    #[must_use]
    pub fn no_attributes(&self) -> bool {
        self.no_attributes
    }

    /// The explicitly resolved attributes.
    #[must_use]
    pub fn attributes(&self) -> &[SelectedAttribute] {
        &self.attributes
    }

    /// How many requested names failed to resolve.
    #[must_use]
    pub fn invalid_count(&self) -> usize {
        self.invalid_count
    }

    /// Whether the named attribute type is covered by this selection.
    #[must_use]
    pub fn includes(&self, attribute_type: &AttributeType) -> bool {
        if self.no_attributes {
            return false;
        }
        if attribute_type.operational {
            if self.all_operational {
                return true;
            }
        } else if self.all_user {
            return true;
        }
        self.attributes
            .iter()
            .any(|s| s.attribute_type.oid == attribute_type.oid)
    }

    /// Reconstruct the minimal request array for this selection: special
    /// tokens first, then canonical attribute names.
    #[must_use]
    pub fn to_request(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.no_attributes && self.attributes.is_empty() {
            out.push(NO_ATTRIBUTES_TOKEN.to_string());
            return out;
        }
        if self.all_user {
            out.push(ALL_USER_TOKEN.to_string());
        }
        if self.all_operational {
            out.push(ALL_OPERATIONAL_TOKEN.to_string());
        }
        for selected in &self.attributes {
            out.push(selected.attribute_type.name().to_string());
        }
        out
    }

    fn is_degenerate(&self) -> bool {
        !self.all_user && !self.all_operational && !self.no_attributes && self.attributes.is_empty()
    }
}
