//! Distinguished Names
//!
//! Structured representation of distinguished names: attribute-value
//! assertions ([`Ava`]), relative distinguished names ([`Rdn`], possibly
//! multi-valued) and full names ([`Dn`]). Referral rewriting, ancestor
//! walking and rename reconciliation all need component access, so names
//! are parsed once at the edge and carried structured through the
//! pipeline.
//!
//! Normalization here is the pragmatic directory-string form (lowercase,
//! insignificant whitespace trimmed); matching-rule aware normalization
//! belongs to the schema engine and is out of scope.

use crate::error::{DirectoryError, DirectoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Characters that must be escaped with `\` when rendering a value.
const ESCAPED: &[char] = &[',', '+', '"', '\\', '<', '>', ';'];

/// One attribute-value assertion, e.g. `cn=John Doe`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ava {
    attr: String,
    value: String,
}

impl Ava {
    /// Create an assertion from an attribute name and an unescaped value.
    #[must_use]
    pub fn new(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attr: attr.into(),
            value: value.into(),
        }
    }

    /// The attribute name as given.
    #[must_use]
    pub fn attr(&self) -> &str {
        &self.attr
    }

    /// The unescaped value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Canonical lowercase form used for identity comparisons.
    #[must_use]
    pub fn normalized(&self) -> String {
        format!(
            "{}={}",
            self.attr.trim().to_lowercase(),
            self.value.trim().to_lowercase()
        )
    }
}

impl fmt::Display for Ava {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attr, escape_value(&self.value))
    }
}

/// One relative distinguished name: a single naming component, which may
/// join several assertions with `+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rdn {
    avas: Vec<Ava>,
}

impl Rdn {
    /// Create a single-valued RDN.
    #[must_use]
    pub fn new(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            avas: vec![Ava::new(attr, value)],
        }
    }

    /// Create a multi-valued RDN. Fails on an empty assertion list.
    pub fn from_avas(avas: Vec<Ava>) -> DirectoryResult<Self> {
        if avas.is_empty() {
            return Err(DirectoryError::InvalidRequest {
                message: "RDN requires at least one attribute-value assertion".to_string(),
            });
        }
        Ok(Self { avas })
    }

    /// The assertions making up this RDN.
    #[must_use]
    pub fn avas(&self) -> &[Ava] {
        &self.avas
    }

    /// The first (primary) assertion.
    #[must_use]
    pub fn ava(&self) -> &Ava {
        &self.avas[0]
    }

    /// Whether this RDN carries more than one assertion.
    #[must_use]
    pub fn is_multi_valued(&self) -> bool {
        self.avas.len() > 1
    }

    /// Canonical lowercase form; multi-valued assertions are sorted so
    /// `a=1+b=2` and `b=2+a=1` normalize identically.
    #[must_use]
    pub fn normalized(&self) -> String {
        let mut parts: Vec<String> = self.avas.iter().map(Ava::normalized).collect();
        parts.sort();
        parts.join("+")
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.avas.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("+"))
    }
}

impl FromStr for Rdn {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dn: Dn = s.parse()?;
        if dn.size() != 1 {
            return Err(DirectoryError::InvalidDn {
                dn: s.to_string(),
                message: "expected exactly one RDN".to_string(),
            });
        }
        Ok(dn.rdns[0].clone())
    }
}

/// A distinguished name: an ordered sequence of RDNs, leftmost = leaf.
///
/// The empty DN names the root DSE.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dn {
    rdns: Vec<Rdn>,
}

impl Dn {
    /// The empty DN (root DSE).
    #[must_use]
    pub fn root() -> Self {
        Self { rdns: Vec::new() }
    }

    /// Build a DN from leaf-first RDN components.
    #[must_use]
    pub fn from_rdns(rdns: Vec<Rdn>) -> Self {
        Self { rdns }
    }

    /// Number of RDN components.
    #[must_use]
    pub fn size(&self) -> usize {
        self.rdns.len()
    }

    /// Whether this is the empty (root DSE) name.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    /// The leaf RDN, if any.
    #[must_use]
    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// Leaf-first view of all components.
    #[must_use]
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// The parent name; `None` for the root DSE.
    #[must_use]
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            None
        } else {
            Some(Dn {
                rdns: self.rdns[1..].to_vec(),
            })
        }
    }

    /// A child of this name with the given leaf RDN.
    #[must_use]
    pub fn child(&self, rdn: Rdn) -> Dn {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(rdn);
        rdns.extend(self.rdns.iter().cloned());
        Dn { rdns }
    }

    /// Canonical lowercase string used as the identity key for entries.
    #[must_use]
    pub fn normalized(&self) -> String {
        let parts: Vec<String> = self.rdns.iter().map(Rdn::normalized).collect();
        parts.join(",")
    }

    /// Whether `self` sits strictly below `ancestor` in the tree.
    ///
    /// The root DSE is an ancestor of every non-root name; a name is not
    /// its own descendant.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Dn) -> bool {
        if self.rdns.len() <= ancestor.rdns.len() {
            return false;
        }
        let offset = self.rdns.len() - ancestor.rdns.len();
        self.rdns[offset..]
            .iter()
            .zip(ancestor.rdns.iter())
            .all(|(a, b)| a.normalized() == b.normalized())
    }

    /// Whether `self` sits strictly above `descendant`.
    #[must_use]
    pub fn is_ancestor_of(&self, descendant: &Dn) -> bool {
        descendant.is_descendant_of(self)
    }

    /// The relative components of `self` below `ancestor`, leaf-first.
    ///
    /// Returns `None` when `self` is not a strict descendant of
    /// `ancestor`. Used when a referral boundary's URLs are rewritten to
    /// carry the remaining path past the referral point.
    #[must_use]
    pub fn suffix_from(&self, ancestor: &Dn) -> Option<Vec<Rdn>> {
        if !self.is_descendant_of(ancestor) {
            return None;
        }
        let keep = self.rdns.len() - ancestor.rdns.len();
        Some(self.rdns[..keep].to_vec())
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.rdns.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl FromStr for Dn {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dn(s)
    }
}

impl TryFrom<String> for Dn {
    type Error = DirectoryError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Dn> for String {
    fn from(dn: Dn) -> Self {
        dn.to_string()
    }
}

/// Escape a value for rendering inside an RDN per RFC 4514: specials get a
/// backslash, leading/trailing spaces and a leading `#` are protected.
#[must_use]
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let chars: Vec<char> = value.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        let leading = i == 0 && (*c == ' ' || *c == '#');
        let trailing = i == chars.len() - 1 && *c == ' ';
        if ESCAPED.contains(c) || leading || trailing {
            out.push('\\');
        }
        out.push(*c);
    }
    out
}

fn parse_dn(s: &str) -> DirectoryResult<Dn> {
    let trimmed = trim_end_unescaped(s.trim_start());
    if trimmed.is_empty() {
        return Ok(Dn::root());
    }

    let mut rdns = Vec::new();
    for rdn_part in split_unescaped(trimmed, ',') {
        let mut avas = Vec::new();
        for ava_part in split_unescaped(&rdn_part, '+') {
            avas.push(parse_ava(s, &ava_part)?);
        }
        rdns.push(Rdn::from_avas(avas).map_err(|_| DirectoryError::InvalidDn {
            dn: s.to_string(),
            message: "empty RDN component".to_string(),
        })?);
    }
    Ok(Dn { rdns })
}

fn parse_ava(original: &str, part: &str) -> DirectoryResult<Ava> {
    let invalid = |message: &str| DirectoryError::InvalidDn {
        dn: original.to_string(),
        message: message.to_string(),
    };

    let eq = find_unescaped(part, '=').ok_or_else(|| invalid("missing '=' in RDN"))?;
    let attr = part[..eq].trim();
    let raw_value = trim_end_unescaped(part[eq + 1..].trim_start());

    if attr.is_empty() {
        return Err(invalid("empty attribute type in RDN"));
    }
    if !attr
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(invalid("attribute type contains invalid characters"));
    }
    if raw_value.is_empty() {
        return Err(invalid("empty attribute value in RDN"));
    }

    Ok(Ava::new(attr, unescape_value(original, raw_value)?))
}

fn unescape_value(original: &str, raw: &str) -> DirectoryResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(e) if ESCAPED.contains(&e) || e == ' ' || e == '#' || e == '=' => out.push(e),
            Some(h1) if h1.is_ascii_hexdigit() => {
                // hex-pair escape, e.g. \2C
                let h2 = chars
                    .next()
                    .filter(char::is_ascii_hexdigit)
                    .ok_or_else(|| DirectoryError::InvalidDn {
                        dn: original.to_string(),
                        message: "truncated hex escape".to_string(),
                    })?;
                let hi = h1.to_digit(16).unwrap_or(0);
                let lo = h2.to_digit(16).unwrap_or(0);
                out.push((hi * 16 + lo) as u8 as char);
            }
            _ => {
                return Err(DirectoryError::InvalidDn {
                    dn: original.to_string(),
                    message: "dangling escape at end of value".to_string(),
                })
            }
        }
    }
    Ok(out)
}

/// Trim trailing spaces, but keep a space protected by an escape.
fn trim_end_unescaped(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut end = s.len();
    while end > 0 && bytes[end - 1] == b' ' {
        let mut backslashes = 0;
        let mut i = end - 1;
        while i > 0 && bytes[i - 1] == b'\\' {
            backslashes += 1;
            i -= 1;
        }
        if backslashes % 2 == 1 {
            break;
        }
        end -= 1;
    }
    &s[..end]
}

/// Split on a separator, honoring backslash escapes.
fn split_unescaped(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            current.push(c);
            escaped = true;
        } else if c == sep {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

fn find_unescaped(s: &str, target: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == target {
            return Some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_dn() {
        let dn: Dn = "cn=John Doe,ou=people,dc=example,dc=com".parse().unwrap();
        assert_eq!(dn.size(), 4);
        assert_eq!(dn.rdn().unwrap().ava().attr(), "cn");
        assert_eq!(dn.rdn().unwrap().ava().value(), "John Doe");
    }

    #[test]
    fn test_parse_empty_is_root() {
        let dn: Dn = "".parse().unwrap();
        assert!(dn.is_root());
        assert_eq!(dn.size(), 0);
        assert!(dn.parent().is_none());
    }

    #[test]
    fn test_parse_escaped_comma() {
        let dn: Dn = r"cn=Doe\, John,ou=people,dc=example".parse().unwrap();
        assert_eq!(dn.size(), 3);
        assert_eq!(dn.rdn().unwrap().ava().value(), "Doe, John");
        // Display re-escapes
        assert_eq!(dn.to_string(), r"cn=Doe\, John,ou=people,dc=example");
    }

    #[test]
    fn test_escaped_trailing_space_survives_parse() {
        let dn: Dn = r"cn=trail\ ,dc=example".parse().unwrap();
        assert_eq!(dn.rdn().unwrap().ava().value(), "trail ");
        assert_eq!(dn.to_string(), r"cn=trail\ ,dc=example");
    }

    #[test]
    fn test_parse_hex_escape() {
        let dn: Dn = r"cn=a\2Cb,dc=example".parse().unwrap();
        assert_eq!(dn.rdn().unwrap().ava().value(), "a,b");
    }

    #[test]
    fn test_parse_multi_valued_rdn() {
        let dn: Dn = "cn=John+sn=Doe,dc=example".parse().unwrap();
        let rdn = dn.rdn().unwrap();
        assert!(rdn.is_multi_valued());
        assert_eq!(rdn.avas().len(), 2);
        // Normalization sorts assertions
        let other: Dn = "sn=Doe+cn=John,dc=example".parse().unwrap();
        assert_eq!(dn.normalized(), other.normalized());
    }

    #[test]
    fn test_parse_rejects_missing_equals() {
        let err = "cn,dc=example".parse::<Dn>().unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidDn { .. }));
    }

    #[test]
    fn test_parse_rejects_empty_value() {
        assert!("cn=,dc=example".parse::<Dn>().is_err());
        assert!("=x,dc=example".parse::<Dn>().is_err());
    }

    #[test]
    fn test_normalized_is_case_insensitive() {
        let a: Dn = "CN=John,OU=People,DC=Example".parse().unwrap();
        let b: Dn = "cn=john, ou=people, dc=example".parse().unwrap();
        assert_eq!(a.normalized(), b.normalized());
    }

    #[test]
    fn test_parent_and_child() {
        let dn: Dn = "cn=x,ou=people,dc=example".parse().unwrap();
        let parent = dn.parent().unwrap();
        assert_eq!(parent.to_string(), "ou=people,dc=example");
        let back = parent.child(Rdn::new("cn", "x"));
        assert_eq!(back.normalized(), dn.normalized());
    }

    #[test]
    fn test_ancestry() {
        let base: Dn = "dc=example".parse().unwrap();
        let mid: Dn = "ou=people,dc=example".parse().unwrap();
        let leaf: Dn = "cn=x,ou=people,dc=example".parse().unwrap();

        assert!(leaf.is_descendant_of(&mid));
        assert!(leaf.is_descendant_of(&base));
        assert!(mid.is_ancestor_of(&leaf));
        assert!(!mid.is_descendant_of(&leaf));
        // not its own descendant
        assert!(!leaf.is_descendant_of(&leaf));
        // root is ancestor of everything
        assert!(leaf.is_descendant_of(&Dn::root()));
    }

    #[test]
    fn test_suffix_from() {
        let ancestor: Dn = "ou=people,dc=example".parse().unwrap();
        let leaf: Dn = "cn=x,ou=sub,ou=people,dc=example".parse().unwrap();
        let suffix = leaf.suffix_from(&ancestor).unwrap();
        assert_eq!(suffix.len(), 2);
        assert_eq!(suffix[0].to_string(), "cn=x");
        assert_eq!(suffix[1].to_string(), "ou=sub");

        let unrelated: Dn = "dc=other".parse().unwrap();
        assert!(leaf.suffix_from(&unrelated).is_none());
    }

    #[test]
    fn test_escape_value_specials() {
        assert_eq!(escape_value("a,b"), r"a\,b");
        assert_eq!(escape_value(" lead"), r"\ lead");
        assert_eq!(escape_value("trail "), r"trail\ ");
        assert_eq!(escape_value("#tag"), r"\#tag");
        assert_eq!(escape_value(r"back\slash"), r"back\\slash");
    }

    #[test]
    fn test_serde_round_trip() {
        let dn: Dn = "cn=x,dc=example".parse().unwrap();
        let json = serde_json::to_string(&dn).unwrap();
        assert_eq!(json, "\"cn=x,dc=example\"");
        let parsed: Dn = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, dn);
    }

    #[test]
    fn test_rdn_from_str() {
        let rdn: Rdn = "cn=x".parse().unwrap();
        assert_eq!(rdn.ava().attr(), "cn");
        assert!("cn=x,dc=example".parse::<Rdn>().is_err());
    }
}
