//! Referral Policy
//!
//! The per-operation policy deciding what happens when part of the naming
//! tree is delegated elsewhere: in [`ReferralHandling::Throw`] mode (the
//! default) a referring boundary raises [`DirectoryError::Referral`]
//! carrying every alternate-location URL for the nearest referring
//! ancestor; in [`ReferralHandling::Ignore`] mode (manage-DSA-IT present)
//! referral entries are ordinary entries and operations proceed against
//! them directly, with no special-casing below that boundary.
//!
//! URL rewriting appends the remaining relative path past the referral
//! point ahead of the URL's base DN, percent-escaped per RFC 3986 path
//! rules.

use arbor_core::{DirectoryError, Dn, Entry, ReferralOutcome};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

/// Whether referral boundaries raise an outcome or are passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralHandling {
    /// Referring ancestors raise a referral outcome (no manage-DSA-IT).
    Throw,
    /// Referral entries are treated as ordinary entries.
    Ignore,
}

/// Builds referral outcomes from referring entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferralManager;

impl ReferralManager {
    /// The outcome for one referring boundary: every `ref` value of
    /// `entry`, in storage order, rewritten against `target_dn`.
    ///
    /// Exactly one outcome is produced per boundary; callers enumerate
    /// its URLs rather than receiving one signal per URL.
    #[must_use]
    pub fn outcome_for(entry: &Entry, target_dn: &Dn) -> ReferralOutcome {
        let urls = entry
            .referral_urls()
            .into_iter()
            .map(|raw| Self::rewrite_url(raw, entry.dn(), target_dn))
            .collect();
        ReferralOutcome::new(entry.dn().to_string(), urls)
    }

    /// The error form of [`ReferralManager::outcome_for`].
    #[must_use]
    pub fn referral_error(entry: &Entry, target_dn: &Dn) -> DirectoryError {
        DirectoryError::Referral {
            outcome: Self::outcome_for(entry, target_dn),
        }
    }

    /// Rewrite one referral URL so its DN reflects the remaining relative
    /// path past the referral point: the components of `target_dn` below
    /// `referring_dn` are prepended to the URL's base DN.
    ///
    /// A URL that does not parse, or a target at (or outside) the
    /// referring entry itself, is returned unchanged.
    #[must_use]
    pub fn rewrite_url(raw: &str, referring_dn: &Dn, target_dn: &Dn) -> String {
        let Some(suffix) = target_dn.suffix_from(referring_dn) else {
            return raw.to_string();
        };

        let mut url = match Url::parse(raw) {
            Ok(url) => url,
            Err(error) => {
                warn!(url = %raw, %error, "leaving unparsable referral URL unrewritten");
                return raw.to_string();
            }
        };

        let base_dn = percent_decode_str(url.path().trim_start_matches('/'))
            .decode_utf8_lossy()
            .to_string();

        let mut parts: Vec<String> = suffix.iter().map(ToString::to_string).collect();
        if !base_dn.is_empty() {
            parts.push(base_dn);
        }
        url.set_path(&parts.join(","));
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::Attribute;

    fn dn(s: &str) -> Dn {
        s.parse().unwrap()
    }

    fn referral_entry(dn_str: &str, refs: &[&str]) -> Entry {
        let mut entry = Entry::new(dn(dn_str));
        entry.put(Attribute::with_value("objectClass", "referral"));
        entry.put(Attribute::with_values("ref", refs.iter().copied()));
        entry
    }

    #[test]
    fn test_rewrite_appends_relative_path() {
        let rewritten = ReferralManager::rewrite_url(
            "ldap://hostB/ou=People,dc=example2",
            &dn("ou=people,dc=example"),
            &dn("cn=X,ou=people,dc=example"),
        );
        assert_eq!(rewritten, "ldap://hostB/cn=X,ou=People,dc=example2");
    }

    #[test]
    fn test_rewrite_escapes_spaces() {
        let rewritten = ReferralManager::rewrite_url(
            "ldap://hostB/ou=People,dc=example2",
            &dn("ou=people,dc=example"),
            &dn("cn=John Doe,ou=people,dc=example"),
        );
        assert_eq!(
            rewritten,
            "ldap://hostB/cn=John%20Doe,ou=People,dc=example2"
        );
    }

    #[test]
    fn test_rewrite_multi_component_suffix() {
        let rewritten = ReferralManager::rewrite_url(
            "ldap://hostB/dc=example2",
            &dn("dc=example"),
            &dn("cn=X,ou=sub,dc=example"),
        );
        assert_eq!(rewritten, "ldap://hostB/cn=X,ou=sub,dc=example2");
    }

    #[test]
    fn test_rewrite_target_at_boundary_is_unchanged() {
        let raw = "ldap://hostB/ou=People,dc=example2";
        let boundary = dn("ou=people,dc=example");
        assert_eq!(ReferralManager::rewrite_url(raw, &boundary, &boundary), raw);
    }

    #[test]
    fn test_rewrite_empty_base_dn() {
        let rewritten = ReferralManager::rewrite_url(
            "ldap://hostB",
            &dn("ou=people,dc=example"),
            &dn("cn=X,ou=people,dc=example"),
        );
        assert_eq!(rewritten, "ldap://hostB/cn=X");
    }

    #[test]
    fn test_unparsable_url_kept_verbatim() {
        let rewritten = ReferralManager::rewrite_url(
            "not a url",
            &dn("ou=people,dc=example"),
            &dn("cn=X,ou=people,dc=example"),
        );
        assert_eq!(rewritten, "not a url");
    }

    #[test]
    fn test_outcome_enumerates_every_url_once() {
        let entry = referral_entry(
            "ou=people,dc=example",
            &[
                "ldap://hostB/ou=People,dc=example2",
                "ldap://hostC/ou=People,dc=example3",
            ],
        );
        let outcome =
            ReferralManager::outcome_for(&entry, &dn("cn=X,ou=people,dc=example"));
        assert_eq!(outcome.dn, "ou=people,dc=example");
        assert_eq!(
            outcome.urls(),
            &[
                "ldap://hostB/cn=X,ou=People,dc=example2".to_string(),
                "ldap://hostC/cn=X,ou=People,dc=example3".to_string(),
            ]
        );
    }

    #[test]
    fn test_referral_error_wraps_outcome() {
        let entry = referral_entry("ou=people,dc=example", &["ldap://hostB/dc=example2"]);
        let err = ReferralManager::referral_error(&entry, &dn("cn=X,ou=people,dc=example"));
        assert!(err.is_referral());
        assert_eq!(err.referral().unwrap().urls().len(), 1);
    }
}
