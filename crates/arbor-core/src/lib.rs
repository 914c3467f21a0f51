//! # arbor-core
//!
//! Shared data model for the arbor directory server core.
//!
//! # Modules
//!
//! - [`dn`] - Distinguished names: AVAs, RDNs, DNs, ancestor math
//! - [`entry`] - Entries, multi-valued attributes, modification types
//! - [`schema`] - The schema view contract and in-memory registry
//! - [`error`] - Standardized error types ([`DirectoryError`])
//! - [`ids`] - Strongly typed identifiers (`SessionId`, `OperationId`)
//!
//! # Example
//!
//! ```
//! use arbor_core::{Attribute, Dn, DirectoryResult, Entry};
//!
//! fn referral_check(entry: &Entry) -> bool {
//!     entry.is_referral()
//! }
//!
//! # fn main() -> DirectoryResult<()> {
//! let dn: Dn = "ou=people,dc=example".parse()?;
//! let entry = Entry::new(dn)
//!     .with(Attribute::with_value("objectClass", "referral"))
//!     .with(Attribute::with_value("ref", "ldap://hostB/ou=People,dc=example2"));
//! assert!(referral_check(&entry));
//! # Ok(())
//! # }
//! ```

pub mod dn;
pub mod entry;
pub mod error;
pub mod ids;
pub mod schema;

// Re-export main types for convenient access
pub use dn::{escape_value, Ava, Dn, Rdn};
pub use entry::{
    Attribute, AttributeValue, Entry, ModDnAva, ModDnAvaKind, Modification, ModificationOp,
    REFERRAL_OBJECT_CLASS, REF_ATTRIBUTE,
};
pub use error::{DirectoryError, DirectoryResult, ReferralOutcome};
pub use ids::{ChangeId, OperationId, SessionId};
pub use schema::{strip_options, AttributeType, CoreSchema, SchemaView};
