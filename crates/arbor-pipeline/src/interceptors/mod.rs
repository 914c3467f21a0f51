//! Built-in Interceptors
//!
//! The stages a standard pipeline runs, one concern per stage:
//! normalization, referral detection, operational-attribute stamping, and
//! changelog capture.

mod changelog;
mod normalize;
mod operational;
mod referral;

pub use changelog::ChangelogInterceptor;
pub use normalize::NormalizationInterceptor;
pub use operational::OperationalAttributeInterceptor;
pub use referral::ReferralInterceptor;
