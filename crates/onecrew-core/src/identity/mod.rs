//! Identity domain module.
//!
//! Maps domain entities (users and companies) to the namespaced identifiers
//! used by the real-time messaging provider, and back.
//!
//! # Module Structure
//!
//! - `model`: Identity types (`ParticipantKind`, `DomainIdentity`, `AttachedIdentity`)
//! - `translator`: Pure conversions between domain ids and provider ids / channel refs
//!
//! # Usage
//!
//! ```
//! use onecrew_core::identity::{ParticipantKind, to_provider_user_id, from_provider_user_id};
//!
//! let provider_id = to_provider_user_id("42", ParticipantKind::User);
//! assert_eq!(provider_id, "onecrew_user_42");
//! let decoded = from_provider_user_id(&provider_id).unwrap();
//! assert_eq!(decoded.id, "42");
//! ```

mod model;
mod translator;

// Re-export public API
pub use model::{AttachedIdentity, DomainIdentity, ParticipantKind};
pub use translator::{
    CHANNEL_TYPE, DEFAULT_ID_PREFIX, IdentityTranslator, from_channel_ref, from_provider_user_id,
    to_channel_ref, to_provider_user_id,
};
