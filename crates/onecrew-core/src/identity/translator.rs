//! Conversions between domain identifiers and provider-namespaced identifiers.
//!
//! All functions are total: malformed input decodes to `None` (user ids) or
//! passes through unchanged (channel refs), never an error.

use super::model::{DomainIdentity, ParticipantKind};

/// Namespace prefix applied to every provider user id and channel id.
pub const DEFAULT_ID_PREFIX: &str = "onecrew_";

/// Provider channel type for two-party conversations.
pub const CHANNEL_TYPE: &str = "messaging";

/// Translator bound to a specific namespace prefix.
///
/// The free functions in this module use [`DEFAULT_ID_PREFIX`]; construct a
/// translator when the prefix comes from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityTranslator {
    prefix: String,
}

impl IdentityTranslator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Builds `prefix + kind + "_" + domain_id`.
    pub fn to_provider_user_id(&self, domain_id: &str, kind: ParticipantKind) -> String {
        format!("{}{}_{}", self.prefix, kind.as_str(), domain_id)
    }

    /// Decodes a provider user id back into its domain identity.
    ///
    /// Returns `None` when the prefix is missing or the remainder does not
    /// start with a known kind followed by `_`. The domain id itself may
    /// contain underscores.
    pub fn from_provider_user_id(&self, provider_id: &str) -> Option<DomainIdentity> {
        let rest = provider_id.strip_prefix(self.prefix.as_str())?;
        let (kind, id) = rest.split_once('_')?;
        let kind = kind.parse::<ParticipantKind>().ok()?;
        Some(DomainIdentity::new(id, kind))
    }

    /// Whether a provider id carries this translator's namespace.
    pub fn is_namespaced(&self, provider_id: &str) -> bool {
        self.from_provider_user_id(provider_id).is_some()
    }

    /// Builds the bare channel id (`prefix + conversation_id`).
    pub fn to_channel_id(&self, conversation_id: &str) -> String {
        format!("{}{}", self.prefix, conversation_id)
    }

    /// Builds `"messaging:" + prefix + conversation_id`.
    pub fn to_channel_ref(&self, conversation_id: &str) -> String {
        format!("{}:{}", CHANNEL_TYPE, self.to_channel_id(conversation_id))
    }

    /// Recovers the conversation id from a channel ref.
    ///
    /// Returns `None` only when the `messaging:` type prefix is absent.
    /// Channels the backend created without the namespace prefix are
    /// returned as-is.
    pub fn from_channel_ref(&self, channel_ref: &str) -> Option<String> {
        let channel_id = channel_ref
            .strip_prefix(CHANNEL_TYPE)
            .and_then(|rest| rest.strip_prefix(':'))?;
        let conversation_id = channel_id
            .strip_prefix(self.prefix.as_str())
            .unwrap_or(channel_id);
        Some(conversation_id.to_string())
    }
}

impl Default for IdentityTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_PREFIX)
    }
}

/// [`IdentityTranslator::to_provider_user_id`] with the default prefix.
pub fn to_provider_user_id(domain_id: &str, kind: ParticipantKind) -> String {
    IdentityTranslator::default().to_provider_user_id(domain_id, kind)
}

/// [`IdentityTranslator::from_provider_user_id`] with the default prefix.
pub fn from_provider_user_id(provider_id: &str) -> Option<DomainIdentity> {
    IdentityTranslator::default().from_provider_user_id(provider_id)
}

/// [`IdentityTranslator::to_channel_ref`] with the default prefix.
pub fn to_channel_ref(conversation_id: &str) -> String {
    IdentityTranslator::default().to_channel_ref(conversation_id)
}

/// [`IdentityTranslator::from_channel_ref`] with the default prefix.
pub fn from_channel_ref(channel_ref: &str) -> Option<String> {
    IdentityTranslator::default().from_channel_ref(channel_ref)
}
