//! Identity domain models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of domain entity that can hold a messaging session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    #[default]
    User,
    Company,
}

impl ParticipantKind {
    /// All known kinds, in decoding order.
    pub const ALL: [ParticipantKind; 2] = [ParticipantKind::User, ParticipantKind::Company];

    /// The lowercase tag used inside provider identifiers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantKind::User => "user",
            ParticipantKind::Company => "company",
        }
    }
}

impl fmt::Display for ParticipantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ParticipantKind::User),
            "company" => Ok(ParticipantKind::Company),
            other => Err(format!("unknown participant kind '{}'", other)),
        }
    }
}

/// A domain entity (user or company) identified by the backend's own id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainIdentity {
    pub id: String,
    pub kind: ParticipantKind,
}

impl DomainIdentity {
    pub fn new(id: impl Into<String>, kind: ParticipantKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::new(id, ParticipantKind::User)
    }

    pub fn company(id: impl Into<String>) -> Self {
        Self::new(id, ParticipantKind::Company)
    }
}

impl fmt::Display for DomainIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// The identity currently bound to the provider client.
///
/// `provider_user_id` is the backend-issued provider id, which is not
/// guaranteed to follow the local namespacing convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachedIdentity {
    pub provider_user_id: String,
    pub kind: ParticipantKind,
}

impl AttachedIdentity {
    pub fn new(provider_user_id: impl Into<String>, kind: ParticipantKind) -> Self {
        Self {
            provider_user_id: provider_user_id.into(),
            kind,
        }
    }
}
