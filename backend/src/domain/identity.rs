//! Caller identity derived from a verified bearer credential.
//!
//! An identity is only ever produced by the identity verifier port; request
//! bodies cannot construct one. It lives for the duration of the request and
//! is never persisted by this core.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Validation errors for identity fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityValidationError {
    /// Subject identifier was missing or blank once trimmed.
    EmptySubject,
    /// Subject identifier carried surrounding whitespace.
    PaddedSubject,
}

impl fmt::Display for IdentityValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySubject => write!(f, "subject id must not be empty"),
            Self::PaddedSubject => write!(f, "subject id must not carry surrounding whitespace"),
        }
    }
}

impl std::error::Error for IdentityValidationError {}

/// Stable subject identifier issued by the identity authority.
///
/// Opaque to this core: the authority guarantees uniqueness, we only require
/// it to be non-empty and unpadded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    /// Validate and construct a [`SubjectId`].
    ///
    /// # Examples
    /// ```
    /// use backend::domain::SubjectId;
    ///
    /// let subject = SubjectId::new("firebase-uid-1").expect("valid subject");
    /// assert_eq!(subject.as_ref(), "firebase-uid-1");
    /// ```
    pub fn new(raw: impl Into<String>) -> Result<Self, IdentityValidationError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(IdentityValidationError::EmptySubject);
        }
        if raw.trim() != raw {
            return Err(IdentityValidationError::PaddedSubject);
        }
        Ok(Self(raw))
    }
}

impl AsRef<str> for SubjectId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<SubjectId> for String {
    fn from(value: SubjectId) -> Self {
        value.0
    }
}

impl TryFrom<String> for SubjectId {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Identity attested by the identity authority for the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedIdentity {
    /// Stable subject identifier.
    pub subject_id: SubjectId,
    /// Primary email address, when the credential carries one.
    pub email: Option<String>,
    /// Human-readable display name, when the credential carries one.
    pub display_name: Option<String>,
    /// Avatar URL, when the credential carries one.
    pub picture_url: Option<String>,
}

impl VerifiedIdentity {
    /// Identity carrying only a subject id.
    pub fn bare(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            email: None,
            display_name: None,
            picture_url: None,
        }
    }
}

/// Why a presented credential was rejected.
///
/// Distinct from the anonymous case on purpose: a rejected credential must
/// never be downgraded to anonymous access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// The credential's validity window has passed (beyond clock-skew leeway).
    Expired,
    /// Signature, audience, or issuer checks failed.
    Invalid,
    /// The identity authority has revoked the credential.
    Revoked,
}

impl fmt::Display for AuthRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "credential has expired"),
            Self::Invalid => write!(f, "credential failed verification"),
            Self::Revoked => write!(f, "credential has been revoked"),
        }
    }
}

/// Three-way classification of the caller attached to each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestIdentity {
    /// A credential was presented and verified.
    Verified(VerifiedIdentity),
    /// No credential (or no recognisable bearer scheme) was presented.
    Anonymous,
    /// A credential was presented and rejected.
    Rejected(AuthRejection),
}

impl RequestIdentity {
    /// The verified identity, when the caller presented a valid credential.
    pub fn verified(&self) -> Option<&VerifiedIdentity> {
        match self {
            Self::Verified(identity) => Some(identity),
            Self::Anonymous | Self::Rejected(_) => None,
        }
    }
}
