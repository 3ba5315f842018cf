//! Port abstraction for bearer-credential verification.
//!
//! The [`IdentityVerifier`] trait is the seam to the identity authority. It
//! classifies a raw token; the policy for absent or unrecognisable
//! credentials (anonymous access) lives in the inbound extractor, not here.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::VerifiedIdentity;

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity verifier adapters.
    ///
    /// These are infrastructure failures, not rejections: callers degrade to
    /// anonymous access rather than failing the request.
    pub enum IdentityVerifierError {
        /// The identity authority could not be reached.
        Unavailable { message: String } => "identity authority unavailable: {message}",
        /// The adapter is misconfigured (e.g. unusable key material).
        Configuration { message: String } => "identity verifier misconfigured: {message}",
    }
}

/// Classification of a presented, well-formed bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenAssessment {
    /// The token verified; here is who it attests.
    Valid(VerifiedIdentity),
    /// The token's validity window has passed, beyond clock-skew leeway.
    Expired,
    /// Signature, audience, issuer, or structure checks failed.
    Invalid,
    /// The identity authority has revoked the token.
    Revoked,
}

/// Port for verifying bearer credentials against the identity authority.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Classify `raw_token` against the authority's current signing keys and
    /// a clock-skew-tolerant expiry window.
    async fn verify(&self, raw_token: &str) -> Result<TokenAssessment, IdentityVerifierError>;
}

/// Fixture verifier for tests: a token table with an `Invalid` default.
///
/// # Examples
/// ```
/// use backend::domain::ports::{FixtureIdentityVerifier, IdentityVerifier, TokenAssessment};
/// use backend::domain::{SubjectId, VerifiedIdentity};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let identity = VerifiedIdentity::bare(SubjectId::new("uid-1").expect("valid"));
/// let verifier = FixtureIdentityVerifier::default()
///     .with_token("good-token", TokenAssessment::Valid(identity));
/// let assessment = verifier.verify("good-token").await.expect("fixture never fails");
/// assert!(matches!(assessment, TokenAssessment::Valid(_)));
/// # });
/// ```
#[derive(Debug, Default)]
pub struct FixtureIdentityVerifier {
    tokens: HashMap<String, TokenAssessment>,
}

impl FixtureIdentityVerifier {
    /// Register an assessment for a specific token string.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, assessment: TokenAssessment) -> Self {
        self.tokens.insert(token.into(), assessment);
        self
    }
}

#[async_trait]
impl IdentityVerifier for FixtureIdentityVerifier {
    async fn verify(&self, raw_token: &str) -> Result<TokenAssessment, IdentityVerifierError> {
        Ok(self
            .tokens
            .get(raw_token)
            .cloned()
            .unwrap_or(TokenAssessment::Invalid))
    }
}
