//! JWT-backed identity verifier adapter.
//!
//! Verifies bearer credentials issued by the identity authority: shared-key
//! HMAC signature, pinned issuer and audience, and a clock-skew-tolerant
//! expiry window. An optional revocation set is checked against the token's
//! `jti` claim. The verifier is constructed explicitly and injected; there is
//! no process-global initialisation.

use std::collections::HashSet;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::Deserialize;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::domain::ports::{IdentityVerifier, IdentityVerifierError, TokenAssessment};
use crate::domain::{SubjectId, VerifiedIdentity};

/// Default clock-skew leeway applied to expiry checks, in seconds.
pub const DEFAULT_LEEWAY_SECS: u64 = 60;

/// Configuration for [`JwtIdentityVerifier`].
#[derive(Debug, Clone)]
pub struct JwtVerifierConfig {
    /// Issuer the token's `iss` claim must equal.
    pub issuer: String,
    /// Audience the token's `aud` claim must equal.
    pub audience: String,
    /// Shared HMAC key material.
    pub shared_secret: Zeroizing<String>,
    /// Clock-skew leeway for expiry checks, in seconds.
    pub leeway_secs: u64,
    /// Revoked token identifiers (`jti` claims).
    pub revoked_token_ids: HashSet<String>,
}

impl JwtVerifierConfig {
    /// Configuration with the default leeway and an empty revocation set.
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        shared_secret: impl Into<String>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            shared_secret: Zeroizing::new(shared_secret.into()),
            leeway_secs: DEFAULT_LEEWAY_SECS,
            revoked_token_ids: HashSet::new(),
        }
    }

    /// Override the clock-skew leeway.
    #[must_use]
    pub fn with_leeway_secs(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    /// Add a revoked token identifier.
    #[must_use]
    pub fn with_revoked_token(mut self, jti: impl Into<String>) -> Self {
        self.revoked_token_ids.insert(jti.into());
        self
    }
}

// Expiry, issuer, and audience are validated by jsonwebtoken against the raw
// token; only the claims we carry forward are deserialised here.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    jti: Option<String>,
}

/// Identity verifier decoding HS256 tokens with a pinned issuer and audience.
pub struct JwtIdentityVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    revoked_token_ids: HashSet<String>,
}

impl JwtIdentityVerifier {
    /// Build a verifier from configuration.
    pub fn new(config: &JwtVerifierConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_secs;
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_issuer(&[config.issuer.as_str()]);
        Self {
            decoding_key: DecodingKey::from_secret(config.shared_secret.as_bytes()),
            validation,
            revoked_token_ids: config.revoked_token_ids.clone(),
        }
    }

    fn assess(&self, raw_token: &str) -> TokenAssessment {
        let data = match decode::<Claims>(raw_token, &self.decoding_key, &self.validation) {
            Ok(data) => data,
            Err(error) => {
                return match error.kind() {
                    ErrorKind::ExpiredSignature => {
                        info!("credential rejected: expired");
                        TokenAssessment::Expired
                    }
                    kind => {
                        debug!(?kind, "credential rejected: failed verification");
                        TokenAssessment::Invalid
                    }
                };
            }
        };
        if let Some(jti) = &data.claims.jti {
            if self.revoked_token_ids.contains(jti) {
                info!("credential rejected: revoked");
                return TokenAssessment::Revoked;
            }
        }
        let Ok(subject_id) = SubjectId::new(data.claims.sub) else {
            debug!("credential rejected: unusable subject claim");
            return TokenAssessment::Invalid;
        };
        info!(subject_id = %subject_id, "credential verified");
        TokenAssessment::Valid(VerifiedIdentity {
            subject_id,
            email: data.claims.email,
            display_name: data.claims.name,
            picture_url: data.claims.picture,
        })
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, raw_token: &str) -> Result<TokenAssessment, IdentityVerifierError> {
        Ok(self.assess(raw_token))
    }
}
