//! Bearer credential extraction and the three-way identity policy.
//!
//! The extractor applies the request-level policy around the identity
//! verifier port: absent or unrecognisable credentials mean anonymous access
//! (identically, so probing the header format reveals nothing), a verifier
//! outage degrades to anonymous with a log line, and a presented-but-rejected
//! credential is carried as a rejection that handlers must surface. A
//! rejected credential can never be mistaken for anonymous: the two are
//! distinct variants and only [`ClientIdentity::optional`] or
//! [`ClientIdentity::require`] unwrap them.

use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::ports::TokenAssessment;
use crate::domain::{AuthRejection, RequestIdentity, VerifiedIdentity};
use crate::models::Error;

use super::state::HttpState;

/// The caller's identity, as classified for this request.
#[derive(Debug, Clone)]
pub struct ClientIdentity(RequestIdentity);

impl ClientIdentity {
    /// Wrap an already classified identity; useful in tests.
    pub fn from_identity(identity: RequestIdentity) -> Self {
        Self(identity)
    }

    /// The underlying three-way classification.
    pub fn identity(&self) -> &RequestIdentity {
        &self.0
    }

    /// The verified identity, tolerating anonymous callers.
    ///
    /// A rejected credential is still an error: tolerating anonymity never
    /// means tolerating a forged or stale token.
    pub fn optional(&self) -> Result<Option<&VerifiedIdentity>, Error> {
        match &self.0 {
            RequestIdentity::Verified(identity) => Ok(Some(identity)),
            RequestIdentity::Anonymous => Ok(None),
            RequestIdentity::Rejected(rejection) => Err(rejection_error(*rejection)),
        }
    }

    /// The verified identity, rejecting anonymous callers with 401.
    pub fn require(&self) -> Result<&VerifiedIdentity, Error> {
        self.optional()?
            .ok_or_else(|| Error::unauthorized("authentication required"))
    }
}

fn rejection_error(rejection: AuthRejection) -> Error {
    match rejection {
        AuthRejection::Expired => Error::token_expired("credential has expired"),
        AuthRejection::Invalid => Error::token_invalid("credential failed verification"),
        AuthRejection::Revoked => Error::token_revoked("credential has been revoked"),
    }
}

/// Pull the bearer token out of the `Authorization` header, if there is one.
///
/// Anything other than a well-formed `Bearer <token>` header is treated as
/// absent.
fn bearer_token(req: &HttpRequest) -> Option<String> {
    let raw = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_owned())
}

async fn classify(state: &HttpState, token: Option<String>) -> RequestIdentity {
    let Some(token) = token else {
        return RequestIdentity::Anonymous;
    };
    match state.identity.verify(&token).await {
        Ok(TokenAssessment::Valid(identity)) => RequestIdentity::Verified(identity),
        Ok(TokenAssessment::Expired) => RequestIdentity::Rejected(AuthRejection::Expired),
        Ok(TokenAssessment::Invalid) => RequestIdentity::Rejected(AuthRejection::Invalid),
        Ok(TokenAssessment::Revoked) => RequestIdentity::Rejected(AuthRejection::Revoked),
        Err(error) => {
            // An identity-infrastructure outage must not block anonymous
            // browsing; identity-requiring routes still reject below.
            warn!(%error, "identity verifier unavailable; degrading to anonymous");
            RequestIdentity::Anonymous
        }
    }
}

impl FromRequest for ClientIdentity {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<HttpState>>().cloned();
        let token = bearer_token(req);
        Box::pin(async move {
            let Some(state) = state else {
                return Err(Error::internal("identity state not configured").into());
            };
            Ok(Self(classify(&state, token).await))
        })
    }
}
