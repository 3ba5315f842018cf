//! Payment verification primitives: signature scheme, records, outcomes.
//!
//! The gateway signs `"{order_id}|{payment_reference}"` with the shared
//! secret (HMAC-SHA256, hex-encoded). Recomputing that signature and
//! comparing it in constant time is the single security-critical computation
//! in this system; everything else here is bookkeeping around it.

use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::order::OrderId;

type HmacSha256 = Hmac<Sha256>;

/// Validation errors for verification inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationValidationError {
    /// Payment reference was empty or padded.
    InvalidPaymentReference,
    /// Supplied signature was empty.
    EmptySignature,
}

impl fmt::Display for VerificationValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPaymentReference => {
                write!(f, "payment reference must be a non-empty, unpadded string")
            }
            Self::EmptySignature => write!(f, "signature must not be empty"),
        }
    }
}

impl std::error::Error for VerificationValidationError {}

/// Provider-issued identifier of a completed payment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentReference(String);

impl PaymentReference {
    /// Validate and construct a [`PaymentReference`].
    pub fn new(raw: impl Into<String>) -> Result<Self, VerificationValidationError> {
        let raw = raw.into();
        if raw.is_empty() || raw.trim() != raw {
            return Err(VerificationValidationError::InvalidPaymentReference);
        }
        Ok(Self(raw))
    }
}

impl AsRef<str> for PaymentReference {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<PaymentReference> for String {
    fn from(value: PaymentReference) -> Self {
        value.0
    }
}

impl TryFrom<String> for PaymentReference {
    type Error = VerificationValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// A claimed or computed payment signature (hex-encoded HMAC-SHA256).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature(String);

impl Signature {
    /// Validate and construct a [`Signature`].
    pub fn new(raw: impl Into<String>) -> Result<Self, VerificationValidationError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(VerificationValidationError::EmptySignature);
        }
        Ok(Self(raw))
    }
}

impl AsRef<str> for Signature {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Signature> for String {
    fn from(value: Signature) -> Self {
        value.0
    }
}

impl TryFrom<String> for Signature {
    type Error = VerificationValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Gateway shared secret used to key the signature computation.
///
/// Wrapped in [`Zeroizing`] so the material is scrubbed on drop; it never
/// appears in logs or serialised output.
#[derive(Clone)]
pub struct GatewaySecret(Zeroizing<String>);

impl GatewaySecret {
    /// Wrap the shared secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for GatewaySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GatewaySecret(..)")
    }
}

/// Recompute the signature the gateway is expected to have produced for
/// `(order_id, payment_reference)`.
pub fn expected_signature(
    secret: &GatewaySecret,
    order_id: &OrderId,
    payment_reference: &PaymentReference,
) -> Signature {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(order_id.as_ref().as_bytes());
    mac.update(b"|");
    mac.update(payment_reference.as_ref().as_bytes());
    Signature(hex::encode(mac.finalize().into_bytes()))
}

/// Compare a supplied signature against the expected one in constant time.
pub fn signature_matches(expected: &Signature, supplied: &Signature) -> bool {
    expected
        .as_ref()
        .as_bytes()
        .ct_eq(supplied.as_ref().as_bytes())
        .into()
}

/// Terminal outcome written into a [`VerificationRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedOutcome {
    /// Signature matched; credits were issued.
    Verified,
    /// Signature mismatched; nothing was credited.
    Failed,
}

/// The single record finalising an order's verification.
///
/// Written atomically with the order's terminal transition; at most one per
/// order, and at most one `Verified` record per order ever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRecord {
    /// Order the attempt was made against.
    pub order_id: OrderId,
    /// Provider payment reference supplied by the caller.
    pub payment_reference: PaymentReference,
    /// Signature supplied by the caller.
    pub signature: Signature,
    /// When the attempt was finalised.
    pub verified_at: DateTime<Utc>,
    /// Whether the attempt verified.
    pub outcome: RecordedOutcome,
}

/// Why a verification attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationFailure {
    /// No order exists with the supplied identifier.
    OrderNotFound,
    /// The order aged out before verification.
    OrderExpired,
    /// The supplied package does not match the order's package.
    PackageMismatch,
    /// The supplied signature does not match the recomputed one.
    SignatureMismatch,
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderNotFound => write!(f, "order not found"),
            Self::OrderExpired => write!(f, "order has expired"),
            Self::PackageMismatch => write!(f, "package does not match the order"),
            Self::SignatureMismatch => write!(f, "signature mismatch"),
        }
    }
}

/// Result of a verification attempt, replay-aware.
///
/// `replayed` is true when a terminal outcome already existed and was
/// returned unchanged, i.e. no recomputation and no side effects happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The payment verified (now, or on a previous attempt).
    Verified {
        /// Whether this response replays an earlier terminal outcome.
        replayed: bool,
    },
    /// The attempt failed.
    Failed {
        /// Why the attempt failed.
        reason: VerificationFailure,
        /// Whether this response replays an earlier terminal outcome.
        replayed: bool,
    },
}

impl VerificationOutcome {
    /// Re-state a stored record as an outcome.
    ///
    /// A stored `Failed` record always means the signature check failed: the
    /// earlier failure classes (unknown order, expired order, package
    /// mismatch) never finalise the order.
    pub fn from_record(record: &VerificationRecord, replayed: bool) -> Self {
        match record.outcome {
            RecordedOutcome::Verified => Self::Verified { replayed },
            RecordedOutcome::Failed => Self::Failed {
                reason: VerificationFailure::SignatureMismatch,
                replayed,
            },
        }
    }
}
