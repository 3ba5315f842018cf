//! Payment orders and their server-authoritative state machine.
//!
//! An order is a provider-registered intent to charge a fixed amount. It is
//! created once, immutable except for its status, and only the verification
//! service moves it to a terminal state. `Submitted` exists solely in the
//! client's checkout flow and is never persisted here.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::{Currency, MinorUnits};

/// Validation errors for order identifiers and package identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderValidationError {
    /// Identifier was empty.
    EmptyIdentifier,
    /// Identifier carried surrounding whitespace.
    PaddedIdentifier,
    /// Client key was not a valid UUID.
    InvalidClientKey,
}

impl fmt::Display for OrderValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyIdentifier => write!(f, "identifier must not be empty"),
            Self::PaddedIdentifier => {
                write!(f, "identifier must not carry surrounding whitespace")
            }
            Self::InvalidClientKey => write!(f, "client key must be a valid UUID"),
        }
    }
}

impl std::error::Error for OrderValidationError {}

fn validate_identifier(raw: &str) -> Result<(), OrderValidationError> {
    if raw.is_empty() {
        return Err(OrderValidationError::EmptyIdentifier);
    }
    if raw.trim() != raw {
        return Err(OrderValidationError::PaddedIdentifier);
    }
    Ok(())
}

/// Provider-issued order identifier; globally unique and immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(String);

impl OrderId {
    /// Validate and construct an [`OrderId`].
    ///
    /// # Examples
    /// ```
    /// use backend::domain::OrderId;
    ///
    /// let id = OrderId::new("order_9A33XWu170gUtm").expect("valid id");
    /// assert_eq!(id.as_ref(), "order_9A33XWu170gUtm");
    /// ```
    pub fn new(raw: impl Into<String>) -> Result<Self, OrderValidationError> {
        let raw = raw.into();
        validate_identifier(&raw)?;
        Ok(Self(raw))
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<OrderId> for String {
    fn from(value: OrderId) -> Self {
        value.0
    }
}

impl TryFrom<String> for OrderId {
    type Error = OrderValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Identifier of a purchasable credit package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct PackageId(String);

impl PackageId {
    /// Validate and construct a [`PackageId`].
    pub fn new(raw: impl Into<String>) -> Result<Self, OrderValidationError> {
        let raw = raw.into();
        validate_identifier(&raw)?;
        Ok(Self(raw))
    }
}

impl AsRef<str> for PackageId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<PackageId> for String {
    fn from(value: PackageId) -> Self {
        value.0
    }
}

impl TryFrom<String> for PackageId {
    type Error = OrderValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// The set of packages that may be purchased.
///
/// Configured at startup; order creation rejects anything outside it.
#[derive(Debug, Clone, Default)]
pub struct PackageCatalog {
    packages: HashSet<PackageId>,
}

impl PackageCatalog {
    /// Build a catalogue from the given package identifiers.
    pub fn new(packages: impl IntoIterator<Item = PackageId>) -> Self {
        Self {
            packages: packages.into_iter().collect(),
        }
    }

    /// Whether `package_id` may be purchased.
    pub fn contains(&self, package_id: &PackageId) -> bool {
        self.packages.contains(package_id)
    }
}

/// Caller-supplied idempotency key (UUID) making order creation retry-safe.
///
/// Sent via the `Idempotency-Key` header. A repeated key with an identical
/// payload replays the stored order instead of minting a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientKey(Uuid, String);

impl ClientKey {
    /// Validate and construct a [`ClientKey`] from a string.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::ClientKey;
    ///
    /// let key = ClientKey::new("550e8400-e29b-41d4-a716-446655440000").expect("valid UUID");
    /// assert_eq!(key.as_ref(), "550e8400-e29b-41d4-a716-446655440000");
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self, OrderValidationError> {
        let raw = raw.as_ref();
        validate_identifier(raw)?;
        let parsed = Uuid::parse_str(raw).map_err(|_| OrderValidationError::InvalidClientKey)?;
        Ok(Self(parsed, raw.to_owned()))
    }

    /// Generate a new random key; primarily useful in tests.
    pub fn random() -> Self {
        let uuid = Uuid::new_v4();
        Self(uuid, uuid.to_string())
    }
}

impl AsRef<str> for ClientKey {
    fn as_ref(&self) -> &str {
        self.1.as_str()
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<ClientKey> for String {
    fn from(value: ClientKey) -> Self {
        value.1
    }
}

impl TryFrom<String> for ClientKey {
    type Error = OrderValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Server-persisted order lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Registered with the gateway, awaiting verification.
    Created,
    /// A gateway signature verified; credits were issued.
    Verified,
    /// Verification failed; no credits were or will be issued.
    Failed,
    /// Aged out before any verification attempt.
    Expired,
}

impl OrderStatus {
    /// Whether no further transitions are valid from this state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Created)
    }
}

/// A provider-registered intent to charge a fixed amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Provider-issued order identifier.
    pub id: OrderId,
    /// Amount in settlement-currency minor units; strictly positive.
    pub amount: MinorUnits,
    /// Settlement currency the gateway registered the order in.
    pub currency: Currency,
    /// Package the caller is purchasing.
    pub package_id: PackageId,
    /// Gateway public key identifier the client needs to open the payment UI.
    pub key_id: String,
    /// When the order was registered.
    pub created_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub status: OrderStatus,
    /// Caller-supplied idempotency key, when one was presented.
    pub client_key: Option<ClientKey>,
}

impl Order {
    /// Construct a freshly registered order in the [`OrderStatus::Created`]
    /// state.
    pub fn created(
        id: OrderId,
        amount: MinorUnits,
        currency: Currency,
        package_id: PackageId,
        key_id: impl Into<String>,
        client_key: Option<ClientKey>,
    ) -> Self {
        Self {
            id,
            amount,
            currency,
            package_id,
            key_id: key_id.into(),
            created_at: Utc::now(),
            status: OrderStatus::Created,
            client_key,
        }
    }
}
