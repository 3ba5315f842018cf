//! Reqwest-backed payment gateway adapter.
//!
//! Owns transport details only: request serialisation, basic-auth
//! credentials, timeout, HTTP error mapping, and JSON decoding of the
//! provider's order descriptor. The registration endpoint follows the
//! provider's orders API (`POST {base}/orders`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::domain::OrderId;
use crate::domain::ports::{GatewayOrder, OrderDraft, PaymentGateway, PaymentGatewayError};

/// Default deadline for calls into the provider.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Merchant credentials for the provider's REST API.
#[derive(Clone)]
pub struct GatewayCredentials {
    /// Public key identifier, also handed to the client checkout surface.
    pub key_id: String,
    /// API secret used as the basic-auth password.
    pub key_secret: Zeroizing<String>,
}

impl GatewayCredentials {
    /// Bundle a key pair.
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: Zeroizing::new(key_secret.into()),
        }
    }
}

impl std::fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("key_id", &self.key_id)
            .field("key_secret", &"..")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct OrderRequestDto<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: OrderNotesDto<'a>,
}

#[derive(Debug, Serialize)]
struct OrderNotesDto<'a> {
    package_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct OrderResponseDto {
    id: String,
}

/// Gateway adapter performing HTTPS calls against one provider endpoint.
pub struct HttpPaymentGateway {
    client: Client,
    orders_url: Url,
    credentials: GatewayCredentials,
}

impl HttpPaymentGateway {
    /// Build an adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL cannot address the orders endpoint
    /// or the HTTP client cannot be constructed.
    pub fn new(
        base_url: &Url,
        credentials: GatewayCredentials,
        timeout: Duration,
    ) -> Result<Self, PaymentGatewayError> {
        let orders_url = base_url
            .join("orders")
            .map_err(|err| PaymentGatewayError::transport(err.to_string()))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PaymentGatewayError::transport(err.to_string()))?;
        Ok(Self {
            client,
            orders_url,
            credentials,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn register_order(
        &self,
        draft: &OrderDraft,
    ) -> Result<GatewayOrder, PaymentGatewayError> {
        let body = OrderRequestDto {
            amount: draft.amount.get(),
            currency: draft.currency.code(),
            receipt: &draft.receipt,
            notes: OrderNotesDto {
                package_id: draft.package_id.as_ref(),
            },
        };
        let response = self
            .client
            .post(self.orders_url.clone())
            .basic_auth(
                &self.credentials.key_id,
                Some(self.credentials.key_secret.as_str()),
            )
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, bytes.as_ref()));
        }

        let decoded: OrderResponseDto = serde_json::from_slice(bytes.as_ref())
            .map_err(|err| PaymentGatewayError::decode(format!("invalid order payload: {err}")))?;
        let provider_order_id = OrderId::new(decoded.id)
            .map_err(|err| PaymentGatewayError::decode(format!("unusable order id: {err}")))?;
        Ok(GatewayOrder {
            provider_order_id,
            key_id: self.credentials.key_id.clone(),
        })
    }
}

fn map_transport_error(error: reqwest::Error) -> PaymentGatewayError {
    if error.is_timeout() {
        PaymentGatewayError::timeout(error.to_string())
    } else {
        PaymentGatewayError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> PaymentGatewayError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    };
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            PaymentGatewayError::timeout(message)
        }
        _ if status.is_client_error() => PaymentGatewayError::rejected(message),
        _ => PaymentGatewayError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
