//! Payment API handlers.
//!
//! ```text
//! POST /api/payments/{provider}/create-order
//! POST /api/payments/{provider}/verify
//! GET  /api/payments/{provider}/orders/{order_id}/checkout?method=upi
//! ```
//!
//! Requests may carry `Authorization: Bearer <credential>`; absence is legal
//! on every payment route, presence plus invalidity is a 401.

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

use crate::domain::ports::{
    CreateOrderRequest, OrderError, VerificationServiceError, VerifyPaymentRequest,
};
use crate::domain::{
    ClientKey, Currency, MethodSelection, MinorUnits, Order, OrderId, PackageId, PaymentReference,
    Signature, VerificationFailure, VerificationOutcome,
};
use crate::models::{ApiResult, Error, ErrorCode};

use super::bearer::ClientIdentity;
use super::state::HttpState;

/// Header carrying the caller's order-creation idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Request body for `POST /api/payments/{provider}/create-order`.
///
/// Example JSON:
/// `{"amount": 12.00, "currency": "USD", "packageId": "starter-pack"}`
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderBody {
    /// Amount in the caller's currency, major units.
    #[schema(value_type = f64, example = 12.00)]
    pub amount: Decimal,
    /// Caller's currency; must be on the conversion policy.
    pub currency: Currency,
    /// Package being purchased.
    #[schema(example = "starter-pack")]
    pub package_id: String,
}

/// Response body for a created order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedBody {
    /// Provider-issued order identifier.
    pub id: OrderId,
    /// Amount in settlement minor units.
    pub amount: MinorUnits,
    /// Settlement currency.
    pub currency: Currency,
    /// Gateway public key identifier for the client checkout surface.
    pub key_id: String,
}

impl From<Order> for OrderCreatedBody {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
            key_id: order.key_id,
        }
    }
}

/// Request body for `POST /api/payments/{provider}/verify`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentBody {
    /// Order the payment claims to settle.
    pub order_id: String,
    /// Provider-issued payment reference.
    pub payment_reference: String,
    /// Signature the provider produced over the order and reference.
    pub signature: String,
    /// Package the client believes it purchased.
    pub package_id: String,
}

/// Response body for a verified payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifySuccessBody {
    /// Always `true`; failures use [`VerifyRejectionBody`].
    pub success: bool,
}

/// Response body for a failed verification attempt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRejectionBody {
    /// Always `false`.
    pub success: bool,
    /// Stable machine-readable failure code.
    pub code: ErrorCode,
    /// Human-readable failure message.
    pub message: String,
}

fn require_provider(state: &HttpState, provider: &str) -> Result<(), Error> {
    if provider == state.provider {
        Ok(())
    } else {
        Err(Error::not_found(format!(
            "unknown payment provider: {provider}"
        )))
    }
}

fn client_key_from(req: &HttpRequest) -> Result<Option<ClientKey>, Error> {
    let Some(value) = req.headers().get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };
    let raw = value.to_str().map_err(|_| {
        Error::invalid_request("Idempotency-Key header must be ASCII")
    })?;
    let key = ClientKey::new(raw).map_err(|err| {
        Error::invalid_request(format!("invalid Idempotency-Key header: {err}"))
    })?;
    Ok(Some(key))
}

fn map_order_error(error: OrderError) -> Error {
    match error {
        OrderError::InvalidAmount => Error::invalid_request("amount must be strictly positive")
            .with_details(json!({ "field": "amount" })),
        OrderError::UnknownPackage { package_id } => {
            Error::invalid_request(format!("unknown package: {package_id}"))
                .with_details(json!({ "field": "packageId" }))
        }
        OrderError::UnsupportedCurrency { currency } => {
            Error::invalid_request(format!("unsupported currency: {currency}"))
                .with_details(json!({ "field": "currency" }))
        }
        OrderError::IdempotencyConflict => {
            Error::conflict("idempotency key reused with a different payload")
        }
        OrderError::UnknownOrder { order_id } => {
            Error::not_found(format!("unknown order: {order_id}"))
        }
        OrderError::GatewayUnavailable { message, timed_out } => {
            if timed_out {
                Error::gateway_timeout(message)
            } else {
                Error::bad_gateway(message)
            }
        }
        OrderError::Repository { message } => Error::internal(message),
    }
}

fn map_verification_error(error: VerificationServiceError) -> Error {
    match error {
        VerificationServiceError::Repository { message } => Error::internal(message),
        VerificationServiceError::Ledger { message } => Error::service_unavailable(message),
    }
}

fn verification_rejection(reason: VerificationFailure) -> HttpResponse {
    let (status, code) = match reason {
        VerificationFailure::OrderNotFound => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
        VerificationFailure::OrderExpired
        | VerificationFailure::PackageMismatch
        | VerificationFailure::SignatureMismatch => {
            (StatusCode::BAD_REQUEST, ErrorCode::InvalidRequest)
        }
    };
    HttpResponse::build(status).json(VerifyRejectionBody {
        success: false,
        code,
        message: reason.to_string(),
    })
}

fn field_error(field: &str, message: impl std::fmt::Display) -> Error {
    Error::invalid_request(format!("invalid {field}: {message}"))
        .with_details(json!({ "field": field }))
}

/// Create a payment order.
///
/// Anonymous callers are welcome; a presented credential must verify.
#[utoipa::path(
    post,
    path = "/api/payments/{provider}/create-order",
    request_body = CreateOrderBody,
    params(
        ("provider" = String, Path, description = "Payment provider slug"),
        ("Idempotency-Key" = Option<String>, Header, description = "UUID making retries safe"),
    ),
    responses(
        (status = 200, description = "Order created", body = OrderCreatedBody),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Presented credential rejected", body = Error),
        (status = 404, description = "Unknown provider", body = Error),
        (status = 409, description = "Idempotency key conflict", body = Error),
        (status = 502, description = "Gateway rejected the order", body = Error),
        (status = 504, description = "Gateway timed out", body = Error),
    ),
    tags = ["payments"],
    operation_id = "createOrder",
    security([])
)]
#[post("/payments/{provider}/create-order")]
pub async fn create_order(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    identity: ClientIdentity,
    req: HttpRequest,
    payload: web::Json<CreateOrderBody>,
) -> ApiResult<web::Json<OrderCreatedBody>> {
    require_provider(&state, &path)?;
    let subject = identity.optional()?.map(|verified| verified.subject_id.clone());
    let client_key = client_key_from(&req)?;
    let body = payload.into_inner();
    let package_id =
        PackageId::new(body.package_id).map_err(|err| field_error("packageId", err))?;

    let order = state
        .orders
        .create_order(CreateOrderRequest {
            amount: body.amount,
            currency: body.currency,
            package_id,
            client_key,
        })
        .await
        .map_err(map_order_error)?;
    if let Some(subject) = subject {
        info!(order_id = %order.id, subject_id = %subject, "order created for subject");
    }
    Ok(web::Json(OrderCreatedBody::from(order)))
}

/// Verify a claimed completed payment.
///
/// Replaying a finalised order returns its terminal outcome unchanged and
/// never credits twice.
#[utoipa::path(
    post,
    path = "/api/payments/{provider}/verify",
    request_body = VerifyPaymentBody,
    params(("provider" = String, Path, description = "Payment provider slug")),
    responses(
        (status = 200, description = "Payment verified", body = VerifySuccessBody),
        (status = 400, description = "Verification failed", body = VerifyRejectionBody),
        (status = 401, description = "Presented credential rejected", body = Error),
        (status = 404, description = "Unknown provider or order", body = Error),
    ),
    tags = ["payments"],
    operation_id = "verifyPayment",
    security([])
)]
#[post("/payments/{provider}/verify")]
pub async fn verify_payment(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    identity: ClientIdentity,
    payload: web::Json<VerifyPaymentBody>,
) -> ApiResult<HttpResponse> {
    require_provider(&state, &path)?;
    let subject = identity.optional()?.map(|verified| verified.subject_id.clone());
    let body = payload.into_inner();
    let request = VerifyPaymentRequest {
        order_id: OrderId::new(body.order_id).map_err(|err| field_error("orderId", err))?,
        payment_reference: PaymentReference::new(body.payment_reference)
            .map_err(|err| field_error("paymentReference", err))?,
        signature: Signature::new(body.signature)
            .map_err(|err| field_error("signature", err))?,
        package_id: PackageId::new(body.package_id)
            .map_err(|err| field_error("packageId", err))?,
        subject_id: subject,
    };

    let outcome = state
        .verification
        .verify(request)
        .await
        .map_err(map_verification_error)?;
    match outcome {
        VerificationOutcome::Verified { .. } => {
            Ok(HttpResponse::Ok().json(VerifySuccessBody { success: true }))
        }
        VerificationOutcome::Failed { reason, .. } => Ok(verification_rejection(reason)),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CheckoutQuery {
    method: Option<String>,
}

/// Project an order into the descriptor the checkout surface opens the
/// provider UI with.
#[utoipa::path(
    get,
    path = "/api/payments/{provider}/orders/{order_id}/checkout",
    params(
        ("provider" = String, Path, description = "Payment provider slug"),
        ("order_id" = String, Path, description = "Provider-issued order identifier"),
        ("method" = Option<String>, Query, description = "card, upi, wallet, netbanking, or all"),
    ),
    responses(
        (status = 200, description = "Checkout descriptor", body = crate::domain::CheckoutDescriptor),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Unknown provider or order", body = Error),
    ),
    tags = ["payments"],
    operation_id = "checkoutDescriptor",
    security([])
)]
#[get("/payments/{provider}/orders/{order_id}/checkout")]
pub async fn checkout_descriptor(
    state: web::Data<HttpState>,
    path: web::Path<(String, String)>,
    query: web::Query<CheckoutQuery>,
) -> ApiResult<web::Json<crate::domain::CheckoutDescriptor>> {
    let (provider, order_id) = path.into_inner();
    require_provider(&state, &provider)?;
    let order_id = OrderId::new(order_id).map_err(|err| field_error("orderId", err))?;
    let selection = MethodSelection::from_param(query.method.as_deref())
        .map_err(|err| field_error("method", err))?;
    let descriptor = state
        .orders
        .checkout_descriptor(&order_id, selection)
        .await
        .map_err(map_order_error)?;
    Ok(web::Json(descriptor))
}
