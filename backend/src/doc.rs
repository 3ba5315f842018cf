//! OpenAPI surface served by Swagger UI in debug builds.

use utoipa::OpenApi;

use crate::domain::{CheckoutDescriptor, Currency, MinorUnits, OrderId, PaymentMethod, SubjectId,
    VerifiedIdentity};
use crate::inbound::http::payments::{
    CreateOrderBody, OrderCreatedBody, VerifyPaymentBody, VerifyRejectionBody, VerifySuccessBody,
};
use crate::models::{Error, ErrorCode};

/// Public OpenAPI document for the payment API.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::inbound::http::payments::create_order,
        crate::inbound::http::payments::verify_payment,
        crate::inbound::http::payments::checkout_descriptor,
        crate::inbound::http::account::current_account,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        CreateOrderBody,
        OrderCreatedBody,
        VerifyPaymentBody,
        VerifySuccessBody,
        VerifyRejectionBody,
        CheckoutDescriptor,
        PaymentMethod,
        Currency,
        MinorUnits,
        OrderId,
        SubjectId,
        VerifiedIdentity,
        Error,
        ErrorCode,
    )),
    tags(
        (name = "payments", description = "Order creation and payment verification"),
        (name = "account", description = "Verified caller identity"),
        (name = "health", description = "Probes"),
    )
)]
pub struct ApiDoc;
