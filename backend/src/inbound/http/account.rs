//! Account API handlers.
//!
//! ```text
//! GET /api/account
//! ```
//!
//! The one identity-requiring route in this core: it exercises the full 401
//! contract for absent, expired, invalid, and revoked credentials.

use actix_web::{get, web};

use crate::domain::VerifiedIdentity;
use crate::models::{ApiResult, Error};

use super::bearer::ClientIdentity;

/// Return the verified identity of the caller.
#[utoipa::path(
    get,
    path = "/api/account",
    responses(
        (status = 200, description = "Verified caller identity", body = VerifiedIdentity),
        (status = 401, description = "Missing or rejected credential", body = Error),
    ),
    tags = ["account"],
    operation_id = "currentAccount",
    security([])
)]
#[get("/account")]
pub async fn current_account(identity: ClientIdentity) -> ApiResult<web::Json<VerifiedIdentity>> {
    let verified = identity.require()?;
    Ok(web::Json(verified.clone()))
}
