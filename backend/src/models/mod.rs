//! Transport-facing payload types shared across endpoints.

pub mod error;

pub use error::{Error, ErrorCode};

/// Convenient result alias for HTTP handlers.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use backend::models::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::not_found("missing"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
