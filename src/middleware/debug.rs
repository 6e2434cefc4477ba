//! Debug-mode error bodies.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::ErrorDetail;

/// Add the internal error text to 5xx JSON bodies.
///
/// Installed only when `Settings::debug` is set.
pub async fn expose_error_detail(mut response: Response) -> Response {
    let Some(ErrorDetail(detail)) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };

    let body = Json(json!({
        "error": {
            "code": "internal_error",
            "message": "An internal error occurred",
            "detail": detail,
        }
    }));
    *response.body_mut() = body.into_response().into_body();
    response
}
