// rest/auth.rs — shared-key auth middleware.
//
// Every task route requires the `X-API-Key` header to match the secret
// configured at startup. Exact string equality, no sessions, no expiry.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use super::error::ApiError;
use crate::AppContext;

pub const API_KEY_HEADER: &str = "x-api-key";

pub async fn require_api_key(
    State(ctx): State<Arc<AppContext>>,
    req: Request,
    next: Next,
) -> Response {
    let received = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match received {
        Some(key) if key == ctx.config.api_key => next.run(req).await,
        Some(key) => {
            // Log only a short prefix of what was received — never the secret.
            let prefix: String = key.chars().take(8).collect();
            warn!(key_prefix = %prefix, "rejected request: API key mismatch");
            ApiError::Unauthorized.into_response()
        }
        None => {
            warn!("rejected request: missing {API_KEY_HEADER} header");
            ApiError::Unauthorized.into_response()
        }
    }
}
