use crate::AppState;
use crate::api::error::AppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Requires `Authorization: Bearer <HOOK_SECRET>` when a secret is configured.
pub async fn hook_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(secret) = state.config.hook_secret.as_deref() else {
        return Ok(next.run(req).await);
    };

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match token {
        Some(token) if constant_time_eq(token.as_bytes(), secret.as_bytes()) => {
            Ok(next.run(req).await)
        }
        Some(_) => Err(AppError::Unauthorized("Invalid hook secret".to_string())),
        None => Err(AppError::Unauthorized("Missing hook secret".to_string())),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
