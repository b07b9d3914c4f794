//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, hashes it and resolves the hash
//! to a user. The request only reaches a handler with a `UserContext` in its
//! extensions; everything else is rejected with 401 before any pipeline
//! stage runs.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{hash_token, ApiContext, UserContext};
use crate::db::repository::user::user_for_token;

pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?
        .to_string();

    let hash = hash_token(&token);
    let user_id = {
        let conn = ctx
            .db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".into()))?;
        user_for_token(&conn, &hash)?
    }; // guard dropped before any .await

    let user_id = user_id.ok_or(ApiError::Unauthorized)?;
    req.extensions_mut().insert(UserContext { user_id });

    Ok(next.run(req).await)
}
