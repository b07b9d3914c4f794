//! Receipt endpoints: upload (the ingestion pipeline), list, detail, delete.
//!
//! All handlers take the authenticated `UserContext` injected by the auth
//! middleware; every repository call is scoped to that owner.

use axum::extract::{Multipart, Path, State};
use axum::{Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::db::repository::receipt::{delete_by_owner, get_by_owner, list_by_owner};
use crate::models::Receipt;
use crate::pipeline::ingest::ingest_receipt;

/// Fixed multipart field name for the uploaded image.
const UPLOAD_FIELD: &str = "receipt";

#[derive(Serialize)]
pub struct ListResponse {
    pub receipts: Vec<Receipt>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `POST /api/receipts` — run the ingestion pipeline on one uploaded image.
pub async fn upload(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    mut multipart: Multipart,
) -> Result<Json<Receipt>, ApiError> {
    let mut file: Option<(String, axum::body::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            let name = field.file_name().unwrap_or(UPLOAD_FIELD).to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
            file = Some((name, bytes));
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("no receipt image in the request".into()))?;

    let receipt = ingest_receipt(&ctx, user.user_id, &file_name, &bytes).await?;
    Ok(Json(receipt))
}

/// `GET /api/receipts` — caller's receipts, newest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<ListResponse>, ApiError> {
    let receipts = {
        let conn = ctx
            .db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".into()))?;
        list_by_owner(&conn, user.user_id)?
    };

    let total = receipts.len();
    Ok(Json(ListResponse { receipts, total }))
}

/// `GET /api/receipts/:id` — one receipt, 404 if absent or not the caller's.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<Json<Receipt>, ApiError> {
    let id = parse_receipt_id(&id)?;

    let receipt = {
        let conn = ctx
            .db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".into()))?;
        get_by_owner(&conn, user.user_id, id)?
    };

    receipt
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Receipt not found".into()))
}

/// `DELETE /api/receipts/:id` — permanent, owner-scoped delete. The stored
/// image is released best-effort after the row is gone; a failed object
/// removal is logged and does not fail the request.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_receipt_id(&id)?;

    let storage_ref = {
        let conn = ctx
            .db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".into()))?;
        delete_by_owner(&conn, user.user_id, id)?
    };

    let storage_ref = storage_ref.ok_or_else(|| ApiError::NotFound("Receipt not found".into()))?;

    if let Err(e) = ctx.store.remove(&storage_ref) {
        tracing::warn!(%storage_ref, error = %e, "Failed to remove stored image for deleted receipt");
    }

    Ok(Json(MessageResponse {
        message: "Receipt deleted".to_string(),
    }))
}

/// An unparseable id cannot name any receipt, so it gets the same not-found
/// outcome as an unknown one.
fn parse_receipt_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Receipt not found".into()))
}
