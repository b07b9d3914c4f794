//! Ingestion orchestrator.
//!
//! Sequences the pipeline for one uploaded image and one owner. Exactly one
//! extraction attempt and one persistence attempt; no retries, and no
//! compensation after the image is stored — a failed extraction or insert
//! leaves the stored object behind as a logged orphan for out-of-band
//! cleanup.

use uuid::Uuid;

use super::extraction::parser::parse_extraction_response;
use super::validate::validate_image;
use super::IngestError;
use crate::api::types::ApiContext;
use crate::db::repository::receipt::create_receipt;
use crate::models::Receipt;

/// Run the full pipeline for an authenticated owner's upload.
///
/// Returns the persisted receipt; the caller builds the response from it
/// alone, never from intermediate extraction output.
pub async fn ingest_receipt(
    ctx: &ApiContext,
    owner_id: Uuid,
    file_name: &str,
    bytes: &[u8],
) -> Result<Receipt, IngestError> {
    let start = std::time::Instant::now();

    // Validate — no network or disk I/O happens before this passes.
    let kind = validate_image(file_name, bytes)?;

    // Store.
    let stored = ctx.store.store(owner_id, bytes, kind)?;
    tracing::debug!(storage_ref = %stored.storage_ref, "Receipt image stored");

    // Extract + validate the untrusted response, then persist. From here on
    // a failure orphans the stored object.
    let result = run_post_upload(ctx, owner_id, &stored).await;

    match &result {
        Ok(receipt) => {
            tracing::info!(
                receipt_id = %receipt.id,
                owner = %owner_id,
                vendor = %receipt.vendor_name,
                items = receipt.receipt_items.len(),
                elapsed_ms = %start.elapsed().as_millis(),
                "Receipt ingested"
            );
        }
        Err(err) => {
            tracing::warn!(
                owner = %owner_id,
                stage = err.stage(),
                storage_ref = %stored.storage_ref,
                "Ingestion failed after upload; stored object orphaned"
            );
        }
    }
    result
}

async fn run_post_upload(
    ctx: &ApiContext,
    owner_id: Uuid,
    stored: &super::storage::StoredImage,
) -> Result<Receipt, IngestError> {
    let raw = ctx.vision.extract_receipt(&stored.url).await?;
    let extraction = parse_extraction_response(&raw)?;

    let receipt = {
        let mut conn = ctx.db.lock().map_err(|_| {
            IngestError::Persistence(crate::db::DatabaseError::LockPoisoned)
        })?;
        create_receipt(
            &mut conn,
            owner_id,
            extraction,
            stored.url.clone(),
            stored.storage_ref.clone(),
        )?
    };
    Ok(receipt)
}
