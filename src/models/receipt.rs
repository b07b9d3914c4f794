//! Receipt entity and the transient extraction result it is built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single purchased item on a receipt. Field names match the wire schema
/// the extraction provider is instructed to emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub item_name: String,
    pub item_cost: f64,
}

/// Validated output of the extraction pipeline. Same shape as [`Receipt`]
/// minus identity, ownership and storage linkage. Produced once per upload
/// and consumed once by the ingestion orchestrator; never persisted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    /// `DD/MM/YYYY`, validated.
    pub date: String,
    /// 3-letter uppercase code, validated.
    pub currency: String,
    pub vendor_name: String,
    /// Extraction order preserved; may be empty.
    pub items: Vec<ReceiptItem>,
    pub tax: f64,
    pub total: f64,
}

/// Persisted receipt. Created only by the repository after a successful
/// end-to-end ingestion; never updated afterwards.
///
/// Serializes to the client-facing wire shape; `storage_ref` stays
/// server-side (it is only needed to release the stored image on delete).
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub owner_id: Uuid,
    pub date: String,
    pub currency: String,
    pub vendor_name: String,
    pub receipt_items: Vec<ReceiptItem>,
    pub tax: f64,
    pub total: f64,
    pub image_url: String,
    #[serde(skip_serializing)]
    pub storage_ref: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}
