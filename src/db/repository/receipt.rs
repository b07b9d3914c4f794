//! Owner-scoped receipt persistence.
//!
//! Every operation takes the owner id explicitly; there is no way to read or
//! delete a receipt without naming its owner. Lookups for an id that does not
//! exist and an id that belongs to someone else are indistinguishable.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{ExtractionResult, Receipt, ReceiptItem};

/// Persist a validated extraction result for an owner.
///
/// The repository owns identity and timestamps: id and created/updated times
/// are generated here, never supplied by the caller. Receipt and line items
/// are written in one transaction.
pub fn create_receipt(
    conn: &mut Connection,
    owner_id: Uuid,
    extraction: ExtractionResult,
    image_url: String,
    storage_ref: String,
) -> Result<Receipt, DatabaseError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO receipts (id, owner_id, date, currency, vendor_name, tax, total,
         image_url, storage_ref, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            id.to_string(),
            owner_id.to_string(),
            extraction.date,
            extraction.currency,
            extraction.vendor_name,
            extraction.tax,
            extraction.total,
            image_url,
            storage_ref,
            now.to_rfc3339(),
            now.to_rfc3339(),
        ],
    )?;
    for (position, item) in extraction.items.iter().enumerate() {
        tx.execute(
            "INSERT INTO receipt_items (receipt_id, position, name, cost)
             VALUES (?1, ?2, ?3, ?4)",
            params![id.to_string(), position as i64, item.item_name, item.item_cost],
        )?;
    }
    tx.commit()?;

    Ok(Receipt {
        id,
        owner_id,
        date: extraction.date,
        currency: extraction.currency,
        vendor_name: extraction.vendor_name,
        receipt_items: extraction.items,
        tax: extraction.tax,
        total: extraction.total,
        image_url,
        storage_ref,
        created_at: now,
        updated_at: now,
    })
}

/// All receipts for an owner, newest first.
pub fn list_by_owner(conn: &Connection, owner_id: Uuid) -> Result<Vec<Receipt>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, date, currency, vendor_name, tax, total,
         image_url, storage_ref, created_at, updated_at
         FROM receipts WHERE owner_id = ?1
         ORDER BY created_at DESC, rowid DESC",
    )?;

    let rows = stmt.query_map(params![owner_id.to_string()], receipt_row)?;

    let mut receipts = Vec::new();
    for row in rows {
        let mut receipt = receipt_from_row(row?)?;
        receipt.receipt_items = items_for_receipt(conn, receipt.id)?;
        receipts.push(receipt);
    }
    Ok(receipts)
}

/// One receipt, scoped by owner. `None` whether the id is unknown or the
/// receipt belongs to a different owner.
pub fn get_by_owner(
    conn: &Connection,
    owner_id: Uuid,
    id: Uuid,
) -> Result<Option<Receipt>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, date, currency, vendor_name, tax, total,
         image_url, storage_ref, created_at, updated_at
         FROM receipts WHERE id = ?1 AND owner_id = ?2",
    )?;

    let row = stmt
        .query_row(params![id.to_string(), owner_id.to_string()], receipt_row)
        .optional()?;

    match row {
        None => Ok(None),
        Some(row) => {
            let mut receipt = receipt_from_row(row)?;
            receipt.receipt_items = items_for_receipt(conn, receipt.id)?;
            Ok(Some(receipt))
        }
    }
}

/// Delete a receipt, scoped by owner, returning the storage reference of its
/// image so the caller can release the stored object.
///
/// A single conditional DELETE: no read-before-delete, so two concurrent
/// deletes of the same id cannot both succeed. Line items cascade.
pub fn delete_by_owner(
    conn: &Connection,
    owner_id: Uuid,
    id: Uuid,
) -> Result<Option<String>, DatabaseError> {
    let storage_ref: Option<String> = conn
        .query_row(
            "DELETE FROM receipts WHERE id = ?1 AND owner_id = ?2 RETURNING storage_ref",
            params![id.to_string(), owner_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(storage_ref)
}

// Internal row type for Receipt mapping.
struct ReceiptRow {
    id: String,
    owner_id: String,
    date: String,
    currency: String,
    vendor_name: String,
    tax: f64,
    total: f64,
    image_url: String,
    storage_ref: String,
    created_at: String,
    updated_at: String,
}

fn receipt_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReceiptRow> {
    Ok(ReceiptRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        date: row.get(2)?,
        currency: row.get(3)?,
        vendor_name: row.get(4)?,
        tax: row.get(5)?,
        total: row.get(6)?,
        image_url: row.get(7)?,
        storage_ref: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn receipt_from_row(row: ReceiptRow) -> Result<Receipt, DatabaseError> {
    Ok(Receipt {
        id: parse_uuid(&row.id)?,
        owner_id: parse_uuid(&row.owner_id)?,
        date: row.date,
        currency: row.currency,
        vendor_name: row.vendor_name,
        receipt_items: Vec::new(),
        tax: row.tax,
        total: row.total,
        image_url: row.image_url,
        storage_ref: row.storage_ref,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

fn items_for_receipt(conn: &Connection, receipt_id: Uuid) -> Result<Vec<ReceiptItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT name, cost FROM receipt_items WHERE receipt_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![receipt_id.to_string()], |row| {
        Ok(ReceiptItem {
            item_name: row.get(0)?,
            item_cost: row.get(1)?,
        })
    })?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::CorruptRow(format!("uuid: {e}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow(format!("timestamp: {e}")))
}
