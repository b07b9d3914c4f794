//! Strict parse-and-validate of the vision model's response.
//!
//! The model is instructed to return a single JSON object with an exact
//! field schema, but nothing it returns is trusted. Missing required fields,
//! malformed dates or currency codes, and monetary values that are not JSON
//! numbers are all hard rejections — never best-effort coercions. Extra
//! fields are ignored.

use serde_json::Value;

use super::ExtractionError;
use crate::models::{ExtractionResult, ReceiptItem};

/// Parse the raw model output into a validated [`ExtractionResult`].
pub fn parse_extraction_response(raw: &str) -> Result<ExtractionResult, ExtractionError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ExtractionError::MalformedJson(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ExtractionError::MalformedJson("top level is not an object".into()))?;

    let date = require_string(object, "date")?;
    validate_date(&date)?;

    let vendor_name = require_string(object, "vendor_name")?;
    if vendor_name.trim().is_empty() {
        return Err(ExtractionError::Invalid("vendor_name is blank".into()));
    }

    let currency = normalize_currency(&require_string(object, "currency")?)?;

    let items = object
        .get("receipt_items")
        .filter(|v| !v.is_null())
        .ok_or_else(|| ExtractionError::Invalid("receipt_items is missing".into()))?
        .as_array()
        .ok_or_else(|| ExtractionError::Invalid("receipt_items is not an array".into()))?
        .iter()
        .enumerate()
        .map(|(i, item)| parse_item(i, item))
        .collect::<Result<Vec<_>, _>>()?;

    let tax = require_money(object, "tax")?;
    let total = require_money(object, "total")?;

    Ok(ExtractionResult {
        date,
        currency,
        vendor_name,
        items,
        tax,
        total,
    })
}

fn require_string(
    object: &serde_json::Map<String, Value>,
    field: &str,
) -> Result<String, ExtractionError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ExtractionError::Invalid(format!("{field} is missing"))),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ExtractionError::Invalid(format!(
            "{field} is not a string (got {})",
            type_name(other)
        ))),
    }
}

/// Non-negative monetary value. Must be a JSON number; `"18.00"` or
/// `"₹100"` are rejections, not parse targets.
fn require_money(
    object: &serde_json::Map<String, Value>,
    field: &str,
) -> Result<f64, ExtractionError> {
    let value = match object.get(field) {
        None | Some(Value::Null) => {
            return Err(ExtractionError::Invalid(format!("{field} is missing")))
        }
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ExtractionError::Invalid(format!("{field} is not representable")))?,
        Some(other) => {
            return Err(ExtractionError::Invalid(format!(
                "{field} is not numeric (got {})",
                type_name(other)
            )))
        }
    };
    if !value.is_finite() || value < 0.0 {
        return Err(ExtractionError::Invalid(format!(
            "{field} is negative or not finite"
        )));
    }
    Ok(value)
}

fn parse_item(index: usize, item: &Value) -> Result<ReceiptItem, ExtractionError> {
    let object = item.as_object().ok_or_else(|| {
        ExtractionError::Invalid(format!("receipt_items[{index}] is not an object"))
    })?;

    let item_name = match object.get("item_name") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => {
            return Err(ExtractionError::Invalid(format!(
                "receipt_items[{index}].item_name is missing or blank"
            )))
        }
    };
    let item_cost = match object.get("item_cost") {
        Some(Value::Number(n)) => n.as_f64().filter(|c| c.is_finite()).ok_or_else(|| {
            ExtractionError::Invalid(format!("receipt_items[{index}].item_cost is not representable"))
        })?,
        _ => {
            return Err(ExtractionError::Invalid(format!(
                "receipt_items[{index}].item_cost is not numeric"
            )))
        }
    };

    Ok(ReceiptItem { item_name, item_cost })
}

/// `DD/MM/YYYY`, zero-padded, and a real calendar date.
fn validate_date(date: &str) -> Result<(), ExtractionError> {
    let bytes = date.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[2] == b'/'
        && bytes[5] == b'/'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| matches!(i, 2 | 5) || b.is_ascii_digit());
    let calendar_ok =
        shape_ok && chrono::NaiveDate::parse_from_str(date, "%d/%m/%Y").is_ok();
    if !calendar_ok {
        return Err(ExtractionError::Invalid(format!(
            "date {date:?} is not DD/MM/YYYY"
        )));
    }
    Ok(())
}

/// Uppercase and verify a 3-letter currency code.
fn normalize_currency(raw: &str) -> Result<String, ExtractionError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(ExtractionError::Invalid(format!(
            "currency {raw:?} is not a 3-letter code"
        )));
    }
    Ok(code)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_response() -> serde_json::Value {
        serde_json::json!({
            "date": "01/01/2024",
            "currency": "INR",
            "vendor_name": "Cafe",
            "receipt_items": [
                {"item_name": "Tea", "item_cost": 20},
                {"item_name": "Samosa", "item_cost": 15.5}
            ],
            "tax": 2,
            "total": 37.5
        })
    }

    fn parse(value: serde_json::Value) -> Result<ExtractionResult, ExtractionError> {
        parse_extraction_response(&value.to_string())
    }

    #[test]
    fn parses_valid_response() {
        let result = parse(valid_response()).unwrap();
        assert_eq!(result.date, "01/01/2024");
        assert_eq!(result.currency, "INR");
        assert_eq!(result.vendor_name, "Cafe");
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.items[0].item_name, "Tea");
        assert_eq!(result.items[0].item_cost, 20.0);
        assert_eq!(result.tax, 2.0);
        assert_eq!(result.total, 37.5);
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_extraction_response("the receipt shows a cafe bill"),
            Err(ExtractionError::MalformedJson(_))
        ));
    }

    #[test]
    fn rejects_non_object_json() {
        assert!(matches!(
            parse_extraction_response("[1, 2, 3]"),
            Err(ExtractionError::MalformedJson(_))
        ));
    }

    #[test]
    fn rejects_missing_required_fields() {
        for field in ["date", "vendor_name", "currency", "receipt_items", "tax", "total"] {
            let mut value = valid_response();
            value.as_object_mut().unwrap().remove(field);
            assert!(
                matches!(parse(value), Err(ExtractionError::Invalid(_))),
                "missing {field} must be rejected",
            );
        }
    }

    #[test]
    fn rejects_null_required_fields() {
        for field in ["date", "vendor_name", "tax", "total"] {
            let mut value = valid_response();
            value[field] = serde_json::Value::Null;
            assert!(
                matches!(parse(value), Err(ExtractionError::Invalid(_))),
                "null {field} must be rejected",
            );
        }
    }

    #[test]
    fn rejects_string_monetary_values() {
        let mut value = valid_response();
        value["tax"] = serde_json::json!("18.00");
        assert!(matches!(parse(value), Err(ExtractionError::Invalid(_))));

        let mut value = valid_response();
        value["total"] = serde_json::json!("₹100");
        assert!(matches!(parse(value), Err(ExtractionError::Invalid(_))));

        let mut value = valid_response();
        value["receipt_items"][0]["item_cost"] = serde_json::json!("20");
        assert!(matches!(parse(value), Err(ExtractionError::Invalid(_))));
    }

    #[test]
    fn rejects_negative_tax_and_total() {
        let mut value = valid_response();
        value["tax"] = serde_json::json!(-1.0);
        match parse(value) {
            Err(ExtractionError::Invalid(msg)) => {
                assert_eq!(msg, "tax is negative or not finite")
            }
            other => panic!("expected Invalid, got {other:?}"),
        }

        let mut value = valid_response();
        value["total"] = serde_json::json!(-22);
        assert!(matches!(parse(value), Err(ExtractionError::Invalid(_))));
    }

    #[test]
    fn rejects_items_that_are_not_an_array() {
        let mut value = valid_response();
        value["receipt_items"] = serde_json::json!({"item_name": "Tea"});
        assert!(matches!(parse(value), Err(ExtractionError::Invalid(_))));
    }

    #[test]
    fn rejects_malformed_item() {
        let mut value = valid_response();
        value["receipt_items"][1] = serde_json::json!({"item_name": "Samosa"});
        assert!(matches!(parse(value), Err(ExtractionError::Invalid(_))));
    }

    #[test]
    fn empty_items_accepted() {
        let mut value = valid_response();
        value["receipt_items"] = serde_json::json!([]);
        let result = parse(value).unwrap();
        assert!(result.items.is_empty());
    }

    #[test]
    fn extra_fields_ignored() {
        let mut value = valid_response();
        value["confidence"] = serde_json::json!(0.97);
        value["notes"] = serde_json::json!("looks handwritten");
        assert!(parse(value).is_ok());
    }

    #[test]
    fn currency_is_normalized_to_uppercase() {
        let mut value = valid_response();
        value["currency"] = serde_json::json!("inr");
        assert_eq!(parse(value).unwrap().currency, "INR");
    }

    #[test]
    fn rejects_bad_currency_codes() {
        for code in ["RUPEES", "₹", "IN", "12X", ""] {
            let mut value = valid_response();
            value["currency"] = serde_json::json!(code);
            assert!(
                matches!(parse(value), Err(ExtractionError::Invalid(_))),
                "currency {code:?} must be rejected",
            );
        }
    }

    #[test]
    fn rejects_bad_date_formats() {
        for date in ["2024-01-01", "1/1/2024", "32/01/2024", "01/13/2024", "January 1"] {
            let mut value = valid_response();
            value["date"] = serde_json::json!(date);
            assert!(
                matches!(parse(value), Err(ExtractionError::Invalid(_))),
                "date {date:?} must be rejected",
            );
        }
    }

    #[test]
    fn zero_tax_accepted() {
        let mut value = valid_response();
        value["tax"] = serde_json::json!(0);
        assert_eq!(parse(value).unwrap().tax, 0.0);
    }

    #[test]
    fn negative_item_cost_accepted() {
        // Discount lines are legitimate; only tax and total are constrained.
        let mut value = valid_response();
        value["receipt_items"][1] =
            serde_json::json!({"item_name": "Loyalty discount", "item_cost": -5.0});
        assert_eq!(parse(value).unwrap().items[1].item_cost, -5.0);
    }
}
