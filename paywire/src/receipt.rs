//! Purchase metadata from a successful paid response.

use serde::Serialize;
use serde_json::Value;

use crate::encoding::decode_json;
use crate::error::PaymentError;

/// Key of the marketplace metadata object in a paid response body.
pub const PURCHASE_METADATA_KEY: &str = "_1ly";

/// Proof of a completed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    /// Marketplace purchase identifier.
    pub purchase_id: String,
    /// Token that authorizes leaving a review for this purchase.
    pub review_token: String,
    /// The resource payload, passed through untouched.
    pub payload: Value,
    /// Settlement details reported by the server, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<Value>,
}

/// Builds a [`PurchaseReceipt`] from a paid response.
///
/// `settlement_header` is the raw `PAYMENT-RESPONSE` value, either base64 JSON
/// or plain JSON. An undecodable header is ignored rather than failing the
/// receipt, since the payment has already gone through.
///
/// # Errors
///
/// Returns [`PaymentError::ReceiptParse`] if the purchase identifier or review
/// token is missing.
pub fn extract_receipt(
    body: Value,
    settlement_header: Option<&[u8]>,
) -> Result<PurchaseReceipt, PaymentError> {
    let metadata = body.get(PURCHASE_METADATA_KEY).unwrap_or(&body);
    let purchase_id = field(metadata, &["purchaseId", "purchase_id"])
        .ok_or_else(|| PaymentError::ReceiptParse("missing purchaseId".into()))?;
    let review_token = field(metadata, &["reviewToken", "review_token"])
        .ok_or_else(|| PaymentError::ReceiptParse("missing reviewToken".into()))?;
    Ok(PurchaseReceipt {
        purchase_id,
        review_token,
        settlement: settlement_header.and_then(decode_settlement),
        payload: body,
    })
}

/// Decodes a `PAYMENT-RESPONSE` header value.
#[must_use]
pub fn decode_settlement(raw: &[u8]) -> Option<Value> {
    decode_json::<Value>(raw)
        .ok()
        .or_else(|| serde_json::from_slice(raw.trim_ascii()).ok())
}

fn field(object: &Value, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match object.get(*name)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::encode_json;
    use serde_json::json;

    #[test]
    fn test_reads_marketplace_metadata() {
        let body = json!({
            "data": {"answer": 42},
            "_1ly": {"purchaseId": "p_123", "reviewToken": "r_456"}
        });
        let receipt = extract_receipt(body.clone(), None).unwrap();
        assert_eq!(receipt.purchase_id, "p_123");
        assert_eq!(receipt.review_token, "r_456");
        assert_eq!(receipt.payload, body);
        assert!(receipt.settlement.is_none());
    }

    #[test]
    fn test_reads_top_level_snake_case() {
        let body = json!({"purchase_id": 77, "review_token": "tok"});
        let receipt = extract_receipt(body, None).unwrap();
        assert_eq!(receipt.purchase_id, "77");
        assert_eq!(receipt.review_token, "tok");
    }

    #[test]
    fn test_missing_metadata_is_receipt_error() {
        let err = extract_receipt(json!({"data": "ok"}), None).unwrap_err();
        assert!(matches!(err, PaymentError::ReceiptParse(_)));
        let err = extract_receipt(json!({"_1ly": {"purchaseId": "p"}}), None).unwrap_err();
        assert!(matches!(err, PaymentError::ReceiptParse(_)));
        let err = extract_receipt(Value::String("plain text".into()), None).unwrap_err();
        assert!(matches!(err, PaymentError::ReceiptParse(_)));
    }

    #[test]
    fn test_settlement_header_base64_or_raw() {
        let settlement = json!({"success": true, "transaction": "0xabc"});
        let body = json!({"_1ly": {"purchaseId": "p", "reviewToken": "r"}});
        let encoded = encode_json(&settlement).unwrap();
        let receipt = extract_receipt(body.clone(), Some(encoded.as_bytes())).unwrap();
        assert_eq!(receipt.settlement, Some(settlement.clone()));

        let raw = serde_json::to_vec(&settlement).unwrap();
        let receipt = extract_receipt(body.clone(), Some(&raw)).unwrap();
        assert_eq!(receipt.settlement, Some(settlement));

        let receipt = extract_receipt(body, Some(b"???")).unwrap();
        assert!(receipt.settlement.is_none());
    }
}
