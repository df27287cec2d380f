//! Payment header codec.

use http::{HeaderMap, HeaderValue};
use paywire::error::PaymentError;
use paywire::signer::SignedPayment;

use crate::constants::{
    PAYMENT_REQUIRED_HEADER, PAYMENT_RESPONSE_HEADER, PAYMENT_SIGNATURE_HEADER, X_PAYMENT_HEADER,
    X_PAYMENT_RESPONSE_HEADER,
};

/// Headers carrying `payment` on the paid retry.
///
/// The same base64 document goes into `PAYMENT-SIGNATURE` and the legacy
/// `X-PAYMENT`, so servers on either revision accept it.
///
/// # Errors
///
/// Returns [`PaymentError::Signing`] if the payload cannot be encoded.
pub fn payment_headers(payment: &SignedPayment) -> Result<HeaderMap, PaymentError> {
    let encoded = payment
        .encode_header()
        .map_err(|e| PaymentError::Signing(e.to_string()))?;
    let value =
        HeaderValue::from_str(&encoded).map_err(|e| PaymentError::Signing(e.to_string()))?;
    let mut headers = HeaderMap::with_capacity(2);
    headers.insert(PAYMENT_SIGNATURE_HEADER, value.clone());
    headers.insert(X_PAYMENT_HEADER, value);
    Ok(headers)
}

/// Raw `PAYMENT-REQUIRED` value of a 402 response.
#[must_use]
pub fn payment_required(headers: &HeaderMap) -> Option<&[u8]> {
    headers.get(PAYMENT_REQUIRED_HEADER).map(HeaderValue::as_bytes)
}

/// Raw settlement header of a paid response, preferring `PAYMENT-RESPONSE`.
#[must_use]
pub fn settlement(headers: &HeaderMap) -> Option<&[u8]> {
    headers
        .get(PAYMENT_RESPONSE_HEADER)
        .or_else(|| headers.get(X_PAYMENT_RESPONSE_HEADER))
        .map(HeaderValue::as_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use paywire::encoding::decode_json;
    use paywire::requirements::parse_requirements_value;
    use paywire::{PaymentCandidate, SigningContext};
    use serde_json::{Value, json};

    fn payment() -> SignedPayment {
        let requirement = parse_requirements_value(&json!({
            "accepts": [{
                "scheme": "exact",
                "network": "eip155:8453",
                "asset": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
                "payTo": "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
                "amount": "50000",
            }]
        }))
        .unwrap()
        .requirements
        .remove(0);
        let candidate = PaymentCandidate::with_decimals(0, requirement, 6).unwrap();
        let ctx = SigningContext {
            resource: Some(json!({"url": "https://1ly.store/api/link/joe/weather"})),
        };
        SignedPayment::new(&candidate, &ctx, json!({"signature": "0xabc"}))
    }

    #[test]
    fn test_both_payment_headers_carry_wire_document() {
        let headers = payment_headers(&payment()).unwrap();
        let primary = headers.get(PAYMENT_SIGNATURE_HEADER).unwrap();
        assert_eq!(primary, headers.get(X_PAYMENT_HEADER).unwrap());

        let wire: Value = decode_json(primary.as_bytes()).unwrap();
        assert_eq!(wire["x402Version"], 2);
        assert_eq!(wire["scheme"], "exact");
        assert_eq!(wire["network"], "eip155:8453");
        assert_eq!(wire["payload"]["signature"], "0xabc");
        assert_eq!(wire["accepted"]["amount"], "50000");
        assert_eq!(wire["resource"]["url"], "https://1ly.store/api/link/joe/weather");
    }

    #[test]
    fn test_settlement_prefers_current_header() {
        let mut headers = HeaderMap::new();
        assert!(settlement(&headers).is_none());
        headers.insert(X_PAYMENT_RESPONSE_HEADER, HeaderValue::from_static("legacy"));
        assert_eq!(settlement(&headers), Some(&b"legacy"[..]));
        headers.insert(PAYMENT_RESPONSE_HEADER, HeaderValue::from_static("current"));
        assert_eq!(settlement(&headers), Some(&b"current"[..]));
    }
}
