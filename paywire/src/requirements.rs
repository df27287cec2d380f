//! Parsing of server-advertised payment requirements.
//!
//! A 402 response advertises a list of acceptable payment methods, either in
//! the base64 `PAYMENT-REQUIRED` header or in the JSON body. Each entry is
//! turned into an [`AcceptedMethod`]: the `exact` scheme on a supported chain
//! becomes a fully validated [`PaymentRequirement`], anything else becomes
//! [`AcceptedMethod::Unsupported`] and is dropped from the result.

use alloy_primitives::Address as EvmAddress;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::amount::{AmountError, DecimalAmount, parse_base_units};
use crate::chain::{ChainId, NetworkFamily};
use crate::encoding::decode_json;
use crate::error::PaymentError;
use crate::timestamp::UnixTimestamp;

/// The only scheme this client can pay.
pub const EXACT_SCHEME: &str = "exact";

/// Protocol version emitted in payment payloads.
pub const X402_VERSION: u8 = 2;

/// The amount a requirement asks for, as the server expressed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredAmount {
    /// Integer base units (`amount` / `maxAmountRequired`).
    BaseUnits(u128),
    /// Human-readable decimal price (`price`), converted once decimals are known.
    Decimal(DecimalAmount),
}

impl RequiredAmount {
    /// Converts to integer base units given the asset's decimals.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if a decimal price cannot be represented exactly.
    pub fn to_base_units(&self, decimals: u8) -> Result<u128, AmountError> {
        match self {
            Self::BaseUnits(units) => Ok(*units),
            Self::Decimal(amount) => amount.to_base_units(decimals),
        }
    }
}

/// Scheme-specific extras carried in the requirement's `extra` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementExtra {
    /// EIP-712 domain name override for the asset contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// EIP-712 domain version override for the asset contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Solana account that pays transaction fees and co-signs the transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_payer: Option<String>,
    /// Precision hint advertised by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
}

/// A validated `exact` payment requirement. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequirement {
    /// CAIP-2 network.
    pub network: ChainId,
    /// Signing family of `network`.
    pub family: NetworkFamily,
    /// Token contract (EVM) or mint (Solana).
    pub asset: String,
    /// Recipient address.
    pub pay_to: String,
    /// Amount due.
    pub amount: RequiredAmount,
    /// Resource the payment unlocks.
    pub resource: Option<String>,
    /// Upper bound on how long an authorization may stay valid.
    pub max_timeout_seconds: Option<u64>,
    /// Earliest time the authorization may be used.
    pub valid_after: Option<UnixTimestamp>,
    /// Latest time the authorization may be used.
    pub valid_before: Option<UnixTimestamp>,
    /// Scheme-specific extras.
    pub extra: RequirementExtra,
    /// The advertised entry verbatim, echoed back as `accepted`.
    pub raw: Value,
}

/// One entry of the server's `accepts` list.
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptedMethod {
    /// The `exact` scheme on a chain family we can sign for.
    Exact(PaymentRequirement),
    /// Anything else. Kept only so callers can report what was skipped.
    Unsupported {
        /// Advertised scheme.
        scheme: String,
        /// Advertised network.
        network: String,
    },
}

/// A malformed entry that was filtered out.
#[derive(Debug)]
pub struct RejectedMethod {
    /// Position in the advertised list.
    pub index: usize,
    /// Why it was rejected.
    pub error: PaymentError,
}

/// Result of parsing a 402 response.
#[derive(Debug)]
pub struct PaymentRequired {
    /// Advertised protocol version.
    pub x402_version: u8,
    /// Resource descriptor, echoed into the payment payload.
    pub resource: Option<Value>,
    /// Server-provided error message.
    pub error: Option<String>,
    /// Usable requirements in advertised order.
    pub requirements: Vec<PaymentRequirement>,
    /// Entries dropped because their scheme or network is unsupported.
    pub unsupported: Vec<(String, String)>,
    /// Entries dropped because they were malformed.
    pub rejected: Vec<RejectedMethod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    x402_version: Option<u8>,
    #[serde(default)]
    resource: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    accepts: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMethod {
    asset: Option<String>,
    pay_to: Option<String>,
    amount: Option<Value>,
    max_amount_required: Option<Value>,
    price: Option<Value>,
    resource: Option<String>,
    max_timeout_seconds: Option<u64>,
    valid_after: Option<UnixTimestamp>,
    valid_before: Option<UnixTimestamp>,
    #[serde(default)]
    extra: Option<RequirementExtra>,
}

/// Parses the requirements of a 402 response.
///
/// The `PAYMENT-REQUIRED` header is preferred; if it is absent or cannot be
/// decoded the JSON body is used instead.
///
/// # Errors
///
/// - [`PaymentError::MalformedRequirements`] if neither source holds a
///   requirements object, or every advertised entry is malformed
/// - [`PaymentError::NoAcceptableMethod`] if nothing advertised is supported
pub fn parse_payment_required(
    header: Option<&[u8]>,
    body: Option<&Value>,
) -> Result<PaymentRequired, PaymentError> {
    let from_header = header.map(decode_json::<Value>);
    match (from_header, body) {
        (Some(Ok(value)), _) => parse_requirements_value(&value),
        (Some(Err(_)), Some(body)) | (None, Some(body)) => parse_requirements_value(body),
        (Some(Err(e)), None) => Err(PaymentError::MalformedRequirements(format!(
            "undecodable PAYMENT-REQUIRED header: {e}"
        ))),
        (None, None) => Err(PaymentError::MalformedRequirements(
            "402 response carries no payment requirements".into(),
        )),
    }
}

/// Parses a requirements object (`{x402Version, resource, accepts}`).
///
/// # Errors
///
/// See [`parse_payment_required`].
pub fn parse_requirements_value(value: &Value) -> Result<PaymentRequired, PaymentError> {
    let envelope: Envelope = serde_json::from_value(value.clone())
        .map_err(|e| PaymentError::MalformedRequirements(e.to_string()))?;
    let accepts = envelope.accepts.ok_or_else(|| {
        PaymentError::MalformedRequirements("missing `accepts` list".into())
    })?;
    if accepts.is_empty() {
        return Err(PaymentError::NoAcceptableMethod(
            "server advertised an empty `accepts` list".into(),
        ));
    }

    let default_resource = envelope.resource.as_ref().and_then(resource_url);
    let mut requirements = Vec::with_capacity(accepts.len());
    let mut unsupported = Vec::new();
    let mut rejected = Vec::new();

    for (index, entry) in accepts.iter().enumerate() {
        match parse_method(entry, default_resource.as_deref()) {
            Ok(AcceptedMethod::Exact(requirement)) => requirements.push(requirement),
            Ok(AcceptedMethod::Unsupported { scheme, network }) => {
                #[cfg(feature = "telemetry")]
                tracing::debug!(index, %scheme, %network, "Dropping unsupported payment method");
                unsupported.push((scheme, network));
            }
            Err(error) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(index, %error, "Rejecting malformed payment method");
                rejected.push(RejectedMethod { index, error });
            }
        }
    }

    if requirements.is_empty() {
        if let Some(first) = rejected.into_iter().next() {
            return Err(first.error);
        }
        let offered = unsupported
            .iter()
            .map(|(scheme, network)| format!("{scheme}@{network}"))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(PaymentError::NoAcceptableMethod(format!(
            "no supported scheme among [{offered}]"
        )));
    }

    Ok(PaymentRequired {
        x402_version: envelope.x402_version.unwrap_or(1),
        resource: envelope.resource,
        error: envelope.error,
        requirements,
        unsupported,
        rejected,
    })
}

/// Parses a single `accepts` entry into its tagged variant.
///
/// # Errors
///
/// Returns [`PaymentError::MalformedRequirements`] when a required field is
/// missing or not well-formed for its network.
pub fn parse_method(
    entry: &Value,
    default_resource: Option<&str>,
) -> Result<AcceptedMethod, PaymentError> {
    if !entry.is_object() {
        return Err(PaymentError::MalformedRequirements(format!(
            "payment method must be an object, got {entry}"
        )));
    }
    let scheme = required(text_field(entry, "scheme"), "scheme")?;
    let network_str = required(text_field(entry, "network"), "network")?;

    // Scheme and network decide support before the rest of the entry is
    // looked at, so unfamiliar methods are dropped whatever else they carry.
    let supported = ChainId::from_str(&network_str)
        .ok()
        .and_then(|network| network.family().map(|family| (network, family)))
        .filter(|_| scheme == EXACT_SCHEME);
    let Some((network, family)) = supported else {
        return Ok(AcceptedMethod::Unsupported {
            scheme,
            network: network_str,
        });
    };

    let raw: RawMethod = serde_json::from_value(entry.clone())
        .map_err(|e| PaymentError::MalformedRequirements(e.to_string()))?;

    let asset = required(raw.asset, "asset")?;
    validate_address(family, &asset, "asset")?;
    let pay_to = required(raw.pay_to, "payTo")?;
    validate_address(family, &pay_to, "payTo")?;

    let amount = match (raw.amount.or(raw.max_amount_required), raw.price) {
        (Some(units), _) => RequiredAmount::BaseUnits(
            parse_base_units(&value_to_string(&units)?).map_err(malformed_amount)?,
        ),
        (None, Some(price)) => RequiredAmount::Decimal(
            DecimalAmount::parse(&value_to_string(&price)?).map_err(malformed_amount)?,
        ),
        (None, None) => {
            return Err(PaymentError::MalformedRequirements(
                "missing field `amount`".into(),
            ));
        }
    };

    let extra = raw.extra.unwrap_or_default();
    if family == NetworkFamily::Solana {
        if let Some(fee_payer) = &extra.fee_payer {
            validate_address(family, fee_payer, "extra.feePayer")?;
        }
    }

    Ok(AcceptedMethod::Exact(PaymentRequirement {
        network,
        family,
        asset,
        pay_to,
        amount,
        resource: raw.resource.or_else(|| default_resource.map(str::to_owned)),
        max_timeout_seconds: raw.max_timeout_seconds,
        valid_after: raw.valid_after,
        valid_before: raw.valid_before,
        extra,
        raw: entry.clone(),
    }))
}

fn text_field(entry: &Value, name: &str) -> Option<String> {
    entry.get(name).and_then(Value::as_str).map(str::to_owned)
}

fn required(field: Option<String>, name: &str) -> Result<String, PaymentError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
        _ => Err(PaymentError::MalformedRequirements(format!(
            "missing field `{name}`"
        ))),
    }
}

fn value_to_string(value: &Value) -> Result<String, PaymentError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(PaymentError::MalformedRequirements(format!(
            "amount must be a string or number, got {other}"
        ))),
    }
}

fn malformed_amount(e: AmountError) -> PaymentError {
    PaymentError::MalformedRequirements(e.to_string())
}

/// Checks that `address` is well-formed for `family`.
///
/// # Errors
///
/// Returns [`PaymentError::MalformedRequirements`] naming `field` otherwise.
pub fn validate_address(
    family: NetworkFamily,
    address: &str,
    field: &str,
) -> Result<(), PaymentError> {
    let ok = match family {
        NetworkFamily::Evm => {
            address.starts_with("0x") && EvmAddress::from_str(address).is_ok()
        }
        NetworkFamily::Solana => bs58::decode(address)
            .into_vec()
            .is_ok_and(|bytes| bytes.len() == 32),
    };
    if ok {
        Ok(())
    } else {
        Err(PaymentError::MalformedRequirements(format!(
            "`{field}` is not a valid {family} address: {address}"
        )))
    }
}

fn resource_url(resource: &Value) -> Option<String> {
    match resource {
        Value::String(url) => Some(url.clone()),
        Value::Object(map) => map.get("url").and_then(Value::as_str).map(str::to_owned),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::encoding::encode_json;
    use serde_json::json;

    pub(crate) const PAY_TO_EVM: &str = "0x209693Bc6afc0C5328bA36FaF03C514EF312287C";
    pub(crate) const PAY_TO_SOLANA: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";
    pub(crate) const FEE_PAYER: &str = "2wKupLR9q6wXYppw8Gr2NvWxKBUqm4PPJKkQfoxHDBg4";

    pub(crate) fn base_usdc_entry(amount: &str) -> Value {
        json!({
            "scheme": "exact",
            "network": "eip155:8453",
            "asset": crate::networks::tests::BASE_USDC,
            "payTo": PAY_TO_EVM,
            "amount": amount,
            "maxTimeoutSeconds": 300,
            "extra": {"name": "USD Coin", "version": "2"}
        })
    }

    pub(crate) fn solana_usdc_entry(amount: &str) -> Value {
        json!({
            "scheme": "exact",
            "network": format!("solana:{}", crate::networks::tests::SOLANA_MAINNET),
            "asset": crate::networks::tests::SOLANA_USDC,
            "payTo": PAY_TO_SOLANA,
            "amount": amount,
            "extra": {"feePayer": FEE_PAYER}
        })
    }

    #[test]
    fn test_parses_body_in_order() {
        let body = json!({
            "x402Version": 2,
            "resource": {"url": "https://1ly.store/api/link/a/b"},
            "accepts": [solana_usdc_entry("50000"), base_usdc_entry("50000")]
        });
        let parsed = parse_payment_required(None, Some(&body)).unwrap();
        assert_eq!(parsed.x402_version, 2);
        assert_eq!(parsed.requirements.len(), 2);
        assert_eq!(parsed.requirements[0].family, NetworkFamily::Solana);
        assert_eq!(parsed.requirements[1].family, NetworkFamily::Evm);
        assert_eq!(
            parsed.requirements[1].resource.as_deref(),
            Some("https://1ly.store/api/link/a/b")
        );
        assert_eq!(
            parsed.requirements[0].extra.fee_payer.as_deref(),
            Some(FEE_PAYER)
        );
    }

    #[test]
    fn test_header_takes_precedence() {
        let header_value = json!({"x402Version": 2, "accepts": [base_usdc_entry("1")]});
        let header = encode_json(&header_value).unwrap();
        let body = json!({"accepts": [solana_usdc_entry("2")]});
        let parsed = parse_payment_required(Some(header.as_bytes()), Some(&body)).unwrap();
        assert_eq!(parsed.requirements.len(), 1);
        assert_eq!(parsed.requirements[0].amount, RequiredAmount::BaseUnits(1));
    }

    #[test]
    fn test_bad_header_falls_back_to_body() {
        let body = json!({"accepts": [base_usdc_entry("7")]});
        let parsed = parse_payment_required(Some(b"%%%not-base64"), Some(&body)).unwrap();
        assert_eq!(parsed.requirements[0].amount, RequiredAmount::BaseUnits(7));
    }

    #[test]
    fn test_unknown_scheme_is_dropped() {
        let mut upto = base_usdc_entry("1");
        upto["scheme"] = json!("upto");
        let body = json!({"accepts": [upto, base_usdc_entry("2")]});
        let parsed = parse_payment_required(None, Some(&body)).unwrap();
        assert_eq!(parsed.requirements.len(), 1);
        assert_eq!(parsed.unsupported, vec![("upto".into(), "eip155:8453".into())]);
    }

    #[test]
    fn test_unfamiliar_methods_are_dropped_whatever_their_shape() {
        let upto = json!({
            "scheme": "upto",
            "network": "eip155:8453",
            "maxTimeoutSeconds": "60",
            "extra": {"decimals": "six", "feePayer": 7}
        });
        let err = parse_requirements_value(&json!({"accepts": [upto]})).unwrap_err();
        assert!(matches!(err, PaymentError::NoAcceptableMethod(_)), "{err:?}");

        let mut legacy = base_usdc_entry("1");
        legacy["network"] = json!("base");
        let mut polygon = base_usdc_entry("1");
        polygon["network"] = json!("polygon");
        let parsed =
            parse_requirements_value(&json!({"accepts": [legacy, polygon, base_usdc_entry("3")]}))
                .unwrap();
        assert_eq!(parsed.requirements.len(), 1);
        assert!(parsed.rejected.is_empty());
        assert_eq!(
            parsed.unsupported,
            vec![
                ("exact".into(), "base".into()),
                ("exact".into(), "polygon".into())
            ]
        );
    }

    #[test]
    fn test_exact_entry_with_wrong_types_is_still_malformed() {
        let mut entry = base_usdc_entry("1");
        entry["maxTimeoutSeconds"] = json!("sixty");
        let err = parse_requirements_value(&json!({"accepts": [entry]})).unwrap_err();
        assert!(matches!(err, PaymentError::MalformedRequirements(_)));
    }

    #[test]
    fn test_only_unknown_schemes_is_no_acceptable_method() {
        let mut upto = base_usdc_entry("1");
        upto["scheme"] = json!("upto");
        let mut cosmos = base_usdc_entry("1");
        cosmos["network"] = json!("cosmos:cosmoshub-4");
        let body = json!({"accepts": [upto, cosmos]});
        let err = parse_payment_required(None, Some(&body)).unwrap_err();
        assert!(matches!(err, PaymentError::NoAcceptableMethod(_)));
    }

    #[test]
    fn test_empty_accepts_is_no_acceptable_method() {
        let err = parse_requirements_value(&json!({"accepts": []})).unwrap_err();
        assert!(matches!(err, PaymentError::NoAcceptableMethod(_)));
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        for field in ["network", "asset", "payTo", "amount", "scheme"] {
            let mut entry = base_usdc_entry("1");
            entry.as_object_mut().unwrap().remove(field);
            let err = parse_requirements_value(&json!({"accepts": [entry]})).unwrap_err();
            assert!(
                matches!(err, PaymentError::MalformedRequirements(_)),
                "missing {field} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_bad_address_is_malformed() {
        let mut evm = base_usdc_entry("1");
        evm["payTo"] = json!("0x1234");
        let mut sol = solana_usdc_entry("1");
        sol["payTo"] = json!("0OIl-not-base58");
        for entry in [evm, sol] {
            let err = parse_requirements_value(&json!({"accepts": [entry]})).unwrap_err();
            assert!(matches!(err, PaymentError::MalformedRequirements(_)));
        }
    }

    #[test]
    fn test_bad_amount_is_malformed() {
        for amount in ["-1", "1.5", "abc", ""] {
            let err =
                parse_requirements_value(&json!({"accepts": [base_usdc_entry(amount)]})).unwrap_err();
            assert!(matches!(err, PaymentError::MalformedRequirements(_)), "{amount}");
        }
    }

    #[test]
    fn test_malformed_entry_filtered_with_signal() {
        let mut broken = solana_usdc_entry("1");
        broken["asset"] = json!("not-a-mint");
        let body = json!({"accepts": [broken, base_usdc_entry("1")]});
        let parsed = parse_payment_required(None, Some(&body)).unwrap();
        assert_eq!(parsed.requirements.len(), 1);
        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.rejected[0].index, 0);
    }

    #[test]
    fn test_price_and_legacy_amount_fields() {
        let mut priced = base_usdc_entry("1");
        priced.as_object_mut().unwrap().remove("amount");
        priced["price"] = json!("0.05");
        let mut legacy = base_usdc_entry("1");
        legacy.as_object_mut().unwrap().remove("amount");
        legacy["maxAmountRequired"] = json!(50000);
        let body = json!({"accepts": [priced, legacy]});
        let parsed = parse_payment_required(None, Some(&body)).unwrap();
        assert_eq!(
            parsed.requirements[0].amount.to_base_units(6).unwrap(),
            50_000
        );
        assert_eq!(parsed.requirements[1].amount, RequiredAmount::BaseUnits(50_000));
    }

    #[test]
    fn test_no_requirements_anywhere() {
        let err = parse_payment_required(None, None).unwrap_err();
        assert!(matches!(err, PaymentError::MalformedRequirements(_)));
        let err = parse_payment_required(None, Some(&json!({"message": "pay"}))).unwrap_err();
        assert!(matches!(err, PaymentError::MalformedRequirements(_)));
    }
}
