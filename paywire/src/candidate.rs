//! Requirements annotated with their resolved precision.

use crate::amount::format_base_units;
use crate::chain::{ChainId, NetworkFamily};
use crate::decimals::AssetDecimalsResolver;
use crate::error::PaymentError;
use crate::requirements::PaymentRequirement;
use crate::selector::Selectable;

/// A [`PaymentRequirement`] with its amount pinned down in base units.
///
/// `base_units` is always the exact value of `amount` at `decimals`
/// precision. Requirements whose price cannot be expressed exactly never
/// become candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentCandidate {
    /// Position in the server's advertised list.
    pub index: usize,
    /// The requirement being paid.
    pub requirement: PaymentRequirement,
    /// Resolved asset precision.
    pub decimals: u8,
    /// Exact amount in base units.
    pub base_units: u128,
    /// `base_units` written as a decimal, for display.
    pub amount: String,
}

impl PaymentCandidate {
    /// Resolves decimals for `requirement` and converts its amount.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::AssetResolution`] if decimals cannot be determined
    /// - [`PaymentError::MalformedRequirements`] if the amount would need rounding
    pub async fn resolve(
        index: usize,
        requirement: PaymentRequirement,
        resolver: &AssetDecimalsResolver,
    ) -> Result<Self, PaymentError> {
        let decimals = resolver
            .resolve(
                &requirement.network,
                &requirement.asset,
                requirement.extra.decimals,
            )
            .await?;
        Self::with_decimals(index, requirement, decimals)
    }

    /// Builds a candidate from already-known decimals.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::MalformedRequirements`] if the amount cannot be
    /// represented exactly at `decimals` precision.
    pub fn with_decimals(
        index: usize,
        requirement: PaymentRequirement,
        decimals: u8,
    ) -> Result<Self, PaymentError> {
        let base_units = requirement
            .amount
            .to_base_units(decimals)
            .map_err(|e| PaymentError::MalformedRequirements(e.to_string()))?;
        Ok(Self {
            index,
            requirement,
            decimals,
            base_units,
            amount: format_base_units(base_units, decimals),
        })
    }

    /// Signing family of the candidate's network.
    #[must_use]
    pub const fn family(&self) -> NetworkFamily {
        self.requirement.family
    }

    /// Short human label, e.g. `eip155:8453/0x8335…`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}/{}", self.requirement.network, self.requirement.asset)
    }
}

impl Selectable for PaymentCandidate {
    fn network(&self) -> &ChainId {
        &self.requirement.network
    }

    fn asset(&self) -> &str {
        &self.requirement.asset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimals::StaticDecimals;
    use crate::networks::tests::test_registry;
    use crate::requirements::parse_requirements_value;
    use crate::requirements::tests::base_usdc_entry;
    use serde_json::json;

    fn priced(price: &str) -> PaymentRequirement {
        let mut entry = base_usdc_entry("1");
        entry.as_object_mut().unwrap().remove("amount");
        entry["price"] = json!(price);
        parse_requirements_value(&json!({"accepts": [entry]}))
            .unwrap()
            .requirements
            .remove(0)
    }

    #[tokio::test]
    async fn test_five_cents_on_base_is_fifty_thousand_units() {
        let resolver = AssetDecimalsResolver::new().with_known_assets(&test_registry());
        let candidate = PaymentCandidate::resolve(0, priced("0.05"), &resolver)
            .await
            .unwrap();
        assert_eq!(candidate.decimals, 6);
        assert_eq!(candidate.base_units, 50_000);
        assert_eq!(candidate.amount, "0.05");
    }

    #[tokio::test]
    async fn test_base_units_get_decimal_form() {
        let requirement = parse_requirements_value(&json!({"accepts": [base_usdc_entry("1250000")]}))
            .unwrap()
            .requirements
            .remove(0);
        let resolver = AssetDecimalsResolver::new().with_known_assets(&test_registry());
        let candidate = PaymentCandidate::resolve(3, requirement, &resolver)
            .await
            .unwrap();
        assert_eq!(candidate.index, 3);
        assert_eq!(candidate.base_units, 1_250_000);
        assert_eq!(candidate.amount, "1.25");
    }

    #[test]
    fn test_huge_base_units_stay_payable() {
        let requirement = parse_requirements_value(&json!({
            "accepts": [base_usdc_entry(&u128::MAX.to_string())]
        }))
        .unwrap()
        .requirements
        .remove(0);
        let candidate = PaymentCandidate::with_decimals(0, requirement, 6).unwrap();
        assert_eq!(candidate.base_units, u128::MAX);
        assert_eq!(candidate.amount, "340282366920938463463374607431768.211455");
    }

    #[tokio::test]
    async fn test_unrepresentable_price_is_rejected() {
        let resolver = AssetDecimalsResolver::new().with_known_assets(&test_registry());
        let err = PaymentCandidate::resolve(0, priced("0.0000001"), &resolver)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::MalformedRequirements(_)));
    }

    #[tokio::test]
    async fn test_unknown_asset_fails_resolution() {
        let resolver =
            AssetDecimalsResolver::new().with_source(NetworkFamily::Evm, StaticDecimals::new());
        let err = PaymentCandidate::resolve(0, priced("0.05"), &resolver)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::AssetResolution { .. }));
    }
}
