//! Products, payment methods and purchase intents

use super::amount::Amount;
use crate::errors::FlowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a purchase intent buys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductKind {
    /// Health cover
    Health,
    /// Vehicle cover
    Vehicle,
    /// Parametric cover paid out on oracle events
    Parametric,
    /// Liquidity provided to the reinsurance pool
    Stake,
}

impl ProductKind {
    /// Policy products that carry a quoted price
    pub const POLICIES: [ProductKind; 3] = [Self::Health, Self::Vehicle, Self::Parametric];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "HEALTH",
            Self::Vehicle => "VEHICLE",
            Self::Parametric => "PARAMETRIC",
            Self::Stake => "STAKE",
        }
    }

    /// True for everything except [`ProductKind::Stake`]
    pub fn is_policy(&self) -> bool {
        !matches!(self, Self::Stake)
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductKind {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HEALTH" => Ok(Self::Health),
            "VEHICLE" => Ok(Self::Vehicle),
            "PARAMETRIC" => Ok(Self::Parametric),
            "STAKE" => Ok(Self::Stake),
            other => Err(FlowError::InvalidRequest {
                reason: format!("unknown product '{other}'"),
            }),
        }
    }
}

/// How an intent is paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Not decided yet
    #[default]
    Auto,
    /// Signed and sent through an external wallet
    Wallet,
    /// Transferred by the user out of band, verified by backend poll
    Manual,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Wallet => "wallet",
            Self::Manual => "manual",
        })
    }
}

/// Options forwarded to settlement
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyOptions {
    /// Shielded payout requested
    pub is_private: bool,
    /// Parametric trigger; only meaningful for [`ProductKind::Parametric`]
    pub trigger: Option<String>,
}

impl PolicyOptions {
    /// Options with the privacy flag set
    pub fn private() -> Self {
        Self {
            is_private: true,
            trigger: None,
        }
    }

    /// Attach a parametric trigger
    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }
}

/// A user's declared purchase or stake, prior to signing
///
/// The method starts as [`PaymentMethod::Auto`] unless preset and can be
/// resolved exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseIntent {
    product: ProductKind,
    price: Amount,
    method: PaymentMethod,
    options: PolicyOptions,
}

impl PurchaseIntent {
    /// Create an intent with an unresolved method
    pub fn new(product: ProductKind, price: Amount, options: PolicyOptions) -> Self {
        Self {
            product,
            price,
            method: PaymentMethod::Auto,
            options,
        }
    }

    /// Preset the payment method
    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }

    /// Product being bought
    pub fn product(&self) -> ProductKind {
        self.product
    }

    /// Price (or staked amount)
    pub fn price(&self) -> Amount {
        self.price
    }

    /// Current payment method
    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    /// Settlement options
    pub fn options(&self) -> &PolicyOptions {
        &self.options
    }

    /// Resolve an `Auto` method to a concrete one
    pub fn resolve_method(&mut self, method: PaymentMethod) -> Result<(), FlowError> {
        if self.method != PaymentMethod::Auto || method == PaymentMethod::Auto {
            return Err(FlowError::MethodAlreadyResolved);
        }
        self.method = method;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_names_round_trip() {
        for product in [
            ProductKind::Health,
            ProductKind::Vehicle,
            ProductKind::Parametric,
            ProductKind::Stake,
        ] {
            assert_eq!(product.as_str().parse::<ProductKind>().unwrap(), product);
        }
        assert_eq!("health".parse::<ProductKind>().unwrap(), ProductKind::Health);
        assert!("LIFE".parse::<ProductKind>().is_err());
    }

    #[test]
    fn method_resolves_once() {
        let mut intent = PurchaseIntent::new(
            ProductKind::Health,
            Amount::from_cents(50),
            PolicyOptions::default(),
        );
        assert_eq!(intent.method(), PaymentMethod::Auto);
        intent.resolve_method(PaymentMethod::Manual).unwrap();
        assert_eq!(intent.method(), PaymentMethod::Manual);
        assert_eq!(
            intent.resolve_method(PaymentMethod::Wallet),
            Err(FlowError::MethodAlreadyResolved)
        );
    }

    #[test]
    fn wire_name_is_screaming_case() {
        let json = serde_json::to_string(&ProductKind::Parametric).unwrap();
        assert_eq!(json, "\"PARAMETRIC\"");
    }
}
