//! Quoted prices

use covera_core::errors::FlowError;
use covera_core::types::{Amount, PolicyOptions, ProductKind, PurchaseIntent};

/// Quoted price of a policy product; stakes have none
pub fn quote(product: ProductKind) -> Option<Amount> {
    match product {
        ProductKind::Health => Some(Amount::from_cents(50)),
        ProductKind::Vehicle => Some(Amount::from_cents(75)),
        ProductKind::Parametric => Some(Amount::from_cents(120)),
        ProductKind::Stake => None,
    }
}

/// Intent for a policy purchase at its quoted price
pub fn policy_intent(
    product: ProductKind,
    options: PolicyOptions,
) -> Result<PurchaseIntent, FlowError> {
    let price = quote(product).ok_or(FlowError::PriceUnavailable { product })?;
    Ok(PurchaseIntent::new(product, price, options))
}

/// Intent for a stake of `amount`
pub fn stake_intent(amount: Amount) -> Result<PurchaseIntent, FlowError> {
    if amount.is_zero() {
        return Err(FlowError::InvalidRequest {
            reason: "stake amount must be positive".to_string(),
        });
    }
    Ok(PurchaseIntent::new(
        ProductKind::Stake,
        amount,
        PolicyOptions::default(),
    ))
}
