//! Fee computation and amount parsing.
//!
//! All currency math happens on [`Decimal`] in major units and is rounded to
//! two places exactly once, when a job is created.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use serde_json::Value;

use super::error::{EngineError, Result};
use crate::config::LedgerConfig;

const CURRENCY_DP: u32 = 2;

/// Rates applied when a job is posted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub platform_fee_rate: Decimal,
    pub sms_unit_cost: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for FeeSchedule {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            platform_fee_rate: config.platform_fee_rate,
            sms_unit_cost: config.sms_unit_cost,
        }
    }
}

/// Fees owed for one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeQuote {
    pub platform_fee: Decimal,
    pub sms_cost: Decimal,
}

impl FeeQuote {
    pub fn total(&self) -> Decimal {
        self.platform_fee + self.sms_cost
    }
}

impl FeeSchedule {
    pub fn platform_fee(&self, payment_amount: Decimal) -> Result<Decimal> {
        payment_amount
            .checked_mul(self.platform_fee_rate)
            .map(round_currency)
            .ok_or_else(|| EngineError::InvalidAmount(format!("{payment_amount} is out of range")))
    }

    pub fn sms_cost(&self, recipients: usize) -> Result<Decimal> {
        self.sms_unit_cost
            .checked_mul(Decimal::from(recipients))
            .map(round_currency)
            .ok_or_else(|| EngineError::InvalidAmount(format!("{recipients} recipients is out of range")))
    }

    pub fn quote(&self, payment_amount: Decimal, recipients: usize) -> Result<FeeQuote> {
        Ok(FeeQuote {
            platform_fee: self.platform_fee(payment_amount)?,
            sms_cost: self.sms_cost(recipients)?,
        })
    }
}

/// Round half away from zero to two decimal places
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Reject zero and negative payments
pub fn validate_payment(amount: Decimal) -> Result<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount(format!(
            "payment must be positive, got {amount}"
        )));
    }
    Ok(amount)
}

/// Parse a user-entered amount ("500", "999.995", "1e3")
pub fn parse_amount(input: &str) -> Result<Decimal> {
    let trimmed = input.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| EngineError::InvalidAmount(format!("'{trimmed}' is not a number")))
}

/// Accept a JSON number or numeric string
///
/// Numbers are parsed from their textual form so `999.995` stays exact instead
/// of passing through `f64`.
pub fn amount_from_json(value: &Value) -> Result<Decimal> {
    match value {
        Value::Number(number) => parse_amount(&number.to_string()),
        Value::String(text) => parse_amount(text),
        other => Err(EngineError::InvalidAmount(format!("expected a number, got {other}"))),
    }
}
