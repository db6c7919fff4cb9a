use super::models::Config;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("platform_fee_rate must be in [0, 1), got {0}")]
    InvalidFeeRate(Decimal),

    #[error("sms_unit_cost must not be negative, got {0}")]
    NegativeSmsCost(Decimal),

    #[error("max_selected_candidates must be at least 1")]
    NoCandidatesAllowed,

    #[error("Duration must be positive: {field}")]
    ZeroDuration { field: &'static str },

    #[error("log_filter must not be empty")]
    EmptyLogFilter,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_ledger(config)?;
    validate_telemetry(config)?;
    Ok(())
}

fn validate_ledger(config: &Config) -> Result<(), ValidationError> {
    let ledger = &config.ledger;

    if ledger.platform_fee_rate < Decimal::ZERO || ledger.platform_fee_rate >= Decimal::ONE {
        return Err(ValidationError::InvalidFeeRate(ledger.platform_fee_rate));
    }

    if ledger.sms_unit_cost < Decimal::ZERO {
        return Err(ValidationError::NegativeSmsCost(ledger.sms_unit_cost));
    }

    if ledger.max_selected_candidates == 0 {
        return Err(ValidationError::NoCandidatesAllowed);
    }

    if ledger.job_ttl.is_zero() {
        return Err(ValidationError::ZeroDuration { field: "ledger.job_ttl" });
    }

    if ledger.write_timeout.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "ledger.write_timeout",
        });
    }

    Ok(())
}

fn validate_telemetry(config: &Config) -> Result<(), ValidationError> {
    if config.telemetry.log_filter.trim().is_empty() {
        return Err(ValidationError::EmptyLogFilter);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::HumanDuration;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_fee_rate_bounds() {
        let mut config = Config::default();
        config.ledger.platform_fee_rate = Decimal::ONE;
        assert!(matches!(validate(&config), Err(ValidationError::InvalidFeeRate(_))));

        config.ledger.platform_fee_rate = Decimal::new(-1, 2);
        assert!(matches!(validate(&config), Err(ValidationError::InvalidFeeRate(_))));

        config.ledger.platform_fee_rate = Decimal::ZERO;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_negative_sms_cost() {
        let mut config = Config::default();
        config.ledger.sms_unit_cost = Decimal::new(-5, 1);
        assert!(matches!(validate(&config), Err(ValidationError::NegativeSmsCost(_))));
    }

    #[test]
    fn test_zero_candidate_limit() {
        let mut config = Config::default();
        config.ledger.max_selected_candidates = 0;
        assert!(matches!(validate(&config), Err(ValidationError::NoCandidatesAllowed)));
    }

    #[test]
    fn test_zero_durations() {
        let mut config = Config::default();
        config.ledger.job_ttl = HumanDuration::from_secs(0);
        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroDuration { field: "ledger.job_ttl" })
        ));

        let mut config = Config::default();
        config.ledger.write_timeout = HumanDuration::from_secs(0);
        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroDuration { field: "ledger.write_timeout" })
        ));
    }

    #[test]
    fn test_empty_log_filter() {
        let mut config = Config::default();
        config.telemetry.log_filter = "  ".to_string();
        assert!(matches!(validate(&config), Err(ValidationError::EmptyLogFilter)));
    }
}
