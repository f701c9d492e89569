use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub ledger: LedgerConfig,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/rewards".to_string()),
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            ledger: LedgerConfig::from_env()?,
        })
    }
}

/// Financial policy knobs for the wallet ledger. Every engine takes this by
/// value at construction instead of reading ambient constants.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Fixed denominations a member may recharge with
    pub allowed_recharge_amounts: Vec<Decimal>,
    /// Accepted offline payment channels
    pub allowed_payment_methods: Vec<String>,
    /// Wait after recharge submission before it settles into the wallet
    pub maturation_delay: Duration,
    /// Wait after a completed recharge before a withdrawal against it is allowed
    pub withdraw_cooldown: Duration,
    pub min_withdrawal: Decimal,
    pub reward_credit: Decimal,
    pub signup_grant: Decimal,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            allowed_recharge_amounts: vec![
                dec!(50),
                dec!(100),
                dec!(200),
                dec!(500),
                dec!(1000),
            ],
            allowed_payment_methods: vec![
                "UPI".to_string(),
                "PhonePe".to_string(),
                "Paytm".to_string(),
                "GooglePay".to_string(),
            ],
            maturation_delay: Duration::minutes(2),
            withdraw_cooldown: Duration::hours(1),
            min_withdrawal: dec!(20),
            reward_credit: dec!(10),
            signup_grant: dec!(20),
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("RECHARGE_MATURATION_MINUTES") {
            config.maturation_delay = Duration::minutes(parse_env("RECHARGE_MATURATION_MINUTES", &raw)?);
        }
        if let Ok(raw) = std::env::var("WITHDRAW_COOLDOWN_MINUTES") {
            config.withdraw_cooldown = Duration::minutes(parse_env("WITHDRAW_COOLDOWN_MINUTES", &raw)?);
        }
        if let Ok(raw) = std::env::var("MIN_WITHDRAWAL_AMOUNT") {
            config.min_withdrawal = parse_env("MIN_WITHDRAWAL_AMOUNT", &raw)?;
        }
        if let Ok(raw) = std::env::var("REWARD_CREDIT_AMOUNT") {
            config.reward_credit = parse_env("REWARD_CREDIT_AMOUNT", &raw)?;
        }
        if let Ok(raw) = std::env::var("SIGNUP_GRANT_AMOUNT") {
            config.signup_grant = parse_env("SIGNUP_GRANT_AMOUNT", &raw)?;
        }

        Ok(config)
    }

    pub fn is_allowed_recharge_amount(&self, amount: Decimal) -> bool {
        self.allowed_recharge_amounts.contains(&amount)
    }

    pub fn is_allowed_payment_method(&self, method: &str) -> bool {
        self.allowed_payment_methods.iter().any(|m| m == method)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> AppResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Config(format!("invalid value for {}: {:?}", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recharge_amount_allow_list() {
        let config = LedgerConfig::default();
        assert!(config.is_allowed_recharge_amount(dec!(100)));
        assert!(config.is_allowed_recharge_amount(dec!(1000)));
        assert!(!config.is_allowed_recharge_amount(dec!(99)));
        assert!(!config.is_allowed_recharge_amount(dec!(100.50)));
    }

    #[test]
    fn payment_method_allow_list() {
        let config = LedgerConfig::default();
        assert!(config.is_allowed_payment_method("UPI"));
        assert!(!config.is_allowed_payment_method("upi"));
        assert!(!config.is_allowed_payment_method("Cash"));
    }

    #[test]
    fn default_policy_windows() {
        let config = LedgerConfig::default();
        assert_eq!(config.maturation_delay, Duration::minutes(2));
        assert_eq!(config.withdraw_cooldown, Duration::hours(1));
        assert_eq!(config.min_withdrawal, dec!(20));
        assert_eq!(config.reward_credit, dec!(10));
        assert_eq!(config.signup_grant, dec!(20));
    }
}
