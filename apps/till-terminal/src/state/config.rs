//! # Configuration State
//!
//! Terminal configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`TILL_*`)
//! 2. Defaults (this file)
//!
//! Read-only after startup, so it is passed around by reference.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use till_core::{Money, TaxRate, DEFAULT_INVOICE_PREFIX};

/// Narrowest receipt a thermal printer is likely to have.
const MIN_RECEIPT_WIDTH: usize = 24;
const MAX_RECEIPT_WIDTH: usize = 80;

/// Errors in `TILL_*` variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

/// Terminal configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalConfig {
    /// Store name (printed on receipts)
    pub store_name: String,

    /// Identifies this till on every sale it records
    pub device_id: String,

    /// Invoice number prefix (`INV` → `INV-20261019-0001`)
    pub invoice_prefix: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Tax rate applied to every new cart, if any
    pub default_tax_rate: Option<TaxRate>,

    /// Receipt width in characters (typically 32, 42, or 48)
    pub receipt_width: usize,

    /// Explicit database file; None means the platform data directory
    pub db_path: Option<PathBuf>,
}

impl Default for TerminalConfig {
    /// Returns default configuration suitable for development.
    fn default() -> Self {
        TerminalConfig {
            store_name: "Till POS Dev Store".to_string(),
            device_id: "till-01".to_string(),
            invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
            currency_symbol: "$".to_string(),
            default_tax_rate: None,
            receipt_width: 42,
            db_path: None,
        }
    }
}

impl TerminalConfig {
    /// Builds the configuration from the process environment.
    ///
    /// ## Environment Variables
    /// - `TILL_DB_PATH`: database file
    /// - `TILL_STORE_NAME`: receipt header
    /// - `TILL_DEVICE_ID`: till identifier stored on sales
    /// - `TILL_INVOICE_PREFIX`: invoice number prefix
    /// - `TILL_CURRENCY_SYMBOL`: display symbol
    /// - `TILL_TAX_RATE`: default order tax in percent (e.g., "8.25")
    /// - `TILL_RECEIPT_WIDTH`: receipt columns
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = TerminalConfig::default();

        if let Some(path) = lookup("TILL_DB_PATH") {
            config.db_path = Some(PathBuf::from(non_empty("TILL_DB_PATH", path)?));
        }

        if let Some(name) = lookup("TILL_STORE_NAME") {
            config.store_name = non_empty("TILL_STORE_NAME", name)?;
        }

        if let Some(device_id) = lookup("TILL_DEVICE_ID") {
            config.device_id = non_empty("TILL_DEVICE_ID", device_id)?;
        }

        if let Some(prefix) = lookup("TILL_INVOICE_PREFIX") {
            let prefix = non_empty("TILL_INVOICE_PREFIX", prefix)?;
            if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ConfigError::Invalid {
                    var: "TILL_INVOICE_PREFIX",
                    reason: "only letters and digits are allowed".to_string(),
                });
            }
            config.invoice_prefix = prefix.to_uppercase();
        }

        if let Some(symbol) = lookup("TILL_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        if let Some(rate) = lookup("TILL_TAX_RATE") {
            let rate = TaxRate::parse_percentage(&rate).map_err(|e| ConfigError::Invalid {
                var: "TILL_TAX_RATE",
                reason: e.to_string(),
            })?;
            config.default_tax_rate = (!rate.is_zero()).then_some(rate);
        }

        if let Some(width) = lookup("TILL_RECEIPT_WIDTH") {
            let width: usize = width.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "TILL_RECEIPT_WIDTH",
                reason: format!("'{}' is not a number", width),
            })?;
            if !(MIN_RECEIPT_WIDTH..=MAX_RECEIPT_WIDTH).contains(&width) {
                return Err(ConfigError::Invalid {
                    var: "TILL_RECEIPT_WIDTH",
                    reason: format!(
                        "must be between {} and {}",
                        MIN_RECEIPT_WIDTH, MAX_RECEIPT_WIDTH
                    ),
                });
            }
            config.receipt_width = width;
        }

        Ok(config)
    }

    /// Formats an amount with the configured currency symbol.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::Money;
    /// use till_terminal::state::TerminalConfig;
    ///
    /// let config = TerminalConfig::default();
    /// assert_eq!(config.format_currency(Money::from_cents(1234)), "$12.34");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        amount.format_with(&self.currency_symbol)
    }
}

fn non_empty(var: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty { var });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = TerminalConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.invoice_prefix, "INV");
        assert_eq!(config.receipt_width, 42);
        assert!(config.default_tax_rate.is_none());
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = TerminalConfig::from_lookup(lookup(&[
            ("TILL_STORE_NAME", "Corner Shop"),
            ("TILL_DEVICE_ID", "till-07"),
            ("TILL_INVOICE_PREFIX", "cs1"),
            ("TILL_CURRENCY_SYMBOL", "Rs "),
            ("TILL_TAX_RATE", "8.25"),
            ("TILL_RECEIPT_WIDTH", "32"),
            ("TILL_DB_PATH", "/tmp/till.db"),
        ]))
        .unwrap();

        assert_eq!(config.store_name, "Corner Shop");
        assert_eq!(config.device_id, "till-07");
        assert_eq!(config.invoice_prefix, "CS1");
        assert_eq!(config.default_tax_rate, Some(TaxRate::from_bps(825)));
        assert_eq!(config.receipt_width, 32);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/till.db")));
        assert_eq!(config.format_currency(Money::from_cents(-550)), "-Rs 5.50");
    }

    #[test]
    fn test_zero_tax_rate_means_none() {
        let config = TerminalConfig::from_lookup(lookup(&[("TILL_TAX_RATE", "0")])).unwrap();
        assert!(config.default_tax_rate.is_none());
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(TerminalConfig::from_lookup(lookup(&[("TILL_TAX_RATE", "abc")])).is_err());
        assert!(TerminalConfig::from_lookup(lookup(&[("TILL_TAX_RATE", "150")])).is_err());
        assert!(TerminalConfig::from_lookup(lookup(&[("TILL_RECEIPT_WIDTH", "10")])).is_err());
        assert!(TerminalConfig::from_lookup(lookup(&[("TILL_INVOICE_PREFIX", "IN-V")])).is_err());
        assert!(matches!(
            TerminalConfig::from_lookup(lookup(&[("TILL_DEVICE_ID", "  ")])),
            Err(ConfigError::Empty { .. })
        ));
    }

    #[test]
    fn test_format_currency() {
        let config = TerminalConfig::default();
        assert_eq!(config.format_currency(Money::from_cents(1234)), "$12.34");
        assert_eq!(config.format_currency(Money::zero()), "$0.00");
        assert_eq!(config.format_currency(Money::from_cents(-1234)), "-$12.34");
    }
}
