//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Change due on 198.00 paid with 200.00 must be exactly 2.00.           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    20000 cents - 19800 cents = 200 cents                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(1099); // $10.99
//!
//! // Or parse what the cashier typed
//! let tendered: Money = "20".parse().unwrap();
//! assert_eq!(tendered.cents(), 2000);
//!
//! // Arithmetic operations
//! let doubled: Money = price * 2;             // $21.98
//! let total = price + Money::from_cents(500); // $15.99
//! assert_eq!(doubled.cents(), 2198);
//! assert_eq!(total.cents(), 1599);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction can go below zero before it is clamped
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price_cents ──► CartLine.unit_price ──► CartLine.line_total   │
/// │                                                                         │
/// │  Σ line totals ──► subtotal ──► − order discount + order tax           │
/// │                                      │                                  │
/// │                                      ▼                                  │
/// │                                 grand total ──► Settlement.change_due  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let price = Money::from_major_minor(10, 99); // $10.99
    /// assert_eq!(price.cents(), 1099);
    ///
    /// let negative = Money::from_major_minor(-5, 50); // -$5.50
    /// assert_eq!(negative.cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Parses a decimal amount typed by a cashier (`"198"`, `"12.5"`, `"0.99"`).
    ///
    /// At most two fractional digits are accepted; anything finer than a
    /// cent is rejected rather than rounded.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// assert_eq!(Money::parse("12.5").unwrap().cents(), 1250);
    /// assert_eq!(Money::parse("-0.75").unwrap().cents(), -75);
    /// assert!(Money::parse("1.005").is_err());
    /// assert!(Money::parse("abc").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Money, ValidationError> {
        let input = input.trim();
        let (negative, digits) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input),
        };

        let (major_str, minor_str) = match digits.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (digits, ""),
        };

        if major_str.is_empty() && minor_str.is_empty() {
            return Err(ValidationError::invalid_format("amount", "must be a number"));
        }
        if minor_str.len() > 2 {
            return Err(ValidationError::invalid_format(
                "amount",
                "at most two decimal places",
            ));
        }
        if !major_str.chars().all(|c| c.is_ascii_digit())
            || !minor_str.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ValidationError::invalid_format("amount", "must be a number"));
        }

        let major: i64 = if major_str.is_empty() {
            0
        } else {
            major_str
                .parse()
                .map_err(|_| ValidationError::invalid_format("amount", "too large"))?
        };
        // "5" → 50 cents, "05" → 5 cents
        let minor: i64 = match minor_str.len() {
            0 => 0,
            1 => minor_str.parse::<i64>().unwrap_or(0) * 10,
            _ => minor_str.parse::<i64>().unwrap_or(0),
        };

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| ValidationError::invalid_format("amount", "too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).dollars(), 10);
    /// assert_eq!(Money::from_cents(-550).dollars(), -5);
    /// ```
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns the value, or zero if it is negative.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-20).floor_zero(), Money::zero());
    /// assert_eq!(Money::from_cents(20).floor_zero().cents(), 20);
    /// ```
    #[inline]
    pub const fn floor_zero(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Calculates tax on this amount, rounding half up to the cent.
    ///
    /// ## Implementation
    /// Integer math: `(amount * rate + 5000) / 10000`
    /// The +5000 provides rounding (5000/10000 = 0.5)
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    /// use till_core::types::TaxRate;
    ///
    /// let price = Money::from_cents(1000); // $10.00
    /// let rate = TaxRate::from_bps(825);   // 8.25%
    ///
    /// // $10.00 × 8.25% = $0.825 → rounds to $0.83
    /// assert_eq!(price.calculate_tax(rate).cents(), 83);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 prevents overflow on large amounts
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299); // $2.99
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Formats with an explicit currency symbol and two decimals.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-550).format_with("Rs "), "-Rs 5.50");
    /// ```
    pub fn format_with(&self, symbol: &str) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!(
            "{}{}{}.{:02}",
            sign,
            symbol,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money with a `$` and two decimals.
///
/// ## Note
/// The terminal uses [`Money::format_with`] and its configured symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with("$"))
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(-50)), "-$0.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_parse() {
        assert_eq!(Money::parse("198").unwrap().cents(), 19_800);
        assert_eq!(Money::parse("198.5").unwrap().cents(), 19_850);
        assert_eq!(Money::parse("198.05").unwrap().cents(), 19_805);
        assert_eq!(Money::parse(" .99 ").unwrap().cents(), 99);
        assert_eq!(Money::parse("7.").unwrap().cents(), 700);
        assert_eq!(Money::parse("-0.50").unwrap().cents(), -50);

        assert!(Money::parse("").is_err());
        assert!(Money::parse(".").is_err());
        assert!(Money::parse("1.234").is_err());
        assert!(Money::parse("1,50").is_err());
        assert!(Money::parse("+5").is_err());
        assert!(Money::parse("99999999999999999999").is_err());
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        let result: Money = a * 3;
        assert_eq!(result.cents(), 3000);
    }

    #[test]
    fn test_sum() {
        let amounts = vec![
            Money::from_cents(18_000),
            Money::from_cents(250),
            Money::from_cents(-50),
        ];
        let total: Money = amounts.iter().sum();
        assert_eq!(total.cents(), 18_200);

        let empty: Vec<Money> = Vec::new();
        assert_eq!(empty.into_iter().sum::<Money>(), Money::zero());
    }

    #[test]
    fn test_tax_calculation_with_rounding() {
        let amount = Money::from_cents(1000);
        assert_eq!(amount.calculate_tax(TaxRate::from_bps(1000)).cents(), 100);
        assert_eq!(amount.calculate_tax(TaxRate::from_bps(825)).cents(), 83);
        assert_eq!(amount.calculate_tax(TaxRate::zero()).cents(), 0);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs().cents(), 100);
        assert_eq!(negative.floor_zero(), Money::zero());
    }

    /// Change due is exact to the cent: no binary fractions involved.
    #[test]
    fn test_change_is_exact() {
        let total = Money::parse("0.30").unwrap();
        let tendered = Money::parse("0.10").unwrap() + Money::parse("0.20").unwrap();
        assert_eq!(tendered - total, Money::zero());
    }
}
