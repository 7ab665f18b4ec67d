//! Multi-way conversion driven by a single focused amount.

use ratewatch_common::{format_amount, parse_amount, round_half_down, CurrencyCode, RateSnapshot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A row taking part in a recompute.
pub trait ConversionRow {
    /// Currency of the row.
    fn code(&self) -> &CurrencyCode;

    /// Whether this row holds the user's input.
    fn is_focused(&self) -> bool;

    /// Literal typed by the user; only meaningful on the focused row.
    fn raw_input(&self) -> &str;
}

/// Converted amount for one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedAmount {
    /// Currency of the row.
    pub code: CurrencyCode,
    /// Rounded amount (4 fractional digits).
    pub amount: Decimal,
    /// Display string, always with 4 fractional digits.
    pub display: String,
}

impl ConvertedAmount {
    fn new(code: CurrencyCode, value: Decimal) -> Self {
        Self {
            code,
            amount: round_half_down(value),
            display: format_amount(value),
        }
    }
}

/// Stateless conversion engine.
///
/// Stored rates are all relative to one implicit base currency, so every
/// conversion goes through the ratio `rate(to) / rate(from)`.
///
/// Precondition: the focused row's raw input has already passed the
/// keystroke validation gate. Anything unparsable is treated as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversionEngine;

impl ConversionEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self
    }

    /// Convert an amount between two currencies without rounding.
    pub fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
        rates: &RateSnapshot,
    ) -> Option<Decimal> {
        if from == to {
            return Some(amount);
        }
        let from_rate = rates.rate(from)?;
        let to_rate = rates.rate(to)?;
        amount.checked_mul(to_rate)?.checked_div(from_rate)
    }

    /// Value of one unit of `from` expressed in `to`, formatted for display.
    pub fn unit_hint(&self, from: &CurrencyCode, to: &CurrencyCode, rates: &RateSnapshot) -> Option<String> {
        self.convert(Decimal::ONE, from, to, rates).map(format_amount)
    }

    /// Recompute the display amount of every row from the focused one.
    ///
    /// Returns one result per non-focused row, in row order. With a single
    /// row, no focused row, or no rate for the focused currency this is a
    /// no-op. Rows whose currency has no rate are skipped.
    pub fn recompute<R: ConversionRow>(&self, rows: &[R], rates: &RateSnapshot) -> Vec<ConvertedAmount> {
        if rows.len() < 2 {
            return Vec::new();
        }

        let Some(focused) = rows.iter().find(|row| row.is_focused()) else {
            warn!("Recompute requested without a focused row");
            return Vec::new();
        };

        let focused_code = focused.code();
        let Some(focused_rate) = rates.rate(focused_code) else {
            warn!(code = %focused_code, "No rate for focused currency");
            return Vec::new();
        };

        let focused_amount = parse_amount(focused.raw_input());
        debug!(code = %focused_code, amount = %focused_amount, "Recomputing conversions");

        rows.iter()
            .filter(|row| !row.is_focused())
            .filter_map(|row| {
                let code = row.code();
                if focused_amount.is_zero() {
                    return Some(ConvertedAmount::new(code.clone(), Decimal::ZERO));
                }
                let Some(rate) = rates.rate(code) else {
                    warn!(code = %code, "No rate for currency, leaving display untouched");
                    return None;
                };
                match focused_amount.checked_mul(rate).and_then(|v| v.checked_div(focused_rate)) {
                    Some(value) => Some(ConvertedAmount::new(code.clone(), value)),
                    None => {
                        warn!(code = %code, amount = %focused_amount, "Conversion overflowed");
                        None
                    }
                }
            })
            .collect()
    }
}
