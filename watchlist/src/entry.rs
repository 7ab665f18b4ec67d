//! Watchlist entries and their rendered form.

use ratewatch_common::{format_amount, parse_amount, round_half_down, CurrencyCode};
use ratewatch_fx::ConversionRow;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One currency in the user's watchlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    /// Currency of the row.
    pub code: CurrencyCode,
    /// Dense 0-based display rank.
    pub position: usize,
    /// Literal typed by the user. Empty unless focused.
    pub raw_input: String,
    /// Current amount, rounded to the display scale.
    pub amount: Decimal,
    /// Whether this row accepts keyboard input.
    pub is_focused: bool,
}

impl WatchlistEntry {
    /// Create an unfocused entry showing zero.
    pub fn new(code: CurrencyCode, position: usize) -> Self {
        Self {
            code,
            position,
            raw_input: String::new(),
            amount: round_half_down(Decimal::ZERO),
            is_focused: false,
        }
    }

    /// Set the typed literal and the amount it stands for.
    pub(crate) fn set_input(&mut self, raw: String) {
        self.amount = round_half_down(parse_amount(&raw));
        self.raw_input = raw;
    }

    /// Text shown in the amount field.
    pub fn display(&self) -> String {
        if self.is_focused {
            self.raw_input.clone()
        } else {
            format_amount(self.amount)
        }
    }
}

impl ConversionRow for WatchlistEntry {
    fn code(&self) -> &CurrencyCode {
        &self.code
    }

    fn is_focused(&self) -> bool {
        self.is_focused
    }

    fn raw_input(&self) -> &str {
        &self.raw_input
    }
}

/// A row as handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowView {
    pub position: usize,
    pub code: CurrencyCode,
    pub name: String,
    pub symbol_or_flag_ref: String,
    /// Raw input on the focused row, formatted amount elsewhere.
    pub display: String,
    /// Placeholder: "1" on the focused row, one focused unit elsewhere.
    pub hint: String,
    pub is_focused: bool,
}
