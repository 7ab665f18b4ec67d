//! Display amount conventions.
//!
//! Every converted amount shown to the user is rounded to
//! [`DISPLAY_SCALE`] fractional digits with ties rounded toward zero
//! (half-down) and always rendered with exactly that many digits.

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits of every displayed amount.
pub const DISPLAY_SCALE: u32 = 4;

/// Round to the display scale using half-down, padding the scale to
/// [`DISPLAY_SCALE`] digits.
pub fn round_half_down(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointTowardZero);
    rounded.rescale(DISPLAY_SCALE);
    rounded
}

/// Render an amount the way the watchlist displays it.
pub fn format_amount(value: Decimal) -> String {
    round_half_down(value).to_string()
}

/// Parse a raw keyboard literal into an amount.
///
/// Empty or unparsable input is treated as zero. Literals such as `"12."`
/// or `".5"` are accepted.
pub fn parse_amount(raw: &str) -> Decimal {
    let trimmed = raw.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }
    let literal = if trimmed.starts_with('.') {
        format!("0{}", trimmed)
    } else {
        trimmed.to_string()
    };
    literal.parse::<Decimal>().unwrap_or(Decimal::ZERO)
}

/// Turn a displayed amount back into a raw input literal.
///
/// Trailing zeros are dropped and zero becomes the empty literal, so a
/// newly focused row starts from exactly the value it was showing.
pub fn to_raw_input(value: Decimal) -> String {
    if value.is_zero() {
        return String::new();
    }
    value.normalize().to_string()
}
