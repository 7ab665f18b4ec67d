//! Keystroke validation gate.
//!
//! Only literals matching `^\d*(\.\d{0,N})?$` ever reach the conversion
//! engine; everything else is rejected here.

use ratewatch_common::to_raw_input;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{WatchlistError, WatchlistResult};

/// A key on the decimal keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Digit(u8),
    DecimalPoint,
    Backspace,
}

impl Key {
    /// Map a character to a key. `<` stands for backspace.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0'..='9' => c.to_digit(10).map(|d| Key::Digit(d as u8)),
            '.' => Some(Key::DecimalPoint),
            '<' => Some(Key::Backspace),
            _ => None,
        }
    }
}

/// Length limits on the typed literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLimits {
    /// Maximum digits before the decimal point.
    pub max_integer_digits: usize,
    /// Maximum digits after the decimal point.
    pub max_fraction_digits: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_integer_digits: 20,
            max_fraction_digits: 4,
        }
    }
}

/// Applies keystrokes to the focused literal.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputGate {
    limits: InputLimits,
}

impl InputGate {
    /// Create a gate with the given limits.
    pub fn new(limits: InputLimits) -> Self {
        Self { limits }
    }

    /// Apply a key to the current literal, returning the new literal.
    pub fn apply(&self, current: &str, key: Key) -> WatchlistResult<String> {
        let next = match key {
            Key::Digit(d) if d > 9 => return Err(reject(current, "not a digit")),
            Key::Digit(d) => {
                let digit = char::from(b'0' + d);
                match current.split_once('.') {
                    Some((_, fraction)) if fraction.len() >= self.limits.max_fraction_digits => {
                        return Err(reject(current, "too many fraction digits"));
                    }
                    Some(_) => format!("{current}{digit}"),
                    None if current == "0" && d == 0 => {
                        return Err(reject(current, "repeated leading zero"));
                    }
                    None if current == "0" => digit.to_string(),
                    None if current.len() >= self.limits.max_integer_digits => {
                        return Err(reject(current, "too many integer digits"));
                    }
                    None => format!("{current}{digit}"),
                }
            }
            Key::DecimalPoint => {
                if current.contains('.') {
                    return Err(reject(current, "second decimal point"));
                }
                if self.limits.max_fraction_digits == 0 {
                    return Err(reject(current, "fractions disabled"));
                }
                if current.is_empty() {
                    "0.".to_string()
                } else {
                    format!("{current}.")
                }
            }
            Key::Backspace => {
                if current.is_empty() {
                    return Err(reject(current, "nothing to delete"));
                }
                let mut next = current.to_string();
                next.pop();
                next
            }
        };

        if !self.is_valid_literal(&next) {
            return Err(reject(current, "malformed literal"));
        }
        Ok(next)
    }

    /// Check a literal against `^\d*(\.\d{0,N})?$` and the integer limit.
    pub fn is_valid_literal(&self, literal: &str) -> bool {
        let (integer, fraction) = match literal.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (literal, None),
        };
        let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());

        digits(integer)
            && integer.len() <= self.limits.max_integer_digits
            && fraction.map_or(true, |f| digits(f) && f.len() <= self.limits.max_fraction_digits)
    }

    /// Literal for a row that takes focus while showing `amount`.
    ///
    /// The amount is rounded half-down to the fraction limit. An amount with
    /// more integer digits than the gate allows seeds an empty literal.
    pub fn seed(&self, amount: Decimal) -> String {
        let scale = u32::try_from(self.limits.max_fraction_digits).unwrap_or(u32::MAX);
        let rounded = amount.round_dp_with_strategy(scale, RoundingStrategy::MidpointTowardZero);
        let literal = to_raw_input(rounded);
        if self.is_valid_literal(&literal) {
            literal
        } else {
            String::new()
        }
    }
}

fn reject(current: &str, reason: &str) -> WatchlistError {
    WatchlistError::InvalidInput(format!("{reason} (input {current:?})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn type_keys(gate: &InputGate, keys: &str) -> WatchlistResult<String> {
        keys.chars().try_fold(String::new(), |current, c| {
            gate.apply(&current, Key::from_char(c).unwrap())
        })
    }

    #[test]
    fn test_typing_digits() {
        let gate = InputGate::default();
        assert_eq!(type_keys(&gate, "100").unwrap(), "100");
        assert_eq!(type_keys(&gate, "12.34").unwrap(), "12.34");
    }

    #[test]
    fn test_leading_point_gets_zero() {
        let gate = InputGate::default();
        assert_eq!(type_keys(&gate, ".5").unwrap(), "0.5");
    }

    #[test]
    fn test_leading_zero_rules() {
        let gate = InputGate::default();
        assert_eq!(type_keys(&gate, "05").unwrap(), "5");
        assert!(type_keys(&gate, "00").is_err());
        assert_eq!(type_keys(&gate, "0.05").unwrap(), "0.05");
    }

    #[test]
    fn test_fraction_limit() {
        let gate = InputGate::default();
        assert_eq!(type_keys(&gate, "1.2345").unwrap(), "1.2345");
        assert!(matches!(type_keys(&gate, "1.23456"), Err(WatchlistError::InvalidInput(_))));
    }

    #[test]
    fn test_integer_limit() {
        let gate = InputGate::new(InputLimits {
            max_integer_digits: 3,
            max_fraction_digits: 2,
        });
        assert_eq!(type_keys(&gate, "999").unwrap(), "999");
        assert!(type_keys(&gate, "9999").is_err());
        assert_eq!(type_keys(&gate, "999.99").unwrap(), "999.99");
    }

    #[test]
    fn test_second_point_rejected() {
        let gate = InputGate::default();
        assert!(type_keys(&gate, "1.2.").is_err());
    }

    #[test]
    fn test_backspace() {
        let gate = InputGate::default();
        assert_eq!(type_keys(&gate, "12<").unwrap(), "1");
        assert_eq!(type_keys(&gate, "1.<").unwrap(), "1");
        assert!(gate.apply("", Key::Backspace).is_err());
    }

    #[test]
    fn test_invalid_digit_value() {
        let gate = InputGate::default();
        assert!(gate.apply("1", Key::Digit(10)).is_err());
    }

    #[test]
    fn test_literal_validation() {
        let gate = InputGate::default();
        assert!(gate.is_valid_literal(""));
        assert!(gate.is_valid_literal("12."));
        assert!(gate.is_valid_literal(".5"));
        assert!(!gate.is_valid_literal("1e5"));
        assert!(!gate.is_valid_literal("-1"));
        assert!(!gate.is_valid_literal("1.23456"));
    }

    #[test]
    fn test_seed_rounds_to_fraction_limit() {
        let gate = InputGate::new(InputLimits {
            max_integer_digits: 20,
            max_fraction_digits: 2,
        });
        assert_eq!(gate.seed(dec!(0.1235)), "0.12");
        assert_eq!(gate.seed(dec!(0.125)), "0.12");
        assert_eq!(gate.seed(dec!(90.0000)), "90");
        assert_eq!(gate.seed(dec!(0.004)), "");
    }

    #[test]
    fn test_seed_drops_oversized_amounts() {
        let gate = InputGate::default();
        let seeded = gate.seed(dec!(14999999999999999999850));
        assert_eq!(seeded, "");
        assert!(gate.is_valid_literal(&seeded));
        assert_eq!(gate.seed(dec!(99999999999999999999.5)), "99999999999999999999.5");
    }

    #[test]
    fn test_from_char() {
        assert_eq!(Key::from_char('7'), Some(Key::Digit(7)));
        assert_eq!(Key::from_char('.'), Some(Key::DecimalPoint));
        assert_eq!(Key::from_char('<'), Some(Key::Backspace));
        assert_eq!(Key::from_char('x'), None);
    }
}
