//! Watchlist configuration.

use ratewatch_common::CurrencyCode;
use ratewatch_fx::FreshnessConfig;

use crate::input::InputLimits;

/// Main watchlist configuration.
#[derive(Debug, Clone)]
pub struct WatchlistConfig {
    /// Rate freshness configuration.
    pub freshness: FreshnessConfig,
    /// Keystroke limits.
    pub input_limits: InputLimits,
    /// Key passed to the rate transport.
    pub api_key: String,
    /// Surface caller bugs as errors instead of ignoring them.
    pub strict_caller_checks: bool,
    /// Currencies added on first launch.
    pub default_currencies: Vec<CurrencyCode>,
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            freshness: FreshnessConfig::default(),
            input_limits: InputLimits::default(),
            api_key: String::new(),
            strict_caller_checks: cfg!(debug_assertions),
            default_currencies: vec![CurrencyCode::usd(), CurrencyCode::eur()],
        }
    }
}

impl WatchlistConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            freshness: FreshnessConfig::from_env(),
            ..Self::default()
        };

        if let Ok(key) = std::env::var("RATEWATCH_API_KEY") {
            config.api_key = key;
        }

        if let Ok(digits) = std::env::var("RATEWATCH_MAX_FRACTION_DIGITS") {
            if let Ok(digits) = digits.parse() {
                config.input_limits.max_fraction_digits = digits;
            }
        }

        if let Ok(strict) = std::env::var("RATEWATCH_STRICT") {
            config.strict_caller_checks = matches!(strict.as_str(), "1" | "true" | "yes");
        }

        if let Ok(codes) = std::env::var("RATEWATCH_DEFAULT_CURRENCIES") {
            config.default_currencies = codes
                .split(',')
                .filter_map(|code| CurrencyCode::new(code).ok())
                .collect();
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.freshness.validate()?;

        if self.input_limits.max_integer_digits == 0 {
            return Err("At least one integer digit must be allowed".to_string());
        }

        if self.input_limits.max_fraction_digits > ratewatch_common::DISPLAY_SCALE as usize {
            return Err(format!(
                "Fraction digits cannot exceed the display scale of {}",
                ratewatch_common::DISPLAY_SCALE
            ));
        }

        Ok(())
    }
}
