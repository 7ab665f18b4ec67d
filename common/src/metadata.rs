//! Built-in currency display metadata.

use crate::monetary::CurrencyCode;

/// (code, name, symbol)
const KNOWN_CURRENCIES: &[(&str, &str, &str)] = &[
    ("AED", "United Arab Emirates Dirham", "د.إ"),
    ("ARS", "Argentine Peso", "$"),
    ("AUD", "Australian Dollar", "$"),
    ("BRL", "Brazilian Real", "R$"),
    ("CAD", "Canadian Dollar", "$"),
    ("CHF", "Swiss Franc", "Fr"),
    ("CLP", "Chilean Peso", "$"),
    ("CNY", "Chinese Yuan", "¥"),
    ("COP", "Colombian Peso", "$"),
    ("CZK", "Czech Koruna", "Kč"),
    ("DKK", "Danish Krone", "kr"),
    ("EUR", "Euro", "€"),
    ("GBP", "British Pound Sterling", "£"),
    ("HKD", "Hong Kong Dollar", "$"),
    ("HUF", "Hungarian Forint", "Ft"),
    ("IDR", "Indonesian Rupiah", "Rp"),
    ("ILS", "Israeli New Shekel", "₪"),
    ("INR", "Indian Rupee", "₹"),
    ("JPY", "Japanese Yen", "¥"),
    ("KRW", "South Korean Won", "₩"),
    ("MXN", "Mexican Peso", "$"),
    ("NOK", "Norwegian Krone", "kr"),
    ("NZD", "New Zealand Dollar", "$"),
    ("PEN", "Peruvian Sol", "S/"),
    ("PHP", "Philippine Peso", "₱"),
    ("PLN", "Polish Zloty", "zł"),
    ("RUB", "Russian Ruble", "₽"),
    ("SEK", "Swedish Krona", "kr"),
    ("SGD", "Singapore Dollar", "$"),
    ("THB", "Thai Baht", "฿"),
    ("TRY", "Turkish Lira", "₺"),
    ("TWD", "New Taiwan Dollar", "$"),
    ("USD", "United States Dollar", "$"),
    ("UYU", "Uruguayan Peso", "$"),
    ("ZAR", "South African Rand", "R"),
];

fn lookup(code: &CurrencyCode) -> Option<&'static (&'static str, &'static str, &'static str)> {
    KNOWN_CURRENCIES
        .binary_search_by(|(known, _, _)| known.cmp(&code.code()))
        .ok()
        .map(|idx| &KNOWN_CURRENCIES[idx])
}

/// Display name for a currency, falling back to the code itself.
pub fn display_name(code: &CurrencyCode) -> String {
    lookup(code)
        .map(|(_, name, _)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Currency symbol, if known.
pub fn symbol(code: &CurrencyCode) -> Option<&'static str> {
    lookup(code).map(|(_, _, symbol)| *symbol)
}

/// Flag resource reference for a currency.
pub fn flag_ref(code: &CurrencyCode) -> String {
    format!("flag_{}", code.code().to_ascii_lowercase())
}
