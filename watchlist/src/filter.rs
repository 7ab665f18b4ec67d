//! Catalog filter used when picking a currency to add.

use ratewatch_common::CurrencyRate;

/// Case-insensitive substring filter over a catalog sorted by code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionFilter;

impl SelectionFilter {
    /// Create a new filter.
    pub fn new() -> Self {
        Self
    }

    /// Entries whose code or name contains `query`, in catalog order.
    /// An empty or absent query returns the whole catalog.
    pub fn filter(&self, query: Option<&str>, catalog: &[CurrencyRate]) -> Vec<CurrencyRate> {
        let query = query.map(str::trim).unwrap_or_default().to_lowercase();
        if query.is_empty() {
            return catalog.to_vec();
        }
        catalog.iter().filter(|c| c.matches(&query)).cloned().collect()
    }

    /// Fast-scroll section title for the entry at `position`.
    pub fn section_title(&self, filtered: &[CurrencyRate], position: usize) -> Option<char> {
        filtered.get(position).map(|c| c.code.section_title())
    }
}
