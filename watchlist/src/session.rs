//! The single owner of watchlist state, driven by UI events.

use ratewatch_common::{metadata, CurrencyCode, CurrencyRate};
use ratewatch_fx::{ConversionEngine, CurrencyRepository, SharedRateStore};
use tracing::{debug, info, warn};

use crate::config::WatchlistConfig;
use crate::entry::RowView;
use crate::error::{WatchlistError, WatchlistResult};
use crate::filter::SelectionFilter;
use crate::input::{InputGate, Key};
use crate::ordering::{RemovalToken, WatchlistOrdering};
use crate::persistence::PersistenceHandle;

/// UI-facing watchlist session.
///
/// Every event mutates the ordering, recomputes the conversions and only
/// then returns, so callers never observe a half-applied update. Selection
/// changes are queued for persistence after the in-memory mutation.
pub struct WatchlistSession {
    ordering: WatchlistOrdering,
    store: SharedRateStore,
    engine: ConversionEngine,
    gate: InputGate,
    filter: SelectionFilter,
    persistence: PersistenceHandle,
    pending_undo: Option<RemovalToken>,
    strict: bool,
    default_currencies: Vec<CurrencyCode>,
}

impl WatchlistSession {
    /// Create an empty session.
    pub fn new(store: SharedRateStore, persistence: PersistenceHandle, config: &WatchlistConfig) -> Self {
        Self {
            ordering: WatchlistOrdering::new(),
            store,
            engine: ConversionEngine::new(),
            gate: InputGate::new(config.input_limits),
            filter: SelectionFilter::new(),
            persistence,
            pending_undo: None,
            strict: config.strict_caller_checks,
            default_currencies: config.default_currencies.clone(),
        }
    }

    /// Get the underlying ordering.
    pub fn ordering(&self) -> &WatchlistOrdering {
        &self.ordering
    }

    /// Whether an undo is available.
    pub fn can_undo(&self) -> bool {
        self.pending_undo.is_some()
    }

    /// Rebuild the watchlist from the persisted selection.
    ///
    /// On a first launch with nothing persisted, the configured default
    /// currencies that exist in the catalog are added.
    pub async fn restore(&mut self, repository: &dyn CurrencyRepository) -> WatchlistResult<Vec<RowView>> {
        let selected = repository.get_selected().await?;
        let snapshot = self.store.snapshot();

        let codes = selected.into_iter().map(|s| s.code).filter(|code| {
            let known = snapshot.contains(code);
            if !known {
                warn!(code = %code, "Dropping persisted currency without a rate");
            }
            known
        });
        self.ordering = WatchlistOrdering::from_codes(codes);
        self.pending_undo = None;

        if self.ordering.is_empty() && repository.is_first_launch().await? {
            for code in &self.default_currencies {
                if snapshot.contains(code) {
                    self.ordering.add(code.clone())?;
                }
            }
            self.persist();
        }
        repository.mark_launched().await?;

        info!(currencies = self.ordering.len(), "Watchlist restored");
        self.recompute();
        Ok(self.rows())
    }

    /// Current rows for rendering.
    pub fn rows(&self) -> Vec<RowView> {
        let snapshot = self.store.snapshot();
        let focused = self.ordering.focused().map(|e| e.code.clone());

        self.ordering
            .entries()
            .iter()
            .map(|entry| {
                let (name, symbol_or_flag_ref) = match self.store.get(&entry.code) {
                    Some(rate) => (rate.name, rate.symbol_or_flag_ref),
                    None => (metadata::display_name(&entry.code), metadata::flag_ref(&entry.code)),
                };
                let hint = match &focused {
                    _ if entry.is_focused => "1".to_string(),
                    Some(from) => self.engine.unit_hint(from, &entry.code, &snapshot).unwrap_or_default(),
                    None => String::new(),
                };
                RowView {
                    position: entry.position,
                    code: entry.code.clone(),
                    name,
                    symbol_or_flag_ref,
                    display: entry.display(),
                    hint,
                    is_focused: entry.is_focused,
                }
            })
            .collect()
    }

    /// Whether the gate would accept `key` on the focused row.
    pub fn accepts_key(&self, key: Key) -> bool {
        self.ordering
            .focused()
            .map(|focused| self.gate.apply(&focused.raw_input, key).is_ok())
            .unwrap_or(false)
    }

    /// Apply a keystroke to the focused row.
    pub fn on_key_press(&mut self, key: Key) -> WatchlistResult<Vec<RowView>> {
        let result = match self.ordering.focused() {
            Some(focused) => self.gate.apply(&focused.raw_input, key),
            None => Err(WatchlistError::InvalidInput("no focused currency".to_string())),
        };
        if let Some(next) = self.tolerate(result)? {
            self.ordering.set_focused_input(next);
            self.recompute();
        }
        Ok(self.rows())
    }

    /// Clear the focused row's input.
    pub fn on_key_clear(&mut self) -> WatchlistResult<Vec<RowView>> {
        self.ordering.set_focused_input(String::new());
        self.recompute();
        Ok(self.rows())
    }

    /// Append a currency from the catalog.
    pub fn on_add(&mut self, code: &str) -> WatchlistResult<Vec<RowView>> {
        let code = CurrencyCode::new(code).map_err(|_| WatchlistError::UnknownCurrency(code.to_string()))?;
        if self.store.get(&code).is_none() {
            return Err(WatchlistError::UnknownCurrency(code.to_string()));
        }

        self.ordering.add(code.clone())?;
        info!(code = %code, "Currency added");
        self.recompute();
        self.persist();
        Ok(self.rows())
    }

    /// Remove the row at `position`, keeping an undo token.
    pub fn on_remove(&mut self, position: usize) -> WatchlistResult<Vec<RowView>> {
        let result = self.ordering.remove_at(position);
        if let Some(token) = self.tolerate(result)? {
            info!(code = %token.entry.code, position, "Currency removed");
            self.pending_undo = Some(token);
            self.fit_focused_input();
            self.recompute();
            self.persist();
        }
        Ok(self.rows())
    }

    /// Restore the most recently removed row.
    pub fn on_undo(&mut self) -> WatchlistResult<Vec<RowView>> {
        let result = match self.pending_undo.take() {
            Some(token) => self.ordering.undo_remove(token),
            None => Err(WatchlistError::NothingToUndo),
        };
        if self.tolerate(result)?.is_some() {
            info!("Removal undone");
            self.fit_focused_input();
            self.recompute();
            self.persist();
        }
        Ok(self.rows())
    }

    /// Swap two rows, as reported by a drag gesture.
    pub fn on_reorder(&mut self, from: usize, to: usize) -> WatchlistResult<Vec<RowView>> {
        let result = self.ordering.swap(from, to);
        if self.tolerate(result)?.is_some() && from != to {
            self.persist();
        }
        Ok(self.rows())
    }

    /// Move focus to the row at `position`.
    pub fn on_focus_change(&mut self, position: usize) -> WatchlistResult<Vec<RowView>> {
        let result = self.ordering.change_focus(position);
        if self.tolerate(result)?.is_some() {
            self.fit_focused_input();
            self.recompute();
        }
        Ok(self.rows())
    }

    /// Remove every row. Not undoable.
    pub fn on_remove_all(&mut self) -> WatchlistResult<Vec<RowView>> {
        self.ordering.clear();
        self.pending_undo = None;
        info!("All currencies removed");
        self.persist();
        Ok(self.rows())
    }

    /// Catalog entries not yet in the watchlist that match `query`.
    pub fn on_filter(&self, query: Option<&str>) -> Vec<CurrencyRate> {
        let selectable: Vec<CurrencyRate> = self
            .store
            .catalog()
            .into_iter()
            .filter(|c| !self.ordering.contains(&c.code))
            .collect();
        self.filter.filter(query, &selectable)
    }

    /// Recompute against the latest rates, e.g. after a refresh.
    pub fn refresh_display(&mut self) -> Vec<RowView> {
        self.recompute();
        self.rows()
    }

    /// Wait until queued persistence has been applied.
    pub async fn flush(&self) -> WatchlistResult<()> {
        self.persistence.flush().await
    }

    /// A row that takes focus is seeded from the amount it was showing,
    /// which the keyboard gate has never seen.
    fn fit_focused_input(&mut self) {
        let Some(focused) = self.ordering.focused() else {
            return;
        };
        if self.gate.is_valid_literal(&focused.raw_input) {
            return;
        }
        let seeded = self.gate.seed(focused.amount);
        debug!(code = %focused.code, raw = %focused.raw_input, seeded = %seeded, "Fitted focused input to limits");
        self.ordering.set_focused_input(seeded);
    }

    fn recompute(&mut self) {
        let snapshot = self.store.snapshot();
        let conversions = self.engine.recompute(self.ordering.entries(), &snapshot);
        debug!(updated = conversions.len(), "Applied conversions");
        self.ordering.apply_conversions(&conversions);
    }

    fn persist(&self) {
        self.persistence.save_selection(self.ordering.selection());
    }

    /// Caller bugs are returned in strict mode and ignored otherwise.
    fn tolerate<T>(&self, result: WatchlistResult<T>) -> WatchlistResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_caller_bug() && !self.strict => {
                warn!(error = %e, "Ignoring invalid request");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputLimits;
    use ratewatch_fx::{InMemoryCurrencyRepository, RateStore, SelectedCurrency};
    use std::sync::Arc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn catalog_of(rates: &[(&str, Decimal)]) -> Vec<CurrencyRate> {
        rates
            .iter()
            .map(|(code, rate)| CurrencyRate::with_builtin_metadata(CurrencyCode::new(code).unwrap(), *rate).unwrap())
            .collect()
    }

    fn catalog() -> Vec<CurrencyRate> {
        catalog_of(&[("USD", dec!(1.0)), ("EUR", dec!(0.90)), ("GBP", dec!(0.80)), ("JPY", dec!(150))])
    }

    struct Harness {
        session: WatchlistSession,
        repository: Arc<InMemoryCurrencyRepository>,
    }

    async fn harness(strict: bool, codes: &[&str]) -> Harness {
        let config = WatchlistConfig {
            strict_caller_checks: strict,
            ..Default::default()
        };
        harness_with(&config, catalog(), codes).await
    }

    async fn harness_with(config: &WatchlistConfig, catalog: Vec<CurrencyRate>, codes: &[&str]) -> Harness {
        let repository = Arc::new(InMemoryCurrencyRepository::new());
        repository.upsert_rates(catalog.clone(), 1_000).await.unwrap();
        repository.mark_launched().await.unwrap();
        let store = Arc::new(RateStore::from_catalog(catalog, 1_000));
        let (persistence, _task) = PersistenceHandle::spawn(repository.clone());

        let mut session = WatchlistSession::new(store, persistence, config);
        for code in codes {
            session.on_add(code).unwrap();
        }
        Harness { session, repository }
    }

    fn type_keys(session: &mut WatchlistSession, keys: &str) -> Vec<RowView> {
        let mut rows = session.rows();
        for c in keys.chars() {
            rows = session.on_key_press(Key::from_char(c).unwrap()).unwrap();
        }
        rows
    }

    fn displays(rows: &[RowView]) -> Vec<(String, String)> {
        rows.iter().map(|r| (r.code.to_string(), r.display.clone())).collect()
    }

    #[tokio::test]
    async fn test_typing_converts_usd_to_eur() {
        let mut h = harness(true, &["USD", "EUR"]).await;

        let rows = type_keys(&mut h.session, "100");

        assert!(rows[0].is_focused);
        assert_eq!(rows[0].display, "100");
        assert_eq!(rows[1].display, "90.0000");
    }

    #[tokio::test]
    async fn test_clear_resets_to_zero() {
        let mut h = harness(true, &["USD", "EUR", "GBP"]).await;
        type_keys(&mut h.session, "25");

        let rows = h.session.on_key_clear().unwrap();

        assert_eq!(rows[0].display, "");
        assert_eq!(rows[1].display, "0.0000");
        assert_eq!(rows[2].display, "0.0000");
    }

    #[tokio::test]
    async fn test_hints() {
        let h = harness(true, &["USD", "JPY"]).await;

        let rows = h.session.rows();

        assert_eq!(rows[0].hint, "1");
        assert_eq!(rows[1].hint, "150.0000");
    }

    #[tokio::test]
    async fn test_remove_and_undo_scenario() {
        let mut h = harness(true, &["USD", "EUR", "GBP"]).await;

        let rows = h.session.on_remove(1).unwrap();
        assert_eq!(
            rows.iter().map(|r| (r.code.to_string(), r.position)).collect::<Vec<_>>(),
            vec![("USD".to_string(), 0), ("GBP".to_string(), 1)]
        );

        let rows = h.session.on_undo().unwrap();
        assert_eq!(
            rows.iter().map(|r| (r.code.to_string(), r.position)).collect::<Vec<_>>(),
            vec![("USD".to_string(), 0), ("EUR".to_string(), 1), ("GBP".to_string(), 2)]
        );
        assert!(!h.session.can_undo());
    }

    #[tokio::test]
    async fn test_removing_focused_keeps_values() {
        let mut h = harness(true, &["USD", "EUR", "GBP"]).await;
        type_keys(&mut h.session, "100");

        let rows = h.session.on_remove(0).unwrap();

        assert!(rows[0].is_focused);
        assert_eq!(rows[0].code, CurrencyCode::eur());
        assert_eq!(rows[0].display, "90");
        assert_eq!(rows[1].display, "80.0000");

        let rows = h.session.on_undo().unwrap();
        assert_eq!(displays(&rows)[0], ("USD".to_string(), "100".to_string()));
        assert!(rows[0].is_focused);
    }

    #[tokio::test]
    async fn test_focus_change_keeps_values() {
        let mut h = harness(true, &["USD", "EUR"]).await;
        type_keys(&mut h.session, "100");

        let rows = h.session.on_focus_change(1).unwrap();

        assert!(rows[1].is_focused);
        assert_eq!(rows[1].display, "90");
        assert_eq!(rows[0].display, "100.0000");

        let rows = type_keys(&mut h.session, "0");
        assert_eq!(rows[1].display, "900");
        assert_eq!(rows[0].display, "1000.0000");
    }

    #[tokio::test]
    async fn test_focus_on_oversized_amount_starts_empty() {
        let mut h = harness(true, &["USD", "JPY"]).await;
        type_keys(&mut h.session, &"9".repeat(20));
        assert_eq!(h.session.ordering().entries()[1].amount, dec!(14999999999999999999850));

        let rows = h.session.on_focus_change(1).unwrap();

        let focused = h.session.ordering().focused().unwrap();
        assert!(h.session.gate.is_valid_literal(&focused.raw_input));
        assert_eq!(rows[1].display, "");
        assert_eq!(rows[0].display, "0.0000");
        assert!(h.session.accepts_key(Key::Digit(1)));
    }

    #[tokio::test]
    async fn test_focus_seed_respects_fraction_limit() {
        let config = WatchlistConfig {
            strict_caller_checks: true,
            input_limits: InputLimits {
                max_integer_digits: 20,
                max_fraction_digits: 2,
            },
            ..Default::default()
        };
        let catalog = catalog_of(&[("USD", dec!(1)), ("EUR", dec!(0.123456))]);
        let mut h = harness_with(&config, catalog, &["USD", "EUR"]).await;
        type_keys(&mut h.session, "1");

        let rows = h.session.on_focus_change(1).unwrap();

        let focused = h.session.ordering().focused().unwrap();
        assert_eq!(focused.raw_input, "0.12");
        assert!(h.session.gate.is_valid_literal(&focused.raw_input));
        assert_eq!(rows[1].display, "0.12");
        assert!(!h.session.accepts_key(Key::Digit(5)));

        let rows = h.session.on_remove(1).unwrap();
        assert_eq!(rows[0].display, "0.97");
        assert!(h.session.gate.is_valid_literal(&h.session.ordering().focused().unwrap().raw_input));
    }

    #[tokio::test]
    async fn test_strict_mode_surfaces_caller_bugs() {
        let mut h = harness(true, &["USD", "EUR"]).await;

        assert!(matches!(
            h.session.on_focus_change(5),
            Err(WatchlistError::OutOfRange { position: 5, len: 2 })
        ));
        assert_eq!(h.session.on_undo().unwrap_err(), WatchlistError::NothingToUndo);
        assert!(matches!(
            h.session.on_key_press(Key::DecimalPoint).and_then(|_| h.session.on_key_press(Key::DecimalPoint)),
            Err(WatchlistError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_lenient_mode_ignores_caller_bugs() {
        let mut h = harness(false, &["USD", "EUR"]).await;
        let before = h.session.rows();

        assert_eq!(h.session.on_focus_change(5).unwrap(), before);
        assert_eq!(h.session.on_reorder(0, 9).unwrap(), before);
        assert_eq!(h.session.on_remove(7).unwrap(), before);
        assert_eq!(h.session.on_undo().unwrap(), before);
    }

    #[tokio::test]
    async fn test_accepts_key() {
        let mut h = harness(true, &["USD", "EUR"]).await;
        type_keys(&mut h.session, "1.2345");

        assert!(!h.session.accepts_key(Key::Digit(6)));
        assert!(h.session.accepts_key(Key::Backspace));
    }

    #[tokio::test]
    async fn test_unknown_and_duplicate_currency() {
        let mut h = harness(true, &["USD"]).await;

        assert!(matches!(h.session.on_add("XYZ"), Err(WatchlistError::UnknownCurrency(_))));
        assert!(matches!(h.session.on_add("dollars"), Err(WatchlistError::UnknownCurrency(_))));
        assert_eq!(
            h.session.on_add("usd").unwrap_err(),
            WatchlistError::AlreadySelected(CurrencyCode::usd())
        );
    }

    #[tokio::test]
    async fn test_reorder_persists_positions() {
        let mut h = harness(true, &["USD", "EUR", "GBP"]).await;

        h.session.on_reorder(0, 2).unwrap();
        h.session.flush().await.unwrap();

        let selected = h.repository.get_selected().await.unwrap();
        assert_eq!(
            selected,
            vec![
                SelectedCurrency { code: CurrencyCode::gbp(), position: 0 },
                SelectedCurrency { code: CurrencyCode::eur(), position: 1 },
                SelectedCurrency { code: CurrencyCode::usd(), position: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn test_filter_excludes_selected() {
        let h = harness(true, &["USD"]).await;

        let codes: Vec<String> = h.session.on_filter(None).iter().map(|c| c.code.to_string()).collect();
        assert_eq!(codes, vec!["EUR", "GBP", "JPY"]);

        let codes: Vec<String> = h.session.on_filter(Some("eu")).iter().map(|c| c.code.to_string()).collect();
        assert_eq!(codes, vec!["EUR"]);
    }

    #[tokio::test]
    async fn test_remove_all() {
        let mut h = harness(true, &["USD", "EUR"]).await;
        h.session.on_remove(0).unwrap();

        assert!(h.session.on_remove_all().unwrap().is_empty());
        assert!(!h.session.can_undo());
        tokio_test::assert_err!(h.session.on_undo());
        h.session.flush().await.unwrap();
        assert!(h.repository.get_selected().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_from_repository() {
        let mut h = harness(true, &["GBP", "USD"]).await;
        h.session.flush().await.unwrap();

        let store = Arc::new(RateStore::from_catalog(catalog(), 1_000));
        let (persistence, _task) = PersistenceHandle::spawn(h.repository.clone());
        let mut restored = WatchlistSession::new(store, persistence, &WatchlistConfig::default());
        let rows = restored.restore(h.repository.as_ref()).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].code, CurrencyCode::gbp());
        assert!(rows[0].is_focused);
    }

    #[tokio::test]
    async fn test_first_launch_adds_defaults() {
        let repository = Arc::new(InMemoryCurrencyRepository::new());
        repository.upsert_rates(catalog(), 1_000).await.unwrap();
        let store = Arc::new(RateStore::from_catalog(catalog(), 1_000));
        let (persistence, _task) = PersistenceHandle::spawn(repository.clone());
        let mut session = WatchlistSession::new(store, persistence, &WatchlistConfig::default());

        let rows = session.restore(repository.as_ref()).await.unwrap();
        session.flush().await.unwrap();

        assert_eq!(displays(&rows).len(), 2);
        assert_eq!(rows[0].code, CurrencyCode::usd());
        assert_eq!(rows[1].code, CurrencyCode::eur());
        assert_eq!(repository.get_selected().await.unwrap().len(), 2);
        assert!(!repository.is_first_launch().await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_display_picks_up_new_rates() {
        let mut h = harness(true, &["USD", "EUR"]).await;
        type_keys(&mut h.session, "10");

        let mut rates = std::collections::BTreeMap::new();
        rates.insert(CurrencyCode::eur(), dec!(0.5));
        h.session
            .store
            .apply_fetch(ratewatch_common::RateSnapshot::new(rates, 2_000));

        let rows = h.session.refresh_display();
        assert_eq!(rows[1].display, "5.0000");
        assert_eq!(h.session.ordering().get(1).unwrap().amount, Decimal::new(50000, 4));
    }
}
