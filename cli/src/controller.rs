//! Wires the rate engine and the watchlist session together.

use std::path::PathBuf;
use std::sync::Arc;

use ratewatch_common::now_seconds;
use ratewatch_fx::{CurrencyRepository, FreshnessPolicy, RateRefresher, RateStore, RefreshOutcome, StaticConnectivity};
use ratewatch_watchlist::{
    Key, PersistenceHandle, RowView, SelectionFilter, WatchlistConfig, WatchlistError, WatchlistSession,
};
use tracing::{info, warn};

use crate::scenario::{Scenario, ScenarioStep};
use crate::state::JsonFileRepository;
use crate::transport::FileRateTransport;

/// Where the controller reads and writes.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Rate table served by the transport.
    pub rates: PathBuf,
    /// Persisted state, if any.
    pub state: Option<PathBuf>,
    /// Start with connectivity reported as unavailable.
    pub offline: bool,
}

/// Drives one watchlist session.
pub struct WatchlistController {
    session: WatchlistSession,
    refresher: Arc<RateRefresher>,
    connectivity: Arc<StaticConnectivity>,
    repository: Arc<JsonFileRepository>,
}

impl WatchlistController {
    /// Load state, refresh rates and restore the watchlist.
    pub async fn start(options: &RunOptions, config: &WatchlistConfig) -> anyhow::Result<Self> {
        let repository = Arc::new(JsonFileRepository::open(options.state.as_deref()).await?);
        let catalog = repository.get_all().await?;
        let fetched_at = repository.fetched_at().await?.unwrap_or_default();
        let store = Arc::new(RateStore::from_catalog(catalog, fetched_at));
        let stats = store.stats();
        info!(currencies = stats.currencies, fetched_at = ?stats.fetched_at, "Rate store loaded");

        let connectivity = Arc::new(StaticConnectivity::new(!options.offline));
        let refresher = Arc::new(RateRefresher::new(
            Arc::new(FileRateTransport::new(options.rates.clone())),
            connectivity.clone(),
            store.clone(),
            repository.clone(),
            FreshnessPolicy::new(config.freshness.clone()),
            config.api_key.clone(),
        ));

        let (persistence, _writer) = PersistenceHandle::spawn(repository.clone());
        let session = WatchlistSession::new(store, persistence, config);

        let mut controller = Self {
            session,
            refresher,
            connectivity,
            repository,
        };
        controller.refresh().await;
        controller.session.restore(controller.repository.as_ref()).await?;
        Ok(controller)
    }

    /// The watchlist session.
    pub fn session(&self) -> &WatchlistSession {
        &self.session
    }

    /// Flip the reported connectivity.
    pub fn set_online(&self, online: bool) {
        info!(online, "Connectivity changed");
        self.connectivity.set_available(online);
    }

    /// Run every step of a scenario.
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> anyhow::Result<()> {
        info!("Running scenario: {} - {}", scenario.name, scenario.description);
        for step in &scenario.steps {
            self.execute_step(step).await;
        }
        Ok(self.session.flush().await?)
    }

    /// Apply one step and print the result. Watchlist errors are reported,
    /// not propagated, so a script keeps going like a user would.
    pub async fn execute_step(&mut self, step: &ScenarioStep) {
        let result = match step {
            ScenarioStep::Add { code } => self.session.on_add(code),
            ScenarioStep::Key { keys } => self.type_keys(keys),
            ScenarioStep::Clear => self.session.on_key_clear(),
            ScenarioStep::Remove { position } => self.session.on_remove(*position),
            ScenarioStep::Undo => self.session.on_undo(),
            ScenarioStep::Reorder { from, to } => self.session.on_reorder(*from, *to),
            ScenarioStep::Focus { position } => self.session.on_focus_change(*position),
            ScenarioStep::Filter { query } => {
                self.print_catalog(query.as_deref());
                return;
            }
            ScenarioStep::Refresh => {
                self.refresh().await;
                Ok(self.session.refresh_display())
            }
            ScenarioStep::RemoveAll => self.session.on_remove_all(),
            ScenarioStep::SetOnline { online } => {
                self.set_online(*online);
                return;
            }
        };

        match result {
            Ok(rows) => print_rows(&rows),
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Step rejected");
                println!("error: {}", e);
            }
        }
    }

    /// Refresh rates, reporting failures as the UI would.
    pub async fn refresh(&mut self) {
        match self.refresher.refresh(now_seconds()).await {
            Ok(RefreshOutcome::Fetched { kind, fetched_at }) => {
                info!(?kind, fetched_at, "Fetched rates");
            }
            Ok(RefreshOutcome::Cached { fetched_at }) => {
                info!(fetched_at, "Using cached rates");
            }
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "Rate refresh failed");
                println!("error: {}", e);
            }
        }
    }

    fn type_keys(&mut self, keys: &str) -> Result<Vec<RowView>, WatchlistError> {
        let mut rows = self.session.rows();
        for c in keys.chars() {
            let key = Key::from_char(c).ok_or_else(|| WatchlistError::InvalidInput(format!("unknown key {c:?}")))?;
            rows = self.session.on_key_press(key)?;
        }
        Ok(rows)
    }

    fn print_catalog(&self, query: Option<&str>) {
        let matches = self.session.on_filter(query);
        let filter = SelectionFilter::new();
        let mut last_title = None;
        for (i, rate) in matches.iter().enumerate() {
            let title = filter.section_title(&matches, i);
            if title != last_title {
                if let Some(title) = title {
                    println!("[{}]", title);
                }
                last_title = title;
            }
            println!("  {}  {}", rate.code, rate.name);
        }
    }
}

/// Render rows as a plain table.
pub fn format_row(row: &RowView) -> String {
    let marker = if row.is_focused { '>' } else { ' ' };
    format!(
        "{} {:>2} {} {:>24}  [{}] {}",
        marker, row.position, row.code, row.display, row.hint, row.name
    )
}

fn print_rows(rows: &[RowView]) {
    if rows.is_empty() {
        println!("(watchlist empty)");
    }
    for row in rows {
        println!("{}", format_row(row));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn rates_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"timestamp": {}, "rates": {{"USD": "1.0", "EUR": "0.90", "GBP": "0.80"}}}}"#,
            now_seconds()
        )
        .unwrap();
        file
    }

    fn options(rates: &tempfile::NamedTempFile, state: Option<PathBuf>) -> RunOptions {
        RunOptions {
            rates: rates.path().to_path_buf(),
            state,
            offline: false,
        }
    }

    fn strict() -> WatchlistConfig {
        WatchlistConfig {
            strict_caller_checks: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_first_launch_scenario() {
        let rates = rates_file();
        let mut controller = WatchlistController::start(&options(&rates, None), &strict()).await.unwrap();

        let scenario = Scenario {
            name: "usd-eur".into(),
            description: String::new(),
            steps: vec![ScenarioStep::Key { keys: "100".into() }],
        };
        controller.run_scenario(&scenario).await.unwrap();

        let rows = controller.session().rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].display, "100");
        assert_eq!(rows[1].display, "90.0000");
    }

    #[tokio::test]
    async fn test_state_is_restored_offline() {
        let rates = rates_file();
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");

        let mut first = WatchlistController::start(&options(&rates, Some(state.clone())), &strict())
            .await
            .unwrap();
        first.execute_step(&ScenarioStep::Add { code: "GBP".into() }).await;
        first.execute_step(&ScenarioStep::Reorder { from: 0, to: 2 }).await;
        first.session().flush().await.unwrap();

        let mut offline = options(&rates, Some(state));
        offline.offline = true;
        let second = WatchlistController::start(&offline, &strict()).await.unwrap();

        let codes: Vec<String> = second.session().rows().iter().map(|r| r.code.to_string()).collect();
        assert_eq!(codes, vec!["GBP", "EUR", "USD"]);
    }

    #[tokio::test]
    async fn test_offline_without_cache_starts_empty() {
        let rates = rates_file();
        let mut opts = options(&rates, None);
        opts.offline = true;

        let controller = WatchlistController::start(&opts, &strict()).await.unwrap();

        assert!(controller.session().rows().is_empty());
    }

    #[test]
    fn test_format_row() {
        let row = RowView {
            position: 1,
            code: ratewatch_common::CurrencyCode::eur(),
            name: "Euro".into(),
            symbol_or_flag_ref: "flag_eur".into(),
            display: "90.0000".into(),
            hint: "0.9000".into(),
            is_focused: false,
        };
        assert!(format_row(&row).contains("EUR"));
        assert!(format_row(&row).ends_with("[0.9000] Euro"));
    }
}
