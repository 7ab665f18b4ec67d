//! Scripted watchlist sessions.

use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};

/// A scripted session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// One UI event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioStep {
    /// Add a currency from the catalog.
    Add { code: String },
    /// Type keys on the focused row. `<` is backspace.
    Key { keys: String },
    /// Clear the focused row.
    Clear,
    /// Remove the row at a position.
    Remove { position: usize },
    /// Undo the last removal.
    Undo,
    /// Swap two rows.
    Reorder { from: usize, to: usize },
    /// Focus the row at a position.
    Focus { position: usize },
    /// List addable currencies matching a query.
    Filter { query: Option<String> },
    /// Refresh rates.
    Refresh,
    /// Remove every row.
    RemoveAll,
    /// Report connectivity as gained or lost.
    SetOnline { online: bool },
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Parse an interactive command such as `add EUR` or `reorder 0 2`.
impl FromStr for ScenarioStep {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();

        let command = words.first().map(|w| w.to_lowercase()).unwrap_or_default();
        let step = match command.as_str() {
            "add" => ScenarioStep::Add {
                code: arg(&words, 1, "code")?.to_string(),
            },
            "key" => ScenarioStep::Key {
                keys: arg(&words, 1, "keys")?.to_string(),
            },
            "clear" => ScenarioStep::Clear,
            "remove" => ScenarioStep::Remove {
                position: index(&words, 1, "position")?,
            },
            "undo" => ScenarioStep::Undo,
            "reorder" => ScenarioStep::Reorder {
                from: index(&words, 1, "from")?,
                to: index(&words, 2, "to")?,
            },
            "focus" => ScenarioStep::Focus {
                position: index(&words, 1, "position")?,
            },
            "filter" => ScenarioStep::Filter {
                query: words.get(1..).filter(|rest| !rest.is_empty()).map(|rest| rest.join(" ")),
            },
            "refresh" => ScenarioStep::Refresh,
            "remove-all" => ScenarioStep::RemoveAll,
            "online" => ScenarioStep::SetOnline { online: true },
            "offline" => ScenarioStep::SetOnline { online: false },
            "" => bail!("Empty command"),
            other => bail!("Unknown command: {}", other),
        };
        Ok(step)
    }
}

fn arg<'a>(words: &[&'a str], i: usize, what: &str) -> anyhow::Result<&'a str> {
    words.get(i).copied().ok_or_else(|| anyhow!("Missing {}", what))
}

fn index(words: &[&str], i: usize, what: &str) -> anyhow::Result<usize> {
    arg(words, i, what)?
        .parse()
        .map_err(|e| anyhow!("Bad {}: {}", what, e))
}
