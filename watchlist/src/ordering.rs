//! Ordered, positioned collection of watched currencies.
//!
//! Positions are always the exact permutation `0..len`, and exactly one
//! entry is focused whenever the list is non-empty.

use ratewatch_common::{round_half_down, to_raw_input, CurrencyCode};
use ratewatch_fx::{ConvertedAmount, SelectedCurrency};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entry::WatchlistEntry;
use crate::error::{WatchlistError, WatchlistResult};

/// Everything needed to undo one removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalToken {
    /// The entry as it was when removed.
    pub entry: WatchlistEntry,
    /// Position the entry occupied.
    pub original_position: usize,
    /// Currency focused immediately before the removal.
    pub previously_focused: Option<CurrencyCode>,
}

/// The ordered watchlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchlistOrdering {
    entries: Vec<WatchlistEntry>,
}

impl WatchlistOrdering {
    /// Create an empty watchlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a watchlist from codes in display order, focusing the first.
    pub fn from_codes(codes: impl IntoIterator<Item = CurrencyCode>) -> Self {
        let mut ordering = Self::new();
        for code in codes {
            if !ordering.contains(&code) {
                let position = ordering.entries.len();
                ordering.entries.push(WatchlistEntry::new(code, position));
            }
        }
        if let Some(first) = ordering.entries.first_mut() {
            first.is_focused = true;
        }
        ordering.debug_check();
        ordering
    }

    /// Entries in display order.
    pub fn entries(&self) -> &[WatchlistEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the watchlist is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at a position.
    pub fn get(&self, position: usize) -> Option<&WatchlistEntry> {
        self.entries.get(position)
    }

    /// Check if a currency is in the watchlist.
    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.entries.iter().any(|e| &e.code == code)
    }

    /// The focused entry.
    pub fn focused(&self) -> Option<&WatchlistEntry> {
        self.entries.iter().find(|e| e.is_focused)
    }

    /// Position of the focused entry.
    pub fn focused_position(&self) -> Option<usize> {
        self.entries.iter().position(|e| e.is_focused)
    }

    /// Append a currency at the end. The first entry of an empty list is
    /// focused.
    pub fn add(&mut self, code: CurrencyCode) -> WatchlistResult<&WatchlistEntry> {
        if self.contains(&code) {
            return Err(WatchlistError::AlreadySelected(code));
        }

        let position = self.entries.len();
        let mut entry = WatchlistEntry::new(code, position);
        entry.is_focused = self.entries.is_empty();
        debug!(code = %entry.code, position, "Adding currency");
        self.entries.push(entry);

        self.debug_check();
        Ok(&self.entries[position])
    }

    /// Remove the entry at `position`, compacting positions behind it.
    ///
    /// If the focused entry is removed, focus moves to position 0.
    pub fn remove_at(&mut self, position: usize) -> WatchlistResult<RemovalToken> {
        self.check_position(position)?;

        let previously_focused = self.focused().map(|e| e.code.clone());
        let entry = self.entries.remove(position);
        self.renumber();

        if entry.is_focused && !self.entries.is_empty() {
            self.focus_at(0);
        }

        debug!(code = %entry.code, position, "Removed currency");
        self.debug_check();

        Ok(RemovalToken {
            entry,
            original_position: position,
            previously_focused,
        })
    }

    /// Reinsert a removed entry at its original position and restore the
    /// focus that preceded the removal.
    pub fn undo_remove(&mut self, token: RemovalToken) -> WatchlistResult<()> {
        let RemovalToken {
            mut entry,
            original_position,
            previously_focused,
        } = token;

        if original_position > self.entries.len() {
            return Err(WatchlistError::OutOfRange {
                position: original_position,
                len: self.entries.len(),
            });
        }
        if self.contains(&entry.code) {
            return Err(WatchlistError::AlreadySelected(entry.code));
        }

        let restores_focus_to_entry = previously_focused.as_ref() == Some(&entry.code);
        let saved_input = std::mem::take(&mut entry.raw_input);
        entry.is_focused = false;
        debug!(code = %entry.code, position = original_position, "Restoring currency");
        self.entries.insert(original_position, entry);
        self.renumber();

        if restores_focus_to_entry {
            self.unfocus_current();
            let restored = &mut self.entries[original_position];
            restored.is_focused = true;
            restored.set_input(saved_input);
        } else if let Some(idx) = previously_focused
            .as_ref()
            .and_then(|code| self.entries.iter().position(|e| &e.code == code))
        {
            if !self.entries[idx].is_focused {
                self.focus_at(idx);
            }
        } else if self.focused().is_none() {
            self.focus_at(0);
        }

        self.debug_check();
        Ok(())
    }

    /// Exchange the entries at two positions. No other entry moves.
    pub fn swap(&mut self, a: usize, b: usize) -> WatchlistResult<()> {
        self.check_position(a)?;
        self.check_position(b)?;
        if a == b {
            return Ok(());
        }

        self.entries.swap(a, b);
        self.entries[a].position = a;
        self.entries[b].position = b;
        debug!(a, b, "Swapped currencies");

        self.debug_check();
        Ok(())
    }

    /// Move focus to the entry at `position`.
    pub fn change_focus(&mut self, position: usize) -> WatchlistResult<()> {
        self.check_position(position)?;
        if !self.entries[position].is_focused {
            self.focus_at(position);
        }
        self.debug_check();
        Ok(())
    }

    /// Replace the focused entry's raw input.
    pub fn set_focused_input(&mut self, raw: String) {
        if let Some(focused) = self.entries.iter_mut().find(|e| e.is_focused) {
            focused.set_input(raw);
        }
    }

    /// Write recomputed amounts back onto the non-focused entries.
    pub fn apply_conversions(&mut self, conversions: &[ConvertedAmount]) {
        for conversion in conversions {
            if let Some(entry) = self
                .entries
                .iter_mut()
                .find(|e| !e.is_focused && e.code == conversion.code)
            {
                entry.amount = conversion.amount;
            }
        }
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The selection in the shape the persistence collaborator stores.
    pub fn selection(&self) -> Vec<SelectedCurrency> {
        self.entries
            .iter()
            .map(|e| SelectedCurrency {
                code: e.code.clone(),
                position: e.position,
            })
            .collect()
    }

    /// Check the position and focus invariants.
    pub fn is_consistent(&self) -> bool {
        let positions_dense = self.entries.iter().enumerate().all(|(i, e)| e.position == i);
        let focused = self.entries.iter().filter(|e| e.is_focused).count();
        let focus_ok = if self.entries.is_empty() { focused == 0 } else { focused == 1 };
        positions_dense && focus_ok
    }

    fn check_position(&self, position: usize) -> WatchlistResult<()> {
        if position >= self.entries.len() {
            return Err(WatchlistError::OutOfRange {
                position,
                len: self.entries.len(),
            });
        }
        Ok(())
    }

    fn renumber(&mut self) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.position = i;
        }
    }

    /// Drop focus from the current entry, keeping the amount it showed.
    fn unfocus_current(&mut self) {
        if let Some(current) = self.entries.iter_mut().find(|e| e.is_focused) {
            current.is_focused = false;
            current.raw_input.clear();
            current.amount = round_half_down(current.amount);
        }
    }

    /// Focus the entry at `idx`, seeding its input from its shown amount.
    fn focus_at(&mut self, idx: usize) {
        self.unfocus_current();
        let target = &mut self.entries[idx];
        target.is_focused = true;
        let seeded = to_raw_input(target.amount);
        target.set_input(seeded);
    }

    fn debug_check(&self) {
        debug_assert!(self.is_consistent(), "watchlist invariants violated: {:?}", self.entries);
    }
}
