use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{LedgerError, LedgerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnEntry {
    pub height: u32,
    pub amount: u64,
    pub cumulative: u64,
}

/// Monotone running total of amounts burned through forever deposits.
/// One entry per height; burns landing on the same height merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnChannel {
    entries: Vec<BurnEntry>,
}

impl BurnChannel {
    /// Record a burn of `amount` at `height`. Heights must be supplied in
    /// non-decreasing order, matching the owning index's push order.
    pub fn add(&mut self, amount: u64, height: u32) -> LedgerResult<()> {
        let cumulative = self
            .total()
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(height))?;
        match self.entries.last_mut() {
            Some(last) if last.height == height => {
                last.amount += amount;
                last.cumulative = cumulative;
            }
            Some(last) => {
                debug_assert!(last.height < height);
                self.entries.push(BurnEntry {
                    height,
                    amount,
                    cumulative,
                });
            }
            None => self.entries.push(BurnEntry {
                height,
                amount,
                cumulative,
            }),
        }
        Ok(())
    }

    pub fn total(&self) -> u64 {
        self.entries
            .last()
            .map(|entry| entry.cumulative)
            .unwrap_or_default()
    }

    /// Total burned as of `height`, saturating beyond the last entry
    pub fn total_at_height(&self, height: u32) -> u64 {
        let idx = self.entries.partition_point(|entry| entry.height <= height);
        if idx == 0 {
            0
        } else {
            self.entries[idx - 1].cumulative
        }
    }

    /// Drop the burn recorded at exactly `height`, if any
    pub(crate) fn pop_at(&mut self, height: u32) {
        if let Some(last) = self.entries.last() {
            if last.height == height {
                trace!("Popping burn entry of {} at height {height}", last.amount);
                self.entries.pop();
            }
        }
    }

    /// Drop every burn recorded at or above `from`
    pub(crate) fn truncate_from(&mut self, from: u32) {
        let keep = self.entries.partition_point(|entry| entry.height < from);
        self.entries.truncate(keep);
    }
}
