pub mod burn;
pub mod store;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use self::burn::BurnChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LedgerError {
    #[error("cumulative total overflows at height {0}")]
    Overflow(u32),
    #[error("cannot pop a block from an empty index")]
    Underflow,
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Running totals carried by a materialized index entry. The per-height
/// delta has the same shape as the totals.
pub trait CumulativePayload: Copy + Default {
    /// Zero-amount deltas are not materialized
    fn is_zero_delta(&self) -> bool;

    /// Accumulate `delta` into the running totals, `None` on overflow
    fn checked_accumulate(&self, delta: &Self) -> Option<Self>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositTotals {
    pub amount: i64,
    pub interest: u64,
}

impl CumulativePayload for DepositTotals {
    fn is_zero_delta(&self) -> bool {
        self.amount == 0
    }

    fn checked_accumulate(&self, delta: &Self) -> Option<Self> {
        Some(Self {
            amount: self.amount.checked_add(delta.amount)?,
            interest: self.interest.checked_add(delta.interest)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentTotal {
    pub amount: i64,
}

impl CumulativePayload for InvestmentTotal {
    fn is_zero_delta(&self) -> bool {
        self.amount == 0
    }

    fn checked_accumulate(&self, delta: &Self) -> Option<Self> {
        Some(Self {
            amount: self.amount.checked_add(delta.amount)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry<P> {
    pub height: u32,
    pub totals: P,
}

/// Sparse height-indexed log of running totals. Heights with a zero delta
/// are counted but never materialized, so consecutive entries may skip
/// heights; `block_count` is the authoritative height counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CumulativeIndex<P: CumulativePayload> {
    entries: Vec<IndexEntry<P>>,
    block_count: u32,
}

impl<P: CumulativePayload> CumulativeIndex<P> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            block_count: 0,
        }
    }

    /// Number of heights pushed so far, materialized or not
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Record one height's contribution at the current tip
    pub fn push_block(&mut self, delta: P) -> LedgerResult<()> {
        let height = self.block_count;
        if !delta.is_zero_delta() {
            let previous = self.full_totals();
            let totals = previous
                .checked_accumulate(&delta)
                .ok_or(LedgerError::Overflow(height))?;
            self.entries.push(IndexEntry { height, totals });
        }
        self.block_count += 1;
        Ok(())
    }

    /// Remove the most recent height
    pub fn pop_block(&mut self) -> LedgerResult<()> {
        if self.block_count == 0 {
            return Err(LedgerError::Underflow);
        }
        self.block_count -= 1;
        if let Some(last) = self.entries.last() {
            if last.height == self.block_count {
                self.entries.pop();
            }
        }
        Ok(())
    }

    /// Roll back every height at or above `from`, returning the number of
    /// heights removed
    pub fn pop_blocks(&mut self, from: u32) -> u32 {
        if from >= self.block_count {
            return 0;
        }
        let removed = self.block_count - from;
        trace!("Rolling back {removed} height(s) to height {from}");
        let keep = self.entries.partition_point(|entry| entry.height < from);
        self.entries.truncate(keep);
        self.block_count = from;
        removed
    }

    /// Totals as of `height`. Heights beyond the last materialized entry
    /// saturate to the final totals; heights before the first entry read
    /// as zero.
    pub fn totals_at_height(&self, height: u32) -> P {
        let idx = self.entries.partition_point(|entry| entry.height <= height);
        if idx == 0 {
            P::default()
        } else {
            self.entries[idx - 1].totals
        }
    }

    /// Totals as of the current tip
    pub fn full_totals(&self) -> P {
        self.entries
            .last()
            .map(|entry| entry.totals)
            .unwrap_or_default()
    }
}

/// Height-indexed totals for term deposits, with the permanently burned
/// side channel kept on the same timeline so rollbacks stay consistent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepositIndex {
    index: CumulativeIndex<DepositTotals>,
    burns: BurnChannel,
}

impl DepositIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_count(&self) -> u32 {
        self.index.block_count()
    }

    pub fn push_block(&mut self, amount: i64, interest: u64) -> LedgerResult<()> {
        trace!(
            "Pushing block at height {} with amount {amount} and interest {interest}",
            self.index.block_count()
        );
        self.index.push_block(DepositTotals { amount, interest })
    }

    pub fn pop_block(&mut self) -> LedgerResult<()> {
        self.index.pop_block()?;
        self.burns.pop_at(self.index.block_count());
        Ok(())
    }

    pub fn pop_blocks(&mut self, from: u32) -> u32 {
        let removed = self.index.pop_blocks(from);
        self.burns.truncate_from(from);
        removed
    }

    pub fn deposit_amount_at_height(&self, height: u32) -> i64 {
        self.index.totals_at_height(height).amount
    }

    pub fn deposit_interest_at_height(&self, height: u32) -> u64 {
        self.index.totals_at_height(height).interest
    }

    pub fn full_deposit_amount(&self) -> i64 {
        self.index.full_totals().amount
    }

    pub fn full_interest_amount(&self) -> u64 {
        self.index.full_totals().interest
    }

    /// Record an irreversible burn at `height`. Burns only touch the side
    /// channel; the ordinary deposit totals are unaffected.
    pub fn add_forever_deposit(&mut self, amount: u64, height: u32) -> LedgerResult<()> {
        trace!("Adding forever deposit of {amount} at height {height}");
        self.burns.add(amount, height)
    }

    pub fn burned_amount(&self) -> u64 {
        self.burns.total()
    }

    pub fn burned_amount_at_height(&self, height: u32) -> u64 {
        self.burns.total_at_height(height)
    }
}

/// Height-indexed total of investment principal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestmentIndex {
    index: CumulativeIndex<InvestmentTotal>,
}

impl InvestmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_count(&self) -> u32 {
        self.index.block_count()
    }

    pub fn push_block(&mut self, amount: i64) -> LedgerResult<()> {
        trace!(
            "Pushing investment block at height {} with amount {amount}",
            self.index.block_count()
        );
        self.index.push_block(InvestmentTotal { amount })
    }

    pub fn pop_block(&mut self) -> LedgerResult<()> {
        self.index.pop_block()
    }

    pub fn pop_blocks(&mut self, from: u32) -> u32 {
        self.index.pop_blocks(from)
    }

    pub fn investment_amount_at_height(&self, height: u32) -> i64 {
        self.index.totals_at_height(height).amount
    }

    pub fn full_investment_amount(&self) -> i64 {
        self.index.full_totals().amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cumulative_totals_across_heights() {
        let mut index = DepositIndex::new();
        index.push_block(9, 1).expect("push at height 0");
        index.push_block(12, 1).expect("push at height 1");

        assert_eq!(index.full_deposit_amount(), 21);
        assert_eq!(index.full_interest_amount(), 2);
        assert_eq!(index.deposit_amount_at_height(0), 9);
        assert_eq!(index.deposit_amount_at_height(5), 21);
    }

    #[test]
    fn zero_amount_heights_are_counted_but_not_materialized() {
        let mut index = DepositIndex::new();
        index.push_block(7, 0).expect("push at height 0");
        index.push_block(0, 3).expect("push at height 1");
        index.push_block(5, 1).expect("push at height 2");

        assert_eq!(index.block_count(), 3);
        assert_eq!(index.deposit_amount_at_height(1), 7);
        assert_eq!(index.deposit_amount_at_height(2), 12);

        // popping the zero height only decrements the counter
        index.pop_block().expect("pop height 2");
        index.pop_block().expect("pop height 1");
        assert_eq!(index.block_count(), 1);
        assert_eq!(index.full_deposit_amount(), 7);
    }

    #[test]
    fn push_pop_is_symmetric() {
        let mut index = DepositIndex::new();
        index.push_block(100, 10).expect("push at height 0");
        let before = index.clone();

        index.push_block(-40, 4).expect("push at height 1");
        index.pop_block().expect("pop height 1");

        assert_eq!(index, before);
        assert_eq!(index.block_count(), 1);
        assert_eq!(index.full_deposit_amount(), 100);
        assert_eq!(index.full_interest_amount(), 10);
    }

    #[test]
    fn pop_empty_index_underflows() {
        let mut index = DepositIndex::new();
        assert_eq!(index.pop_block(), Err(LedgerError::Underflow));
    }

    #[test]
    fn cumulative_overflow_is_rejected() {
        let mut index = DepositIndex::new();
        index.push_block(i64::MAX, 0).expect("push at height 0");
        assert_eq!(index.push_block(1, 0), Err(LedgerError::Overflow(1)));

        let mut index = DepositIndex::new();
        index.push_block(1, u64::MAX).expect("push at height 0");
        assert_eq!(index.push_block(1, 1), Err(LedgerError::Overflow(1)));

        // a rejected push must not advance the height counter
        assert_eq!(index.block_count(), 1);
    }

    #[test]
    fn pop_blocks_reports_removed_heights() {
        let mut index = DepositIndex::new();
        for amount in [5, 0, 3, 0, 2] {
            index.push_block(amount, 0).expect("push");
        }

        assert_eq!(index.pop_blocks(7), 0);
        assert_eq!(index.pop_blocks(2), 3);
        assert_eq!(index.block_count(), 2);
        assert_eq!(index.full_deposit_amount(), 5);
        assert_eq!(index.pop_blocks(0), 2);
        assert_eq!(index.full_deposit_amount(), 0);
    }

    #[test]
    fn negative_deltas_reduce_totals() {
        let mut index = DepositIndex::new();
        index.push_block(50, 5).expect("push at height 0");
        index.push_block(-20, 0).expect("push at height 1");

        assert_eq!(index.full_deposit_amount(), 30);
        assert_eq!(index.deposit_amount_at_height(0), 50);
    }

    #[test]
    fn burns_roll_back_with_the_main_index() {
        let mut index = DepositIndex::new();
        index.push_block(10, 1).expect("push at height 0");
        index.push_block(0, 0).expect("push at height 1");
        index
            .add_forever_deposit(8_000_000_000, 1)
            .expect("burn at height 1");

        assert_eq!(index.burned_amount(), 8_000_000_000);
        index.pop_block().expect("pop height 1");
        assert_eq!(index.burned_amount(), 0);
        assert_eq!(index.full_deposit_amount(), 10);
    }

    #[test]
    fn bulk_rollback_truncates_burns() {
        let mut index = DepositIndex::new();
        for height in 0..5 {
            index.push_block(1, 0).expect("push");
            index
                .add_forever_deposit(100, height)
                .expect("burn per height");
        }

        assert_eq!(index.burned_amount(), 500);
        assert_eq!(index.pop_blocks(2), 3);
        assert_eq!(index.burned_amount(), 200);
        assert_eq!(index.burned_amount_at_height(10), 200);
    }

    #[test]
    fn investment_index_tracks_amount_only() {
        let mut index = InvestmentIndex::new();
        index.push_block(1_000).expect("push at height 0");
        index.push_block(0).expect("push at height 1");
        index.push_block(-250).expect("push at height 2");

        assert_eq!(index.block_count(), 3);
        assert_eq!(index.full_investment_amount(), 750);
        assert_eq!(index.investment_amount_at_height(1), 1_000);
    }
}
