use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::ledger::{DepositIndex, InvestmentIndex, LedgerResult};

/// Height change events delivered by the blockchain core. Both indexes
/// share one timeline, so every event is applied to both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockEvent {
    /// A block was appended at the tip
    Connected {
        deposits_delta: i64,
        interest_delta: u64,
        investments_delta: i64,
    },
    /// The tip block was detached
    Detached,
    /// A reorganization rewound the chain to `to_height`
    RolledBack { to_height: u32 },
}

impl BlockEvent {
    pub fn is_connected(&self) -> bool {
        matches!(self, BlockEvent::Connected { .. })
    }

    pub fn apply(
        &self,
        deposits: &mut DepositIndex,
        investments: &mut InvestmentIndex,
    ) -> LedgerResult<()> {
        match self {
            BlockEvent::Connected {
                deposits_delta,
                interest_delta,
                investments_delta,
            } => {
                deposits.push_block(*deposits_delta, *interest_delta)?;
                investments.push_block(*investments_delta)
            }
            BlockEvent::Detached => {
                deposits.pop_block()?;
                investments.pop_block()
            }
            BlockEvent::RolledBack { to_height } => {
                let deposit_heights = deposits.pop_blocks(*to_height);
                let investment_heights = investments.pop_blocks(*to_height);
                trace!(
                    "Rolled back {deposit_heights} deposit and {investment_heights} investment height(s) to {to_height}"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerError;

    fn connected(deposits: i64, interest: u64, investments: i64) -> BlockEvent {
        BlockEvent::Connected {
            deposits_delta: deposits,
            interest_delta: interest,
            investments_delta: investments,
        }
    }

    #[test]
    fn events_drive_both_indexes() {
        let mut deposits = DepositIndex::new();
        let mut investments = InvestmentIndex::new();

        for event in [
            connected(9, 1, 100),
            connected(12, 1, 0),
            connected(0, 0, -30),
        ] {
            event
                .apply(&mut deposits, &mut investments)
                .expect("event application");
        }

        assert_eq!(deposits.block_count(), 3);
        assert_eq!(investments.block_count(), 3);
        assert_eq!(deposits.full_deposit_amount(), 21);
        assert_eq!(investments.full_investment_amount(), 70);

        BlockEvent::Detached
            .apply(&mut deposits, &mut investments)
            .expect("detach");
        assert_eq!(deposits.full_deposit_amount(), 21);
        assert_eq!(investments.full_investment_amount(), 100);

        BlockEvent::RolledBack { to_height: 0 }
            .apply(&mut deposits, &mut investments)
            .expect("rollback");
        assert_eq!(deposits.block_count(), 0);
        assert_eq!(investments.block_count(), 0);
    }

    #[test]
    fn detaching_an_empty_chain_underflows() {
        let mut deposits = DepositIndex::new();
        let mut investments = InvestmentIndex::new();

        assert_eq!(
            BlockEvent::Detached.apply(&mut deposits, &mut investments),
            Err(LedgerError::Underflow)
        );
    }
}
