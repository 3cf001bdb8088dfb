use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::stage::{compute_stages, StageConfig, UnlockStage};

use super::Deposit;

/// The next claimable release of a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextUnlock {
    pub stage_number: u32,
    pub unlock_height: u32,
    pub amount: u64,
}

/// Per-deposit unlock lifecycle. Staged deposits release principal through
/// their stage schedule; forever deposits and explicit opt-outs keep the
/// all-or-nothing unlock at the deposit's `unlock_height`.
///
/// Stages are never re-locked: rewinding unlock state after a chain
/// reorganization is done by rebuilding this value from the deposit record,
/// whose height fields the ledger rolls back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositUnlockState {
    deposit: Deposit,
    use_staged_unlock: bool,
    stages: Vec<UnlockStage>,
    total_unlocked_amount: u64,
    remaining_locked_amount: u64,
}

impl DepositUnlockState {
    /// Build the unlock state for a deposit. `preference` is the stored
    /// opt-in consulted once at creation; absent means staged. A forever
    /// term always forces the traditional path.
    pub fn new(deposit: Deposit, config: &StageConfig, preference: Option<bool>) -> Self {
        let use_staged_unlock = !deposit.is_forever() && preference.unwrap_or(true);
        let mut stages = if use_staged_unlock {
            compute_stages(deposit.amount, deposit.height, config)
        } else {
            Vec::new()
        };
        // a spent deposit keeps no per-stage unlock times, only the
        // released flags
        if !deposit.locked {
            for stage in &mut stages {
                stage.is_unlocked = true;
            }
        }
        let mut state = Self {
            deposit,
            use_staged_unlock,
            stages,
            total_unlocked_amount: 0,
            remaining_locked_amount: 0,
        };
        state.recompute_totals();
        state
    }

    pub fn deposit(&self) -> &Deposit {
        &self.deposit
    }

    pub fn use_staged_unlock(&self) -> bool {
        self.use_staged_unlock
    }

    pub fn stages(&self) -> &[UnlockStage] {
        &self.stages
    }

    pub fn total_unlocked_amount(&self) -> u64 {
        self.total_unlocked_amount
    }

    pub fn remaining_locked_amount(&self) -> u64 {
        self.remaining_locked_amount
    }

    /// First stage that has not yet been released
    pub fn next_locked_stage(&self) -> Option<&UnlockStage> {
        self.stages.iter().find(|stage| !stage.is_unlocked)
    }

    pub fn next_unlock_info(&self) -> Option<NextUnlock> {
        if self.use_staged_unlock {
            self.next_locked_stage().map(|stage| NextUnlock {
                stage_number: stage.stage_number,
                unlock_height: stage.unlock_height,
                amount: stage.amount(),
            })
        } else if self.deposit.locked {
            Some(NextUnlock {
                stage_number: 1,
                unlock_height: self.deposit.unlock_height,
                amount: self.deposit.amount + self.deposit.interest,
            })
        } else {
            None
        }
    }

    pub fn can_unlock(&self, current_height: u32) -> bool {
        if self.use_staged_unlock {
            self.next_locked_stage()
                .map(|stage| current_height >= stage.unlock_height)
                .unwrap_or(false)
        } else {
            self.deposit.locked && current_height >= self.deposit.unlock_height
        }
    }

    /// Amount claimable right now: the single next eligible stage for
    /// staged deposits, the full remaining value for traditional ones
    pub fn unlockable_amount(&self, current_height: u32) -> u64 {
        if self.use_staged_unlock {
            match self.next_locked_stage() {
                Some(stage) if current_height >= stage.unlock_height => stage.amount(),
                _ => 0,
            }
        } else if self.can_unlock(current_height) {
            self.deposit.amount + self.deposit.interest
        } else {
            0
        }
    }

    /// Release everything eligible at `current_height` and return the
    /// newly released stages. Idempotent: stages already released are
    /// skipped, and a lower height on a later call is a no-op.
    pub fn process_unlock(&mut self, current_height: u32) -> Vec<UnlockStage> {
        trace!(
            "Processing unlock for deposit {} at height {current_height}",
            self.deposit.creating_tx
        );
        if self.use_staged_unlock {
            let mut newly_unlocked = Vec::new();
            let now = Utc::now().timestamp();
            for stage in &mut self.stages {
                if !stage.is_unlocked && stage.unlock_height <= current_height {
                    stage.is_unlocked = true;
                    stage.unlock_timestamp = now;
                    newly_unlocked.push(stage.clone());
                }
            }
            if !newly_unlocked.is_empty() {
                self.recompute_totals();
                if self.stages.iter().all(|stage| stage.is_unlocked) {
                    debug!("Deposit {} fully unlocked", self.deposit.creating_tx);
                    self.deposit.locked = false;
                }
            }
            newly_unlocked
        } else if self.deposit.locked && current_height >= self.deposit.unlock_height {
            debug!("Deposit {} unlocked in full", self.deposit.creating_tx);
            self.deposit.locked = false;
            self.recompute_totals();
            vec![UnlockStage {
                stage_number: 1,
                unlock_height: self.deposit.unlock_height,
                principal_amount: self.deposit.amount,
                interest_amount: self.deposit.interest,
                is_unlocked: true,
                unlock_timestamp: Utc::now().timestamp(),
            }]
        } else {
            Vec::new()
        }
    }

    pub fn is_fully_unlocked(&self) -> bool {
        if self.use_staged_unlock {
            self.stages.iter().all(|stage| stage.is_unlocked)
        } else {
            !self.deposit.locked
        }
    }

    // total_unlocked_amount + remaining_locked_amount always equals the
    // on-chain value: the principal for staged deposits (interest settles
    // off-chain at creation), principal + interest for traditional ones
    fn recompute_totals(&mut self) {
        if self.use_staged_unlock {
            let mut unlocked = 0u64;
            let mut locked = 0u64;
            for stage in &self.stages {
                if stage.is_unlocked {
                    unlocked += stage.amount();
                } else {
                    locked += stage.amount();
                }
            }
            self.total_unlocked_amount = unlocked;
            self.remaining_locked_amount = locked;
        } else if self.deposit.locked {
            self.total_unlocked_amount = 0;
            self.remaining_locked_amount = self.deposit.amount + self.deposit.interest;
        } else {
            self.total_unlocked_amount = self.deposit.amount + self.deposit.interest;
            self.remaining_locked_amount = 0;
        }
    }
}
