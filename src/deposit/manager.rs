use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{preference::UnlockPreferenceStore, stage::StageConfig};

use super::{unlock::DepositUnlockState, Deposit, TransactionHash};

/// Batch-processes deposits against the chain height, caching one unlock
/// state per deposit keyed by its creating transaction.
pub struct UnlockManager {
    config: StageConfig,
    preferences: UnlockPreferenceStore,
    states: HashMap<TransactionHash, DepositUnlockState>,
}

impl UnlockManager {
    pub fn new(config: StageConfig, preferences: UnlockPreferenceStore) -> Self {
        Self {
            config,
            preferences,
            states: HashMap::new(),
        }
    }

    pub fn preferences(&self) -> &UnlockPreferenceStore {
        &self.preferences
    }

    pub fn unlock_state(&self, creating_tx: &TransactionHash) -> Option<&DepositUnlockState> {
        self.states.get(creating_tx)
    }

    /// Release everything eligible at `current_height` across `deposits`
    /// and return the creating transactions of deposits that had at least
    /// one newly released stage this call.
    pub fn process_all_unlocks(
        &mut self,
        current_height: u32,
        deposits: &[Deposit],
    ) -> Vec<TransactionHash> {
        debug!(
            "Processing unlocks for {} deposit(s) at height {current_height}",
            deposits.len()
        );
        let mut unlocked = Vec::new();
        for deposit in deposits {
            let newly = self.ensure_state(deposit).process_unlock(current_height);
            if !newly.is_empty() {
                debug!(
                    "Deposit {} released {} stage(s) at height {current_height}",
                    deposit.creating_tx,
                    newly.len()
                );
                unlocked.push(deposit.creating_tx.clone());
            }
        }
        unlocked
    }

    /// Human-readable unlock progress for display surfaces
    pub fn unlock_status(&mut self, deposit: &Deposit, current_height: u32) -> String {
        let state = self.ensure_state(deposit);
        if state.is_fully_unlocked() {
            return "Fully Unlocked".to_string();
        }
        if state.use_staged_unlock() {
            match state.next_locked_stage() {
                Some(stage) if current_height >= stage.unlock_height => {
                    format!("Stage {} Ready", stage.stage_number)
                }
                Some(stage) => format!(
                    "Stage {} in {} blocks",
                    stage.stage_number,
                    stage.unlock_height - current_height
                ),
                None => "Fully Unlocked".to_string(),
            }
        } else if current_height >= state.deposit().unlock_height {
            "Ready to Unlock".to_string()
        } else {
            format!(
                "Unlocks in {} blocks",
                state.deposit().unlock_height - current_height
            )
        }
    }

    /// Look up or build the unlock state for `deposit`, consulting the
    /// stored preference only on first sight
    fn ensure_state(&mut self, deposit: &Deposit) -> &mut DepositUnlockState {
        if !self.states.contains_key(&deposit.creating_tx) {
            let preference = self.preferences.lookup(&deposit.creating_tx.0);
            trace!(
                "Building unlock state for deposit {} (preference: {preference:?})",
                deposit.creating_tx
            );
            self.states.insert(
                deposit.creating_tx.clone(),
                DepositUnlockState::new(deposit.clone(), &self.config, preference),
            );
        }
        self.states
            .get_mut(&deposit.creating_tx)
            .expect("unlock state exists after insertion")
    }
}
