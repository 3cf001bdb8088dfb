use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{STAGE_INTERVAL_BLOCKS, STAGE_PERCENTAGES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("stage percentages must sum to 100, got {0}")]
    InvalidPercentages(u32),
    #[error("stage schedule needs at least one stage")]
    EmptySchedule,
    #[error("stage interval must be at least one block")]
    ZeroInterval,
}

/// One checkpoint of a staged release schedule. Interest is settled
/// off-chain when the deposit is created, so computed schedules carry a
/// zero `interest_amount` on every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockStage {
    pub stage_number: u32,
    pub unlock_height: u32,
    pub principal_amount: u64,
    pub interest_amount: u64,
    pub is_unlocked: bool,
    pub unlock_timestamp: i64,
}

impl UnlockStage {
    pub fn amount(&self) -> u64 {
        self.principal_amount + self.interest_amount
    }
}

/// Release policy: per-stage percentages and the block interval between
/// checkpoints. Percentages must sum to exactly 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    percentages: Vec<u8>,
    interval_blocks: u32,
}

impl StageConfig {
    pub fn new(percentages: Vec<u8>, interval_blocks: u32) -> Result<Self, StageError> {
        if percentages.is_empty() {
            return Err(StageError::EmptySchedule);
        }
        if interval_blocks == 0 {
            return Err(StageError::ZeroInterval);
        }
        let sum: u32 = percentages.iter().map(|percent| *percent as u32).sum();
        if sum != 100 {
            return Err(StageError::InvalidPercentages(sum));
        }
        Ok(Self {
            percentages,
            interval_blocks,
        })
    }

    pub fn stage_count(&self) -> usize {
        self.percentages.len()
    }

    pub fn percentages(&self) -> &[u8] {
        &self.percentages
    }

    pub fn interval_blocks(&self) -> u32 {
        self.interval_blocks
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            percentages: STAGE_PERCENTAGES.to_vec(),
            interval_blocks: STAGE_INTERVAL_BLOCKS,
        }
    }
}

/// Compute the release schedule for a deposit of `total_amount` created at
/// `deposit_height`. Deterministic: identical inputs always produce the
/// identical stage list. The final stage takes the exact remainder so the
/// stage principals always sum to `total_amount`.
pub fn compute_stages(
    total_amount: u64,
    deposit_height: u32,
    config: &StageConfig,
) -> Vec<UnlockStage> {
    let count = config.stage_count();
    let mut stages = Vec::with_capacity(count);
    let mut released = 0u64;
    for (idx, percent) in config.percentages().iter().enumerate() {
        let stage_number = idx as u32 + 1;
        let principal_amount = if idx + 1 == count {
            total_amount - released
        } else {
            (total_amount as u128 * *percent as u128 / 100) as u64
        };
        released += principal_amount;
        stages.push(UnlockStage {
            stage_number,
            unlock_height: deposit_height
                .saturating_add(stage_number.saturating_mul(config.interval_blocks())),
            principal_amount,
            interest_amount: 0,
            is_unlocked: false,
            unlock_timestamp: 0,
        });
    }
    stages
}
