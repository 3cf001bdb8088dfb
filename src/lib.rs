pub mod deposit;
pub mod event;
pub mod ledger;
pub mod preference;
pub mod stage;

pub const TARGET_BLOCK_TIME_SECS: u64 = 480;
pub const STAGE_INTERVAL_DAYS: u64 = 18;
pub const STAGE_INTERVAL_BLOCKS: u32 =
    (STAGE_INTERVAL_DAYS * 24 * 60 * 60 / TARGET_BLOCK_TIME_SECS) as u32;
pub const TOTAL_STAGES: usize = 5;
pub const STAGE_PERCENTAGES: [u8; TOTAL_STAGES] = [20, 20, 20, 20, 20];
pub const FOREVER_TERM: u32 = u32::MAX;
