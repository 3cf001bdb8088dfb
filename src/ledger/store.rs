use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::trace;

use super::{DepositIndex, InvestmentIndex};

/// Store of height-indexed ledger snapshots
pub trait LedgerStore {
    /// Persist the deposit index at its current tip
    fn add_deposit_index(&self, index: &DepositIndex) -> anyhow::Result<()>;

    /// Get the persisted deposit index, if one was ever written
    fn get_deposit_index(&self) -> anyhow::Result<Option<DepositIndex>>;

    /// Persist the investment index at its current tip
    fn add_investment_index(&self, index: &InvestmentIndex) -> anyhow::Result<()>;

    /// Get the persisted investment index, if one was ever written
    fn get_investment_index(&self) -> anyhow::Result<Option<InvestmentIndex>>;
}

/// File-backed [`LedgerStore`] writing one JSON snapshot per index
#[derive(Debug)]
pub struct JsonLedgerStore {
    pub store_dir: PathBuf,
}

const DEPOSIT_INDEX_FILE: &str = "deposit_index.json";
const INVESTMENT_INDEX_FILE: &str = "investment_index.json";

impl JsonLedgerStore {
    pub fn new(store_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        fs::create_dir_all(&store_dir)?;
        Ok(Self {
            store_dir: store_dir.as_ref().into(),
        })
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(value)?;
        fs::write(self.store_dir.join(file), bytes)?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, file: &str) -> anyhow::Result<Option<T>> {
        match fs::read(self.store_dir.join(file)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl LedgerStore for JsonLedgerStore {
    fn add_deposit_index(&self, index: &DepositIndex) -> anyhow::Result<()> {
        trace!(
            "Adding deposit index snapshot at height {}",
            index.block_count()
        );
        self.write_json(DEPOSIT_INDEX_FILE, index)
    }

    fn get_deposit_index(&self) -> anyhow::Result<Option<DepositIndex>> {
        trace!("Getting deposit index snapshot");
        self.read_json(DEPOSIT_INDEX_FILE)
    }

    fn add_investment_index(&self, index: &InvestmentIndex) -> anyhow::Result<()> {
        trace!(
            "Adding investment index snapshot at height {}",
            index.block_count()
        );
        self.write_json(INVESTMENT_INDEX_FILE, index)
    }

    fn get_investment_index(&self) -> anyhow::Result<Option<InvestmentIndex>> {
        trace!("Getting investment index snapshot");
        self.read_json(INVESTMENT_INDEX_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_round_trip() {
        let dir = tempfile::tempdir().expect("temp store dir");
        let store = JsonLedgerStore::new(dir.path()).expect("store creation");

        assert!(store.get_deposit_index().expect("empty read").is_none());

        let mut index = DepositIndex::new();
        index.push_block(42, 7).expect("push at height 0");
        index.push_block(0, 0).expect("push at height 1");
        index.push_block(-12, 1).expect("push at height 2");
        index.add_forever_deposit(999, 2).expect("burn at height 2");

        store.add_deposit_index(&index).expect("snapshot write");
        let restored = store
            .get_deposit_index()
            .expect("snapshot read")
            .expect("snapshot present");

        assert_eq!(restored, index);
        assert_eq!(restored.block_count(), 3);
        assert_eq!(restored.burned_amount(), 999);
    }
}
