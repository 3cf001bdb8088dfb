pub mod manager;
pub mod unlock;

use serde::{Deserialize, Serialize};

use crate::FOREVER_TERM;

#[derive(Debug, Hash, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct TransactionHash(pub String);

impl TransactionHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }
}

impl std::fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A term deposit as recorded by the wallet/consensus layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub amount: u64,
    pub term: u32,
    pub interest: u64,
    pub height: u32,
    pub unlock_height: u32,
    pub locked: bool,
    pub creating_tx: TransactionHash,
    pub spending_tx: Option<TransactionHash>,
}

impl Deposit {
    /// Forever deposits are one-way burns; they never unlock through
    /// normal operation
    pub fn is_forever(&self) -> bool {
        self.term == FOREVER_TERM
    }
}
