use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use tracing::{debug, trace, warn};

/// Durable record of each depositor's staged-unlock opt-in, keyed by the
/// creating transaction hash. Persisted as one `<hash>:<0|1>` line per
/// entry; a missing file reads as an empty store.
///
/// Safe for concurrent use from RPC handler threads and background deposit
/// processing.
#[derive(Debug)]
pub struct UnlockPreferenceStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, bool>>,
}

impl UnlockPreferenceStore {
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let store = Self {
            path: path.as_ref().into(),
            entries: Mutex::new(HashMap::new()),
        };
        store.load()?;
        Ok(store)
    }

    /// Replace the in-memory map with the file contents. Malformed lines
    /// are skipped; only the missing-file case is treated as empty.
    pub fn load(&self) -> anyhow::Result<()> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "No unlock preference file at {}, starting empty",
                    self.path.display()
                );
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let mut entries = self.entries();
        entries.clear();
        for line in contents.lines() {
            if line.is_empty() {
                continue;
            }
            match line.rsplit_once(':') {
                Some((hash, "0")) => {
                    entries.insert(hash.to_string(), false);
                }
                Some((hash, "1")) => {
                    entries.insert(hash.to_string(), true);
                }
                _ => debug!("Skipping malformed unlock preference line: {line}"),
            }
        }
        Ok(())
    }

    /// Rewrite the whole file from the in-memory map
    pub fn save(&self) -> anyhow::Result<()> {
        let mut lines: Vec<String> = self
            .entries()
            .iter()
            .map(|(hash, staged)| format!("{hash}:{}", u8::from(*staged)))
            .collect();
        lines.sort();
        let mut contents = lines.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        fs::write(&self.path, contents)?;
        Ok(())
    }

    pub fn set_preference(&self, tx_hash: &str, use_staged: bool) -> anyhow::Result<()> {
        trace!("Setting unlock preference {use_staged} for {tx_hash}");
        self.entries().insert(tx_hash.to_string(), use_staged);
        self.save()
    }

    /// Whether the depositor opted into staged unlocking; unknown hashes
    /// read as `false`
    pub fn get_preference(&self, tx_hash: &str) -> bool {
        self.lookup(tx_hash).unwrap_or(false)
    }

    /// The stored preference, `None` when no choice was ever recorded
    pub fn lookup(&self, tx_hash: &str) -> Option<bool> {
        self.entries().get(tx_hash).copied()
    }

    pub fn remove(&self, tx_hash: &str) -> anyhow::Result<()> {
        trace!("Removing unlock preference for {tx_hash}");
        self.entries().remove(tx_hash);
        self.save()
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        self.entries().clear();
        self.save()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, bool>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for UnlockPreferenceStore {
    fn drop(&mut self) {
        if let Err(e) = self.save() {
            warn!(
                "Failed to save unlock preferences to {}: {e}",
                self.path.display()
            );
        }
    }
}
