//! Embedded key-value storage abstraction.
//!
//! The coordinator needs two ordered byte→bytes maps (`tokens`,
//! `swaps`) supporting get/put/scan. We keep a small trait in front of
//! the concrete engine, mirroring the teacher SDK's habit of putting a
//! typed trait in front of whatever actually persists the bytes
//! (`WalletStorage`/`SwapStorage` there; `KvTree` here), so the
//! coordinator in `src/coordinator.rs` never names `sled` directly.

use crate::error::Result;
use std::path::Path;
use std::sync::Arc;

/// An ordered byte-keyed map backing one logical store (`tokens` or `swaps`).
pub trait KvTree: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
    /// All entries, in key order. Used only by `/get_swap_list`, which
    /// is a full scan by specification.
    fn scan_all(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// `sled`-backed [`KvTree`].
#[derive(Clone)]
pub struct SledTree(sled::Tree);

impl SledTree {
    pub fn new(tree: sled::Tree) -> Self {
        Self(tree)
    }
}

impl KvTree for SledTree {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.0.get(key)?.map(|v| v.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.0.insert(key, value)?;
        Ok(())
    }

    fn scan_all(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.0
            .iter()
            .map(|entry| {
                let (k, v) = entry?;
                Ok((k.to_vec(), v.to_vec()))
            })
            .collect()
    }
}

/// The two process-wide stores, opened once at startup and shared by
/// every request (§5: "process-wide singletons opened at startup with
/// `create_if_missing`").
#[derive(Clone)]
pub struct Stores {
    pub tokens: Arc<dyn KvTree>,
    pub swaps: Arc<dyn KvTree>,
}

impl Stores {
    /// Open (creating if missing) the `tokens` and `swaps` trees under
    /// `base_path`.
    pub fn open(base_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(base_path)
            .map_err(|e| crate::error::Error::Storage(e.to_string()))?;
        let db = sled::open(base_path.join("db"))?;
        let tokens = db.open_tree("tokens")?;
        let swaps = db.open_tree("swaps")?;
        Ok(Self {
            tokens: Arc::new(SledTree::new(tokens)),
            swaps: Arc::new(SledTree::new(swaps)),
        })
    }

    /// Stores backed by a fresh temporary directory, for tests.
    pub fn open_temp() -> (Self, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let stores = Self::open(dir.path()).expect("open temp stores");
        (stores, dir)
    }
}
