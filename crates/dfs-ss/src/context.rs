//! Per-process shared state for a Storage Server.

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use dfs_proto::config::SsConfig;

use crate::trie::SsTrie;

pub struct SsContext {
    pub config: SsConfig,
    pub root: PathBuf,
    pub trie: Mutex<SsTrie>,
    /// Filled in once the NS replies to `STORAGE_SERVER_INIT` with the
    /// assigned id; used only to decorate forwarded-rename responses.
    server_id: AtomicU64,
}

impl SsContext {
    pub fn new(config: SsConfig, root: PathBuf, trie: SsTrie) -> Self {
        Self { config, root, trie: Mutex::new(trie), server_id: AtomicU64::new(0) }
    }

    pub fn set_server_id(&self, id: u64) {
        self.server_id.store(id, Ordering::SeqCst);
    }

    pub fn server_id(&self) -> u64 {
        self.server_id.load(Ordering::SeqCst)
    }
}
