//! Exported-subtree trie (spec §4.6).
//!
//! Mirrors the directory tree rooted at the SS's configured mount
//! directory. Grounded on `Storage Server/Trie.c`; as in `dfs-ns`, the
//! djb2-mod-`MAX_SUB_FILES` hash array is replaced with a
//! `HashMap<String, Node>` per REDESIGN FLAGS §9.

use std::collections::HashMap;
use std::sync::Arc;

use crate::rwlock::FairRwLock;

pub struct Node {
    pub is_dir: bool,
    pub lock: Arc<FairRwLock>,
    children: HashMap<String, Node>,
}

impl Node {
    fn new(is_dir: bool) -> Self {
        Self { is_dir, lock: Arc::new(FairRwLock::new()), children: HashMap::new() }
    }
}

fn tokenize(path: &str) -> Vec<&str> {
    path.split('/').filter(|t| !t.is_empty()).collect()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SsTrieError {
    NotFound,
    AlreadyExists,
}

/// The SS's view of its own exported files and directories.
pub struct SsTrie {
    root: Node,
}

impl SsTrie {
    pub fn new() -> Self {
        Self { root: Node::new(true) }
    }

    /// Inserts `path` (slash-separated, relative to the mount root).
    pub fn insert(&mut self, path: &str, is_dir: bool) {
        let tokens = tokenize(path);
        let mut node = &mut self.root;
        for (i, token) in tokens.iter().enumerate() {
            let last = i == tokens.len() - 1;
            node = node
                .children
                .entry(token.to_string())
                .or_insert_with(|| Node::new(if last { is_dir } else { true }));
        }
    }

    /// Returns whether `path` exists in the trie (spec's `trie_search`).
    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Returns the terminal node's lock, descending hand-over-hand
    /// (spec §4.6's traversal discipline is honored by callers: they
    /// hold no lock across this call, taking the returned node's own
    /// lock afterward).
    pub fn lookup(&self, path: &str) -> Option<&Node> {
        let mut node = &self.root;
        for token in tokenize(path) {
            node = node.children.get(token)?;
        }
        Some(node)
    }

    /// Renames the terminal node named by the last token of `old_path`
    /// to `new_name`, within the same parent. Fails if the source is
    /// absent or the target name is already occupied in that parent.
    pub fn rename(&mut self, old_path: &str, new_name: &str) -> Result<(), SsTrieError> {
        let tokens = tokenize(old_path);
        let Some((&last, parents)) = tokens.split_last() else {
            return Err(SsTrieError::NotFound);
        };
        let mut node = &mut self.root;
        for token in parents {
            node = node.children.get_mut(*token).ok_or(SsTrieError::NotFound)?;
        }
        if node.children.contains_key(new_name) {
            return Err(SsTrieError::AlreadyExists);
        }
        let moved = node.children.remove(last).ok_or(SsTrieError::NotFound)?;
        node.children.insert(new_name.to_string(), moved);
        Ok(())
    }

    /// Flattens every file/directory path in the trie into the
    /// `\n`-joined list sent as `STORAGE_SERVER_INIT.mount_paths`.
    pub fn flattened_paths(&self) -> String {
        let mut out = String::new();
        flatten(&self.root, String::new(), &mut out);
        out
    }
}

fn flatten(node: &Node, prefix: String, out: &mut String) {
    for (name, child) in &node.children {
        let path = if prefix.is_empty() { name.clone() } else { format!("{prefix}/{name}") };
        out.push_str(&path);
        out.push('\n');
        flatten(child, path, out);
    }
}

impl Default for SsTrie {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_lookup_round_trips() {
        let mut trie = SsTrie::new();
        trie.insert("a/f1", false);
        assert!(trie.contains("a/f1"));
        assert!(trie.contains("a"));
        assert!(!trie.contains("a/f2"));
    }

    #[test]
    fn rename_moves_within_same_parent() {
        let mut trie = SsTrie::new();
        trie.insert("a/f1", false);
        trie.rename("a/f1", "f2").unwrap();
        assert!(!trie.contains("a/f1"));
        assert!(trie.contains("a/f2"));
    }

    #[test]
    fn rename_onto_existing_name_fails() {
        let mut trie = SsTrie::new();
        trie.insert("a/f1", false);
        trie.insert("a/f2", false);
        assert_eq!(trie.rename("a/f1", "f2"), Err(SsTrieError::AlreadyExists));
    }

    #[test]
    fn rename_missing_source_fails() {
        let mut trie = SsTrie::new();
        assert_eq!(trie.rename("a/nope", "x"), Err(SsTrieError::NotFound));
    }

    #[test]
    fn flattened_paths_lists_every_node() {
        let mut trie = SsTrie::new();
        trie.insert("a/f1", false);
        trie.insert("b/g1", false);
        let mut paths: Vec<&str> = trie.flattened_paths().lines().collect();
        paths.sort();
        assert_eq!(paths, vec!["a", "a/f1", "b", "b/g1"]);
    }
}
