//! Authoritative mount namespace trie (spec §4.1).
//!
//! Grounded on `Naming Sever/Trie.c` in `original_source/`, but per
//! REDESIGN FLAGS §9 the fixed-size `MAX_CHILDREN`-slot hash array
//! (djb2-indexed, silently overwriting on collision) is replaced with
//! a `HashMap<String, Node>` keyed by the token itself — observably
//! identical on every non-colliding insert, and collision-free by
//! construction.

use std::collections::HashMap;
use std::sync::Arc;

use crate::handle::ServerHandle;

struct Node {
    server_ref: Option<Arc<ServerHandle>>,
    children: HashMap<String, Node>,
}

impl Node {
    fn new() -> Self {
        Self { server_ref: None, children: HashMap::new() }
    }
}

/// Splits a path on `/` into its meaningful tokens.
///
/// Spec §3 describes the first token of a raw path as a "declared
/// mount root" to be dropped on both insert and lookup. In this
/// implementation that token never reaches the trie in the first
/// place: `dfs_ss::scan` already emits paths relative to the storage
/// server's export root (no synthetic leading segment), and every
/// client-facing path is absolute (`"/a/f1"`), whose only leading
/// token is the empty string produced by the leading `/` — already
/// dropped by the `filter` below. So the drop is satisfied structurally
/// rather than by an extra `skip`.
fn tokenize(path: &str) -> Vec<&str> {
    path.split('/').filter(|t| !t.is_empty()).collect()
}

/// Errors a trie operation can return (spec §4.1 "never panics").
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrieError {
    NotFound,
}

/// The NS path trie. Callers are responsible for holding `MountTrieLock`
/// around mutation/read (spec §5 — the one bug the spec explicitly asks
/// a reimplementation to fix); see `NsTrie` in `mod.rs` for the guarded
/// wrapper used everywhere else in this crate.
pub struct PathTrie {
    root: Node,
}

impl PathTrie {
    pub fn new() -> Self {
        Self { root: Node::new() }
    }

    /// Splits `path` on `/`, walks/creates nodes under root, and
    /// assigns `server_ref` to the terminal node. Idempotent for an
    /// already-existing terminal (re-assigns the server reference).
    pub fn insert(&mut self, path: &str, server_ref: Arc<ServerHandle>) {
        let mut node = &mut self.root;
        for token in tokenize(path) {
            node = node.children.entry(token.to_string()).or_insert_with(Node::new);
        }
        node.server_ref = Some(server_ref);
    }

    /// Walks tokens; returns the terminal's server_ref, or `None` if
    /// any hop is missing. Does not bubble up to an ancestor.
    pub fn resolve(&self, path: &str) -> Option<Arc<ServerHandle>> {
        let mut node = &self.root;
        for token in tokenize(path) {
            node = node.children.get(token)?;
        }
        node.server_ref.clone()
    }

    /// Detaches the entire subtree rooted at `path`; fails if absent.
    pub fn delete(&mut self, path: &str) -> Result<(), TrieError> {
        let tokens = tokenize(path);
        if tokens.is_empty() {
            return Err(TrieError::NotFound);
        }
        let mut node = &mut self.root;
        for token in &tokens[..tokens.len() - 1] {
            node = node.children.get_mut(*token).ok_or(TrieError::NotFound)?;
        }
        node.children.remove(tokens[tokens.len() - 1]).map(|_| ()).ok_or(TrieError::NotFound)
    }

    /// Moves the subtree rooted at `old_path` to `new_name` within the
    /// same parent, preserving every descendant's `server_ref`
    /// unchanged — mirrors `dfs_ss::trie::SsTrie::rename`, used here so
    /// the NS namespace stays in sync once a forwarded RENAME completes
    /// (REDESIGN FLAGS §9: rename propagation must invalidate/relocate
    /// the stale entry rather than leave it dangling). Fails if the
    /// source is absent or the target name is already occupied.
    pub fn rename(&mut self, old_path: &str, new_name: &str) -> Result<(), TrieError> {
        let tokens = tokenize(old_path);
        let Some((&last, parents)) = tokens.split_last() else {
            return Err(TrieError::NotFound);
        };
        let mut node = &mut self.root;
        for token in parents {
            node = node.children.get_mut(*token).ok_or(TrieError::NotFound)?;
        }
        if node.children.contains_key(new_name) {
            return Err(TrieError::NotFound);
        }
        let moved = node.children.remove(last).ok_or(TrieError::NotFound)?;
        node.children.insert(new_name.to_string(), moved);
        Ok(())
    }

    /// Produces a human-readable indented tree of the subtree rooted
    /// at `path`, using `|-` as branch marker per level (spec §4.1,
    /// scenario S1). The root itself is always printed as `Mount`.
    pub fn subtree_dump(&self, path: &str) -> Result<String, TrieError> {
        let tokens = tokenize(path);
        let mut node = &self.root;
        for token in &tokens {
            node = node.children.get(*token).ok_or(TrieError::NotFound)?;
        }

        let label = tokens.last().copied().unwrap_or("Mount");
        let mut out = String::new();
        out.push_str("|-");
        out.push_str(label);
        out.push('\n');
        dump_node(node, 1, &mut out);
        Ok(out)
    }
}

fn dump_node(node: &Node, depth: usize, out: &mut String) {
    let mut names: Vec<&String> = node.children.keys().collect();
    names.sort();
    for name in names {
        let child = &node.children[name];
        for _ in 0..=depth {
            out.push_str("|-");
        }
        out.push_str(name);
        out.push('\n');
        dump_node(child, depth + 1, out);
    }
}

impl Default for PathTrie {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn handle(id: u64) -> Arc<ServerHandle> {
        ServerHandle::new(id, Ipv4Addr::new(127, 0, 0, 1), 9000, 9001, 9002)
    }

    #[test]
    fn insert_then_resolve_round_trips() {
        let mut trie = PathTrie::new();
        let h = handle(1);
        trie.insert("/a/f1", h.clone());
        assert_eq!(trie.resolve("/a/f1").unwrap().server_id, h.server_id);
    }

    #[test]
    fn resolve_missing_prefix_returns_none() {
        let mut trie = PathTrie::new();
        trie.insert("/a/f1", handle(1));
        assert!(trie.resolve("/x").is_none());
        assert!(trie.resolve("/a/f1/extra").is_none());
    }

    #[test]
    fn delete_removes_subtree() {
        let mut trie = PathTrie::new();
        trie.insert("/a/f1", handle(1));
        trie.delete("/a").unwrap();
        assert!(trie.resolve("/a/f1").is_none());
        assert!(trie.resolve("/a").is_none());
    }

    #[test]
    fn delete_missing_path_errors() {
        let mut trie = PathTrie::new();
        assert_eq!(trie.delete("/nope"), Err(TrieError::NotFound));
    }

    #[test]
    fn insert_is_consistent_for_ss_relative_and_client_absolute_forms() {
        // dfs_ss::scan emits "a/f1" (no leading slash); clients send
        // "/a/f1" (absolute). Both must tokenize identically.
        let mut trie = PathTrie::new();
        let h = handle(1);
        trie.insert("a/f1", h.clone());
        assert_eq!(trie.resolve("/a/f1").unwrap().server_id, h.server_id);
    }

    #[test]
    fn subtree_dump_matches_scenario_s1() {
        let mut trie = PathTrie::new();
        trie.insert("a/f1", handle(1));
        trie.insert("a/f2", handle(1));
        trie.insert("b/g1", handle(1));
        let dump = trie.subtree_dump("/").unwrap();
        assert!(dump.starts_with("|-Mount\n|-|-a\n|-|-|-f1\n"));
    }

    #[test]
    fn rename_relocates_under_same_parent_and_keeps_handle() {
        let mut trie = PathTrie::new();
        let h = handle(1);
        trie.insert("/a/f1", h.clone());
        trie.rename("/a/f1", "f1new").unwrap();
        assert!(trie.resolve("/a/f1").is_none());
        assert_eq!(trie.resolve("/a/f1new").unwrap().server_id, h.server_id);
    }

    #[test]
    fn rename_onto_existing_name_fails() {
        let mut trie = PathTrie::new();
        trie.insert("/a/f1", handle(1));
        trie.insert("/a/f2", handle(1));
        assert_eq!(trie.rename("/a/f1", "f2"), Err(TrieError::NotFound));
    }
}
