//! Startup directory scan (spec §4.6).
//!
//! Grounded on `Storage Server/SS.c`'s `RecursiveScan`. `std::fs::read_dir`
//! never yields `.`/`..` entries itself, so the "ignoring `.` and `..`"
//! rule from the spec is satisfied by construction rather than an
//! explicit filter.

use std::path::{Path, PathBuf};

use crate::trie::SsTrie;

/// Walks `root`, inserting every file and directory into a fresh trie
/// using paths relative to `root`.
pub fn scan(root: &Path) -> std::io::Result<SsTrie> {
    let mut trie = SsTrie::new();
    walk(root, root, &mut trie)?;
    Ok(trie)
}

fn walk(root: &Path, dir: &Path, trie: &mut SsTrie) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let relative = relative_str(root, &path);
        let is_dir = entry.file_type()?.is_dir();
        trie.insert(&relative, is_dir);
        if is_dir {
            walk(root, &path, trie)?;
        }
    }
    Ok(())
}

fn relative_str(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolves a trie-relative path back to an absolute filesystem path
/// under `root`. Rejects `..` segments so a client cannot escape the
/// mount root via a crafted path.
pub fn resolve_fs_path(root: &Path, path: &str) -> Option<PathBuf> {
    let mut out = root.to_path_buf();
    for token in path.split('/').filter(|t| !t.is_empty()) {
        if token == ".." || token == "." {
            return None;
        }
        out.push(token);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_finds_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("a/f1"), b"hi").unwrap();
        std::fs::write(dir.path().join("top"), b"hi").unwrap();

        let trie = scan(dir.path()).unwrap();
        assert!(trie.contains("a"));
        assert!(trie.contains("a/f1"));
        assert!(trie.contains("top"));
    }

    #[test]
    fn resolve_fs_path_rejects_parent_escape() {
        let root = Path::new("/srv/mount");
        assert!(resolve_fs_path(root, "a/../../etc/passwd").is_none());
        assert_eq!(resolve_fs_path(root, "a/f1").unwrap(), root.join("a").join("f1"));
    }
}
