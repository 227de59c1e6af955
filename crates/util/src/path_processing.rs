use std::path::{Path, PathBuf};

use dirs_next::home_dir;

/// Expands a leading `~` to the user's home directory.
///
/// Without a known home directory the path is returned unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    resolve_home_prefix(path.trim(), home_dir().as_deref())
}

fn resolve_home_prefix(path: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(path);
    };
    match path.strip_prefix('~') {
        Some("") => home.to_path_buf(),
        Some(rest) if rest.starts_with(['/', '\\']) => home.join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}
