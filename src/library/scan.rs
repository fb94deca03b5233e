use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::config::LibrarySettings;

/// Normalised extension allow-list: lowercase, no leading dot.
struct Extensions(HashSet<String>);

impl Extensions {
    fn from_settings(settings: &LibrarySettings) -> Self {
        Self(
            settings
                .extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }

    fn admits(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| self.0.contains(&ext.to_ascii_lowercase()))
    }
}

fn dotted(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|n| n.starts_with('.'))
}

/// Every streamable file under `dir`, ordered by lowercase path so the
/// startup playlist is the same run after run.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<PathBuf> {
    let allowed = Extensions::from_settings(settings);

    let depth = match (settings.recursive, settings.max_depth) {
        (false, _) => 1,
        (true, Some(d)) => d,
        (true, None) => usize::MAX,
    };

    let mut files = Vec::new();
    let walk = WalkDir::new(dir)
        .follow_links(settings.follow_links)
        .max_depth(depth)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || settings.include_hidden || !dotted(e));

    for entry in walk {
        match entry {
            Ok(e) if e.file_type().is_file() || (e.path_is_symlink() && e.path().is_file()) => {
                if allowed.admits(e.path()) {
                    files.push(e.into_path());
                }
            }
            Ok(_) => {}
            Err(err) => debug!(error = %err, "skipping unreadable library entry"),
        }
    }

    files.sort_by_cached_key(|p| p.to_string_lossy().to_lowercase());
    files
}
