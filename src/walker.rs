//! File enumeration: walks configured subdirectories and applies matchers.
//!
//! Everything downstream works with root-relative paths, so the proximity
//! heuristic compares like with like and reports stay readable.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::matcher::PathMatcher;

/// Walk each configured subdirectory under `root` and collect the files the
/// filter accepts, skipping excluded directories during traversal.
///
/// Returns root-relative paths, sorted and deduplicated (overlapping
/// subdirectory lists yield each file once).
pub fn collect_files(
    root: &Path,
    subdirs: &[String],
    file_filter: &PathMatcher,
    dir_exclude: &PathMatcher,
) -> Vec<PathBuf> {
    let mut found: BTreeSet<PathBuf> = BTreeSet::new();

    for subdir in subdirs {
        let base = if subdir == "." { root.to_path_buf() } else { root.join(subdir) };
        if !base.is_dir() {
            continue;
        }

        let entries = WalkDir::new(&base)
            .into_iter()
            .filter_entry(|e| {
                if !e.file_type().is_dir() {
                    return true;
                }
                // Trailing slash so `*.git/*` style globs prune the
                // directory itself, not just its children.
                let rel = relative_str(root, e.path());
                return !dir_exclude.matches(&format!("{rel}/"));
            })
            .filter_map(Result::ok);

        for entry in entries {
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = relative_str(root, entry.path());
            let included = file_filter.is_no_filter() || file_filter.matches(&rel);
            if included {
                found.insert(PathBuf::from(rel));
            }
        }
    }

    return found.into_iter().collect();
}

/// Root-relative textual form of a walked path.
fn relative_str(root: &Path, path: &Path) -> String {
    return path.strip_prefix(root).unwrap_or(path).to_string_lossy().into_owned();
}
