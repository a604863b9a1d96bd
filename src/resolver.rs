//! Static file index construction and reference-to-file resolution.
//!
//! A reference's written path is frequently web-root-relative or partial
//! rather than a real filesystem path, and the same filename may exist in
//! several asset directories. Resolution approximates "closest" by textual
//! locality instead of probing the filesystem per candidate.

use std::path::{Path, PathBuf};

use crate::types::StaticFileIndex;

/// Build the filename → directories index from enumerated static files.
/// A filename only becomes a key once at least one directory contains it.
pub fn build_index(static_paths: &[PathBuf]) -> StaticFileIndex {
    let mut index = StaticFileIndex::default();
    for path in static_paths {
        let Some(filename) = path.file_name().and_then(|n| return n.to_str()) else {
            continue;
        };
        let dir = path.parent().unwrap_or_else(|| return Path::new("")).to_path_buf();
        index
            .dirs_by_filename
            .entry(filename.to_string())
            .or_default()
            .insert(dir);
    }
    return index;
}

/// Find the directory best matching a reference.
///
/// The filename must match an index key exactly (case-sensitive). A single
/// candidate wins immediately. Otherwise candidates are narrowed in two
/// phases over path components:
///
/// 1. longest trailing run shared with the reference's own directory
///    portion (back-to-front); no shared suffix anywhere keeps everyone,
/// 2. longest leading run shared with the referencing file's directory
///    (front-to-back).
///
/// Remaining ties resolve to the lexicographically smallest directory so
/// identical inputs always produce identical output. Returns the full file
/// path, or `None` when the filename is unknown.
pub fn resolve(
    index: &StaticFileIndex,
    source_dir: &Path,
    ref_dir: &str,
    filename: &str,
) -> Option<PathBuf> {
    let candidates = index.candidates(filename)?;

    if candidates.len() == 1 {
        let dir = candidates.iter().next()?;
        return Some(dir.join(filename));
    }

    let ref_components = url_components(ref_dir);
    let source_components = dir_components(source_dir);

    // Suffix phase against the reference's embedded directory.
    let suffix_scores: Vec<(usize, &PathBuf)> = candidates
        .iter()
        .map(|dir| return (shared_suffix_len(&dir_components(dir), &ref_components), dir))
        .collect();
    let best_suffix = suffix_scores.iter().map(|(n, _)| return *n).max().unwrap_or(0);
    let survivors: Vec<&PathBuf> = if best_suffix == 0 {
        // No candidate relates to the written directory at all; keep everyone
        // and let source proximity decide.
        suffix_scores.iter().map(|(_, dir)| return *dir).collect()
    } else {
        suffix_scores
            .iter()
            .filter(|(n, _)| return *n == best_suffix)
            .map(|(_, dir)| return *dir)
            .collect()
    };

    // Prefix phase against the referencing file's directory.
    let prefix_scores: Vec<(usize, &PathBuf)> = survivors
        .iter()
        .map(|dir| return (shared_prefix_len(&dir_components(dir), &source_components), *dir))
        .collect();
    let best_prefix = prefix_scores.iter().map(|(n, _)| return *n).max().unwrap_or(0);

    // Candidates iterate in BTreeSet order, so the first survivor is already
    // the lexicographically smallest — the stable tie-break.
    return prefix_scores
        .iter()
        .find(|(n, _)| return *n == best_prefix)
        .map(|(_, dir)| return dir.join(filename));
}

/// Path components of a filesystem directory, as owned strings.
fn dir_components(dir: &Path) -> Vec<String> {
    return dir
        .components()
        .map(|c| return c.as_os_str().to_string_lossy().into_owned())
        .filter(|c| return c != ".")
        .collect();
}

/// Components of a URL-style directory portion (`/static/img/` → two).
fn url_components(ref_dir: &str) -> Vec<String> {
    return ref_dir
        .split('/')
        .filter(|c| return !c.is_empty() && *c != ".")
        .map(str::to_string)
        .collect();
}

/// Length of the shared trailing run of components, comparing back-to-front.
fn shared_suffix_len(a: &[String], b: &[String]) -> usize {
    return a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| return x == y)
        .count();
}

/// Length of the shared leading run of components, comparing front-to-back.
fn shared_prefix_len(a: &[String], b: &[String]) -> usize {
    return a.iter().zip(b.iter()).take_while(|(x, y)| return x == y).count();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(paths: &[&str]) -> StaticFileIndex {
        let owned: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
        build_index(&owned)
    }

    #[test]
    fn index_groups_directories_by_filename() {
        let index = index_of(&["test/test.js", "foo/bar.js", "foo/baz.js", "bar/bar.js"]);
        assert_eq!(index.dirs_by_filename.len(), 3);
        assert_eq!(index.candidates("test.js").unwrap().len(), 1);
        assert_eq!(index.candidates("bar.js").unwrap().len(), 2);
        assert!(index.candidates("missing.js").is_none());
    }

    #[test]
    fn unknown_filename_is_not_found() {
        let index = index_of(&["static/app.js"]);
        assert!(resolve(&index, Path::new("pages"), "/static/", "gone.js").is_none());
    }

    #[test]
    fn filename_match_is_case_sensitive() {
        let index = index_of(&["static/App.js"]);
        assert!(resolve(&index, Path::new("pages"), "/static/", "app.js").is_none());
    }

    #[test]
    fn single_candidate_wins_immediately() {
        let index = index_of(&["foo/assets/logo.png"]);
        let path = resolve(&index, Path::new("bar/pages"), "/img/", "logo.png");
        assert_eq!(path, Some(PathBuf::from("foo/assets/logo.png")));
    }

    #[test]
    fn suffix_phase_prefers_matching_reference_dir() {
        let index = index_of(&[
            "foo/assets/app.js",
            "bar/static/js/app.js",
            "bar/static/lib/app.js",
        ]);
        let path = resolve(&index, Path::new("bar"), "/static/js/", "app.js");
        assert_eq!(path, Some(PathBuf::from("bar/static/js/app.js")));

        // The written directory outweighs source proximity.
        let path = resolve(&index, Path::new("foo"), "/static/js/", "app.js");
        assert_eq!(path, Some(PathBuf::from("bar/static/js/app.js")));
    }

    #[test]
    fn suffix_match_wins_over_prefix_proximity() {
        let index = index_of(&["foo/static/js/app.js", "foo/static/lib/app.js"]);
        let path = resolve(&index, Path::new("foo/pages"), "/lib/", "app.js");
        assert_eq!(path, Some(PathBuf::from("foo/static/lib/app.js")));
    }

    #[test]
    fn prefix_phase_breaks_suffixless_ties() {
        let index = index_of(&[
            "foo/assets/app.js",
            "bar/static/js/app.js",
            "bar/static/lib/app.js",
        ]);
        // Bare filename: no suffix information, source locality decides.
        let path = resolve(&index, Path::new("foo"), "", "app.js");
        assert_eq!(path, Some(PathBuf::from("foo/assets/app.js")));
    }

    #[test]
    fn full_tie_is_lexicographically_stable() {
        let index = index_of(&["b/css/site.css", "a/css/site.css"]);
        let path = resolve(&index, Path::new("pages"), "/css/", "site.css");
        assert_eq!(path, Some(PathBuf::from("a/css/site.css")));
    }
}
