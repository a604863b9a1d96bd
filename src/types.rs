/// Core domain types for asset references and bust tokens.
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

/// A computed cachebust token — lowercase hex, letters and digits only,
/// so it can sit in a filename or a query string without escaping.
/// Newtype prevents mixing with arbitrary strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BustToken(
    /// The hex-encoded token string.
    pub String,
);

impl std::fmt::Display for BustToken {
    /// Write the raw token text.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f.write_str(&self.0);
    }
}

/// How a reference encodes (or doesn't encode) its bust token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// Token embedded in the filename as `name_cb_<token>.ext`.
    FilenameEmbedded,
    /// No bust encoding present.
    Plain,
    /// Token carried as a `_cb_=<token>` query parameter.
    QueryParam,
}

impl RefKind {
    /// Short label used in reports.
    pub fn label(self) -> &'static str {
        return match self {
            RefKind::FilenameEmbedded => "filename",
            RefKind::Plain => "plain",
            RefKind::QueryParam => "querystring",
        };
    }
}

/// One occurrence of an asset link in a source file, parsed by the scanner.
///
/// Immutable once constructed. `full_text` is the exact matched substring and
/// must occur verbatim in the source content at parse time; rewriting replaces
/// every occurrence of that exact substring.
#[derive(Debug, Clone)]
pub struct Reference {
    /// Existing bust token, empty for a fresh (never-busted) reference.
    pub bust_code: String,
    /// The exact matched substring, byte-for-byte from the source content.
    pub full_text: String,
    /// Encoding kind of this occurrence.
    pub kind: RefKind,
    /// One-based line number of the reference in the source file.
    pub line_number: u32,
    /// Decoded logical asset path (dir + filename), bust marker stripped.
    pub path: String,
    /// Directory of the referencing source file (owned copy).
    pub source_dir: PathBuf,
    /// The referencing source file (owned copy).
    pub source_file: PathBuf,
}

impl Reference {
    /// The filename portion of the logical path.
    pub fn filename(&self) -> &str {
        return match self.path.rfind('/') {
            None => self.path.as_str(),
            Some(idx) => self.path.get(idx.saturating_add(1)..).unwrap_or(""),
        };
    }

    /// The directory portion of the logical path, including its trailing
    /// slash, or the empty string for a bare filename.
    pub fn ref_dir(&self) -> &str {
        return match self.path.rfind('/') {
            None => "",
            Some(idx) => self.path.get(..=idx).unwrap_or(""),
        };
    }
}

/// Ordered, deduplicated concrete file paths a reference maps to.
/// Lexicographic order keeps the composite token reproducible across runs
/// and across platforms with differing directory-enumeration order.
pub type ResolvedPaths = Vec<PathBuf>;

/// Maps an asset filename to the set of directories containing a file of
/// that name. Built once per scan; read-only afterward. A filename with zero
/// directories is never present as a key.
#[derive(Debug, Default)]
pub struct StaticFileIndex {
    /// Filename → containing directories, ordered for determinism.
    pub dirs_by_filename: HashMap<String, BTreeSet<PathBuf>>,
}

impl StaticFileIndex {
    /// Candidate directories for a filename, if any.
    pub fn candidates(&self, filename: &str) -> Option<&BTreeSet<PathBuf>> {
        return self.dirs_by_filename.get(filename);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_dir_and_filename_split() {
        let reference = Reference {
            bust_code: String::new(),
            full_text: "src=\"/static/js/app.js".to_string(),
            kind: RefKind::Plain,
            line_number: 1,
            path: "/static/js/app.js".to_string(),
            source_dir: PathBuf::from("templates"),
            source_file: PathBuf::from("templates/index.html"),
        };
        assert_eq!(reference.ref_dir(), "/static/js/");
        assert_eq!(reference.filename(), "app.js");
    }

    #[test]
    fn bare_filename_has_empty_dir() {
        let reference = Reference {
            bust_code: String::new(),
            full_text: "src=\"app.js".to_string(),
            kind: RefKind::Plain,
            line_number: 1,
            path: "app.js".to_string(),
            source_dir: PathBuf::new(),
            source_file: PathBuf::from("index.html"),
        };
        assert_eq!(reference.ref_dir(), "");
        assert_eq!(reference.filename(), "app.js");
    }
}
