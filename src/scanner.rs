//! Reference parsing: line-by-line regex scan over source content.
//!
//! Three pattern families cover the common URL-embedding idioms —
//! `url(...)`, `href="..."`, `src="..."`, and bare quoted paths — in plain,
//! filename-embedded, and query-string form. The scan is restartable:
//! re-running on unchanged content yields an identical sequence.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{RefKind, Reference};

/// The literal marker carried by busted references.
pub const BUST_MARKER: &str = "_cb_";

/// Plain references: optional wrapper, optional directory, filename with an
/// extension, optional query tail. Stops at quotes, parens, whitespace, and
/// fragment starts so surrounding syntax is never captured.
static PLAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(concat!(
        r#"(?:url\(["']?|href=["']|src=["']|["'])"#,
        r#"(?P<path>(?P<dir>[^"'()\s?#]*/)?(?P<file>[^/"'()\s?#]+\.[A-Za-z0-9]+))"#,
        r#"(?P<query>\?[^"'()\s#]*)?"#,
    ))
    .expect("valid regex");
});

/// Filename-embedded references: `stem_cb_<token>.ext`, optional query tail
/// captured so rewriting can regenerate it.
static FN_RE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(concat!(
        r#"(?:url\(["']?|href=["']?|src=["']?|["'])?"#,
        r#"(?P<stem>[^"'()\s?#]+?)_cb_(?P<bust>[A-Za-z0-9]{0,16})(?P<ext>\.[A-Za-z0-9]+)"#,
        r#"(?P<query>\?[^"'()\s#]*)?"#,
    ))
    .expect("valid regex");
});

/// Query-string references: `?` section containing a `_cb_` parameter, with
/// unrelated parameters before and after it captured verbatim.
static QS_RE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(concat!(
        r#"(?:url\(["']?|href=["']?|src=["']?|["'])?"#,
        r#"(?P<path>[^"'()\s?#]+)\?(?P<qpre>[^"'()\s#]*?&)?"#,
        r#"_cb_(?:=(?P<bust>[A-Za-z0-9]{0,16}))?(?P<qpost>&[^"'()\s#]*)?"#,
    ))
    .expect("valid regex");
});

/// Parse all asset references out of source content.
///
/// Output is ordered by line number, then by match position within the
/// line. Marked kinds win over plain for the same text, data-URIs are never
/// references, and a reference already carrying a bust marker is never
/// reported as plain.
pub fn parse(content: &str, source_dir: &Path, source_file: &Path) -> Vec<Reference> {
    let marked_possible = content.contains(BUST_MARKER);
    let mut references = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_number = u32::try_from(idx.saturating_add(1)).unwrap_or(u32::MAX);
        parse_line(line, marked_possible, line_number, source_dir, source_file, &mut references);
    }

    return references;
}

/// Scan one line with all applicable pattern families and append matches in
/// column order.
fn parse_line(
    line: &str,
    marked_possible: bool,
    line_number: u32,
    source_dir: &Path,
    source_file: &Path,
    references: &mut Vec<Reference>,
) {
    // (start column, reference) for final in-line ordering.
    let mut found: Vec<(usize, Reference)> = Vec::new();
    // Spans claimed by marked matches; plain and query matches inside them
    // are duplicates of lower fidelity.
    let mut claimed: Vec<(usize, usize)> = Vec::new();

    if marked_possible && line.contains(BUST_MARKER) {
        collect_filename_refs(line, line_number, source_dir, source_file, &mut found, &mut claimed);
        collect_query_refs(line, line_number, source_dir, source_file, &mut found, &mut claimed);
    }
    collect_plain_refs(line, line_number, source_dir, source_file, &mut found, &claimed);

    found.sort_by_key(|(start, _)| return *start);
    references.extend(found.into_iter().map(|(_, r)| return r));
}

/// Filename-embedded matches. Highest fidelity; claims its spans first.
fn collect_filename_refs(
    line: &str,
    line_number: u32,
    source_dir: &Path,
    source_file: &Path,
    found: &mut Vec<(usize, Reference)>,
    claimed: &mut Vec<(usize, usize)>,
) {
    for cap in FN_RE.captures_iter(line) {
        let Some(whole) = cap.get(0) else { continue };
        if whole.as_str().contains("data:") {
            continue;
        }
        let (Some(stem), Some(ext)) = (cap.name("stem"), cap.name("ext")) else {
            continue;
        };
        let bust = cap.name("bust").map_or("", |m| return m.as_str());

        claimed.push((whole.start(), whole.end()));
        found.push((
            whole.start(),
            Reference {
                bust_code: bust.to_string(),
                full_text: whole.as_str().to_string(),
                kind: RefKind::FilenameEmbedded,
                line_number,
                path: format!("{}{}", stem.as_str(), ext.as_str()),
                source_dir: source_dir.to_path_buf(),
                source_file: source_file.to_path_buf(),
            },
        ));
    }
}

/// Query-string matches, skipping spans already claimed by filename matches.
fn collect_query_refs(
    line: &str,
    line_number: u32,
    source_dir: &Path,
    source_file: &Path,
    found: &mut Vec<(usize, Reference)>,
    claimed: &mut Vec<(usize, usize)>,
) {
    let mut fresh: Vec<(usize, usize)> = Vec::new();
    for cap in QS_RE.captures_iter(line) {
        let Some(whole) = cap.get(0) else { continue };
        if whole.as_str().contains("data:") {
            continue;
        }
        if overlaps(claimed, whole.start(), whole.end()) {
            continue;
        }
        // A match must end at a boundary. Ending against an alphanumeric or
        // `=` means the marker was a prefix of some longer parameter (or the
        // token exceeded its bound); rewriting such a match would corrupt
        // the remainder.
        let next = line.get(whole.end()..).and_then(|rest| return rest.chars().next());
        if next.is_some_and(|c| return c.is_ascii_alphanumeric() || c == '=') {
            continue;
        }
        let Some(path) = cap.name("path") else { continue };
        let bust = cap.name("bust").map_or("", |m| return m.as_str());

        fresh.push((whole.start(), whole.end()));
        found.push((
            whole.start(),
            Reference {
                bust_code: bust.to_string(),
                full_text: whole.as_str().to_string(),
                kind: RefKind::QueryParam,
                line_number,
                path: path.as_str().to_string(),
                source_dir: source_dir.to_path_buf(),
                source_file: source_file.to_path_buf(),
            },
        ));
    }
    claimed.extend(fresh);
}

/// Plain matches: never inside a marked span, never containing the marker.
fn collect_plain_refs(
    line: &str,
    line_number: u32,
    source_dir: &Path,
    source_file: &Path,
    found: &mut Vec<(usize, Reference)>,
    claimed: &[(usize, usize)],
) {
    for cap in PLAIN_RE.captures_iter(line) {
        let Some(whole) = cap.get(0) else { continue };
        if whole.as_str().contains(BUST_MARKER) || whole.as_str().contains("data:") {
            continue;
        }
        if overlaps(claimed, whole.start(), whole.end()) {
            continue;
        }
        let Some(path) = cap.name("path") else { continue };

        found.push((
            whole.start(),
            Reference {
                bust_code: String::new(),
                full_text: whole.as_str().to_string(),
                kind: RefKind::Plain,
                line_number,
                path: path.as_str().to_string(),
                source_dir: source_dir.to_path_buf(),
                source_file: source_file.to_path_buf(),
            },
        ));
    }
}

/// Whether a half-open span intersects any claimed span.
fn overlaps(claimed: &[(usize, usize)], start: usize, end: usize) -> bool {
    return claimed.iter().any(|(s, e)| return start < *e && *s < end);
}
