//! Run reporting: per-file change listings, missing references, summary.
//!
//! The same structure renders as aligned text or as JSON for tooling.

use std::io::Write as _;

/// One rewritten reference within a file.
#[derive(Debug, serde::Serialize)]
pub struct ChangedRef {
    /// One-based line number of the reference.
    pub line: u32,
    /// Rewritten reference text.
    pub new: String,
    /// Original reference text.
    pub old: String,
}

/// All outcomes for one scanned code file, in line order.
#[derive(Debug, serde::Serialize)]
pub struct FileReport {
    /// References rewritten in this file.
    pub changes: Vec<ChangedRef>,
    /// Marked references whose static file could not be resolved.
    pub missing: Vec<MissingRef>,
    /// Root-relative path of the code file.
    pub path: String,
    /// Why the file was skipped entirely, if it was.
    pub skipped: Option<String>,
    /// References visited but left as they were (verbose listing only).
    pub unchanged: Vec<String>,
}

impl FileReport {
    /// A report with nothing in it yet.
    pub fn new(path: String) -> Self {
        return Self {
            changes: Vec::new(),
            missing: Vec::new(),
            path,
            skipped: None,
            unchanged: Vec::new(),
        };
    }

    /// Whether this file produced any output worth showing by default.
    pub fn is_quiet(&self) -> bool {
        return self.changes.is_empty() && self.missing.is_empty() && self.skipped.is_none();
    }
}

/// A marked reference that resolved to no static file.
#[derive(Debug, serde::Serialize)]
pub struct MissingRef {
    /// One-based line number of the reference.
    pub line: u32,
    /// The reference text as matched.
    pub text: String,
}

/// The whole run, files in path order.
#[derive(Debug, Default, serde::Serialize)]
pub struct RunReport {
    /// Non-fatal notes surfaced once per run (e.g. hash fallback).
    pub notes: Vec<String>,
    /// Per-file outcomes, sorted by path.
    pub files: Vec<FileReport>,
}

/// Output volume selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Changed files, missing references, summary.
    Normal,
    /// Everything, including unchanged references.
    Verbose,
}

impl RunReport {
    /// Total rewritten references.
    pub fn changed_count(&self) -> usize {
        return self.files.iter().map(|f| return f.changes.len()).sum();
    }

    /// Total unresolvable marked references.
    pub fn missing_count(&self) -> usize {
        return self.files.iter().map(|f| return f.missing.len()).sum();
    }

    /// Render as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        return serde_json::to_string_pretty(self);
    }

    /// Render as text to the given writer.
    pub fn write_text(&self, out: &mut impl std::io::Write, verbosity: Verbosity) {
        if verbosity == Verbosity::Quiet {
            return;
        }

        for note in &self.notes {
            let _ = writeln!(out, "note     : {note}");
        }

        for file in &self.files {
            if file.is_quiet() && verbosity != Verbosity::Verbose {
                continue;
            }
            let _ = writeln!(out, "{}", file.path);
            if let Some(reason) = &file.skipped {
                let _ = writeln!(out, "  skipped  : {reason}");
                continue;
            }
            for change in &file.changes {
                let _ = writeln!(
                    out,
                    "  busted   : line {:<4} {} -> {}",
                    change.line, change.old, change.new
                );
            }
            for missing in &file.missing {
                let _ = writeln!(out, "  missing! : line {:<4} {}", missing.line, missing.text);
            }
            if verbosity == Verbosity::Verbose {
                for text in &file.unchanged {
                    let _ = writeln!(out, "  unchanged: {text}");
                }
            }
        }

        let changed = self.changed_count();
        let missing = self.missing_count();
        if missing > 0 {
            let _ = writeln!(out, "{changed} busted, {missing} missing");
        } else {
            let _ = writeln!(out, "{changed} busted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RunReport {
        let mut file = FileReport::new("templates/index.html".to_string());
        file.changes.push(ChangedRef {
            line: 3,
            new: "src=\"/static/app.js?_cb_=abcd1234".to_string(),
            old: "src=\"/static/app.js".to_string(),
        });
        file.missing.push(MissingRef {
            line: 9,
            text: "src=\"/static/gone.js?_cb_=ffff".to_string(),
        });
        let quiet_file = FileReport::new("templates/other.html".to_string());
        RunReport { notes: Vec::new(), files: vec![file, quiet_file] }
    }

    #[test]
    fn counts_aggregate_across_files() {
        let report = sample();
        assert_eq!(report.changed_count(), 1);
        assert_eq!(report.missing_count(), 1);
    }

    #[test]
    fn text_output_hides_quiet_files() {
        let report = sample();
        let mut buf = Vec::new();
        report.write_text(&mut buf, Verbosity::Normal);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("templates/index.html"));
        assert!(!text.contains("templates/other.html"));
        assert!(text.contains("busted   : line 3"));
        assert!(text.contains("missing! : line 9"));
        assert!(text.contains("1 busted, 1 missing"));
    }

    #[test]
    fn quiet_suppresses_everything() {
        let report = sample();
        let mut buf = Vec::new();
        report.write_text(&mut buf, Verbosity::Quiet);
        assert!(buf.is_empty());
    }

    #[test]
    fn json_round_trips_through_serde() {
        let report = sample();
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["files"][0]["path"], "templates/index.html");
        assert_eq!(value["files"][0]["changes"][0]["line"], 3);
    }
}
