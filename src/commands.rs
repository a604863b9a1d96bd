//! CLI commands: init, scan, update, rewrite.
//!
//! `update` and `rewrite` share one pipeline: enumerate files, build the
//! static index, then run code files through parse → expand → resolve →
//! bust → rewrite on a bounded worker pool. Each worker reads its file once,
//! applies every replacement in memory, and writes once; results are sorted
//! afterward so reports are deterministic regardless of completion order.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::{self, Config};
use crate::error::Error;
use crate::expand;
use crate::hasher::{self, BustCache};
use crate::matcher::PathMatcher;
use crate::report::{ChangedRef, FileReport, MissingRef, RunReport, Verbosity};
use crate::resolver;
use crate::rewriter::{self, Rewrite};
use crate::scanner;
use crate::types::{RefKind, Reference, ResolvedPaths, StaticFileIndex};
use crate::walker;

/// Upper bound on scan workers; file I/O saturates quickly.
const MAX_WORKERS: usize = 8;

/// Options shared by the `update` and `rewrite` commands.
pub struct ScanOptions {
    /// Explicit config file path (`--cfg`).
    pub cfg: Option<PathBuf>,
    /// Recompute tokens even when the fingerprint fast path says unchanged.
    pub force: bool,
    /// Emit the report as JSON instead of text.
    pub json: bool,
    /// Report changes without writing any file.
    pub no_act: bool,
    /// Forced target kind (`--filename` / `--querystring`).
    pub target_override: Option<RefKind>,
    /// Output volume.
    pub verbosity: Verbosity,
}

/// Outcome of processing a single reference.
enum RefOutcome {
    /// Marked reference with no resolvable static file.
    Missing,
    /// Reference text changed.
    Rewritten(String),
    /// Not eligible in this mode (plain reference during `update`).
    Skipped,
    /// Token and kind already current.
    Unchanged,
}

/// Fail unless the project root exists and is a directory.
fn ensure_root(root: &Path) -> Result<(), Error> {
    if !root.is_dir() {
        return Err(Error::RootNotFound { path: root.to_path_buf() });
    }
    return Ok(());
}

/// A matcher accepting files whose name ends with any configured extension.
/// Case-sensitive, like the rest of path handling.
fn extension_filter(extensions: &[String]) -> PathMatcher {
    let owned: Vec<String> = extensions.to_vec();
    return PathMatcher::predicate(move |path| {
        return owned.iter().any(|ext| return path.ends_with(ext.as_str()));
    });
}

/// Scan the project with default settings and write a starter
/// `cachebust.toml` listing the directories that actually hold referenced
/// assets and referencing code.
///
/// # Errors
///
/// Returns `Error::RootNotFound` for a bad root or `Error::Io` if the
/// config file cannot be written.
pub fn init(root: &Path) -> Result<(), Error> {
    ensure_root(root)?;

    let dir_exclude = PathMatcher::from_globs(&config::default_ignore_dirs());
    let everything = walker::collect_files(
        root,
        &[".".to_string()],
        &PathMatcher::NoFilter,
        &dir_exclude,
    );

    let static_types = config::default_static_filetypes();
    let code_types = config::default_code_filetypes();
    let static_paths: Vec<PathBuf> = everything
        .iter()
        .filter(|p| return has_any_extension(p, &static_types))
        .cloned()
        .collect();
    let code_paths: Vec<PathBuf> = everything
        .iter()
        .filter(|p| return has_any_extension(p, &code_types))
        .cloned()
        .collect();

    let index = resolver::build_index(&static_paths);
    let mut code_dirs: BTreeSet<String> = BTreeSet::new();
    let mut static_dirs: BTreeSet<String> = BTreeSet::new();

    for code_path in &code_paths {
        let Ok(bytes) = std::fs::read(root.join(code_path)) else { continue };
        let Ok(content) = String::from_utf8(bytes) else { continue };
        let source_dir = code_path.parent().unwrap_or_else(|| return Path::new("")).to_path_buf();

        for reference in scanner::parse(&content, &source_dir, code_path) {
            let Some(resolved) = resolver::resolve(
                &index,
                &reference.source_dir,
                reference.ref_dir(),
                reference.filename(),
            ) else {
                continue;
            };
            code_dirs.insert(dir_label(&source_dir));
            let static_dir = resolved.parent().unwrap_or_else(|| return Path::new(""));
            static_dirs.insert(dir_label(static_dir));
        }
    }

    let cfg_path = root.join("cachebust.toml");
    std::fs::write(&cfg_path, init_template(&static_dirs, &code_dirs))?;
    eprintln!(
        "Wrote {} ({} static dirs, {} code dirs)",
        cfg_path.display(),
        static_dirs.len(),
        code_dirs.len()
    );
    return Ok(());
}

/// Root-relative display form of a directory, `.` for the root itself.
fn dir_label(dir: &Path) -> String {
    let text = dir.display().to_string();
    if text.is_empty() {
        return ".".to_string();
    }
    return text;
}

/// Whether the path's name ends with any of the given extensions.
fn has_any_extension(path: &Path, extensions: &[String]) -> bool {
    let name = path.to_string_lossy();
    return extensions.iter().any(|ext| return name.ends_with(ext.as_str()));
}

/// The commented starter configuration written by `init`.
fn init_template(static_dirs: &BTreeSet<String>, code_dirs: &BTreeSet<String>) -> String {
    return format!(
        r#"# cachebust project configuration
# Paths are relative to the project root.

static_dirs = {static_list}
code_dirs = {code_list}

# hash_function = "sha256"        # sha512, xxh3
# hash_length = 8
# target = "querystring"          # or "filename"
# ignore_dirs = ["*lib/*", "*lib64/*", "*.git/*", "*.hg/*", "*.svn/*"]

# References containing a multibust marker are expanded using each
# replacement; the token then reflects the combination of all variant
# files, so changing any one of them refreshes the reference.
#
# [multibust]
# "${{lang}}" = ["en", "de"]
"#,
        static_list = toml_string_array(static_dirs),
        code_list = toml_string_array(code_dirs),
    );
}

/// Read, parse, resolve, bust, and rewrite one code file. Per-file problems
/// end up in the report; only contract violations propagate.
///
/// # Errors
///
/// Returns `Error::RewriteContract` if a parsed reference cannot be
/// rewritten consistently.
fn process_file(
    root: &Path,
    rel_path: &Path,
    config: &Config,
    index: &StaticFileIndex,
    cache: &BustCache,
    options: &ScanOptions,
    rewrite_plain: bool,
) -> Result<FileReport, Error> {
    let mut report = FileReport::new(rel_path.display().to_string());
    let absolute = root.join(rel_path);

    let bytes = match std::fs::read(&absolute) {
        Err(e) => {
            report.skipped = Some(format!("read failed: {e}"));
            return Ok(report);
        },
        Ok(b) => b,
    };
    let original = match String::from_utf8(bytes) {
        Err(_) => {
            report.skipped =
                Some(Error::Undecodable { path: rel_path.to_path_buf() }.to_string());
            return Ok(report);
        },
        Ok(s) => s,
    };

    let source_dir = rel_path.parent().unwrap_or_else(|| return Path::new("")).to_path_buf();
    let references = scanner::parse(&original, &source_dir, rel_path);

    let mut pending: Vec<(u32, String, String)> = Vec::new();
    for reference in &references {
        match process_reference(root, reference, config, index, cache, options, rewrite_plain)? {
            RefOutcome::Missing => report.missing.push(MissingRef {
                line: reference.line_number,
                text: reference.full_text.clone(),
            }),
            RefOutcome::Rewritten(new_text) => {
                pending.push((reference.line_number, reference.full_text.clone(), new_text));
            },
            RefOutcome::Skipped => {},
            RefOutcome::Unchanged => report
                .unchanged
                .push(format!("[{}] {}", reference.kind.label(), reference.full_text)),
        }
    }

    // Apply longest old-text first: a shorter reference that is a prefix of
    // a longer one on another line must not clobber the longer occurrence.
    let mut ordered: Vec<&(u32, String, String)> = pending.iter().collect();
    ordered.sort_by(|a, b| return b.1.len().cmp(&a.1.len()));
    let mut content = original.clone();
    for (_, old, new) in ordered {
        if content.contains(old.as_str()) {
            content = content.replace(old.as_str(), new.as_str());
        }
    }

    for (line, old, new) in pending {
        report.changes.push(ChangedRef { line, new, old });
    }

    if content != original && !options.no_act {
        if let Err(e) = std::fs::write(&absolute, &content) {
            report.skipped = Some(format!("write failed: {e}"));
        }
    }
    return Ok(report);
}

/// Expand, resolve, and re-token one reference.
///
/// # Errors
///
/// Returns `Error::RewriteContract` from the rewriter; I/O problems on
/// resolved statics degrade to a missing report instead of failing the run.
fn process_reference(
    root: &Path,
    reference: &Reference,
    config: &Config,
    index: &StaticFileIndex,
    cache: &BustCache,
    options: &ScanOptions,
    rewrite_plain: bool,
) -> Result<RefOutcome, Error> {
    if reference.kind == RefKind::Plain && !rewrite_plain {
        return Ok(RefOutcome::Skipped);
    }

    let target = match reference.kind {
        RefKind::Plain => options.target_override.unwrap_or(config.target),
        current => options.target_override.unwrap_or(current),
    };

    let mut resolved: BTreeSet<PathBuf> = BTreeSet::new();
    for variant in expand::expand(&reference.path, &config.multibust) {
        let (variant_dir, variant_name) = split_variant(&variant);
        if let Some(path) = resolver::resolve(index, &reference.source_dir, variant_dir, variant_name)
        {
            resolved.insert(path);
        }
    }
    if resolved.is_empty() {
        // Any quoted string can look like a plain reference; only marked
        // references are definitely ours, so only they report as missing.
        if reference.kind == RefKind::Plain {
            return Ok(RefOutcome::Skipped);
        }
        return Ok(RefOutcome::Missing);
    }
    let resolved: ResolvedPaths = resolved.into_iter().collect();

    let spec = config.token_spec();

    // Cross-run fast path: a single-path reference keeping its kind whose
    // existing token still carries the current fingerprint prefix has not
    // changed — skip the content hash entirely. The composite multibust
    // token has no separable prefix, so it never takes this path.
    if !options.force
        && target == reference.kind
        && spec.stat_len > 0
        && reference.bust_code.len() == usize::try_from(spec.total_len).unwrap_or(0)
    {
        if let [single] = resolved.as_slice() {
            if let Ok(prefix) = hasher::fingerprint_component(&root.join(single), spec) {
                if reference.bust_code.starts_with(&prefix) {
                    return Ok(RefOutcome::Unchanged);
                }
            }
        }
    }

    let absolute: Vec<PathBuf> = resolved.iter().map(|p| return root.join(p)).collect();
    let token = match hasher::bust_token(&absolute, spec, cache) {
        Err(Error::Io(_)) => return Ok(RefOutcome::Missing),
        Err(e) => return Err(e),
        Ok(t) => t,
    };

    return match rewriter::rewrite(reference, &token.0, target)? {
        Rewrite::Changed(text) => Ok(RefOutcome::Rewritten(text)),
        Rewrite::Unchanged => Ok(RefOutcome::Unchanged),
    };
}

/// Bust plain references too, converting them to the configured target kind.
///
/// # Errors
///
/// Returns fatal configuration, I/O, or contract errors.
pub fn rewrite(root: &Path, options: &ScanOptions) -> Result<ExitCode, Error> {
    return run_scan(root, options, true);
}

/// The shared update/rewrite pipeline.
///
/// # Errors
///
/// Returns fatal configuration, I/O, or contract errors.
fn run_scan(root: &Path, options: &ScanOptions, rewrite_plain: bool) -> Result<ExitCode, Error> {
    ensure_root(root)?;
    let config = Config::load(&Config::locate(root, options.cfg.as_deref()))?;

    let dir_exclude = PathMatcher::from_globs(&config.ignore_dirs);
    let static_paths = walker::collect_files(
        root,
        &config.static_dirs,
        &extension_filter(&config.static_filetypes),
        &dir_exclude,
    );
    let code_paths = walker::collect_files(
        root,
        &config.code_dirs,
        &extension_filter(&config.code_filetypes),
        &dir_exclude,
    );

    let index = resolver::build_index(&static_paths);
    let cache = BustCache::new();

    let mut files = scan_files(root, &code_paths, &config, &index, &cache, options, rewrite_plain)?;
    files.sort_by(|a, b| return a.path.cmp(&b.path));

    let mut report = RunReport { notes: Vec::new(), files };
    if let Some(name) = &config.fallback_from {
        report.notes.push(format!("unknown hash_function `{name}`, using xxh3"));
    }

    if options.json {
        let json = report
            .to_json()
            .map_err(|e| return Error::Io(std::io::Error::other(e)))?;
        println!("{json}");
    } else {
        let stdout = std::io::stdout();
        report.write_text(&mut stdout.lock(), options.verbosity);
    }
    return Ok(ExitCode::SUCCESS);
}

/// List the directories a run would scan, to spot candidates for
/// `ignore_dirs` before they slow everything down.
///
/// # Errors
///
/// Returns fatal configuration errors.
pub fn scan(root: &Path, cfg: Option<&Path>) -> Result<(), Error> {
    ensure_root(root)?;
    let config = Config::load(&Config::locate(root, cfg))?;

    let dir_exclude = PathMatcher::from_globs(&config.ignore_dirs);
    let static_paths = walker::collect_files(
        root,
        &config.static_dirs,
        &extension_filter(&config.static_filetypes),
        &dir_exclude,
    );
    let code_paths = walker::collect_files(
        root,
        &config.code_dirs,
        &extension_filter(&config.code_filetypes),
        &dir_exclude,
    );

    for (label, paths) in [("code  ", &code_paths), ("static", &static_paths)] {
        let dirs: BTreeSet<String> = paths
            .iter()
            .map(|p| return dir_label(p.parent().unwrap_or_else(|| return Path::new(""))))
            .collect();
        for dir in dirs {
            println!("{label} {dir}");
        }
    }
    return Ok(());
}

/// Run the per-file work across a bounded worker pool. Workers pull paths
/// from a channel and push per-file reports back; a fatal error stops the
/// pool from taking new jobs and surfaces after in-flight files finish.
///
/// # Errors
///
/// Returns the first fatal error any worker hit.
fn scan_files(
    root: &Path,
    code_paths: &[PathBuf],
    config: &Config,
    index: &StaticFileIndex,
    cache: &BustCache,
    options: &ScanOptions,
    rewrite_plain: bool,
) -> Result<Vec<FileReport>, Error> {
    if code_paths.is_empty() {
        return Ok(Vec::new());
    }

    let worker_count = std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(1)
        .min(code_paths.len())
        .min(MAX_WORKERS);

    let (job_tx, job_rx) = crossbeam_channel::unbounded::<PathBuf>();
    for path in code_paths {
        let _ = job_tx.send(path.clone());
    }
    drop(job_tx);

    let (result_tx, result_rx) = crossbeam_channel::unbounded::<Result<FileReport, Error>>();

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                while let Ok(path) = job_rx.recv() {
                    let outcome =
                        process_file(root, &path, config, index, cache, options, rewrite_plain);
                    let fatal = outcome.is_err();
                    if result_tx.send(outcome).is_err() || fatal {
                        break;
                    }
                }
            });
        }
        drop(result_tx);
    });

    let mut files = Vec::new();
    let mut first_error: Option<Error> = None;
    for result in result_rx.iter() {
        match result {
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            },
            Ok(file) => files.push(file),
        }
    }

    return match first_error {
        None => Ok(files),
        Some(e) => Err(e),
    };
}

/// Split an expanded variant path into its directory (with trailing slash)
/// and filename portions.
fn split_variant(variant: &str) -> (&str, &str) {
    return match variant.rfind('/') {
        None => ("", variant),
        Some(idx) => (
            variant.get(..=idx).unwrap_or(""),
            variant.get(idx.saturating_add(1)..).unwrap_or(""),
        ),
    };
}

/// TOML array literal for a set of strings; `["."]` when nothing was found
/// so a generated config still scans something.
fn toml_string_array(items: &BTreeSet<String>) -> String {
    if items.is_empty() {
        return "[\".\"]".to_string();
    }
    let quoted: Vec<String> = items.iter().map(|s| return format!("\"{s}\"")).collect();
    return format!("[{}]", quoted.join(", "));
}

/// Refresh tokens on references that already carry a bust marker.
///
/// # Errors
///
/// Returns fatal configuration, I/O, or contract errors.
pub fn update(root: &Path, options: &ScanOptions) -> Result<ExitCode, Error> {
    return run_scan(root, options, false);
}
