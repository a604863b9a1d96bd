//! Path matching built once at configuration time.
//!
//! The matcher is a tagged variant rather than an ad hoc "string, list, or
//! callable" parameter: every call site evaluates through one `matches()`
//! interface, and the shape of the filter is fixed when the config is built.

use regex::Regex;

/// A path filter, constructed once and queried many times.
pub enum PathMatcher {
    /// Arbitrary predicate over the path text.
    CustomPredicate(Box<dyn Fn(&str) -> bool + Send + Sync>),
    /// Several glob patterns; matches if any one matches.
    GlobSet(Vec<Regex>),
    /// No patterns configured. Never matches; callers that treat "no
    /// patterns" as "allow everything" check for this variant explicitly.
    NoFilter,
    /// A single glob pattern.
    SingleGlob(Regex),
}

impl PathMatcher {
    /// Build from a list of glob patterns: empty list → `NoFilter`, one
    /// pattern → `SingleGlob`, several → `GlobSet`.
    pub fn from_globs(globs: &[String]) -> Self {
        let mut compiled: Vec<Regex> = globs.iter().map(|g| return glob_to_regex(g)).collect();
        return match compiled.len() {
            0 => PathMatcher::NoFilter,
            1 => match compiled.pop() {
                None => PathMatcher::NoFilter,
                Some(re) => PathMatcher::SingleGlob(re),
            },
            _ => PathMatcher::GlobSet(compiled),
        };
    }

    /// Build from an arbitrary predicate.
    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        return PathMatcher::CustomPredicate(Box::new(f));
    }

    /// Whether no patterns were configured.
    pub fn is_no_filter(&self) -> bool {
        return matches!(self, PathMatcher::NoFilter);
    }

    /// Whether the path matches this filter. `NoFilter` matches nothing.
    pub fn matches(&self, path: &str) -> bool {
        return match self {
            PathMatcher::CustomPredicate(f) => f(path),
            PathMatcher::GlobSet(patterns) => patterns.iter().any(|re| return re.is_match(path)),
            PathMatcher::NoFilter => false,
            PathMatcher::SingleGlob(re) => re.is_match(path),
        };
    }
}

/// Translate a shell glob into an anchored regex. `*` matches any run of
/// characters (including `/`), `?` matches one character; everything else is
/// literal.
fn glob_to_regex(glob: &str) -> Regex {
    let mut pattern = String::with_capacity(glob.len().saturating_add(8));
    pattern.push('^');
    for ch in glob.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    pattern.push('$');
    // The translation only emits escaped literals and `.`/`.*`, so the
    // pattern is always valid.
    return Regex::new(&pattern).expect("valid regex");
}
