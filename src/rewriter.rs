//! Reference rewriting: token substitution and kind conversion.
//!
//! Same-kind updates touch only the token substring. Conversions recover the
//! plain form first, then re-encode toward the target kind, reattaching any
//! unrelated query parameters verbatim. Inputs must come from the reference
//! parser; captured text inconsistent with the declared kind fails loudly
//! instead of corrupting the source.

use crate::error::Error;
use crate::scanner::BUST_MARKER;
use crate::types::{RefKind, Reference};

/// Outcome of a rewrite request.
#[derive(Debug, PartialEq, Eq)]
pub enum Rewrite {
    /// The reference text changed; replace every occurrence of the old
    /// `full_text` with this.
    Changed(String),
    /// Token and kind already match — the orchestrator can skip the file
    /// write entirely.
    Unchanged,
}

/// A reference decomposed into its invariant surroundings.
struct Decomposed {
    /// Wrapper text before the path (`url('`, `src="`, a bare quote, …).
    head: String,
    /// Unrelated query parameters (no leading `?`), in original order.
    query: Option<String>,
}

/// Rewrite a reference to carry `new_token` in `target` encoding.
///
/// # Errors
///
/// Returns `Error::RewriteContract` if the reference's captured text is
/// inconsistent with its declared kind — a defect upstream, never a
/// recoverable condition.
pub fn rewrite(reference: &Reference, new_token: &str, target: RefKind) -> Result<Rewrite, Error> {
    if target == reference.kind && new_token == reference.bust_code {
        return Ok(Rewrite::Unchanged);
    }
    if target == RefKind::Plain && reference.kind == RefKind::Plain {
        return Ok(Rewrite::Unchanged);
    }

    // Same-kind refresh: substitute the token in place, leaving every other
    // character of the matched text untouched.
    if target == reference.kind {
        let updated = match target {
            RefKind::FilenameEmbedded => substitute_filename_token(reference, new_token)?,
            RefKind::Plain => return Ok(Rewrite::Unchanged),
            RefKind::QueryParam => substitute_query_token(reference, new_token)?,
        };
        return Ok(Rewrite::Changed(updated));
    }

    let parts = decompose(reference)?;
    let rebuilt = match target {
        RefKind::FilenameEmbedded => compose_filename(reference, &parts, new_token)?,
        RefKind::Plain => compose_plain(reference, &parts),
        RefKind::QueryParam => compose_query(reference, &parts, new_token),
    };
    return Ok(Rewrite::Changed(rebuilt));
}

/// Split `full_text` into head / path / unrelated-query around the
/// occurrence dictated by the reference's kind.
fn decompose(reference: &Reference) -> Result<Decomposed, Error> {
    let encoded_path = match reference.kind {
        RefKind::FilenameEmbedded => busted_path(reference, &reference.bust_code)?,
        RefKind::Plain | RefKind::QueryParam => reference.path.clone(),
    };

    let Some(at) = reference.full_text.find(&encoded_path) else {
        return Err(contract(reference, "path not present in matched text"));
    };
    let head = reference.full_text.get(..at).unwrap_or("").to_string();
    let tail = reference
        .full_text
        .get(at.saturating_add(encoded_path.len())..)
        .unwrap_or("");

    let query = match reference.kind {
        RefKind::FilenameEmbedded | RefKind::Plain => match tail.strip_prefix('?') {
            None if tail.is_empty() => None,
            None => return Err(contract(reference, "unexpected text after path")),
            Some(rest) => Some(rest.to_string()),
        },
        RefKind::QueryParam => {
            let Some(raw_query) = tail.strip_prefix('?') else {
                return Err(contract(reference, "query section missing"));
            };
            strip_bust_param(reference, raw_query)?
        },
    };

    return Ok(Decomposed { head, query });
}

/// Remove the `_cb_` parameter from a query section, preserving the other
/// parameters verbatim and in order.
fn strip_bust_param(reference: &Reference, raw_query: &str) -> Result<Option<String>, Error> {
    let mut kept: Vec<&str> = Vec::new();
    let mut found = false;
    for param in raw_query.split('&') {
        if param == BUST_MARKER || param.strip_prefix("_cb_=").is_some() {
            found = true;
            continue;
        }
        kept.push(param);
    }
    if !found {
        return Err(contract(reference, "no bust parameter in query section"));
    }
    if kept.is_empty() {
        return Ok(None);
    }
    return Ok(Some(kept.join("&")));
}

/// `name.ext` → `name_cb_<token>.ext` on the logical path.
fn busted_path(reference: &Reference, token: &str) -> Result<String, Error> {
    let Some(dot) = reference.path.rfind('.') else {
        return Err(contract(reference, "path has no extension for a filename token"));
    };
    let stem = reference.path.get(..dot).unwrap_or("");
    let ext = reference.path.get(dot..).unwrap_or("");
    return Ok(format!("{stem}{BUST_MARKER}{token}{ext}"));
}

fn compose_plain(reference: &Reference, parts: &Decomposed) -> String {
    return match &parts.query {
        None => format!("{}{}", parts.head, reference.path),
        Some(q) => format!("{}{}?{q}", parts.head, reference.path),
    };
}

fn compose_filename(
    reference: &Reference,
    parts: &Decomposed,
    token: &str,
) -> Result<String, Error> {
    let path = busted_path(reference, token)?;
    return Ok(match &parts.query {
        None => format!("{}{path}", parts.head),
        Some(q) => format!("{}{path}?{q}", parts.head),
    });
}

/// Encode as a query-param reference. From plain, the token is appended to
/// any existing query; from a marked kind, the token goes first and the
/// unrelated parameters are reattached after it.
fn compose_query(reference: &Reference, parts: &Decomposed, token: &str) -> String {
    if reference.kind == RefKind::Plain {
        return match &parts.query {
            None => format!("{}{}?_cb_={token}", parts.head, reference.path),
            Some(q) => format!("{}{}?{q}&_cb_={token}", parts.head, reference.path),
        };
    }
    return match &parts.query {
        None => format!("{}{}?_cb_={token}", parts.head, reference.path),
        Some(q) => format!("{}{}?_cb_={token}&{q}", parts.head, reference.path),
    };
}

/// In-place token swap for a filename-embedded reference.
fn substitute_filename_token(reference: &Reference, new_token: &str) -> Result<String, Error> {
    let needle = format!("{BUST_MARKER}{}", reference.bust_code);
    if !reference.full_text.contains(&needle) {
        return Err(contract(reference, "embedded token not present in matched text"));
    }
    return Ok(reference
        .full_text
        .replace(&needle, &format!("{BUST_MARKER}{new_token}")));
}

/// In-place token swap for a query-param reference. Handles the bare
/// `_cb_` / `_cb_=` forms an earlier run may have left behind.
fn substitute_query_token(reference: &Reference, new_token: &str) -> Result<String, Error> {
    if !reference.bust_code.is_empty() {
        let needle = format!("_cb_={}", reference.bust_code);
        if !reference.full_text.contains(&needle) {
            return Err(contract(reference, "query token not present in matched text"));
        }
        return Ok(reference.full_text.replace(&needle, &format!("_cb_={new_token}")));
    }
    if reference.full_text.contains("_cb_=") {
        return Ok(reference.full_text.replace("_cb_=", &format!("_cb_={new_token}")));
    }
    if !reference.full_text.contains(BUST_MARKER) {
        return Err(contract(reference, "bust marker not present in matched text"));
    }
    return Ok(reference
        .full_text
        .replace(BUST_MARKER, &format!("_cb_={new_token}")));
}

fn contract(reference: &Reference, reason: &str) -> Error {
    return Error::RewriteContract {
        full_text: reference.full_text.clone(),
        reason: reason.to_string(),
    };
}
