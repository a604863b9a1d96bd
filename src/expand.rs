//! Multi-path expansion for multibust markers.
//!
//! A reference like `/static/i18n_${lang}.png` stands for every language
//! variant at once; the bust token must change when any variant changes, so
//! the expander turns one symbolic path into the full candidate set.

use std::collections::BTreeMap;

/// Expand a reference path using the marker table.
///
/// For each marker whose literal text occurs in the path, one variant per
/// replacement is added, substituting that marker only (markers never
/// cross-multiply). The original, unexpanded path is always a member, so a
/// reference to a literal file containing marker-like text still resolves.
///
/// The result is ordered (`BTreeMap`-backed set semantics via sorted keys)
/// so downstream token computation is deterministic.
pub fn expand(path: &str, markers: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    // Common case: nothing configured, or nothing applicable.
    if markers.is_empty() || !markers.keys().any(|m| return path.contains(m.as_str())) {
        return vec![path.to_string()];
    }

    let mut variants: Vec<String> = vec![path.to_string()];
    for (marker, replacements) in markers {
        if !path.contains(marker.as_str()) {
            continue;
        }
        for replacement in replacements {
            let variant = path.replace(marker.as_str(), replacement);
            if !variants.contains(&variant) {
                variants.push(variant);
            }
        }
    }

    return variants;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_table() -> BTreeMap<String, Vec<String>> {
        let mut markers = BTreeMap::new();
        markers.insert(
            "${foo}".to_string(),
            vec!["exp_a".to_string(), "exp_b".to_string()],
        );
        markers.insert(
            "{{bar}}".to_string(),
            vec!["exp_c".to_string(), "exp_d".to_string(), "exp_e".to_string()],
        );
        markers
    }

    #[test]
    fn no_markers_is_identity() {
        let paths = expand("/static/app.js", &BTreeMap::new());
        assert_eq!(paths, vec!["/static/app.js".to_string()]);
    }

    #[test]
    fn inapplicable_markers_are_identity() {
        let paths = expand("/static/app.js", &marker_table());
        assert_eq!(paths, vec!["/static/app.js".to_string()]);
    }

    #[test]
    fn applicable_marker_unions_variants() {
        let paths = expand("/static/foo_${foo}.png", &marker_table());
        assert_eq!(paths.len(), 3);
        assert!(paths.contains(&"/static/foo_${foo}.png".to_string()));
        assert!(paths.contains(&"/static/foo_exp_a.png".to_string()));
        assert!(paths.contains(&"/static/foo_exp_b.png".to_string()));
    }

    #[test]
    fn three_replacements_yield_four_paths() {
        let paths = expand("/static/bar_{{bar}}.js", &marker_table());
        assert_eq!(paths.len(), 4);
        assert!(paths.contains(&"/static/bar_{{bar}}.js".to_string()));
        assert!(paths.contains(&"/static/bar_exp_c.js".to_string()));
        assert!(paths.contains(&"/static/bar_exp_d.js".to_string()));
        assert!(paths.contains(&"/static/bar_exp_e.js".to_string()));
    }

    #[test]
    fn markers_do_not_cross_multiply() {
        let paths = expand("/s/${foo}_{{bar}}.js", &marker_table());
        // Original + 2 for ${foo} + 3 for {{bar}}; no combined substitutions.
        assert_eq!(paths.len(), 6);
        assert!(paths.contains(&"/s/exp_a_{{bar}}.js".to_string()));
        assert!(paths.contains(&"/s/${foo}_exp_e.js".to_string()));
        assert!(!paths.contains(&"/s/exp_a_exp_c.js".to_string()));
    }
}
