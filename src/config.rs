use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::hasher::{HashAlgorithm, TokenSpec};
use crate::types::RefKind;

/// Fingerprint component never exceeds this many characters; the rest of the
/// token budget goes to the content digest.
const MAX_STAT_LEN: u32 = 4;

/// Upper bound on the total token length. The marked-reference patterns
/// accept at most 16 token characters, so longer tokens would be truncated
/// on re-parse and busting would never converge.
const MAX_TOKEN_LEN: u32 = 16;

/// Project configuration loaded from `cachebust.toml`.
///
/// Filetype lists and ignore globs feed the walker's matchers; hash settings
/// feed the token generator; `multibust` feeds the expander.
#[derive(Debug)]
pub struct Config {
    /// Content-hash algorithm, already resolved (with fallback applied).
    pub algorithm: HashAlgorithm,
    /// Root-relative directories scanned for code files.
    pub code_dirs: Vec<String>,
    /// Extensions (with leading dot) of files scanned for references.
    pub code_filetypes: Vec<String>,
    /// Set when the configured `hash_function` was unknown and the
    /// non-cryptographic fallback was substituted; holds the original name.
    pub fallback_from: Option<String>,
    /// Digest component length: `token_length - stat_length`.
    pub hash_len: u32,
    /// Glob patterns for directories excluded from all scans.
    pub ignore_dirs: Vec<String>,
    /// Marker literal → ordered replacement list for multibust expansion.
    /// Ordered map so expansion output is deterministic.
    pub multibust: BTreeMap<String, Vec<String>>,
    /// Fingerprint component length: `min(4, token_length / 2)`.
    pub stat_len: u32,
    /// Root-relative directories scanned for static assets.
    pub static_dirs: Vec<String>,
    /// Extensions (with leading dot) of files treated as static assets.
    pub static_filetypes: Vec<String>,
    /// Rewrite target kind for fresh (plain) references.
    pub target: RefKind,
    /// Total bust-token length.
    pub token_length: u32,
}

/// Raw TOML structure for `cachebust.toml`. Every key is optional; absent
/// keys take the defaults below.
#[derive(serde::Deserialize)]
struct RawConfig {
    #[serde(default = "default_code_dirs")]
    code_dirs: Vec<String>,
    #[serde(default = "default_code_filetypes")]
    code_filetypes: Vec<String>,
    #[serde(default = "default_encoding")]
    file_encoding: String,
    #[serde(default = "default_hash_function")]
    hash_function: String,
    #[serde(default = "default_hash_length")]
    hash_length: u32,
    #[serde(default = "default_ignore_dirs")]
    ignore_dirs: Vec<String>,
    #[serde(default)]
    multibust: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_static_dirs")]
    static_dirs: Vec<String>,
    #[serde(default = "default_static_filetypes")]
    static_filetypes: Vec<String>,
    #[serde(default = "default_target")]
    target: String,
}

fn default_code_dirs() -> Vec<String> {
    return vec![".".to_string()];
}

/// The original tool's code filetype table: anything that plausibly embeds
/// an asset URL.
pub(crate) fn default_code_filetypes() -> Vec<String> {
    return [
        ".htm", ".html", ".jade", ".erb", ".haml", ".txt", ".md",
        ".css", ".sass", ".less", ".scss",
        ".xml", ".json", ".yaml", ".cfg", ".ini",
        ".js", ".coffee", ".dart", ".ts",
        ".py", ".rb", ".php", ".java", ".pl", ".cs", ".lua",
    ]
    .iter()
    .map(|s| return (*s).to_string())
    .collect();
}

fn default_encoding() -> String {
    return "utf-8".to_string();
}

fn default_hash_function() -> String {
    return "sha256".to_string();
}

fn default_hash_length() -> u32 {
    return 8;
}

pub(crate) fn default_ignore_dirs() -> Vec<String> {
    return ["*lib/*", "*lib64/*", "*.git/*", "*.hg/*", "*.svn/*"]
        .iter()
        .map(|s| return (*s).to_string())
        .collect();
}

fn default_static_dirs() -> Vec<String> {
    return vec![".".to_string()];
}

pub(crate) fn default_static_filetypes() -> Vec<String> {
    return [
        ".png", ".gif", ".jpg", ".jpeg", ".ico", ".webp", ".svg",
        ".js", ".css", ".swf",
        ".mov", ".avi", ".mp4", ".webm", ".ogg",
        ".wav", ".mp3", ".ogv", ".opus",
    ]
    .iter()
    .map(|s| return (*s).to_string())
    .collect();
}

fn default_target() -> String {
    return "querystring".to_string();
}

impl Config {
    /// Locate the config file: an explicit `--cfg` path as given, falling
    /// back to that path under the root, else `cachebust.toml` in the root.
    pub fn locate(root: &Path, cfg_arg: Option<&Path>) -> PathBuf {
        let Some(arg) = cfg_arg else {
            return root.join("cachebust.toml");
        };
        if arg.exists() {
            return arg.to_path_buf();
        }
        return root.join(arg);
    }

    /// Load and validate configuration from a TOML file.
    ///
    /// A missing file is an error — `update` and `rewrite` never run on
    /// silent defaults; `init` writes the file in the first place.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` if the file doesn't exist,
    /// `Error::Io` for other read failures, `Error::TomlDe` for malformed
    /// TOML, or `Error::InvalidConfig` for structurally invalid settings.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        let raw: RawConfig = toml::from_str(&content)?;
        return Self::from_raw(raw);
    }

    /// Validate raw settings and resolve derived values.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for a token length outside 1..=16, an
    /// unsupported file encoding, or an unknown rewrite target.
    fn from_raw(raw: RawConfig) -> Result<Self, Error> {
        if raw.hash_length == 0 || raw.hash_length > MAX_TOKEN_LEN {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "hash_length must be between 1 and {MAX_TOKEN_LEN}, got {}",
                    raw.hash_length
                ),
            });
        }

        let normalized_enc = raw.file_encoding.to_ascii_lowercase();
        if normalized_enc != "utf-8" && normalized_enc != "utf8" {
            return Err(Error::InvalidConfig {
                reason: format!("unsupported file_encoding `{}` (only utf-8)", raw.file_encoding),
            });
        }

        let target = match raw.target.as_str() {
            "filename" => RefKind::FilenameEmbedded,
            "querystring" => RefKind::QueryParam,
            other => {
                return Err(Error::InvalidConfig {
                    reason: format!("target must be `querystring` or `filename`, got `{other}`"),
                });
            },
        };

        // Unknown algorithm names degrade to the non-cryptographic checksum
        // rather than failing the run.
        let (algorithm, fallback_from) = match HashAlgorithm::from_name(&raw.hash_function) {
            None => (HashAlgorithm::Xxh3, Some(raw.hash_function.clone())),
            Some(algo) => (algo, None),
        };

        let stat_len = MAX_STAT_LEN.min(raw.hash_length / 2);
        let hash_len = raw.hash_length.saturating_sub(stat_len);

        return Ok(Self {
            algorithm,
            code_dirs: raw.code_dirs,
            code_filetypes: raw.code_filetypes,
            fallback_from,
            hash_len,
            ignore_dirs: raw.ignore_dirs,
            multibust: raw.multibust,
            stat_len,
            static_dirs: raw.static_dirs,
            static_filetypes: raw.static_filetypes,
            target,
            token_length: raw.hash_length,
        });
    }

    /// Token length/algorithm parameters for the hasher.
    pub fn token_spec(&self) -> TokenSpec {
        return TokenSpec {
            algorithm: self.algorithm,
            hash_len: self.hash_len,
            stat_len: self.stat_len,
            total_len: self.token_length,
        };
    }
}
