/// Crate-level error types for cachebust diagnostics.
use std::path::PathBuf;

/// All errors carry enough context to produce a useful diagnostic without a
/// debugger. Per-reference and per-file problems are recovered locally by the
/// orchestrator; configuration and contract violations abort the run.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The project configuration file does not exist on disk.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path that was tried for the config file.
        path: PathBuf,
    },

    /// Structurally invalid configuration — aborts before any scan begins.
    #[error("invalid config: {reason}")]
    InvalidConfig {
        /// Description of the structural problem.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// A reference's captured text is inconsistent with its declared kind.
    /// This is a programming-contract violation, not a recoverable runtime
    /// error — the rewriter's input must come from the reference parser.
    #[error("rewrite contract violated: {reason}: `{full_text}`")]
    RewriteContract {
        /// The offending reference text.
        full_text: String,
        /// Which invariant the captured groups broke.
        reason: String,
    },

    /// The given project root does not exist or is not a directory.
    #[error("invalid project root: {}", path.display())]
    RootNotFound {
        /// The path that was given as project root.
        path: PathBuf,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// A candidate code file is not valid UTF-8 and cannot be scanned.
    #[error("undecodable file: {}", path.display())]
    Undecodable {
        /// The file that failed to decode.
        path: PathBuf,
    },
}
