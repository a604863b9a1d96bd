mod commands;
mod config;
mod diagnostics;
mod error;
mod expand;
mod hasher;
mod matcher;
mod report;
mod resolver;
mod rewriter;
mod scanner;
mod types;
mod walker;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::report::Verbosity;
use crate::types::RefKind;

#[derive(Parser)]
#[command(
    name = "cachebust",
    about = "Content-derived cachebust tokens for static asset references"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the project and write a starter cachebust.toml
    Init {
        /// Project root directory.
        #[arg(default_value = ".")]
        root: PathBuf,
    },
    /// Bust plain references too, converting them to the target encoding
    Rewrite {
        /// Project root directory.
        #[arg(default_value = ".")]
        root: PathBuf,
        #[command(flatten)]
        options: ScanArgs,
    },
    /// List the directories a run would scan
    Scan {
        /// Project root directory.
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Path to the configuration file.
        #[arg(long)]
        cfg: Option<PathBuf>,
    },
    /// Refresh tokens on references that already carry a bust marker
    Update {
        /// Project root directory.
        #[arg(default_value = ".")]
        root: PathBuf,
        #[command(flatten)]
        options: ScanArgs,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Path to the configuration file.
    #[arg(long)]
    cfg: Option<PathBuf>,
    /// Rewrite references to embed the token in the filename.
    #[arg(long, conflicts_with = "querystring")]
    filename: bool,
    /// Update tokens even when the fingerprint fast path says unchanged.
    #[arg(short, long)]
    force: bool,
    /// Emit the report as JSON.
    #[arg(long)]
    json: bool,
    /// Report changes without writing any file.
    #[arg(short = 'n', long)]
    no_act: bool,
    /// Errors only.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
    /// Rewrite references to carry the token as a query parameter.
    #[arg(long)]
    querystring: bool,
    /// Also list references that were visited but left unchanged.
    #[arg(short, long)]
    verbose: bool,
}

impl ScanArgs {
    fn into_options(self) -> commands::ScanOptions {
        let target_override = if self.filename {
            Some(RefKind::FilenameEmbedded)
        } else if self.querystring {
            Some(RefKind::QueryParam)
        } else {
            None
        };
        let verbosity = if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        return commands::ScanOptions {
            cfg: self.cfg,
            force: self.force,
            json: self.json,
            no_act: self.no_act,
            target_override,
            verbosity,
        };
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { root } => commands::init(&root).map(|()| return ExitCode::SUCCESS),
        Commands::Rewrite { root, options } => commands::rewrite(&root, &options.into_options()),
        Commands::Scan { root, cfg } => {
            commands::scan(&root, cfg.as_deref()).map(|()| return ExitCode::SUCCESS)
        },
        Commands::Update { root, options } => commands::update(&root, &options.into_options()),
    };

    return match result {
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
        Ok(code) => code,
    };
}
