use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render a fatal error as valid markdown with bold headings and print to
/// stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic: what happened and,
/// where there is one, the fix.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::ConfigNotFound { path } => format!(
            "\
# Error: Config Not Found

`{}` does not exist.

## Fix

Generate a starter configuration:

    cachebust <root> init
",
            path.display()
        ),

        Error::InvalidConfig { reason } => format!(
            "\
# Error: Invalid Config

{reason}

## Fix

Correct the offending key in `cachebust.toml`.
"
        ),

        Error::RootNotFound { path } => format!(
            "\
# Error: Invalid Project Root

`{}` does not exist or is not a directory.
",
            path.display()
        ),

        Error::RewriteContract { full_text, reason } => format!(
            "\
# Error: Rewrite Contract Violated

{reason}:

    {full_text}

This reference was parsed inconsistently — a defect, not a project
problem. No files were corrupted; the run stopped instead.
"
        ),

        Error::TomlDe(e) => format!(
            "\
# Error: Invalid TOML

{e}
"
        ),

        Error::Undecodable { path } => format!(
            "\
# Error: Undecodable File

`{}` is not valid UTF-8.
",
            path.display()
        ),

        Error::Io(e) => format!(
            "\
# Error: I/O

{e}
"
        ),
    }
}
