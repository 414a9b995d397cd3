//! CLI output formatting for all commands.
//!
//! # Information-First Display
//!
//! Every entity leads with its positional index and name; details follow on
//! indented context lines. The same two-level pattern is used by every
//! command so reports read alike.
//!
//! # Output Format
//!
//! ## Render
//!
//! ```text
//! 001 posts/istanbul.md → dist/istanbul.html
//!     Pictures: 12
//!     JSON-LD: 10 records
//!     Declined: 1
//! 002 posts/broken.md
//!     Error: posts/broken.md: IO error: permission denied
//!
//! Rendered 1 document, 12 pictures (1 declined, 1 failed)
//! ```
//!
//! ## Check
//!
//! ```text
//! Proxy
//!     Host: img.example.com
//!     Namespace: photos
//!     Sources: base64
//! Images
//!     Breakpoints: 320, 480, 640, 800, 960, 1024, 1280
//!     Max width: 1400px
//!     Density: 2x
//!     Formats: webp, fallback jpg
//! JSON-LD
//!     Enabled, up to 10 records at 1000px
//!
//! Configuration is valid
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::PicmarkConfig;
use crate::document::{FileReport, RenderError};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `n thing` / `n things`.
fn plural(n: usize, singular: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {singular}s")
    }
}

/// Comma-joined list of numbers, or `none`.
fn join_numbers(values: &[u32], suffix: &str) -> String {
    if values.is_empty() {
        return "none".to_string();
    }
    values
        .iter()
        .map(|v| format!("{v}{suffix}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Render output
// ============================================================================

/// Format the results of a render run, one entity per input file.
pub fn format_render_output(results: &[Result<FileReport, RenderError>]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rendered = 0;
    let mut pictures = 0;
    let mut declined = 0;
    let mut failed = 0;

    for (i, result) in results.iter().enumerate() {
        match result {
            Ok(report) => {
                rendered += 1;
                pictures += report.pictures;
                declined += report.declined;
                lines.push(format!(
                    "{} {} → {}",
                    format_index(i + 1),
                    report.input.display(),
                    report.output.display()
                ));
                lines.push(format!("{}Pictures: {}", indent(1), report.pictures));
                if report.json_ld > 0 {
                    lines.push(format!(
                        "{}JSON-LD: {}",
                        indent(1),
                        plural(report.json_ld, "record")
                    ));
                }
                if report.declined > 0 {
                    lines.push(format!("{}Declined: {}", indent(1), report.declined));
                }
            }
            Err(err) => {
                failed += 1;
                let name = match err {
                    RenderError::File { path, .. } => format!(" {}", path.display()),
                    _ => String::new(),
                };
                lines.push(format!("{}{}", format_index(i + 1), name));
                lines.push(format!("{}Error: {}", indent(1), err));
            }
        }
    }

    let mut problems = Vec::new();
    if declined > 0 {
        problems.push(format!("{declined} declined"));
    }
    if failed > 0 {
        problems.push(format!("{failed} failed"));
    }
    let detail = if problems.is_empty() {
        String::new()
    } else {
        format!(" ({})", problems.join(", "))
    };
    lines.push(String::new());
    lines.push(format!(
        "Rendered {}, {}{}",
        plural(rendered, "document"),
        plural(pictures, "picture"),
        detail
    ));
    lines
}

/// Print render output to stdout.
pub fn print_render_output(results: &[Result<FileReport, RenderError>]) {
    for line in format_render_output(results) {
        println!("{}", line);
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Format the effective configuration. Secrets are never shown.
pub fn format_check_output(config: &PicmarkConfig) -> Vec<String> {
    let proxy = &config.proxy;
    let images = &config.images;
    let json_ld = &config.json_ld;
    let i1 = indent(1);

    let mut lines = vec![
        "Proxy".to_string(),
        format!("{i1}Host: {}", proxy.host),
        format!("{i1}Namespace: {}", proxy.namespace),
        format!(
            "{i1}Sources: {}",
            if proxy.plain_source_url { "plain" } else { "base64" }
        ),
        "Images".to_string(),
        format!("{i1}Breakpoints: {}", join_numbers(&images.breakpoints, "")),
        format!("{i1}Max width: {}px", images.max_width),
        format!("{i1}Density: {}", join_numbers(&images.density_factors, "x")),
        format!(
            "{i1}Formats: {}, fallback {}",
            images.format, images.fallback_format
        ),
        "JSON-LD".to_string(),
    ];
    if json_ld.enabled {
        lines.push(format!(
            "{i1}Enabled, up to {} at {}px",
            plural(json_ld.max_items, "record"),
            json_ld.image_width
        ));
        if !json_ld.author.is_empty() {
            lines.push(format!("{i1}Author: {}", json_ld.author));
        }
    } else {
        lines.push(format!("{i1}Disabled"));
    }
    lines.push(String::new());
    lines.push("Configuration is valid".to_string());
    lines
}

/// Print check output to stdout.
pub fn print_check_output(config: &PicmarkConfig) {
    for line in format_check_output(config) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_config;
    use std::path::PathBuf;

    fn report(input: &str, pictures: usize, declined: usize) -> FileReport {
        FileReport {
            input: PathBuf::from(input),
            output: PathBuf::from(input).with_extension("html"),
            pictures,
            declined,
            json_ld: pictures.min(10),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads_to_three() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "picture"), "1 picture");
        assert_eq!(plural(0, "picture"), "0 pictures");
        assert_eq!(plural(3, "record"), "3 records");
    }

    #[test]
    fn join_numbers_with_suffix() {
        assert_eq!(join_numbers(&[2, 3], "x"), "2x, 3x");
        assert_eq!(join_numbers(&[], ""), "none");
    }

    // =========================================================================
    // Render output
    // =========================================================================

    #[test]
    fn render_output_lists_files() {
        let results = vec![Ok(report("a.md", 3, 0)), Ok(report("b.md", 1, 1))];
        let lines = format_render_output(&results);
        assert_eq!(lines[0], "001 a.md → a.html");
        assert_eq!(lines[1], "    Pictures: 3");
        assert_eq!(lines[2], "    JSON-LD: 3 records");
        assert_eq!(lines[3], "002 b.md → b.html");
        assert!(lines.contains(&"    Declined: 1".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "Rendered 2 documents, 4 pictures (1 declined)"
        );
    }

    #[test]
    fn render_output_shows_errors() {
        let err = RenderError::File {
            path: PathBuf::from("bad.md"),
            source: Box::new(RenderError::Io(std::io::Error::other("denied"))),
        };
        let results = vec![Ok(report("a.md", 1, 0)), Err(err)];
        let lines = format_render_output(&results);
        assert!(lines.contains(&"002 bad.md".to_string()));
        assert!(lines.contains(&"    Error: bad.md: IO error: denied".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "Rendered 1 document, 1 picture (1 failed)"
        );
    }

    #[test]
    fn render_output_empty_run() {
        let lines = format_render_output(&[]);
        assert_eq!(lines, vec!["".to_string(), "Rendered 0 documents, 0 pictures".to_string()]);
    }

    // =========================================================================
    // Check output
    // =========================================================================

    #[test]
    fn check_output_shows_settings_without_secrets() {
        let config = test_config();
        let lines = format_check_output(&config);
        assert!(lines.contains(&"    Host: img.example.com".to_string()));
        assert!(lines.contains(&"    Sources: base64".to_string()));
        assert!(lines.contains(&"    Breakpoints: 320, 480, 640, 800, 960, 1024, 1280".to_string()));
        assert!(lines.contains(&"    Density: 2x".to_string()));
        assert!(lines.contains(&"    Enabled, up to 10 records at 1000px".to_string()));
        let joined = lines.join("\n");
        assert!(!joined.contains(&config.proxy.key));
        assert!(!joined.contains(&config.proxy.salt));
    }

    #[test]
    fn check_output_disabled_json_ld() {
        let mut config = test_config();
        config.json_ld.enabled = false;
        config.json_ld.author = "Jane".into();
        let lines = format_check_output(&config);
        assert!(lines.contains(&"    Disabled".to_string()));
        assert!(!lines.iter().any(|l| l.contains("Jane")));
    }
}
