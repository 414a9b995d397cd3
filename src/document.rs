//! Markdown documents with picture directives.
//!
//! A document is rendered in one pass:
//!
//! ```text
//! markdown ──split on blank lines──▶ blocks
//!   fenced code         → kept verbatim, never scanned
//!   [pic …] candidates  → scanned; accepted ones become a <figure> line
//!   everything else     → kept verbatim
//! ──pulldown-cmark──▶ HTML (+ JSON-LD <script> when enabled)
//! ```
//!
//! A block is a candidate when its first line starts with `[pic` and has a
//! closing `]` at least one character later. The directive is replaced by its
//! figure; any text after the closing bracket stays in the document as a
//! paragraph following the figure. Candidates without a `src`, whose tag
//! turns out to be something else (`[picture]`), or whose closing bracket sits
//! inside an unterminated quote, are declined: they stay in the document as
//! ordinary markdown and are counted in [`RenderedDocument::declined`].
//!
//! Each call to [`DocumentRenderer::render`] owns its own
//! [`PictureSequence`], so a renderer can be shared across threads.
//!
//! The second half of the module renders `.md` files from disk in parallel
//! (rayon), writing `<stem>.html` next to the source or into an output
//! directory.

use crate::config::{ConfigError, JsonLdConfig, PicmarkConfig};
use crate::jsonld::{self, ImageObject};
use crate::picture::{PictureContext, PictureSequence};
use crate::proxy::{ResizeSettings, SignerError, UrlSigner};
use crate::render;
use crate::scanner;
use pulldown_cmark::{Parser, html as md_html};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Tag name of the directive.
const DIRECTIVE_TAG: &str = "pic";

/// Extension of documents picked up when walking directories.
const MARKDOWN_EXT: &str = "md";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("output {} is also written by {}", output.display(), other.display())]
    OutputConflict { output: PathBuf, other: PathBuf },
    #[error("output {} would overwrite the input", output.display())]
    OverwritesInput { output: PathBuf },
    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        source: Box<RenderError>,
    },
}

/// Result of rendering one document.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedDocument {
    pub html: String,
    /// Accepted directives, in document order.
    pub pictures: Vec<PictureContext>,
    /// Structured-data records; empty when disabled.
    pub json_ld: Vec<ImageObject>,
    /// Directive candidates left as text.
    pub declined: usize,
}

/// Renders markdown documents. Holds only immutable settings.
#[derive(Debug, Clone)]
pub struct DocumentRenderer<'a> {
    signer: &'a UrlSigner,
    settings: ResizeSettings,
    json_ld: JsonLdConfig,
}

impl<'a> DocumentRenderer<'a> {
    pub fn new(signer: &'a UrlSigner, settings: ResizeSettings, json_ld: JsonLdConfig) -> Self {
        Self {
            signer,
            settings,
            json_ld,
        }
    }

    pub fn from_config(signer: &'a UrlSigner, config: &PicmarkConfig) -> Self {
        Self::new(
            signer,
            ResizeSettings::from_config(&config.images, &config.proxy),
            config.json_ld.clone(),
        )
    }

    /// Expand directives and render `markdown` to HTML.
    pub fn render(&self, markdown: &str) -> Result<RenderedDocument, RenderError> {
        let mut sequence = PictureSequence::new();
        let mut declined = 0;
        let mut out: Vec<String> = Vec::new();

        for block in split_blocks(markdown) {
            match block {
                Block::Verbatim(text) => out.push(text.to_string()),
                Block::Paragraph { text, line } if is_candidate(text) => {
                    let expanded = scanner::directive_end(text).and_then(|end| {
                        let (directive, rest) = text.split_at(end);
                        let figure = self.expand(directive, &mut sequence)?;
                        Some((figure, rest.trim()))
                    });
                    match expanded {
                        Some((figure, rest)) => {
                            // An HTML block only ends at a blank line.
                            out.push(format!("{figure}\n"));
                            if !rest.is_empty() {
                                out.push(rest.to_string());
                            }
                        }
                        None => {
                            tracing::warn!(line, block = text, "picture directive declined");
                            declined += 1;
                            out.push(text.to_string());
                        }
                    }
                }
                Block::Paragraph { text, .. } => out.push(text.to_string()),
            }
        }

        let expanded = out.join("\n");
        let mut html = String::new();
        md_html::push_html(&mut html, Parser::new(&expanded));

        let json_ld = if self.json_ld.enabled {
            jsonld::json_ld(sequence.pictures(), &self.json_ld, self.signer)
        } else {
            Vec::new()
        };
        if !json_ld.is_empty() {
            html.push_str(&render::render_json_ld(&json_ld)?.into_string());
            html.push('\n');
        }

        let pictures: Vec<PictureContext> =
            sequence.pictures().iter().map(|p| p.context()).collect();
        tracing::debug!(pictures = pictures.len(), declined, "rendered document");
        Ok(RenderedDocument {
            html,
            pictures,
            json_ld,
            declined,
        })
    }

    /// Figure markup for one candidate block, or `None` when declined.
    fn expand(&self, block: &str, sequence: &mut PictureSequence) -> Option<String> {
        let attributes = scanner::scan_tag(&scanner::normalize_delimiters(block), DIRECTIVE_TAG)?;
        let picture = sequence.accept(attributes, self.signer, &self.settings)?;
        Some(render::render_picture(&picture.context(), &self.settings.format).into_string())
    }
}

/// First line starts with `[pic` and closes with `]` at least one character later.
fn is_candidate(block: &str) -> bool {
    let first_line = block.lines().next().unwrap_or_default();
    first_line
        .strip_prefix("[pic")
        .is_some_and(|rest| rest.chars().skip(1).any(|c| c == ']'))
}

#[derive(Debug, PartialEq)]
enum Block<'a> {
    /// Blank lines and fenced code.
    Verbatim(&'a str),
    /// Consecutive non-blank lines; `line` is 1-based.
    Paragraph { text: &'a str, line: usize },
}

/// Split markdown into paragraphs, blank lines and fenced code blocks.
///
/// Joining the pieces with `\n` restores the input (minus a trailing newline).
fn split_blocks(markdown: &str) -> Vec<Block<'_>> {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut offsets = Vec::with_capacity(lines.len() + 1);
    let mut pos = 0;
    for line in &lines {
        offsets.push(pos);
        pos += line.len();
        // Skip the line terminator, which may be "\r\n".
        if markdown[pos..].starts_with("\r\n") {
            pos += 2;
        } else if markdown[pos..].starts_with('\n') {
            pos += 1;
        }
    }
    let span = |start: usize, end: usize| &markdown[offsets[start]..offsets[end - 1] + lines[end - 1].len()];

    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if let Some(fence) = Fence::open(lines[i]) {
            let mut end = i + 1;
            while end < lines.len() && !fence.closes(lines[end]) {
                end += 1;
            }
            let end = (end + 1).min(lines.len());
            blocks.push(Block::Verbatim(span(i, end)));
            i = end;
        } else if lines[i].trim().is_empty() {
            blocks.push(Block::Verbatim(lines[i]));
            i += 1;
        } else {
            let start = i;
            while i < lines.len()
                && !lines[i].trim().is_empty()
                && Fence::open(lines[i]).is_none()
            {
                i += 1;
            }
            blocks.push(Block::Paragraph {
                text: span(start, i),
                line: start + 1,
            });
        }
    }
    blocks
}

/// Opening code fence: three or more backticks or tildes.
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next().filter(|c| matches!(c, '`' | '~'))?;
        let len = trimmed.chars().take_while(|&c| c == marker).count();
        (len >= 3).then_some(Self { marker, len })
    }

    fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let len = trimmed.chars().take_while(|&c| c == self.marker).count();
        len >= self.len && trimmed.chars().all(|c| c == self.marker)
    }
}

// =============================================================================
// File rendering
// =============================================================================

/// Outcome of rendering one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub pictures: usize,
    pub declined: usize,
    pub json_ld: usize,
}

/// Expand `paths` into markdown files: files are kept, directories are walked.
///
/// Results are sorted and deduplicated.
pub fn collect_markdown(paths: &[PathBuf]) -> Result<Vec<PathBuf>, RenderError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(true) {
                let entry = entry?;
                let is_markdown = entry.path().extension().is_some_and(|e| e == MARKDOWN_EXT);
                if entry.file_type().is_file() && is_markdown {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Where the HTML for `input` goes: `<output_dir or input dir>/<stem>.html`.
pub fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_os_string();
    name.push(".html");
    let dir = output_dir.unwrap_or_else(|| input.parent().unwrap_or(Path::new("")));
    dir.join(name)
}

/// Render one markdown file to its HTML fragment.
pub fn render_file(
    renderer: &DocumentRenderer<'_>,
    input: &Path,
    output_dir: Option<&Path>,
) -> Result<FileReport, RenderError> {
    let wrap = |source: RenderError| RenderError::File {
        path: input.to_path_buf(),
        source: Box::new(source),
    };
    let output = output_path(input, output_dir);
    if output == input {
        return Err(wrap(RenderError::OverwritesInput { output }));
    }
    let markdown = fs::read_to_string(input).map_err(|e| wrap(e.into()))?;
    let document = renderer.render(&markdown).map_err(wrap)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| wrap(e.into()))?;
    }
    fs::write(&output, &document.html).map_err(|e| wrap(e.into()))?;
    tracing::info!(input = %input.display(), output = %output.display(), "rendered");
    Ok(FileReport {
        input: input.to_path_buf(),
        output,
        pictures: document.pictures.len(),
        declined: document.declined,
        json_ld: document.json_ld.len(),
    })
}

/// Render every file in parallel. Reports keep the input order.
///
/// Inputs that would write the same output file fail without writing, so
/// no document silently replaces another.
pub fn render_files(
    renderer: &DocumentRenderer<'_>,
    inputs: &[PathBuf],
    output_dir: Option<&Path>,
) -> Vec<Result<FileReport, RenderError>> {
    let mut writers: HashMap<PathBuf, Vec<&Path>> = HashMap::new();
    for input in inputs {
        writers
            .entry(output_path(input, output_dir))
            .or_default()
            .push(input);
    }
    inputs
        .par_iter()
        .map(|input| {
            let output = output_path(input, output_dir);
            let other = writers
                .get(&output)
                .and_then(|paths| paths.iter().find(|&&p| p != input.as_path()));
            match other {
                Some(other) => Err(RenderError::File {
                    path: input.clone(),
                    source: Box::new(RenderError::OutputConflict {
                        output,
                        other: other.to_path_buf(),
                    }),
                }),
                None => render_file(renderer, input, output_dir),
            }
        })
        .collect()
}
