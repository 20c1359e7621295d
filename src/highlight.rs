//! Syntax highlighting for fenced code blocks using syntect.
//!
//! Highlighting runs on the Markdown source, before rendering: each fenced
//! block is swapped for a `<pre>` element with inline styles. CommonMark
//! passes a block that opens with `<pre` through verbatim up to its `</pre>`,
//! so the Markdown renderer leaves the result alone.

use crate::build::{Result, Stage};
use crate::config::HighlightConfig;
use crate::document::Site;
use crate::markdown::{options, MARKDOWN_EXTENSIONS};
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag};
use std::fmt;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::OnceLock;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();

fn syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme_set() -> &'static ThemeSet {
    THEME_SET.get_or_init(ThemeSet::load_defaults)
}

/// Highlights the fenced code blocks of every Markdown document.
pub struct Highlight {
    theme: &'static Theme,
}

impl Highlight {
    /// Looks up the configured theme among syntect's bundled themes.
    pub fn new(config: &HighlightConfig) -> std::result::Result<Highlight, Error> {
        match theme_set().themes.get(&config.theme) {
            Some(theme) => Ok(Highlight { theme }),
            None => Err(Error::UnknownTheme(config.theme.clone())),
        }
    }

    /// Rewrites `markdown`, replacing each top-level fenced code block that
    /// names a language with highlighted HTML.
    pub fn highlight(&self, markdown: &str) -> std::result::Result<String, syntect::Error> {
        let blocks = fenced_blocks(markdown);
        if blocks.is_empty() {
            return Ok(markdown.to_owned());
        }

        let mut out = String::with_capacity(markdown.len() * 2);
        let mut cursor = 0;
        for block in blocks {
            out.push_str(&markdown[cursor..block.range.start]);
            out.push_str(&self.highlight_code(&block.code, &block.lang)?);
            if !out.ends_with('\n') {
                out.push('\n');
            }
            cursor = block.range.end;
        }
        out.push_str(&markdown[cursor..]);
        Ok(out)
    }

    fn highlight_code(&self, code: &str, lang: &str) -> std::result::Result<String, syntect::Error> {
        let ss = syntax_set();
        let syntax = ss
            .find_syntax_by_token(lang)
            .or_else(|| ss.find_syntax_by_extension(lang))
            .unwrap_or_else(|| ss.find_syntax_plain_text());
        highlighted_html_for_string(code, ss, syntax, self.theme)
    }
}

impl Stage for Highlight {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn run(&self, site: &mut Site) -> Result<()> {
        for (key, document) in site.files.iter_mut() {
            if !document.has_extension(MARKDOWN_EXTENSIONS) {
                continue;
            }
            let highlighted = {
                let markdown = document
                    .text()
                    .map_err(|_| Error::NotUtf8(key.clone()))?;
                self.highlight(markdown).map_err(|err| Error::Syntect {
                    path: key.clone(),
                    err,
                })?
            };
            document.contents = highlighted.into_bytes();
        }
        Ok(())
    }
}

struct FencedBlock {
    range: Range<usize>,
    lang: String,
    code: String,
}

// Collects the fenced code blocks with a language tag that aren't nested in
// a container; replacing a nested block would break the container's
// indentation or `>` prefixes.
fn fenced_blocks(markdown: &str) -> Vec<FencedBlock> {
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<FencedBlock> = None;

    for (event, range) in Parser::new_ext(markdown, options()).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) if depth == 0 => {
                let lang = info.split_whitespace().next().unwrap_or("").to_owned();
                if !lang.is_empty() {
                    current = Some(FencedBlock {
                        range,
                        lang,
                        code: String::new(),
                    });
                }
            }
            Event::Text(text) => {
                if let Some(block) = current.as_mut() {
                    block.code.push_str(&text);
                }
            }
            Event::End(Tag::CodeBlock(_)) => {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
            }
            Event::Start(container) if is_container(&container) => depth += 1,
            Event::End(container) if is_container(&container) => {
                depth = depth.saturating_sub(1)
            }
            _ => {}
        }
    }
    blocks
}

fn is_container(tag: &Tag) -> bool {
    matches!(
        tag,
        Tag::BlockQuote | Tag::List(_) | Tag::Item | Tag::FootnoteDefinition(_)
    )
}

/// Represents an error highlighting code.
#[derive(Debug)]
pub enum Error {
    /// Returned when the configured theme isn't bundled with syntect.
    UnknownTheme(String),

    /// Returned when a Markdown document isn't valid UTF-8.
    NotUtf8(PathBuf),

    /// Returned when syntect fails to highlight a block.
    Syntect { path: PathBuf, err: syntect::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnknownTheme(theme) => write!(f, "Unknown highlighting theme `{}`", theme),
            Error::NotUtf8(path) => write!(f, "'{}' is not valid UTF-8", path.display()),
            Error::Syntect { path, err } => {
                write!(f, "Highlighting '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::UnknownTheme(_) => None,
            Error::NotUtf8(_) => None,
            Error::Syntect { path: _, err } => Some(err),
        }
    }
}
