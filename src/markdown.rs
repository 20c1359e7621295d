//! Renders Markdown documents to HTML.

use crate::build::{Result, Stage};
use crate::document::Site;
use pulldown_cmark::{html, Options, Parser};
use std::fmt;
use std::path::PathBuf;

/// The extensions that mark a document as Markdown.
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// The Markdown extensions enabled for every document.
pub fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Converts markdown to HTML, appending the result to `out`.
pub fn to_html(out: &mut String, markdown: &str) {
    html::push_html(out, Parser::new_ext(markdown, options()));
}

/// Renders every Markdown document and renames it from `.md` to `.html`.
#[derive(Default)]
pub struct Markdown;

impl Stage for Markdown {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn run(&self, site: &mut Site) -> Result<()> {
        for (key, document) in site.files.iter_mut() {
            if !document.has_extension(MARKDOWN_EXTENSIONS) {
                continue;
            }
            let mut body = String::new();
            to_html(
                &mut body,
                document.text().map_err(|_| Error(key.clone()))?,
            );
            document.contents = body.into_bytes();
            document.path.set_extension("html");
        }
        Ok(())
    }
}

/// Returned when a Markdown document isn't valid UTF-8.
#[derive(Debug)]
pub struct Error(pub PathBuf);

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Markdown file '{}' is not valid UTF-8", self.0.display())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::Document;
    use std::path::Path;

    #[test]
    fn test_renders_and_renames() -> Result<()> {
        let mut site = Site::default();
        site.insert(Document {
            path: PathBuf::from("blog/post.md"),
            contents: b"# Title\n\nSome *text*.\n".to_vec(),
            ..Document::default()
        });
        site.insert(Document {
            path: PathBuf::from("style.css"),
            contents: b"*{}".to_vec(),
            ..Document::default()
        });
        Markdown.run(&mut site)?;

        let post = &site.files[Path::new("blog/post.md")];
        assert_eq!(PathBuf::from("blog/post.html"), post.path);
        assert_eq!(
            "<h1>Title</h1>\n<p>Some <em>text</em>.</p>\n",
            post.text().unwrap()
        );

        let css = &site.files[Path::new("style.css")];
        assert_eq!(PathBuf::from("style.css"), css.path);
        assert_eq!(b"*{}".to_vec(), css.contents);
        Ok(())
    }

    #[test]
    fn test_extensions_enabled() {
        let mut out = String::new();
        to_html(&mut out, "| a |\n|---|\n| b |\n\n~~gone~~ \"quoted\"\n");
        assert!(out.contains("<table>"));
        assert!(out.contains("<del>gone</del>"));
        assert!(out.contains("\u{201c}quoted\u{201d}"));
    }

    #[test]
    fn test_binary_markdown_is_an_error() {
        let mut site = Site::default();
        site.insert(Document {
            path: PathBuf::from("bad.md"),
            contents: vec![0xff, 0xfe],
            ..Document::default()
        });
        assert!(Markdown.run(&mut site).is_err());
    }
}
