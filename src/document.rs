//! Defines the [`Document`] and [`Site`] types which every stage of the
//! pipeline operates on, along with front matter parsing.

use crate::sort::Dated;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Front matter attributes, keyed by name.
pub type Metadata = BTreeMap<String, Value>;

/// A single file flowing through the pipeline. Markdown posts, templates'
/// outputs and static assets are all documents; assets simply pass through
/// untouched.
#[derive(Clone, Debug, Default)]
pub struct Document {
    /// The current output path relative to the destination directory.
    /// Stages rename this (`foo.md` becomes `foo.html`, then
    /// `blog/foo/index.html`).
    pub path: PathBuf,

    /// The body of the file with any front matter removed.
    pub contents: Vec<u8>,

    /// The parsed front matter, empty for files without any.
    pub metadata: Metadata,

    /// The summary shown on listing pages. Set by
    /// [`crate::excerpt::Excerpts`].
    pub excerpt: Option<String>,

    /// The directory-style URL path of the document (e.g. `blog/hello`).
    /// Set by [`crate::permalink::Permalinks`].
    pub permalink: Option<String>,

    /// The names of the collections this document belongs to.
    pub collections: Vec<String>,
}

impl Document {
    /// Builds a document from a source file's raw bytes, splitting off the
    /// front matter if the file has any. Files that aren't UTF-8 are never
    /// inspected for front matter.
    pub fn parse(path: &Path, raw: Vec<u8>) -> Result<Document> {
        let (metadata, contents) = match std::str::from_utf8(&raw) {
            Ok(text) => match split_frontmatter(text)? {
                Some((yaml, body)) => (parse_yaml(yaml)?, body.as_bytes().to_vec()),
                None => (Metadata::new(), raw),
            },
            Err(_) => (Metadata::new(), raw),
        };

        Ok(Document {
            path: path.to_owned(),
            contents,
            metadata,
            ..Document::default()
        })
    }

    /// Looks up a string-valued front matter attribute.
    pub fn str_attr(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// The `title` attribute, if any.
    pub fn title(&self) -> Option<&str> {
        self.str_attr("title")
    }

    /// The `tags` attribute. Either a YAML list or a comma-separated string
    /// is accepted; blank entries are dropped.
    pub fn tags(&self) -> Vec<String> {
        let clean = |s: &str| Some(s.trim().to_owned()).filter(|s| !s.is_empty());
        match self.metadata.get("tags") {
            Some(Value::Sequence(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => clean(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) => s.split(',').filter_map(clean).collect(),
            _ => Vec::new(),
        }
    }

    /// Returns `false` only if the attribute is explicitly set to `false`.
    pub fn enabled(&self, key: &str) -> bool {
        !matches!(self.metadata.get(key), Some(Value::Bool(false)))
    }

    /// The contents as text. Fails for binary documents.
    pub fn text(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.contents)
    }

    /// Returns true if the document's current output path has one of the
    /// given extensions.
    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        match self.path.extension().and_then(|e| e.to_str()) {
            Some(ext) => extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }

    /// Returns true if the document is (currently) an HTML page.
    pub fn is_html(&self) -> bool {
        self.has_extension(&["html", "htm"])
    }

    /// The site-absolute URL path for the document: `/blog/hello/` for a
    /// permalinked document, `/about.html` otherwise.
    pub fn url(&self) -> String {
        match &self.permalink {
            Some(p) if p.is_empty() => String::from("/"),
            Some(p) => format!("/{}/", p),
            None => format!("/{}", slash_path(&self.path)),
        }
    }
}

impl Dated for Document {
    fn date(&self) -> Option<&str> {
        self.str_attr("date")
    }
}

/// The complete set of documents for one build.
#[derive(Clone, Debug, Default)]
pub struct Site {
    /// Documents keyed by their path relative to the source directory. The
    /// key never changes even as stages rename the output path.
    pub files: BTreeMap<PathBuf, Document>,

    /// Named, ordered collections. Each entry is a key into `files`.
    pub collections: BTreeMap<String, Vec<PathBuf>>,

    /// Site-wide attributes made available to every template.
    pub metadata: Metadata,
}

impl Site {
    pub fn new(metadata: Metadata) -> Site {
        Site {
            metadata,
            ..Site::default()
        }
    }

    /// Adds a document under its own output path.
    pub fn insert(&mut self, document: Document) {
        self.files.insert(document.path.clone(), document);
    }

    /// The documents of the named collection in presentation order.
    pub fn collection(&self, name: &str) -> impl Iterator<Item = &Document> {
        self.collections
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(move |key| self.files.get(key))
    }
}

/// Renders a relative path with `/` separators regardless of platform.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// Returns the YAML text and the body, or `None` if the input doesn't open
// with a front matter fence.
fn split_frontmatter(input: &str) -> Result<Option<(&str, &str)>> {
    const FENCE: &str = "---";

    let first_line_end = input.find('\n').map_or(input.len(), |i| i + 1);
    if input[..first_line_end].trim_end() != FENCE {
        return Ok(None);
    }

    let mut offset = first_line_end;
    while offset < input.len() {
        let line_end = input[offset..]
            .find('\n')
            .map_or(input.len(), |i| offset + i + 1);
        if input[offset..line_end].trim_end() == FENCE {
            return Ok(Some((&input[first_line_end..offset], &input[line_end..])));
        }
        offset = line_end;
    }
    Err(Error::FrontmatterMissingEndFence)
}

fn parse_yaml(yaml: &str) -> Result<Metadata> {
    if yaml.trim().is_empty() {
        return Ok(Metadata::new());
    }
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Null => Ok(Metadata::new()),
        Value::Mapping(mapping) => Ok(mapping
            .into_iter()
            .filter_map(|(k, v)| match k {
                Value::String(k) => Some((k, v)),
                Value::Number(n) => Some((n.to_string(), v)),
                Value::Bool(b) => Some((b.to_string(), v)),
                _ => None,
            })
            .collect()),
        _ => Err(Error::FrontmatterNotMapping),
    }
}

/// Represents the result of a front matter parse.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Document`]'s front matter.
#[derive(Debug)]
pub enum Error {
    /// Returned when a source file opens a front matter fence (`---`) but
    /// never closes it.
    FrontmatterMissingEndFence,

    /// Returned when the front matter is valid YAML but not a mapping.
    FrontmatterNotMapping,

    /// Returned when there was an error parsing the front matter as YAML.
    DeserializeYaml(serde_yaml::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::FrontmatterNotMapping => {
                write!(f, "Front matter must be a YAML mapping")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingEndFence => None,
            Error::FrontmatterNotMapping => None,
            Error::DeserializeYaml(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}
