//! Rewrites HTML documents' output paths into directory-style permalinks, so
//! that `blog/post.html` is served from `/blog/<title>/`.

use crate::build::{Result, Stage};
use crate::document::{slash_path, Document, Site};
use crate::sort::parse_timestamp;
use chrono::{TimeZone, Utc};
use serde_yaml::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Applies a pattern such as `blog/:title` to every HTML document. Each
/// `:key` is replaced with the document's (slugified) front matter value;
/// `:date` is written as `YYYY/MM/DD`. Documents missing any key keep their
/// own path minus the extension. Setting `permalink: false` in front matter
/// opts a document out entirely.
pub struct Permalinks {
    pattern: String,
}

impl Permalinks {
    pub fn new(pattern: &str) -> Permalinks {
        Permalinks {
            pattern: pattern.trim_matches('/').to_owned(),
        }
    }

    /// Computes the permalink (without a leading or trailing slash) for a
    /// document.
    pub fn permalink(&self, document: &Document) -> String {
        match substitute(&self.pattern, document) {
            Some(permalink) => permalink,
            None => resolve(&document.path),
        }
    }
}

impl Stage for Permalinks {
    fn name(&self) -> &'static str {
        "permalinks"
    }

    fn run(&self, site: &mut Site) -> Result<()> {
        for document in site.files.values_mut() {
            if !document.is_html() || !document.enabled("permalink") {
                continue;
            }
            let permalink = self.permalink(document);
            document.path = if permalink.is_empty() {
                PathBuf::from("index.html")
            } else {
                PathBuf::from(&permalink).join("index.html")
            };
            document.permalink = Some(permalink);
        }

        let mut outputs: HashMap<&Path, &Path> = HashMap::new();
        for (key, document) in &site.files {
            if let Some(other) = outputs.insert(&document.path, key) {
                return Err(Error {
                    output: document.path.clone(),
                    sources: (other.to_owned(), key.clone()),
                }
                .into());
            }
        }
        Ok(())
    }
}

// Replaces every `:key` in `pattern`. Returns `None` if the document lacks
// any of the keys.
fn substitute(pattern: &str, document: &Document) -> Option<String> {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(i) = rest.find(':') {
        out.push_str(&rest[..i]);
        let after = &rest[i + 1..];
        let len = after
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        if len == 0 {
            out.push(':');
        } else {
            out.push_str(&field(document, &after[..len])?);
        }
        rest = &after[len..];
    }
    out.push_str(rest);
    Some(out)
}

fn field(document: &Document, key: &str) -> Option<String> {
    let value = match document.metadata.get(key)? {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if key == "date" {
        if let Some(date) = parse_timestamp(&value)
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        {
            return Some(date.format("%Y/%m/%d").to_string());
        }
    }
    Some(slug::slugify(value)).filter(|s| !s.is_empty())
}

// The fallback permalink: the output path without its extension, where an
// `index` file stands for its directory.
fn resolve(path: &Path) -> String {
    let stem = path.with_extension("");
    let stem = match stem.file_name() {
        Some(name) if name == "index" => stem.parent().map(Path::to_owned).unwrap_or_default(),
        _ => stem,
    };
    slash_path(&stem)
}

/// Returned when two documents would be written to the same output path.
#[derive(Debug)]
pub struct Error {
    pub output: PathBuf,
    pub sources: (PathBuf, PathBuf),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "'{}' and '{}' both resolve to '{}'",
            self.sources.0.display(),
            self.sources.1.display(),
            self.output.display()
        )
    }
}

impl std::error::Error for Error {}
