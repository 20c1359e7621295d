//! Groups documents into named, date-ordered collections.

use crate::build::{Result, Stage};
use crate::config::CollectionConfig;
use crate::document::{slash_path, Document, Site};
use crate::sort::{by_date, parse_timestamp, Dated};
use glob::{MatchOptions, Pattern};
use std::fmt;
use std::path::PathBuf;

// `*` must not cross directory boundaries, so `blog/*.md` excludes
// `blog/drafts/x.md`.
const SEPARATOR_AWARE: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A collection whose pattern has been compiled.
struct Collection {
    name: String,
    pattern: Pattern,
    reverse: bool,
}

/// Selects each collection's members by matching their source path against
/// the collection's glob and orders them with [`by_date`].
pub struct Collections {
    collections: Vec<Collection>,
}

impl Collections {
    /// Compiles the configured patterns. Fails on an invalid glob.
    pub fn new(configs: &[CollectionConfig]) -> std::result::Result<Collections, Error> {
        let collections = configs
            .iter()
            .map(|c| {
                Ok(Collection {
                    name: c.name.clone(),
                    pattern: Pattern::new(&c.pattern).map_err(|err| Error {
                        collection: c.name.clone(),
                        err,
                    })?,
                    reverse: c.reverse,
                })
            })
            .collect::<std::result::Result<_, Error>>()?;
        Ok(Collections { collections })
    }
}

impl Stage for Collections {
    fn name(&self) -> &'static str {
        "collections"
    }

    fn run(&self, site: &mut Site) -> Result<()> {
        for collection in &self.collections {
            let mut members: Vec<(&PathBuf, &Document)> = site
                .files
                .iter()
                .filter(|(key, _)| {
                    collection
                        .pattern
                        .matches_with(&slash_path(key), SEPARATOR_AWARE)
                })
                .collect();

            for (key, document) in &members {
                if let Some(date) = document.date() {
                    if parse_timestamp(date).is_none() {
                        tracing::warn!(
                            "`{}` has an unrecognized date `{}`; ordering it as undated",
                            key.display(),
                            date
                        );
                    }
                }
            }

            members.sort_by(|(_, a), (_, b)| by_date(Some(*a), Some(*b)));
            let keys = present(
                members
                    .into_iter()
                    .map(|(key, document)| (key.clone(), is_dated(document)))
                    .collect(),
                collection.reverse,
            );

            tracing::debug!("collection `{}` has {} members", collection.name, keys.len());
            for key in &keys {
                if let Some(document) = site.files.get_mut(key) {
                    document.collections.push(collection.name.clone());
                }
            }
            site.collections.insert(collection.name.clone(), keys);
        }
        Ok(())
    }
}

fn is_dated(document: &Document) -> bool {
    document.date().and_then(parse_timestamp).is_some()
}

// Turns an ascending (oldest first, undated last) ordering into the
// presentation order. Reversing only flips the dated run: undated documents
// are the least recent either way, so they stay at the end.
fn present(ascending: Vec<(PathBuf, bool)>, reverse: bool) -> Vec<PathBuf> {
    let mut keys: Vec<PathBuf> = Vec::with_capacity(ascending.len());
    let dated = ascending.iter().take_while(|(_, dated)| *dated).count();
    keys.extend(ascending.into_iter().map(|(key, _)| key));
    if reverse {
        keys[..dated].reverse();
    }
    keys
}

/// Returned when a collection's pattern is not a valid glob.
#[derive(Debug)]
pub struct Error {
    pub collection: String,
    pub err: glob::PatternError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid pattern for collection `{}`: {}", self.collection, self.err)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::Metadata;
    use std::path::Path;

    fn post(path: &str, date: Option<&str>) -> Document {
        let mut metadata = Metadata::new();
        if let Some(date) = date {
            metadata.insert(String::from("date"), date.into());
        }
        Document {
            path: PathBuf::from(path),
            metadata,
            ..Document::default()
        }
    }

    fn site(documents: Vec<Document>) -> Site {
        let mut site = Site::default();
        for document in documents {
            site.insert(document);
        }
        site
    }

    fn posts_collection(reverse: bool) -> Collections {
        Collections::new(&[CollectionConfig {
            name: String::from("posts"),
            pattern: String::from("blog/*.md"),
            reverse,
        }])
        .unwrap()
    }

    #[test]
    fn test_newest_first_with_undated_last() -> Result<()> {
        let mut site = site(vec![
            post("blog/march.md", Some("2022-03-01")),
            post("blog/undated.md", None),
            post("blog/january.md", Some("2021-01-01")),
        ]);
        posts_collection(true).run(&mut site)?;

        assert_eq!(
            vec![
                PathBuf::from("blog/march.md"),
                PathBuf::from("blog/january.md"),
                PathBuf::from("blog/undated.md"),
            ],
            site.collections["posts"]
        );
        Ok(())
    }

    #[test]
    fn test_offset_timestamps_are_dated() -> Result<()> {
        let mut site = site(vec![
            post("blog/new.md", Some("2023-01-01 10:00:00 -0800")),
            post("blog/old.md", Some("2020-01-01")),
            post("blog/undated.md", None),
        ]);
        posts_collection(true).run(&mut site)?;

        assert_eq!(
            vec![
                PathBuf::from("blog/new.md"),
                PathBuf::from("blog/old.md"),
                PathBuf::from("blog/undated.md"),
            ],
            site.collections["posts"]
        );
        Ok(())
    }

    #[test]
    fn test_ascending_without_reverse() -> Result<()> {
        let mut site = site(vec![
            post("blog/b.md", Some("2022-03-01")),
            post("blog/c.md", Some("not a date")),
            post("blog/a.md", Some("2021-01-01")),
        ]);
        posts_collection(false).run(&mut site)?;

        let dates: Vec<_> = site.collection("posts").map(|d| d.date()).collect();
        assert_eq!(
            vec![Some("2021-01-01"), Some("2022-03-01"), Some("not a date")],
            dates
        );
        Ok(())
    }

    #[test]
    fn test_pattern_selects_members() -> Result<()> {
        let mut site = site(vec![
            post("blog/post.md", Some("2022-03-01")),
            post("blog/nested/deep.md", Some("2022-03-01")),
            post("about.md", None),
            post("blog/image.png", None),
        ]);
        posts_collection(true).run(&mut site)?;

        assert_eq!(vec![PathBuf::from("blog/post.md")], site.collections["posts"]);
        assert_eq!(
            vec![String::from("posts")],
            site.files[Path::new("blog/post.md")].collections
        );
        assert!(site.files[Path::new("about.md")].collections.is_empty());
        Ok(())
    }

    #[test]
    fn test_empty_collection_is_present() -> Result<()> {
        let mut site = site(vec![post("about.md", None)]);
        posts_collection(true).run(&mut site)?;
        assert!(site.collections["posts"].is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_pattern() {
        let result = Collections::new(&[CollectionConfig {
            name: String::from("broken"),
            pattern: String::from("blog/[*.md"),
            reverse: false,
        }]);
        assert!(result.is_err());
    }
}
