//! Conversions from documents and front matter into template [`Value`]s.

use crate::document::{Document, Metadata, Site};
use gtmpl::Value;
use serde_yaml::Value as Yaml;
use std::collections::HashMap;

/// Converts a front matter value. Mapping keys that aren't strings are
/// rendered as YAML scalars; tags are dropped.
pub fn from_yaml(yaml: &Yaml) -> Value {
    match yaml {
        Yaml::Null => Value::Nil,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => Value::from(i),
            (None, Some(u), _) => Value::from(u),
            (None, None, Some(f)) => Value::from(f),
            _ => Value::String(n.to_string()),
        },
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(items) => Value::Array(items.iter().map(from_yaml).collect()),
        Yaml::Mapping(mapping) => Value::Object(
            mapping
                .iter()
                .filter_map(|(k, v)| key(k).map(|k| (k, from_yaml(v))))
                .collect(),
        ),
        Yaml::Tagged(tagged) => from_yaml(&tagged.value),
    }
}

fn key(yaml: &Yaml) -> Option<String> {
    match yaml {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Converts a whole front matter map into an object.
pub fn from_metadata(metadata: &Metadata) -> HashMap<String, Value> {
    metadata
        .iter()
        .map(|(k, v)| (k.clone(), from_yaml(v)))
        .collect()
}

fn string_or_nil(s: Option<&str>) -> Value {
    match s {
        Some(s) => Value::String(s.to_owned()),
        None => Value::Nil,
    }
}

/// Converts a [`Document`] into an object holding its front matter plus the
/// derived attributes `contents`, `excerpt`, `path`, `permalink`, `url` and
/// `tags` (always a list).
pub fn from_document(document: &Document) -> HashMap<String, Value> {
    let mut m = from_metadata(&document.metadata);
    m.insert(
        "contents".to_owned(),
        Value::String(String::from_utf8_lossy(&document.contents).into_owned()),
    );
    m.insert(
        "excerpt".to_owned(),
        Value::String(document.excerpt.clone().unwrap_or_default()),
    );
    m.insert(
        "path".to_owned(),
        Value::String(crate::document::slash_path(&document.path)),
    );
    m.insert(
        "permalink".to_owned(),
        string_or_nil(document.permalink.as_deref()),
    );
    m.insert("url".to_owned(), Value::String(document.url()));
    m.insert(
        "tags".to_owned(),
        Value::Array(document.tags().into_iter().map(Value::String).collect()),
    );
    m.entry("title".to_owned())
        .or_insert_with(|| Value::String(String::new()));
    m
}

/// Converts every collection into an array of its members, in presentation
/// order.
pub fn collections(site: &Site) -> Value {
    Value::Object(
        site.collections
            .keys()
            .map(|name| {
                let members = site
                    .collection(name)
                    .map(|d| Value::Object(from_document(d)))
                    .collect();
                (name.clone(), Value::Array(members))
            })
            .collect(),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    fn string(value: Option<&Value>) -> Option<&str> {
        match value {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    #[test]
    fn test_from_yaml() {
        let yaml: Yaml =
            serde_yaml::from_str("a: 1\nb: [x, true]\nc: {d: null}\ne: 1.5\n").unwrap();
        let object = match from_yaml(&yaml) {
            Value::Object(o) => o,
            _ => panic!("expected an object"),
        };
        assert!(matches!(object.get("a"), Some(Value::Number(_))));
        assert!(matches!(object.get("e"), Some(Value::Number(_))));
        match object.get("b") {
            Some(Value::Array(items)) => {
                assert_eq!(2, items.len());
                assert_eq!(Some("x"), string(items.first()));
                assert!(matches!(items.get(1), Some(Value::Bool(true))));
            }
            _ => panic!("expected an array"),
        }
        match object.get("c") {
            Some(Value::Object(c)) => assert!(matches!(c.get("d"), Some(Value::Nil))),
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_from_document_defaults() {
        let document = Document {
            path: PathBuf::from("blog/hello/index.html"),
            contents: b"<p>Hi</p>".to_vec(),
            permalink: Some(String::from("blog/hello")),
            ..Document::default()
        };
        let m = from_document(&document);
        assert_eq!(Some("<p>Hi</p>"), string(m.get("contents")));
        assert_eq!(Some(""), string(m.get("excerpt")));
        assert_eq!(Some(""), string(m.get("title")));
        assert_eq!(Some("/blog/hello/"), string(m.get("url")));
        assert_eq!(Some("blog/hello/index.html"), string(m.get("path")));
        assert!(matches!(m.get("tags"), Some(Value::Array(tags)) if tags.is_empty()));
    }
}
