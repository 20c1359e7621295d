//! Builds a weighted inverted index over the site's pages and emits it as a
//! JSON document, so the search box can run entirely client-side.

use crate::build::{Result, Stage};
use crate::config::{SearchConfig, SearchField};
use crate::document::{Document, Site};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

// Common English words that carry no meaning for search.
const STOP_WORDS: &[&str] = &[
    "a", "able", "about", "across", "after", "all", "almost", "also", "am", "among", "an",
    "and", "any", "are", "as", "at", "be", "because", "been", "but", "by", "can", "cannot",
    "could", "dear", "did", "do", "does", "either", "else", "ever", "every", "for", "from",
    "get", "got", "had", "has", "have", "he", "her", "hers", "him", "his", "how", "however",
    "i", "if", "in", "into", "is", "it", "its", "just", "least", "let", "like", "likely",
    "may", "me", "might", "most", "must", "my", "neither", "no", "nor", "not", "of", "off",
    "often", "on", "only", "or", "other", "our", "own", "rather", "said", "say", "says",
    "she", "should", "since", "so", "some", "than", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "tis", "to", "too", "twas", "us", "wants", "was", "we",
    "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with",
    "would", "yet", "you", "your",
];

/// A searchable document's display data.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Entry {
    pub title: String,
}

/// The serialized index.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SearchIndex {
    /// The indexed fields and their weights.
    pub fields: Vec<SearchField>,

    /// Indexed documents keyed by their URL path.
    pub documents: BTreeMap<String, Entry>,

    /// Term to document URL to weighted, length-normalized frequency.
    pub index: BTreeMap<String, BTreeMap<String, f64>>,
}

impl SearchIndex {
    pub fn new(fields: &[SearchField]) -> SearchIndex {
        SearchIndex {
            fields: fields.to_vec(),
            ..SearchIndex::default()
        }
    }

    /// Indexes one document under `reference`. Each field contributes
    /// `boost * tf / sqrt(field length)` to a term's score.
    pub fn add(&mut self, reference: &str, title: &str, fields: &HashMap<&str, String>) {
        self.documents.insert(
            reference.to_owned(),
            Entry {
                title: title.to_owned(),
            },
        );
        for field in &self.fields {
            let tokens = match fields.get(field.name.as_str()) {
                Some(text) => tokenize(text),
                None => continue,
            };
            if tokens.is_empty() {
                continue;
            }
            let norm = (tokens.len() as f64).sqrt();
            let mut frequencies: HashMap<&str, usize> = HashMap::new();
            for token in &tokens {
                *frequencies.entry(token).or_default() += 1;
            }
            for (term, tf) in frequencies {
                *self
                    .index
                    .entry(term.to_owned())
                    .or_default()
                    .entry(reference.to_owned())
                    .or_default() += field.boost * tf as f64 / norm;
            }
        }
    }

    /// Ranks documents against a free-text query. Scores are the sum over
    /// query terms of the stored score times `ln(1 + N / df)`. Ties are
    /// broken by reference.
    pub fn search(&self, query: &str) -> Vec<(String, f64)> {
        let n = self.documents.len() as f64;
        let mut scores: HashMap<&str, f64> = HashMap::new();
        for term in tokenize(query) {
            if let Some(postings) = self.index.get(&term) {
                let idf = (1.0 + n / postings.len() as f64).ln();
                for (reference, score) in postings {
                    *scores.entry(reference).or_default() += score * idf;
                }
            }
        }
        let mut ranked: Vec<(String, f64)> = scores
            .into_iter()
            .map(|(reference, score)| (reference.to_owned(), score))
            .collect();
        ranked.sort_by(|(ra, a), (rb, b)| b.total_cmp(a).then_with(|| ra.cmp(rb)));
        ranked
    }
}

/// Lowercases `text`, splits it on anything that isn't alphanumeric and
/// drops stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Strips tags from HTML and decodes the common entities.
pub fn html_to_text(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                result.push(' ');
            }
            '>' if in_tag => {
                in_tag = false;
                result.push(' ');
            }
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Indexes every HTML page (except those setting `lunr: false`) and adds
/// the index to the site as a JSON document.
pub struct Indexer {
    output: PathBuf,
    fields: Vec<SearchField>,
}

impl Indexer {
    pub fn new(config: &SearchConfig) -> Indexer {
        Indexer {
            output: config.output.clone(),
            fields: config.fields.clone(),
        }
    }

    fn field_text(document: &Document, field: &str) -> Option<String> {
        match field {
            "contents" => Some(html_to_text(&String::from_utf8_lossy(&document.contents))),
            "tags" => Some(document.tags().join(" ")),
            "excerpt" => document.excerpt.as_deref().map(html_to_text),
            other => document.str_attr(other).map(str::to_owned),
        }
    }
}

impl Stage for Indexer {
    fn name(&self) -> &'static str {
        "search"
    }

    fn run(&self, site: &mut Site) -> Result<()> {
        let mut index = SearchIndex::new(&self.fields);
        for document in site.files.values() {
            if !document.is_html() || !document.enabled("lunr") {
                continue;
            }
            let fields: HashMap<&str, String> = self
                .fields
                .iter()
                .filter_map(|f| {
                    Self::field_text(document, &f.name).map(|text| (f.name.as_str(), text))
                })
                .collect();
            index.add(&document.url(), document.title().unwrap_or_default(), &fields);
        }

        tracing::info!(
            "indexed {} documents, {} terms",
            index.documents.len(),
            index.index.len()
        );
        if let Some((source, _)) = site
            .files
            .iter()
            .find(|(key, document)| **key == self.output || document.path == self.output)
        {
            return Err(Error::Collision {
                output: self.output.clone(),
                source: source.clone(),
            }
            .into());
        }
        let contents = serde_json::to_vec(&index).map_err(Error::Serialize)?;
        site.insert(Document {
            path: self.output.clone(),
            contents,
            ..Document::default()
        });
        Ok(())
    }
}

/// Represents an error emitting the search index.
#[derive(Debug)]
pub enum Error {
    /// Returned when the index can't be serialized.
    Serialize(serde_json::Error),

    /// Returned when another document already occupies the index's output
    /// path.
    Collision { output: PathBuf, source: PathBuf },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Serialize(err) => write!(f, "Serializing search index: {}", err),
            Error::Collision { output, source } => write!(
                f,
                "Search index '{}' would overwrite '{}'",
                output.display(),
                source.display()
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Serialize(err) => Some(err),
            Error::Collision { .. } => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::SearchConfig;
    use std::path::Path;

    fn page(path: &str, frontmatter: &str, body: &str) -> Document {
        Document {
            path: PathBuf::from(path),
            metadata: serde_yaml::from_str(frontmatter).unwrap(),
            contents: body.as_bytes().to_vec(),
            ..Document::default()
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            vec!["rust", "borrow", "checker", "2021"],
            tokenize("The Rust borrow-checker, in 2021!")
        );
    }

    #[test]
    fn test_html_to_text() {
        assert_eq!(
            "Hello world & <friends>",
            html_to_text("<p>Hello <em>world</em></p>\n<p>&amp; &lt;friends&gt;</p>")
        );
    }

    #[test]
    fn test_tags_outrank_contents() {
        let mut index = SearchIndex::new(&SearchConfig::default().fields);
        let doc = |tags: &str, contents: &str| -> HashMap<&'static str, String> {
            [("tags", tags.to_owned()), ("contents", contents.to_owned())]
                .into_iter()
                .collect()
        };
        index.add("/tagged/", "Tagged", &doc("rust", "a post about cooking"));
        index.add("/mentioned/", "Mentioned", &doc("cooking", "a post about rust"));
        index.add("/neither/", "Neither", &doc("travel", "a post about trains"));

        let ranked: Vec<String> = index.search("Rust").into_iter().map(|(r, _)| r).collect();
        assert_eq!(vec!["/tagged/", "/mentioned/"], ranked);
        assert!(index.search("the").is_empty());
        assert!(index.search("nothing").is_empty());
    }

    #[test]
    fn test_stage_emits_json() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut site = Site::default();
        let mut post = page("blog/a/index.html", "title: Hi\ntags: [rust]", "<p>Ferris</p>");
        post.permalink = Some(String::from("blog/a"));
        site.insert(post);
        site.insert(page("hidden.html", "lunr: false", "<p>secret</p>"));
        site.insert(page("style.css", "{}", "body {}"));

        Indexer::new(&SearchConfig::default()).run(&mut site)?;

        let json = &site.files[Path::new("searchIndex.json")];
        let index: SearchIndex = serde_json::from_slice(&json.contents)?;
        assert_eq!(vec!["/blog/a/"], index.documents.keys().collect::<Vec<_>>());
        assert_eq!("Hi", index.documents["/blog/a/"].title);
        assert!(index.index.contains_key("ferris"));
        assert!(index.index.contains_key("rust"));
        assert!(!index.index.contains_key("secret"));
        assert_eq!(2, index.fields.len());
        Ok(())
    }

    #[test]
    fn test_refuses_to_overwrite_document() {
        let mut site = Site::default();
        site.insert(page("searchIndex.json", "{}", "[]"));
        let err = Indexer::new(&SearchConfig::default())
            .run(&mut site)
            .unwrap_err();
        assert!(err.to_string().contains("searchIndex.json"));
        assert_eq!(b"[]".to_vec(), site.files[Path::new("searchIndex.json")].contents);
    }

    #[test]
    fn test_refuses_renamed_document_at_output() {
        let mut site = Site::default();
        let mut moved = page("search.html", "title: Search", "<p>find</p>");
        moved.path = PathBuf::from("searchIndex.json");
        site.files.insert(PathBuf::from("search.html"), moved);
        assert!(Indexer::new(&SearchConfig::default()).run(&mut site).is_err());
    }
}
