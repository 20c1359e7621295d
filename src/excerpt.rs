//! Extracts a summary of each HTML document for use on listing pages.

use crate::build::{Result, Stage};
use crate::document::{Document, Site};

/// Marks the end of a post's summary. Everything above it is the excerpt.
pub const FOLD_TAG: &str = "<!-- more -->";

/// Sets [`Document::excerpt`] for every HTML document. In order of
/// precedence, the excerpt is:
///
/// 1. the `excerpt` front matter attribute;
/// 2. everything above the [`FOLD_TAG`];
/// 3. the first paragraph, including its `<p>` tags.
///
/// Documents with none of these get no excerpt.
#[derive(Default)]
pub struct Excerpts;

impl Stage for Excerpts {
    fn name(&self) -> &'static str {
        "excerpts"
    }

    fn run(&self, site: &mut Site) -> Result<()> {
        for document in site.files.values_mut() {
            if document.is_html() {
                document.excerpt = excerpt(document);
            }
        }
        Ok(())
    }
}

fn excerpt(document: &Document) -> Option<String> {
    if let Some(excerpt) = document.str_attr("excerpt") {
        return Some(excerpt.to_owned());
    }
    let body = document.text().ok()?;
    match body.find(FOLD_TAG) {
        Some(i) => Some(body[..i].trim().to_owned()),
        None => first_paragraph(body).map(str::to_owned),
    }
}

// Returns the outer HTML of the first `<p>` element. Rendered Markdown never
// nests paragraphs, so the first closing tag ends it.
fn first_paragraph(html: &str) -> Option<&str> {
    let start = html
        .match_indices("<p")
        .map(|(i, _)| i)
        .find(|&i| matches!(html[i + 2..].chars().next(), Some('>') | Some(' ')))?;
    let end = html[start..].find("</p>")? + start + "</p>".len();
    Some(&html[start..end])
}
