//! Renders documents through their layout templates. Templates use the Go
//! template syntax implemented by [`gtmpl`] and live in the templates
//! directory. A document selects its layout with the `template` front matter
//! attribute.
//!
//! Partials are ordinary template files that get wrapped in
//! `{{define "<name>"}}...{{end}}` and prepended to every layout, so a layout
//! can include them with `{{template "_sidebar" .}}`.

use crate::build::{Result, Stage};
use crate::config::TemplateConfig;
use crate::document::{Document, Site};
use crate::value;
use gtmpl::{Context, Template, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Applies layout templates to documents.
pub struct Templates {
    directory: PathBuf,

    /// Partial name to file name, relative to `directory`.
    partials: BTreeMap<String, String>,
    default_template: Option<String>,

    // Parsed layouts, keyed by file name. Each layout is read and parsed once
    // per build.
    cache: RefCell<HashMap<String, Rc<Template>>>,
}

impl Templates {
    pub fn new(
        directory: &Path,
        partials: &BTreeMap<String, String>,
        config: &TemplateConfig,
    ) -> Templates {
        Templates {
            directory: directory.to_owned(),
            partials: partials.clone(),
            default_template: config.default_template.clone(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn template_name<'a>(&'a self, document: &'a Document) -> Option<&'a str> {
        match document.str_attr("template") {
            Some(name) => Some(name),
            None if document.is_html() => self.default_template.as_deref(),
            None => None,
        }
    }

    // Loads the layout contents, prepends the partial definitions and parses
    // the result into a template.
    fn load(&self, name: &str) -> std::result::Result<Rc<Template>, Error> {
        if let Some(template) = self.cache.borrow().get(name) {
            return Ok(template.clone());
        }

        let layout_path = self.directory.join(name);
        let extension = layout_path.extension().map(|e| e.to_owned());
        let mut contents = String::new();
        for (partial, file) in &self.partials {
            let mut path = self.directory.join(file);
            if path.extension().is_none() {
                if let Some(extension) = &extension {
                    path.set_extension(extension);
                }
            }
            contents.push_str(&format!("{{{{define \"{}\"}}}}", partial));
            contents.push_str(&read(&path)?);
            contents.push_str("{{end}}");
        }
        contents.push_str(&read(&layout_path)?);

        let mut template = Template::default();
        template.parse(contents).map_err(|err| Error::Parse {
            template: name.to_owned(),
            err,
        })?;

        let template = Rc::new(template);
        self.cache
            .borrow_mut()
            .insert(name.to_owned(), template.clone());
        Ok(template)
    }
}

impl Stage for Templates {
    fn name(&self) -> &'static str {
        "templates"
    }

    fn run(&self, site: &mut Site) -> Result<()> {
        let globals = value::from_metadata(&site.metadata);
        let collections = value::collections(site);

        let mut rendered: Vec<(PathBuf, Vec<u8>)> = Vec::new();
        for (key, document) in &site.files {
            let name = match self.template_name(document) {
                Some(name) => name,
                None => continue,
            };
            let template = self.load(name)?;

            let mut m = globals.clone();
            m.insert("site".to_owned(), Value::Object(globals.clone()));
            m.extend(value::from_document(document));
            m.insert("collections".to_owned(), collections.clone());
            let (previous, next) = neighbours(site, key, document);
            m.insert("previous".to_owned(), previous);
            m.insert("next".to_owned(), next);

            let mut out: Vec<u8> = Vec::new();
            let context = Context::from(Value::Object(m)).map_err(|err| Error::Execute {
                path: key.clone(),
                err,
            })?;
            template.execute(&mut out, &context).map_err(|err| Error::Execute {
                path: key.clone(),
                err,
            })?;
            tracing::debug!("rendered `{}` with `{}`", key.display(), name);
            rendered.push((key.clone(), out));
        }

        for (key, contents) in rendered {
            if let Some(document) = site.files.get_mut(&key) {
                document.contents = contents;
            }
        }
        Ok(())
    }
}

// The previous and next members of the first collection containing the
// document, in presentation order.
fn neighbours(site: &Site, key: &Path, document: &Document) -> (Value, Value) {
    let summary = |k: Option<&PathBuf>| match k.and_then(|k| site.files.get(k)) {
        Some(d) => Value::Object(value::from_document(d)),
        None => Value::Nil,
    };

    for name in &document.collections {
        if let Some(keys) = site.collections.get(name) {
            if let Some(i) = keys.iter().position(|k| k == key) {
                let previous = i.checked_sub(1).and_then(|i| keys.get(i));
                return (summary(previous), summary(keys.get(i + 1)));
            }
        }
    }
    (Value::Nil, Value::Nil)
}

fn read(path: &Path) -> std::result::Result<String, Error> {
    std::fs::read_to_string(path).map_err(|err| Error::Read {
        path: path.to_owned(),
        err,
    })
}

/// Represents an error loading or executing a template.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while reading template or partial files.
    Read { path: PathBuf, err: io::Error },

    /// Returned for errors parsing a template file.
    Parse { template: String, err: String },

    /// Returned for errors executing a template against a document.
    Execute { path: PathBuf, err: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Read { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::Parse { template, err } => {
                write!(f, "Parsing template '{}': {}", template, err)
            }
            Error::Execute { path, err } => {
                write!(f, "Rendering '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Read { path: _, err } => Some(err),
            Error::Parse { .. } => None,
            Error::Execute { .. } => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    fn templates_dir(files: &[(&str, &str)]) -> io::Result<TempDir> {
        let dir = tempfile::tempdir()?;
        for (name, contents) in files {
            std::fs::write(dir.path().join(name), contents)?;
        }
        Ok(dir)
    }

    fn partials() -> BTreeMap<String, String> {
        [("_sidebar", "_sidebar"), ("_head_common", "_head_common")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn page(path: &str, frontmatter: &str, body: &str) -> Document {
        Document {
            path: PathBuf::from(path),
            metadata: serde_yaml::from_str(frontmatter).unwrap(),
            contents: body.as_bytes().to_vec(),
            ..Document::default()
        }
    }

    #[test]
    fn test_layout_with_partials() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = templates_dir(&[
            (
                "post.html",
                "<head>{{template \"_head_common\" .}}</head>{{template \"_sidebar\" .}}<main>{{.contents}}</main>",
            ),
            ("_head_common.html", "<title>{{.title}} | {{.site.name}}</title>"),
            (
                "_sidebar.html",
                "<nav>{{range .collections.posts}}<a href=\"{{.url}}\">{{.title}}</a>{{end}}</nav>",
            ),
        ])?;

        let mut site = Site::new(serde_yaml::from_str("name: Blog")?);
        site.insert(page("a.html", "title: First\ntemplate: post.html", "<p>One</p>"));
        site.insert(page("raw.html", "title: Raw", "<p>untouched</p>"));
        site.collections
            .insert(String::from("posts"), vec![PathBuf::from("a.html")]);

        Templates::new(dir.path(), &partials(), &TemplateConfig::default()).run(&mut site)?;

        assert_eq!(
            "<head><title>First | Blog</title></head><nav><a href=\"/a.html\">First</a></nav><main><p>One</p></main>",
            site.files[Path::new("a.html")].text()?
        );
        assert_eq!("<p>untouched</p>", site.files[Path::new("raw.html")].text()?);
        Ok(())
    }

    #[test]
    fn test_default_template_and_neighbours() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let dir = templates_dir(&[
            (
                "layout.html",
                "{{if .previous}}prev={{.previous.title}};{{end}}{{if .next}}next={{.next.title}};{{end}}{{.contents}}",
            ),
            ("_head_common.html", ""),
            ("_sidebar.html", ""),
        ])?;

        let mut site = Site::default();
        for (path, title) in [("new.html", "New"), ("mid.html", "Mid"), ("old.html", "Old")] {
            let mut document = page(path, &format!("title: {}", title), title);
            document.collections.push(String::from("posts"));
            site.insert(document);
        }
        site.collections.insert(
            String::from("posts"),
            ["new.html", "mid.html", "old.html"]
                .iter()
                .map(PathBuf::from)
                .collect(),
        );

        let config = TemplateConfig {
            default_template: Some(String::from("layout.html")),
        };
        Templates::new(dir.path(), &partials(), &config).run(&mut site)?;

        assert_eq!("next=Mid;New", site.files[Path::new("new.html")].text()?);
        assert_eq!(
            "prev=New;next=Old;Mid",
            site.files[Path::new("mid.html")].text()?
        );
        assert_eq!("prev=Mid;Old", site.files[Path::new("old.html")].text()?);
        Ok(())
    }

    #[test]
    fn test_missing_template() -> io::Result<()> {
        let dir = templates_dir(&[("_head_common.html", ""), ("_sidebar.html", "")])?;
        let mut site = Site::default();
        site.insert(page("a.html", "template: nope.html", ""));
        let err = Templates::new(dir.path(), &partials(), &TemplateConfig::default())
            .run(&mut site)
            .unwrap_err();
        assert!(err.to_string().contains("nope.html"));
        Ok(())
    }
}
