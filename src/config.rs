//! Loads the project configuration. A project is a directory containing a
//! `postsmith.yaml` file; every field has a default so the file may be empty
//! or missing altogether.

use crate::document::Metadata;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The name of the project file.
pub const PROJECT_FILE: &str = "postsmith.yaml";

/// A named, pattern-selected group of documents. See
/// [`crate::collections::Collections`].
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CollectionConfig {
    pub name: String,

    /// A glob matched against each source path relative to the source
    /// directory, e.g. `blog/*.md`.
    pub pattern: String,

    /// Present the collection newest-first.
    #[serde(default)]
    pub reverse: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct HighlightConfig {
    /// The name of a theme bundled with syntect.
    pub theme: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        HighlightConfig {
            theme: String::from("InspiredGitHub"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PermalinkConfig {
    /// A path pattern whose `:key` placeholders are replaced with the
    /// document's front matter values.
    pub pattern: String,
}

impl Default for PermalinkConfig {
    fn default() -> Self {
        PermalinkConfig {
            pattern: String::from("blog/:title"),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplateConfig {
    /// The template applied to HTML documents that don't name one.
    pub default_template: Option<String>,
}

/// A field to index and its relative weight.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SearchField {
    pub name: String,
    pub boost: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// The output path of the index, relative to the destination directory.
    pub output: PathBuf,
    pub fields: Vec<SearchField>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            output: PathBuf::from("searchIndex.json"),
            fields: vec![
                SearchField {
                    name: String::from("tags"),
                    boost: 10.0,
                },
                SearchField {
                    name: String::from("contents"),
                    boost: 1.0,
                },
            ],
        }
    }
}

// The on-disk shape of `postsmith.yaml`. Paths are relative to the project
// root.
#[derive(Deserialize)]
#[serde(default)]
struct Project {
    source: PathBuf,
    destination: PathBuf,
    templates: PathBuf,
    clean: bool,
    metadata: Metadata,
    partials: BTreeMap<String, String>,
    collections: Vec<CollectionConfig>,
    highlight: HighlightConfig,
    permalinks: PermalinkConfig,
    templating: TemplateConfig,
    search: SearchConfig,
}

impl Default for Project {
    fn default() -> Self {
        Project {
            source: PathBuf::from("src"),
            destination: PathBuf::from("build"),
            templates: PathBuf::from("templates"),
            clean: true,
            metadata: Metadata::new(),
            partials: ["_sidebar", "_head_common"]
                .iter()
                .map(|p| (p.to_string(), p.to_string()))
                .collect(),
            collections: vec![CollectionConfig {
                name: String::from("posts"),
                pattern: String::from("blog/*.md"),
                reverse: true,
            }],
            highlight: HighlightConfig::default(),
            permalinks: PermalinkConfig::default(),
            templating: TemplateConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

/// The resolved configuration for one build. All paths are absolute (or
/// relative to the working directory if the project root was).
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub root_directory: PathBuf,
    pub source_directory: PathBuf,
    pub destination_directory: PathBuf,
    pub templates_directory: PathBuf,

    /// Remove the destination directory before writing.
    pub clean: bool,

    /// Site-wide template attributes.
    pub metadata: Metadata,

    /// Partial name to file name, relative to the templates directory.
    pub partials: BTreeMap<String, String>,
    pub collections: Vec<CollectionConfig>,
    pub highlight: HighlightConfig,
    pub permalinks: PermalinkConfig,
    pub templating: TemplateConfig,
    pub search: SearchConfig,
}

impl Config {
    /// Searches `dir` and its ancestors for a project file. If there is none
    /// the defaults apply, rooted at `dir`.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        for ancestor in dir.ancestors() {
            let path = ancestor.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path)
                    .with_context(|| format!("Loading configuration `{}`", path.display()));
            }
        }
        tracing::info!(
            "no `{}` found from `{}`; using defaults",
            PROJECT_FILE,
            dir.display()
        );
        Ok(Config::rooted(dir, Project::default()))
    }

    /// Loads a specific project file. The project root is the file's parent
    /// directory.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let file = File::open(path)
            .map_err(|e| anyhow!("Opening project file `{}`: {}", path.display(), e))?;
        let project: Project = match serde_yaml::from_reader(file) {
            Ok(project) => project,
            // An empty file is a valid, all-defaults project.
            Err(e) if std::fs::metadata(path)?.len() == 0 => {
                tracing::debug!("empty project file: {}", e);
                Project::default()
            }
            Err(e) => return Err(e.into()),
        };
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(root) => Ok(Config::rooted(root, project)),
        }
    }

    fn rooted(root: &Path, project: Project) -> Config {
        Config {
            root_directory: root.to_owned(),
            source_directory: root.join(project.source),
            destination_directory: root.join(project.destination),
            templates_directory: root.join(project.templates),
            clean: project.clean,
            metadata: project.metadata,
            partials: project.partials,
            collections: project.collections,
            highlight: project.highlight,
            permalinks: project.permalinks,
            templating: project.templating,
            search: project.search,
        }
    }
}
