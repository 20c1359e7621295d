//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: reading the source directory
//! ([`crate::read`]), running the [`Pipeline`] of transformation stages over
//! the documents, and writing the results to disk ([`crate::write`]).
//!
//! Every stage sees the whole [`Site`] and the stages run in a fixed order:
//!
//! 1. [`Collections`]: group and sort posts
//! 2. [`Highlight`]: syntax-highlight fenced code in Markdown sources
//! 3. [`Markdown`]: render Markdown to HTML
//! 4. [`Excerpts`]: extract summaries
//! 5. [`Permalinks`]: move pages to directory-style output paths
//! 6. [`Templates`]: apply layouts
//! 7. [`Indexer`]: emit the search index

use crate::collections::{self, Collections};
use crate::config::Config;
use crate::document::Site;
use crate::excerpt::Excerpts;
use crate::highlight::{self, Highlight};
use crate::markdown::{self, Markdown};
use crate::permalink::{self, Permalinks};
use crate::read::{self, read_site};
use crate::search::{self, Indexer};
use crate::template::{self, Templates};
use crate::write::{self, write_site};
use std::fmt;

/// One step of the build. A stage may modify, add or remove any document.
pub trait Stage {
    /// A short name for logs.
    fn name(&self) -> &'static str;

    fn run(&self, site: &mut Site) -> Result<()>;
}

/// An ordered list of [`Stage`]s.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Builds the standard pipeline for a project. Fails if the configuration
    /// names an unknown theme or an invalid collection pattern.
    pub fn from_config(config: &Config) -> Result<Pipeline> {
        Ok(Pipeline {
            stages: vec![
                Box::new(Collections::new(&config.collections)?),
                Box::new(Highlight::new(&config.highlight)?),
                Box::new(Markdown),
                Box::new(Excerpts),
                Box::new(Permalinks::new(&config.permalinks.pattern)),
                Box::new(Templates::new(
                    &config.templates_directory,
                    &config.partials,
                    &config.templating,
                )),
                Box::new(Indexer::new(&config.search)),
            ],
        })
    }

    /// Runs each stage in order, stopping at the first failure.
    pub fn run(&self, site: &mut Site) -> Result<()> {
        for stage in &self.stages {
            tracing::debug!("running stage `{}`", stage.name());
            stage.run(site)?;
        }
        Ok(())
    }
}

/// Builds the site from a [`Config`] object and returns the documents that
/// were written.
pub fn build_site(config: &Config) -> Result<Site> {
    if config.clean {
        write::check_clean(
            &config.destination_directory,
            &[
                config.root_directory.as_path(),
                config.source_directory.as_path(),
                config.templates_directory.as_path(),
            ],
        )?;
    }
    let pipeline = Pipeline::from_config(config)?;
    let mut site = read_site(&config.source_directory, config.metadata.clone())?;
    pipeline.run(&mut site)?;
    write_site(&site, &config.destination_directory, config.clean)?;
    tracing::info!(
        "wrote {} files to `{}`",
        site.files.len(),
        config.destination_directory.display()
    );
    Ok(site)
}

/// The result of a fallible build step.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Each variant wraps the error of one
/// step.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors reading or parsing source files.
    Read(read::Error),

    /// Returned for invalid collection patterns.
    Collection(collections::Error),

    /// Returned for unknown themes and highlighting failures.
    Highlight(highlight::Error),

    /// Returned when a Markdown document isn't valid UTF-8.
    Markdown(markdown::Error),

    /// Returned when two documents claim the same output path.
    Permalink(permalink::Error),

    /// Returned for errors loading or executing templates.
    Template(template::Error),

    /// Returned when the search index can't be serialized or would
    /// overwrite another document.
    Search(search::Error),

    /// Returned for errors cleaning or writing the output directory.
    Write(write::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Read(err) => err.fmt(f),
            Error::Collection(err) => err.fmt(f),
            Error::Highlight(err) => err.fmt(f),
            Error::Markdown(err) => err.fmt(f),
            Error::Permalink(err) => err.fmt(f),
            Error::Template(err) => err.fmt(f),
            Error::Search(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Read(err) => Some(err),
            Error::Collection(err) => Some(err),
            Error::Highlight(err) => Some(err),
            Error::Markdown(err) => Some(err),
            Error::Permalink(err) => Some(err),
            Error::Template(err) => Some(err),
            Error::Search(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<read::Error> for Error {
    fn from(err: read::Error) -> Error {
        Error::Read(err)
    }
}

impl From<collections::Error> for Error {
    fn from(err: collections::Error) -> Error {
        Error::Collection(err)
    }
}

impl From<highlight::Error> for Error {
    fn from(err: highlight::Error) -> Error {
        Error::Highlight(err)
    }
}

impl From<markdown::Error> for Error {
    fn from(err: markdown::Error) -> Error {
        Error::Markdown(err)
    }
}

impl From<permalink::Error> for Error {
    fn from(err: permalink::Error) -> Error {
        Error::Permalink(err)
    }
}

impl From<template::Error> for Error {
    fn from(err: template::Error) -> Error {
        Error::Template(err)
    }
}

impl From<search::Error> for Error {
    fn from(err: search::Error) -> Error {
        Error::Search(err)
    }
}

impl From<write::Error> for Error {
    fn from(err: write::Error) -> Error {
        Error::Write(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
