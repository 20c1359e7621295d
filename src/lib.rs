//! The library code for the `postsmith` static site generator. A build reads
//! every file under the source directory into a [`document::Site`], passes the
//! site through an ordered [`build::Pipeline`] of stages and writes whatever
//! comes out to the destination directory.
//!
//! The stages, in order:
//!
//! 1. Group posts into date-sorted collections ([`crate::collections`])
//! 2. Highlight fenced code blocks in Markdown sources ([`crate::highlight`])
//! 3. Render Markdown to HTML ([`crate::markdown`])
//! 4. Extract excerpts ([`crate::excerpt`])
//! 5. Rewrite output paths into permalinks ([`crate::permalink`])
//! 6. Apply layout templates ([`crate::template`])
//! 7. Build the client-side search index ([`crate::search`])
//!
//! Files the stages don't recognize (stylesheets, images and so on) pass
//! through untouched.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod collections;
pub mod config;
pub mod document;
pub mod excerpt;
pub mod highlight;
pub mod markdown;
pub mod permalink;
pub mod read;
pub mod search;
pub mod sort;
pub mod template;
pub mod value;
pub mod write;
