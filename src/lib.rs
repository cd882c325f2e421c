//! The library code for `indexer`, which stamps out index views (archive
//! pages, tag pages) from a paginated sequence. The core is
//! [`crate::indexer`]: given a list of [`crate::page::Page`]s and a clonable
//! [`crate::view::View`], it derives a key and a view for every page and adds
//! them to a [`crate::collection::Collection`].
//!
//! The rest of the crate supports the `indexer` binary, which builds a
//! paginated blog archive:
//!
//! 1. Loading the project configuration ([`crate::config`])
//! 2. Reading post front matter from disk ([`crate::post`])
//! 3. Paginating the posts ([`crate::page`]) and adding one index view per
//!    page ([`crate::indexer`])
//! 4. Rendering each index view to disk ([`crate::build`])

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod collection;
pub mod config;
pub mod indexer;
pub mod page;
pub mod post;
pub mod value;
pub mod view;
