//! Defines the [`View`] trait for clonable index templates, the optional
//! [`Resolvable`] permalink capability, and [`Template`], the concrete view
//! used by the archives build.

use crate::value::{merge, Locals};
use gtmpl_value::Value;
use std::fmt;
use std::path::Path;

/// A view which can be stamped out once per page. `Clone` must produce an
/// independent copy: the same index view is cloned for every page, so a clone
/// sharing mutable state with its prototype would bleed locals across pages.
pub trait View: Clone + 'static {
    /// The view's own locals.
    fn locals(&self) -> &Locals;

    /// Mutable access to the view's locals.
    fn locals_mut(&mut self) -> &mut Locals;

    /// Returns the view's permalink capability, if it has one. Views without
    /// permalinks keep the default.
    fn resolvable(&mut self) -> Option<&mut dyn Resolvable> {
        None
    }
}

/// A view whose output location is derived from its context.
pub trait Resolvable {
    /// Resolves the view's own permalink pattern against its locals and
    /// stores the result on the view. `extra` is layered over the locals for
    /// this resolution only; it may be empty.
    fn resolve(&mut self, extra: &Locals) -> Result<(), ResolveError>;
}

/// A template view: a path, unrendered contents, locals, and an optional
/// permalink pattern. The pattern is itself a template, rendered with the
/// view's locals plus `name` (the file stem of `path`) and `ext`.
#[derive(Clone, Debug, Default)]
pub struct Template {
    pub path: String,
    pub contents: String,
    pub locals: Locals,
    pub permalink: Option<String>,

    /// The resolved permalink. Set by [`Resolvable::resolve`].
    pub url: Option<String>,
}

impl Template {
    pub fn new(path: impl Into<String>, contents: impl Into<String>) -> Template {
        Template {
            path: path.into(),
            contents: contents.into(),
            ..Template::default()
        }
    }

    pub fn with_permalink(mut self, pattern: impl Into<String>) -> Template {
        self.permalink = Some(pattern.into());
        self
    }

    pub fn with_locals(mut self, locals: Locals) -> Template {
        self.locals = locals;
        self
    }

    fn name(&self) -> &str {
        Path::new(&self.path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
    }

    fn ext(&self) -> &str {
        Path::new(&self.path)
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
    }
}

impl View for Template {
    fn locals(&self) -> &Locals {
        &self.locals
    }

    fn locals_mut(&mut self) -> &mut Locals {
        &mut self.locals
    }

    fn resolvable(&mut self) -> Option<&mut dyn Resolvable> {
        Some(self)
    }
}

impl Resolvable for Template {
    fn resolve(&mut self, extra: &Locals) -> Result<(), ResolveError> {
        let pattern = match &self.permalink {
            Some(pattern) => pattern,
            None => return Ok(()),
        };

        let mut data = self.locals.clone();
        if !extra.is_empty() {
            merge(&mut data, extra);
        }
        data.insert("name".to_owned(), Value::from(self.name()));
        data.insert("ext".to_owned(), Value::from(self.ext()));

        match gtmpl::template(pattern, Value::Object(data)) {
            Ok(url) => {
                self.url = Some(url.trim().to_owned());
                Ok(())
            }
            Err(err) => Err(ResolveError {
                pattern: pattern.clone(),
                message: err.to_string(),
            }),
        }
    }
}

/// Returned when a permalink pattern fails to render.
#[derive(Debug)]
pub struct ResolveError {
    pub pattern: String,
    pub message: String,
}

impl fmt::Display for ResolveError {
    /// Displays a [`ResolveError`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "resolving permalink `{}`: {}",
            &self.pattern, &self.message
        )
    }
}

impl std::error::Error for ResolveError {}
