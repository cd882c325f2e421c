//! The indexer plugin. An [`Indexer`] takes a sequence of [`Page`]s and an
//! index [`View`] and adds one view per page to a [`Collection`]:
//!
//! ```ignore
//! let indexer = Indexer::new(Options::default().with_index(index));
//! indexer
//!     .attach(&mut archives)
//!     .add_indices(&pages, &Locals::new(), Options::default())?;
//! ```
//!
//! Each page gets a context of `{pages, pagination}` merged with the
//! configured and caller-supplied locals. A key and a view are derived from
//! that context. Both derivations have defaults ([`default_create_key`],
//! [`default_create_view`]), and either can be replaced independently at
//! construction time or per call.

use crate::collection::Collection;
use crate::page::Page;
use crate::value::{merge, merged, Locals};
use crate::view::{ResolveError, View};
use gtmpl_value::Value;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// The key given to the first index page. Later pages are namespaced under a
/// directory named after their page number, e.g. `2/index.hbs`.
pub const DEFAULT_KEY: &str = "index.hbs";

/// The error type returned by caller-supplied strategies.
pub type StrategyError = Box<dyn std::error::Error>;

/// Replaces the default view derivation. Called once per page with that
/// page's context.
pub type CreateView<V> = Rc<dyn Fn(&Locals) -> std::result::Result<V, StrategyError>>;

/// Replaces the default key derivation.
pub type CreateKey = Rc<dyn Fn(&Page, &Locals) -> std::result::Result<String, StrategyError>>;

/// Indexer configuration. The same type is used for construction-time and
/// call-time options; see [`Options::merge`] for precedence.
pub struct Options<V> {
    /// The view cloned for each page. Ignored when `create_view` is set.
    pub index: Option<V>,
    pub create_view: Option<CreateView<V>>,
    pub create_key: Option<CreateKey>,

    /// Locals merged into every page's context.
    pub locals: Locals,
}

impl<V> Default for Options<V> {
    fn default() -> Self {
        Options {
            index: None,
            create_view: None,
            create_key: None,
            locals: Locals::new(),
        }
    }
}

impl<V: Clone> Clone for Options<V> {
    fn clone(&self) -> Self {
        Options {
            index: self.index.clone(),
            create_view: self.create_view.clone(),
            create_key: self.create_key.clone(),
            locals: self.locals.clone(),
        }
    }
}

impl<V> Options<V> {
    pub fn with_index(mut self, index: V) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_create_view<F>(mut self, f: F) -> Self
    where
        F: Fn(&Locals) -> std::result::Result<V, StrategyError> + 'static,
    {
        let f: CreateView<V> = Rc::new(f);
        self.create_view = Some(f);
        self
    }

    pub fn with_create_key<F>(mut self, f: F) -> Self
    where
        F: Fn(&Page, &Locals) -> std::result::Result<String, StrategyError> + 'static,
    {
        let f: CreateKey = Rc::new(f);
        self.create_key = Some(f);
        self
    }

    pub fn with_locals(mut self, locals: Locals) -> Self {
        self.locals = locals;
        self
    }

    /// Layers `call` on top of `self`. Every strategy set in `call` wins;
    /// locals are deep-merged with `call` winning on conflicts.
    pub fn merge(mut self, call: Options<V>) -> Options<V> {
        merge(&mut self.locals, &call.locals);
        Options {
            index: call.index.or(self.index),
            create_view: call.create_view.or(self.create_view),
            create_key: call.create_key.or(self.create_key),
            locals: self.locals,
        }
    }
}

/// The default key policy: [`DEFAULT_KEY`] for the first page, and
/// `{current}/{DEFAULT_KEY}` for every other page.
pub fn default_create_key(page: &Page, _context: &Locals) -> String {
    match page.is_first {
        true => DEFAULT_KEY.to_owned(),
        false => format!("{}/{}", page.current, DEFAULT_KEY),
    }
}

/// The default view policy: clone `index`, merge `context` into the clone's
/// locals (context wins), and resolve its permalink if the view supports it.
/// The permalink sees the merged locals, so nothing extra is passed along.
pub fn default_create_view<V: View>(index: &V, context: &Locals) -> std::result::Result<V, ResolveError> {
    let mut view = index.clone();
    merge(view.locals_mut(), context);
    if let Some(resolvable) = view.resolvable() {
        resolvable.resolve(&Locals::new())?;
    }
    Ok(view)
}

/// How views are derived for one `add_indices` call, settled before any page
/// is processed.
enum ViewStrategy<'a, V> {
    Clone(&'a V),
    Custom(&'a CreateView<V>),
}

/// The indexer plugin. Holds the construction-time [`Options`].
pub struct Indexer<V> {
    options: Options<V>,
}

impl<V: View> Indexer<V> {
    pub fn new(options: Options<V>) -> Indexer<V> {
        Indexer { options }
    }

    /// Attaches the indexer to `collection`, returning a handle whose
    /// [`Indexed::add_indices`] can be chained.
    pub fn attach<'a, C: Collection<V>>(&'a self, collection: &'a mut C) -> Indexed<'a, C, V> {
        Indexed {
            indexer: self,
            collection,
        }
    }

    /// Adds one index view per page in `pages` to `collection` and returns
    /// the collection.
    ///
    /// `options` override the construction-time options for this call only.
    /// Fails with [`Error::MissingIndex`] before touching the collection if
    /// neither an index view nor a `create_view` strategy is configured. A
    /// failing strategy aborts the loop; views added for earlier pages are
    /// kept.
    pub fn add_indices<'c, C: Collection<V>>(
        &self,
        collection: &'c mut C,
        pages: &[Page],
        locals: &Locals,
        options: Options<V>,
    ) -> Result<&'c mut C> {
        let options = self.options.clone().merge(options);
        let strategy = match (&options.create_view, &options.index) {
            (Some(f), _) => ViewStrategy::Custom(f),
            (None, Some(index)) => ViewStrategy::Clone(index),
            (None, None) => return Err(Error::MissingIndex),
        };

        let mut shared = Locals::new();
        shared.insert(
            "pages".to_owned(),
            Value::Array(pages.iter().map(Value::from).collect()),
        );

        for page in pages {
            shared.insert("pagination".to_owned(), Value::from(page));
            let context = merged(vec![&options.locals, &shared, locals]);

            let key = match &options.create_key {
                Some(f) => f(page, &context).map_err(|err| Error::CreateKey {
                    page: page.current,
                    err,
                })?,
                None => default_create_key(page, &context),
            };

            let view = match &strategy {
                ViewStrategy::Custom(f) => f(&context).map_err(|err| Error::CreateView {
                    page: page.current,
                    err,
                })?,
                ViewStrategy::Clone(index) => {
                    default_create_view(*index, &context).map_err(|err| Error::Resolve {
                        page: page.current,
                        err,
                    })?
                }
            };

            trace!(page = page.current, key = %key, "adding index view");
            collection.insert(key, view);
        }

        debug!(pages = pages.len(), "added index views");
        Ok(collection)
    }
}

/// A collection with an [`Indexer`] attached.
pub struct Indexed<'a, C, V> {
    indexer: &'a Indexer<V>,
    collection: &'a mut C,
}

impl<'a, C: Collection<V>, V: View> Indexed<'a, C, V> {
    /// See [`Indexer::add_indices`]. Returns `self` so calls can be chained.
    pub fn add_indices(
        &mut self,
        pages: &[Page],
        locals: &Locals,
        options: Options<V>,
    ) -> Result<&mut Self> {
        self.indexer
            .add_indices(&mut *self.collection, pages, locals, options)?;
        Ok(self)
    }

    /// Releases the collection.
    pub fn into_inner(self) -> &'a mut C {
        self.collection
    }
}

/// The result of an indexing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error adding index views.
#[derive(Debug)]
pub enum Error {
    /// Returned when neither an index view nor a `create_view` strategy is
    /// configured. Raised before any view is added.
    MissingIndex,

    /// Returned when a `create_key` strategy fails.
    CreateKey { page: usize, err: StrategyError },

    /// Returned when a `create_view` strategy fails.
    CreateView { page: usize, err: StrategyError },

    /// Returned when resolving a cloned view's permalink fails.
    Resolve { page: usize, err: ResolveError },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingIndex => write!(
                f,
                "expected index to be an instance of a view/clonable template"
            ),
            Error::CreateKey { page, err } => {
                write!(f, "creating key for page {}: {}", page, err)
            }
            Error::CreateView { page, err } => {
                write!(f, "creating view for page {}: {}", page, err)
            }
            Error::Resolve { page, err } => write!(f, "page {}: {}", page, err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingIndex => None,
            Error::CreateKey { page: _, err } => Some(err.as_ref()),
            Error::CreateView { page: _, err } => Some(err.as_ref()),
            Error::Resolve { page: _, err } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::collection::Views;
    use crate::page::paginate;
    use crate::value::locals;
    use crate::view::Template;

    const PERMALINK: &str =
        "{{if not .pagination.is_first}}{{.pagination.current}}/{{end}}{{.name}}.html";

    fn pages() -> Vec<Page> {
        paginate(
            vec!["a.hbs", "b.hbs", "c.hbs", "d.hbs", "e.hbs"]
                .into_iter()
                .map(Value::from)
                .collect(),
            2,
        )
    }

    fn index() -> Template {
        Template::new("index.hbs", "").with_permalink(PERMALINK)
    }

    fn indexer() -> Indexer<Template> {
        Indexer::new(Options::default().with_index(index()))
    }

    /// A view without a permalink capability.
    #[derive(Clone, Debug, Default)]
    struct Plain {
        locals: Locals,
    }

    impl View for Plain {
        fn locals(&self) -> &Locals {
            &self.locals
        }

        fn locals_mut(&mut self) -> &mut Locals {
            &mut self.locals
        }
    }

    #[test]
    fn test_default_options() -> Result<()> {
        let pages = pages();
        let mut archives = Views::new();
        indexer().add_indices(&mut archives, &pages, &Locals::new(), Options::default())?;

        assert_eq!(archives.len(), pages.len());
        assert_eq!(
            archives.keys().collect::<Vec<_>>(),
            vec!["2/index.hbs", "3/index.hbs", "index.hbs"]
        );
        for page in &pages {
            let view = archives.get(&default_create_key(page, &Locals::new())).unwrap();
            assert_eq!(view.locals.get("pagination"), Some(&Value::from(page)));
            assert_eq!(
                view.locals.get("pages"),
                Some(&Value::Array(pages.iter().map(Value::from).collect()))
            );
        }
        Ok(())
    }

    #[test]
    fn test_default_view_resolves_permalinks() -> Result<()> {
        let mut archives = Views::new();
        indexer().add_indices(&mut archives, &pages(), &Locals::new(), Options::default())?;

        let url = |key: &str| archives.get(key).and_then(|v| v.url.clone());
        assert_eq!(url("index.hbs").as_deref(), Some("index.html"));
        assert_eq!(url("2/index.hbs").as_deref(), Some("2/index.html"));
        assert_eq!(url("3/index.hbs").as_deref(), Some("3/index.html"));
        Ok(())
    }

    #[test]
    fn test_view_without_permalink_capability() -> Result<()> {
        let indexer = Indexer::new(Options::default().with_index(Plain::default()));
        let mut archives = Views::new();
        indexer.add_indices(&mut archives, &pages(), &Locals::new(), Options::default())?;
        assert_eq!(archives.len(), 3);
        Ok(())
    }

    #[test]
    fn test_missing_index_fails_before_mutation() {
        let indexer: Indexer<Template> = Indexer::new(Options::default());
        let mut archives = Views::new();
        match indexer.add_indices(&mut archives, &pages(), &Locals::new(), Options::default()) {
            Err(Error::MissingIndex) => {}
            Err(err) => panic!("wrong error: {}", err),
            Ok(_) => panic!("expected an error"),
        }
        assert!(archives.is_empty());
    }

    #[test]
    fn test_missing_index_message() {
        assert_eq!(
            Error::MissingIndex.to_string(),
            "expected index to be an instance of a view/clonable template"
        );
    }

    #[test]
    fn test_empty_pages_is_noop() -> Result<()> {
        let indexer: Indexer<Template> = indexer();
        let mut archives = Views::new();
        let out = indexer.add_indices(&mut archives, &[], &Locals::new(), Options::default())?;
        assert!(out.is_empty());
        Ok(())
    }

    #[test]
    fn test_single_first_page() -> Result<()> {
        let mut archives = Views::new();
        indexer().add_indices(
            &mut archives,
            &[Page::new(1, true)],
            &Locals::new(),
            Options::default(),
        )?;
        assert_eq!(archives.keys().collect::<Vec<_>>(), vec![DEFAULT_KEY]);
        Ok(())
    }

    #[test]
    fn test_default_create_key_is_pure() {
        let page = Page::new(4, false);
        let context = Locals::new();
        assert_eq!(default_create_key(&page, &context), "4/index.hbs");
        assert_eq!(
            default_create_key(&page, &context),
            default_create_key(&page, &context)
        );
        assert_eq!(default_create_key(&Page::new(1, true), &context), "index.hbs");
    }

    #[test]
    fn test_create_view_on_plugin_options() -> Result<()> {
        let archive = Template::new("archive-index.hbs", "{{.title}}").with_permalink(PERMALINK);
        let indexer = Indexer::new(Options::default().with_create_view(move |context| {
            let mut view = archive.clone();
            view.locals = context.clone();
            Ok(view)
        }));

        let pages = pages();
        let mut archives = Views::new();
        indexer.add_indices(&mut archives, &pages, &Locals::new(), Options::default())?;

        assert_eq!(archives.len(), pages.len());
        for page in &pages {
            let view = archives.get(&default_create_key(page, &Locals::new())).unwrap();
            assert_eq!(view.contents, "{{.title}}");
            assert_eq!(view.locals.get("pagination"), Some(&Value::from(page)));
            // The custom strategy does not resolve permalinks.
            assert_eq!(view.url, None);
        }
        Ok(())
    }

    #[test]
    fn test_create_view_on_call_options() -> Result<()> {
        let indexer: Indexer<Template> = Indexer::new(Options::default());
        let mut archives = Views::new();
        indexer.add_indices(
            &mut archives,
            &pages(),
            &Locals::new(),
            Options::default().with_create_view(|context| {
                Ok(Template::new("archive-index.hbs", "archive").with_locals(context.clone()))
            }),
        )?;
        assert_eq!(archives.len(), 3);
        assert_eq!(archives.get("index.hbs").unwrap().contents, "archive");
        Ok(())
    }

    #[test]
    fn test_create_view_wins_over_index() -> Result<()> {
        let indexer = Indexer::new(
            Options::default()
                .with_index(index())
                .with_create_view(|_| Ok(Template::new("custom.hbs", "custom"))),
        );
        let mut archives = Views::new();
        indexer.add_indices(&mut archives, &pages(), &Locals::new(), Options::default())?;
        assert!(archives.iter().all(|(_, v)| v.path == "custom.hbs"));
        Ok(())
    }

    #[test]
    fn test_create_key_only() -> Result<()> {
        let pages = pages();
        let mut archives = Views::new();
        indexer().add_indices(
            &mut archives,
            &pages,
            &Locals::new(),
            Options::default().with_create_key(|page, _| Ok(format!("page-{}.hbs", page.current))),
        )?;

        assert_eq!(
            archives.keys().collect::<Vec<_>>(),
            vec!["page-1.hbs", "page-2.hbs", "page-3.hbs"]
        );
        // Views still come from the default clone-and-resolve strategy.
        assert_eq!(
            archives.get("page-2.hbs").and_then(|v| v.url.as_deref()),
            Some("2/index.html")
        );
        Ok(())
    }

    #[test]
    fn test_additional_locals() -> Result<()> {
        let mut archives = Views::new();
        indexer().add_indices(
            &mut archives,
            &pages(),
            &locals(vec![("title", "Archives")]),
            Options::default(),
        )?;
        assert!(archives
            .iter()
            .all(|(_, v)| v.locals.get("title") == Some(&Value::from("Archives"))));
        Ok(())
    }

    #[test]
    fn test_locals_precedence() -> Result<()> {
        let indexer = Indexer::new(
            Options::default()
                .with_index(index().with_locals(locals(vec![("a", "view"), ("b", "view")])))
                .with_locals(locals(vec![("b", "plugin"), ("c", "plugin"), ("d", "plugin")])),
        );
        let mut archives = Views::new();
        indexer.add_indices(
            &mut archives,
            &[Page::new(1, true)],
            &locals(vec![("d", "caller")]),
            Options::default().with_locals(locals(vec![("c", "call")])),
        )?;

        let view = archives.get(DEFAULT_KEY).unwrap();
        let get = |k: &str| view.locals.get(k).cloned();
        assert_eq!(get("a"), Some(Value::from("view")));
        assert_eq!(get("b"), Some(Value::from("plugin")));
        assert_eq!(get("c"), Some(Value::from("call")));
        assert_eq!(get("d"), Some(Value::from("caller")));
        Ok(())
    }

    #[test]
    fn test_clones_do_not_share_locals() -> Result<()> {
        let index = index().with_locals(locals(vec![("shared", "original")]));
        let indexer = Indexer::new(Options::default().with_index(index));
        let mut archives = Views::new();
        indexer.add_indices(&mut archives, &pages(), &Locals::new(), Options::default())?;

        let mut first = archives.get("index.hbs").unwrap().clone();
        first
            .locals
            .insert("shared".to_owned(), Value::from("changed"));
        assert_eq!(
            archives.get("2/index.hbs").unwrap().locals.get("shared"),
            Some(&Value::from("original"))
        );
        Ok(())
    }

    #[test]
    fn test_strategy_failure_keeps_earlier_views() {
        let mut archives = Views::new();
        let options = Options::default().with_create_key(|page, context| match page.current {
            2 => Err("boom".into()),
            _ => Ok(default_create_key(page, context)),
        });

        match indexer().add_indices(&mut archives, &pages(), &Locals::new(), options) {
            Err(Error::CreateKey { page: 2, .. }) => {}
            Err(err) => panic!("wrong error: {}", err),
            Ok(_) => panic!("expected an error"),
        }
        assert_eq!(archives.keys().collect::<Vec<_>>(), vec!["index.hbs"]);
    }

    #[test]
    fn test_resolve_failure() {
        let indexer = Indexer::new(
            Options::default().with_index(Template::new("index.hbs", "").with_permalink("{{")),
        );
        let mut archives = Views::new();
        assert!(matches!(
            indexer.add_indices(&mut archives, &pages(), &Locals::new(), Options::default()),
            Err(Error::Resolve { page: 1, .. })
        ));
        assert!(archives.is_empty());
    }

    #[test]
    fn test_attach_chains() -> Result<()> {
        let indexer = indexer();
        let mut archives = Views::new();
        let mut indexed = indexer.attach(&mut archives);
        indexed
            .add_indices(&[Page::new(1, true)], &Locals::new(), Options::default())?
            .add_indices(
                &[Page::new(2, false)],
                &Locals::new(),
                Options::default(),
            )?;
        let archives = indexed.into_inner();
        assert_eq!(
            archives.keys().collect::<Vec<_>>(),
            vec!["2/index.hbs", "index.hbs"]
        );
        Ok(())
    }

    #[test]
    fn test_call_time_index_replaces_plugin_index() -> Result<()> {
        let indexer = Indexer::new(
            Options::default().with_index(Template::new("plugin.hbs", "plugin")),
        );
        let mut archives = Views::new();
        indexer.add_indices(
            &mut archives,
            &pages(),
            &Locals::new(),
            Options::default().with_index(Template::new("call.hbs", "call")),
        )?;

        assert_eq!(archives.len(), 3);
        assert!(archives
            .iter()
            .all(|(_, v)| v.path == "call.hbs" && v.contents == "call"));
        Ok(())
    }

    #[test]
    fn test_create_key_on_plugin_options() -> Result<()> {
        let indexer = Indexer::new(
            Options::default()
                .with_index(index())
                .with_create_key(|page, _| Ok(format!("k{}", page.current))),
        );
        let mut archives = Views::new();
        indexer.add_indices(
            &mut archives,
            &pages(),
            &Locals::new(),
            Options::default().with_index(Template::new("call.hbs", "call")),
        )?;

        assert_eq!(archives.keys().collect::<Vec<_>>(), vec!["k1", "k2", "k3"]);
        assert!(archives.iter().all(|(_, v)| v.contents == "call"));
        Ok(())
    }

    #[test]
    fn test_repeat_call_overwrites() -> Result<()> {
        let indexer = indexer();
        let mut archives = Views::new();
        let pages = pages();
        indexer.add_indices(&mut archives, &pages, &Locals::new(), Options::default())?;
        indexer.add_indices(
            &mut archives,
            &pages,
            &locals(vec![("title", "Second")]),
            Options::default(),
        )?;
        assert_eq!(archives.len(), 3);
        assert_eq!(
            archives.get("index.hbs").unwrap().locals.get("title"),
            Some(&Value::from("Second"))
        );
        Ok(())
    }
}
