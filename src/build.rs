//! Exports the [`build_archives`] function which stitches together the
//! high-level steps of building a paginated archive: reading post front matter
//! ([`crate::post`]), paginating the entries ([`crate::page`]), stamping out
//! one index view per page ([`crate::indexer`]), and rendering each view to
//! disk.

use crate::collection::Views;
use crate::config::Config;
use crate::indexer::{default_create_key, Error as IndexError, Indexer, Options, StrategyError};
use crate::page::{paginate, Page};
use crate::post::{parse_entries, ArchiveEntry, Error as ParseError};
use crate::value::Locals;
use crate::view::Template;
use gtmpl_value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// The index views written by [`build_archives`].
pub struct Archives {
    /// Every post, newest first. Keyed `index.hbs`, `2/index.hbs`, etc.
    pub all: Views<Template>,

    /// One paginated archive per year, keyed `{year}/index.hbs`,
    /// `{year}/2/index.hbs`, etc.
    pub years: Views<Template>,

    /// One paginated archive per month, keyed `{year}/{month}/index.hbs`,
    /// `{year}/{month}/2/index.hbs`, etc.
    pub months: Views<Template>,
}

/// Builds the archive pages described by `config` and writes them under
/// [`Config::archives_output_directory`]: the full archive at the root, and
/// the year and month archives under `{year}/` and `{year}/{month}/`.
pub fn build_archives(config: &Config) -> Result<Archives> {
    let posts_url = config.site_root.join("posts/")?;
    let entries = parse_entries(&config.posts_source_directory, &posts_url)?;
    info!(posts = entries.len(), "parsed posts");

    let index = load_index_template(&config.index_template)?;
    let mut site = Locals::new();
    site.insert("title".to_owned(), Value::from(config.title.as_str()));
    site.insert("site_root".to_owned(), Value::from(config.site_root.as_str()));

    let indexer = Indexer::new(Options::default().with_locals(site.clone()));
    let mut all = Views::new();
    indexer.add_indices(
        &mut all,
        &paginate(to_values(&entries), config.page_size),
        &Locals::new(),
        Options::default().with_index(index.clone().with_permalink(config.permalink.clone())),
    )?;

    let mut by_year: BTreeMap<&str, Vec<&ArchiveEntry>> = BTreeMap::new();
    let mut by_month: BTreeMap<(&str, &str), Vec<&ArchiveEntry>> = BTreeMap::new();
    for entry in &entries {
        match entry.year_month() {
            Some((year, month)) => {
                by_year.entry(year).or_default().push(entry);
                by_month.entry((year, month)).or_default().push(entry);
            }
            None => warn!(
                title = %entry.title,
                date = %entry.date,
                "date isn't YYYY-MM; leaving post out of the dated archives"
            ),
        }
    }

    // Groups share a collection, so keys and permalinks are prefixed with the
    // group's slug.
    let grouped = Indexer::new(
        Options::default()
            .with_locals(site)
            .with_create_key(group_key),
    );
    let group_index = index.with_permalink(format!("{{{{.slug}}}}/{}", config.permalink));

    let mut years = Views::new();
    for (year, group) in &by_year {
        grouped.add_indices(
            &mut years,
            &paginate(to_values(group.iter().copied()), config.page_size),
            &Locals::new(),
            Options::default()
                .with_index(group_index.clone())
                .with_locals(crate::value::locals(vec![("slug", *year), ("year", *year)])),
        )?;
    }

    let mut months = Views::new();
    for ((year, month), group) in &by_month {
        let slug = format!("{}/{}", year, month);
        grouped.add_indices(
            &mut months,
            &paginate(to_values(group.iter().copied()), config.page_size),
            &Locals::new(),
            Options::default()
                .with_index(group_index.clone())
                .with_locals(crate::value::locals(vec![
                    ("slug", slug.as_str()),
                    ("year", *year),
                    ("month", *month),
                ])),
        )?;
    }

    let written = write_archives(&config.archives_output_directory, &[&all, &years, &months])?;
    info!(
        pages = written,
        years = by_year.len(),
        months = by_month.len(),
        directory = %config.archives_output_directory.display(),
        "wrote archives"
    );
    Ok(Archives { all, years, months })
}

/// Renders every view in `collections` to `dir` and returns the number of
/// pages written. Every output path is checked before the old contents of
/// `dir` are removed (which keeps stale pages from a longer archive from
/// lingering).
fn write_archives(dir: &Path, collections: &[&Views<Template>]) -> Result<usize> {
    let mut files = Vec::new();
    for views in collections {
        for (key, view) in *views {
            let relative = view.url.as_deref().unwrap_or(key.as_str());
            files.push((key, output_path(dir, relative)?, view));
        }
    }

    rmdir(dir)?;
    for (key, file_path, view) in &files {
        write_view(view, file_path)?;
        debug!(key = %key, path = %file_path.display(), "wrote index page");
    }
    Ok(files.len())
}

fn to_values<'a>(entries: impl IntoIterator<Item = &'a ArchiveEntry>) -> Vec<Value> {
    entries.into_iter().map(Value::from).collect()
}

/// Keys a grouped index page under the group's `slug`, e.g. `2012/2/index.hbs`.
fn group_key(page: &Page, context: &Locals) -> std::result::Result<String, StrategyError> {
    match context.get("slug") {
        Some(Value::String(slug)) => Ok(format!("{}/{}", slug, default_create_key(page, context))),
        _ => Err("grouped archives need a `slug` local".into()),
    }
}

/// Joins a resolved permalink onto `dir`. Only plain relative paths are
/// allowed, so pages can't land outside `dir`.
fn output_path(dir: &Path, relative: &str) -> Result<PathBuf> {
    let path = Path::new(relative);
    let plain = path.components().all(|c| matches!(c, Component::Normal(_)));
    match plain && !relative.is_empty() {
        true => Ok(dir.join(path)),
        false => Err(Error::UnsafePath(relative.to_owned())),
    }
}

fn load_index_template(path: &Path) -> Result<Template> {
    let contents = std::fs::read_to_string(path).map_err(|err| Error::OpenTemplateFile {
        path: path.to_owned(),
        err,
    })?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("index.html");
    Ok(Template::new(name, contents))
}

fn write_view(view: &Template, file_path: &Path) -> Result<()> {
    let rendered = gtmpl::template(&view.contents, Value::Object(view.locals.clone()))
        .map_err(|err| Error::Render {
            path: file_path.to_owned(),
            message: err.to_string(),
        })?;
    if let Some(dir) = file_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(file_path, rendered)?;
    Ok(())
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building archives.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors reading post front matter.
    Parse(ParseError),

    /// Returned for errors adding index views.
    Index(IndexError),

    /// Returned when the posts URL can't be derived from the site root.
    UrlParse(url::ParseError),

    /// Returned for I/O problems while opening the index template.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned when an index view fails to render.
    Render { path: PathBuf, message: String },

    /// Returned when a permalink resolves to an absolute path or one that
    /// climbs out of the output directory.
    UnsafePath(String),

    /// Returned for I/O problems while cleaning the output directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Index(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::Render { path, message } => {
                write!(f, "Rendering '{}': {}", path.display(), message)
            }
            Error::UnsafePath(path) => write!(
                f,
                "Permalink '{}' must be a relative path inside the output directory",
                path
            ),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Index(err) => Some(err),
            Error::UrlParse(err) => Some(err),
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::Render { .. } => None,
            Error::UnsafePath(_) => None,
            Error::Clean { path: _, err } => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<IndexError> for Error {
    /// Converts [`IndexError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: IndexError) -> Error {
        Error::Index(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}
