//! Defines [`ArchiveEntry`] and the logic for reading post front matter from
//! the file system. Only the front matter is read; post bodies are left to
//! whatever renders the posts themselves.

use gtmpl_value::Value;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;
use walkdir::WalkDir;

const MARKDOWN_EXTENSION: &str = "md";

/// One post as listed on an archive page.
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveEntry {
    pub title: String,
    pub date: String,
    pub slug: String,

    /// `{posts_url}/{slug}.html`
    pub url: Url,
    pub tags: Vec<String>,
}

impl From<&ArchiveEntry> for Value {
    /// Converts an [`ArchiveEntry`] into a [`Value::Object`] with fields
    /// `title`, `date`, `slug`, `url`, and `tags`.
    fn from(entry: &ArchiveEntry) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::from(entry.title.as_str()));
        m.insert("date".to_owned(), Value::from(entry.date.as_str()));
        m.insert("slug".to_owned(), Value::from(entry.slug.as_str()));
        m.insert("url".to_owned(), Value::from(entry.url.as_str()));
        m.insert(
            "tags".to_owned(),
            Value::Array(entry.tags.iter().map(|t| Value::from(t.as_str())).collect()),
        );
        Value::Object(m)
    }
}

impl ArchiveEntry {
    /// Splits `date` into its year and month, e.g. `("2012", "03")` for
    /// `2012-03-17`. Returns `None` when the date isn't `YYYY-MM...`.
    pub fn year_month(&self) -> Option<(&str, &str)> {
        let mut parts = self.date.splitn(3, '-');
        let year = parts.next()?;
        let month = parts.next()?;
        let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
        match digits(year, 4) && digits(month, 2) {
            true => Some((year, month)),
            false => None,
        }
    }
}

#[derive(Deserialize)]
struct Frontmatter {
    #[serde(rename = "Title")]
    title: String,

    #[serde(rename = "Date")]
    date: String,

    #[serde(default, rename = "Tags")]
    tags: Vec<String>,
}

/// Parses the front matter of `input` into an [`ArchiveEntry`]. The input must
/// begin with a `---` fence followed by YAML with fields `Title`, `Date`, and
/// optionally `Tags`, then a closing `---` fence.
pub fn parse_entry(input: &str, posts_url: &Url) -> Result<ArchiveEntry> {
    const FENCE: &str = "---";
    if !input.starts_with(FENCE) {
        return Err(Error::FrontmatterMissingStartFence);
    }
    let yaml_stop = match input[FENCE.len()..].find(FENCE) {
        None => return Err(Error::FrontmatterMissingEndFence),
        Some(offset) => FENCE.len() + offset,
    };

    let frontmatter: Frontmatter = serde_yaml::from_str(&input[FENCE.len()..yaml_stop])?;
    let slug = slug::slugify(&frontmatter.title);
    Ok(ArchiveEntry {
        url: posts_url.join(&format!("{}.html", slug))?,
        title: frontmatter.title,
        date: frontmatter.date,
        slug,
        tags: frontmatter.tags,
    })
}

/// Walks `source_directory` for post files (extension `.md`) and returns
/// their entries sorted by date, most recent first.
pub fn parse_entries(source_directory: &Path, posts_url: &Url) -> Result<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    for result in WalkDir::new(source_directory).sort_by_file_name() {
        let entry = result?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some(MARKDOWN_EXTENSION)
        {
            continue;
        }

        let contents = std::fs::read_to_string(path)?;
        let parsed = parse_entry(&contents, posts_url)
            .map_err(|err| Error::Annotated(path.to_owned(), Box::new(err)))?;
        tracing::trace!(path = %path.display(), title = %parsed.title, "parsed post");
        entries.push(parsed);
    }

    entries.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(entries)
}

/// Represents the result of a parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing post front matter.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file is missing its starting frontmatter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when a post source file is missing its terminal frontmatter
    /// fence (`---` i.e., the starting fence was found but the ending one was
    /// missing).
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when there is a problem building a post URL.
    UrlParse(url::ParseError),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// An error annotated with the file it came from.
    Annotated(PathBuf, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "Post must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::Annotated(path, err) => {
                write!(f, "parsing post `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingStartFence => None,
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`].
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`].
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
