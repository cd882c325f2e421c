//! Loads the project configuration from an `indexer.yaml` file.

use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "indexer.yaml";

/// The permalink used when the project file doesn't set one. The first page
/// lands at `index.html` and later pages at `{n}/index.html`.
pub const DEFAULT_PERMALINK: &str =
    "{{if not .pagination.is_first}}{{.pagination.current}}/{{end}}index.html";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

fn default_permalink() -> String {
    DEFAULT_PERMALINK.to_owned()
}

#[derive(Deserialize)]
struct Project {
    title: String,
    site_root: Url,
    index_template: PathBuf,

    #[serde(default)]
    page_size: PageSize,

    #[serde(default = "default_permalink")]
    permalink: String,
}

/// The resolved configuration for an archives build.
#[derive(Clone, Debug)]
pub struct Config {
    /// The archive title, available to templates as `.title`.
    pub title: String,

    /// The site's root URL, available to templates as `.site_root`.
    pub site_root: Url,

    /// The directory containing post source files (`{project}/posts`).
    pub posts_source_directory: PathBuf,

    /// The index template file.
    pub index_template: PathBuf,

    /// The permalink pattern for index pages.
    pub permalink: String,

    /// The number of posts per index page.
    pub page_size: usize,

    /// The directory archive pages are written under
    /// (`{output_directory}/archives`).
    pub archives_output_directory: PathBuf,
}

impl Config {
    /// Searches `dir` and its ancestors for [`PROJECT_FILE`] and loads the
    /// first one found.
    pub fn from_directory(dir: &Path, output_directory: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.is_file() {
            return Config::from_project_file(&path, output_directory);
        }
        match dir.parent() {
            Some(parent) => Config::from_directory(parent, output_directory),
            None => Err(Error::ProjectFileNotFound),
        }
    }

    /// Loads the project file at `path`. Relative paths in the file are
    /// resolved against the file's directory.
    pub fn from_project_file(path: &Path, output_directory: &Path) -> Result<Config> {
        let file = File::open(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let project: Project = serde_yaml::from_reader(file)?;
        let project_root = path
            .parent()
            .ok_or_else(|| Error::NoParentDirectory(path.to_owned()))?;

        Ok(Config {
            title: project.title,
            site_root: project.site_root,
            posts_source_directory: project_root.join("posts"),
            index_template: project_root.join(project.index_template),
            permalink: project.permalink,
            page_size: project.page_size.0,
            archives_output_directory: output_directory.join("archives"),
        })
    }
}

/// The result of loading configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading configuration.
#[derive(Debug)]
pub enum Error {
    /// Returned when no project file exists in the directory or any of its
    /// ancestors.
    ProjectFileNotFound,

    /// Returned when the project file can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when the project file path has no parent directory.
    NoParentDirectory(PathBuf),

    /// Returned when the project file isn't valid YAML or is missing fields.
    DeserializeYaml(serde_yaml::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ProjectFileNotFound => write!(
                f,
                "Could not find `{}` in any parent directory",
                PROJECT_FILE
            ),
            Error::Open { path, err } => {
                write!(f, "Opening project file '{}': {}", path.display(), err)
            }
            Error::NoParentDirectory(path) => write!(
                f,
                "Can't get parent directory for project file '{}'",
                path.display()
            ),
            Error::DeserializeYaml(err) => write!(f, "Loading configuration: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ProjectFileNotFound => None,
            Error::Open { path: _, err } => Some(err),
            Error::NoParentDirectory(_) => None,
            Error::DeserializeYaml(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}
