//! Descriptor (`parcel.toml`) parsing, validation, and the resolved package manifest.

use crate::artifacts::ArtifactGroup;
use crate::describe::DescribeOptions;
use crate::layout::{normalize_relative, DEFAULT_README};
use crate::requirement::Requirement;
use crate::version::{validate_name, validate_version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The two classes of failure a descriptor can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A declared file does not exist or cannot be read.
    ResourceNotFound,
    /// A field is missing, empty, or violates the distribution format.
    MalformedManifest,
}

/// Errors that can occur when describing a package.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read {}: {source}", .path.display())]
    ResourceNotFound {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("missing artifact files: {}", join_paths(.0))]
    MissingArtifacts(Vec<PathBuf>),

    #[error("failed to parse descriptor: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("field `{0}` must be a single line")]
    MultiLine(&'static str),

    #[error("invalid package name '{0}': {1}")]
    InvalidName(String, &'static str),

    #[error("invalid version '{0}': {1}")]
    InvalidVersion(String, String),

    #[error("invalid requirement '{0}': {1}")]
    InvalidRequirement(String, String),

    #[error("invalid path '{path}' in `{field}`: paths must be relative and stay inside the package root")]
    InvalidPath { field: &'static str, path: String },

    #[error("duplicate {0} '{1}'")]
    Duplicate(&'static str, String),
}

impl ManifestError {
    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ResourceNotFound { .. } | Self::MissingArtifacts(_) => {
                ErrorKind::ResourceNotFound
            }
            _ => ErrorKind::MalformedManifest,
        }
    }

    pub(crate) fn not_found(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ResourceNotFound {
            path: path.into(),
            source,
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The complete `parcel.toml` descriptor as written on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Descriptor {
    /// Package metadata (required).
    pub package: PackageSection,

    /// Package author.
    #[serde(default)]
    pub author: Author,

    /// Runtime requirements and where to look for them.
    #[serde(default)]
    pub dependencies: DependencySection,

    /// Precompiled binaries, grouped by subsystem.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<ArtifactGroup>,
}

/// Package metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSection {
    /// Package name (required).
    pub name: String,

    /// Package version (required).
    pub version: String,

    /// License identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// Short description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Long description source, relative to the descriptor.
    #[serde(default = "default_readme")]
    pub readme: String,

    /// Homepage URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Where released archives can be downloaded.
    #[serde(
        default,
        rename = "download-url",
        skip_serializing_if = "Option::is_none"
    )]
    pub download_url: Option<String>,

    /// Module directories whose sources are shipped.
    #[serde(default)]
    pub packages: Vec<String>,

    /// Keywords for package discovery.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Classifier strings for indexing.
    #[serde(default)]
    pub classifiers: Vec<String>,
}

fn default_readme() -> String {
    String::from(DEFAULT_README)
}

/// Package authorship.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Author {
    /// Author name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Contact address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Dependency declarations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencySection {
    /// Required packages, in declaration order.
    #[serde(default)]
    pub requires: Vec<Requirement>,

    /// Alternate locations searched when the default index cannot satisfy a requirement.
    #[serde(default)]
    pub links: Vec<String>,
}

impl Descriptor {
    /// Load a descriptor from a file path without validating it.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ManifestError::not_found(path, e))?;
        Self::parse(&content)
    }

    /// Parse a descriptor from a TOML string without validating it.
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize the descriptor to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Check every field against the distribution format.
    pub fn validate(&self, options: &DescribeOptions) -> Result<(), ManifestError> {
        let package = &self.package;

        validate_name(&package.name)?;
        validate_version(&package.version, options.strict_version)?;

        single_line("package.license", package.license.as_deref())?;
        single_line("package.description", package.description.as_deref())?;
        single_line("package.url", package.url.as_deref())?;
        single_line("package.download-url", package.download_url.as_deref())?;
        single_line("author.name", self.author.name.as_deref())?;
        single_line("author.email", self.author.email.as_deref())?;
        for keyword in &package.keywords {
            single_line("package.keywords", Some(keyword))?;
        }
        for classifier in &package.classifiers {
            single_line("package.classifiers", Some(classifier))?;
        }

        relative_path("package.readme", &package.readme)?;

        let mut seen = BTreeSet::new();
        for module in &package.packages {
            let normalized = relative_path("package.packages", module)?;
            if !seen.insert(normalized) {
                return Err(ManifestError::Duplicate("package", module.clone()));
            }
        }

        let mut seen = BTreeSet::new();
        for requirement in &self.dependencies.requires {
            if !seen.insert(requirement.normalized_name()) {
                return Err(ManifestError::Duplicate(
                    "requirement",
                    requirement.name.clone(),
                ));
            }
        }

        for link in &self.dependencies.links {
            if link.trim().is_empty() {
                return Err(ManifestError::MissingField("dependencies.links"));
            }
            single_line("dependencies.links", Some(link))?;
        }

        let mut seen = BTreeSet::new();
        for group in &self.artifacts {
            if group.subsystem.trim().is_empty() {
                return Err(ManifestError::MissingField("artifacts.subsystem"));
            }
            if !seen.insert(group.subsystem.as_str()) {
                return Err(ManifestError::Duplicate(
                    "artifact subsystem",
                    group.subsystem.clone(),
                ));
            }
            relative_path("artifacts.target", &group.target)?;
            if group.files.is_empty() {
                return Err(ManifestError::MissingField("artifacts.files"));
            }
            for file in &group.files {
                relative_path("artifacts.files", file)?;
            }
        }

        Ok(())
    }

    /// Combine a validated descriptor with its resolved location and long description.
    pub(crate) fn into_manifest(
        self,
        descriptor_path: PathBuf,
        long_description: String,
    ) -> PackageManifest {
        let root = descriptor_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let Self {
            package,
            author,
            dependencies,
            artifacts,
        } = self;

        PackageManifest {
            name: package.name,
            version: package.version,
            license: package.license,
            author,
            description: package.description,
            readme: package.readme,
            long_description,
            url: package.url,
            download_url: package.download_url,
            packages: package.packages,
            requires: dependencies.requires,
            dependency_links: dependencies.links,
            artifacts,
            keywords: package.keywords,
            classifiers: package.classifiers,
            root,
            descriptor_path,
        }
    }
}

fn single_line(field: &'static str, value: Option<&str>) -> Result<(), ManifestError> {
    match value {
        Some(v) if v.contains(['\n', '\r']) => Err(ManifestError::MultiLine(field)),
        _ => Ok(()),
    }
}

fn relative_path(field: &'static str, path: &str) -> Result<String, ManifestError> {
    normalize_relative(path).ok_or_else(|| ManifestError::InvalidPath {
        field,
        path: path.to_string(),
    })
}

/// A fully described package, ready to be packaged.
///
/// Built once by [`crate::describe`] and never mutated afterwards. Every
/// declared field is echoed verbatim; relative paths are resolved against
/// [`PackageManifest::root`], the directory holding the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    pub license: Option<String>,
    pub author: Author,
    pub description: Option<String>,
    /// Long description source, as declared.
    pub readme: String,
    /// Contents of the long description source.
    pub long_description: String,
    pub url: Option<String>,
    pub download_url: Option<String>,
    pub packages: Vec<String>,
    pub requires: Vec<Requirement>,
    pub dependency_links: Vec<String>,
    pub artifacts: Vec<ArtifactGroup>,
    pub keywords: Vec<String>,
    pub classifiers: Vec<String>,
    /// Directory containing the descriptor.
    pub root: PathBuf,
    /// Absolute path of the descriptor itself.
    pub descriptor_path: PathBuf,
}

impl PackageManifest {
    /// Look up an artifact group by subsystem id.
    #[must_use]
    pub fn artifact_group(&self, subsystem: &str) -> Option<&ArtifactGroup> {
        self.artifacts.iter().find(|g| g.subsystem == subsystem)
    }

    /// `name-version`, the top-level directory of the source archive.
    #[must_use]
    pub fn dist_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// File name of the source archive.
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        format!("{}.tar.gz", self.dist_name())
    }

    /// Absolute path of the long description source.
    #[must_use]
    pub fn long_description_path(&self) -> PathBuf {
        self.root.join(&self.readme)
    }

    /// Serialize the manifest to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
