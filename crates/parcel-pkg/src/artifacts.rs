//! Artifact groups: precompiled binaries bundled per subsystem.

use crate::layout::normalize_relative;
use crate::manifest::{ManifestError, PackageManifest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Operating system an artifact group is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Macos,
    Linux,
}

impl Platform {
    /// The platform this binary was compiled for, if it is one we package for.
    #[must_use]
    pub fn current() -> Option<Self> {
        if cfg!(target_os = "windows") {
            Some(Self::Windows)
        } else if cfg!(target_os = "macos") {
            Some(Self::Macos)
        } else if cfg!(target_os = "linux") {
            Some(Self::Linux)
        } else {
            None
        }
    }

    /// Returns the platform as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Macos => "macos",
            Self::Linux => "linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "windows" => Ok(Self::Windows),
            "macos" | "darwin" => Ok(Self::Macos),
            "linux" => Ok(Self::Linux),
            _ => Err(format!(
                "unknown platform '{s}', expected one of: windows, macos, linux"
            )),
        }
    }
}

/// A named bundle of binaries installed into one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactGroup {
    /// Logical subsystem id, e.g. `constraint_solver` or `graph`.
    pub subsystem: String,

    /// Installation directory inside the package.
    pub target: String,

    /// Binary files, relative to the package root.
    pub files: Vec<String>,

    /// Platforms the binaries are built for. Empty means all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<Platform>,
}

impl ArtifactGroup {
    /// Whether this group ships when packaging for `platform`.
    ///
    /// `None` selects every group.
    #[must_use]
    pub fn applies_to(&self, platform: Option<Platform>) -> bool {
        match platform {
            Some(p) => self.platforms.is_empty() || self.platforms.contains(&p),
            None => true,
        }
    }
}

/// One binary, located on disk and placed in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// Subsystem the file belongs to.
    pub subsystem: String,

    /// Absolute path of the file on disk.
    pub source: PathBuf,

    /// `/`-separated path inside the package.
    pub destination: String,
}

/// Locate every binary that ships for `platform`.
///
/// All files are checked before failing, so the error lists every missing
/// binary at once.
pub fn resolve_artifacts(
    manifest: &PackageManifest,
    platform: Option<Platform>,
) -> Result<Vec<ResolvedArtifact>, ManifestError> {
    let mut resolved = Vec::new();
    let mut missing = Vec::new();
    let mut destinations = BTreeSet::new();

    for group in manifest.artifacts.iter().filter(|g| g.applies_to(platform)) {
        let target = normalize(&group.target, "artifacts.target")?;

        for file in &group.files {
            let relative = normalize(file, "artifacts.files")?;
            let source = manifest.root.join(&relative);
            let file_name = Path::new(&relative)
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| ManifestError::InvalidPath {
                    field: "artifacts.files",
                    path: file.clone(),
                })?;
            let destination = format!("{target}/{file_name}");

            if !destinations.insert(destination.clone()) {
                return Err(ManifestError::Duplicate("artifact destination", destination));
            }

            if source.is_file() {
                tracing::trace!(subsystem = %group.subsystem, "{} -> {}", source.display(), destination);
                resolved.push(ResolvedArtifact {
                    subsystem: group.subsystem.clone(),
                    source,
                    destination,
                });
            } else {
                tracing::warn!(subsystem = %group.subsystem, "missing artifact {}", source.display());
                missing.push(source);
            }
        }
    }

    if !missing.is_empty() {
        return Err(ManifestError::MissingArtifacts(missing));
    }

    Ok(resolved)
}

fn normalize(path: &str, field: &'static str) -> Result<String, ManifestError> {
    normalize_relative(path).ok_or_else(|| ManifestError::InvalidPath {
        field,
        path: path.to_string(),
    })
}
