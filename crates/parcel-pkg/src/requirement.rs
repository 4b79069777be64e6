//! Runtime requirements: a package name with an optional minimum version.

use crate::manifest::ManifestError;
use crate::version::{validate_name, validate_version};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// A required external package.
///
/// Written either as a string (`"google-apputils >= 0.4"`) or as a table
/// (`{ name = "google-apputils", min-version = "0.4" }`). Always serialized
/// back as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Requirement {
    /// Package name.
    pub name: String,

    /// Minimum acceptable version, inclusive.
    pub min_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RequirementSpec {
    Simple(String),
    Detailed {
        name: String,
        #[serde(default, rename = "min-version")]
        min_version: Option<String>,
    },
}

impl Requirement {
    /// Create a requirement, validating the name and version.
    pub fn new(name: &str, min_version: Option<&str>) -> Result<Self, ManifestError> {
        let invalid = |reason: String| {
            let text = match min_version {
                Some(v) => format!("{name} >= {v}"),
                None => name.to_string(),
            };
            ManifestError::InvalidRequirement(text, reason)
        };

        validate_name(name).map_err(|e| invalid(e.to_string()))?;
        if let Some(version) = min_version {
            validate_version(version, false).map_err(|e| invalid(e.to_string()))?;
        }

        Ok(Self {
            name: name.to_string(),
            min_version: min_version.map(ToString::to_string),
        })
    }

    /// Name used for duplicate detection: lowercase, with `_` and `.` folded to `-`.
    #[must_use]
    pub fn normalized_name(&self) -> String {
        self.name
            .chars()
            .map(|c| match c {
                '_' | '.' => '-',
                c => c.to_ascii_lowercase(),
            })
            .collect()
    }

    /// Render as a `Requires-Dist` value (`name>=version`).
    #[must_use]
    pub fn to_requires_dist(&self) -> String {
        match &self.min_version {
            Some(v) => format!("{}>={v}", self.name),
            None => self.name.clone(),
        }
    }
}

impl FromStr for Requirement {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some((name, version)) = s.split_once(">=") {
            return Self::new(name.trim(), Some(version.trim()));
        }

        if s.contains(['<', '>', '=', '!', '~', ',', ';', '[']) {
            return Err(ManifestError::InvalidRequirement(
                s.to_string(),
                String::from("only minimum version constraints (`>=`) are supported"),
            ));
        }

        Self::new(s, None)
    }
}

impl<'de> Deserialize<'de> for Requirement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parsed = match RequirementSpec::deserialize(deserializer)? {
            RequirementSpec::Simple(s) => s.parse(),
            RequirementSpec::Detailed { name, min_version } => {
                Self::new(&name, min_version.as_deref())
            }
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.min_version {
            Some(v) => write!(f, "{} >= {v}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl From<Requirement> for String {
    fn from(requirement: Requirement) -> Self {
        requirement.to_string()
    }
}
