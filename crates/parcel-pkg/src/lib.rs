//! Distribution descriptors for modules that bundle precompiled binaries.
//!
//! This crate provides:
//! - Parsing and validation of `parcel.toml` descriptors
//! - [`describe`], which resolves a descriptor into an immutable [`PackageManifest`]
//! - Artifact groups: per-subsystem binaries and where they install
//! - Core metadata (`PKG-INFO`) rendering
//! - Reproducible source archives

mod archive;
mod artifacts;
mod describe;
mod layout;
mod manifest;
mod metadata;
mod requirement;
mod version;

pub use archive::{build_sdist, plan_sdist, BuiltArchive, PackageError, PackageOptions, SdistPlan};
pub use artifacts::{resolve_artifacts, ArtifactGroup, Platform, ResolvedArtifact};
pub use describe::{describe, describe_with, DescribeOptions};
pub use layout::{find_descriptor, DEFAULT_README, DESCRIPTOR_FILE, DIST_DIR};
pub use manifest::{
    Author, DependencySection, Descriptor, ErrorKind, ManifestError, PackageManifest,
    PackageSection,
};
pub use metadata::{render_pkg_info, METADATA_VERSION, PKG_INFO_FILE};
pub use requirement::Requirement;
pub use version::{validate_name, validate_version};
