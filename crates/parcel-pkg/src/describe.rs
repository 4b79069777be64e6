//! Resolve a descriptor into a [`PackageManifest`].

use crate::manifest::{Descriptor, ManifestError, PackageManifest};
use std::path::Path;

/// Options controlling how strictly a descriptor is checked.
#[derive(Debug, Clone, Default)]
pub struct DescribeOptions {
    /// Require the version to be a valid public version identifier instead
    /// of only checking its characters.
    pub strict_version: bool,
}

/// Describe the package declared by the descriptor at `path`.
///
/// Equivalent to [`describe_with`] using default options.
pub fn describe(path: impl AsRef<Path>) -> Result<PackageManifest, ManifestError> {
    describe_with(path, &DescribeOptions::default())
}

/// Describe the package declared by the descriptor at `path`.
///
/// The long description is read relative to the descriptor's own directory,
/// so the result does not depend on the working directory of the caller.
/// Symlinks in `path` are resolved first: a linked descriptor reads its
/// long description, and packages its sources, from the directory of the
/// file it points to.
/// Nothing is written; calling this twice on unchanged inputs yields equal
/// manifests.
///
/// # Errors
///
/// [`crate::ErrorKind::ResourceNotFound`] if the descriptor or the long
/// description cannot be read, [`crate::ErrorKind::MalformedManifest`] if
/// the descriptor does not parse or a field is invalid.
pub fn describe_with(
    path: impl AsRef<Path>,
    options: &DescribeOptions,
) -> Result<PackageManifest, ManifestError> {
    let path = path.as_ref();
    let descriptor_path = path
        .canonicalize()
        .map_err(|e| ManifestError::not_found(path, e))?;

    let descriptor = Descriptor::from_path(&descriptor_path)?;
    descriptor.validate(options)?;

    let root = descriptor_path.parent().unwrap_or_else(|| Path::new(""));
    let readme_path = root.join(&descriptor.package.readme);
    let long_description = std::fs::read_to_string(&readme_path)
        .map_err(|e| ManifestError::not_found(&readme_path, e))?;

    tracing::debug!(
        descriptor = %descriptor_path.display(),
        readme = %readme_path.display(),
        "described {} {}",
        descriptor.package.name,
        descriptor.package.version
    );

    Ok(descriptor.into_manifest(descriptor_path, long_description))
}
