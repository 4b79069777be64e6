//! Implementation of the `parcel describe` command.

use crate::Format;
use anyhow::{Context, Result};
use parcel_pkg::{DescribeOptions, PackageManifest};
use std::path::{Path, PathBuf};

/// Options for the describe command.
#[derive(Debug)]
pub struct DescribeCmdOptions {
    /// Descriptor file or directory.
    pub path: PathBuf,
    /// Output format.
    pub format: Format,
    /// Require a valid public version identifier.
    pub strict: bool,
}

/// Print the resolved manifest to stdout.
pub fn describe_package(options: &DescribeCmdOptions) -> Result<()> {
    let manifest = load_manifest(&options.path, options.strict)?;
    print!("{}", render(&manifest, options.format)?);
    Ok(())
}

/// Locate the descriptor for `path` and describe it.
pub fn load_manifest(path: &Path, strict: bool) -> Result<PackageManifest> {
    let descriptor = if path.is_file() {
        path.to_path_buf()
    } else {
        parcel_pkg::find_descriptor(path)?
    };
    tracing::debug!("using descriptor {}", descriptor.display());

    let options = DescribeOptions {
        strict_version: strict,
    };
    parcel_pkg::describe_with(&descriptor, &options)
        .with_context(|| format!("Failed to describe {}", descriptor.display()))
}

fn render(manifest: &PackageManifest, format: Format) -> Result<String> {
    match format {
        Format::Json => {
            let mut json = manifest
                .to_json()
                .context("Failed to serialize manifest")?;
            json.push('\n');
            Ok(json)
        }
        Format::PkgInfo => Ok(parcel_pkg::render_pkg_info(manifest)),
    }
}
