//! Implementation of the `parcel package` and `parcel check` commands.

use crate::describe::load_manifest;
use anyhow::{Context, Result};
use parcel_pkg::{PackageOptions, Platform};
use std::path::PathBuf;

/// Options for the package command.
#[derive(Debug)]
pub struct PackageCmdOptions {
    /// Descriptor file or directory.
    pub path: PathBuf,
    /// Output directory, relative to the package root.
    pub out_dir: PathBuf,
    /// Only ship artifact groups built for this platform.
    pub platform: Option<Platform>,
    /// Require a valid public version identifier.
    pub strict: bool,
    /// Verify everything but write nothing.
    pub dry_run: bool,
}

/// Build the source archive, or only verify its inputs in dry run mode.
pub fn package(options: &PackageCmdOptions) -> Result<()> {
    let manifest = load_manifest(&options.path, options.strict)?;

    if options.dry_run {
        let plan = parcel_pkg::plan_sdist(&manifest, options.platform)
            .context("Package check failed")?;
        println!(
            "{} is ready to package ({} files, {} artifact groups)",
            plan.dist_name(),
            plan.len(),
            manifest
                .artifacts
                .iter()
                .filter(|g| g.applies_to(options.platform))
                .count()
        );
        return Ok(());
    }

    println!("Packaging {} {}...", manifest.name, manifest.version);

    let package_options = PackageOptions {
        out_dir: options.out_dir.clone(),
        platform: options.platform,
    };
    let built = parcel_pkg::build_sdist(&manifest, &package_options)
        .with_context(|| format!("Failed to package {}", manifest.dist_name()))?;

    println!("  Archive: {}", built.path.display());
    println!("  Files: {}", built.entries.len());
    println!("  SHA-256: {}", built.sha256);

    Ok(())
}
