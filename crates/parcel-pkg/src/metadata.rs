//! Core metadata (`PKG-INFO`) rendering.

use crate::manifest::PackageManifest;
use std::fmt::Write;

/// Name of the metadata file at the top of every source archive.
pub const PKG_INFO_FILE: &str = "PKG-INFO";

/// Metadata format version written to `PKG-INFO`.
pub const METADATA_VERSION: &str = "2.1";

/// Render the manifest as core metadata.
///
/// Headers come first in a fixed order, followed by a blank line and the
/// long description as the message body. Optional fields are omitted when
/// unset. The output depends only on the manifest, so rendering the same
/// manifest twice gives identical bytes.
#[must_use]
pub fn render_pkg_info(manifest: &PackageManifest) -> String {
    let mut out = String::new();

    header(&mut out, "Metadata-Version", METADATA_VERSION);
    header(&mut out, "Name", &manifest.name);
    header(&mut out, "Version", &manifest.version);
    optional(&mut out, "Summary", manifest.description.as_deref());
    optional(&mut out, "Home-page", manifest.url.as_deref());
    optional(&mut out, "Download-URL", manifest.download_url.as_deref());
    optional(&mut out, "Author", manifest.author.name.as_deref());
    optional(&mut out, "Author-email", manifest.author.email.as_deref());
    optional(&mut out, "License", manifest.license.as_deref());

    if !manifest.keywords.is_empty() {
        header(&mut out, "Keywords", &manifest.keywords.join(","));
    }

    let mut platforms: Vec<_> = manifest
        .artifacts
        .iter()
        .flat_map(|g| g.platforms.iter().copied())
        .collect();
    platforms.sort_unstable();
    platforms.dedup();
    for platform in platforms {
        header(&mut out, "Platform", platform.as_str());
    }

    for classifier in &manifest.classifiers {
        header(&mut out, "Classifier", classifier);
    }

    for requirement in &manifest.requires {
        header(&mut out, "Requires-Dist", &requirement.to_requires_dist());
    }

    header(&mut out, "Description-Content-Type", "text/plain");

    out.push('\n');
    out.push_str(&manifest.long_description);
    if !manifest.long_description.ends_with('\n') {
        out.push('\n');
    }

    out
}

fn header(out: &mut String, name: &str, value: &str) {
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{name}: {value}");
}

fn optional(out: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        header(out, name, value);
    }
}
