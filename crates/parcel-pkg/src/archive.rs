//! Source distribution archives.
//!
//! Packages a described manifest into `<name>-<version>.tar.gz`. Every file
//! lives under a `<name>-<version>/` directory:
//!
//! - `PKG-INFO`, rendered from the manifest
//! - the descriptor and the long description source
//! - `dependency_links.txt`, when alternate locations are declared
//! - module sources from each declared package directory
//! - artifact binaries at `<target>/<file name>`
//!
//! Entries are sorted and carry fixed ownership, mode and timestamps, so the
//! same inputs always produce the same bytes.

use crate::artifacts::{resolve_artifacts, Platform};
use crate::layout::{collect_files, normalize_relative, DESCRIPTOR_FILE, DIST_DIR};
use crate::manifest::{ErrorKind, ManifestError, PackageManifest};
use crate::metadata::{render_pkg_info, PKG_INFO_FILE};
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// File holding the alternate dependency locations, one per line.
const DEPENDENCY_LINKS_FILE: &str = "dependency_links.txt";

/// Errors that can occur while packaging.
#[derive(Error, Debug)]
pub enum PackageError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("failed to write archive {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl PackageError {
    /// Classify the error, if it came from the manifest.
    ///
    /// Failures while writing the archive itself have no descriptor kind.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Manifest(e) => Some(e.kind()),
            Self::Io { .. } => None,
        }
    }
}

/// Options for building a source archive.
#[derive(Debug, Clone)]
pub struct PackageOptions {
    /// Directory the archive is written to. Relative paths are resolved
    /// against the package root.
    pub out_dir: PathBuf,

    /// Only ship artifact groups built for this platform. `None` ships all.
    pub platform: Option<Platform>,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(DIST_DIR),
            platform: None,
        }
    }
}

/// Where an archive entry's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum EntrySource {
    File(PathBuf),
    Generated(Vec<u8>),
}

/// The verified contents of a source archive, keyed by path inside it.
#[derive(Debug, Clone)]
pub struct SdistPlan {
    dist_name: String,
    entries: BTreeMap<String, EntrySource>,
}

impl SdistPlan {
    /// Top-level directory of the archive.
    #[must_use]
    pub fn dist_name(&self) -> &str {
        &self.dist_name
    }

    /// Archive paths in the order they are written.
    pub fn paths(&self) -> impl Iterator<Item = String> + '_ {
        self.entries
            .keys()
            .map(move |path| format!("{}/{path}", self.dist_name))
    }

    /// Number of files in the archive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive would be empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A written source archive.
#[derive(Debug, Clone)]
pub struct BuiltArchive {
    /// Location of the archive.
    pub path: PathBuf,

    /// Hex-encoded SHA-256 of the archive.
    pub sha256: String,

    /// Paths of every file inside the archive.
    pub entries: Vec<String>,
}

/// Work out and verify everything that goes into the archive.
///
/// Nothing is written. Fails if an artifact binary or a package directory
/// is missing.
pub fn plan_sdist(
    manifest: &PackageManifest,
    platform: Option<Platform>,
) -> Result<SdistPlan, ManifestError> {
    let artifacts = resolve_artifacts(manifest, platform)?;

    // Binaries are shipped through their groups only, so a group filtered
    // out by platform is not picked up again from a module directory.
    let declared: BTreeSet<PathBuf> = manifest
        .artifacts
        .iter()
        .flat_map(|g| g.files.iter())
        .filter_map(|f| normalize_relative(f))
        .map(|f| manifest.root.join(f))
        .collect();

    let mut entries = BTreeMap::new();

    for module in &manifest.packages {
        let relative = normalize_relative(module).ok_or_else(|| ManifestError::InvalidPath {
            field: "package.packages",
            path: module.clone(),
        })?;
        let dir = manifest.root.join(&relative);
        if !dir.is_dir() {
            return Err(ManifestError::not_found(
                dir,
                io::Error::new(io::ErrorKind::NotFound, "package directory not found"),
            ));
        }

        let files = collect_files(&dir, &relative).map_err(|e| ManifestError::not_found(&dir, e))?;
        for (path, archive_path) in files {
            if !declared.contains(&path) {
                entries.insert(archive_path, EntrySource::File(path));
            }
        }
    }

    for artifact in artifacts {
        claim(
            &mut entries,
            "artifact destination",
            artifact.destination,
            &artifact.source,
            EntrySource::File(artifact.source.clone()),
        )?;
    }

    // The long description ships as read by `describe`, matching PKG-INFO.
    if let Some(readme) = normalize_relative(&manifest.readme) {
        claim(
            &mut entries,
            "archive entry",
            readme,
            &manifest.long_description_path(),
            EntrySource::Generated(manifest.long_description.clone().into_bytes()),
        )?;
    }

    let descriptor_name = manifest
        .descriptor_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DESCRIPTOR_FILE)
        .to_string();
    claim(
        &mut entries,
        "archive entry",
        descriptor_name,
        &manifest.descriptor_path,
        EntrySource::File(manifest.descriptor_path.clone()),
    )?;

    if !manifest.dependency_links.is_empty() {
        let mut links = manifest.dependency_links.join("\n");
        links.push('\n');
        entries.insert(
            DEPENDENCY_LINKS_FILE.to_string(),
            EntrySource::Generated(links.into_bytes()),
        );
    }

    entries.insert(
        PKG_INFO_FILE.to_string(),
        EntrySource::Generated(render_pkg_info(manifest).into_bytes()),
    );

    Ok(SdistPlan {
        dist_name: manifest.dist_name(),
        entries,
    })
}

/// Insert an entry unless its path is already taken by a different file.
///
/// A module source that is the same file as `origin` is replaced.
fn claim(
    entries: &mut BTreeMap<String, EntrySource>,
    what: &'static str,
    path: String,
    origin: &Path,
    source: EntrySource,
) -> Result<(), ManifestError> {
    match entries.get(&path) {
        Some(EntrySource::File(existing)) if existing == origin => {}
        Some(_) => return Err(ManifestError::Duplicate(what, path)),
        None => {}
    }
    entries.insert(path, source);
    Ok(())
}

/// Build the source archive for a described package.
///
/// Every input is verified before anything is written. The archive is
/// assembled in a temporary file next to its destination and only moved into
/// place once complete, so a failed build leaves no archive behind.
pub fn build_sdist(
    manifest: &PackageManifest,
    options: &PackageOptions,
) -> Result<BuiltArchive, PackageError> {
    let plan = plan_sdist(manifest, options.platform)?;

    let out_dir = manifest.root.join(&options.out_dir);
    let archive_path = out_dir.join(manifest.archive_file_name());
    let io_err = |source: io::Error| PackageError::Io {
        path: archive_path.clone(),
        source,
    };

    tracing::info!(
        "packaging {} ({} files) into {}",
        plan.dist_name,
        plan.len(),
        archive_path.display()
    );

    fs::create_dir_all(&out_dir).map_err(io_err)?;
    let mut tmp = NamedTempFile::new_in(&out_dir).map_err(io_err)?;

    {
        let encoder = GzEncoder::new(tmp.as_file_mut(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (path, source) in &plan.entries {
            let name = format!("{}/{path}", plan.dist_name);
            tracing::debug!("adding {name}");
            append_entry(&mut builder, &name, source).map_err(io_err)?;
        }

        builder.into_inner().and_then(GzEncoder::finish).map_err(io_err)?;
    }

    let sha256 = checksum(tmp.path()).map_err(io_err)?;
    tmp.persist(&archive_path).map_err(|e| io_err(e.error))?;

    tracing::info!("wrote {} (sha256 {sha256})", archive_path.display());

    Ok(BuiltArchive {
        path: archive_path,
        sha256,
        entries: plan.paths().collect(),
    })
}

/// Append one regular file with normalized header fields.
fn append_entry<W: io::Write>(
    builder: &mut tar::Builder<W>,
    name: &str,
    source: &EntrySource,
) -> io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);

    match source {
        EntrySource::File(path) => {
            let file = File::open(path)?;
            header.set_size(file.metadata()?.len());
            builder.append_data(&mut header, name, file)
        }
        EntrySource::Generated(bytes) => {
            header.set_size(bytes.len() as u64);
            builder.append_data(&mut header, name, bytes.as_slice())
        }
    }
}

/// Calculate the SHA-256 checksum of a file.
fn checksum(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactGroup;
    use crate::describe;
    use flate2::read::GzDecoder;
    use tempfile::TempDir;

    const DESCRIPTOR: &str = r#"
[package]
name = "sample-pkg"
version = "1.0"
packages = ["sample"]

[dependencies]
requires = ["helper >= 0.4"]
links = ["https://example.com/files/"]

[[artifacts]]
subsystem = "graph"
target = "sample/graph"
files = ["sample/graph/_wrapgraph.bin"]

[[artifacts]]
subsystem = "algorithms"
target = "sample/algorithms"
files = ["build/_knapsack.dll"]
platforms = ["windows"]
"#;

    fn setup() -> (TempDir, PackageManifest) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join(DESCRIPTOR_FILE), DESCRIPTOR).unwrap();
        fs::write(root.join("README.txt"), "Hello world").unwrap();
        fs::create_dir_all(root.join("sample/graph")).unwrap();
        fs::create_dir_all(root.join("build")).unwrap();
        fs::write(root.join("sample/__init__.py"), "").unwrap();
        fs::write(root.join("sample/graph/__init__.py"), "").unwrap();
        fs::write(root.join("sample/graph/_wrapgraph.bin"), [1u8, 2, 3]).unwrap();
        fs::write(root.join("build/_knapsack.dll"), [4u8, 5, 6]).unwrap();
        let manifest = describe(root.join(DESCRIPTOR_FILE)).unwrap();
        (tmp, manifest)
    }

    fn archive_entries(path: &Path) -> Vec<String> {
        let file = File::open(path).unwrap();
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn plan_lists_sorted_entries() {
        let (_tmp, manifest) = setup();
        let plan = plan_sdist(&manifest, None).unwrap();

        let paths: Vec<_> = plan.paths().collect();
        assert_eq!(
            paths,
            [
                "sample-pkg-1.0/PKG-INFO",
                "sample-pkg-1.0/README.txt",
                "sample-pkg-1.0/dependency_links.txt",
                "sample-pkg-1.0/parcel.toml",
                "sample-pkg-1.0/sample/__init__.py",
                "sample-pkg-1.0/sample/algorithms/_knapsack.dll",
                "sample-pkg-1.0/sample/graph/__init__.py",
                "sample-pkg-1.0/sample/graph/_wrapgraph.bin",
            ]
        );
    }

    #[test]
    fn plan_skips_other_platforms() {
        let (_tmp, manifest) = setup();
        let plan = plan_sdist(&manifest, Some(Platform::Linux)).unwrap();
        assert!(plan.paths().all(|p| !p.contains("_knapsack")));
    }

    #[test]
    fn build_writes_archive() {
        let (tmp, manifest) = setup();
        let built = build_sdist(&manifest, &PackageOptions::default()).unwrap();

        assert_eq!(built.path, manifest.root.join("dist/sample-pkg-1.0.tar.gz"));
        assert!(built.path.is_file());
        assert_eq!(built.sha256.len(), 64);
        assert_eq!(archive_entries(&built.path), built.entries);

        // Only the archive is left in the output directory.
        let leftovers: Vec<_> = fs::read_dir(tmp.path().join(DIST_DIR)).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn build_is_reproducible() {
        let (_tmp, manifest) = setup();
        let first = build_sdist(
            &manifest,
            &PackageOptions {
                out_dir: PathBuf::from("out-a"),
                platform: None,
            },
        )
        .unwrap();
        let second = build_sdist(
            &manifest,
            &PackageOptions {
                out_dir: PathBuf::from("out-b"),
                platform: None,
            },
        )
        .unwrap();

        assert_eq!(fs::read(&first.path).unwrap(), fs::read(&second.path).unwrap());
        assert_eq!(first.sha256, second.sha256);
    }

    #[test]
    fn missing_artifact_writes_nothing() {
        let (tmp, manifest) = setup();
        fs::remove_file(tmp.path().join("sample/graph/_wrapgraph.bin")).unwrap();

        let err = build_sdist(&manifest, &PackageOptions::default()).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ResourceNotFound));
        assert!(!tmp.path().join(DIST_DIR).exists());
    }

    #[test]
    fn missing_package_directory_is_resource_not_found() {
        let (tmp, mut manifest) = setup();
        fs::remove_dir_all(tmp.path().join("sample")).unwrap();
        manifest.artifacts.retain(|g| g.subsystem != "graph");

        let err = plan_sdist(&manifest, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
    }

    #[test]
    fn artifact_over_module_source_is_rejected() {
        let (tmp, mut manifest) = setup();
        fs::write(tmp.path().join("build/__init__.py"), "shadow").unwrap();
        manifest.artifacts.push(ArtifactGroup {
            subsystem: "shadow".to_string(),
            target: "sample".to_string(),
            files: vec!["build/__init__.py".to_string()],
            platforms: Vec::new(),
        });

        let err = plan_sdist(&manifest, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedManifest);
        assert!(matches!(
            err,
            ManifestError::Duplicate("artifact destination", ref path) if path == "sample/__init__.py"
        ));
    }

    #[test]
    fn readme_inside_package_is_shipped_once() {
        let (tmp, mut manifest) = setup();
        fs::write(tmp.path().join("sample/README.txt"), "Nested").unwrap();
        manifest.readme = "sample/README.txt".to_string();
        manifest.long_description = "Nested".to_string();

        let plan = plan_sdist(&manifest, None).unwrap();
        let readmes = plan.paths().filter(|p| p.ends_with("README.txt")).count();
        assert_eq!(readmes, 1);
    }

    #[test]
    fn archive_readme_matches_described_text() {
        let (tmp, manifest) = setup();
        fs::write(tmp.path().join("README.txt"), "Changed after describe").unwrap();

        let built = build_sdist(&manifest, &PackageOptions::default()).unwrap();
        let file = File::open(&built.path).unwrap();
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        let mut readme = String::new();
        let mut pkg_info = String::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            if path.ends_with("/README.txt") {
                entry.read_to_string(&mut readme).unwrap();
            } else if path.ends_with("/PKG-INFO") {
                entry.read_to_string(&mut pkg_info).unwrap();
            }
        }

        assert_eq!(readme, "Hello world");
        assert!(pkg_info.ends_with("\n\nHello world\n"));
    }
}
