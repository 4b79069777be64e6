//! Package layout conventions and path handling.
//!
//! A package is a directory holding a descriptor next to the files it
//! declares:
//! ```text
//! or-tools/
//! ├── parcel.toml           # Descriptor
//! ├── README.txt            # Long description
//! └── ortools/              # Module sources
//!     ├── __init__.py
//!     └── graph/
//!         └── _pywrapgraph.dll
//! ```

use crate::manifest::ManifestError;
use std::io;
use std::path::{Component, Path, PathBuf};

/// The descriptor filename.
pub const DESCRIPTOR_FILE: &str = "parcel.toml";

/// Long description source used when the descriptor names none.
pub const DEFAULT_README: &str = "README.txt";

/// Default output directory for built archives, relative to the package root.
pub const DIST_DIR: &str = "dist";

/// Names never collected from module directories.
const EXCLUDED_NAMES: &[&str] = &["target", "dist", "__pycache__", "node_modules"];

/// Find a descriptor by searching upward from a directory.
///
/// A `start` that does not exist is `ResourceNotFound`; the search never
/// falls back to the working directory.
pub fn find_descriptor(start: impl AsRef<Path>) -> Result<PathBuf, ManifestError> {
    let start = start.as_ref();
    // Relative paths run out of parents early; search from the absolute form.
    let mut current = start
        .canonicalize()
        .map_err(|e| ManifestError::not_found(start, e))?;

    loop {
        let candidate = current.join(DESCRIPTOR_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => {
                return Err(ManifestError::not_found(
                    start.join(DESCRIPTOR_FILE),
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("no {DESCRIPTOR_FILE} in this directory or any parent"),
                    ),
                ))
            }
        }
    }
}

/// Normalize a declared relative path to `/`-separated form.
///
/// Returns `None` for empty paths, absolute paths, and paths that climb out
/// of the package root.
pub(crate) fn normalize_relative(path: &str) -> Option<String> {
    let unified = path.replace('\\', "/");
    let mut parts = Vec::new();

    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?.to_string()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Recursively collect the files under `dir`, sorted by archive path.
///
/// Hidden entries and build output directories are skipped. Each file is
/// returned with its path relative to the package root, `prefix` being the
/// path of `dir` itself.
pub(crate) fn collect_files(dir: &Path, prefix: &str) -> io::Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    collect_recursive(dir, prefix, &mut files)?;
    Ok(files)
}

fn collect_recursive(
    dir: &Path,
    prefix: &str,
    files: &mut Vec<(PathBuf, String)>,
) -> io::Result<()> {
    let mut entries = std::fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let path = entry.path();
        let name = entry.file_name();
        let name_str = name.to_string_lossy();

        if name_str.starts_with('.') || EXCLUDED_NAMES.iter().any(|e| *e == name_str) {
            continue;
        }

        let archive_path = format!("{prefix}/{name_str}");

        if path.is_file() {
            files.push((path, archive_path));
        } else if path.is_dir() {
            collect_recursive(&path, &archive_path, files)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn normalize_accepts_relative_paths() {
        assert_eq!(normalize_relative("ortools/graph").as_deref(), Some("ortools/graph"));
        assert_eq!(normalize_relative("./a//b/").as_deref(), Some("a/b"));
        assert_eq!(normalize_relative(r"ortools\graph\x.dll").as_deref(), Some("ortools/graph/x.dll"));
    }

    #[test]
    fn normalize_rejects_escaping_paths() {
        assert!(normalize_relative("").is_none());
        assert!(normalize_relative(".").is_none());
        assert!(normalize_relative("../x").is_none());
        assert!(normalize_relative("a/../../x").is_none());
        assert!(normalize_relative("/etc/passwd").is_none());
    }

    #[test]
    fn find_descriptor_searches_upward() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(DESCRIPTOR_FILE), "").unwrap();
        let nested = tmp.path().join("ortools/graph");
        fs::create_dir_all(&nested).unwrap();

        let found = find_descriptor(&nested).unwrap();
        assert_eq!(found, tmp.path().canonicalize().unwrap().join(DESCRIPTOR_FILE));
    }

    #[test]
    fn find_descriptor_rejects_missing_start() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(DESCRIPTOR_FILE), "").unwrap();

        let err = find_descriptor(tmp.path().join("no-such-dir")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
        assert!(err.to_string().contains("no-such-dir"));
    }

    #[test]
    fn collect_files_is_sorted_and_skips_hidden() {
        let tmp = TempDir::new().unwrap();
        let module = tmp.path().join("pkg");
        fs::create_dir_all(module.join("sub")).unwrap();
        fs::create_dir_all(module.join("__pycache__")).unwrap();
        fs::write(module.join("b.py"), "b").unwrap();
        fs::write(module.join("a.py"), "a").unwrap();
        fs::write(module.join(".hidden"), "h").unwrap();
        fs::write(module.join("sub/c.py"), "c").unwrap();
        fs::write(module.join("__pycache__/a.pyc"), "x").unwrap();

        let files = collect_files(&module, "pkg").unwrap();
        let names: Vec<_> = files.iter().map(|(_, p)| p.as_str()).collect();
        assert_eq!(names, ["pkg/a.py", "pkg/b.py", "pkg/sub/c.py"]);
    }
}
