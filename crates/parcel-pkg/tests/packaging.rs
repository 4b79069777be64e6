//! End-to-end packaging of a module that bundles per-subsystem binaries.

use flate2::read::GzDecoder;
use parcel_pkg::{
    build_sdist, describe, render_pkg_info, ErrorKind, PackageOptions, Platform, DESCRIPTOR_FILE,
};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;

const DESCRIPTOR: &str = r#"
[package]
name = "or-tools"
version = "1.2345"
license = "Apache 2.0"
description = "Operations research python libraries and modules"
url = "https://example.com/or-tools"
packages = ["ortools"]
keywords = ["operations research", "constraint programming", "linear programming"]
classifiers = [
    "Development Status :: 5 - Production/Stable",
    "Topic :: Scientific/Engineering :: Mathematics",
]

[author]
name = "OR Team"
email = "or-team@example.com"

[dependencies]
requires = ["google-apputils >= 0.4"]
links = ["http://example.com/apputils/files/"]

[[artifacts]]
subsystem = "constraint_solver"
target = "ortools/constraint_solver"
files = ["ortools/constraint_solver/_pywrapcp.dll", "ortools/constraint_solver/_pywraprouting.dll"]

[[artifacts]]
subsystem = "linear_solver"
target = "ortools/linear_solver"
files = ["ortools/linear_solver/_pywraplp.dll"]

[[artifacts]]
subsystem = "graph"
target = "ortools/graph"
files = ["ortools/graph/_pywrapgraph.dll"]

[[artifacts]]
subsystem = "algorithms"
target = "ortools/algorithms"
files = ["ortools/algorithms/_pywrapknapsack_solver.dll"]
platforms = ["windows"]
"#;

const BINARIES: &[&str] = &[
    "ortools/constraint_solver/_pywrapcp.dll",
    "ortools/constraint_solver/_pywraprouting.dll",
    "ortools/linear_solver/_pywraplp.dll",
    "ortools/graph/_pywrapgraph.dll",
    "ortools/algorithms/_pywrapknapsack_solver.dll",
];

fn create_package(root: &Path) {
    fs::write(root.join(DESCRIPTOR_FILE), DESCRIPTOR).unwrap();
    fs::write(root.join("README.txt"), "OR-Tools bindings.\n").unwrap();
    fs::create_dir_all(root.join("ortools")).unwrap();
    fs::write(root.join("ortools/__init__.py"), "").unwrap();
    for (i, binary) in BINARIES.iter().enumerate() {
        let path = root.join(binary);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, vec![i as u8; 32]).unwrap();
        fs::write(path.with_file_name("__init__.py"), "").unwrap();
    }
}

fn read_archive(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut archive = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            (name, data)
        })
        .collect()
}

#[test]
fn package_bundles_every_subsystem() {
    let tmp = TempDir::new().unwrap();
    create_package(tmp.path());

    let manifest = describe(tmp.path().join(DESCRIPTOR_FILE)).unwrap();
    assert_eq!(manifest.artifacts.len(), 4);
    assert_eq!(manifest.requires[0].to_string(), "google-apputils >= 0.4");

    let built = build_sdist(&manifest, &PackageOptions::default()).unwrap();
    let contents = read_archive(&built.path);

    for (i, binary) in BINARIES.iter().enumerate() {
        let data = &contents[&format!("or-tools-1.2345/{binary}")];
        assert_eq!(data, &vec![i as u8; 32]);
    }

    let pkg_info = String::from_utf8(contents["or-tools-1.2345/PKG-INFO"].clone()).unwrap();
    assert_eq!(pkg_info, render_pkg_info(&manifest));
    assert!(pkg_info.contains("Requires-Dist: google-apputils>=0.4\n"));
    assert!(pkg_info.ends_with("\nOR-Tools bindings.\n"));

    assert_eq!(
        contents["or-tools-1.2345/dependency_links.txt"],
        b"http://example.com/apputils/files/\n"
    );
}

#[test]
fn packaging_for_linux_drops_windows_only_groups() {
    let tmp = TempDir::new().unwrap();
    create_package(tmp.path());
    fs::remove_file(tmp.path().join("ortools/algorithms/_pywrapknapsack_solver.dll")).unwrap();

    let manifest = describe(tmp.path().join(DESCRIPTOR_FILE)).unwrap();
    let options = PackageOptions {
        platform: Some(Platform::Linux),
        ..PackageOptions::default()
    };
    let built = build_sdist(&manifest, &options).unwrap();

    assert!(built.entries.iter().all(|e| !e.contains("knapsack")));
    assert!(built
        .entries
        .contains(&String::from("or-tools-1.2345/ortools/algorithms/__init__.py")));
}

#[test]
fn missing_binary_fails_without_output() {
    let tmp = TempDir::new().unwrap();
    create_package(tmp.path());
    fs::remove_file(tmp.path().join("ortools/graph/_pywrapgraph.dll")).unwrap();

    let manifest = describe(tmp.path().join(DESCRIPTOR_FILE)).unwrap();
    let err = build_sdist(&manifest, &PackageOptions::default()).unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::ResourceNotFound));
    assert!(err.to_string().contains("_pywrapgraph.dll"));
    assert!(!tmp.path().join("dist/or-tools-1.2345.tar.gz").exists());
}

#[test]
fn missing_readme_fails_before_packaging() {
    let tmp = TempDir::new().unwrap();
    create_package(tmp.path());
    fs::remove_file(tmp.path().join("README.txt")).unwrap();

    let err = describe(tmp.path().join(DESCRIPTOR_FILE)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
    assert!(!tmp.path().join("dist").exists());
}

#[test]
fn repackaging_unchanged_inputs_is_byte_identical() {
    let tmp = TempDir::new().unwrap();
    create_package(tmp.path());

    let first = describe(tmp.path().join(DESCRIPTOR_FILE)).unwrap();
    let first_bytes = fs::read(build_sdist(&first, &PackageOptions::default()).unwrap().path).unwrap();

    let second = describe(tmp.path().join(DESCRIPTOR_FILE)).unwrap();
    assert_eq!(first, second);
    let second_bytes =
        fs::read(build_sdist(&second, &PackageOptions::default()).unwrap().path).unwrap();

    assert_eq!(first_bytes, second_bytes);
}
