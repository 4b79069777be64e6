//! Project initialization for `parcel init`.

use anyhow::{bail, Context, Result};
use parcel_pkg::{
    Author, DependencySection, Descriptor, PackageSection, DEFAULT_README, DESCRIPTOR_FILE,
};
use std::path::Path;
use std::{env, fs};

/// Options for project initialization.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Package name (defaults to directory name).
    pub name: Option<String>,
}

/// Initialize a new package in the current directory.
pub fn init_project(options: InitOptions) -> Result<()> {
    let current_dir = env::current_dir().context("Failed to get current directory")?;
    init_project_in(&current_dir, options)
}

/// Initialize a new package in `dir`.
fn init_project_in(dir: &Path, options: InitOptions) -> Result<()> {
    // Check if already initialized
    let descriptor_path = dir.join(DESCRIPTOR_FILE);
    if descriptor_path.exists() {
        bail!("Cannot initialize: `{DESCRIPTOR_FILE}` already exists in this directory");
    }

    // Determine package name
    let name = match options.name {
        Some(n) => n,
        None => infer_package_name(dir)?,
    };
    parcel_pkg::validate_name(&name)?;

    let module = module_name(&name);
    let descriptor = create_descriptor(&name, &module);

    // Create the module directory
    let module_dir = dir.join(&module);
    fs::create_dir_all(&module_dir)
        .with_context(|| format!("Failed to create {}", module_dir.display()))?;

    let content = descriptor
        .to_toml_string()
        .context("Failed to serialize descriptor")?;
    fs::write(&descriptor_path, content).context("Failed to write parcel.toml")?;
    tracing::debug!("wrote {}", descriptor_path.display());

    // Don't overwrite an existing long description
    let readme_path = dir.join(DEFAULT_README);
    if !readme_path.exists() {
        fs::write(&readme_path, format!("{name}\n")).context("Failed to write README.txt")?;
    }

    println!("Created package `{name}`");
    println!("Declare native binaries under [[artifacts]] in {DESCRIPTOR_FILE}.");

    Ok(())
}

/// Infer the package name from a directory.
fn infer_package_name(dir: &Path) -> Result<String> {
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .map(ToString::to_string)
        .context("Cannot infer package name from directory")?;

    Ok(name)
}

/// Module directory for a package name: `or-tools` becomes `or_tools`.
fn module_name(name: &str) -> String {
    name.replace(['-', '.'], "_").to_ascii_lowercase()
}

/// Create a starter descriptor with the given package name.
fn create_descriptor(name: &str, module: &str) -> Descriptor {
    Descriptor {
        package: PackageSection {
            name: name.to_string(),
            version: String::from("0.1.0"),
            license: None,
            description: None,
            readme: String::from(DEFAULT_README),
            url: None,
            download_url: None,
            packages: vec![module.to_string()],
            keywords: Vec::new(),
            classifiers: Vec::new(),
        },
        author: Author::default(),
        dependencies: DependencySection::default(),
        artifacts: Vec::new(),
    }
}
