//! Directory discovery: list, filter by extension, recurse.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file that may hold a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredModule {
    pub file: PathBuf,
    /// Path below the root, without extension, `/`-separated.
    pub module: String,
    /// Directories between the scanned folder and the file.
    pub prefix: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub modules: Vec<DiscoveredModule>,
    pub errors: Vec<walkdir::Error>,
}

/// Modules directly inside `root/folder`, subdirectories are ignored.
pub fn scan_flat(root: &Path, folder: &[&str], extension: Option<&str>) -> ScanReport {
    walk(root, folder, extension, Some(1))
}

/// Modules anywhere below `root/folder`. Each directory level is recorded as
/// a prefix segment.
pub fn scan_recursive(root: &Path, folder: &[&str], extension: Option<&str>) -> ScanReport {
    walk(root, folder, extension, None)
}

fn walk(root: &Path, folder: &[&str], extension: Option<&str>, depth: Option<usize>) -> ScanReport {
    let directory = folder.iter().fold(root.to_path_buf(), |path, segment| path.join(segment));

    let mut walker = WalkDir::new(&directory).min_depth(1).sort_by_file_name();
    if let Some(depth) = depth {
        walker = walker.max_depth(depth);
    }

    let mut report = ScanReport::default();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                report.errors.push(e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|extension| extension.to_str()) != extension {
            continue;
        }

        let Some(module) = module_name(root, path) else {
            continue;
        };
        report.modules.push(DiscoveredModule {
            prefix: prefix_of(&directory, path),
            file: entry.into_path(),
            module,
        });
    }
    report
}

fn segments(relative: &Path) -> Vec<String> {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect()
}

fn module_name(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?.with_extension("");
    Some(segments(&relative).join("/"))
}

fn prefix_of(directory: &Path, file: &Path) -> Vec<String> {
    file.parent()
        .and_then(|parent| parent.strip_prefix(directory).ok())
        .map(segments)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_recursive_scan_collects_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "actions/users.rs");
        touch(dir.path(), "actions/admin/reports.rs");
        touch(dir.path(), "actions/admin/notes.txt");

        let report = scan_recursive(dir.path(), &["actions"], Some("rs"));

        assert!(report.errors.is_empty());
        let found: Vec<_> = report
            .modules
            .iter()
            .map(|module| (module.module.as_str(), module.prefix.clone()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("actions/admin/reports", vec!["admin".to_string()]),
                ("actions/users", vec![]),
            ]
        );
    }

    #[test]
    fn test_flat_scan_skips_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "domain/user.rs");
        touch(dir.path(), "domain/entities/user.rs");

        let report = scan_flat(dir.path(), &["domain"], Some("rs"));

        assert_eq!(report.modules.len(), 1);
        assert_eq!(report.modules[0].module, "domain/user");
    }

    #[test]
    fn test_deep_nesting_keeps_every_level() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "actions/v1/admin/audit.rs");
        touch(dir.path(), "actions/health.rs");

        let report = scan_recursive(dir.path(), &["actions"], Some("rs"));

        let audit = report
            .modules
            .iter()
            .find(|module| module.module == "actions/v1/admin/audit")
            .unwrap();
        assert_eq!(audit.prefix, vec!["v1".to_string(), "admin".to_string()]);
        assert!(audit.file.ends_with("actions/v1/admin/audit.rs"));
    }

    #[test]
    fn test_missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let report = scan_flat(dir.path(), &["responders"], Some("rs"));

        assert!(report.modules.is_empty());
        assert_eq!(report.errors.len(), 1);
    }
}
