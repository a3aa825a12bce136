use anyhow::Result;
use log::{debug, warn};
use std::path::PathBuf;
use walkdir::WalkDir;

/// File scanner for locating extraction manifest fragments.
///
/// The `FileScanner` recursively walks a project directory and collects all
/// `*.api.json` fragments. Build output (`target`, `vendor`, `node_modules`)
/// and hidden directories are skipped.
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of a directory scan.
pub struct ScanResult {
    /// Paths of all discovered `*.api.json` fragments, sorted for
    /// deterministic merge order.
    pub manifest_files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible
    /// directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects all manifest fragments.
    ///
    /// Inaccessible entries produce warnings but do not stop the scan.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be accessed.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut manifest_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }

                let file_name = e.file_name().to_string_lossy();
                let is_hidden = file_name.starts_with('.');
                let is_build_output =
                    file_name == "target" || file_name == "vendor" || file_name == "node_modules";

                !is_hidden && !is_build_output
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file()
                        && path
                            .file_name()
                            .and_then(|name| name.to_str())
                            .is_some_and(|name| name.ends_with(".api.json"))
                    {
                        debug!("Found manifest fragment: {}", path.display());
                        manifest_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        manifest_files.sort();

        Ok(ScanResult {
            manifest_files,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_collects_fragments_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join("lib")).unwrap();
        fs::write(root.join("lib/notes.api.json"), "{}").unwrap();
        fs::write(root.join("module.api.json"), "{}").unwrap();
        fs::write(root.join("readme.md"), "").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();

        assert_eq!(
            result.manifest_files,
            vec![root.join("lib/notes.api.json"), root.join("module.api.json")]
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_skips_hidden_and_build_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join(".git/ignored.api.json"), "{}").unwrap();
        fs::create_dir(root.join("target")).unwrap();
        fs::write(root.join("target/ignored.api.json"), "{}").unwrap();
        fs::write(root.join("kept.api.json"), "{}").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();

        assert_eq!(result.manifest_files, vec![root.join("kept.api.json")]);
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();

        let scanner = FileScanner::new(temp_dir.path().to_path_buf());
        let result = scanner.scan().unwrap();

        assert!(result.manifest_files.is_empty());
    }

    #[test]
    fn test_scan_nonexistent_directory() {
        let scanner = FileScanner::new(PathBuf::from("/nonexistent/path"));
        let result = scanner.scan().unwrap();

        // walkdir reports the missing root as a warning entry
        assert!(result.manifest_files.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }
}
