//! Locating description files on disk.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::errors::SetupError;

/// File name suffixes recognized as test descriptions.
pub const DEFAULT_SUFFIXES: &[&str] = &[".test.yaml", ".test.yml"];

/// Recursively collects files under `root` whose names end in one of
/// `suffixes`. A file given directly as `root` is returned as is.
///
/// The returned list is sorted so execution order is deterministic.
pub fn discover_test_files<P: AsRef<Path>>(
    root: P,
    suffixes: &[String],
) -> Result<Vec<PathBuf>, SetupError> {
    let root = root.as_ref();
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| SetupError::Discovery {
            root: root.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if is_description_file(entry.path(), suffixes) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    debug!(root = %root.display(), count = files.len(), "discovered description files");
    Ok(files)
}

pub fn is_description_file(path: &Path, suffixes: &[String]) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| suffixes.iter().any(|suffix| name.ends_with(suffix.as_str())))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffixes() -> Vec<String> {
        DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn matches_only_description_suffixes() {
        let s = suffixes();
        assert!(is_description_file(Path::new("a/math.test.yaml"), &s));
        assert!(is_description_file(Path::new("math.test.yml"), &s));
        assert!(!is_description_file(Path::new("math.yaml"), &s));
        assert!(!is_description_file(Path::new("shared/mocks.yaml"), &s));
    }
}
