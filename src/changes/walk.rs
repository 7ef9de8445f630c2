//! Full-tree file listing for `format --full`.

use super::{ChangeQuery, FileSet};
use std::path::Path;
use walkdir::WalkDir;

/// Every file under `root` matching `query`, skipping excluded directories.
///
/// Returned paths are relative to `root`.
pub fn walk_files(root: &Path, query: &ChangeQuery, excluded_dirs: &[String]) -> FileSet {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() > 0 && e.file_type().is_dir() {
                let name = e.file_name().to_string_lossy();
                return !excluded_dirs.iter().any(|d| d == name.as_ref());
            }
            true
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .filter(|p| query.matches(p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_walk_skips_excluded_dirs() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for rel in [
            "main.cpp",
            "src/util.h",
            "src/tool.py",
            "build/generated.cpp",
            ".vscode/settings.py",
            "docs/readme.md",
        ] {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }

        let excluded = vec!["build".to_string(), ".vscode".to_string()];
        let query = ChangeQuery::new([".cpp", ".h", ".py"]);
        let files = walk_files(root, &query, &excluded).into_vec();

        assert_eq!(
            files,
            vec![
                PathBuf::from("main.cpp"),
                PathBuf::from("src/tool.py"),
                PathBuf::from("src/util.h"),
            ]
        );
    }

    #[test]
    fn test_walk_empty_dir() {
        let temp = TempDir::new().unwrap();
        let files = walk_files(temp.path(), &ChangeQuery::new([".py"]), &[]);
        assert!(files.is_empty());
    }
}
