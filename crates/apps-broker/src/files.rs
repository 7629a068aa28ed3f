//! Newest-file selection from the import storage tree.
//!
//! One directory per app name under the import root, arbitrary filenames
//! within; selection is by last-modified time.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, thiserror::Error)]
pub enum FileSelectError {
    #[error("Import storage directory not found: {}", .0.display())]
    RootMissing(PathBuf),
    #[error("No files found in import folder: {}", .0.display())]
    EmptyAppDir(PathBuf),
    #[error(
        "No folder or matching file found for appName under import storage: {app_name} (looked in: {})",
        .root.display()
    )]
    NoMatch { app_name: String, root: PathBuf },
}

/// Resolve the newest candidate file for `app_name` under `root`.
///
/// Looks for a subdirectory literally named `app_name`, then for one
/// matching case-insensitively (mixed casing is common on Linux), and
/// within it picks the most recently modified regular file. When no
/// directory matches, falls back to flat files directly under the root
/// whose name contains `app_name`.
pub fn resolve_newest_file(root: &Path, app_name: &str) -> Result<PathBuf, FileSelectError> {
    if !root.is_dir() {
        return Err(FileSelectError::RootMissing(root.to_path_buf()));
    }

    let mut app_dir = root.join(app_name);
    if !app_dir.is_dir() {
        if let Some(found) = match_dir_case_insensitive(root, app_name) {
            app_dir = found;
        }
    }

    if app_dir.is_dir() {
        return newest_regular_file(&app_dir, |_| true)
            .ok_or(FileSelectError::EmptyAppDir(app_dir));
    }

    let needle = app_name.to_lowercase();
    newest_regular_file(root, |name| name.to_lowercase().contains(&needle)).ok_or_else(|| {
        FileSelectError::NoMatch {
            app_name: app_name.to_string(),
            root: root.to_path_buf(),
        }
    })
}

fn match_dir_case_insensitive(root: &Path, app_name: &str) -> Option<PathBuf> {
    for entry in fs::read_dir(root).ok()?.flatten() {
        let path = entry.path();
        if path.is_dir()
            && entry
                .file_name()
                .to_string_lossy()
                .eq_ignore_ascii_case(app_name)
        {
            return Some(path);
        }
    }
    None
}

fn newest_regular_file(dir: &Path, matches: impl Fn(&str) -> bool) -> Option<PathBuf> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir).ok()?.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if !matches(&entry.file_name().to_string_lossy()) {
            continue;
        }
        // Unreadable mtimes sort as the epoch rather than failing the scan.
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        // Ties go to the last entry examined.
        match &newest {
            Some((best, _)) if modified < *best => {}
            _ => newest = Some((modified, path)),
        }
    }
    newest.map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn write_file(path: &Path, age: Duration) {
        fs::write(path, b"contents").unwrap();
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = resolve_newest_file(Path::new("/nonexistent/import-apps"), "Foo").unwrap_err();
        assert!(matches!(err, FileSelectError::RootMissing(_)));
    }

    #[test]
    fn picks_newest_file_in_app_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("Foo");
        fs::create_dir(&dir).unwrap();
        write_file(&dir.join("old.ntgapps"), Duration::from_secs(3600));
        write_file(&dir.join("new.ntgapps"), Duration::from_secs(60));

        let selected = resolve_newest_file(root.path(), "Foo").unwrap();
        assert_eq!(selected.file_name().unwrap(), "new.ntgapps");
    }

    #[test]
    fn matches_app_dir_case_insensitively() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("Foo");
        fs::create_dir(&dir).unwrap();
        write_file(&dir.join("old.ntgapps"), Duration::from_secs(3600));
        write_file(&dir.join("new.ntgapps"), Duration::from_secs(60));

        let selected = resolve_newest_file(root.path(), "foo").unwrap();
        assert_eq!(selected.file_name().unwrap(), "new.ntgapps");
    }

    #[test]
    fn empty_app_dir_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("Empty")).unwrap();

        let err = resolve_newest_file(root.path(), "Empty").unwrap_err();
        assert!(matches!(err, FileSelectError::EmptyAppDir(_)));
    }

    #[test]
    fn falls_back_to_flat_files_under_root() {
        let root = tempfile::tempdir().unwrap();
        write_file(&root.path().join("crm-export-v1.ntgapps"), Duration::from_secs(3600));
        write_file(&root.path().join("CRM-export-v2.ntgapps"), Duration::from_secs(60));
        write_file(&root.path().join("unrelated.ntgapps"), Duration::from_secs(1));

        let selected = resolve_newest_file(root.path(), "crm").unwrap();
        assert_eq!(selected.file_name().unwrap(), "CRM-export-v2.ntgapps");
    }

    #[test]
    fn no_match_anywhere_names_the_root() {
        let root = tempfile::tempdir().unwrap();
        let err = resolve_newest_file(root.path(), "Ghost").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Ghost"));
        assert!(message.contains(&root.path().display().to_string()));
    }
}
