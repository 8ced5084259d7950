use std::path::Path;

use async_trait::async_trait;
use walkdir::{DirEntry, WalkDir};

use super::{FileLister, ListerError};

/// Directories recorded as `name/` but never descended into.
const OPAQUE_DIRS: &[&str] = &[
    "node_modules",
    "venv",
    ".venv",
    "__pycache__",
    "target",
    "dist",
    "build",
    ".gradle",
];

/// Directories skipped entirely.
const IGNORED_DIRS: &[&str] = &[".git", ".hg", ".svn", ".idea"];

const DEFAULT_MAX_ENTRIES: usize = 20_000;

/// Walks a local checkout.
#[derive(Debug, Clone)]
pub struct LocalLister {
    max_entries: usize,
}

impl Default for LocalLister {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl LocalLister {
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self { max_entries }
    }

    /// Blocking walk; results are sorted so listings are stable across runs.
    ///
    /// Entries that cannot be read are logged and skipped. Only a missing or
    /// unreadable root fails the listing.
    pub fn walk(&self, root: &Path) -> Result<Vec<String>, ListerError> {
        if !root.is_dir() {
            return Err(ListerError::NotFound(root.display().to_string()));
        }
        std::fs::read_dir(root)?;

        let mut paths = Vec::new();
        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !(entry.file_type().is_dir() && is_named(entry, IGNORED_DIRS)));

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(root = %root.display(), "skipping unreadable entry: {}", err);
                    continue;
                }
            };

            if paths.len() >= self.max_entries {
                tracing::warn!(
                    root = %root.display(),
                    limit = self.max_entries,
                    "file listing truncated"
                );
                break;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_else(|_| entry.file_name().to_string_lossy().into_owned());

            if entry.file_type().is_dir() {
                if is_named(&entry, OPAQUE_DIRS) {
                    paths.push(format!("{}/", relative));
                    walker.skip_current_dir();
                }
            } else {
                paths.push(relative);
            }
        }

        paths.sort();
        Ok(paths)
    }
}

fn is_named(entry: &DirEntry, names: &[&str]) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| names.contains(&name))
}

#[async_trait]
impl FileLister for LocalLister {
    async fn list_project_files(&self, source: &str) -> Result<Vec<String>, ListerError> {
        let lister = self.clone();
        let root = Path::new(source).to_path_buf();
        tokio::task::spawn_blocking(move || lister.walk(&root)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn walks_nested_files_with_forward_slashes() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "requirements.txt");
        touch(dir.path(), "tests/test_app.py");

        let paths = LocalLister::default().walk(dir.path()).unwrap();
        assert_eq!(paths, vec!["requirements.txt", "tests/test_app.py"]);
    }

    #[test]
    fn opaque_directories_are_recorded_not_walked() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "package.json");
        touch(dir.path(), "node_modules/left-pad/index.js");
        touch(dir.path(), ".git/HEAD");

        let paths = LocalLister::default().walk(dir.path()).unwrap();
        assert_eq!(paths, vec!["node_modules/", "package.json"]);
    }

    #[test]
    fn listing_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..10 {
            touch(dir.path(), &format!("file{}.txt", i));
        }

        let paths = LocalLister::with_max_entries(4).walk(dir.path()).unwrap();
        assert_eq!(paths.len(), 4);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_does_not_fail_the_listing() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "package.json");
        touch(dir.path(), "secret/key.pem");
        let secret = dir.path().join("secret");
        fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();

        let result = LocalLister::default().walk(dir.path());
        fs::set_permissions(&secret, fs::Permissions::from_mode(0o755)).unwrap();

        let paths = result.unwrap();
        assert!(paths.contains(&"package.json".to_string()));
    }

    #[test]
    fn missing_directory_is_not_found() {
        let err = LocalLister::default()
            .walk(Path::new("/definitely/not/here"))
            .unwrap_err();
        assert!(matches!(err, ListerError::NotFound(_)));
    }
}
