//! Ownership of a finished download on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

/// A downloaded file that is deleted, together with its scratch directory,
/// when the value is dropped.
///
/// Queued downloads hand one of these back through the dispatcher. If the
/// submitter has gone away by the time the job finishes, the undelivered
/// result is dropped and the file goes with it.
#[derive(Debug)]
pub struct DownloadedFile {
    path: PathBuf,
}

impl DownloadedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DownloadedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed downloaded file"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => debug!(path = %self.path.display(), error = %err, "could not remove downloaded file"),
        }
        // Only succeeds when the directory is empty, so siblings are never lost.
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::remove_dir(parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_drop_removes_file_and_empty_job_dir() {
        let root = TempDir::new().unwrap();
        let job_dir = root.path().join("job");
        std::fs::create_dir(&job_dir).unwrap();
        let path = job_dir.join("abc.mp4");
        std::fs::write(&path, b"data").unwrap();

        let file = DownloadedFile::new(&path);
        assert_eq!(file.path(), path.as_path());
        drop(file);

        assert!(!path.exists());
        assert!(!job_dir.exists());
        assert!(root.path().exists());
    }

    #[test]
    fn test_drop_keeps_shared_directory() {
        let root = TempDir::new().unwrap();
        let first = root.path().join("a.mp4");
        let second = root.path().join("b.mp4");
        std::fs::write(&first, b"a").unwrap();
        std::fs::write(&second, b"b").unwrap();

        drop(DownloadedFile::new(&first));

        assert!(!first.exists());
        assert!(second.exists());
        assert!(root.path().exists());
    }

    #[test]
    fn test_drop_tolerates_missing_file() {
        let root = TempDir::new().unwrap();
        drop(DownloadedFile::new(root.path().join("gone").join("x.mp4")));
        assert!(root.path().exists());
    }
}
