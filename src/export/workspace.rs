use crate::error::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Intermediate files of one export. Everything still listed is deleted by
/// [`cleanup`](Self::cleanup) or when the workspace is dropped.
#[derive(Debug)]
pub struct ExportWorkspace {
    dir: PathBuf,
    files: Vec<PathBuf>,
    counter: usize,
}

impl ExportWorkspace {
    pub fn create(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
        Ok(ExportWorkspace {
            dir: dir.to_path_buf(),
            files: Vec::new(),
            counter: 0,
        })
    }

    /// Reserves a fresh intermediate file name
    pub fn temp_file(&mut self, name: &str, extension: &str) -> PathBuf {
        let path = self
            .dir
            .join(format!("export_{:03}_{}.{}", self.counter, name, extension));
        self.counter += 1;
        self.files.push(path.clone());
        path
    }

    /// Deletes an intermediate file as soon as it is no longer needed
    pub fn discard(&mut self, path: &Path) {
        if let Some(index) = self.files.iter().position(|p| p == path) {
            self.files.remove(index);
            remove_temp_file(path);
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deletes every remaining intermediate file. Failures are only logged.
    pub fn cleanup(&mut self) {
        if self.files.is_empty() {
            return;
        }
        log::info!("Removing {} intermediate files", self.files.len());
        for path in self.files.drain(..) {
            remove_temp_file(&path);
        }
    }
}

impl Drop for ExportWorkspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn remove_temp_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::debug!("Removed {:?}", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("{:?} already gone", path)
        }
        Err(e) => log::warn!("Failed to remove {:?}: {}", path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_files_are_unique_and_tracked() {
        let dir = tempfile::tempdir().unwrap();
        let mut workspace = ExportWorkspace::create(dir.path()).unwrap();

        let a = workspace.temp_file("clip", "wav");
        let b = workspace.temp_file("clip", "wav");
        assert_ne!(a, b);
        assert_eq!(workspace.files(), &[a.clone(), b.clone()]);
        assert!(a.starts_with(workspace.dir()));
    }

    #[test]
    fn test_discard_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut workspace = ExportWorkspace::create(dir.path()).unwrap();
        let path = workspace.temp_file("silence", "wav");
        fs::write(&path, b"x").unwrap();

        workspace.discard(&path);
        assert!(!path.exists());
        assert!(workspace.files().is_empty());
    }

    #[test]
    fn test_cleanup_tolerates_missing_files_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        let mut workspace = ExportWorkspace::create(&work).unwrap();
        let written = workspace.temp_file("a", "wav");
        workspace.temp_file("never_written", "wav");
        fs::write(&written, b"x").unwrap();

        fs::remove_dir_all(&work).unwrap();
        workspace.cleanup();
        assert!(workspace.files().is_empty());
    }

    #[test]
    fn test_drop_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let path;
        {
            let mut workspace = ExportWorkspace::create(dir.path()).unwrap();
            path = workspace.temp_file("mix", "wav");
            fs::write(&path, b"x").unwrap();
        }
        assert!(!path.exists());
    }
}
