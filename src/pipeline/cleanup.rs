use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::{debug, warn};

/// What happens to companion files when a run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Delete,
    Preserve,
}

/// The duty to dispose of the companion files a run downloaded.
///
/// Created when a run starts and discharged exactly once when it ends. If it
/// is dropped without being discharged, for instance because the run was
/// cancelled mid-step, the files are preserved and their locations logged.
#[derive(Debug, Default)]
pub struct CleanupObligation {
    files: Vec<PathBuf>,
    discharged: bool,
}

impl CleanupObligation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `path` as a companion file of this run.
    ///
    /// Registering before the file is downloaded is fine; files that never
    /// came into existence are ignored on discharge.
    pub fn register(&mut self, path: &Path) {
        if !self.files.iter().any(|file| file == path) {
            self.files.push(path.to_path_buf());
        }
    }

    /// Disposes of the registered files and returns the ones left on disk.
    pub fn discharge(mut self, disposition: Disposition) -> Vec<PathBuf> {
        self.discharged = true;
        let files = std::mem::take(&mut self.files);

        match disposition {
            Disposition::Preserve => files.into_iter().filter(|file| file.exists()).collect(),
            Disposition::Delete => files
                .into_iter()
                .filter(|file| match std::fs::remove_file(file) {
                    Ok(()) => {
                        debug!("Removed {}", file.display());
                        false
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => false,
                    Err(e) => {
                        warn!("Failed to remove {}, {}", file.display(), e);
                        true
                    }
                })
                .collect(),
        }
    }
}

impl Drop for CleanupObligation {
    fn drop(&mut self) {
        if self.discharged {
            return;
        }

        for file in self.files.iter().filter(|file| file.exists()) {
            warn!("Preserved {}", file.display());
        }
    }
}
