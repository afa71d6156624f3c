//! One file per report under a directory.
//!
//! Files are named `{key}.json` and never rewritten. Listing skips files it
//! cannot read instead of failing.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::{ReportBackend, ReportStoreError};

const EXTENSION: &str = "json";

pub struct DirectoryBackend {
    root: PathBuf,
}

impl DirectoryBackend {
    /// Uses `root` for report files, creating it if needed.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, ReportStoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ReportBackend for DirectoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), ReportStoreError> {
        let path = self.root.join(format!("{key}.{EXTENSION}"));
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(value)?;
        file.sync_all()?;
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), ReportStoreError>,
    ) -> Result<(), ReportStoreError> {
        for entry in fs::read_dir(&self.root)? {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(err) => {
                    warn!(dir = %self.root.display(), error = %err, "skipping unreadable directory entry");
                    continue;
                }
            };
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match fs::read(&path) {
                Ok(bytes) => visitor(key, &bytes)?,
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "skipping unreadable report file");
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "directory"
    }
}
