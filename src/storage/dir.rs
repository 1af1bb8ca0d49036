use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing::{info, warn};

use super::{validate_name, Storage, StoredFile};

/// Recordings kept as files in a single directory
#[derive(Debug, Clone)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    /// Use `root` as the storage directory, creating it if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create storage directory: {:?}", root))?;

        info!("Storage directory: {}", root.display());

        Ok(Self { root })
    }

    fn path_of(&self, name: &str) -> io::Result<PathBuf> {
        Ok(self.root.join(validate_name(name)?))
    }
}

impl Storage for DirStorage {
    type Handle = BufWriter<File>;
    type Reader = File;

    fn create(&self, name: &str) -> io::Result<Self::Handle> {
        let file = File::create(self.path_of(name)?)?;
        Ok(BufWriter::new(file))
    }

    fn open_read(&self, name: &str) -> io::Result<Self::Reader> {
        let path = self.path_of(name)?;
        if path.is_dir() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "not a file"));
        }
        File::open(path)
    }

    fn file_size(&self, name: &str) -> io::Result<u64> {
        Ok(fs::metadata(self.path_of(name)?)?.len())
    }

    fn remove(&self, name: &str) -> bool {
        match self.path_of(name).and_then(fs::remove_file) {
            Ok(()) => {
                info!("File deleted: {}", name);
                true
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", name, e);
                false
            }
        }
    }

    fn rename(&self, old: &str, new: &str) -> bool {
        let result = self
            .path_of(old)
            .and_then(|from| Ok((from, self.path_of(new)?)))
            .and_then(|(from, to)| fs::rename(from, to));

        match result {
            Ok(()) => {
                info!("File renamed: {} -> {}", old, new);
                true
            }
            Err(e) => {
                warn!("Failed to rename {} -> {}: {}", old, new, e);
                false
            }
        }
    }

    fn list(&self) -> io::Result<Vec<StoredFile>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            files.push(StoredFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                size_bytes: metadata.len(),
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}
