//! Recording storage
//!
//! The recorder only needs a seekable, appendable handle per recording plus
//! a handful of file-management calls for the control surface:
//! - `DirStorage` - a directory on the local filesystem
//! - `MemoryStorage` - in-memory files, used by tests

mod dir;
mod memory;

pub use dir::DirStorage;
pub use memory::{MemoryFile, MemoryStorage};

use serde::Serialize;
use std::io::{self, Read, Seek, Write};
use std::sync::Arc;

/// A stored recording as reported by directory enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub name: String,
    pub size_bytes: u64,
}

impl StoredFile {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Byte storage the recorder writes into
pub trait Storage: Send + Sync + 'static {
    /// Writable, seekable handle to one recording. Dropping it closes it.
    type Handle: Write + Seek + Send;

    /// Readable handle used for downloads
    type Reader: Read + Send + 'static;

    /// Create `name` for writing, truncating any existing file of that name
    fn create(&self, name: &str) -> io::Result<Self::Handle>;

    fn open_read(&self, name: &str) -> io::Result<Self::Reader>;

    fn file_size(&self, name: &str) -> io::Result<u64>;

    fn remove(&self, name: &str) -> bool;

    fn rename(&self, old: &str, new: &str) -> bool;

    fn list(&self) -> io::Result<Vec<StoredFile>>;
}

// The recorder loop and the HTTP layer share one storage
impl<S: Storage> Storage for Arc<S> {
    type Handle = S::Handle;
    type Reader = S::Reader;

    fn create(&self, name: &str) -> io::Result<Self::Handle> {
        (**self).create(name)
    }

    fn open_read(&self, name: &str) -> io::Result<Self::Reader> {
        (**self).open_read(name)
    }

    fn file_size(&self, name: &str) -> io::Result<u64> {
        (**self).file_size(name)
    }

    fn remove(&self, name: &str) -> bool {
        (**self).remove(name)
    }

    fn rename(&self, old: &str, new: &str) -> bool {
        (**self).rename(old, new)
    }

    fn list(&self) -> io::Result<Vec<StoredFile>> {
        (**self).list()
    }
}

/// Reject names that would escape the storage root
pub(crate) fn validate_name(name: &str) -> io::Result<&str> {
    let name = name.trim_start_matches('/');

    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid file name: {:?}", name),
        ));
    }

    Ok(name)
}
