use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::sync::Arc;

use super::{validate_name, Storage, StoredFile};

/// Counters describing what the recorder did to the storage
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    /// Files opened for writing
    pub creates: usize,
    /// Writes that started at offset 0
    pub header_writes: usize,
    pub seeks: usize,
    /// Handles dropped
    pub closes: usize,
}

#[derive(Default)]
struct MemoryState {
    files: BTreeMap<String, Arc<Mutex<Vec<u8>>>>,
    stats: MemoryStats,
    fail_creates: bool,
    fail_writes: bool,
}

/// In-memory storage with failure injection
///
/// Cloning shares the underlying files, so a test can keep one clone for
/// inspection while the recorder owns another.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> MemoryStats {
        self.state.lock().stats
    }

    /// Current contents of `name`, if it exists
    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        let state = self.state.lock();
        state.files.get(name).map(|data| data.lock().clone())
    }

    /// Make subsequent `create` calls fail
    pub fn fail_creates(&self, fail: bool) {
        self.state.lock().fail_creates = fail;
    }

    /// Make writes through open handles fail
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }
}

impl Storage for MemoryStorage {
    type Handle = MemoryFile;
    type Reader = Cursor<Vec<u8>>;

    fn create(&self, name: &str) -> io::Result<Self::Handle> {
        let name = validate_name(name)?;
        let mut state = self.state.lock();

        if state.fail_creates {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "storage unavailable"));
        }

        let data = Arc::new(Mutex::new(Vec::new()));
        state.files.insert(name.to_string(), Arc::clone(&data));
        state.stats.creates += 1;

        Ok(MemoryFile {
            data,
            pos: 0,
            storage: Arc::clone(&self.state),
        })
    }

    fn open_read(&self, name: &str) -> io::Result<Self::Reader> {
        let name = validate_name(name)?;
        self.contents(name)
            .map(Cursor::new)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} not found", name)))
    }

    fn file_size(&self, name: &str) -> io::Result<u64> {
        self.open_read(name).map(|reader| reader.get_ref().len() as u64)
    }

    fn remove(&self, name: &str) -> bool {
        let Ok(name) = validate_name(name) else {
            return false;
        };
        self.state.lock().files.remove(name).is_some()
    }

    fn rename(&self, old: &str, new: &str) -> bool {
        let (Ok(old), Ok(new)) = (validate_name(old), validate_name(new)) else {
            return false;
        };

        let mut state = self.state.lock();
        match state.files.remove(old) {
            Some(data) => {
                state.files.insert(new.to_string(), data);
                true
            }
            None => false,
        }
    }

    fn list(&self) -> io::Result<Vec<StoredFile>> {
        let state = self.state.lock();
        Ok(state
            .files
            .iter()
            .map(|(name, data)| StoredFile {
                name: name.clone(),
                size_bytes: data.lock().len() as u64,
            })
            .collect())
    }
}

/// Write handle into a [`MemoryStorage`] file
pub struct MemoryFile {
    data: Arc<Mutex<Vec<u8>>>,
    pos: usize,
    storage: Arc<Mutex<MemoryState>>,
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        {
            let mut state = self.storage.lock();
            if state.fail_writes {
                return Err(io::Error::new(io::ErrorKind::Other, "write failed"));
            }
            if self.pos == 0 && !buf.is_empty() {
                state.stats.header_writes += 1;
            }
        }

        let mut data = self.data.lock();
        let end = self.pos + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[self.pos..end].copy_from_slice(buf);
        self.pos = end;

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.storage.lock().stats.seeks += 1;

        let len = self.data.lock().len() as i64;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => len + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };

        if target < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "seek before start"));
        }

        self.pos = target as usize;
        Ok(self.pos as u64)
    }
}

impl Drop for MemoryFile {
    fn drop(&mut self) {
        self.storage.lock().stats.closes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_overwrite_at_start_keeps_tail() {
        let storage = MemoryStorage::new();
        let mut file = storage.create("x.wav").unwrap();

        file.write_all(b"aaaa").unwrap();
        file.write_all(b"bbbb").unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.write_all(b"cc").unwrap();
        drop(file);

        assert_eq!(storage.contents("x.wav").unwrap(), b"ccaabbbb");
        assert_eq!(
            storage.stats(),
            MemoryStats {
                creates: 1,
                header_writes: 2,
                seeks: 1,
                closes: 1
            }
        );
    }

    #[test]
    fn test_failure_injection() {
        let storage = MemoryStorage::new();

        storage.fail_creates(true);
        assert!(storage.create("x.wav").is_err());
        storage.fail_creates(false);

        let mut file = storage.create("x.wav").unwrap();
        storage.fail_writes(true);
        assert!(file.write_all(b"data").is_err());
    }

    #[test]
    fn test_read_rename_remove() {
        let storage = MemoryStorage::new();
        storage.create("a.wav").unwrap().write_all(b"hello").unwrap();

        assert!(storage.rename("a.wav", "b.wav"));
        let mut text = String::new();
        storage.open_read("b.wav").unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello");

        assert!(storage.remove("b.wav"));
        assert!(storage.open_read("b.wav").is_err());
    }
}
