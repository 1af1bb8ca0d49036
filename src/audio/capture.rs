use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Default number of bytes pulled per capture call
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Blocking source of raw PCM bytes
///
/// Implementations block until at least some audio is available. A pull may
/// return fewer bytes than the buffer holds, or zero.
pub trait CaptureSource: Send {
    /// Fill `buf` with raw audio, returning the number of bytes read
    fn pull(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Reads raw little-endian PCM from any byte stream
///
/// Covers device nodes, named pipes fed by an external capture tool, plain
/// files and stdin.
pub struct RawStreamSource<R: Read + Send> {
    reader: R,
    name: String,
}

impl<R: Read + Send> RawStreamSource<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
        }
    }
}

impl RawStreamSource<File> {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self::new(file, path.display().to_string()))
    }
}

impl RawStreamSource<io::Stdin> {
    pub fn stdin() -> Self {
        Self::new(io::stdin(), "stdin")
    }
}

impl<R: Read + Send> CaptureSource for RawStreamSource<R> {
    fn pull(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reader.read(buf) {
            // A byte stream that returns 0 has ended; it will never block again
            Ok(0) if !buf.is_empty() => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("capture stream {} ended", self.name),
            )),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Open the configured capture input ("-" means stdin)
pub fn open_source(input: &str) -> io::Result<Box<dyn CaptureSource>> {
    if input == "-" {
        Ok(Box::new(RawStreamSource::stdin()))
    } else {
        Ok(Box::new(RawStreamSource::open(input)?))
    }
}

/// Run the blocking pull loop on a dedicated thread
///
/// Every non-empty block is handed to the recorder loop over `tx`. The thread
/// exits when the source fails or the receiving side is dropped.
pub fn spawn_capture_thread(
    mut source: Box<dyn CaptureSource>,
    block_size: usize,
    tx: mpsc::Sender<Vec<u8>>,
) -> io::Result<JoinHandle<()>> {
    if block_size == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "capture block size must be greater than zero",
        ));
    }

    thread::Builder::new()
        .name("capture".to_string())
        .spawn(move || {
            info!("Capture thread started: {} ({} byte blocks)", source.name(), block_size);

            let mut buf = vec![0u8; block_size];
            loop {
                let n = match source.pull(&mut buf) {
                    Ok(0) => continue,
                    Ok(n) => n,
                    Err(e) => {
                        error!("Capture source {} failed: {}", source.name(), e);
                        break;
                    }
                };

                if tx.blocking_send(buf[..n].to_vec()).is_err() {
                    warn!("Recorder loop is gone, stopping capture");
                    break;
                }
            }

            info!("Capture thread stopped");
        })
}
