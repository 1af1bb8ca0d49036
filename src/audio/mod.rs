pub mod capture;
pub mod processor;
pub mod wav;

pub use capture::{open_source, spawn_capture_thread, CaptureSource, RawStreamSource, DEFAULT_BLOCK_SIZE};
pub use processor::{bytes_to_samples, samples_to_bytes, SampleProcessor, DEFAULT_GAIN};
pub use wav::{
    write_header, WavContainerWriter, WavError, WavHeaderFields, MAX_DATA_BYTE_COUNT, WAV_HEADER_SIZE,
};
