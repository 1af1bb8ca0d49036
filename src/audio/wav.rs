// RIFF/WAVE container framing for a raw PCM byte stream
//
// The header is written twice: once as a placeholder with a zero data size
// when the file is opened, and once more over the top of the placeholder when
// the recording is finalized. A file that is never finalized keeps
// `data_byte_count == 0` even though payload follows the header.

use std::io::{self, Seek, SeekFrom, Write};
use thiserror::Error;
use tracing::debug;

/// Size of the canonical PCM WAV header in bytes
pub const WAV_HEADER_SIZE: usize = 44;

/// Largest data size whose RIFF chunk size (data + 36) still fits in a u32
pub const MAX_DATA_BYTE_COUNT: u32 = u32::MAX - 36;

const PCM_FORMAT: u16 = 1;
const FMT_CHUNK_SIZE: u32 = 16;

/// Fields carried by the 44-byte header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeaderFields {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
    pub data_byte_count: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WavError {
    #[error("header too short: {0} bytes")]
    TooShort(usize),

    #[error("missing {0:?} tag")]
    MissingTag(&'static str),

    #[error("unsupported audio format {0} (only PCM is supported)")]
    UnsupportedFormat(u16),
}

impl WavHeaderFields {
    /// Mono PCM header with a zero-length data chunk
    pub fn placeholder(sample_rate: u32, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            bits_per_sample,
            channels: 1,
            data_byte_count: 0,
        }
    }

    pub fn with_data_byte_count(self, data_byte_count: u32) -> Self {
        Self {
            data_byte_count,
            ..self
        }
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.channels as u32 * self.bits_per_sample as u32 / 8
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    /// RIFF chunk size: everything after the first 8 bytes of the file
    ///
    /// Saturates rather than wrapping below the 36 bytes of header it covers.
    pub fn riff_chunk_size(&self) -> u32 {
        self.data_byte_count.saturating_add(36)
    }

    /// Duration implied by the header (data size over byte rate)
    pub fn duration_secs(&self) -> f64 {
        match self.byte_rate() {
            0 => 0.0,
            rate => self.data_byte_count as f64 / rate as f64,
        }
    }

    /// Encode the header, all integers little-endian
    ///
    /// ```text
    /// [0-3]    "RIFF"
    /// [4-7]    data_byte_count + 36
    /// [8-11]   "WAVE"
    /// [12-15]  "fmt "
    /// [16-19]  16
    /// [20-21]  1 (PCM)
    /// [22-23]  channels
    /// [24-27]  sample_rate
    /// [28-31]  byte_rate
    /// [32-33]  block_align
    /// [34-35]  bits_per_sample
    /// [36-39]  "data"
    /// [40-43]  data_byte_count
    /// ```
    pub fn encode(&self) -> [u8; WAV_HEADER_SIZE] {
        let mut header = [0u8; WAV_HEADER_SIZE];

        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&self.riff_chunk_size().to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");

        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
        header[20..22].copy_from_slice(&PCM_FORMAT.to_le_bytes());
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());

        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&self.data_byte_count.to_le_bytes());

        header
    }

    /// Decode the first 44 bytes of a file produced by [`write_header`]
    pub fn parse(bytes: &[u8]) -> Result<Self, WavError> {
        if bytes.len() < WAV_HEADER_SIZE {
            return Err(WavError::TooShort(bytes.len()));
        }

        for (range, tag) in [(0..4, "RIFF"), (8..12, "WAVE"), (12..16, "fmt "), (36..40, "data")] {
            if &bytes[range] != tag.as_bytes() {
                return Err(WavError::MissingTag(tag));
            }
        }

        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let u32_at = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);

        let format = u16_at(20);
        if format != PCM_FORMAT {
            return Err(WavError::UnsupportedFormat(format));
        }

        Ok(Self {
            channels: u16_at(22),
            sample_rate: u32_at(24),
            bits_per_sample: u16_at(34),
            data_byte_count: u32_at(40),
        })
    }
}

/// Write exactly 44 header bytes at the sink's current position
pub fn write_header<W: Write>(sink: &mut W, fields: &WavHeaderFields) -> io::Result<()> {
    sink.write_all(&fields.encode())
}

/// Frames appended PCM bytes inside a WAV container
///
/// The header is patched on [`finalize`](Self::finalize); dropping the writer
/// without finalizing leaves the placeholder in place.
pub struct WavContainerWriter<W: Write + Seek> {
    sink: W,
    fields: WavHeaderFields,
    payload_bytes: u64,
}

impl<W: Write + Seek> WavContainerWriter<W> {
    /// Write the placeholder header and return a writer positioned after it
    pub fn create(mut sink: W, fields: WavHeaderFields) -> io::Result<Self> {
        let fields = fields.with_data_byte_count(0);
        write_header(&mut sink, &fields)?;

        Ok(Self {
            sink,
            fields,
            payload_bytes: 0,
        })
    }

    /// Append raw payload bytes. Returns the number of bytes written.
    pub fn append(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.sink.write_all(bytes)?;
        self.payload_bytes += bytes.len() as u64;
        Ok(bytes.len())
    }

    /// Payload bytes appended so far
    pub fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }

    /// Seek back to the start, rewrite the header with the final data size,
    /// and hand the sink back to the caller for closing
    pub fn finalize(mut self, data_byte_count: u32) -> io::Result<W> {
        self.fields = self.fields.with_data_byte_count(data_byte_count);

        self.sink.seek(SeekFrom::Start(0))?;
        write_header(&mut self.sink, &self.fields)?;
        self.sink.flush()?;

        debug!(
            "WAV header finalized: {} data bytes ({} appended)",
            data_byte_count, self.payload_bytes
        );

        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_layout() {
        let header = WavHeaderFields::placeholder(48000, 32)
            .with_data_byte_count(9600)
            .encode();

        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(header[4..8].try_into().unwrap()), 9636);
        assert_eq!(&header[8..16], b"WAVEfmt ");
        assert_eq!(u32::from_le_bytes(header[16..20].try_into().unwrap()), 16);
        assert_eq!(u16::from_le_bytes([header[20], header[21]]), 1);
        assert_eq!(u16::from_le_bytes([header[22], header[23]]), 1);
        assert_eq!(u32::from_le_bytes(header[24..28].try_into().unwrap()), 48000);
        assert_eq!(u32::from_le_bytes(header[28..32].try_into().unwrap()), 192000);
        assert_eq!(u16::from_le_bytes([header[32], header[33]]), 4);
        assert_eq!(u16::from_le_bytes([header[34], header[35]]), 32);
        assert_eq!(&header[36..40], b"data");
        assert_eq!(u32::from_le_bytes(header[40..44].try_into().unwrap()), 9600);
    }

    #[test]
    fn test_parse_recovers_fields() {
        let fields = WavHeaderFields::placeholder(44100, 16).with_data_byte_count(123_456);
        let parsed = WavHeaderFields::parse(&fields.encode()).unwrap();

        assert_eq!(parsed, fields);
        assert_eq!(parsed.data_byte_count, 123_456);
        assert_eq!(parsed.sample_rate, 44100);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(WavHeaderFields::parse(&[0u8; 10]), Err(WavError::TooShort(10)));

        let mut header = WavHeaderFields::placeholder(48000, 32).encode();
        header[36..40].copy_from_slice(b"junk");
        assert_eq!(WavHeaderFields::parse(&header), Err(WavError::MissingTag("data")));

        let mut header = WavHeaderFields::placeholder(48000, 32).encode();
        header[20] = 3;
        assert_eq!(WavHeaderFields::parse(&header), Err(WavError::UnsupportedFormat(3)));
    }

    #[test]
    fn test_writer_patches_header_on_finalize() {
        let mut writer =
            WavContainerWriter::create(Cursor::new(Vec::new()), WavHeaderFields::placeholder(48000, 32))
                .unwrap();
        writer.append(&[1u8; 100]).unwrap();
        writer.append(&[2u8; 28]).unwrap();
        assert_eq!(writer.payload_bytes(), 128);

        let bytes = writer.finalize(128).unwrap().into_inner();

        assert_eq!(bytes.len(), WAV_HEADER_SIZE + 128);
        let fields = WavHeaderFields::parse(&bytes).unwrap();
        assert_eq!(fields.data_byte_count, 128);
        assert_eq!(fields.riff_chunk_size(), 164);
        assert_eq!(&bytes[WAV_HEADER_SIZE..WAV_HEADER_SIZE + 100], &[1u8; 100][..]);
    }

    #[test]
    fn test_unfinalized_file_keeps_placeholder() {
        let mut writer =
            WavContainerWriter::create(Cursor::new(Vec::new()), WavHeaderFields::placeholder(48000, 32))
                .unwrap();
        writer.append(&[7u8; 64]).unwrap();
        let WavContainerWriter { sink, .. } = writer;

        let bytes = sink.into_inner();
        assert_eq!(bytes.len(), WAV_HEADER_SIZE + 64);
        assert_eq!(WavHeaderFields::parse(&bytes).unwrap().data_byte_count, 0);
    }

    #[test]
    fn test_riff_size_never_wraps() {
        let fields = WavHeaderFields::placeholder(48000, 32).with_data_byte_count(MAX_DATA_BYTE_COUNT);
        let header = fields.encode();
        assert_eq!(u32::from_le_bytes(header[4..8].try_into().unwrap()), u32::MAX);
        assert_eq!(u32::from_le_bytes(header[40..44].try_into().unwrap()), u32::MAX - 36);

        let oversized = fields.with_data_byte_count(u32::MAX);
        assert_eq!(oversized.riff_chunk_size(), u32::MAX);
    }

    #[test]
    fn test_duration_uses_declared_depth() {
        let fields = WavHeaderFields::placeholder(48000, 32).with_data_byte_count(192_000);
        assert!((fields.duration_secs() - 1.0).abs() < 1e-9);

        let fields = WavHeaderFields::placeholder(48000, 16).with_data_byte_count(192_000);
        assert!((fields.duration_secs() - 2.0).abs() < 1e-9);
    }
}
