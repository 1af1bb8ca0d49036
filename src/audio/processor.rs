// Per-block gain and peak normalization
//
// Each captured block is amplified by a fixed gain, clipped to the i16 range,
// and then rescaled so its loudest sample sits at full scale. Normalization is
// local to the block: there is no state carried between blocks.

use tracing::trace;

/// Default gain applied to raw microphone samples
pub const DEFAULT_GAIN: f32 = 18.0;

/// Stateless-per-block sample transform
#[derive(Debug, Clone, Copy)]
pub struct SampleProcessor {
    gain: f32,
}

impl Default for SampleProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_GAIN)
    }
}

impl SampleProcessor {
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }

    /// Transform a raw block of little-endian i16 samples in place
    ///
    /// A trailing odd byte (half a sample) is left untouched.
    pub fn process(&self, block: &mut [u8]) {
        let peak = self.apply_gain(block);

        if peak > 0 {
            normalize(block, peak);
        } else {
            trace!("Silent block ({} bytes), skipping normalization", block.len());
        }
    }

    /// Gain + clip pass. Returns the peak absolute value after clipping.
    fn apply_gain(&self, block: &mut [u8]) -> i32 {
        let mut peak = 0i32;

        for bytes in block.chunks_exact_mut(2) {
            let sample = i16::from_le_bytes([bytes[0], bytes[1]]);
            // `as` truncates toward zero and saturates at the i32 bounds
            let amplified = (sample as f32 * self.gain) as i32;
            let clipped = amplified.clamp(i16::MIN as i32, i16::MAX as i32);

            bytes.copy_from_slice(&(clipped as i16).to_le_bytes());
            peak = peak.max(clipped.abs());
        }

        peak
    }
}

/// Rescale every sample so that `peak` maps to `i16::MAX`
fn normalize(block: &mut [u8], peak: i32) {
    let factor = i16::MAX as f32 / peak as f32;

    for bytes in block.chunks_exact_mut(2) {
        let sample = i16::from_le_bytes([bytes[0], bytes[1]]);
        let scaled = (sample as f32 * factor) as i16;
        bytes.copy_from_slice(&scaled.to_le_bytes());
    }
}

/// Encode i16 samples as a little-endian byte block
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Decode a little-endian byte block into i16 samples
pub fn bytes_to_samples(block: &[u8]) -> Vec<i16> {
    block
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(gain: f32, samples: &[i16]) -> Vec<i16> {
        let mut block = samples_to_bytes(samples);
        SampleProcessor::new(gain).process(&mut block);
        bytes_to_samples(&block)
    }

    #[test]
    fn test_full_scale_block_is_unchanged() {
        let input = [i16::MAX, 0, -i16::MAX];
        assert_eq!(run(1.0, &input), input);
    }

    #[test]
    fn test_silence_stays_silent() {
        let input = [0i16; 512];
        assert_eq!(run(DEFAULT_GAIN, &input), input);
    }

    #[test]
    fn test_gain_clips_to_i16_range() {
        let mut block = samples_to_bytes(&[20000, -20000, 100]);
        let peak = SampleProcessor::new(18.0).apply_gain(&mut block);

        assert_eq!(bytes_to_samples(&block), vec![i16::MAX, i16::MIN, 1800]);
        assert_eq!(peak, 32768);
    }

    #[test]
    fn test_quiet_block_is_normalized_to_full_scale() {
        let out = run(1.0, &[100, -50, 25]);

        let peak = out.iter().map(|s| (*s as i32).abs()).max().unwrap();
        assert!((i16::MAX as i32 - peak).abs() <= 1, "peak was {}", peak);
        // Relative shape survives the rescale
        assert!(out[1] < 0 && out[2] > 0);
    }

    #[test]
    fn test_normalization_is_per_block() {
        let processor = SampleProcessor::new(1.0);

        let mut loud = samples_to_bytes(&[16000, -8000]);
        let mut quiet = samples_to_bytes(&[10, -5]);
        processor.process(&mut loud);
        processor.process(&mut quiet);

        // Both blocks reach full scale independently of each other
        for block in [&loud, &quiet] {
            let first = bytes_to_samples(block)[0] as i32;
            assert!((i16::MAX as i32 - first).abs() <= 1, "first sample was {}", first);
        }
    }

    #[test]
    fn test_trailing_odd_byte_is_untouched() {
        let mut block = samples_to_bytes(&[10, 20]);
        block.push(0xAB);

        SampleProcessor::new(1.0).process(&mut block);

        assert_eq!(block.len(), 5);
        assert_eq!(block[4], 0xAB);
    }

    #[test]
    fn test_zero_gain_produces_silence() {
        let out = run(0.0, &[1000, -1000, 32000]);
        assert_eq!(out, vec![0, 0, 0]);
    }

    #[test]
    fn test_magnitudes_stay_in_range_for_many_gains() {
        let input: Vec<i16> = (-64..64).map(|i| i * 511).collect();

        for gain in [0.0, 0.5, 1.0, 2.0, 18.0, 49.0, 1000.0] {
            let mut block = samples_to_bytes(&input);
            let peak = SampleProcessor::new(gain).apply_gain(&mut block);
            assert!(peak <= 32768, "gain {} produced peak {}", gain, peak);
        }
    }
}
