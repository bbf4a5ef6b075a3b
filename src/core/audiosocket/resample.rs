use super::{AudioSocketError, AudioSocketResult};

/// Sample rate of the PBX media channel.
pub const OUTPUT_SAMPLE_RATE: u32 = 8000;

/// Downsamples mono PCM16 by an integer factor, keeping every Nth sample.
///
/// Equal rates pass the data through. A ratio that is not a whole number fails.
/// A trailing partial group of samples is dropped.
pub fn downsample(data: &[u8], input_rate: u32, output_rate: u32) -> AudioSocketResult<Vec<u8>> {
    if input_rate == 0 || output_rate == 0 {
        return Err(AudioSocketError::UnsupportedSampleRate {
            input: input_rate,
            output: output_rate,
        });
    }

    if input_rate == output_rate {
        return Ok(data.to_vec());
    }

    if input_rate < output_rate || input_rate % output_rate != 0 {
        return Err(AudioSocketError::UnsupportedSampleRate {
            input: input_rate,
            output: output_rate,
        });
    }

    let factor = (input_rate / output_rate) as usize;
    let stride = 2 * factor;

    let mut out = Vec::with_capacity(data.len() / factor + 2);
    let mut i = 0;
    while i + stride - 1 < data.len() {
        out.extend_from_slice(&data[i..i + 2]);
        i += stride;
    }

    Ok(out)
}
