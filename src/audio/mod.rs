pub mod mic;
pub mod ring;
pub mod sampler;
pub mod sim;

pub use mic::{MicDriver, MicError};
pub use ring::AudioRing;

/// Wrap raw little-endian 16-bit PCM in a WAV container.
pub fn wav_container(
    pcm: &[u8],
    sample_rate: u32,
    channels: u16,
) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for sample in pcm.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?;
    }
    writer.finalize()?;

    Ok(cursor.into_inner())
}
