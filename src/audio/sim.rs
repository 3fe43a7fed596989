//! Simulated microphone producing a steady test tone.

use std::time::Instant;

use tracing::info;

use crate::AudioConfig;

use super::mic::{MicDriver, MicError};

const TONE_HZ: f32 = 440.0;
const AMPLITUDE: f32 = 0.3;

/// Paces a 440 Hz sine against wall-clock time so `bytes_available` grows at
/// the configured sample rate, like a real driver buffer filling up.
pub struct SimMic {
    sample_rate: u32,
    channels: u16,
    started: Option<Instant>,
    consumed_samples: u64,
}

impl SimMic {
    pub fn new() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            started: None,
            consumed_samples: 0,
        }
    }

    fn pending_samples(&self) -> u64 {
        let Some(started) = self.started else {
            return 0;
        };
        let produced = (started.elapsed().as_secs_f64() * self.sample_rate as f64) as u64
            * self.channels as u64;
        produced.saturating_sub(self.consumed_samples)
    }
}

impl Default for SimMic {
    fn default() -> Self {
        Self::new()
    }
}

impl MicDriver for SimMic {
    fn start(&mut self, config: &AudioConfig) -> Result<(), MicError> {
        if config.bits_per_sample != 16 {
            return Err(MicError::Unsupported(format!(
                "{}-bit capture (only 16-bit supported)",
                config.bits_per_sample
            )));
        }
        self.sample_rate = config.sample_rate;
        self.channels = config.channels;
        self.started = Some(Instant::now());
        self.consumed_samples = 0;
        info!(sample_rate = self.sample_rate, "simulated microphone started");
        Ok(())
    }

    fn bytes_available(&self) -> usize {
        // Cap what one poll can see so a long stall doesn't turn into an
        // unbounded read burst.
        (self.pending_samples() * 2).min(64 * 1024) as usize
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let want = (buf.len() / 2).min(self.pending_samples() as usize);
        if want == 0 {
            return 0;
        }

        for i in 0..want {
            let idx = self.consumed_samples + i as u64;
            let t = idx as f32 / (self.sample_rate as f32 * self.channels as f32);
            let value = (AMPLITUDE * (2.0 * std::f32::consts::PI * TONE_HZ * t).sin()
                * i16::MAX as f32) as i16;
            buf[i * 2..i * 2 + 2].copy_from_slice(&value.to_le_bytes());
        }

        self.consumed_samples += want as u64;
        want * 2
    }
}
