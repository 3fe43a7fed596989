//! Background task draining the microphone into the shared sample ring.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::state::DeviceState;

use super::mic::MicDriver;
use super::ring::AudioRing;

/// Bytes pulled from the driver per cycle, at most.
const READ_CHUNK: usize = 4096;

/// Spawn the sampling task. It is the sole writer of `ring`.
///
/// If the microphone never came up the task exits immediately instead of
/// spinning on a dead driver.
pub fn spawn(
    mut mic: Box<dyn MicDriver>,
    ring: Arc<Mutex<AudioRing>>,
    state: Arc<DeviceState>,
    cadence: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if !state.mic_ready() {
            info!("microphone not initialized, audio sampler exiting");
            return;
        }

        info!(cadence_ms = cadence.as_millis() as u64, "audio sampler running");

        let mut interval = tokio::time::interval(cadence);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut scratch = vec![0u8; READ_CHUNK];

        loop {
            interval.tick().await;
            let n = sample_once(mic.as_mut(), &ring, &state, &mut scratch).await;
            if n > 0 {
                debug!(bytes = n, "audio cycle");
            }
        }
    })
}

/// One sampling cycle: poll the driver, read up to the window's free space
/// (a full chunk once the window is rolling), append, account.
pub(crate) async fn sample_once(
    mic: &mut dyn MicDriver,
    ring: &Mutex<AudioRing>,
    state: &DeviceState,
    scratch: &mut [u8],
) -> usize {
    let available = mic.bytes_available();
    if available == 0 {
        return 0;
    }

    let mut ring = ring.lock().await;
    let free = ring.free();
    let want = if free == 0 { scratch.len() } else { free.min(scratch.len()) }.min(available);

    let n = mic.read(&mut scratch[..want]);
    if n > 0 {
        ring.push(&scratch[..n]);
        state.add_audio_bytes(n as u64);
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sim::SimMic;
    use crate::AudioConfig;

    #[tokio::test]
    async fn cycles_fill_ring_and_advance_counter() {
        let mut mic = SimMic::new();
        mic.start(&AudioConfig::default()).unwrap();

        let ring = Mutex::new(AudioRing::new(8192));
        let state = DeviceState::new("test-node".into());
        let mut scratch = vec![0u8; READ_CHUNK];

        // Let the simulated driver accumulate some samples.
        tokio::time::sleep(Duration::from_millis(60)).await;

        let mut total = 0;
        for _ in 0..3 {
            total += sample_once(&mut mic, &ring, &state, &mut scratch).await;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert!(total > 0);
        let ring = ring.lock().await;
        assert!(ring.is_ready());
        assert_eq!(ring.len().min(ring.capacity()), ring.len());
        assert_eq!(state.snapshot().audio_bytes_captured, total as u64);
    }

    #[tokio::test]
    async fn full_ring_still_rolls_forward() {
        let mut mic = SimMic::new();
        mic.start(&AudioConfig::default()).unwrap();

        let ring = Mutex::new(AudioRing::new(64));
        let state = DeviceState::new("test-node".into());
        let mut scratch = vec![0u8; READ_CHUNK];

        tokio::time::sleep(Duration::from_millis(50)).await;
        sample_once(&mut mic, &ring, &state, &mut scratch).await;
        let before = ring.lock().await.snapshot();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let n = sample_once(&mut mic, &ring, &state, &mut scratch).await;

        assert!(n > 0, "writer stalled on a full window");
        let guard = ring.lock().await;
        assert_eq!(guard.len(), guard.capacity());
        assert_ne!(guard.snapshot(), before);
    }
}
