//! Microphone drivers behind a polling contract.
//!
//! The sampling task polls `bytes_available`/`read`; both are non-blocking.
//! The cpal backend bridges its push-style callback into that contract with
//! an SPSC ring drained on the polling side.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use tracing::{info, warn};

use crate::AudioConfig;

#[derive(Debug, thiserror::Error)]
pub enum MicError {
    #[error("no input device available")]
    DeviceUnavailable,

    #[error("capture mode unsupported: {0}")]
    Unsupported(String),

    #[error("audio backend error: {0}")]
    Backend(String),
}

pub trait MicDriver: Send {
    /// Configure and start the microphone in a fixed capture mode.
    fn start(&mut self, config: &AudioConfig) -> Result<(), MicError>;

    /// Sample bytes currently buffered by the driver. Non-blocking.
    fn bytes_available(&self) -> usize;

    /// Read up to `buf.len()` bytes; returns the count actually read,
    /// possibly zero. Non-blocking.
    fn read(&mut self, buf: &mut [u8]) -> usize;
}

type ByteConsumer = ringbuf::HeapCons<u8>;

/// Microphone capture through cpal.
///
/// cpal streams are not `Send`, so the stream lives on a dedicated worker
/// thread for its whole life; the callback pushes little-endian i16 sample
/// bytes into the ring this driver reads from.
pub struct CpalMic {
    consumer: Option<ByteConsumer>,
    stop: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl CpalMic {
    pub fn new() -> Self {
        Self {
            consumer: None,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl Default for CpalMic {
    fn default() -> Self {
        Self::new()
    }
}

impl MicDriver for CpalMic {
    fn start(&mut self, config: &AudioConfig) -> Result<(), MicError> {
        if config.bits_per_sample != 16 {
            return Err(MicError::Unsupported(format!(
                "{}-bit capture (only 16-bit supported)",
                config.bits_per_sample
            )));
        }

        let ring = HeapRb::<u8>::new(config.driver_buffer_bytes);
        let (mut producer, consumer) = ring.split();

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stop = Arc::clone(&self.stop);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), MicError>>();

        let worker = std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || {
                let host = cpal::default_host();
                let device = match host.default_input_device() {
                    Some(d) => d,
                    None => {
                        let _ = ready_tx.send(Err(MicError::DeviceUnavailable));
                        return;
                    }
                };

                let stream = match device.build_input_stream(
                    &stream_config,
                    move |samples: &[i16], _: &cpal::InputCallbackInfo| {
                        let mut bytes = Vec::with_capacity(samples.len() * 2);
                        for &s in samples {
                            bytes.extend_from_slice(&s.to_le_bytes());
                        }
                        let pushed = producer.push_slice(&bytes);
                        if pushed < bytes.len() {
                            // Reader fell behind; the remainder is dropped.
                            warn!(dropped = bytes.len() - pushed, "mic ring overrun");
                        }
                    },
                    move |err| {
                        warn!("input stream error: {err}");
                    },
                    None,
                ) {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = ready_tx.send(Err(MicError::Backend(e.to_string())));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(MicError::Backend(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Keep the stream alive until told to stop.
                while !stop.load(Ordering::Relaxed) {
                    std::thread::sleep(Duration::from_millis(50));
                }
            })
            .map_err(|e| MicError::Backend(e.to_string()))?;

        self.worker = Some(worker);

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {
                self.consumer = Some(consumer);
                info!(
                    sample_rate = config.sample_rate,
                    channels = config.channels,
                    "microphone capture started"
                );
                Ok(())
            }
            Ok(Err(e)) => {
                self.stop.store(true, Ordering::Relaxed);
                Err(e)
            }
            Err(_) => {
                self.stop.store(true, Ordering::Relaxed);
                Err(MicError::Backend(
                    "capture worker did not report readiness".into(),
                ))
            }
        }
    }

    fn bytes_available(&self) -> usize {
        self.consumer
            .as_ref()
            .map(|c| c.occupied_len())
            .unwrap_or(0)
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        match self.consumer.as_mut() {
            Some(c) => c.pop_slice(buf),
            None => 0,
        }
    }
}

impl Drop for CpalMic {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
