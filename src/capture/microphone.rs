use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;

use crate::domain::traits::{AudioCapture, CaptureSession, DataHandler, StopHandler};
use crate::domain::types::{CaptureOptions, CaptureState, Chunk};

const CAPTURE_SAMPLE_RATE: u32 = 16000;
const DEFAULT_CHUNK_INTERVAL_MS: u32 = 100;

/// Production capture capability over the default input device.
///
/// Sessions deliver 16-bit little-endian mono PCM at 16 kHz, one chunk
/// per `chunk_interval_ms` of audio.
pub struct MicrophoneCapture {
    chunk_interval_ms: u32,
}

impl MicrophoneCapture {
    pub fn new() -> Self {
        Self::with_chunk_interval(DEFAULT_CHUNK_INTERVAL_MS)
    }

    pub fn with_chunk_interval(chunk_interval_ms: u32) -> Self {
        Self { chunk_interval_ms }
    }
}

impl Default for MicrophoneCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCapture for MicrophoneCapture {
    fn open(&self, options: &CaptureOptions) -> Result<Box<dyn CaptureSession>> {
        if !options.audio {
            bail!("audio capture was not requested");
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("no input device available")?;
        let config = device
            .default_input_config()
            .context("failed to query input configuration")?;

        Ok(Box::new(MicrophoneSession {
            device: Some(device),
            config,
            chunk_interval: Duration::from_millis(u64::from(self.chunk_interval_ms)),
            data_handler: Arc::new(Mutex::new(None)),
            stop_handler: Arc::new(Mutex::new(None)),
            is_recording: Arc::new(AtomicBool::new(false)),
        }))
    }
}

pub struct MicrophoneSession {
    device: Option<cpal::Device>,
    config: cpal::SupportedStreamConfig,
    chunk_interval: Duration,
    data_handler: Arc<Mutex<Option<DataHandler>>>,
    stop_handler: Arc<Mutex<Option<StopHandler>>>,
    is_recording: Arc<AtomicBool>,
}

impl CaptureSession for MicrophoneSession {
    fn on_data(&mut self, handler: DataHandler) {
        *self.data_handler.lock() = Some(handler);
    }

    fn on_stop(&mut self, handler: StopHandler) {
        *self.stop_handler.lock() = Some(handler);
    }

    fn start(&mut self) -> Result<()> {
        let device = self.device.take().context("capture session already started")?;
        let config = self.config.clone();
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        let resample_ratio = CAPTURE_SAMPLE_RATE as f64 / sample_rate as f64;

        // High-quality sinc resampler with anti-aliasing
        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let resampler = SincFixedIn::<f32>::new(
            resample_ratio,
            2.0, // max relative ratio (safety margin)
            params,
            1024, // chunk size
            1,    // mono channel
        )
        .context("failed to create resampler")?;
        let resampler = Arc::new(Mutex::new(resampler));

        self.is_recording.store(true, Ordering::SeqCst);

        let pending: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let pending_for_callback = Arc::clone(&pending);
        let is_recording = Arc::clone(&self.is_recording);
        let is_recording_for_loop = Arc::clone(&self.is_recording);
        let data_handler = Arc::clone(&self.data_handler);
        let stop_handler = Arc::clone(&self.stop_handler);
        let chunk_interval = self.chunk_interval;

        thread::spawn(move || {
            let stream = device
                .build_input_stream(
                    &config.into(),
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if !is_recording.load(Ordering::SeqCst) {
                            return;
                        }

                        // Convert to mono if stereo
                        let mono: Vec<f32> = if channels > 1 {
                            data.chunks(channels)
                                .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
                                .collect()
                        } else {
                            data.to_vec()
                        };

                        // Resample to 16kHz using high-quality sinc interpolation
                        let mut resampler = resampler.lock();
                        let input_frames = resampler.input_frames_next();

                        // Process in chunks matching resampler's expected input size
                        for chunk in mono.chunks(input_frames) {
                            if chunk.len() == input_frames {
                                let input = vec![chunk.to_vec()];
                                if let Ok(output) = resampler.process(&input, None) {
                                    extend_pcm16(&pending_for_callback, &output[0]);
                                }
                            } else {
                                // Pad the last chunk if needed
                                let mut padded = chunk.to_vec();
                                padded.resize(input_frames, 0.0);
                                let input = vec![padded];
                                if let Ok(output) = resampler.process(&input, None) {
                                    // Only take proportional output for partial input
                                    let output_len = (chunk.len() as f64
                                        * resampler.output_frames_next() as f64
                                        / input_frames as f64)
                                        as usize;
                                    extend_pcm16(
                                        &pending_for_callback,
                                        &output[0][..output_len.min(output[0].len())],
                                    );
                                }
                            }
                        }
                    },
                    |err| warn!("audio capture stream error: {err}"),
                    None,
                )
                .unwrap();

            stream.play().unwrap();

            while is_recording_for_loop.load(Ordering::SeqCst) {
                thread::sleep(chunk_interval);
                deliver_pending(&pending, &data_handler);
            }

            drop(stream);

            // Flush the final fragment, then signal the stop event once.
            deliver_pending(&pending, &data_handler);
            if let Some(handler) = stop_handler.lock().as_mut() {
                handler();
            }
        });

        Ok(())
    }

    fn stop(&mut self) {
        self.is_recording.store(false, Ordering::SeqCst);
    }

    fn state(&self) -> CaptureState {
        if self.is_recording.load(Ordering::SeqCst) {
            CaptureState::Recording
        } else {
            CaptureState::Inactive
        }
    }
}

impl Drop for MicrophoneSession {
    fn drop(&mut self) {
        // The stream thread watches this flag; clear it so the thread
        // exits even if stop() was never called.
        self.is_recording.store(false, Ordering::SeqCst);
    }
}

/// Append samples to the pending buffer as 16-bit little-endian PCM.
fn extend_pcm16(pending: &Arc<Mutex<Vec<u8>>>, samples: &[f32]) {
    let mut pending = pending.lock();
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        pending.extend_from_slice(&value.to_le_bytes());
    }
}

/// Drain the pending buffer into one data event, if there is anything
/// to deliver and a handler is registered.
fn deliver_pending(pending: &Arc<Mutex<Vec<u8>>>, handler: &Arc<Mutex<Option<DataHandler>>>) {
    let bytes = std::mem::take(&mut *pending.lock());
    if bytes.is_empty() {
        return;
    }
    if let Some(handler) = handler.lock().as_mut() {
        handler(Chunk::new(bytes));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_pcm16_encodes_little_endian() {
        let pending = Arc::new(Mutex::new(Vec::new()));
        extend_pcm16(&pending, &[0.0, 1.0, -1.0]);

        let bytes = pending.lock().clone();
        assert_eq!(bytes.len(), 6);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 0);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), -i16::MAX);
    }

    #[test]
    fn test_extend_pcm16_clamps_out_of_range() {
        let pending = Arc::new(Mutex::new(Vec::new()));
        extend_pcm16(&pending, &[2.0, -2.0]);

        let bytes = pending.lock().clone();
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), -i16::MAX);
    }

    #[test]
    fn test_deliver_pending_skips_empty_buffer() {
        let pending: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&delivered);
        let handler: Arc<Mutex<Option<DataHandler>>> = Arc::new(Mutex::new(Some(Box::new(
            move |chunk| sink.lock().push(chunk),
        ))));

        deliver_pending(&pending, &handler);
        assert!(delivered.lock().is_empty());

        pending.lock().extend_from_slice(&[1, 2, 3, 4]);
        deliver_pending(&pending, &handler);
        deliver_pending(&pending, &handler);

        let delivered = delivered.lock();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_capture_sample_rate_constant() {
        assert_eq!(CAPTURE_SAMPLE_RATE, 16000);
    }
}
