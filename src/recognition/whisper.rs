//! Whisper-backed recognition session.
//!
//! Listens on its own capture source, independent of the widget's
//! recording session, and turns accumulated audio into an append-only
//! segment list: finalized segments keep their index forever; at most
//! the trailing segment is an interim one, replaced as more audio
//! arrives.

use anyhow::{bail, Context, Result};
use async_channel::Receiver;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::domain::traits::{
    AudioCapture, CaptureSession, ErrorHandler, ResultHandler, SpeechRecognition,
};
use crate::domain::types::{
    CaptureOptions, Chunk, RecognitionConfig, RecognitionError, RecognitionSegment,
};

const SAMPLE_RATE: u32 = 16000;
const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Skip transcription passes on less than half a second of audio.
const MIN_TRANSCRIBE_SAMPLES: usize = (SAMPLE_RATE as usize) / 2;

pub struct WhisperRecognizer {
    ctx: Arc<WhisperContext>,
    source: Box<dyn AudioCapture>,
    config: RecognitionConfig,
    segment_interval: Duration,
    result_handler: Arc<Mutex<Option<ResultHandler>>>,
    error_handler: Arc<Mutex<Option<ErrorHandler>>>,
    segments: Arc<Mutex<Vec<RecognitionSegment>>>,
    is_running: Arc<AtomicBool>,
}

impl WhisperRecognizer {
    /// Load the Whisper model and wrap the given capture source.
    pub fn new(
        model_path: &Path,
        source: Box<dyn AudioCapture>,
        segment_interval_secs: u32,
    ) -> Result<Self> {
        let ctx = WhisperContext::new_with_params(
            &model_path.to_string_lossy(),
            WhisperContextParameters::default(),
        )
        .context("failed to load Whisper model")?;

        Ok(Self {
            ctx: Arc::new(ctx),
            source,
            config: RecognitionConfig::default(),
            segment_interval: Duration::from_secs(u64::from(segment_interval_secs)),
            result_handler: Arc::new(Mutex::new(None)),
            error_handler: Arc::new(Mutex::new(None)),
            segments: Arc::new(Mutex::new(Vec::new())),
            is_running: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl SpeechRecognition for WhisperRecognizer {
    fn configure(&mut self, config: &RecognitionConfig) {
        self.config = config.clone();
    }

    fn on_result(&mut self, handler: ResultHandler) {
        *self.result_handler.lock() = Some(handler);
    }

    fn on_error(&mut self, handler: ErrorHandler) {
        *self.error_handler.lock() = Some(handler);
    }

    fn start(&mut self) -> Result<()> {
        if self.is_running.load(Ordering::SeqCst) {
            bail!("recognition session already started");
        }

        let mut session = self
            .source
            .open(&CaptureOptions::default())
            .context("failed to open recognition audio source")?;

        self.segments.lock().clear();

        let (chunk_tx, chunk_rx) = async_channel::unbounded::<Chunk>();
        session.on_data(Box::new(move |chunk| {
            let _ = chunk_tx.send_blocking(chunk);
        }));

        session
            .start()
            .context("failed to start recognition audio source")?;
        self.is_running.store(true, Ordering::SeqCst);

        let worker = Worker {
            ctx: Arc::clone(&self.ctx),
            config: self.config.clone(),
            segment_interval: self.segment_interval,
            result_handler: Arc::clone(&self.result_handler),
            error_handler: Arc::clone(&self.error_handler),
            segments: Arc::clone(&self.segments),
            is_running: Arc::clone(&self.is_running),
        };
        thread::spawn(move || worker.run(session, chunk_rx));

        Ok(())
    }

    fn stop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
    }
}

impl Drop for WhisperRecognizer {
    fn drop(&mut self) {
        // The worker thread watches this flag; clear it so the thread
        // exits even if stop() was never called.
        self.is_running.store(false, Ordering::SeqCst);
    }
}

/// State moved into the recognition worker thread.
struct Worker {
    ctx: Arc<WhisperContext>,
    config: RecognitionConfig,
    segment_interval: Duration,
    result_handler: Arc<Mutex<Option<ResultHandler>>>,
    error_handler: Arc<Mutex<Option<ErrorHandler>>>,
    segments: Arc<Mutex<Vec<RecognitionSegment>>>,
    is_running: Arc<AtomicBool>,
}

impl Worker {
    fn run(self, mut session: Box<dyn CaptureSession>, chunk_rx: Receiver<Chunk>) {
        let mut samples: Vec<f32> = Vec::new();
        // Samples already consumed into finalized segments.
        let mut finalized = 0usize;
        let mut last_final = Instant::now();

        while self.is_running.load(Ordering::SeqCst) {
            thread::sleep(POLL_INTERVAL);

            while let Ok(chunk) = chunk_rx.try_recv() {
                samples.extend(pcm16_to_f32(&chunk.data));
            }

            let pending = &samples[finalized..];
            if pending.len() < MIN_TRANSCRIBE_SAMPLES {
                continue;
            }

            let finalize = last_final.elapsed() >= self.segment_interval;
            if !finalize && !self.config.interim_results {
                continue;
            }

            match transcribe(&self.ctx, pending, &self.config.language) {
                Ok(text) => {
                    if !text.is_empty() {
                        let mut segments = self.segments.lock();
                        // The trailing interim segment is superseded by
                        // every new pass over the same audio.
                        if segments.last().map_or(false, |segment| !segment.is_final) {
                            segments.pop();
                        }
                        segments.push(RecognitionSegment::new(text, 1.0, finalize));

                        let snapshot = segments.clone();
                        drop(segments);
                        if let Some(handler) = self.result_handler.lock().as_mut() {
                            handler(&snapshot);
                        }
                    }

                    if finalize {
                        finalized = samples.len();
                        last_final = Instant::now();
                        if !self.config.continuous {
                            self.is_running.store(false, Ordering::SeqCst);
                        }
                    }
                }
                Err(err) => {
                    if let Some(handler) = self.error_handler.lock().as_mut() {
                        handler(RecognitionError::new(
                            "transcription-failed",
                            format!("{err:#}"),
                        ));
                    }
                }
            }
        }

        session.stop();
    }
}

fn transcribe(ctx: &WhisperContext, samples: &[f32], language: &str) -> Result<String> {
    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_language(Some(language));
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);
    params.set_translate(false);

    let mut state = ctx.create_state()?;
    state.full(params, samples)?;

    let num_segments = state.full_n_segments()?;
    let mut text = String::new();

    for i in 0..num_segments {
        if let Ok(segment) = state.full_get_segment_text(i) {
            text.push_str(&segment);
            text.push(' ');
        }
    }

    Ok(text.trim().to_string())
}

/// Decode 16-bit little-endian PCM into f32 samples.
fn pcm16_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / i16::MAX as f32)
        .collect()
}
