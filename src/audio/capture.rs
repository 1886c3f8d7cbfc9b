//! Microphone capture
//!
//! A dedicated thread owns the cpal input stream; the stream callback
//! pushes frames into an SPSC ring buffer drained by the engine's
//! encode worker.

use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::buffer::{AudioFrame, SharedRingBuffer};
use crate::audio::device::{default_input_device, mono_stream_config};
use crate::error::AudioError;

/// Capture instance for the default input device
pub struct AudioCapture {
    running: Arc<AtomicBool>,
    output_buffer: SharedRingBuffer,
    thread_handle: Option<JoinHandle<()>>,
    error_rx: Option<Receiver<AudioError>>,
    sequence: Arc<AtomicU16>,
}

impl AudioCapture {
    pub fn new(output_buffer: SharedRingBuffer) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            output_buffer,
            thread_handle: None,
            error_rx: None,
            sequence: Arc::new(AtomicU16::new(0)),
        }
    }

    /// Open the default input device and start capturing. Fails if the
    /// device is missing or the stream cannot be built.
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        // Resolve the device up front so a missing device fails the
        // start call instead of dying silently inside the thread.
        let device = default_input_device()?;

        let (error_tx, error_rx) = bounded::<AudioError>(16);
        self.error_rx = Some(error_rx);
        self.sequence.store(0, Ordering::SeqCst);

        let running = self.running.clone();
        let running_for_loop = self.running.clone();
        let output_buffer = self.output_buffer.clone();
        let sequence = self.sequence.clone();
        let config = mono_stream_config();

        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("voice-capture".to_string())
            .spawn(move || {
                let stream = device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if !running.load(Ordering::Relaxed) {
                            return;
                        }
                        let seq = sequence.fetch_add(1, Ordering::Relaxed);
                        let _ = output_buffer.push(AudioFrame::new(data.to_vec(), seq));
                    },
                    move |err| {
                        let _ = error_tx.try_send(AudioError::StreamError(err.to_string()));
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            tracing::error!("failed to start capture stream: {}", e);
                            return;
                        }
                        while running_for_loop.load(Ordering::Relaxed) {
                            thread::sleep(Duration::from_millis(10));
                        }
                        // Stream is dropped here, stopping capture
                    }
                    Err(e) => {
                        tracing::error!("failed to build capture stream: {}", e);
                    }
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn check_errors(&self) -> Option<AudioError> {
        self.error_rx.as_ref().and_then(|rx| rx.try_recv().ok())
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
