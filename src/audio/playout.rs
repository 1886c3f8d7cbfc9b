//! Speaker playout
//!
//! Mirrors the capture thread layout: a dedicated thread owns the cpal
//! output stream, and the stream callback drains in-order frames from
//! the shared jitter buffer, zero-filling on underrun.

use cpal::traits::{DeviceTrait, StreamTrait};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::buffer::JitterBuffer;
use crate::audio::device::{default_output_device, mono_stream_config};
use crate::error::AudioError;

/// Playout instance for the default output device
pub struct AudioPlayout {
    running: Arc<AtomicBool>,
    jitter: Arc<Mutex<JitterBuffer>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl AudioPlayout {
    pub fn new(jitter: Arc<Mutex<JitterBuffer>>) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            jitter,
            thread_handle: None,
        }
    }

    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let device = default_output_device()?;

        let running = self.running.clone();
        let running_for_loop = self.running.clone();
        let jitter = self.jitter.clone();
        let config = mono_stream_config();

        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("voice-playout".to_string())
            .spawn(move || {
                // Samples left over from a partially consumed frame
                let mut leftover: VecDeque<f32> = VecDeque::new();

                let stream = device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        for sample in data.iter_mut() {
                            if leftover.is_empty() {
                                if let Some(frame) = jitter.lock().get_next() {
                                    leftover.extend(frame.samples);
                                }
                            }
                            // Zero-fill on underrun
                            *sample = leftover.pop_front().unwrap_or(0.0);
                        }
                    },
                    move |err| {
                        tracing::error!("playout stream error: {}", err);
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            tracing::error!("failed to start playout stream: {}", e);
                            return;
                        }
                        while running_for_loop.load(Ordering::Relaxed) {
                            thread::sleep(Duration::from_millis(10));
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to build playout stream: {}", e);
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
}

impl Drop for AudioPlayout {
    fn drop(&mut self) {
        self.stop();
    }
}
