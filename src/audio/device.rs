//! Default audio device lookup

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::StreamConfig;

use crate::audio::ENGINE_SAMPLE_RATE;
use crate::error::AudioError;

/// Default capture device of the default host.
pub fn default_input_device() -> Result<cpal::Device, AudioError> {
    cpal::default_host()
        .default_input_device()
        .ok_or_else(|| AudioError::DeviceNotFound("no default input device".to_string()))
}

/// Default render device of the default host.
pub fn default_output_device() -> Result<cpal::Device, AudioError> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| AudioError::DeviceNotFound("no default output device".to_string()))
}

/// Mono stream config at the engine rate.
pub fn mono_stream_config() -> StreamConfig {
    StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(ENGINE_SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    }
}

/// Names of all input devices, for display in the front end.
pub fn input_device_names() -> Vec<String> {
    let host = cpal::default_host();
    match host.input_devices() {
        Ok(devices) => devices.filter_map(|d| d.name().ok()).collect(),
        Err(_) => Vec::new(),
    }
}
