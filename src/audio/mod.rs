//! Audio subsystem used by the built-in voice engine

pub mod buffer;
pub mod capture;
pub mod device;
pub mod playout;

pub use buffer::{AudioFrame, JitterBuffer, RingBuffer, SharedRingBuffer};
pub use capture::AudioCapture;
pub use device::{default_input_device, default_output_device};
pub use playout::AudioPlayout;

/// Engine-internal processing rate; codec clock rates are converted to
/// and from this at the pipeline edges.
pub const ENGINE_SAMPLE_RATE: u32 = 48_000;
