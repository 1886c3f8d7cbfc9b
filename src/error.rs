//! Error types for the voice-call client

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio subsystem errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),
}

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encoder initialization failed: {0}")]
    EncoderInit(String),

    #[error("Decoder initialization failed: {0}")]
    DecoderInit(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Invalid frame size: {0}")]
    InvalidFrameSize(usize),

    #[error("Unknown codec: {0}")]
    UnknownCodec(String),
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed: {0}")]
    BindFailed(String),

    #[error("Invalid packet format")]
    InvalidPacket,

    #[error("Invalid RTP port: {0}")]
    InvalidPort(u16),
}

/// Voice engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Channel not found: {0}")]
    ChannelNotFound(u32),

    #[error("No send codec configured")]
    NoSendCodec,

    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
