use thiserror::Error;

/// Errors raised by the analysis and output pipeline.
///
/// Configuration variants indicate caller contract violations and are fatal
/// at startup; `Transport` and `Serial` are runtime conditions the pipeline
/// survives by dropping the affected frame.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported audio format: {0} (only 16-bit little-endian PCM is accepted)")]
    UnsupportedFormat(String),

    #[error("FFT size {0} is not a power of two")]
    FftSizeNotPowerOfTwo(usize),

    #[error("transform called with {got} samples, expected {expected}")]
    WindowLength { expected: usize, got: usize },

    #[error("frequency band {min_hz}-{max_hz} Hz maps to an empty bin range")]
    EmptyBand { min_hz: f32, max_hz: f32 },

    #[error("channel index {channel} out of range for {channels}-channel input")]
    ChannelOutOfRange { channel: usize, channels: usize },

    #[error("feature '{0}' is read before any detector publishes it")]
    MissingDependency(&'static str),

    #[error("invalid setting {key} = {value}")]
    InvalidSetting { key: String, value: String },

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("transport write failed: {0}")]
    Transport(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
