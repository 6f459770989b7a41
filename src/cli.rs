use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lumen", about = "Live audio-reactive lighting controller")]
pub struct Cli {
    /// Serial port the lighting hardware is attached to (omit for a dry run)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Serial baud rate
    #[arg(short, long, default_value_t = 115_200)]
    pub baud: u32,

    /// Protocol revision: 8 (legacy boards, sync 0xAA) or 16 (sync 0xFF)
    #[arg(long, default_value_t = 16)]
    pub revision: u8,

    /// Settings file (KEY = VALUE lines)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// PCM sample format of the input stream
    #[arg(long, default_value = "s16le")]
    pub format: String,

    /// Input sample rate in Hz
    #[arg(long, default_value_t = 44100)]
    pub sample_rate: u32,

    /// Channel count of the interleaved input
    #[arg(long, default_value_t = 2)]
    pub channels: usize,

    /// Which channel to analyze
    #[arg(long, default_value_t = 0)]
    pub channel: usize,

    /// FFT window size (power of two)
    #[arg(long, default_value_t = 1024)]
    pub buffer_size: usize,

    /// Number of overlapped analysis windows
    #[arg(long, default_value_t = 2)]
    pub overlap: usize,

    /// Master output volume (0.0-1.0)
    #[arg(long, default_value_t = 1.0)]
    pub volume: f32,

    /// Front zone volume multiplier
    #[arg(long, default_value_t = 1.0)]
    pub front_volume: f32,

    /// Rear zone volume multiplier
    #[arg(long, default_value_t = 1.0)]
    pub rear_volume: f32,

    /// Strobe/UV zone volume multiplier
    #[arg(long, default_value_t = 1.0)]
    pub strobe_volume: f32,

    /// List available serial ports and exit
    #[arg(long)]
    pub list_ports: bool,
}
