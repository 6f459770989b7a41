use std::io::Write;
use std::time::Duration;

use serialport::{DataBits, Parity, SerialPort, StopBits};

use crate::error::{Error, Result};

/// Byte sink for encoded packets. Writes are whole-packet and flushed before
/// returning; a failed write reports the error and the caller drops the
/// frame rather than retrying.
pub trait Transport: Send {
    fn send(&mut self, packets: &[Vec<u8>]) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct SerialConfig {
    pub port: String,
    pub baud: u32,
    pub data_bits: u8,
    pub parity: String,
    pub stop_bits: u8,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud: 115_200,
            data_bits: 8,
            parity: "none".into(),
            stop_bits: 1,
        }
    }
}

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let data_bits = match config.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            8 => DataBits::Eight,
            other => {
                return Err(Error::InvalidSetting {
                    key: "data_bits".into(),
                    value: other.to_string(),
                })
            }
        };
        let parity = match config.parity.to_ascii_lowercase().as_str() {
            "none" => Parity::None,
            "even" => Parity::Even,
            "odd" => Parity::Odd,
            other => {
                return Err(Error::InvalidSetting {
                    key: "parity".into(),
                    value: other.to_string(),
                })
            }
        };
        let stop_bits = match config.stop_bits {
            1 => StopBits::One,
            2 => StopBits::Two,
            other => {
                return Err(Error::InvalidSetting {
                    key: "stop_bits".into(),
                    value: other.to_string(),
                })
            }
        };

        let port = serialport::new(&config.port, config.baud)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(Duration::from_millis(250))
            .open()?;

        log::info!(
            "Opened serial port {} at {} baud ({}{}{})",
            config.port,
            config.baud,
            config.data_bits,
            config.parity.chars().next().unwrap_or('n').to_ascii_uppercase(),
            config.stop_bits
        );

        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn send(&mut self, packets: &[Vec<u8>]) -> Result<()> {
        for packet in packets {
            self.port.write_all(packet)?;
        }
        self.port.flush()?;
        Ok(())
    }
}

/// Discards packets; used for dry runs without hardware attached.
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&mut self, packets: &[Vec<u8>]) -> Result<()> {
        log::debug!(
            "dropping {} packets ({} bytes) on null transport",
            packets.len(),
            packets.iter().map(Vec::len).sum::<usize>()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory transport used by pipeline tests.
    pub struct MemoryTransport {
        pub frames: Vec<Vec<Vec<u8>>>,
    }

    impl Transport for MemoryTransport {
        fn send(&mut self, packets: &[Vec<u8>]) -> Result<()> {
            self.frames.push(packets.to_vec());
            Ok(())
        }
    }

    #[test]
    fn rejects_unsupported_line_settings() {
        let mut config = SerialConfig {
            port: "/dev/null".into(),
            ..Default::default()
        };
        config.data_bits = 9;
        assert!(SerialTransport::open(&config).is_err());

        let mut config = SerialConfig::default();
        config.parity = "mark".into();
        assert!(SerialTransport::open(&config).is_err());

        let mut config = SerialConfig::default();
        config.stop_bits = 3;
        assert!(SerialTransport::open(&config).is_err());
    }

    #[test]
    fn memory_transport_records_whole_frames() {
        let mut t = MemoryTransport { frames: Vec::new() };
        t.send(&[vec![0xFF, 253], vec![0xFF, 246, 0, 0]]).unwrap();
        assert_eq!(t.frames.len(), 1);
        assert_eq!(t.frames[0].len(), 2);
    }
}
