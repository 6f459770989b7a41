use crate::error::{Error, Result};

/// Fixed-capacity sample window with a write cursor. When the cursor reaches
/// capacity the window is "full": its contents are handed to the spectrum
/// engine and the cursor resets to zero.
pub struct RingWindow {
    samples: Vec<f32>,
    cursor: usize,
}

impl RingWindow {
    pub fn new(size: usize, start_cursor: usize) -> Self {
        Self {
            samples: vec![0.0; size],
            cursor: start_cursor,
        }
    }

    /// Push one sample. Returns true when the window just became full;
    /// the contents stay valid until the next push.
    pub fn push(&mut self, sample: f32) -> bool {
        self.samples[self.cursor] = sample;
        self.cursor += 1;
        if self.cursor == self.samples.len() {
            self.cursor = 0;
            true
        } else {
            false
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

/// Converts raw interleaved 16-bit little-endian PCM bytes into normalized
/// samples and feeds a set of overlapped ring windows.
///
/// `overlap` independent windows share the incoming samples with write
/// cursors offset by `buffer_size / overlap`, so spectral updates happen
/// `overlap` times per full window length without re-reading audio.
pub struct SampleIngestor {
    windows: Vec<RingWindow>,
    channels: usize,
    channel: usize,
    /// Carry-over for a partial interleaved frame split across feed() calls.
    pending: Vec<u8>,
}

impl SampleIngestor {
    pub fn new(buffer_size: usize, overlap: usize, channels: usize, channel: usize) -> Result<Self> {
        if !buffer_size.is_power_of_two() {
            return Err(Error::FftSizeNotPowerOfTwo(buffer_size));
        }
        if channel >= channels {
            return Err(Error::ChannelOutOfRange { channel, channels });
        }
        if overlap == 0 || buffer_size % overlap != 0 {
            return Err(Error::InvalidSetting {
                key: "overlap".into(),
                value: overlap.to_string(),
            });
        }

        let stride = buffer_size / overlap;
        let windows = (0..overlap)
            .map(|k| RingWindow::new(buffer_size, k * stride))
            .collect();

        Ok(Self {
            windows,
            channels,
            channel,
            pending: Vec::new(),
        })
    }

    /// Feed raw PCM bytes. Invokes `on_window` with the full sample buffer
    /// each time any of the overlapped windows completes.
    pub fn feed(&mut self, bytes: &[u8], mut on_window: impl FnMut(&[f32])) {
        let frame_bytes = self.channels * 2;

        self.pending.extend_from_slice(bytes);
        let usable = self.pending.len() - self.pending.len() % frame_bytes;

        for frame in self.pending[..usable].chunks_exact(frame_bytes) {
            let off = self.channel * 2;
            let raw = i16::from_le_bytes([frame[off], frame[off + 1]]);
            let sample = raw as f32 / 32768.0;

            for window in &mut self.windows {
                if window.push(sample) {
                    on_window(window.samples());
                }
            }
        }

        self.pending.drain(..usable);
    }
}
