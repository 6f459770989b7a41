use std::sync::{Condvar, Mutex};

use crate::audio::detectors::FeatureDetector;
use crate::audio::features::FeatureSet;
use crate::audio::spectrum::Spectrum;
use crate::light::state::LightingState;
use crate::light::visualizer::Visualizer;
use crate::proto::encode::ProtocolEncoder;
use crate::proto::transport::Transport;

/// Single-slot latest-value-wins handoff between the audio producer and the
/// render consumer.
///
/// `publish` overwrites any not-yet-consumed spectrum and never blocks, so a
/// slow consumer (a stalled serial write, say) costs dropped lighting frames
/// instead of accumulating latency in the analysis path. `take` blocks until
/// a value arrives or the slot is closed.
pub struct SpectrumSlot {
    slot: Mutex<SlotState>,
    ready: Condvar,
}

struct SlotState {
    value: Option<Spectrum>,
    closed: bool,
}

impl SpectrumSlot {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(SlotState {
                value: None,
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    pub fn publish(&self, spectrum: Spectrum) {
        let mut state = self.slot.lock().unwrap();
        if state.value.replace(spectrum).is_some() {
            log::trace!("overwrote unconsumed spectrum");
        }
        drop(state);
        self.ready.notify_one();
    }

    /// Blocks for the most recently published spectrum; `None` once the slot
    /// is closed and drained.
    pub fn take(&self) -> Option<Spectrum> {
        let mut state = self.slot.lock().unwrap();
        loop {
            if let Some(spectrum) = state.value.take() {
                return Some(spectrum);
            }
            if state.closed {
                return None;
            }
            state = self.ready.wait(state).unwrap();
        }
    }

    /// Safe to call from any thread; wakes a blocked consumer.
    pub fn close(&self) {
        self.slot.lock().unwrap().closed = true;
        self.ready.notify_all();
    }
}

impl Default for SpectrumSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// The consumer half of the pipeline: detectors, visualizer, classifier,
/// encoder and transport, invoked once per taken spectrum.
pub struct RenderStage {
    pub detectors: Vec<Box<dyn FeatureDetector>>,
    pub visualizer: Box<dyn Visualizer>,
    pub encoder: ProtocolEncoder,
    pub transport: Box<dyn Transport>,
    pub state: LightingState,
    frames: u64,
    dropped: u64,
}

impl RenderStage {
    pub fn new(
        detectors: Vec<Box<dyn FeatureDetector>>,
        visualizer: Box<dyn Visualizer>,
        encoder: ProtocolEncoder,
        transport: Box<dyn Transport>,
        state: LightingState,
    ) -> Self {
        Self {
            detectors,
            visualizer,
            encoder,
            transport,
            state,
            frames: 0,
            dropped: 0,
        }
    }

    /// Run one full render cycle. Transport failures are logged and the
    /// frame dropped; the analysis side keeps running.
    pub fn render(&mut self, spectrum: &Spectrum) {
        let mut features = FeatureSet::new();
        for detector in self.detectors.iter_mut() {
            detector.compute(spectrum, &mut features);
        }

        self.visualizer.render(&features, &mut self.state);
        self.state.classify();

        let packets = self.encoder.encode(&self.state);
        self.frames += 1;

        if let Err(err) = self.transport.send(&packets) {
            self.dropped += 1;
            log::warn!("transport write failed, dropping frame: {}", err);
        }

        if self.frames % 1024 == 0 {
            log::debug!("{} frames rendered, {} dropped", self.frames, self.dropped);
        }
    }

    /// Consume spectra until the slot closes.
    pub fn run(&mut self, slot: &SpectrumSlot) {
        while let Some(spectrum) = slot.take() {
            self.render(&spectrum);
        }
        log::info!(
            "render stage finished: {} frames, {} dropped on transport",
            self.frames,
            self.dropped
        );
    }
}
