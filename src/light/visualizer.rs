use crate::audio::detectors::{
    FEATURE_BASS, FEATURE_CLAP, FEATURE_LEVEL, FEATURE_SILENCE,
};
use crate::audio::features::FeatureSet;

use super::color::Color;
use super::state::LightingState;

/// A visualizer turns one cycle's features into a lighting state. The state
/// handed in is exclusively owned by the render cycle; implementations may
/// mutate it freely before it goes to `classify` and the encoder.
pub trait Visualizer: Send {
    fn render(&mut self, features: &FeatureSet, state: &mut LightingState);
}

/// Reference visualizer: bass drives the front panels through a slow color
/// wheel, overall level lights the rear, claps flash white, and a silent
/// room goes dark. Phase state is per-instance, never shared.
pub struct PulseVisualizer {
    phase: f32,
}

impl PulseVisualizer {
    pub fn new() -> Self {
        Self { phase: 0.0 }
    }
}

impl Default for PulseVisualizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Visualizer for PulseVisualizer {
    fn render(&mut self, features: &FeatureSet, state: &mut LightingState) {
        if features.flag(FEATURE_SILENCE) {
            state.black_out();
            return;
        }

        let bass = features.scalar(FEATURE_BASS);
        let clap = features.scalar(FEATURE_CLAP);
        let level = features.scalar(FEATURE_LEVEL);

        self.phase = (self.phase + 0.002 + bass * 0.01) % 1.0;
        let front = wheel(self.phase).scaled(bass);
        let rear = wheel((self.phase + 0.5) % 1.0).scaled(level * 0.6);

        state.front.fill(front);
        state.rear.fill(rear);
        state.white.fill(clap);
        state.uv.fill(bass * 0.5);
    }
}

/// Hue wheel position to full-saturation RGB.
fn wheel(h: f32) -> Color {
    let h = h.rem_euclid(1.0) * 6.0;
    let sector = h as u32 % 6;
    let f = h.fract();
    match sector {
        0 => Color::new(1.0, f, 0.0),
        1 => Color::new(1.0 - f, 1.0, 0.0),
        2 => Color::new(0.0, 1.0, f),
        3 => Color::new(0.0, 1.0 - f, 1.0),
        4 => Color::new(f, 0.0, 1.0),
        _ => Color::new(1.0, 0.0, 1.0 - f),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::state::ZoneTopology;

    fn features(bass: f32, clap: f32, level: f32, silence: bool) -> FeatureSet {
        let mut f = FeatureSet::new();
        f.put_scalar(FEATURE_BASS, bass);
        f.put_scalar(FEATURE_CLAP, clap);
        f.put_scalar(FEATURE_LEVEL, level);
        f.put_flag(FEATURE_SILENCE, silence);
        f
    }

    #[test]
    fn silence_blacks_out() {
        let mut vis = PulseVisualizer::new();
        let mut state = LightingState::new(ZoneTopology::default());
        state.white.fill(1.0);

        vis.render(&features(0.9, 0.9, 0.9, true), &mut state);
        assert!(state.front.iter().all(|c| c.is_black()));
        assert!(state.white.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn bass_lights_front() {
        let mut vis = PulseVisualizer::new();
        let mut state = LightingState::new(ZoneTopology::default());

        vis.render(&features(1.0, 0.0, 0.5, false), &mut state);
        assert!(state.front.iter().any(|c| !c.is_black()));
        assert!(state.uv.iter().all(|v| *v == 0.5));
    }

    #[test]
    fn phase_advances_per_instance() {
        let mut vis = PulseVisualizer::new();
        let mut state = LightingState::new(ZoneTopology::default());
        vis.render(&features(0.5, 0.0, 0.5, false), &mut state);
        let first = state.front[0];
        for _ in 0..50 {
            vis.render(&features(0.5, 0.0, 0.5, false), &mut state);
        }
        assert_ne!(state.front[0], first);
    }
}
