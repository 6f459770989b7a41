use crate::error::{Error, Result};

use super::features::FeatureSet;
use super::spectrum::Spectrum;

/// Published feature names. Detectors write these once per cycle; visualizers
/// and downstream detectors read them back by name.
pub const FEATURE_BASS: &str = "bass";
pub const FEATURE_BASS_DELTA: &str = "bass_delta";
pub const FEATURE_CLAP: &str = "clap";
pub const FEATURE_LEVEL: &str = "level";
pub const FEATURE_SILENCE: &str = "silence";
pub const FEATURE_BEAT: &str = "beat";
pub const FEATURE_BEAT_DELTA: &str = "beat_delta";

/// A stateful transform from spectra to named features.
///
/// `init` fixes the time constants for the configured update rate and must be
/// called before the first `compute`. Detectors own private mutable state and
/// are invoked strictly sequentially, one instance per logical signal; they
/// may read features published earlier in the same cycle but never another
/// detector's internals.
pub trait FeatureDetector: Send {
    fn init(&mut self, fft_size: usize, sample_rate: f32, updates_per_second: f32) -> Result<()>;

    /// Names this detector publishes every cycle.
    fn provides(&self) -> Vec<&'static str>;

    /// Names this detector reads back; each must be published by a detector
    /// that runs earlier in the bank.
    fn requires(&self) -> &[&'static str] {
        &[]
    }

    fn compute(&mut self, spectrum: &Spectrum, features: &mut FeatureSet);
}

/// Initialize a bank in publication order, verifying that everything a
/// detector reads is published before it runs. A misordered or incomplete
/// bank fails here, at configuration time, instead of panicking on the
/// audio thread once the first spectrum arrives.
pub fn init_detectors(
    detectors: &mut [Box<dyn FeatureDetector>],
    fft_size: usize,
    sample_rate: f32,
    updates_per_second: f32,
) -> Result<()> {
    let mut published: Vec<&'static str> = Vec::new();
    for detector in detectors.iter_mut() {
        for &name in detector.requires() {
            if !published.contains(&name) {
                return Err(Error::MissingDependency(name));
            }
        }
        detector.init(fft_size, sample_rate, updates_per_second)?;
        published.extend(detector.provides());
    }
    Ok(())
}

/// Decay factor for an EWMA with the given half-life in seconds.
fn half_life_phi(half_life: f32, updates_per_second: f32) -> f32 {
    0.5f32.powf(1.0 / (half_life * updates_per_second))
}

/// Map a frequency range onto spectrum bin indices:
/// `floor(freq / max_observed * N)` at both ends.
fn band_indices(
    min_hz: f32,
    max_hz: f32,
    fft_size: usize,
    sample_rate: f32,
) -> Result<(usize, usize)> {
    let max_observed = (fft_size - 1) as f32 * sample_rate / fft_size as f32;
    let lo = (min_hz / max_observed * fft_size as f32).floor() as usize;
    let hi = ((max_hz / max_observed * fft_size as f32).floor() as usize).min(fft_size);
    if lo >= hi {
        return Err(Error::EmptyBand { min_hz, max_hz });
    }
    Ok((lo, hi))
}

fn band_mean(spectrum: &Spectrum, lo: usize, hi: usize) -> f32 {
    spectrum.magnitudes[lo..hi].iter().sum::<f32>() / (hi - lo) as f32
}

/// Generic band-energy envelope follower: one adaptive threshold detector
/// parameterized by frequency range, half-life, margin and decay rate.
///
/// Tracks an EWMA of the band level and of its absolute deviation; a level
/// above `avg + spread + margin` drives a normalized output in [0, 1] whose
/// fall is clamped to `decay_rate` per update (attack fast, decay slow).
pub struct BandEnergyDetector {
    name: &'static str,
    delta_name: Option<&'static str>,
    min_hz: f32,
    max_hz: f32,
    half_life: f32,
    margin: f32,
    decay_rate: f32,

    lo: usize,
    hi: usize,
    phi: f32,
    avg: f32,
    spread: f32,
    out: f32,
    recent: [f32; RECENT_LEVELS],
    recent_at: usize,
}

const RECENT_LEVELS: usize = 16;

impl BandEnergyDetector {
    pub fn new(
        name: &'static str,
        delta_name: Option<&'static str>,
        min_hz: f32,
        max_hz: f32,
        half_life: f32,
        margin: f32,
        decay_rate: f32,
    ) -> Self {
        Self {
            name,
            delta_name,
            min_hz,
            max_hz,
            half_life,
            margin,
            decay_rate,
            lo: 0,
            hi: 0,
            phi: 0.0,
            avg: 0.0,
            spread: 0.0,
            out: 0.0,
            recent: [0.0; RECENT_LEVELS],
            recent_at: 0,
        }
    }
}

/// The stock bass detector: low band, slow average, flicker-free decay.
pub fn bass_finder() -> BandEnergyDetector {
    BandEnergyDetector::new(
        FEATURE_BASS,
        Some(FEATURE_BASS_DELTA),
        20.0,
        250.0,
        2.0,
        0.01,
        0.08,
    )
}

impl FeatureDetector for BandEnergyDetector {
    fn init(&mut self, fft_size: usize, sample_rate: f32, updates_per_second: f32) -> Result<()> {
        let (lo, hi) = band_indices(self.min_hz, self.max_hz, fft_size, sample_rate)?;
        self.lo = lo;
        self.hi = hi;
        self.phi = half_life_phi(self.half_life, updates_per_second);
        Ok(())
    }

    fn provides(&self) -> Vec<&'static str> {
        let mut names = vec![self.name];
        names.extend(self.delta_name);
        names
    }

    fn compute(&mut self, spectrum: &Spectrum, features: &mut FeatureSet) {
        let level = band_mean(spectrum, self.lo, self.hi);

        let threshold = self.avg + self.spread + self.margin;
        let target = if level > threshold {
            ((level - threshold) / threshold.max(1e-6)).min(1.0)
        } else {
            0.0
        };
        self.out = target.max(self.out - self.decay_rate).clamp(0.0, 1.0);

        self.avg = self.avg * self.phi + level * (1.0 - self.phi);
        self.spread = self.spread * self.phi + (level - self.avg).abs() * (1.0 - self.phi);

        let oldest = self.recent[self.recent_at];
        self.recent[self.recent_at] = level;
        self.recent_at = (self.recent_at + 1) % RECENT_LEVELS;

        features.put_scalar(self.name, self.out);
        if let Some(delta_name) = self.delta_name {
            features.put_scalar(delta_name, (level - oldest).max(0.0));
        }
    }
}

/// Transient detector: counts high-band bins whose instantaneous magnitude
/// exceeds sqrt(2) times their own running average, then low-passes the
/// in-excess fraction so single-frame spikes do not reach the output.
pub struct ClapFinder {
    min_hz: f32,
    max_hz: f32,
    lo: usize,
    hi: usize,
    bin_avg: Vec<f32>,
    phi: f32,
    smooth_phi: f32,
    smoothed: f32,
    /// Empirical ceiling on the in-excess fraction; a genuine clap lights up
    /// roughly this share of the band.
    ceiling: f32,
}

impl ClapFinder {
    pub fn new() -> Self {
        Self {
            min_hz: 2000.0,
            max_hz: 8000.0,
            lo: 0,
            hi: 0,
            bin_avg: Vec::new(),
            phi: 0.0,
            smooth_phi: 0.0,
            smoothed: 0.0,
            ceiling: 0.4,
        }
    }
}

impl Default for ClapFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureDetector for ClapFinder {
    fn init(&mut self, fft_size: usize, sample_rate: f32, updates_per_second: f32) -> Result<()> {
        let (lo, hi) = band_indices(self.min_hz, self.max_hz, fft_size, sample_rate)?;
        self.lo = lo;
        self.hi = hi;
        self.bin_avg = vec![0.0; hi - lo];
        self.phi = half_life_phi(1.0, updates_per_second);
        self.smooth_phi = half_life_phi(0.05, updates_per_second);
        Ok(())
    }

    fn provides(&self) -> Vec<&'static str> {
        vec![FEATURE_CLAP]
    }

    fn compute(&mut self, spectrum: &Spectrum, features: &mut FeatureSet) {
        let mut in_excess = 0usize;
        for (avg, &mag) in self
            .bin_avg
            .iter_mut()
            .zip(&spectrum.magnitudes[self.lo..self.hi])
        {
            if *avg > 1e-6 && mag > std::f32::consts::SQRT_2 * *avg {
                in_excess += 1;
            }
            *avg = *avg * self.phi + mag * (1.0 - self.phi);
        }

        let fraction = in_excess as f32 / self.bin_avg.len() as f32;
        let raw = (fraction / self.ceiling).min(1.0);
        self.smoothed = self.smoothed * self.smooth_phi + raw * (1.0 - self.smooth_phi);

        features.put_scalar(FEATURE_CLAP, self.smoothed);
    }
}

/// Overall loudness proxy: mean of `ln(1 + magnitude)` across all bins,
/// smoothed by a fast EWMA and normalized by an empirical constant.
pub struct LevelMeter {
    phi: f32,
    avg: f32,
    norm: f32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self {
            phi: 0.0,
            avg: 0.0,
            norm: 4.0,
        }
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureDetector for LevelMeter {
    fn init(&mut self, _fft_size: usize, _sample_rate: f32, updates_per_second: f32) -> Result<()> {
        self.phi = half_life_phi(0.1, updates_per_second);
        Ok(())
    }

    fn provides(&self) -> Vec<&'static str> {
        vec![FEATURE_LEVEL]
    }

    fn compute(&mut self, spectrum: &Spectrum, features: &mut FeatureSet) {
        let mean_log = spectrum
            .magnitudes
            .iter()
            .map(|&m| (1.0 + m).ln())
            .sum::<f32>()
            / spectrum.len() as f32;

        self.avg = self.avg * self.phi + mean_log * (1.0 - self.phi);
        features.put_scalar(FEATURE_LEVEL, (self.avg / self.norm).min(1.0));
    }
}

/// Debounced silence detector over the published level feature.
///
/// Counts consecutive sub-threshold updates and reports silent only once the
/// counter reaches the wait period; a single loud update resets it.
pub struct SilenceFinder {
    epsilon: f32,
    wait_seconds: f32,
    wait_updates: u32,
    quiet_updates: u32,
}

impl SilenceFinder {
    pub fn new(epsilon: f32, wait_seconds: f32) -> Self {
        Self {
            epsilon,
            wait_seconds,
            wait_updates: 0,
            quiet_updates: 0,
        }
    }
}

impl Default for SilenceFinder {
    fn default() -> Self {
        Self::new(1e-3, 5.0)
    }
}

impl FeatureDetector for SilenceFinder {
    fn init(&mut self, _fft_size: usize, _sample_rate: f32, updates_per_second: f32) -> Result<()> {
        self.wait_updates = (self.wait_seconds * updates_per_second).round().max(1.0) as u32;
        Ok(())
    }

    fn provides(&self) -> Vec<&'static str> {
        vec![FEATURE_SILENCE]
    }

    fn requires(&self) -> &[&'static str] {
        &[FEATURE_LEVEL]
    }

    fn compute(&mut self, _spectrum: &Spectrum, features: &mut FeatureSet) {
        if features.scalar(FEATURE_LEVEL) < self.epsilon {
            self.quiet_updates = self.quiet_updates.saturating_add(1);
        } else {
            self.quiet_updates = 0;
        }
        features.put_flag(FEATURE_SILENCE, self.quiet_updates >= self.wait_updates);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum BassState {
    Low,
    High,
}

/// Inter-beat interval sampler over the published bass feature.
///
/// Counts updates while bass sits at zero; the moment bass rises above zero
/// the elapsed count is captured and stays frozen until bass falls back to
/// zero and the cycle restarts. The edge itself is exposed as a flag so a
/// tempo estimator sees exactly one sample per beat.
pub struct RhythmMeter {
    state: BassState,
    updates_since_low: u32,
    frozen_delta: f32,
}

impl RhythmMeter {
    pub fn new() -> Self {
        Self {
            state: BassState::Low,
            updates_since_low: 0,
            frozen_delta: 0.0,
        }
    }
}

impl Default for RhythmMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureDetector for RhythmMeter {
    fn init(&mut self, _fft_size: usize, _sample_rate: f32, _updates_per_second: f32) -> Result<()> {
        Ok(())
    }

    fn provides(&self) -> Vec<&'static str> {
        vec![FEATURE_BEAT, FEATURE_BEAT_DELTA]
    }

    fn requires(&self) -> &[&'static str] {
        &[FEATURE_BASS]
    }

    fn compute(&mut self, _spectrum: &Spectrum, features: &mut FeatureSet) {
        let bass = features.scalar(FEATURE_BASS);
        let mut edge = false;

        match self.state {
            BassState::Low => {
                self.updates_since_low += 1;
                if bass > 0.0 {
                    self.frozen_delta = self.updates_since_low as f32;
                    self.state = BassState::High;
                    edge = true;
                }
            }
            BassState::High => {
                if bass <= 0.0 {
                    // This update is already spent in the low state.
                    self.state = BassState::Low;
                    self.updates_since_low = 1;
                }
            }
        }

        features.put_flag(FEATURE_BEAT, edge);
        features.put_scalar(FEATURE_BEAT_DELTA, self.frozen_delta);
    }
}

/// Build the stock detector bank in publication order. SilenceFinder and
/// RhythmMeter read features published earlier in the same cycle, so the
/// order here is load-bearing.
pub fn default_detectors() -> Vec<Box<dyn FeatureDetector>> {
    vec![
        Box::new(bass_finder()),
        Box::new(ClapFinder::new()),
        Box::new(LevelMeter::new()),
        Box::new(SilenceFinder::default()),
        Box::new(RhythmMeter::new()),
    ]
}
