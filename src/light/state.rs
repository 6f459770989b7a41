use super::color::{Color, BLACK};

/// Fixed zone layout shared between the encoder and the hardware firmware.
/// These are configuration, not derived state; the defaults match the stock
/// board layout and can be overridden from the settings file, but encoder
/// and firmware must agree on them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoneTopology {
    pub leds_per_panel: usize,
    pub front_panels: usize,
    pub rear_panels: usize,
    pub uv_white_panels: usize,
    /// Address of rear panel 0 on the wire; front panel 0 is address 0.
    pub rear_address_offset: u8,
    /// Address of UV/white board 0 on the wire.
    pub uv_white_address_offset: u8,
}

impl Default for ZoneTopology {
    fn default() -> Self {
        Self {
            leds_per_panel: 4,
            front_panels: 4,
            rear_panels: 4,
            uv_white_panels: 4,
            rear_address_offset: 16,
            uv_white_address_offset: 32,
        }
    }
}

impl ZoneTopology {
    pub fn front_lights(&self) -> usize {
        self.front_panels * self.leds_per_panel
    }

    pub fn rear_lights(&self) -> usize {
        self.rear_panels * self.leds_per_panel
    }
}

/// Whole-state classification. Emergency and the strobes are asserted
/// explicitly; AllOff is inferred by `classify` when everything else is
/// maximally compressed and black.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverallClass {
    #[default]
    None,
    EmergencyLighting,
    AllOff,
    WhiteStrobe,
    UvStrobe,
}

/// Per-zone RGB compression. PanelsSame is reported whenever all panels are
/// pairwise identical even if LEDs inside a panel differ; LedsSame is
/// strictly stronger and implies PanelsSame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RgbClass {
    #[default]
    Diff,
    PanelsSame,
    LedsSame,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UvWhiteClass {
    #[default]
    Diff,
    Same,
}

/// Per-frame lighting output: every addressable channel value plus the four
/// compression classifications the protocol encoder dispatches on.
#[derive(Clone, Debug, PartialEq)]
pub struct LightingState {
    pub topology: ZoneTopology,
    pub front: Vec<Color>,
    pub rear: Vec<Color>,
    pub white: Vec<f32>,
    pub uv: Vec<f32>,
    pub overall: OverallClass,
    pub front_class: RgbClass,
    pub rear_class: RgbClass,
    pub uv_white_class: UvWhiteClass,
}

impl LightingState {
    pub fn new(topology: ZoneTopology) -> Self {
        Self {
            topology,
            front: vec![BLACK; topology.front_lights()],
            rear: vec![BLACK; topology.rear_lights()],
            white: vec![0.0; topology.uv_white_panels],
            uv: vec![0.0; topology.uv_white_panels],
            overall: OverallClass::None,
            front_class: RgbClass::Diff,
            rear_class: RgbClass::Diff,
            uv_white_class: UvWhiteClass::Diff,
        }
    }

    pub fn set_all(&mut self, color: Color) {
        self.front.fill(color);
        self.rear.fill(color);
    }

    pub fn black_out(&mut self) {
        self.front.fill(BLACK);
        self.rear.fill(BLACK);
        self.white.fill(0.0);
        self.uv.fill(0.0);
    }

    /// Assert emergency lighting. Color values are left alone; the firmware
    /// drives its own emergency pattern.
    pub fn set_emergency(&mut self) {
        self.overall = OverallClass::EmergencyLighting;
    }

    /// Assert the white strobe; non-strobed channels go dark.
    pub fn set_white_strobe(&mut self) {
        self.black_out();
        self.overall = OverallClass::WhiteStrobe;
    }

    /// Assert the UV strobe; non-strobed channels go dark.
    pub fn set_uv_strobe(&mut self) {
        self.black_out();
        self.overall = OverallClass::UvStrobe;
    }

    /// Classify the state for packet selection. Pure with respect to color
    /// values; evaluation order is front, rear, UV/white, then overall, since
    /// AllOff can only be asserted once the other three are known.
    pub fn classify(&mut self) {
        self.front_class = classify_rgb(&self.front, self.topology.leds_per_panel);
        self.rear_class = classify_rgb(&self.rear, self.topology.leds_per_panel);

        let uv_same = self.uv.windows(2).all(|w| w[0] == w[1]);
        let white_same = self.white.windows(2).all(|w| w[0] == w[1]);
        self.uv_white_class = if uv_same && white_same {
            UvWhiteClass::Same
        } else {
            UvWhiteClass::Diff
        };

        match self.overall {
            OverallClass::EmergencyLighting | OverallClass::WhiteStrobe | OverallClass::UvStrobe => {}
            OverallClass::None | OverallClass::AllOff => {
                let compressed = self.front_class == RgbClass::LedsSame
                    && self.rear_class == RgbClass::LedsSame
                    && self.uv_white_class == UvWhiteClass::Same;
                let dark = self.front.first().map_or(true, Color::is_black)
                    && self.rear.first().map_or(true, Color::is_black)
                    && self.uv.first().map_or(true, |v| *v == 0.0)
                    && self.white.first().map_or(true, |v| *v == 0.0);
                self.overall = if compressed && dark {
                    OverallClass::AllOff
                } else {
                    OverallClass::None
                };
            }
        }
    }

    /// Crossfade between two states. Alphas at the extremes short-circuit to
    /// exact copies so repeated crossfades do not accumulate float noise.
    pub fn mix(a: &LightingState, b: &LightingState, alpha: f32) -> LightingState {
        if alpha <= 0.01 {
            return a.clone();
        }
        if alpha >= 0.99 {
            return b.clone();
        }

        let mut out = LightingState::new(a.topology);
        for (i, slot) in out.front.iter_mut().enumerate() {
            *slot = Color::mix(a.front[i], b.front[i], alpha);
        }
        for (i, slot) in out.rear.iter_mut().enumerate() {
            *slot = Color::mix(a.rear[i], b.rear[i], alpha);
        }
        for (i, slot) in out.white.iter_mut().enumerate() {
            *slot = a.white[i] + (b.white[i] - a.white[i]) * alpha;
        }
        for (i, slot) in out.uv.iter_mut().enumerate() {
            *slot = a.uv[i] + (b.uv[i] - a.uv[i]) * alpha;
        }
        out
    }
}

fn classify_rgb(lights: &[Color], leds_per_panel: usize) -> RgbClass {
    if lights.is_empty() {
        return RgbClass::LedsSame;
    }

    let first_panel = &lights[..leds_per_panel.min(lights.len())];
    let panels_same = lights
        .chunks(leds_per_panel)
        .all(|panel| panel == first_panel);
    if !panels_same {
        return RgbClass::Diff;
    }

    // Panels match; only if the LEDs inside a panel also agree is the
    // stronger class reported.
    if first_panel.iter().all(|c| *c == first_panel[0]) {
        RgbClass::LedsSame
    } else {
        RgbClass::PanelsSame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> LightingState {
        LightingState::new(ZoneTopology::default())
    }

    #[test]
    fn fresh_state_classifies_all_off() {
        let mut s = state();
        s.classify();
        assert_eq!(s.front_class, RgbClass::LedsSame);
        assert_eq!(s.rear_class, RgbClass::LedsSame);
        assert_eq!(s.uv_white_class, UvWhiteClass::Same);
        assert_eq!(s.overall, OverallClass::AllOff);
    }

    #[test]
    fn uniform_color_is_leds_same_but_not_all_off() {
        let mut s = state();
        s.set_all(Color::new(0.5, 0.2, 0.1));
        s.classify();
        assert_eq!(s.front_class, RgbClass::LedsSame);
        assert_eq!(s.overall, OverallClass::None);
    }

    #[test]
    fn repeating_panels_are_panels_same() {
        let mut s = state();
        let leds = s.topology.leds_per_panel;
        for (i, c) in s.front.iter_mut().enumerate() {
            *c = Color::new((i % leds) as f32 * 0.1, 0.0, 0.0);
        }
        s.classify();
        assert_eq!(s.front_class, RgbClass::PanelsSame);
    }

    #[test]
    fn one_divergent_led_downgrades_to_diff() {
        let mut s = state();
        s.set_all(Color::new(0.4, 0.4, 0.4));
        s.front[2] = Color::new(0.4, 0.4, 0.5);
        s.classify();
        assert_eq!(s.front_class, RgbClass::Diff);
        // The untouched rear zone keeps its own classification.
        assert_eq!(s.rear_class, RgbClass::LedsSame);
    }

    #[test]
    fn divergent_led_mirrored_in_every_panel_is_panels_same() {
        let mut s = state();
        s.set_all(Color::new(0.4, 0.4, 0.4));
        let leds = s.topology.leds_per_panel;
        for p in 0..s.topology.front_panels {
            s.front[p * leds] = Color::new(0.9, 0.0, 0.0);
        }
        s.classify();
        assert_eq!(s.front_class, RgbClass::PanelsSame);
    }

    #[test]
    fn uv_white_same_requires_both_channels_uniform() {
        let mut s = state();
        s.white.fill(0.3);
        s.uv.fill(0.7);
        s.classify();
        assert_eq!(s.uv_white_class, UvWhiteClass::Same);

        s.uv[1] = 0.6;
        s.classify();
        assert_eq!(s.uv_white_class, UvWhiteClass::Diff);
    }

    #[test]
    fn classify_is_idempotent() {
        let mut s = state();
        s.set_all(Color::new(0.2, 0.3, 0.4));
        s.front[0] = Color::new(1.0, 0.0, 0.0);
        s.white[2] = 0.5;
        s.classify();
        let first = s.clone();
        s.classify();
        assert_eq!(s, first);
    }

    #[test]
    fn strobe_and_emergency_survive_classify() {
        let mut s = state();
        s.set_white_strobe();
        s.classify();
        assert_eq!(s.overall, OverallClass::WhiteStrobe);

        let mut s = state();
        s.set_emergency();
        s.classify();
        assert_eq!(s.overall, OverallClass::EmergencyLighting);
    }

    #[test]
    fn all_off_recovers_to_none_when_lit() {
        let mut s = state();
        s.classify();
        assert_eq!(s.overall, OverallClass::AllOff);

        s.front[0] = Color::new(0.1, 0.0, 0.0);
        s.classify();
        assert_eq!(s.overall, OverallClass::None);
    }

    #[test]
    fn mix_endpoints_are_structural_copies() {
        let mut a = state();
        a.set_all(Color::new(0.1, 0.2, 0.3));
        a.white.fill(0.5);
        a.classify();
        let mut b = state();
        b.set_all(Color::new(0.9, 0.8, 0.7));
        b.classify();

        assert_eq!(LightingState::mix(&a, &b, 0.0), a);
        assert_eq!(LightingState::mix(&a, &b, 0.005), a);
        assert_eq!(LightingState::mix(&a, &b, 1.0), b);
        assert_eq!(LightingState::mix(&a, &b, 0.995), b);
    }

    #[test]
    fn mix_interior_is_strictly_between() {
        let mut a = state();
        a.set_all(Color::new(0.2, 0.2, 0.2));
        a.uv.fill(0.1);
        let mut b = state();
        b.set_all(Color::new(0.8, 0.8, 0.8));
        b.uv.fill(0.9);

        let m = LightingState::mix(&a, &b, 0.5);
        for (i, c) in m.front.iter().enumerate() {
            assert!(c.r > a.front[i].r && c.r < b.front[i].r);
        }
        for (i, v) in m.uv.iter().enumerate() {
            assert!(*v > a.uv[i] && *v < b.uv[i]);
        }
        // Channels the endpoints agree on stay put.
        assert_eq!(m.white, a.white);
    }
}
