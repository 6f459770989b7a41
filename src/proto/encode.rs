use crate::light::color::Color;
use crate::light::state::{LightingState, OverallClass, RgbClass, UvWhiteClass};

use super::packet::*;

/// Independent volume multipliers, applied after gamma correction and before
/// quantization. `master` scales everything; the zone factors stack on top.
#[derive(Clone, Copy, Debug)]
pub struct Volumes {
    pub master: f32,
    pub front: f32,
    pub rear: f32,
    pub strobe: f32,
}

impl Default for Volumes {
    fn default() -> Self {
        Self {
            master: 1.0,
            front: 1.0,
            rear: 1.0,
            strobe: 1.0,
        }
    }
}

/// Serializes a classified `LightingState` into the smallest set of packets
/// the firmware understands. Dispatch follows the classification exactly:
/// the classifier's ordering guarantees were established so that this table
/// can trust them.
pub struct ProtocolEncoder {
    revision: Revision,
    volumes: Volumes,
    /// Toggled on every render while a strobe mode is active; phase false
    /// emits full-on, phase true emits full-off.
    strobe_phase: bool,
}

impl ProtocolEncoder {
    pub fn new(revision: Revision, volumes: Volumes) -> Self {
        Self {
            revision,
            volumes,
            strobe_phase: false,
        }
    }

    /// Encode one frame. The state must already be classified.
    pub fn encode(&mut self, state: &LightingState) -> Vec<Vec<u8>> {
        let sync = self.revision.sync();

        match state.overall {
            OverallClass::EmergencyLighting => {
                vec![vec![sync, ACTION_EMERGENCY]]
            }
            OverallClass::AllOff => {
                vec![vec![sync, ACTION_ALL_OFF]]
            }
            OverallClass::WhiteStrobe => {
                let packet = if self.strobe_phase {
                    vec![sync, ACTION_ALL_OFF]
                } else {
                    vec![sync, ACTION_WHITE_ON]
                };
                self.strobe_phase = !self.strobe_phase;
                vec![packet]
            }
            OverallClass::UvStrobe => {
                let packet = if self.strobe_phase {
                    vec![sync, ACTION_ALL_OFF]
                } else {
                    vec![sync, ACTION_UV_ON]
                };
                self.strobe_phase = !self.strobe_phase;
                vec![packet]
            }
            OverallClass::None => {
                let mut packets = Vec::new();
                self.encode_rgb_zone(
                    &mut packets,
                    &state.front,
                    state.front_class,
                    state.topology.leds_per_panel,
                    ACTION_FRONT_LEDS_SAME,
                    ACTION_FRONT_PANELS_SAME,
                    0,
                    self.volumes.front,
                );
                self.encode_rgb_zone(
                    &mut packets,
                    &state.rear,
                    state.rear_class,
                    state.topology.leds_per_panel,
                    ACTION_REAR_LEDS_SAME,
                    ACTION_REAR_PANELS_SAME,
                    state.topology.rear_address_offset,
                    self.volumes.rear,
                );
                self.encode_uv_white(&mut packets, state);
                packets
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn encode_rgb_zone(
        &self,
        packets: &mut Vec<Vec<u8>>,
        lights: &[Color],
        class: RgbClass,
        leds_per_panel: usize,
        leds_same_action: u8,
        panels_same_action: u8,
        address_offset: u8,
        zone_volume: f32,
    ) {
        if lights.is_empty() {
            return;
        }
        let sync = self.revision.sync();
        match class {
            RgbClass::LedsSame => {
                let mut packet = vec![sync, leds_same_action];
                self.push_color(&mut packet, lights[0], zone_volume);
                packets.push(packet);
            }
            RgbClass::PanelsSame => {
                let mut packet = vec![sync, panels_same_action];
                for &color in &lights[..leds_per_panel] {
                    self.push_color(&mut packet, color, zone_volume);
                }
                packets.push(packet);
            }
            RgbClass::Diff => {
                for (p, panel) in lights.chunks(leds_per_panel).enumerate() {
                    let mut packet = vec![sync, address_offset + p as u8];
                    for &color in panel {
                        self.push_color(&mut packet, color, zone_volume);
                    }
                    packets.push(packet);
                }
            }
        }
    }

    fn encode_uv_white(&self, packets: &mut Vec<Vec<u8>>, state: &LightingState) {
        if state.uv.is_empty() || state.white.is_empty() {
            return;
        }
        let sync = self.revision.sync();
        match state.uv_white_class {
            UvWhiteClass::Same => {
                let mut white = vec![sync, ACTION_WHITE_SET_ALL];
                self.push_level(&mut white, state.white[0], self.volumes.strobe);
                packets.push(white);

                let mut uv = vec![sync, ACTION_UV_SET_ALL];
                self.push_level(&mut uv, state.uv[0], self.volumes.strobe);
                packets.push(uv);
            }
            UvWhiteClass::Diff => {
                let offset = state.topology.uv_white_address_offset;
                for p in 0..state.topology.uv_white_panels {
                    let mut packet = vec![sync, offset + p as u8];
                    self.push_level(&mut packet, state.uv[p], self.volumes.strobe);
                    self.push_level(&mut packet, state.white[p], self.volumes.strobe);
                    packets.push(packet);
                }
            }
        }
    }

    fn push_color(&self, packet: &mut Vec<u8>, color: Color, zone_volume: f32) {
        self.push_level(packet, color.r, zone_volume);
        self.push_level(packet, color.g, zone_volume);
        self.push_level(packet, color.b, zone_volume);
    }

    fn push_level(&self, packet: &mut Vec<u8>, value: f32, zone_volume: f32) {
        let q = self.quantize(value, zone_volume);
        self.revision.push_channel(packet, q);
    }

    /// Gamma, then volume, then quantize. Values past the representable
    /// range saturate; that is expected at the extremes, not an error.
    fn quantize(&self, value: f32, zone_volume: f32) -> u16 {
        let corrected = value.clamp(0.0, 1.0).powf(self.revision.gamma());
        let scaled = corrected * self.volumes.master * zone_volume;
        let max = self.revision.max_channel();
        ((scaled * max as f32).round() as i64).clamp(0, max as i64) as u16
    }
}
