//! Front-panel wiring table.
//!
//! Every analog control is identified by a channel id
//! `mux * MUX_CHANNELS + address`. [`CHANNEL_MAP`] is the only place that
//! knows which pot sits on which multiplexer input; the scanners never
//! hard-code numbering.
//!
//! ```text
//! Mux 0: oscillators, glide, noise, mixer levels
//! Mux 1: filter, LFO, volume, filter + amp envelopes
//! Mux 2: mod wheel on address 0, addresses 1–15 unassigned
//! ```

/// Number of analog input multiplexers.
pub const MUX_COUNT: usize = 3;

/// Inputs per multiplexer (4 address lines).
pub const MUX_CHANNELS: usize = 16;

/// Total scanned analog channels.
pub const ANALOG_CHANNEL_COUNT: usize = MUX_COUNT * MUX_CHANNELS;

/// CC number sent by the panic (all notes off) action.
pub const ALL_NOTES_OFF_CC: u8 = 123;

/// A potentiometer or wheel on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnalogControl {
    PwLfo,
    FmDepth,
    Osc2Pw,
    Osc2Pwm,
    Osc1Pw,
    Osc1Pwm,
    Osc1Range,
    Osc2Range,
    Stack,
    GlideTime,
    Osc2Detune,
    NoiseLevel,
    Osc1SawLevel,
    Osc2SawLevel,
    Osc1PulseLevel,
    Osc2PulseLevel,
    FilterCutoff,
    FilterLfo,
    FilterRes,
    FilterType,
    FilterEgLevel,
    LfoRate,
    LfoWaveform,
    VolumeControl,
    FilterAttack,
    FilterDecay,
    FilterSustain,
    FilterRelease,
    AmpAttack,
    AmpDecay,
    AmpSustain,
    AmpRelease,
    ModWheel,
}

impl AnalogControl {
    /// MIDI CC number for this control.
    pub const fn cc(self) -> u8 {
        match self {
            AnalogControl::PwLfo => 90,
            AnalogControl::FmDepth => 15,
            AnalogControl::Osc2Pw => 17,
            AnalogControl::Osc2Pwm => 19,
            AnalogControl::Osc1Pw => 16,
            AnalogControl::Osc1Pwm => 18,
            AnalogControl::Osc1Range => 54,
            AnalogControl::Osc2Range => 55,
            AnalogControl::Stack => 12,
            AnalogControl::GlideTime => 5,
            AnalogControl::Osc2Detune => 71,
            AnalogControl::NoiseLevel => 23,
            AnalogControl::Osc1SawLevel => 81,
            AnalogControl::Osc2SawLevel => 103,
            AnalogControl::Osc1PulseLevel => 80,
            AnalogControl::Osc2PulseLevel => 102,
            AnalogControl::FilterCutoff => 74,
            AnalogControl::FilterLfo => 22,
            AnalogControl::FilterRes => 94,
            AnalogControl::FilterType => 39,
            AnalogControl::FilterEgLevel => 53,
            AnalogControl::LfoRate => 77,
            AnalogControl::LfoWaveform => 91,
            AnalogControl::VolumeControl => 7,
            AnalogControl::FilterAttack => 45,
            AnalogControl::FilterDecay => 47,
            AnalogControl::FilterSustain => 46,
            AnalogControl::FilterRelease => 44,
            AnalogControl::AmpAttack => 58,
            AnalogControl::AmpDecay => 60,
            AnalogControl::AmpSustain => 59,
            AnalogControl::AmpRelease => 57,
            AnalogControl::ModWheel => 1,
        }
    }
}

use AnalogControl::*;

/// Control wired to each multiplexer input, `CHANNEL_MAP[mux][address]`.
///
/// `None` marks an unassigned input; it is still scanned so spare inputs
/// can be wired without touching the scanner.
pub const CHANNEL_MAP: [[Option<AnalogControl>; MUX_CHANNELS]; MUX_COUNT] = [
    [
        Some(PwLfo),
        Some(FmDepth),
        Some(Osc2Pw),
        Some(Osc2Pwm),
        Some(Osc1Pw),
        Some(Osc1Pwm),
        Some(Osc1Range),
        Some(Osc2Range),
        Some(Stack),
        Some(GlideTime),
        Some(Osc2Detune),
        Some(NoiseLevel),
        Some(Osc1SawLevel),
        Some(Osc2SawLevel),
        Some(Osc1PulseLevel),
        Some(Osc2PulseLevel),
    ],
    [
        Some(FilterCutoff),
        Some(FilterLfo),
        Some(FilterRes),
        Some(FilterType),
        Some(FilterEgLevel),
        Some(LfoRate),
        Some(LfoWaveform),
        Some(VolumeControl),
        Some(FilterAttack),
        Some(FilterDecay),
        Some(FilterSustain),
        Some(FilterRelease),
        Some(AmpAttack),
        Some(AmpDecay),
        Some(AmpSustain),
        Some(AmpRelease),
    ],
    [
        Some(ModWheel),
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
    ],
];

/// Channel id for a multiplexer input.
pub const fn channel_id(mux: usize, address: usize) -> usize {
    mux * MUX_CHANNELS + address
}

/// Control wired to `channel`, or `None` if unassigned or out of range.
pub fn control_for(channel: usize) -> Option<AnalogControl> {
    if channel >= ANALOG_CHANNEL_COUNT {
        return None;
    }
    CHANNEL_MAP[channel / MUX_CHANNELS][channel % MUX_CHANNELS]
}

/// Channel id a control is wired to.
pub fn channel_of(control: AnalogControl) -> Option<usize> {
    (0..ANALOG_CHANNEL_COUNT).find(|&channel| control_for(channel) == Some(control))
}

// ── Switches ─────────────────────────────────────────────────────────────

/// Number of latching panel function buttons.
pub const PANEL_SWITCH_COUNT: usize = 12;

/// Number of momentary action buttons.
pub const BUTTON_COUNT: usize = 4;

/// Panel buttons that toggle a synth function on and off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelSwitch {
    Glide,
    KeyTrack,
    FilterPole,
    FilterLoop,
    FilterEgInv,
    FilterVelocity,
    VcaLoop,
    VcaVelocity,
    VcaGate,
    LfoAlt,
    Chorus1,
    Chorus2,
}

impl PanelSwitch {
    /// Scan order; also the order of the switch pin array.
    pub const ALL: [PanelSwitch; PANEL_SWITCH_COUNT] = [
        PanelSwitch::Glide,
        PanelSwitch::KeyTrack,
        PanelSwitch::FilterPole,
        PanelSwitch::FilterLoop,
        PanelSwitch::FilterEgInv,
        PanelSwitch::FilterVelocity,
        PanelSwitch::VcaLoop,
        PanelSwitch::VcaVelocity,
        PanelSwitch::VcaGate,
        PanelSwitch::LfoAlt,
        PanelSwitch::Chorus1,
        PanelSwitch::Chorus2,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// MIDI CC number reporting this function's on/off state.
    pub const fn cc(self) -> u8 {
        match self {
            PanelSwitch::Glide => 65,
            PanelSwitch::KeyTrack => 30,
            PanelSwitch::FilterPole => 24,
            PanelSwitch::FilterLoop => 52,
            PanelSwitch::FilterEgInv => 50,
            PanelSwitch::FilterVelocity => 43,
            PanelSwitch::VcaLoop => 41,
            PanelSwitch::VcaVelocity => 42,
            PanelSwitch::VcaGate => 21,
            PanelSwitch::LfoAlt => 76,
            PanelSwitch::Chorus1 => 13,
            PanelSwitch::Chorus2 => 14,
        }
    }
}

/// Momentary action buttons, each firing once per press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// Encoder push: recall patch / select in menus.
    Recall,
    Save,
    Settings,
    /// Back in menus, panic (all notes off) otherwise.
    Back,
}

impl Button {
    /// Scan order; also the order of the button pin array.
    pub const ALL: [Button; BUTTON_COUNT] =
        [Button::Recall, Button::Save, Button::Settings, Button::Back];

    pub const fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_ids_cover_all_inputs() {
        assert_eq!(channel_id(0, 0), 0);
        assert_eq!(channel_id(1, 0), 16);
        assert_eq!(channel_id(2, 15), ANALOG_CHANNEL_COUNT - 1);
    }

    #[test]
    fn lookup_by_channel() {
        assert_eq!(control_for(0), Some(AnalogControl::PwLfo));
        assert_eq!(control_for(16), Some(AnalogControl::FilterCutoff));
        assert_eq!(control_for(32), Some(AnalogControl::ModWheel));
        assert_eq!(control_for(33), None);
        assert_eq!(control_for(ANALOG_CHANNEL_COUNT), None);
    }

    #[test]
    fn every_control_is_wired_once() {
        for channel in 0..ANALOG_CHANNEL_COUNT {
            if let Some(control) = control_for(channel) {
                assert_eq!(channel_of(control), Some(channel));
            }
        }
    }

    #[test]
    fn cc_numbers_are_unique() {
        let mut seen = [false; 128];
        for channel in 0..ANALOG_CHANNEL_COUNT {
            if let Some(control) = control_for(channel) {
                let cc = control.cc() as usize;
                assert!(!seen[cc], "duplicate CC {}", cc);
                seen[cc] = true;
            }
        }
        for switch in PanelSwitch::ALL {
            let cc = switch.cc() as usize;
            assert!(!seen[cc], "duplicate CC {}", cc);
            seen[cc] = true;
        }
        assert!(!seen[ALL_NOTES_OFF_CC as usize]);
    }

    #[test]
    fn switch_and_button_indices_match_scan_order() {
        for (i, switch) in PanelSwitch::ALL.iter().enumerate() {
            assert_eq!(switch.index(), i);
        }
        for (i, button) in Button::ALL.iter().enumerate() {
            assert_eq!(button.index(), i);
        }
    }
}
