//! Polled front-panel scanning for the PolyKit synth.
//!
//! Everything here is driven from one loop iteration at a time and never
//! blocks except for the mux settle delay:
//!
//! - [`MuxScanner`]: round-robin over the multiplexed pots, quantising
//!   samples and reporting only changes above a threshold.
//! - [`SwitchScanner`]: debounced panel toggles and momentary buttons
//!   with a fire-once pending latch.
//! - [`Encoder`]: quadrature decoding of the menu/patch encoder.
//! - [`control_map`]: which control sits on which input, and its CC.
//!
//! # Quick Start
//!
//! ```ignore
//! use panel_controls::{MuxScanner, ScannerConfig, SwitchScanner};
//!
//! let mut pots = MuxScanner::new(address_pins, delay, ScannerConfig::default());
//! let mut switches = SwitchScanner::new(switch_pins, button_pins);
//!
//! loop {
//!     for change in pots.scan_step(&mut adc)? {
//!         // forward change.control / change.value
//!     }
//!     for event in switches.update(Instant::now())? {
//!         // forward event.switch / event.on
//!     }
//!     if switches.take_press(Button::Settings) {
//!         // open the settings menu
//!     }
//! }
//! ```
//!
//! # Crate Features
//!
//! - **`defmt`** — derive [`defmt::Format`] on public types and log
//!   skipped samples and switch events.

#![no_std]

pub mod control_map;
pub mod debounce;
pub mod encoder;
pub mod error;
pub mod mux_scanner;
pub mod switches;

// ── Re-exports for convenience ───────────────────────────────────────────

pub use control_map::{AnalogControl, Button, PanelSwitch, ALL_NOTES_OFF_CC, CHANNEL_MAP};
pub use debounce::{Debouncer, Edge, DEBOUNCE_MS};
pub use encoder::{Encoder, QuadratureDecoder, COUNTS_PER_DETENT};
pub use error::ControlsError;
pub use mux_scanner::{
    AnalogChange, AnalogSampler, ChannelSample, MuxAddress, MuxScanner, ScannerConfig,
};
pub use switches::{MomentaryButton, PanelToggle, SwitchEvent, SwitchScanner};
