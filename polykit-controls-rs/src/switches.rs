//! Debounced panel switches and momentary action buttons.
//!
//! Two kinds of input are scanned together once per loop iteration:
//!
//! - **Panel switches**: active-high pushbuttons that toggle a synth
//!   function. Each accepted press flips the function and produces a
//!   [`SwitchEvent`].
//! - **Momentary buttons**: active-low (pull-up) buttons for recall,
//!   save, settings and back. An accepted press sets a pending latch that
//!   stays set until the consumer clears it, so one press is handled once
//!   no matter how many loop iterations pass before it is serviced.

use embassy_time::Instant;
use embedded_hal::digital::InputPin;
use heapless::Vec;

use crate::control_map::{Button, PanelSwitch, BUTTON_COUNT, PANEL_SWITCH_COUNT};
use crate::debounce::Debouncer;
use crate::error::ControlsError;

/// Reported when a panel switch press toggles its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SwitchEvent {
    pub switch: PanelSwitch,
    /// Function state after the toggle.
    pub on: bool,
}

// ── Momentary button ─────────────────────────────────────────────────────

/// Active-low button with a fire-once pending latch.
#[derive(Debug, Clone, Copy)]
pub struct MomentaryButton {
    input: Debouncer,
    pending: bool,
}

impl Default for MomentaryButton {
    fn default() -> Self {
        Self::new()
    }
}

impl MomentaryButton {
    /// Released (pin high) with no pending press.
    pub const fn new() -> Self {
        Self {
            input: Debouncer::with_default_window(true),
            pending: false,
        }
    }

    /// Feed the raw pin level (`true` = high = released).
    pub fn update(&mut self, level: bool, now: Instant) {
        self.input.update(level, now);
        if self.input.fell() {
            self.pending = true;
        }
    }

    /// A press has been accepted and not yet cleared.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Acknowledge the pending press.
    pub fn clear(&mut self) {
        self.pending = false;
    }

    /// Return the pending press and clear it.
    pub fn take(&mut self) -> bool {
        core::mem::replace(&mut self.pending, false)
    }

    /// Button is currently (debounced) pressed.
    pub fn is_held(&self) -> bool {
        !self.input.stable_state()
    }

    /// Underlying debouncer, for edge and level queries.
    pub fn input(&self) -> &Debouncer {
        &self.input
    }
}

// ── Panel toggle ─────────────────────────────────────────────────────────

/// Active-high pushbutton that flips a function state on each press.
#[derive(Debug, Clone, Copy)]
pub struct PanelToggle {
    input: Debouncer,
    on: bool,
}

impl Default for PanelToggle {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelToggle {
    /// Released (pin low), function off.
    pub const fn new() -> Self {
        Self {
            input: Debouncer::with_default_window(false),
            on: false,
        }
    }

    /// Feed the raw pin level. Returns the new function state when a
    /// press is accepted.
    pub fn update(&mut self, level: bool, now: Instant) -> Option<bool> {
        self.input.update(level, now);
        if self.input.rose() {
            self.on = !self.on;
            Some(self.on)
        } else {
            None
        }
    }

    /// Current function state.
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Set the function state without producing an event (patch recall).
    pub fn set(&mut self, on: bool) {
        self.on = on;
    }

    pub fn input(&self) -> &Debouncer {
        &self.input
    }
}

// ── Scanner ──────────────────────────────────────────────────────────────

/// Scans every panel switch and momentary button.
///
/// Pins are given in [`PanelSwitch::ALL`] and [`Button::ALL`] order.
pub struct SwitchScanner<P> {
    switch_pins: [P; PANEL_SWITCH_COUNT],
    button_pins: [P; BUTTON_COUNT],
    toggles: [PanelToggle; PANEL_SWITCH_COUNT],
    buttons: [MomentaryButton; BUTTON_COUNT],
}

impl<P> SwitchScanner<P>
where
    P: InputPin,
{
    pub fn new(switch_pins: [P; PANEL_SWITCH_COUNT], button_pins: [P; BUTTON_COUNT]) -> Self {
        Self {
            switch_pins,
            button_pins,
            toggles: [PanelToggle::new(); PANEL_SWITCH_COUNT],
            buttons: [MomentaryButton::new(); BUTTON_COUNT],
        }
    }

    /// Read every pin once and advance the debouncers.
    ///
    /// Returns the panel switches toggled on this pass. Button presses are
    /// latched and read with [`take_press()`](Self::take_press).
    ///
    /// # Errors
    /// * [`ControlsError::Pin`] if any pin read fails. No toggle or button
    ///   advances on that pass, so the next pass still sees the edge.
    pub fn update(
        &mut self,
        now: Instant,
    ) -> Result<Vec<SwitchEvent, PANEL_SWITCH_COUNT>, ControlsError<P::Error>> {
        let mut switch_levels = [false; PANEL_SWITCH_COUNT];
        for (level, pin) in switch_levels.iter_mut().zip(self.switch_pins.iter_mut()) {
            *level = pin.is_high()?;
        }
        let mut button_levels = [true; BUTTON_COUNT];
        for (level, pin) in button_levels.iter_mut().zip(self.button_pins.iter_mut()) {
            *level = pin.is_high()?;
        }

        let mut events = Vec::new();
        for ((switch, toggle), level) in PanelSwitch::ALL
            .iter()
            .zip(self.toggles.iter_mut())
            .zip(switch_levels)
        {
            if let Some(on) = toggle.update(level, now) {
                // At most one event per switch, so the batch cannot overflow.
                let _ = events.push(SwitchEvent {
                    switch: *switch,
                    on,
                });

                #[cfg(feature = "defmt")]
                defmt::debug!("switch {} -> {}", switch, on);
            }
        }

        for (button, level) in self.buttons.iter_mut().zip(button_levels) {
            button.update(level, now);
        }

        Ok(events)
    }

    /// Consume a pending press of `button`.
    pub fn take_press(&mut self, button: Button) -> bool {
        self.buttons[button.index()].take()
    }

    /// State of one momentary button.
    pub fn button(&self, button: Button) -> &MomentaryButton {
        &self.buttons[button.index()]
    }

    pub fn button_mut(&mut self, button: Button) -> &mut MomentaryButton {
        &mut self.buttons[button.index()]
    }

    /// Function state of a panel switch.
    pub fn is_on(&self, switch: PanelSwitch) -> bool {
        self.toggles[switch.index()].is_on()
    }

    /// Restore a function state, e.g. from a recalled patch.
    pub fn set_state(&mut self, switch: PanelSwitch, on: bool) {
        self.toggles[switch.index()].set(on);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::convert::Infallible;
    use embedded_hal::digital::{ErrorKind, ErrorType};

    /// Pin whose level is shared with the test through a `Cell`.
    struct FakePin<'a>(&'a Cell<bool>);

    impl ErrorType for FakePin<'_> {
        type Error = Infallible;
    }

    impl InputPin for FakePin<'_> {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.0.get())
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.0.get())
        }
    }

    /// Pin that fails to read while its level is `None`.
    struct FlakyPin<'a>(&'a Cell<Option<bool>>);

    impl ErrorType for FlakyPin<'_> {
        type Error = ErrorKind;
    }

    impl InputPin for FlakyPin<'_> {
        fn is_high(&mut self) -> Result<bool, ErrorKind> {
            self.0.get().ok_or(ErrorKind::Other)
        }

        fn is_low(&mut self) -> Result<bool, ErrorKind> {
            self.is_high().map(|high| !high)
        }
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    // ── MomentaryButton ──────────────────────────────────────────────

    #[test]
    fn button_press_latches_until_cleared() {
        let mut b = MomentaryButton::new();
        b.update(false, at(0));
        b.update(false, at(30));
        assert!(b.is_pending());

        // Still pending across later iterations while held and after release.
        b.update(false, at(40));
        b.update(true, at(50));
        b.update(true, at(90));
        assert!(b.is_pending());

        b.clear();
        assert!(!b.is_pending());
    }

    #[test]
    fn button_take_fires_once_per_press() {
        let mut b = MomentaryButton::new();
        for ms in 0..100 {
            b.update(false, at(ms));
        }
        assert!(b.take());
        assert!(!b.take());
        assert!(b.is_held());
    }

    #[test]
    fn button_bounce_does_not_latch() {
        let mut b = MomentaryButton::new();
        for ms in 0..60 {
            // Toggle every 5 ms: never stable for the window.
            b.update((ms / 5) % 2 == 0, at(ms));
        }
        assert!(!b.is_pending());
    }

    #[test]
    fn release_does_not_latch() {
        let mut b = MomentaryButton::new();
        b.update(false, at(0));
        b.update(false, at(30));
        b.clear();
        b.update(true, at(40));
        b.update(true, at(70));
        assert!(!b.is_pending());
    }

    // ── PanelToggle ──────────────────────────────────────────────────

    #[test]
    fn toggle_flips_on_each_press() {
        let mut t = PanelToggle::new();
        assert_eq!(t.update(true, at(0)), None);
        assert_eq!(t.update(true, at(30)), Some(true));
        assert_eq!(t.update(false, at(40)), None);
        assert_eq!(t.update(false, at(70)), None);
        assert_eq!(t.update(true, at(80)), None);
        assert_eq!(t.update(true, at(110)), Some(false));
    }

    #[test]
    fn toggle_set_is_silent() {
        let mut t = PanelToggle::new();
        t.set(true);
        assert!(t.is_on());
        assert_eq!(t.update(false, at(100)), None);
    }

    // ── SwitchScanner ────────────────────────────────────────────────

    #[test]
    fn scanner_reports_toggles_and_latches_buttons() {
        let switch_levels: [Cell<bool>; PANEL_SWITCH_COUNT] = Default::default();
        let button_levels: [Cell<bool>; BUTTON_COUNT] = core::array::from_fn(|_| Cell::new(true));

        let mut scanner = SwitchScanner::new(
            core::array::from_fn(|i| FakePin(&switch_levels[i])),
            core::array::from_fn(|i| FakePin(&button_levels[i])),
        );

        assert!(scanner.update(at(0)).unwrap().is_empty());

        switch_levels[PanelSwitch::Chorus1.index()].set(true);
        button_levels[Button::Settings.index()].set(false);
        assert!(scanner.update(at(10)).unwrap().is_empty());

        let events = scanner.update(at(40)).unwrap();
        assert_eq!(
            events.as_slice(),
            &[SwitchEvent {
                switch: PanelSwitch::Chorus1,
                on: true
            }]
        );
        assert!(scanner.is_on(PanelSwitch::Chorus1));

        assert!(scanner.button(Button::Settings).is_pending());
        assert!(!scanner.take_press(Button::Save));
        assert!(scanner.take_press(Button::Settings));
        assert!(!scanner.take_press(Button::Settings));
    }

    #[test]
    fn scanner_set_state_restores_function() {
        let switch_levels: [Cell<bool>; PANEL_SWITCH_COUNT] = Default::default();
        let button_levels: [Cell<bool>; BUTTON_COUNT] = core::array::from_fn(|_| Cell::new(true));
        let mut scanner = SwitchScanner::new(
            core::array::from_fn(|i| FakePin(&switch_levels[i])),
            core::array::from_fn(|i| FakePin(&button_levels[i])),
        );

        scanner.set_state(PanelSwitch::Glide, true);
        assert!(scanner.is_on(PanelSwitch::Glide));
        assert!(scanner.update(at(100)).unwrap().is_empty());
    }

    #[test]
    fn pin_error_loses_no_toggle() {
        let switch_levels: [Cell<Option<bool>>; PANEL_SWITCH_COUNT] =
            core::array::from_fn(|_| Cell::new(Some(false)));
        let button_levels: [Cell<Option<bool>>; BUTTON_COUNT] =
            core::array::from_fn(|_| Cell::new(Some(true)));
        let mut scanner = SwitchScanner::new(
            core::array::from_fn(|i| FlakyPin(&switch_levels[i])),
            core::array::from_fn(|i| FlakyPin(&button_levels[i])),
        );

        switch_levels[PanelSwitch::Chorus1.index()].set(Some(true));
        assert!(scanner.update(at(0)).unwrap().is_empty());

        // The press would be accepted now, but a pin read after it fails.
        button_levels[Button::Back.index()].set(None);
        assert_eq!(
            scanner.update(at(30)),
            Err(ControlsError::Pin(ErrorKind::Other))
        );
        assert!(!scanner.is_on(PanelSwitch::Chorus1));

        button_levels[Button::Back.index()].set(Some(true));
        let events = scanner.update(at(31)).unwrap();
        assert_eq!(
            events.as_slice(),
            &[SwitchEvent {
                switch: PanelSwitch::Chorus1,
                on: true
            }]
        );
        assert!(scanner.is_on(PanelSwitch::Chorus1));
    }
}
