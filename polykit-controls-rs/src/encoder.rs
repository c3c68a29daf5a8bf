//! Polled quadrature decoding for the panel's rotary encoder.
//!
//! The encoder's two phase pins are sampled once per loop iteration and
//! decoded through a Gray-code transition table. Invalid transitions (both
//! phases changing between samples) count as zero. Four counts make one
//! mechanical detent, and only whole detents are reported.

use embedded_hal::digital::InputPin;

use crate::error::ControlsError;

/// Quadrature counts per mechanical detent.
pub const COUNTS_PER_DETENT: i32 = 4;

/// Count for each `(previous << 2) | current` phase transition, where a
/// phase state is `(a << 1) | b`. Phase A leading phase B counts up.
const TRANSITIONS: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

/// Pin-independent quadrature state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadratureDecoder {
    state: u8,
    counts: i32,
}

impl QuadratureDecoder {
    /// Start from the phase levels currently on the pins.
    pub const fn new(a: bool, b: bool) -> Self {
        Self {
            state: phase_state(a, b),
            counts: 0,
        }
    }

    /// Feed one sample of the phase pins. Returns the whole detents
    /// completed by this sample, positive when phase A leads.
    pub fn update(&mut self, a: bool, b: bool) -> i32 {
        let next = phase_state(a, b);
        let index = ((self.state << 2) | next) as usize;
        self.state = next;
        self.counts += TRANSITIONS[index] as i32;

        let detents = self.counts / COUNTS_PER_DETENT;
        self.counts -= detents * COUNTS_PER_DETENT;
        detents
    }

    /// Counts accumulated towards the next detent.
    pub fn pending_counts(&self) -> i32 {
        self.counts
    }
}

const fn phase_state(a: bool, b: bool) -> u8 {
    ((a as u8) << 1) | b as u8
}

/// Rotary encoder on two input pins.
pub struct Encoder<P> {
    pin_a: P,
    pin_b: P,
    decoder: QuadratureDecoder,
    clockwise: bool,
}

impl<P> Encoder<P>
where
    P: InputPin,
{
    /// Sample the pins once to seed the decoder.
    pub fn new(mut pin_a: P, mut pin_b: P) -> Result<Self, ControlsError<P::Error>> {
        let decoder = QuadratureDecoder::new(pin_a.is_high()?, pin_b.is_high()?);
        Ok(Self {
            pin_a,
            pin_b,
            decoder,
            clockwise: true,
        })
    }

    /// Poll the pins. Returns detents turned since the last poll, with the
    /// sign flipped when the encoder is configured as counter-clockwise.
    pub fn poll(&mut self) -> Result<i32, ControlsError<P::Error>> {
        let a = self.pin_a.is_high()?;
        let b = self.pin_b.is_high()?;
        let detents = self.decoder.update(a, b);
        Ok(if self.clockwise { detents } else { -detents })
    }

    /// Select the rotation sense (the encoder-direction setting).
    pub fn set_clockwise(&mut self, clockwise: bool) {
        self.clockwise = clockwise;
    }

    pub fn is_clockwise(&self) -> bool {
        self.clockwise
    }
}
