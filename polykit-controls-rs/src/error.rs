//! Error types for the front-panel scanners.

use core::fmt;

/// Errors that can occur while scanning the front panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlsError<E> {
    /// Underlying digital pin error (mux address line or switch input).
    Pin(E),

    /// Analog channel index out of range (must be < `ANALOG_CHANNEL_COUNT`).
    InvalidChannel,
}

// Allow ergonomic `?` propagation from raw pin errors.
impl<E> From<E> for ControlsError<E> {
    fn from(error: E) -> Self {
        ControlsError::Pin(error)
    }
}

impl<E: fmt::Debug> fmt::Display for ControlsError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ControlsError::Pin(e) => write!(f, "Pin error: {:?}", e),
            ControlsError::InvalidChannel => write!(f, "Invalid analog channel"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: defmt::Format> defmt::Format for ControlsError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ControlsError::Pin(e) => defmt::write!(f, "Pin error: {}", e),
            ControlsError::InvalidChannel => defmt::write!(f, "Invalid analog channel"),
        }
    }
}
