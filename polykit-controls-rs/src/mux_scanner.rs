//! Round-robin scanner for the multiplexed analog controls.
//!
//! All multiplexers share four address lines. Each [`MuxScanner::scan_step()`]
//! call selects one address, waits for the mux outputs to settle, reads
//! every multiplexer at that address and advances to the next address. A
//! full pass over all [`ANALOG_CHANNEL_COUNT`] channels therefore takes
//! exactly [`MUX_CHANNELS`] steps, whatever the samples are.
//!
//! Raw samples are quantised (divided down) and compared with the last
//! value reported for that channel. Only a difference larger than the
//! change threshold produces an [`AnalogChange`] and updates the stored
//! value, which keeps resting pots from flooding the MIDI output.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use heapless::Vec;

use crate::control_map::{
    channel_id, control_for, AnalogControl, ANALOG_CHANNEL_COUNT, MUX_CHANNELS, MUX_COUNT,
};
use crate::error::ControlsError;

/// Number of shared mux address lines.
pub const ADDRESS_LINES: usize = 4;

/// Source of raw analog samples, one per multiplexer output.
///
/// The firmware implements this over the MCU's ADC; tests use a table.
pub trait AnalogSampler {
    type Error;

    /// Read the currently selected input of multiplexer `mux`.
    fn sample(&mut self, mux: usize) -> Result<u16, Self::Error>;
}

/// Scanner tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScannerConfig {
    /// Resolution of the raw samples.
    pub adc_bits: u8,
    /// Raw samples are divided by this before comparison.
    pub quantise_divisor: u16,
    /// A quantised change must exceed this to be reported.
    ///
    /// The default of 5 with divisor 2 is a band of 10 raw counts on a
    /// 10-bit converter.
    pub change_threshold: u16,
    /// Wait after switching the address lines, in microseconds.
    pub settle_us: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            adc_bits: 10,
            quantise_divisor: 2,
            change_threshold: 5,
            settle_us: 75,
        }
    }
}

impl ScannerConfig {
    /// Largest raw sample at `adc_bits` resolution.
    pub fn max_raw(&self) -> u16 {
        let bits = u32::from(self.adc_bits.min(16));
        (((1u32) << bits) - 1) as u16
    }

    /// Largest value [`quantise()`](Self::quantise) can return.
    pub fn max_quantised(&self) -> u16 {
        self.quantise(self.max_raw())
    }

    /// Reduce a raw sample. Samples above the ADC range are clamped.
    pub fn quantise(&self, raw: u16) -> u16 {
        raw.min(self.max_raw()) / self.quantise_divisor.max(1)
    }

    /// Scale a quantised value onto the 0–127 MIDI range.
    pub fn to_midi(&self, value: u16) -> u8 {
        let max = u32::from(self.max_quantised().max(1));
        let value = u32::from(value).min(max);
        (value * 127 / max) as u8
    }
}

/// Last reported quantised value of one analog channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelSample {
    previous: u16,
}

impl ChannelSample {
    pub const fn new(previous: u16) -> Self {
        Self { previous }
    }

    /// Compare a new quantised value against the stored one.
    ///
    /// Returns the value, and stores it, iff it differs from the previous
    /// value by more than `threshold`.
    pub fn update(&mut self, quantised: u16, threshold: u16) -> Option<u16> {
        if quantised.abs_diff(self.previous) > threshold {
            self.previous = quantised;
            Some(quantised)
        } else {
            None
        }
    }

    pub fn previous(&self) -> u16 {
        self.previous
    }
}

/// A control moved past the change threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogChange {
    /// Channel id, `mux * MUX_CHANNELS + address`.
    pub channel: usize,
    /// Control wired to the channel, `None` for a spare input.
    pub control: Option<AnalogControl>,
    /// New quantised value.
    pub value: u16,
}

/// The four address lines shared by every multiplexer.
pub struct MuxAddress<P> {
    lines: [P; ADDRESS_LINES],
}

impl<P> MuxAddress<P>
where
    P: OutputPin,
{
    /// `lines[0]` is the least significant address bit.
    pub fn new(lines: [P; ADDRESS_LINES]) -> Self {
        Self { lines }
    }

    /// Drive the lines to `address` (only the low four bits are used).
    pub fn select(&mut self, address: usize) -> Result<(), P::Error> {
        for (bit, line) in self.lines.iter_mut().enumerate() {
            line.set_state(PinState::from((address >> bit) & 1 == 1))?;
        }
        Ok(())
    }
}

/// Scans every multiplexed analog channel with change detection.
pub struct MuxScanner<P, D> {
    address_lines: MuxAddress<P>,
    delay: D,
    config: ScannerConfig,
    samples: [ChannelSample; ANALOG_CHANNEL_COUNT],
    address: usize,
}

impl<P, D> MuxScanner<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    /// Every channel starts with a previous value of zero, so the first
    /// pass reports all controls resting above the threshold.
    pub fn new(address_lines: [P; ADDRESS_LINES], delay: D, config: ScannerConfig) -> Self {
        Self {
            address_lines: MuxAddress::new(address_lines),
            delay,
            config,
            samples: [ChannelSample::default(); ANALOG_CHANNEL_COUNT],
            address: 0,
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Address the next [`scan_step()`](Self::scan_step) will select.
    pub fn address(&self) -> usize {
        self.address
    }

    /// Select the current address, read every multiplexer and advance.
    ///
    /// A failed sample is logged and skipped; that channel keeps its
    /// previous value and is read again on the next pass. Address line
    /// errors are returned and leave the address unchanged.
    pub fn scan_step<S>(
        &mut self,
        sampler: &mut S,
    ) -> Result<Vec<AnalogChange, MUX_COUNT>, ControlsError<P::Error>>
    where
        S: AnalogSampler,
    {
        let address = self.address;
        self.address_lines.select(address)?;
        self.delay.delay_us(self.config.settle_us);

        let mut changes = Vec::new();
        for mux in 0..MUX_COUNT {
            let channel = channel_id(mux, address);
            let raw = match sampler.sample(mux) {
                Ok(raw) => raw,
                Err(_) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("analog sample failed on channel {}", channel);
                    continue;
                }
            };

            let quantised = self.config.quantise(raw);
            if let Some(value) = self.samples[channel].update(quantised, self.config.change_threshold) {
                let change = AnalogChange {
                    channel,
                    control: control_for(channel),
                    value,
                };

                #[cfg(feature = "defmt")]
                defmt::trace!("analog change {}", change);

                // One change per mux, so this never exceeds MUX_COUNT.
                let _ = changes.push(change);
            }
        }

        self.address = (address + 1) % MUX_CHANNELS;
        Ok(changes)
    }

    /// Run [`MUX_CHANNELS`] steps, covering every channel once.
    pub fn scan_cycle<S>(
        &mut self,
        sampler: &mut S,
    ) -> Result<Vec<AnalogChange, ANALOG_CHANNEL_COUNT>, ControlsError<P::Error>>
    where
        S: AnalogSampler,
    {
        let mut changes = Vec::new();
        for _ in 0..MUX_CHANNELS {
            for change in self.scan_step(sampler)? {
                let _ = changes.push(change);
            }
        }
        Ok(changes)
    }

    /// Last reported quantised value of `channel`.
    pub fn previous(&self, channel: usize) -> Result<u16, ControlsError<P::Error>> {
        self.samples
            .get(channel)
            .map(ChannelSample::previous)
            .ok_or(ControlsError::InvalidChannel)
    }
}
