//! polykit-hw-interface
//!
//! Front-panel firmware for the PolyKit synth on the Raspberry Pi Pico 2.
//! Wires the two library crates into a live polling loop:
//!
//! 1. Every 250 µs the panel task advances the pot scanner by one mux
//!    address, reads the switches and buttons and polls the encoder.
//! 2. Pot moves and panel switch toggles become CC events on
//!    `CONTROL_EVENTS`.
//! 3. Encoder steps and button presses drive the settings menu. While the
//!    menu is closed they browse, recall and save patches instead, and Back
//!    sends all notes off.
//! 4. The MIDI task drains `CONTROL_EVENTS`. MIDI transport is not part of
//!    this firmware; events are logged over defmt.
//!
//! Settings persist in the last 4 KiB sector of the program flash, which
//! `memory.x` keeps out of the linker's FLASH region.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{self, Adc};
use embassy_rp::block::ImageDef;
use embassy_rp::flash::{Blocking, Flash, ERASE_SIZE};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::FLASH;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Delay, Duration, Instant, Ticker};
use embedded_storage::nor_flash::RmwNorFlashStorage;
use heapless::Vec;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use panel_controls::control_map::MUX_COUNT;
use panel_controls::{
    AnalogSampler, Button, Encoder, MuxScanner, ScannerConfig, SwitchScanner, ALL_NOTES_OFF_CC,
};
use polykit::settings::{
    MenuOutcome, NavEvent, PatchNumber, SettingsContext, SettingsMenu, SettingsStore,
};

// ---------------------------------------------------------------------------
// Boot block
// ---------------------------------------------------------------------------

/// Tell the RP2350 Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = embassy_rp::block::ImageDef::secure_exe();

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Pico 2 QSPI flash size.
const FLASH_SIZE: usize = 4 * 1024 * 1024;

/// Settings live in the last erase sector.
const SETTINGS_BASE: u32 = (FLASH_SIZE - ERASE_SIZE) as u32;

/// Panel loop period. One mux address per iteration, so a full pot pass
/// takes 16 iterations (4 ms).
const LOOP_PERIOD_US: u64 = 250;

const CONTROL_EVENT_CAPACITY: usize = 32;

// ---------------------------------------------------------------------------
// Static storage
// ---------------------------------------------------------------------------

/// Read-modify-write buffer for one flash sector.
static MERGE_BUFFER: StaticCell<[u8; ERASE_SIZE]> = StaticCell::new();

/// Panel output, written by the panel task and drained by the MIDI task.
static CONTROL_EVENTS: Channel<CriticalSectionRawMutex, ControlEvent, CONTROL_EVENT_CAPACITY> =
    Channel::new();

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

type SettingsFlash = RmwNorFlashStorage<'static, Flash<'static, FLASH, Blocking, FLASH_SIZE>>;

type PotScanner = MuxScanner<Output<'static>, Delay>;

// ---------------------------------------------------------------------------
// Panel hardware
// ---------------------------------------------------------------------------

/// What the panel sends to the MIDI layer.
#[derive(Clone, Copy, Format)]
enum ControlEvent {
    ControlChange { cc: u8, value: u8 },
    PatchRecall(u16),
    PatchSave(u16),
}

/// Blocking ADC reads of the three mux outputs.
struct AdcSampler {
    adc: Adc<'static, adc::Blocking>,
    inputs: [adc::Channel<'static>; MUX_COUNT],
}

impl AnalogSampler for AdcSampler {
    type Error = adc::Error;

    fn sample(&mut self, mux: usize) -> Result<u16, adc::Error> {
        let Some(input) = self.inputs.get_mut(mux) else {
            return Err(adc::Error::ConversionFailed);
        };
        self.adc.blocking_read(input)
    }
}

/// Everything the panel task polls.
struct Panel {
    pots: PotScanner,
    sampler: AdcSampler,
    switches: SwitchScanner<Input<'static>>,
    encoder: Encoder<Input<'static>>,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Drains panel events. Logs them in place of a MIDI transport.
#[embassy_executor::task]
async fn midi_task() {
    info!("MIDI task started");
    loop {
        match CONTROL_EVENTS.receive().await {
            ControlEvent::ControlChange { cc, value } => debug!("CC {} = {}", cc, value),
            ControlEvent::PatchRecall(patch) => info!("Recall patch {}", patch),
            ControlEvent::PatchSave(patch) => info!("Save patch {}", patch),
        }
    }
}

/// The panel polling loop.
#[embassy_executor::task]
async fn panel_task(mut panel: Panel, mut settings: SettingsContext<SettingsFlash>) {
    info!("Panel task started");

    let mut menu = SettingsMenu::new();
    let mut patch = settings.settings().last_patch;
    panel
        .encoder
        .set_clockwise(settings.settings().encoder_dir.is_clockwise());

    let mut ticker = Ticker::every(Duration::from_micros(LOOP_PERIOD_US));
    loop {
        ticker.next().await;
        let now = Instant::now();

        // —— Pots ————————————————————————————————————————————————————————
        match panel.pots.scan_step(&mut panel.sampler) {
            Ok(changes) => {
                for change in changes {
                    if let Some(control) = change.control {
                        let value = panel.pots.config().to_midi(change.value);
                        send(ControlEvent::ControlChange {
                            cc: control.cc(),
                            value,
                        });
                    }
                }
            }
            Err(e) => warn!("Mux address error: {}", e),
        }

        // —— Panel switches ——————————————————————————————————————————————
        match panel.switches.update(now) {
            Ok(events) => {
                for event in events {
                    send(ControlEvent::ControlChange {
                        cc: event.switch.cc(),
                        value: if event.on { 127 } else { 0 },
                    });
                }
            }
            Err(e) => warn!("Switch read error: {}", e),
        }

        // —— Encoder and buttons —————————————————————————————————————————
        let steps = match panel.encoder.poll() {
            Ok(steps) => steps,
            Err(e) => {
                warn!("Encoder read error: {}", e);
                0
            }
        };

        let mut nav: Vec<NavEvent, 4> = Vec::new();
        if steps != 0 {
            let _ = nav.push(NavEvent::Rotate(steps));
        }
        for (button, event) in [
            (Button::Recall, NavEvent::Select),
            (Button::Settings, NavEvent::Settings),
            (Button::Back, NavEvent::Back),
        ] {
            if panel.switches.take_press(button) {
                let _ = nav.push(event);
            }
        }

        for event in nav {
            match menu.handle(event, &mut settings) {
                Ok(MenuOutcome::Ignored) => patch_action(event, &mut patch, &mut settings),
                Ok(MenuOutcome::Committed { label, value }) => {
                    info!("{} set to {}", label, value);
                    panel
                        .encoder
                        .set_clockwise(settings.settings().encoder_dir.is_clockwise());
                }
                Ok(outcome) => debug!("Menu: {}", outcome),
                Err(e) => warn!("Settings not saved: {}", e),
            }
        }

        // Save has no menu meaning; it only acts while the menu is closed.
        if panel.switches.take_press(Button::Save) && !menu.is_open() {
            send(ControlEvent::PatchSave(patch.get()));
            remember_patch(patch, &mut settings);
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Queue an event for the MIDI task, dropping it if the queue is full.
fn send(event: ControlEvent) {
    if CONTROL_EVENTS.try_send(event).is_err() {
        warn!("Control event queue full, dropped {}", event);
    }
}

/// Patch browsing, recall and panic while the settings menu is closed.
fn patch_action(
    event: NavEvent,
    patch: &mut PatchNumber,
    settings: &mut SettingsContext<SettingsFlash>,
) {
    match event {
        NavEvent::Rotate(steps) => {
            *patch = patch.wrapping_add(steps);
            debug!("Patch {}", patch.get());
        }
        NavEvent::Select => {
            send(ControlEvent::PatchRecall(patch.get()));
            remember_patch(*patch, settings);
        }
        NavEvent::Back => {
            send(ControlEvent::ControlChange {
                cc: ALL_NOTES_OFF_CC,
                value: 0,
            });
        }
        NavEvent::Settings => {}
    }
}

fn remember_patch(patch: PatchNumber, settings: &mut SettingsContext<SettingsFlash>) {
    if let Err(e) = settings.set_last_patch(patch) {
        warn!("Last patch {} not saved: {}", patch.get(), e);
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("polykit-hw-interface starting");

    // —— Pin assignments ————————————————————————————————————————————————————
    // MUX_A0..A3  → GP0..GP3    shared mux address lines, A0 = LSB
    // ENC_A/ENC_B → GP4, GP5    pull-up
    // RECALL_SW   → GP6         active-low, pull-up (encoder push)
    // SAVE_SW     → GP7         active-low, pull-up
    // SETTINGS_SW → GP8         active-low, pull-up
    // BACK_SW     → GP9         active-low, pull-up
    // Panel SW    → GP10..GP21  active-high, pull-down, PanelSwitch::ALL order
    // MUX1..3_OUT → GP26..GP28  ADC0..2
    // ———————————————————————————————————————————————————————————————————————

    // Settings store over the last flash sector.
    let flash = Flash::<_, Blocking, FLASH_SIZE>::new_blocking(p.FLASH);
    let merge_buffer = MERGE_BUFFER.init([0; ERASE_SIZE]);
    let storage = RmwNorFlashStorage::new(flash, merge_buffer);
    let settings = SettingsContext::load(SettingsStore::with_base(storage, SETTINGS_BASE));

    // Pots: 12-bit ADC, quantised down to the same 9-bit range as a 10-bit
    // converter with the default divisor, so the default threshold keeps
    // its 10-count (10-bit) band.
    let address_lines = [
        Output::new(p.PIN_0, Level::Low),
        Output::new(p.PIN_1, Level::Low),
        Output::new(p.PIN_2, Level::Low),
        Output::new(p.PIN_3, Level::Low),
    ];
    let scanner_config = ScannerConfig {
        adc_bits: 12,
        quantise_divisor: 8,
        ..ScannerConfig::default()
    };
    let pots = MuxScanner::new(address_lines, Delay, scanner_config);
    let sampler = AdcSampler {
        adc: Adc::new_blocking(p.ADC, adc::Config::default()),
        inputs: [
            adc::Channel::new_pin(p.PIN_26, Pull::None),
            adc::Channel::new_pin(p.PIN_27, Pull::None),
            adc::Channel::new_pin(p.PIN_28, Pull::None),
        ],
    };

    // Switches and buttons.
    let switch_pins = [
        Input::new(p.PIN_10, Pull::Down),
        Input::new(p.PIN_11, Pull::Down),
        Input::new(p.PIN_12, Pull::Down),
        Input::new(p.PIN_13, Pull::Down),
        Input::new(p.PIN_14, Pull::Down),
        Input::new(p.PIN_15, Pull::Down),
        Input::new(p.PIN_16, Pull::Down),
        Input::new(p.PIN_17, Pull::Down),
        Input::new(p.PIN_18, Pull::Down),
        Input::new(p.PIN_19, Pull::Down),
        Input::new(p.PIN_20, Pull::Down),
        Input::new(p.PIN_21, Pull::Down),
    ];
    let button_pins = [
        Input::new(p.PIN_6, Pull::Up),
        Input::new(p.PIN_7, Pull::Up),
        Input::new(p.PIN_8, Pull::Up),
        Input::new(p.PIN_9, Pull::Up),
    ];
    let switches = SwitchScanner::new(switch_pins, button_pins);

    // Encoder. Input pins are infallible.
    let encoder = match Encoder::new(Input::new(p.PIN_4, Pull::Up), Input::new(p.PIN_5, Pull::Up)) {
        Ok(encoder) => encoder,
        Err(e) => defmt::panic!("Encoder init failed: {}", e),
    };

    let panel = Panel {
        pots,
        sampler,
        switches,
        encoder,
    };

    // —— Spawn tasks ————————————————————————————————————————————————————————

    spawner.spawn(midi_task().unwrap());
    spawner.spawn(panel_task(panel, settings).unwrap());

    info!("All tasks spawned");
}
