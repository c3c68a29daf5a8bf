//! Contact-bounce filter for polled switch inputs.

use embassy_time::{Duration, Instant};

/// Default debounce window in milliseconds.
pub const DEBOUNCE_MS: u64 = 30;

/// Direction of an accepted level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Rose,
    Fell,
}

/// Debounced view of one digital input.
///
/// A change of the raw level is accepted only once the raw level has held
/// for the whole window. Bounces shorter than the window restart the timer
/// and never reach the stable state.
///
/// [`rose()`](Self::rose) and [`fell()`](Self::fell) report the edge
/// accepted by the most recent [`update()`](Self::update) call, so each
/// qualifying transition is seen exactly once.
///
/// # Examples
///
/// ```
/// use embassy_time::{Duration, Instant};
/// use panel_controls::Debouncer;
///
/// let mut input = Debouncer::new(false, Duration::from_millis(30));
/// input.update(true, Instant::from_millis(0));
/// assert!(!input.rose());
/// input.update(true, Instant::from_millis(30));
/// assert!(input.rose());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    window: Duration,
    stable: bool,
    raw: bool,
    raw_since: Instant,
    edge: Option<Edge>,
}

impl Debouncer {
    /// Create a debouncer whose stable state starts at `initial`.
    pub const fn new(initial: bool, window: Duration) -> Self {
        Self {
            window,
            stable: initial,
            raw: initial,
            raw_since: Instant::from_ticks(0),
            edge: None,
        }
    }

    /// Create a debouncer with the [`DEBOUNCE_MS`] window.
    pub const fn with_default_window(initial: bool) -> Self {
        Self::new(initial, Duration::from_millis(DEBOUNCE_MS))
    }

    /// Feed the current raw level. Returns `true` if the stable state
    /// changed on this call.
    pub fn update(&mut self, raw: bool, now: Instant) -> bool {
        self.edge = None;

        if raw != self.raw {
            self.raw = raw;
            self.raw_since = now;
        }

        if self.raw == self.stable {
            return false;
        }

        let held = now
            .checked_duration_since(self.raw_since)
            .is_some_and(|elapsed| elapsed >= self.window);
        if !held {
            return false;
        }

        self.stable = self.raw;
        self.edge = Some(if self.stable { Edge::Rose } else { Edge::Fell });
        true
    }

    /// Low → high accepted on the last update.
    pub fn rose(&self) -> bool {
        self.edge == Some(Edge::Rose)
    }

    /// High → low accepted on the last update.
    pub fn fell(&self) -> bool {
        self.edge == Some(Edge::Fell)
    }

    pub fn edge(&self) -> Option<Edge> {
        self.edge
    }

    pub fn stable_state(&self) -> bool {
        self.stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    /// Feed `raw` every millisecond over `[from, to)` and count edges.
    fn feed(d: &mut Debouncer, raw: bool, from: u64, to: u64) -> usize {
        (from..to).filter(|&ms| d.update(raw, at(ms))).count()
    }

    #[test]
    fn starts_in_initial_state() {
        let d = Debouncer::with_default_window(true);
        assert!(d.stable_state());
        assert!(!d.rose());
        assert!(!d.fell());
    }

    #[test]
    fn short_pulse_produces_no_edge() {
        let mut d = Debouncer::with_default_window(false);
        assert_eq!(feed(&mut d, true, 100, 120), 0);
        assert_eq!(feed(&mut d, false, 120, 200), 0);
        assert!(!d.stable_state());
    }

    #[test]
    fn sustained_change_produces_one_edge() {
        let mut d = Debouncer::with_default_window(false);
        assert_eq!(feed(&mut d, true, 100, 300), 1);
        assert!(d.stable_state());
    }

    #[test]
    fn edge_lands_exactly_at_window() {
        let mut d = Debouncer::with_default_window(false);
        assert!(!d.update(true, at(100)));
        assert!(!d.update(true, at(129)));
        assert!(d.update(true, at(130)));
        assert!(d.rose());

        // Edge flag clears on the next update.
        d.update(true, at(131));
        assert!(!d.rose());
    }

    #[test]
    fn bounce_restarts_window() {
        let mut d = Debouncer::with_default_window(true);
        d.update(false, at(10));
        d.update(true, at(15)); // bounce
        d.update(false, at(20));
        assert!(!d.update(false, at(45)));
        assert!(d.update(false, at(50)));
        assert!(d.fell());
    }

    #[test]
    fn press_and_release_give_two_edges() {
        let mut d = Debouncer::with_default_window(true);
        assert_eq!(feed(&mut d, false, 0, 100), 1);
        assert_eq!(feed(&mut d, true, 100, 200), 1);
        assert!(d.stable_state());
    }

    #[test]
    fn custom_window() {
        let mut d = Debouncer::new(false, Duration::from_millis(5));
        d.update(true, at(0));
        assert!(d.update(true, at(5)));
    }
}
