//! Observable half-duplex busy/idle state derived from device-state (`JA`) events.
//!
//! Owned by the link, mutated only by the receiver task, read by senders —
//! no lock needed in the single-loop model (spec's own concurrency note).

use embassy_time::{Duration, Instant, Timer};

/// Reason the channel last went busy, mirroring the front-panel LED colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyReason {
    Sending,
    Receiving,
    Idle,
}

/// Derived label for display/logging purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Off,
    Sending,
    Receiving,
    Idle,
    Unknown,
}

/// Half-duplex channel state, with hysteresis after going free and a
/// force-free watchdog for when the radio stops emitting LED updates.
pub struct ChannelStatus {
    busy: Option<BusyReason>,
    /// Timestamp of the most recent free/busy transition. `free()` requires
    /// `free_threshold` to have elapsed since this instant even once `busy`
    /// is clear, so a just-turned-free channel isn't treated as admissible
    /// the instant the LED changes.
    time_became_busy: Instant,
    time_last_heard: Instant,
    free_threshold: Duration,
    force_threshold: Duration,
    ever_heard: bool,
}

impl ChannelStatus {
    pub fn new(free_threshold: Duration, force_threshold: Duration) -> Self {
        let now = Instant::now();
        ChannelStatus {
            // Assumed free until the radio's first device-state frame says
            // otherwise; back-date the transition so the free_threshold
            // hysteresis is already satisfied — a freshly opened link has no
            // reason to block sends.
            busy: None,
            time_became_busy: now.checked_sub(free_threshold).unwrap_or(Instant::MIN),
            time_last_heard: now,
            free_threshold,
            force_threshold,
            ever_heard: false,
        }
    }

    /// Bump the silence watchdog; called for every classified inbound frame.
    pub fn update(&mut self) {
        self.time_last_heard = Instant::now();
        self.ever_heard = true;
    }

    pub fn set_free(&mut self) {
        self.busy = None;
        self.time_became_busy = Instant::now();
    }

    pub fn set_red(&mut self) {
        self.set_busy(BusyReason::Sending);
    }

    pub fn set_green(&mut self) {
        self.set_busy(BusyReason::Receiving);
    }

    pub fn set_orange(&mut self) {
        self.set_busy(BusyReason::Idle);
    }

    fn set_busy(&mut self, reason: BusyReason) {
        self.busy = Some(reason);
        self.time_became_busy = Instant::now();
    }

    /// True iff the busy flag is clear and `free_threshold` has elapsed since
    /// the last transition, or the watchdog fired because nothing has been
    /// heard for `force_threshold`.
    pub fn free(&self) -> bool {
        let now = Instant::now();
        let hysteresis_elapsed =
            self.busy.is_none() && now.saturating_duration_since(self.time_became_busy) >= self.free_threshold;
        let forced = self.ever_heard && now.saturating_duration_since(self.time_last_heard) >= self.force_threshold;
        hysteresis_elapsed || forced
    }

    pub fn label(&self) -> Label {
        if !self.ever_heard {
            return Label::Unknown;
        }
        match self.busy {
            None => Label::Off,
            Some(BusyReason::Sending) => Label::Sending,
            Some(BusyReason::Receiving) => Label::Receiving,
            Some(BusyReason::Idle) => Label::Idle,
        }
    }

    /// Poll until `free()` holds, at ≥10 Hz.
    pub async fn wait_for_free(&self) {
        const POLL_INTERVAL: Duration = Duration::from_millis(50);
        while !self.free() {
            Timer::after(POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> ChannelStatus {
        ChannelStatus::new(Duration::from_millis(40), Duration::from_millis(200))
    }

    #[test]
    fn fresh_status_is_immediately_free() {
        let s = status();
        assert!(s.free(), "a freshly opened link should not block sends before any device-state frame");
    }

    #[test]
    fn starts_busy_until_hysteresis_elapses() {
        let mut s = status();
        s.set_free();
        assert!(!s.free(), "should still be within free_threshold hysteresis");
    }

    #[test]
    fn becomes_free_after_hysteresis() {
        let mut s = status();
        s.set_free();
        std::thread::sleep(std::time::Duration::from_millis(60));
        assert!(s.free());
    }

    #[test]
    fn busy_blocks_free_regardless_of_elapsed_time() {
        let mut s = status();
        s.set_green();
        std::thread::sleep(std::time::Duration::from_millis(60));
        assert!(!s.free(), "busy flag set means not free even past threshold");
    }

    #[test]
    fn force_free_watchdog_fires_on_silence() {
        let mut s = status();
        s.set_green();
        s.update();
        std::thread::sleep(std::time::Duration::from_millis(220));
        assert!(s.free(), "force-free watchdog should override a stuck busy flag");
    }

    #[test]
    fn label_reflects_busy_reason() {
        let mut s = status();
        s.update();
        s.set_red();
        assert_eq!(s.label(), Label::Sending);
        s.set_green();
        assert_eq!(s.label(), Label::Receiving);
        s.set_orange();
        assert_eq!(s.label(), Label::Idle);
        s.set_free();
        assert_eq!(s.label(), Label::Off);
    }

    #[test]
    fn wait_for_free_returns_once_free() {
        let mut s = status();
        s.set_green();
        embassy_futures::block_on(async {
            s.set_free();
            s.wait_for_free().await;
        });
        assert!(s.free());
    }
}
