//! The send state machine (channel-acquire / write / await-confirmation /
//! retry) and the receive dispatcher, sharing the in-flight resolver and the
//! channel status as spec.md §9 requires — no back-reference from receiver
//! to sender, both just read/write state owned by this struct.

use crate::channel_status::{ChannelStatus, Label};
use crate::codec;
use crate::config::{DriverConfig, MAXSIZE};
use crate::error::DriverError;
use crate::pcip::{Baudrate, Destination, PcipCommand, UnitId};
use crate::receiver::{self, Classified, InboundRecord, Led};
use crate::sender::{Resolution, WriteOutcome};
use crate::serial_link::SerialLink;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex as AsyncMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, with_timeout};
use std::sync::Mutex as SyncMutex;
use std::sync::atomic::{AtomicBool, Ordering};

const INBOUND_QUEUE_SIZE: usize = 64;
type InboundQueue = Channel<CriticalSectionRawMutex, (UnitId, Vec<u8>), INBOUND_QUEUE_SIZE>;

pub struct RadioTimeouts {
    pub confirmation_timeout: Duration,
    pub channel_timeout: Duration,
    pub write_pause: Duration,
    pub wake_sequence_enabled: bool,
}

impl From<&DriverConfig> for RadioTimeouts {
    fn from(cfg: &DriverConfig) -> Self {
        RadioTimeouts {
            confirmation_timeout: Duration::from_secs(cfg.confirmation_timeout_secs),
            channel_timeout: Duration::from_secs(cfg.channel_timeout_secs),
            write_pause: Duration::from_micros((cfg.write_pause_secs * 1_000_000.0) as u64),
            wake_sequence_enabled: cfg.wake_sequence_enabled,
        }
    }
}

/// The serial I/O engine: owns the link, the channel tracker, the single
/// in-flight resolver, and the two inbound (data, status) queues.
pub struct Radio {
    link: &'static SerialLink,
    channel: SyncMutex<ChannelStatus>,
    in_flight: Signal<CriticalSectionRawMutex, Resolution>,
    in_flight_pending: AtomicBool,
    send_lock: AsyncMutex<CriticalSectionRawMutex, ()>,
    pub inbound: &'static InboundQueue,
    pub status_inbound: &'static InboundQueue,
    timeouts: RadioTimeouts,
}

impl Radio {
    pub fn new(link: &'static SerialLink, cfg: &DriverConfig) -> &'static Radio {
        let channel = ChannelStatus::new(
            Duration::from_secs(cfg.free_threshold_secs),
            Duration::from_secs(cfg.force_threshold_secs),
        );
        Box::leak(Box::new(Radio {
            link,
            channel: SyncMutex::new(channel),
            in_flight: Signal::new(),
            in_flight_pending: AtomicBool::new(false),
            send_lock: AsyncMutex::new(()),
            inbound: Box::leak(Box::new(Channel::new())),
            status_inbound: Box::leak(Box::new(Channel::new())),
            timeouts: RadioTimeouts::from(cfg),
        }))
    }

    pub fn channel_label(&self) -> Label {
        self.channel.lock().unwrap().label()
    }

    pub fn channel_free(&self) -> bool {
        self.channel.lock().unwrap().free()
    }

    async fn wait_for_channel_free(&self) {
        // Polling `free()` under the std Mutex briefly on every tick is
        // cheap; the lock is only ever held for the duration of one read.
        const POLL: Duration = Duration::from_millis(50);
        loop {
            if self.channel.lock().unwrap().free() {
                return;
            }
            embassy_time::Timer::after(POLL).await;
        }
    }

    fn touch_channel(&self) {
        self.channel.lock().unwrap().update();
    }

    fn apply_led(&self, led: Led) {
        let mut ch = self.channel.lock().unwrap();
        match led {
            Led::Free => ch.set_free(),
            Led::Sending => ch.set_red(),
            Led::Receiving => ch.set_green(),
            Led::Idle => ch.set_orange(),
        }
    }

    fn resolve_in_flight(&self, resolution: Resolution) {
        if self.in_flight_pending.swap(false, Ordering::AcqRel) {
            self.in_flight.signal(resolution);
        } else {
            log::debug!("confirmation {resolution:?} received with no pending write; discarding");
        }
    }

    /// Run the receiver loop until the link is destroyed. Intended to be
    /// spawned as a long-running task by the caller.
    pub async fn receive_loop(&self) {
        loop {
            let framed = match self.link.next_frame().await {
                Ok(f) => f,
                Err(_) => {
                    log::info!("serial link destroyed, terminating receiver loop");
                    return;
                }
            };
            let Some(body) = codec::extract(&framed) else {
                continue;
            };
            match receiver::classify(body) {
                Classified::Inbound(InboundRecord::Data { peer, encoded }) => {
                    self.touch_channel();
                    if self.inbound.try_send((peer, encoded)).is_err() {
                        log::warn!("inbound data queue full, dropping record from {peer}");
                    }
                }
                Classified::Inbound(InboundRecord::Status { peer, status }) => {
                    self.touch_channel();
                    if self.status_inbound.try_send((peer, status)).is_err() {
                        log::warn!("status queue full, dropping record from {peer}");
                    }
                }
                Classified::DeviceState(led) => {
                    self.touch_channel();
                    self.apply_led(led);
                }
                Classified::DisplayContent => self.touch_channel(),
                Classified::ConfirmSuccess => self.resolve_in_flight(Resolution::Success),
                Classified::ConfirmFailure => self.resolve_in_flight(Resolution::Failure),
                Classified::Unrecognized => {}
            }
        }
    }

    /// Write a command, optionally awaiting its confirmation. At most one
    /// `InFlightCommand` exists at a time: the pending flag is cleared on
    /// every exit path.
    pub async fn write(&self, cmd: &PcipCommand, await_response: bool) -> Result<Option<WriteOutcome>, DriverError> {
        self.in_flight_pending.store(true, Ordering::Release);

        if let Err(e) = self.link.write(&cmd.to_bytes()) {
            self.in_flight_pending.store(false, Ordering::Release);
            return Err(e);
        }

        if !await_response {
            self.in_flight_pending.store(false, Ordering::Release);
            return Ok(None);
        }

        let waited = self.timeouts.confirmation_timeout;
        let result = with_timeout(waited, self.in_flight.wait()).await;
        self.in_flight_pending.store(false, Ordering::Release);
        self.in_flight.reset();
        match result {
            Ok(resolution) => Ok(Some(resolution.into())),
            Err(_) => Err(DriverError::ConfirmationTimeout { waited }),
        }
    }

    /// Channel-aware send: pre-sleep, serialize against other in-flight
    /// sends, acquire the channel if busy, then `write`.
    pub async fn send(&self, cmd: PcipCommand) -> Result<bool, DriverError> {
        embassy_time::Timer::after(self.timeouts.write_pause).await;

        let _permit = self.send_lock.lock().await;

        if !self.channel_free() {
            if self.timeouts.wake_sequence_enabled {
                let _ = self.write(&PcipCommand::StartVoiceCall, true).await;
                let _ = self.write(&PcipCommand::EndVoiceCall, true).await;
            }
            let start = Instant::now();
            if with_timeout(self.timeouts.channel_timeout, self.wait_for_channel_free())
                .await
                .is_err()
            {
                return Err(DriverError::ChannelTimeout {
                    waited: Instant::now().saturating_duration_since(start),
                });
            }
        }

        match self.write(&cmd, true).await? {
            Some(WriteOutcome::Success) => Ok(true),
            Some(WriteOutcome::Failure) => Ok(false),
            None => unreachable!("write(.., true) always returns Some"),
        }
    }

    /// Config-driven setup to run once the link is up and the receiver loop
    /// is spawned: tell the radio whether to handle air-retries itself
    /// (spec.md §6 `retry_sending`), and, if requested, upgrade both ends
    /// to 57600 baud (`change_baudrate`) — the radio first, via
    /// `SetBaudrate`, then this end's local port handle to match.
    pub async fn setup(&self, cfg: &DriverConfig) -> Result<(), DriverError> {
        self.send(PcipCommand::SetAutoRepeat(cfg.retry_sending)).await?;

        if cfg.change_baudrate {
            if self.send(PcipCommand::SetBaudrate(Baudrate::B57600)).await? {
                self.link.set_baud_rate(Baudrate::B57600.bps())?;
            } else {
                log::warn!(
                    "radio did not confirm baudrate upgrade to {} bps; staying at current rate",
                    Baudrate::B57600.bps()
                );
            }
        }

        Ok(())
    }

    /// Reject oversized payloads, build `longMessage2Unit`, forward to `send`.
    pub async fn send_ldm(&self, target: UnitId, payload: Vec<u8>) -> Result<bool, DriverError> {
        if payload.len() > MAXSIZE {
            return Err(DriverError::PayloadTooLarge {
                size: payload.len(),
                max: MAXSIZE,
            });
        }
        self.send(PcipCommand::long_message_to_unit(target, payload)).await
    }

    pub fn destroy(&self) {
        self.link.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.link.is_destroyed()
    }
}

/// Convenience for tests/harnesses that want to address a group rather than
/// a single unit directly through `Radio::send`.
pub fn status_command(destination: Destination, status: Vec<u8>) -> PcipCommand {
    PcipCommand::SetStatus { destination, status }
}
