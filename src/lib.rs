//! NXDN PCIP trunked-radio serial driver.
//!
//! Owns the serial link, the PCIP wire protocol, the half-duplex channel
//! tracker, the send/receive state machine, and the pickle pipeline that
//! turns arbitrary JSON payloads into chunked long-message transmissions.
//! Application code talks to [`communicator::Communicator`]; everything else
//! here is plumbing it's built from.

pub mod channel_status;
pub mod codec;
pub mod communicator;
pub mod config;
pub mod error;
pub mod pcip;
pub mod pickle;
pub mod queue;
pub mod radio;
pub mod reassembler;
pub mod receiver;
pub mod sender;
pub mod serial_link;

pub use communicator::Communicator;
pub use config::DriverConfig;
pub use error::DriverError;
pub use pcip::UnitId;
pub use radio::Radio;
pub use serial_link::SerialLink;

/// Run the radio's receiver loop. Spawned as its own embassy task so frames
/// keep getting classified and queued while the caller awaits sends.
#[embassy_executor::task]
pub async fn receiver_task(radio: &'static Radio) {
    radio.receive_loop().await;
}

/// Run the communicator's dispatch loop (reassembly + routing). Spawned
/// alongside [`receiver_task`]; the two share `Radio::inbound` as producer
/// and consumer.
#[embassy_executor::task]
pub async fn dispatch_task(communicator: &'static Communicator) {
    communicator.dispatch_loop().await;
}
