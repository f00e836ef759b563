//! Error taxonomy for the driver.
//!
//! One variant per failure mode a caller can observe (see the confirmation/
//! channel/receive timeout trio and the size/retry/listener failures).
//! Implemented by hand, matching this codebase's convention for its own
//! fallible operations rather than pulling in a derive-macro crate.

use embassy_time::Duration;
use std::fmt;

#[derive(Debug, Clone)]
pub enum DriverError {
    /// Serial port open failed, or a mid-operation I/O error tore down the link.
    DeviceNotFound(String),
    /// The channel did not become free within the configured `channel_timeout`.
    ChannelTimeout { waited: Duration },
    /// No `'0'`/`'1'` confirmation arrived within the configured `confirmation_timeout`.
    ConfirmationTimeout { waited: Duration },
    /// Encoded payload exceeds `MAXSIZE` (or fails the size-with-margin check).
    PayloadTooLarge { size: usize, max: usize },
    /// The outer (communicator-level) retry budget was exhausted.
    SendMaxRetries { attempts: u32 },
    /// The reassembler waited longer than `receive_timeout` for the next chunk.
    ReceiveTimeout { peer: String, waited: Duration },
    /// A topic queue was requested that wasn't pre-registered via `listeners`.
    ListenerNotDefined { topic: String },
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::DeviceNotFound(msg) => write!(f, "device not found: {}", msg),
            DriverError::ChannelTimeout { waited } => {
                write!(f, "channel did not become free within {:?}", waited)
            }
            DriverError::ConfirmationTimeout { waited } => {
                write!(f, "no confirmation within {:?}", waited)
            }
            DriverError::PayloadTooLarge { size, max } => {
                write!(f, "payload too large: {} bytes exceeds max of {}", size, max)
            }
            DriverError::SendMaxRetries { attempts } => {
                write!(f, "send failed after {} retries", attempts)
            }
            DriverError::ReceiveTimeout { peer, waited } => {
                write!(f, "no further chunk from {} within {:?}", peer, waited)
            }
            DriverError::ListenerNotDefined { topic } => {
                write!(f, "listener topic not defined: {}", topic)
            }
        }
    }
}

impl std::error::Error for DriverError {}
