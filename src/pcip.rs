//! PCIP wire vocabulary: unit IDs and command body constructors.
//!
//! Bodies produced here are unframed; `codec::frame` wraps them before they
//! reach `SerialLink::write`.

use crate::error::DriverError;
use std::fmt;

/// Fixed 5 ASCII-digit radio identifier. `"00000"` addresses all units/groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId([u8; 5]);

impl UnitId {
    pub const BROADCAST: UnitId = UnitId(*b"00000");

    /// Parse a 5 ASCII-digit unit ID, rejecting anything else at the API boundary.
    pub fn parse(s: &str) -> Result<Self, DriverError> {
        let bytes = s.as_bytes();
        if bytes.len() != 5 || !bytes.iter().all(u8::is_ascii_digit) {
            return Err(DriverError::DeviceNotFound(format!(
                "invalid unit id {:?}: expected 5 ASCII digits",
                s
            )));
        }
        let mut arr = [0u8; 5];
        arr.copy_from_slice(bytes);
        Ok(UnitId(arr))
    }

    /// Parse the 5 raw bytes found at a fixed frame offset (e.g. `body[3..8]`).
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 5 || !bytes.iter().all(u8::is_ascii_digit) {
            return None;
        }
        let mut arr = [0u8; 5];
        arr.copy_from_slice(bytes);
        Some(UnitId(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 5] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).expect("UnitId is always ASCII digits")
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addressing mode for a PCIP command: a single unit, a group, or everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Unit(UnitId),
    Group(UnitId),
    All,
}

impl Destination {
    fn opcode_suffix(&self) -> u8 {
        match self {
            Destination::Unit(_) | Destination::All => b'U',
            Destination::Group(_) => b'G',
        }
    }

    fn unit_id(&self) -> UnitId {
        match self {
            Destination::Unit(id) | Destination::Group(id) => *id,
            Destination::All => UnitId::BROADCAST,
        }
    }
}

/// Line rates the radio's `set-baudrate` command can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baudrate {
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
    B38400,
    B57600,
}

impl Baudrate {
    fn digit(&self) -> u8 {
        match self {
            Baudrate::B1200 => b'2',
            Baudrate::B2400 => b'3',
            Baudrate::B4800 => b'4',
            Baudrate::B9600 => b'5',
            Baudrate::B19200 => b'6',
            Baudrate::B38400 => b'7',
            Baudrate::B57600 => b'8',
        }
    }

    pub fn bps(&self) -> u32 {
        match self {
            Baudrate::B1200 => 1200,
            Baudrate::B2400 => 2400,
            Baudrate::B4800 => 4800,
            Baudrate::B9600 => 9600,
            Baudrate::B19200 => 19200,
            Baudrate::B38400 => 38400,
            Baudrate::B57600 => 57600,
        }
    }
}

/// One PCIP command body, as tabulated in the wire vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PcipCommand {
    StartVoiceCall,
    EndVoiceCall,
    SetBaudrate(Baudrate),
    SetAutoRepeat(bool),
    ChannelStatusRequest,
    ShortMessage { destination: Destination, body: Vec<u8> },
    LongMessage { destination: Destination, body: Vec<u8> },
    SetStatus { destination: Destination, status: Vec<u8> },
}

impl PcipCommand {
    /// Serialize to the unframed command body.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PcipCommand::StartVoiceCall => b"A".to_vec(),
            PcipCommand::EndVoiceCall => b"C".to_vec(),
            PcipCommand::SetBaudrate(rate) => vec![b'O', rate.digit()],
            PcipCommand::SetAutoRepeat(enabled) => {
                vec![b'k', b'R', if *enabled { b'1' } else { b'0' }]
            }
            PcipCommand::ChannelStatusRequest => b"JCA".to_vec(),
            PcipCommand::ShortMessage { destination, body } => {
                addressed_body(b"gF", destination, body)
            }
            PcipCommand::LongMessage { destination, body } => {
                addressed_body(b"gG", destination, body)
            }
            PcipCommand::SetStatus { destination, status } => {
                addressed_body(b"gE", destination, status)
            }
        }
    }

    /// Construct a long-message-to-unit command, the workhorse of the send path.
    pub fn long_message_to_unit(target: UnitId, body: Vec<u8>) -> Self {
        PcipCommand::LongMessage {
            destination: Destination::Unit(target),
            body,
        }
    }
}

fn addressed_body(opcode: &[u8], destination: &Destination, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(opcode.len() + 1 + 5 + payload.len());
    out.extend_from_slice(opcode);
    out.push(destination.opcode_suffix());
    out.extend_from_slice(destination.unit_id().as_bytes());
    out.extend_from_slice(payload);
    out
}
