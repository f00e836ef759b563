//! Classification of the asynchronous stream of SDM/LDM/status/device-state
//! records the radio emits, run by the receiver task.

use crate::pcip::UnitId;

/// One inbound data-bearing record, keyed by peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundRecord {
    /// SDM or LDM chunk: `peer` plus its opaque encoded body.
    Data { peer: UnitId, encoded: Vec<u8> },
    /// Status-set record.
    Status { peer: UnitId, status: Vec<u8> },
}

/// Device-state LED value (last byte of a `JA` frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Led {
    Free,
    Sending,
    Receiving,
    Idle,
}

/// Outcome of classifying one frame body (START/STOP already stripped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Inbound(InboundRecord),
    DeviceState(Led),
    /// `JE` display content: recognized but deliberately ignored.
    DisplayContent,
    ConfirmSuccess,
    ConfirmFailure,
    /// Anything short, garbled, or not in the recognized opcode set.
    Unrecognized,
}

/// Offset in an inbound `gF*`/`gG*`/`gE*` body where the 5-byte peer unit id
/// starts (spec data-model invariant: peer at body[3..8]).
const PEER_OFFSET: usize = 3;
const PEER_LEN: usize = 5;
/// Offset where the opaque payload begins; bytes between the unit id and
/// here belong to radio-internal bookkeeping (sequence/length fields) this
/// driver doesn't interpret.
const PAYLOAD_OFFSET: usize = 14;

fn extract_peer_and_payload(body: &[u8]) -> Option<(UnitId, Vec<u8>)> {
    if body.len() < PAYLOAD_OFFSET {
        return None;
    }
    let peer = UnitId::from_bytes(&body[PEER_OFFSET..PEER_OFFSET + PEER_LEN])?;
    let payload = body[PAYLOAD_OFFSET..].to_vec();
    Some((peer, payload))
}

/// Classify one complete, unframed radio record.
pub fn classify(body: &[u8]) -> Classified {
    if body.is_empty() {
        return Classified::Unrecognized;
    }

    // Bare single-byte confirmations.
    if body == b"0" {
        return Classified::ConfirmSuccess;
    }
    if body == b"1" {
        return Classified::ConfirmFailure;
    }

    if body.len() < 2 {
        return Classified::Unrecognized;
    }

    match &body[0..2] {
        b"gF" | b"gG" => match extract_peer_and_payload(body) {
            Some((peer, encoded)) => Classified::Inbound(InboundRecord::Data { peer, encoded }),
            None => Classified::Unrecognized,
        },
        b"gE" => match extract_peer_and_payload(body) {
            Some((peer, status)) => Classified::Inbound(InboundRecord::Status { peer, status }),
            None => Classified::Unrecognized,
        },
        b"JA" => match body.last() {
            Some(0x80) => Classified::DeviceState(Led::Free),
            Some(0x81) => Classified::DeviceState(Led::Sending),
            Some(0x82) => Classified::DeviceState(Led::Receiving),
            Some(0x84) => Classified::DeviceState(Led::Idle),
            _ => Classified::Unrecognized,
        },
        b"JE" => Classified::DisplayContent,
        _ => Classified::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(s: &str) -> UnitId {
        UnitId::parse(s).unwrap()
    }

    fn ldm_body(peer: &str, payload: &[u8]) -> Vec<u8> {
        let mut body = b"gGU".to_vec();
        body.extend_from_slice(peer.as_bytes());
        body.extend_from_slice(&[0u8; 6]); // radio-internal bookkeeping, unused
        body.extend_from_slice(payload);
        body
    }

    #[test]
    fn classifies_ldm_data() {
        let body = ldm_body("00006", b"payload-bytes");
        match classify(&body) {
            Classified::Inbound(InboundRecord::Data { peer, encoded }) => {
                assert_eq!(peer, unit("00006"));
                assert_eq!(encoded, b"payload-bytes");
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn classifies_status_record() {
        let mut body = b"gEU".to_vec();
        body.extend_from_slice(b"00042");
        body.extend_from_slice(&[0u8; 6]);
        body.extend_from_slice(b"stat");
        match classify(&body) {
            Classified::Inbound(InboundRecord::Status { peer, status }) => {
                assert_eq!(peer, unit("00042"));
                assert_eq!(status, b"stat");
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn classifies_device_state() {
        assert_eq!(classify(b"JA\x80"), Classified::DeviceState(Led::Free));
        assert_eq!(classify(b"JA\x81"), Classified::DeviceState(Led::Sending));
        assert_eq!(classify(b"JA\x82"), Classified::DeviceState(Led::Receiving));
        assert_eq!(classify(b"JA\x84"), Classified::DeviceState(Led::Idle));
        assert_eq!(classify(b"JA\x99"), Classified::Unrecognized);
    }

    #[test]
    fn classifies_display_content_as_ignored() {
        assert_eq!(classify(b"JEanything"), Classified::DisplayContent);
    }

    #[test]
    fn classifies_confirmations() {
        assert_eq!(classify(b"0"), Classified::ConfirmSuccess);
        assert_eq!(classify(b"1"), Classified::ConfirmFailure);
    }

    #[test]
    fn garbled_or_short_frames_are_unrecognized_not_fatal() {
        assert_eq!(classify(b""), Classified::Unrecognized);
        assert_eq!(classify(b"g"), Classified::Unrecognized);
        assert_eq!(classify(b"gFU"), Classified::Unrecognized);
        assert_eq!(classify(b"zz"), Classified::Unrecognized);
    }
}
