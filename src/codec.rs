//! Framing constants and chunk envelope markers.
//!
//! Every command to the radio, and every frame read back from it, is
//! `START || body || STOP`. The wire format assumes START/STOP never
//! appear inside a well-formed body.

pub const START: u8 = 0x02;
pub const STOP: u8 = 0x03;

/// Literal ASCII marker bracketing the first/last chunk of a multi-LDM payload.
pub const CHUNK_MARKER: &[u8] = b"json";

/// Wrap a command body between START and STOP sentinels.
pub fn frame(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 2);
    out.push(START);
    out.extend_from_slice(body);
    out.push(STOP);
    out
}

/// Strip the START prefix and STOP suffix from a complete frame.
///
/// Returns `None` if the frame is shorter than two bytes or doesn't carry
/// the expected sentinels at both ends; malformed frames are discarded by
/// the caller rather than treated as fatal.
pub fn extract(framed: &[u8]) -> Option<&[u8]> {
    if framed.len() < 2 {
        return None;
    }
    let (first, rest) = framed.split_first()?;
    let (last, body) = rest.split_last()?;
    if *first != START || *last != STOP {
        return None;
    }
    Some(body)
}

/// True if `chunk` opens a multi-chunk payload (`json` prefix).
pub fn is_chunk_start(chunk: &[u8]) -> bool {
    chunk.starts_with(CHUNK_MARKER)
}

/// True if `chunk` closes a multi-chunk payload (`json` suffix).
pub fn is_chunk_end(chunk: &[u8]) -> bool {
    chunk.ends_with(CHUNK_MARKER)
}

/// Strip a leading `json` marker, if present.
pub fn strip_chunk_start(chunk: &[u8]) -> &[u8] {
    chunk.strip_prefix(CHUNK_MARKER).unwrap_or(chunk)
}

/// Strip a trailing `json` marker, if present.
pub fn strip_chunk_end(chunk: &[u8]) -> &[u8] {
    chunk.strip_suffix(CHUNK_MARKER).unwrap_or(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_round_trip() {
        let body = b"gFU00006hello".to_vec();
        let framed = frame(&body);
        assert_eq!(framed[0], START);
        assert_eq!(*framed.last().unwrap(), STOP);
        assert_eq!(extract(&framed), Some(body.as_slice()));
    }

    #[test]
    fn extract_rejects_missing_sentinels() {
        assert_eq!(extract(b"no-sentinels-here"), None);
        assert_eq!(extract(b""), None);
        assert_eq!(extract(&[START]), None);
    }

    #[test]
    fn chunk_markers() {
        let first = b"jsonabc";
        let last = b"defjson";
        let middle = b"xyz";
        assert!(is_chunk_start(first) && !is_chunk_end(first));
        assert!(is_chunk_end(last) && !is_chunk_start(last));
        assert!(!is_chunk_start(middle) && !is_chunk_end(middle));
        assert_eq!(strip_chunk_start(first), b"abc");
        assert_eq!(strip_chunk_end(last), b"def");
    }

    #[test]
    fn single_chunk_has_both_markers() {
        let whole = b"jsonpayloadjson";
        assert!(is_chunk_start(whole) && is_chunk_end(whole));
        let trimmed = strip_chunk_end(strip_chunk_start(whole));
        assert_eq!(trimmed, b"payload");
    }
}
