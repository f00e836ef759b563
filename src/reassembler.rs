//! Stitches `(peer, chunk)` records back into a whole encoded pickle blob.
//!
//! Per-peer state, keyed the same way the teacher's connection-matrix
//! parser keys per-requester state, with timestamps threaded through as
//! parameters (`now: Instant`) rather than read from the clock internally,
//! so timeout behavior is deterministically testable without real sleeps.

use crate::codec;
use crate::error::DriverError;
use crate::pcip::UnitId;
use embassy_time::{Duration, Instant};
use std::collections::HashMap;

struct PeerBuffer {
    buffer: Vec<u8>,
    started: bool,
    last_chunk_at: Instant,
}

/// Reassembles chunk envelopes per peer; one instance shared by the
/// communicator's dispatch loop.
pub struct Reassembler {
    peers: HashMap<UnitId, PeerBuffer>,
    receive_timeout: Duration,
}

impl Reassembler {
    pub fn new(receive_timeout: Duration) -> Self {
        Reassembler {
            peers: HashMap::new(),
            receive_timeout,
        }
    }

    /// Feed one chunk for `peer`. Returns the completed, still-encoded blob
    /// once the end-of-message marker is seen.
    ///
    /// If a transmission is open for `peer` and `now` is past its deadline,
    /// the stale buffer is dropped and a `ReceiveTimeout` is returned before
    /// the fresh chunk is considered (matching spec.md's "exceeding it
    /// raises ReceiveTimeout and resets state").
    pub fn push(&mut self, peer: UnitId, chunk: &[u8], now: Instant) -> Result<Option<Vec<u8>>, DriverError> {
        if let Some(existing) = self.peers.get(&peer)
            && existing.started
            && now.saturating_duration_since(existing.last_chunk_at) >= self.receive_timeout
        {
            self.peers.remove(&peer);
            return Err(DriverError::ReceiveTimeout {
                peer: peer.to_string(),
                waited: self.receive_timeout,
            });
        }

        let is_start = codec::is_chunk_start(chunk);
        let is_end = codec::is_chunk_end(chunk);

        // A fresh start marker while a transmission is already open resets
        // the buffer (spec.md §3 invariant).
        let entry = self.peers.entry(peer).or_insert_with(|| PeerBuffer {
            buffer: Vec::new(),
            started: false,
            last_chunk_at: now,
        });

        if is_start {
            entry.buffer.clear();
            entry.started = true;
        }

        if !entry.started {
            // Chunk arrived with no open transmission and isn't a start marker; drop it.
            return Ok(None);
        }

        let mut trimmed = chunk;
        if is_start {
            trimmed = codec::strip_chunk_start(trimmed);
        }
        if is_end {
            trimmed = codec::strip_chunk_end(trimmed);
        }
        entry.buffer.extend_from_slice(trimmed);
        entry.last_chunk_at = now;

        if is_end {
            let PeerBuffer { buffer, .. } = self.peers.remove(&peer).unwrap();
            return Ok(Some(buffer));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> UnitId {
        UnitId::parse("00006").unwrap()
    }

    #[test]
    fn single_chunk_has_both_markers() {
        let mut r = Reassembler::new(Duration::from_secs(60));
        let now = Instant::now();
        let whole = b"jsonpayloadjson";
        let result = r.push(peer(), whole, now).unwrap();
        assert_eq!(result, Some(b"payload".to_vec()));
    }

    #[test]
    fn three_chunk_reassembly() {
        let mut r = Reassembler::new(Duration::from_secs(60));
        let now = Instant::now();
        assert_eq!(r.push(peer(), b"jsonAAA", now).unwrap(), None);
        assert_eq!(r.push(peer(), b"BBB", now).unwrap(), None);
        let result = r.push(peer(), b"CCCjson", now).unwrap();
        assert_eq!(result, Some(b"AAABBBCCC".to_vec()));
    }

    #[test]
    fn fresh_start_marker_resets_open_transmission() {
        let mut r = Reassembler::new(Duration::from_secs(60));
        let now = Instant::now();
        assert_eq!(r.push(peer(), b"jsonstale-data", now).unwrap(), None);
        let result = r.push(peer(), b"jsonfreshjson", now).unwrap();
        assert_eq!(result, Some(b"fresh".to_vec()));
    }

    #[test]
    fn chunk_without_open_transmission_is_dropped() {
        let mut r = Reassembler::new(Duration::from_secs(60));
        let now = Instant::now();
        assert_eq!(r.push(peer(), b"midchunk-no-start", now).unwrap(), None);
    }

    #[test]
    fn stale_buffer_times_out_and_resets() {
        let mut r = Reassembler::new(Duration::from_millis(10));
        let t0 = Instant::now();
        assert_eq!(r.push(peer(), b"jsonpartial", t0).unwrap(), None);

        let t1 = t0 + Duration::from_millis(20);
        let err = r.push(peer(), b"moredatajson", t1).unwrap_err();
        assert!(matches!(err, DriverError::ReceiveTimeout { .. }));

        // State was reset: the next chunk starts a brand new transmission.
        let result = r.push(peer(), b"jsonfreshjson", t1).unwrap();
        assert_eq!(result, Some(b"fresh".to_vec()));
    }
}
