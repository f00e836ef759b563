//! Per-target and per-topic inbound queues, payload pickle/unpickle, the
//! size guard, chunking on the send path, and the outer retry policy.

use crate::codec;
use crate::config::{DriverConfig, MAXSIZE};
use crate::error::DriverError;
use crate::pcip::UnitId;
use crate::pickle::Pickler;
use crate::queue::Queue;
use crate::radio::Radio;
use crate::reassembler::Reassembler;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Instant};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// The per-transmission envelope: `{counter, meta, payload}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecodedMessage {
    pub counter: u64,
    #[serde(default)]
    pub meta: Map<String, Value>,
    pub payload: Value,
}

impl DecodedMessage {
    /// The topic this message should be dispatched on, if `meta.trigger` is set.
    pub fn trigger(&self) -> Option<&str> {
        self.meta.get("trigger").and_then(Value::as_str)
    }
}

/// Bundles the communicator's outer (application-level) retry policy.
struct RetryPolicy {
    max_retries: u32,
    backoff_min: Duration,
    backoff_max: Duration,
}

/// Routes arbitrary JSON-representable payloads to/from radio peers,
/// addressed by 5-digit unit ID or by pre-declared topic tag.
pub struct Communicator {
    radio: &'static Radio,
    pickler: Pickler,
    counter: Mutex<CriticalSectionRawMutex, u64>,
    send_lock: Mutex<CriticalSectionRawMutex, ()>,
    target_queues: Mutex<CriticalSectionRawMutex, HashMap<UnitId, std::sync::Arc<Queue<DecodedMessage>>>>,
    topic_queues: HashMap<String, std::sync::Arc<Queue<(UnitId, DecodedMessage)>>>,
    retry: RetryPolicy,
    receive_timeout: Duration,
}

impl Communicator {
    pub fn new(radio: &'static Radio, cfg: &DriverConfig) -> Self {
        let topic_queues = cfg
            .listeners
            .iter()
            .map(|topic| (topic.clone(), std::sync::Arc::new(Queue::new())))
            .collect();

        Communicator {
            radio,
            pickler: Pickler::new(cfg.compression),
            counter: Mutex::new(0),
            send_lock: Mutex::new(()),
            target_queues: Mutex::new(HashMap::new()),
            topic_queues,
            retry: RetryPolicy {
                max_retries: cfg.max_outer_retries,
                backoff_min: Duration::from_millis(cfg.outer_retry_backoff_min_ms),
                backoff_max: Duration::from_millis(cfg.outer_retry_backoff_max_ms),
            },
            receive_timeout: Duration::from_secs(cfg.receive_timeout_secs),
        }
    }

    /// Wrap `obj` in a single-field dict, pickle it, and report whether the
    /// result fits within 80% of `MAXSIZE` (the 20% headroom accommodates
    /// the `counter`/`meta` fields a real send adds).
    pub fn allowed_size_with_margin<T: Serialize>(&self, obj: &T) -> Result<bool, DriverError> {
        let wrapped = serde_json::json!({ "obj": obj });
        let encoded = self.pickler.pickle(&wrapped)?;
        Ok(encoded.len() as f64 <= 0.8 * MAXSIZE as f64)
    }

    /// Pickle `{counter, meta, payload}`, chunk it, and drive the radio's
    /// send state machine once per chunk, in order. A `ConfirmationTimeout`
    /// from the radio is treated as a false result, not an error, matching
    /// spec.md §4.6; all other errors propagate (or, if outer retries are
    /// configured, drive the retry loop below).
    pub async fn send(&self, target: UnitId, payload: Value, meta: Map<String, Value>) -> Result<bool, DriverError> {
        let mut attempt = 0u32;
        loop {
            match self.send_once(target, &payload, &meta).await {
                Ok(result) => return Ok(result),
                Err(e) if attempt < self.retry.max_retries => {
                    log::warn!("send to {target} failed ({e}), retrying ({}/{})", attempt + 1, self.retry.max_retries);
                    attempt += 1;
                    let backoff = random_backoff(self.retry.backoff_min, self.retry.backoff_max);
                    embassy_time::Timer::after(backoff).await;
                }
                Err(_) if self.retry.max_retries > 0 => {
                    return Err(DriverError::SendMaxRetries { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, target: UnitId, payload: &Value, meta: &Map<String, Value>) -> Result<bool, DriverError> {
        let counter = {
            let mut c = self.counter.lock().await;
            *c += 1;
            *c
        };

        let envelope = DecodedMessage {
            counter,
            meta: meta.clone(),
            payload: payload.clone(),
        };
        let encoded = self.pickler.pickle(&envelope)?;
        if encoded.len() > MAXSIZE {
            return Err(DriverError::PayloadTooLarge {
                size: encoded.len(),
                max: MAXSIZE,
            });
        }

        let _permit = self.send_lock.lock().await;

        for chunk in build_chunks(&encoded) {
            match self.radio.send_ldm(target, chunk).await {
                Ok(true) => continue,
                Ok(false) => return Ok(false),
                Err(DriverError::ConfirmationTimeout { .. }) => return Ok(false),
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }

    /// Drain the radio's data queue, unpickle each record, and route it to
    /// its target or topic queue. Intended to be run as a long-lived loop
    /// by the caller (alongside `Radio::receive_loop`).
    pub async fn dispatch_loop(&self) {
        let mut reassembler = Reassembler::new(self.receive_timeout);
        loop {
            let (peer, chunk) = self.radio.inbound.receive().await;
            let now = Instant::now();
            match reassembler.push(peer, &chunk, now) {
                Ok(Some(encoded)) => self.deliver(peer, &encoded).await,
                Ok(None) => {}
                Err(e) => log::warn!("reassembly for {peer} failed: {e}"),
            }
        }
    }

    async fn deliver(&self, peer: UnitId, encoded: &[u8]) {
        let decoded: Result<DecodedMessage, DriverError> = self.pickler.unpickle(encoded);
        let decoded = match decoded {
            Ok(d) => d,
            Err(e) => {
                log::warn!("failed to unpickle payload from {peer}: {e}");
                return;
            }
        };

        if let Some(trigger) = decoded.trigger() {
            match self.topic_queues.get(trigger) {
                Some(queue) => queue.push((peer, decoded)).await,
                None => log::warn!("dropping message from {peer}: unknown trigger topic {trigger:?}"),
            }
            return;
        }

        let queue = {
            let mut queues = self.target_queues.lock().await;
            queues.entry(peer).or_insert_with(|| std::sync::Arc::new(Queue::new())).clone()
        };
        queue.push(decoded).await;
    }

    /// Lazily create and return the inbound queue for `peer`.
    pub async fn get_target_queue(&self, peer: UnitId) -> std::sync::Arc<Queue<DecodedMessage>> {
        let mut queues = self.target_queues.lock().await;
        queues.entry(peer).or_insert_with(|| std::sync::Arc::new(Queue::new())).clone()
    }

    /// Return the pre-registered queue for `topic`, or `ListenerNotDefined`.
    pub fn get_listener_queue(&self, topic: &str) -> Result<std::sync::Arc<Queue<(UnitId, DecodedMessage)>>, DriverError> {
        self.topic_queues
            .get(topic)
            .cloned()
            .ok_or_else(|| DriverError::ListenerNotDefined { topic: topic.to_string() })
    }

    pub fn shutdown(&self) {
        self.radio.destroy();
    }
}

/// Split `encoded` into chunks of at most `MAXSIZE - 8` bytes, prefixing the
/// first with `json` and suffixing the last with `json` (single-chunk
/// payloads get both markers).
fn build_chunks(encoded: &[u8]) -> Vec<Vec<u8>> {
    const RESERVED: usize = 8;
    let chunk_size = MAXSIZE - RESERVED;
    let mut chunks: Vec<Vec<u8>> = encoded.chunks(chunk_size).map(|c| c.to_vec()).collect();
    if chunks.is_empty() {
        chunks.push(Vec::new());
    }
    let last = chunks.len() - 1;
    for (i, chunk) in chunks.iter_mut().enumerate() {
        if i == 0 {
            let mut prefixed = codec::CHUNK_MARKER.to_vec();
            prefixed.extend_from_slice(chunk);
            *chunk = prefixed;
        }
        if i == last {
            chunk.extend_from_slice(codec::CHUNK_MARKER);
        }
    }
    chunks
}

fn random_backoff(min: Duration, max: Duration) -> Duration {
    let min_ms = min.as_millis().max(1);
    let max_ms = max.as_millis().max(min_ms);
    let ms = rand::thread_rng().gen_range(min_ms..=max_ms);
    Duration::from_millis(ms as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_covers_whole_payload_and_markers() {
        let encoded: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let chunks = build_chunks(&encoded);
        assert!(chunks.len() > 1);

        let first = &chunks[0];
        let last = chunks.last().unwrap();
        assert!(codec::is_chunk_start(first));
        assert!(codec::is_chunk_end(last));

        let mut reconstructed = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let mut c = chunk.as_slice();
            if i == 0 {
                c = codec::strip_chunk_start(c);
            }
            if i == chunks.len() - 1 {
                c = codec::strip_chunk_end(c);
            }
            reconstructed.extend_from_slice(c);
        }
        assert_eq!(reconstructed, encoded);
    }

    #[test]
    fn single_chunk_payload_has_both_markers() {
        let encoded = b"short".to_vec();
        let chunks = build_chunks(&encoded);
        assert_eq!(chunks.len(), 1);
        assert!(codec::is_chunk_start(&chunks[0]));
        assert!(codec::is_chunk_end(&chunks[0]));
    }

    #[test]
    fn decoded_message_trigger_extraction() {
        let mut meta = Map::new();
        meta.insert("trigger".to_string(), Value::String("about-you".to_string()));
        let msg = DecodedMessage {
            counter: 7,
            meta,
            payload: serde_json::json!({"x": 1}),
        };
        assert_eq!(msg.trigger(), Some("about-you"));

        let msg_no_trigger = DecodedMessage {
            counter: 1,
            meta: Map::new(),
            payload: Value::Null,
        };
        assert_eq!(msg_no_trigger.trigger(), None);
    }

    #[test]
    fn random_backoff_stays_in_range() {
        let min = Duration::from_millis(2000);
        let max = Duration::from_millis(10000);
        for _ in 0..20 {
            let d = random_backoff(min, max);
            assert!(d >= min && d <= max);
        }
    }
}
