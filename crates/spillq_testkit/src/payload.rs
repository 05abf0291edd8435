//! Sample element types.

use serde::{Deserialize, Serialize};

/// An element tagged with its producer and per-producer sequence number.
///
/// The tags let a consumer check exactly-once, in-order delivery without
/// holding every produced value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Producer that created the element.
    pub producer: u32,
    /// Position in that producer's output, starting at 0.
    pub seq: u64,
    /// Filler.
    pub body: String,
}

impl Payload {
    /// Creates a payload with an empty body.
    pub fn new(producer: u32, seq: u64) -> Self {
        Self {
            producer,
            seq,
            body: String::new(),
        }
    }

    /// Creates a payload whose body is `body_len` bytes long.
    pub fn sized(producer: u32, seq: u64, body_len: usize) -> Self {
        Self {
            producer,
            seq,
            body: filler(seq, body_len),
        }
    }

    /// Creates a payload that encodes to roughly one KiB of JSON.
    pub fn kib(producer: u32, seq: u64) -> Self {
        Self::sized(producer, seq, 1_000)
    }
}

/// A flat record resembling a typical log or event element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event id.
    pub id: u64,
    /// Event kind.
    pub kind: String,
    /// Free-form attributes.
    pub attributes: Vec<(String, String)>,
    /// Measured value, if any.
    pub value: Option<f64>,
}

impl Event {
    /// Creates a small event with two attributes.
    pub fn sample(id: u64) -> Self {
        Self {
            id,
            kind: if id % 2 == 0 { "click" } else { "view" }.to_string(),
            attributes: vec![
                ("page".to_string(), format!("/items/{}", id % 17)),
                ("session".to_string(), format!("s-{}", id / 100)),
            ],
            value: (id % 3 == 0).then_some(id as f64 * 0.5),
        }
    }
}

/// Deterministic printable filler of `len` bytes.
fn filler(seed: u64, len: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    (0..len)
        .map(|i| ALPHABET[(seed as usize).wrapping_add(i) % ALPHABET.len()] as char)
        .collect()
}
