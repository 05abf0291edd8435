//! Property-based test generators using proptest.
//!
//! Provides strategies for queue shapes and push/drain scripts that keep
//! within the limits a queue normalizes to.

use crate::payload::Payload;
use proptest::prelude::*;
use spillq_core::QueueConfig;

/// One step of a queue script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueOp {
    /// Push this many consecutive values.
    Push(usize),
    /// Drain at most this many values.
    Drain(usize),
}

/// Heap capacity and page size of a generated queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueShape {
    /// Heap capacity.
    pub heap_capacity: usize,
    /// Page size; at most a third of the heap capacity.
    pub page_size: usize,
}

impl QueueShape {
    /// Builds a config of this shape with room for `capacity` elements.
    pub fn config(&self, name: &str, capacity: usize) -> QueueConfig {
        QueueConfig::new(name)
            .capacity(capacity)
            .heap_capacity(self.heap_capacity)
            .page_size(self.page_size)
    }
}

/// Strategy for queue shapes small enough to spill within a few hundred
/// elements.
pub fn queue_shape_strategy() -> impl Strategy<Value = QueueShape> {
    (9usize..90).prop_flat_map(|heap_capacity| {
        (1..=heap_capacity / 3).prop_map(move |page_size| QueueShape {
            heap_capacity,
            page_size,
        })
    })
}

/// Strategy for a single queue step.
pub fn queue_op_strategy() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        3 => (1usize..60).prop_map(QueueOp::Push),
        2 => (1usize..80).prop_map(QueueOp::Drain),
    ]
}

/// Strategy for a script of up to `max_len` steps.
pub fn queue_script_strategy(max_len: usize) -> impl Strategy<Value = Vec<QueueOp>> {
    prop::collection::vec(queue_op_strategy(), 1..max_len)
}

/// Strategy for payloads with short random bodies.
pub fn payload_strategy() -> impl Strategy<Value = Payload> {
    (any::<u32>(), any::<u64>(), "[a-z0-9 ]{0,64}").prop_map(|(producer, seq, body)| Payload {
        producer,
        seq,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn shapes_survive_normalization(shape in queue_shape_strategy()) {
            let config = shape.config("shape", 10_000).normalized();
            prop_assert_eq!(config.heap_capacity, shape.heap_capacity);
            prop_assert_eq!(config.page_size, shape.page_size);
        }

        #[test]
        fn scripts_are_non_empty(script in queue_script_strategy(20)) {
            prop_assert!(!script.is_empty());
        }
    }
}
