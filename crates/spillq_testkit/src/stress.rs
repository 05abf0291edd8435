//! Concurrent producer/consumer stress runs.
//!
//! Producers push disjoint, sequenced [`Payload`] streams while a single
//! consumer drains in random batch sizes. The consumer checks every element
//! against the next sequence number expected from its producer, so loss,
//! duplication and reordering are all detected without storing the stream.

use crate::payload::Payload;
use rand::Rng;
use spillq_core::SpillQueue;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of producer threads.
    pub producers: usize,
    /// Elements pushed by each producer.
    pub per_producer: usize,
    /// Largest batch the consumer drains at once.
    pub max_batch: usize,
    /// Body length of each payload in bytes.
    pub payload_size: usize,
    /// Give up after this long.
    pub deadline: Duration,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            producers: 4,
            per_producer: 2_500,
            max_batch: 64,
            payload_size: 32,
            deadline: Duration::from_secs(60),
        }
    }
}

/// Result of a stress run.
#[derive(Debug, Clone, Default)]
pub struct StressTestResult {
    /// Elements admitted by the queue.
    pub produced: usize,
    /// Elements received by the consumer.
    pub consumed: usize,
    /// Pushes rejected and retried.
    pub rejections: usize,
    /// Elements received more than once.
    pub duplicates: usize,
    /// Elements received ahead of an earlier one from the same producer.
    pub out_of_order: usize,
    /// Non-rejection errors from push or drain.
    pub errors: Vec<String>,
    /// Whether the deadline expired first.
    pub timed_out: bool,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Returns true if every produced element arrived exactly once and in
    /// producer order.
    pub fn is_clean(&self) -> bool {
        self.produced == self.consumed
            && self.duplicates == 0
            && self.out_of_order == 0
            && self.errors.is_empty()
            && !self.timed_out
    }

    /// Returns consumed elements per second.
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.consumed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Produced: {}", self.produced);
        println!("Consumed: {}", self.consumed);
        println!("Rejections retried: {}", self.rejections);
        println!("Duplicates: {}", self.duplicates);
        println!("Out of order: {}", self.out_of_order);
        println!("Errors: {}", self.errors.len());
        println!("Timed out: {}", self.timed_out);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} elements/sec", self.throughput());
    }
}

/// Tracks the next expected sequence number of every producer.
#[derive(Debug)]
struct DeliveryCheck {
    next_seq: Vec<u64>,
    duplicates: usize,
    out_of_order: usize,
}

impl DeliveryCheck {
    fn new(producers: usize) -> Self {
        Self {
            next_seq: vec![0; producers],
            duplicates: 0,
            out_of_order: 0,
        }
    }

    fn observe(&mut self, payload: &Payload) {
        let Some(expected) = self.next_seq.get_mut(payload.producer as usize) else {
            self.out_of_order += 1;
            return;
        };
        if payload.seq < *expected {
            self.duplicates += 1;
        } else {
            if payload.seq > *expected {
                self.out_of_order += 1;
            }
            *expected = payload.seq + 1;
        }
    }
}

/// Runs producers against `queue` with one consumer on the calling thread.
///
/// Rejected pushes are retried until admitted, so a queue too small for the
/// workload slows the run down rather than failing it.
pub fn run_producers_consumer(
    queue: Arc<SpillQueue<Payload>>,
    config: &StressConfig,
) -> StressTestResult {
    let stop = Arc::new(AtomicBool::new(false));
    let produced = Arc::new(AtomicUsize::new(0));
    let rejections = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.producers)
        .map(|p| {
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);
            let produced = Arc::clone(&produced);
            let rejections = Arc::clone(&rejections);
            let finished = Arc::clone(&finished);
            let per_producer = config.per_producer;
            let payload_size = config.payload_size;

            thread::spawn(move || {
                let mut errors = Vec::new();
                'produce: for seq in 0..per_producer as u64 {
                    let mut payload = Payload::sized(p as u32, seq, payload_size);
                    loop {
                        if stop.load(Ordering::SeqCst) {
                            break 'produce;
                        }
                        match queue.push(payload) {
                            Ok(()) => {
                                produced.fetch_add(1, Ordering::SeqCst);
                                break;
                            }
                            Err(e) if e.is_rejection() => {
                                rejections.fetch_add(1, Ordering::Relaxed);
                                payload = Payload::sized(p as u32, seq, payload_size);
                                thread::sleep(Duration::from_micros(200));
                            }
                            Err(e) => {
                                errors.push(format!("producer {p}: {e}"));
                                stop.store(true, Ordering::SeqCst);
                                break 'produce;
                            }
                        }
                    }
                }
                finished.fetch_add(1, Ordering::SeqCst);
                errors
            })
        })
        .collect();

    let mut result = StressTestResult::default();
    let mut check = DeliveryCheck::new(config.producers);
    let mut rng = rand::thread_rng();
    let mut batch = Vec::with_capacity(config.max_batch);

    loop {
        if start.elapsed() > config.deadline {
            result.timed_out = true;
            stop.store(true, Ordering::SeqCst);
            break;
        }

        let all_done = finished.load(Ordering::SeqCst) == config.producers;
        batch.clear();
        let max = rng.gen_range(1..=config.max_batch.max(1));
        match queue.drain_into(&mut batch, max) {
            Ok(0) if all_done && queue.is_empty() => break,
            Ok(0) => thread::sleep(Duration::from_micros(100)),
            Ok(_) => {}
            Err(e) => {
                result.errors.push(format!("consumer: {e}"));
                stop.store(true, Ordering::SeqCst);
                break;
            }
        }
        for payload in &batch {
            check.observe(payload);
        }
        result.consumed += batch.len();
    }

    for handle in handles {
        result
            .errors
            .extend(handle.join().expect("Producer thread panicked"));
    }

    result.produced = produced.load(Ordering::SeqCst);
    result.rejections = rejections.load(Ordering::SeqCst);
    result.duplicates = check.duplicates;
    result.out_of_order = check.out_of_order;
    result.duration = start.elapsed();
    result
}
