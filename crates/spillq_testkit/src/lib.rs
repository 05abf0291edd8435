//! # spillq Testkit
//!
//! Test utilities for spillq.
//!
//! This crate provides:
//! - Temp-dir queue fixtures with automatic cleanup
//! - Sample payload types, including one large enough to fill a disk quota
//! - Property-based generators for queue shapes and push/drain scripts
//! - A concurrent producer/consumer stress runner that checks delivery
//!
//! ## Usage
//!
//! ```rust,ignore
//! use spillq_testkit::prelude::*;
//!
//! #[test]
//! fn spills_and_reloads() {
//!     with_temp_queue(small_config("t"), |queue: &SpillQueue<u32>| {
//!         for i in 0..100 {
//!             queue.push(i).unwrap();
//!         }
//!         assert_eq!(drain_all(queue).len(), 100);
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod payload;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::payload::*;
    pub use crate::stress::*;
    pub use spillq_core::{QueueConfig, QueueError, SpillQueue};
}

pub use fixtures::*;
pub use generators::*;
pub use payload::*;
pub use stress::*;
