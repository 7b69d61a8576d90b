#![doc = include_str!("../README.md")]
//!
//! # Core Components
//!
//! - [`TokenBucket`] - The token bucket, generic over its [`Clock`]
//! - [`Limit`] - Fill interval, quantum and capacity of a bucket
//! - [`Clock`] trait and implementations for time sources
//! - [`io`] - Byte-rate limited readers and writers
//!
//! # Quick Start
//!
//! ```rust
//! use std::num::NonZeroU64;
//! use std::time::Duration;
//!
//! use tickbucket::{Limit, TokenBucket};
//!
//! // 10 tokens per second, one second of burst
//! let bucket = TokenBucket::new(Limit::per_second(NonZeroU64::new(10).unwrap())).unwrap();
//!
//! // take what is there without waiting
//! assert_eq!(10, bucket.take_available(15));
//!
//! // or take on credit and learn how long to wait for it
//! let wait = bucket.take(1);
//! assert!(wait <= Duration::from_millis(100));
//! ```

mod bucket;
mod clock;
mod error;
#[cfg(feature = "async")]
pub mod futures;
pub mod io;
mod limit;

pub use bucket::TokenBucket;
#[cfg(feature = "tokio")]
pub use clock::TokioClock;
pub use clock::{Clock, ManualClock, StdClock};
#[cfg(feature = "quanta")]
pub use clock::{FastClock, QuantaClock};
pub use error::*;
#[cfg(feature = "async")]
pub use crate::futures::RateLimitedStreamExt;
pub use limit::Limit;
