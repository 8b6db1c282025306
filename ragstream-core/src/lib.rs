//! # ragstream-core
//!
//! Core types for ragstream.
//!
//! This crate defines the structured side-channel payloads that travel next
//! to the answer text in a retrieval-augmented answer stream:
//!
//! - **[`Citation`]**: one piece of retrieved evidence
//! - **[`Metrics`]**: timing and cost record for one answer, including the
//!   per-step [`NodeRecord`] history of the upstream pipeline
//! - **[`DecodeError`]**: failure to decode one of the above from a frame payload
//!
//! ## Example
//!
//! ```
//! use ragstream_core::{Citation, Metrics};
//!
//! let citations = Citation::parse_list(r#"[{"id":"1","title":"T","snippet":"S"}]"#).unwrap();
//! assert_eq!(citations[0].title, "T");
//!
//! let metrics = Metrics::parse(r#"{"latency_ms": 120.5}"#).unwrap();
//! assert_eq!(metrics.latency_ms, Some(120.5));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod citation;
pub mod errors;
pub mod metrics;

pub use citation::Citation;
pub use errors::{DecodeError, DecodeResult};
pub use metrics::{Metrics, NodeRecord};
