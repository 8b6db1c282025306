//! # ragstream-client
//!
//! HTTP adapter for the streaming `/ask` endpoint.
//!
//! The client posts a question, checks the response status and hands the
//! response body to [`ragstream_streaming::drive`]. Everything after the
//! status check is transport-agnostic.
//!
//! ## Example
//!
//! ```ignore
//! use ragstream_client::{AskClient, AskRequest};
//! use ragstream_streaming::AnswerState;
//! use tokio_util::sync::CancellationToken;
//!
//! let client = AskClient::from_env()?;
//! let mut answer = AnswerState::new();
//! client
//!     .ask_answer(&AskRequest::new("How do I reset my password?"), &mut answer, &CancellationToken::new())
//!     .await?;
//!
//! println!("{}", answer.answer());
//! for citation in answer.citations() {
//!     println!("- {} ({:?})", citation.title, citation.score);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;

pub use client::{AskClient, AskRequest};
pub use config::{ClientConfig, API_TOKEN_ENV, API_URL_ENV, DEFAULT_BASE_URL};
pub use error::{ClientError, ClientResult};
