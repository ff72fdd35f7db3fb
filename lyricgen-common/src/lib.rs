//! # LyricGen Common Library
//!
//! Shared code for the LyricGen services:
//! - Error type and result alias
//! - Bootstrap configuration loading (TOML + compiled defaults)
//! - Domain models and request validation
//! - Live feed event types
//! - Server-Sent Events frame decoding

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod sse;

pub use error::{Error, Result};
pub use events::LiveEvent;
pub use sse::SseFrameDecoder;
